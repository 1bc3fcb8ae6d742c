use chrono::DateTime;
use uuid::Uuid;

use super::{JsonWriter, WriterOptions, WriterState};
use crate::{
    error::{ConversionError, ErrorKind, UsageError},
    escape::Escaper,
    reader::{JsonReader, ReaderOptions, ReaderState},
};

fn writer_into(out: &mut Vec<u8>, options: WriterOptions) -> JsonWriter<'_> {
    JsonWriter::new(out, WriterState::new(options))
}

#[test]
fn compact_object() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_object().unwrap();
    w.write_property_name("x").unwrap();
    w.write_i64(1).unwrap();
    w.write_property_name("y").unwrap();
    w.write_start_array().unwrap();
    w.write_null().unwrap();
    w.write_bool(true).unwrap();
    w.write_end_array().unwrap();
    w.write_end_object().unwrap();
    w.flush();
    assert_eq!(out, br#"{"x":1,"y":[null,true]}"#);
}

#[test]
fn indented_output() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::indented(true));
    w.write_start_object().unwrap();
    w.write_property_name("a").unwrap();
    w.write_start_object().unwrap();
    w.write_end_object().unwrap();
    w.write_property_name("b").unwrap();
    w.write_start_array().unwrap();
    w.write_i64(1).unwrap();
    w.write_i64(2).unwrap();
    w.write_end_array().unwrap();
    w.write_end_object().unwrap();
    insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
    {
      "a": {},
      "b": [
        1,
        2
      ]
    }
    "#);
}

#[test]
fn float_shortest_round_trip() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    w.write_f64(0.1).unwrap();
    w.write_f64(1.0).unwrap();
    w.write_f64(-2.5e300).unwrap();
    w.write_end_array().unwrap();
    assert_eq!(out, b"[0.1,1.0,-2.5e300]");
}

#[test]
fn non_finite_floats_rejected() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    let err = w.write_f64(f64::NAN).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Conversion(ConversionError::NonFiniteFloat)
    );
    assert!(w.write_f32(f32::INFINITY).is_err());
}

#[test]
fn string_escaping_follows_policy() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_string("a\"é<").unwrap();
    assert_eq!(out, br#""a\"\u00e9\u003c""#);

    let mut out = Vec::new();
    let options = WriterOptions {
        escaper: Escaper::Relaxed,
        ..WriterOptions::default()
    };
    let mut w = writer_into(&mut out, options);
    w.write_string("a\"é<").unwrap();
    assert_eq!(out, "\"a\\\"é<\"".as_bytes());
}

#[test]
fn datetime_and_uuid_forms() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    let dt = DateTime::parse_from_rfc3339("2024-05-06T07:08:09.25+02:00").unwrap();
    w.write_datetime(&dt).unwrap();
    let id = Uuid::parse_str("6F9619FF-8B86-D011-B42D-00C04FC964FF").unwrap();
    w.write_uuid(id).unwrap();
    w.write_end_array().unwrap();
    assert_eq!(
        out,
        br#"["2024-05-06T07:08:09.250+02:00","6f9619ff-8b86-d011-b42d-00c04fc964ff"]"#
    );
}

#[test]
fn base64_streams_unescaped() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_base64_string(&[0xFB, 0xEF, 0xBE]).unwrap();
    assert_eq!(out, br#""++++""#);
}

#[test]
fn raw_value_passes_through() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    w.write_raw_value(br#"{"pre":"formatted"}"#).unwrap();
    w.write_i64(1).unwrap();
    w.write_end_array().unwrap();
    assert_eq!(out, br#"[{"pre":"formatted"},1]"#);
}

#[test]
fn validation_rejects_grammar_violations() {
    // Value inside an object without a name.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_object().unwrap();
    assert_eq!(
        w.write_i64(1).unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::NameExpected)
    );

    // Name outside an object.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    assert_eq!(
        w.write_property_name("a").unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::NameNotAllowed)
    );

    // Close mismatch.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_object().unwrap();
    assert_eq!(
        w.write_end_array().unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::MismatchedClose)
    );

    // Close with a dangling property name.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_object().unwrap();
    w.write_property_name("a").unwrap();
    assert_eq!(
        w.write_end_object().unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::ValueExpected)
    );

    // Nothing to close.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    assert_eq!(
        w.write_end_object().unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::NothingToClose)
    );

    // Second root.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_null().unwrap();
    assert_eq!(
        w.write_null().unwrap_err().kind(),
        &ErrorKind::Usage(UsageError::SecondRootValue)
    );
}

#[test]
fn skip_validation_trusts_the_caller() {
    let mut out = Vec::new();
    let options = WriterOptions {
        skip_validation: true,
        ..WriterOptions::default()
    };
    let mut w = writer_into(&mut out, options);
    w.write_start_object().unwrap();
    w.write_i64(1).unwrap(); // grammar violation, accepted as asked
    assert_eq!(out, b"{1");
}

#[test]
fn pending_and_committed_accounting() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    w.write_i64(12).unwrap();
    assert_eq!(w.bytes_pending(), 3);
    assert_eq!(w.bytes_committed(), 0);
    w.flush();
    assert_eq!(w.bytes_pending(), 0);
    assert_eq!(w.bytes_committed(), 3);
}

#[test]
fn state_carries_across_writer_rebuilds() {
    // Write half the document, drain the sink, resume with carried state.
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_start_array().unwrap();
    w.write_i64(1).unwrap();
    w.flush();
    let state = w.into_state();

    let mut drained = std::mem::take(&mut out);
    let mut w = JsonWriter::new(&mut out, state);
    w.write_i64(2).unwrap();
    w.write_end_array().unwrap();
    w.flush();
    drained.extend_from_slice(&out);
    assert_eq!(drained, b"[1,2]");
}

#[test]
fn reset_starts_a_fresh_document() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::default());
    w.write_null().unwrap();
    w.reset();
    w.write_start_array().unwrap();
    w.write_end_array().unwrap();
    assert_eq!(out, b"null[]");
}

#[test]
fn accepted_writes_parse_back() {
    let mut out = Vec::new();
    let mut w = writer_into(&mut out, WriterOptions::indented(true));
    w.write_start_object().unwrap();
    w.write_property_name("text").unwrap();
    w.write_string("crème 😀 brûlée").unwrap();
    w.write_property_name("n").unwrap();
    w.write_f64(6.02e23).unwrap();
    w.write_property_name("flags").unwrap();
    w.write_start_array().unwrap();
    w.write_bool(false).unwrap();
    w.write_null().unwrap();
    w.write_end_array().unwrap();
    w.write_end_object().unwrap();

    let mut reader = JsonReader::new(&out, true, ReaderState::new(ReaderOptions::default()));
    let mut strings = Vec::new();
    while reader.read().unwrap() {
        if reader.token_type() == crate::reader::TokenType::String {
            strings.push(reader.get_string().unwrap());
        }
    }
    assert_eq!(strings, ["crème 😀 brûlée"]);
}
