//! End-to-end scenarios spanning the reader, writer, and mapping engine.

use std::sync::Arc;

use crate::{
    descriptor::{ClassShape, CollectionShape, NullableShape, TypeShape},
    engine::{from_slice, to_vec, Deserializer},
    error::{ErrorKind, StructuralError},
    options::SerializerOptions,
    reader::CommentHandling,
    value::{JsonValue, Number},
};

fn options_with_i32_vec() -> Arc<SerializerOptions> {
    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
        .unwrap();
    options
}

#[test]
fn number_array_round_trip() {
    let options = options_with_i32_vec();
    let values: Vec<i32> = from_slice(b"[1,2,3]", &options).unwrap();
    assert_eq!(values, [1, 2, 3]);
    assert_eq!(to_vec(&values, &options).unwrap(), b"[1,2,3]");
}

#[test]
fn unicode_escapes_decode_to_utf8() {
    let options = Arc::new(SerializerOptions::new());
    let text: String = from_slice(br#""a\u0041\u00e9b""#, &options).unwrap();
    assert_eq!(text, "aAéb");
    assert_eq!(text.as_bytes(), [0x61, 0x41, 0xC3, 0xA9, 0x62]);
}

#[derive(Clone, Default, PartialEq, Debug)]
struct Point {
    x: i64,
    y: Option<i64>,
}

fn point_options() -> Arc<SerializerOptions> {
    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Nullable(NullableShape::of::<i64>()))
        .unwrap();
    options
        .register_class(
            ClassShape::of::<Point>()
                .constructor(Point::default)
                .property("x", |p: &Point| p.x, |p, v| p.x = v)
                .property("y", |p: &Point| p.y, |p, v| p.y = v),
        )
        .unwrap();
    options
}

#[test]
fn chunked_object_matches_one_shot() {
    let options = point_options();

    let whole: Point = from_slice(br#"{"x":1234,"y":null}"#, &options).unwrap();
    assert_eq!(whole, Point { x: 1234, y: None });

    // The same document fed as two chunks, split inside the number.
    let mut driver = Deserializer::new(crate::descriptor::TypeRef::of::<Point>(), &options).unwrap();
    assert!(driver.feed(br#"{"x":12"#).unwrap().is_none());
    let value = driver.finish(br#"34,"y":null}"#).unwrap();
    let chunked = *value.downcast::<Point>().unwrap();
    assert_eq!(chunked, whole);
}

#[test]
fn trailing_comma_error_carries_element_path() {
    let options = options_with_i32_vec();
    let err = from_slice::<Vec<i32>>(b"[1,]", &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Structural(StructuralError::TrailingComma)
    );
    assert_eq!(err.path(), Some("$[1]"));

    let lenient = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_allow_trailing_commas(true).unwrap();
        o
    });
    lenient
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
        .unwrap();
    let values: Vec<i32> = from_slice(b"[1,]", &lenient).unwrap();
    assert_eq!(values, [1]);
}

#[test]
fn depth_cap_fails_at_sixty_five() {
    let options = Arc::new(SerializerOptions::new());
    let mut payload = Vec::new();
    payload.resize(100, b'[');
    let err = from_slice::<JsonValue>(&payload, &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Structural(StructuralError::DepthExceeded(64))
    );
}

#[test]
fn comment_handling_modes() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct One {
        a: i64,
    }
    let shape = || {
        ClassShape::of::<One>()
            .constructor(One::default)
            .property("a", |o: &One| o.a, |o, v| o.a = v)
    };
    let payload = br#"{/*c*/"a":1}"#;

    let strict = Arc::new(SerializerOptions::new());
    strict.register_class(shape()).unwrap();
    let err = from_slice::<One>(payload, &strict).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Structural(StructuralError::CommentNotAllowed)
    );

    for mode in [CommentHandling::Skip, CommentHandling::Allow] {
        let lenient = Arc::new({
            let mut o = SerializerOptions::new();
            o.set_read_comment_handling(mode).unwrap();
            o
        });
        lenient.register_class(shape()).unwrap();
        let one: One = from_slice(payload, &lenient).unwrap();
        assert_eq!(one, One { a: 1 }, "{mode:?}");
    }
}

#[test]
fn json_value_round_trip() {
    let options = Arc::new(SerializerOptions::new());
    let payload = br#"{"s":"hi","n":1.5,"big":18446744073709551615,"list":[true,null]}"#;
    let value: JsonValue = from_slice(payload, &options).unwrap();
    let map = value.as_object().unwrap();
    assert_eq!(map["n"], JsonValue::Number(Number::Float(1.5)));
    assert_eq!(map["big"], JsonValue::Number(Number::UInt(u64::MAX)));
    assert_eq!(to_vec(&value, &options).unwrap(), payload.to_vec());
}

#[test]
fn writer_and_reader_agree_on_indented_output() {
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_write_indented(true).unwrap();
        o
    });
    let point_opts = point_options();
    let point: Point = from_slice(br#"{"x":7,"y":2}"#, &point_opts).unwrap();
    // Shapes live in their own options instance; register them here too.
    options
        .register_type(TypeShape::Nullable(NullableShape::of::<i64>()))
        .unwrap();
    options
        .register_class(
            ClassShape::of::<Point>()
                .constructor(Point::default)
                .property("x", |p: &Point| p.x, |p, v| p.x = v)
                .property("y", |p: &Point| p.y, |p, v| p.y = v),
        )
        .unwrap();
    let pretty = to_vec(&point, &options).unwrap();
    insta::assert_snapshot!(String::from_utf8(pretty.clone()).unwrap(), @r#"
    {
      "x": 7,
      "y": 2
    }
    "#);
    // Emitted output parses back to the same value.
    let back: Point = from_slice(&pretty, &options).unwrap();
    assert_eq!(back, point);
}
