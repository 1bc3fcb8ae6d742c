//! Mapping-engine behavior: descriptors, converter precedence, extension
//! data, policies, and resumable drivers.

use std::any::Any;
use std::sync::Arc;

use crate::{
    convert::{Converter, ReadOutcome},
    descriptor::{
        ClassShape, CollectionShape, DictionaryShape, EnumShape, KeyValueShape, NullableShape,
        TypeRef, TypeShape,
    },
    engine::{from_slice, to_vec, Deserializer, Serializer},
    error::{ConfigurationError, ConversionError, ErrorKind},
    options::{ExtensionDataConflict, NamingPolicy, SerializerOptions},
    reader::{JsonReader, TokenType},
    value::{JsonValue, Map, Number},
    writer::JsonWriter,
};

#[derive(Clone, Default, PartialEq, Debug)]
struct Order {
    id: i64,
    label: String,
    extra: Map,
}

fn order_shape() -> ClassShape {
    ClassShape::of::<Order>()
        .constructor(Order::default)
        .property("id", |o: &Order| o.id, |o, v| o.id = v)
        .property("label", |o: &Order| o.label.clone(), |o, v| o.label = v)
        .extension_data(|o: &Order| &o.extra, |o| &mut o.extra)
}

fn order_options() -> Arc<SerializerOptions> {
    let options = Arc::new(SerializerOptions::new());
    options.register_class(order_shape()).unwrap();
    options
}

#[test]
fn extension_member_absorbs_unknown_properties() {
    let options = order_options();
    let order: Order =
        from_slice(br#"{"id":1,"surprise":[1,2],"label":"x","deep":{"a":true}}"#, &options)
            .unwrap();
    assert_eq!(order.id, 1);
    assert_eq!(order.label, "x");
    assert_eq!(order.extra.len(), 2);
    assert!(matches!(order.extra["surprise"], JsonValue::Array(_)));
    assert!(matches!(order.extra["deep"], JsonValue::Object(_)));

    // Extension data is written back after the declared members.
    let bytes = to_vec(&order, &options).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with(r#"{"id":1,"label":"x""#), "{text}");
    assert!(text.contains(r#""surprise":[1,2]"#), "{text}");
}

#[test]
fn duplicate_declared_property_last_wins() {
    let options = order_options();
    let order: Order = from_slice(br#"{"id":1,"label":"a","id":2}"#, &options).unwrap();
    assert_eq!(order.id, 2);
    // The extension member never receives duplicates of declared names.
    assert!(order.extra.is_empty());
}

#[test]
fn extension_conflict_knob() {
    // The constructor seeds the extension map with a key that is also a
    // declared member name. The knob decides whether that entry survives
    // population.
    fn seeded_shape() -> ClassShape {
        ClassShape::of::<Order>()
            .constructor(|| {
                let mut extra = Map::new();
                extra.insert("id".into(), JsonValue::Null);
                extra.insert("note".into(), JsonValue::Null);
                Order {
                    extra,
                    ..Order::default()
                }
            })
            .property("id", |o: &Order| o.id, |o, v| o.id = v)
            .property("label", |o: &Order| o.label.clone(), |o, v| o.label = v)
            .extension_data(|o: &Order| &o.extra, |o| &mut o.extra)
    }

    let pruning = Arc::new(SerializerOptions::new());
    pruning.register_class(seeded_shape()).unwrap();
    assert_eq!(
        pruning.extension_data_conflict(),
        ExtensionDataConflict::DeclaredMemberWins
    );
    let order: Order = from_slice(br#"{"id":1}"#, &pruning).unwrap();
    assert_eq!(order.id, 1);
    assert!(!order.extra.contains_key("id"));
    assert!(order.extra.contains_key("note"));

    let keeping = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_extension_data_conflict(ExtensionDataConflict::Keep).unwrap();
        o
    });
    keeping.register_class(seeded_shape()).unwrap();
    let order: Order = from_slice(br#"{"id":1}"#, &keeping).unwrap();
    assert!(order.extra.contains_key("id"));
    assert!(order.extra.contains_key("note"));
}

#[test]
fn unknown_properties_skipped_without_extension_member() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Lean {
        id: i64,
    }
    let options = Arc::new(SerializerOptions::new());
    options
        .register_class(
            ClassShape::of::<Lean>()
                .constructor(Lean::default)
                .property("id", |l: &Lean| l.id, |l, v| l.id = v),
        )
        .unwrap();
    let lean: Lean =
        from_slice(br#"{"noise":{"deep":[1,{"x":2}]},"id":9,"more":"s"}"#, &options).unwrap();
    assert_eq!(lean.id, 9);
}

#[test]
fn camel_case_policy_round_trip() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Styled {
        first_value: i64,
    }
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_property_naming_policy(NamingPolicy::CamelCase).unwrap();
        o
    });
    options
        .register_class(
            ClassShape::of::<Styled>()
                .constructor(Styled::default)
                .property("FirstValue", |s: &Styled| s.first_value, |s, v| {
                    s.first_value = v;
                }),
        )
        .unwrap();
    let styled: Styled = from_slice(br#"{"firstValue":5}"#, &options).unwrap();
    assert_eq!(styled.first_value, 5);
    assert_eq!(to_vec(&styled, &options).unwrap(), br#"{"firstValue":5}"#);
}

#[test]
fn case_insensitive_matching_is_opt_in() {
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_property_name_case_insensitive(true).unwrap();
        o
    });
    options.register_class(order_shape()).unwrap();
    let order: Order = from_slice(br#"{"ID":3,"LABEL":"up"}"#, &options).unwrap();
    assert_eq!(order.id, 3);
    assert_eq!(order.label, "up");

    let strict = order_options();
    let order: Order = from_slice(br#"{"ID":3}"#, &strict).unwrap();
    // Without the option the name mismatches and lands in extension data.
    assert_eq!(order.id, 0);
    assert_eq!(order.extra["ID"], JsonValue::Number(Number::Int(3)));
}

#[test]
fn nullable_members_and_null_skipping() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Form {
        note: Option<String>,
    }
    let build = || {
        ClassShape::of::<Form>()
            .constructor(Form::default)
            .property("note", |f: &Form| f.note.clone(), |f, v| f.note = v)
    };

    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Nullable(NullableShape::of::<String>()))
        .unwrap();
    options.register_class(build()).unwrap();
    let form: Form = from_slice(br#"{"note":null}"#, &options).unwrap();
    assert_eq!(form.note, None);
    assert_eq!(to_vec(&form, &options).unwrap(), br#"{"note":null}"#);

    let skipping = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_ignore_null_values(true).unwrap();
        o
    });
    skipping
        .register_type(TypeShape::Nullable(NullableShape::of::<String>()))
        .unwrap();
    skipping.register_class(build()).unwrap();
    assert_eq!(to_vec(&form, &skipping).unwrap(), b"{}");
}

#[test]
fn null_into_non_nullable_fails_with_path() {
    let options = order_options();
    let err = from_slice::<Order>(br#"{"id":null}"#, &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Conversion(ConversionError::NullForNonNullable { target: "i64" })
    );
    assert_eq!(err.path(), Some("$.id"));
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Status {
    Active,
    Retired,
}

#[test]
fn enum_names_round_trip() {
    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Enum(
            EnumShape::of::<Status>()
                .variant("Active", Status::Active)
                .variant("Retired", Status::Retired),
        ))
        .unwrap();
    let status: Status = from_slice(br#""Retired""#, &options).unwrap();
    assert_eq!(status, Status::Retired);
    assert_eq!(to_vec(&status, &options).unwrap(), br#""Retired""#);

    let err = from_slice::<Status>(br#""Gone""#, &options).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Conversion(ConversionError::UnknownEnumName(name)) if name == "Gone"
    ));
}

#[test]
fn dictionary_round_trip_with_key_policy() {
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_dictionary_key_policy(NamingPolicy::CamelCase).unwrap();
        o
    });
    options
        .register_type(TypeShape::Dictionary(DictionaryShape::of_index_map::<i64>()))
        .unwrap();
    let map: indexmap::IndexMap<String, i64> =
        from_slice(br#"{"FirstKey":1,"Second":2}"#, &options).unwrap();
    // Keys are stored as read; the policy applies on write.
    assert_eq!(map["FirstKey"], 1);
    assert_eq!(
        to_vec(&map, &options).unwrap(),
        br#"{"firstKey":1,"second":2}"#
    );
}

#[test]
fn key_value_pair_form() {
    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::KeyValue(KeyValueShape::of_pair::<i64>()))
        .unwrap();
    let pair: (String, i64) = from_slice(br#"{"Key":"k","Value":9}"#, &options).unwrap();
    assert_eq!(pair, ("k".to_string(), 9));
    assert_eq!(to_vec(&pair, &options).unwrap(), br#"{"Key":"k","Value":9}"#);

    // Members may arrive in either order.
    let pair: (String, i64) = from_slice(br#"{"Value":9,"Key":"k"}"#, &options).unwrap();
    assert_eq!(pair.0, "k");

    let err = from_slice::<(String, i64)>(br#"{"Key":"k"}"#, &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Conversion(ConversionError::IncompletePair)
    );
}

#[test]
fn nested_collections() {
    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
        .unwrap();
    options
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<Vec<i32>>()))
        .unwrap();
    let grid: Vec<Vec<i32>> = from_slice(b"[[1,2],[],[3]]", &options).unwrap();
    assert_eq!(grid, vec![vec![1, 2], vec![], vec![3]]);
    assert_eq!(to_vec(&grid, &options).unwrap(), b"[[1,2],[],[3]]");
}

#[test]
fn byte_by_byte_feed_matches_one_shot() {
    let options = order_options();
    let payload = br#"{"id":42,"label":"chunky","blob":{"k":[1,2,{"z":null}]}}"#;

    let whole: Order = from_slice(payload, &options).unwrap();

    let mut driver = Deserializer::new(TypeRef::of::<Order>(), &options).unwrap();
    let mut produced = None;
    for (i, byte) in payload.iter().enumerate() {
        let result = if i + 1 == payload.len() {
            Some(driver.finish(&[*byte]).unwrap())
        } else {
            driver.feed(&[*byte]).unwrap()
        };
        if let Some(value) = result {
            produced = Some(value);
        }
    }
    let chunked = *produced.expect("document completed").downcast::<Order>().unwrap();
    assert_eq!(chunked, whole);
}

#[test]
fn write_suspends_at_buffer_high_water_mark() {
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_default_buffer_size(8).unwrap();
        o
    });
    options
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
        .unwrap();
    let values: Vec<i32> = (0..100).collect();

    let mut driver = Serializer::new(TypeRef::of::<Vec<i32>>(), &options).unwrap();
    let mut assembled = Vec::new();
    let mut steps = 0;
    loop {
        let mut sink = Vec::new();
        let done = driver.write_step(&values, &mut sink).unwrap();
        assembled.extend_from_slice(&sink);
        steps += 1;
        if done {
            break;
        }
    }
    assert!(steps > 1, "expected the writer to suspend at least once");

    let one_shot = to_vec(&values, &options).unwrap();
    assert_eq!(assembled, one_shot);
}

#[test]
fn read_only_properties() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Meta {
        id: i64,
    }
    let build = || {
        ClassShape::of::<Meta>()
            .constructor(Meta::default)
            .property("id", |m: &Meta| m.id, |m, v| m.id = v)
            .read_only_property("kind", |_: &Meta| "meta".to_string())
    };

    let options = Arc::new(SerializerOptions::new());
    options.register_class(build()).unwrap();
    let meta = Meta { id: 4 };
    assert_eq!(to_vec(&meta, &options).unwrap(), br#"{"id":4,"kind":"meta"}"#);

    let skipping = Arc::new({
        let mut o = SerializerOptions::new();
        o.set_ignore_read_only_properties(true).unwrap();
        o
    });
    skipping.register_class(build()).unwrap();
    assert_eq!(to_vec(&meta, &skipping).unwrap(), br#"{"id":4}"#);

    // Reading never assigns a read-only member; the payload value is
    // consumed and dropped.
    let meta: Meta = from_slice(br#"{"id":4,"kind":"other"}"#, &options).unwrap();
    assert_eq!(meta.id, 4);
}

#[test]
fn should_serialize_predicate() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Sparse {
        count: i64,
    }
    let options = Arc::new(SerializerOptions::new());
    options
        .register_class(
            ClassShape::of::<Sparse>()
                .constructor(Sparse::default)
                .property("count", |s: &Sparse| s.count, |s, v| s.count = v)
                .with_should_serialize(Arc::new(|value: &dyn Any| {
                    value.downcast_ref::<i64>().is_some_and(|v| *v != 0)
                })),
        )
        .unwrap();
    assert_eq!(to_vec(&Sparse { count: 0 }, &options).unwrap(), b"{}");
    assert_eq!(
        to_vec(&Sparse { count: 2 }, &options).unwrap(),
        br#"{"count":2}"#
    );
}

#[test]
fn missing_constructor_fails() {
    #[derive(Clone, PartialEq, Debug)]
    struct NoCtor {
        id: i64,
    }
    let options = Arc::new(SerializerOptions::new());
    options
        .register_class(
            ClassShape::of::<NoCtor>().property("id", |n: &NoCtor| n.id, |n, v| n.id = v),
        )
        .unwrap();
    let err = from_slice::<NoCtor>(br#"{"id":1}"#, &options).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Configuration(ConfigurationError::MissingConstructor(_))
    ));
}

#[test]
fn unregistered_type_fails() {
    #[derive(Clone, PartialEq, Debug)]
    struct Ghost;
    let options = Arc::new(SerializerOptions::new());
    let err = from_slice::<Ghost>(b"{}", &options).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Configuration(ConfigurationError::MissingDescriptor(_))
    ));
}

#[test]
fn wrong_start_token_for_composite_is_structural() {
    use crate::error::StructuralError;
    use crate::reader::TokenType as Tok;

    let options = Arc::new(SerializerOptions::new());
    options
        .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
        .unwrap();
    let err = from_slice::<Vec<i32>>(b"null", &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Structural(StructuralError::UnexpectedToken(Tok::Null))
    );

    let err = from_slice::<Vec<i32>>(br#"{"a":1}"#, &options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Structural(StructuralError::UnexpectedToken(Tok::StartObject))
    );
}

#[test]
fn conversion_error_carries_member_path() {
    let options = order_options();
    let err = from_slice::<Order>(br#"{"label":{"no":"pe"}}"#, &options).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Conversion(ConversionError::TokenMismatch { .. })
    ));
    assert_eq!(err.path(), Some("$.label"));
}

// -- converter precedence ----------------------------------------------------

/// A converter that reads any value as the fixed marker and writes the
/// marker string, so tests can observe which converter ran.
struct MarkerConverter {
    ty: TypeRef,
    marker: &'static str,
}

impl MarkerConverter {
    fn for_type<T: 'static>(marker: &'static str) -> Arc<Self> {
        Arc::new(Self {
            ty: TypeRef::of::<T>(),
            marker,
        })
    }
}

impl Converter for MarkerConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        _options: &SerializerOptions,
        _stack: &mut crate::engine::ReadStack,
    ) -> crate::error::Result<ReadOutcome> {
        if matches!(reader.token_type(), TokenType::StartObject | TokenType::StartArray) {
            reader.try_skip()?;
        }
        Ok(ReadOutcome::Complete(Box::new(self.marker.to_string())))
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        _value: &dyn Any,
        _options: &SerializerOptions,
        _stack: &mut crate::engine::WriteStack,
    ) -> crate::error::Result<bool> {
        writer.write_string(self.marker)?;
        Ok(true)
    }
}

#[derive(Clone, Default, PartialEq, Debug)]
struct Tagged {
    v: i64,
}

#[test]
fn converter_precedence_is_observable() {
    // Declared (type-attribute) converter only: beats the object fallback.
    let options = Arc::new(SerializerOptions::new());
    options.register_class(ClassShape::of::<Tagged>().constructor(Tagged::default)).unwrap();
    options
        .declare_converter(
            TypeRef::of::<Tagged>(),
            MarkerConverter::for_type::<Tagged>("declared"),
        )
        .unwrap();
    assert_eq!(to_vec(&Tagged::default(), &options).unwrap(), br#""declared""#);

    // A runtime-registered converter beats the declared one.
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.push_converter(MarkerConverter::for_type::<Tagged>("user")).unwrap();
        o
    });
    options.register_class(ClassShape::of::<Tagged>().constructor(Tagged::default)).unwrap();
    options
        .declare_converter(
            TypeRef::of::<Tagged>(),
            MarkerConverter::for_type::<Tagged>("declared"),
        )
        .unwrap();
    assert_eq!(to_vec(&Tagged::default(), &options).unwrap(), br#""user""#);

    // Earlier user registrations win over later ones.
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.push_converter(MarkerConverter::for_type::<Tagged>("first")).unwrap();
        o.push_converter(MarkerConverter::for_type::<Tagged>("second")).unwrap();
        o
    });
    options.register_class(ClassShape::of::<Tagged>().constructor(Tagged::default)).unwrap();
    assert_eq!(to_vec(&Tagged::default(), &options).unwrap(), br#""first""#);

    // A member-level converter beats even the user registration.
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Holder {
        tagged: Tagged,
    }
    let options = Arc::new({
        let mut o = SerializerOptions::new();
        o.push_converter(MarkerConverter::for_type::<Tagged>("user")).unwrap();
        o
    });
    options
        .register_class(
            ClassShape::of::<Holder>()
                .constructor(Holder::default)
                .property("tagged", |h: &Holder| h.tagged.clone(), |h, v| h.tagged = v)
                .with_member_converter(MarkerConverter::for_type::<Tagged>("member")),
        )
        .unwrap();
    assert_eq!(
        to_vec(&Holder::default(), &options).unwrap(),
        br#"{"tagged":"member"}"#
    );
}

#[test]
fn options_freeze_on_first_use() {
    let mut options = SerializerOptions::new();
    options.set_write_indented(false).unwrap();
    let shared = Arc::new(options);
    shared.register_class(order_shape()).unwrap();

    let _: Order = from_slice(br#"{"id":1}"#, &shared).unwrap();
    assert!(shared.is_frozen());

    // Catalog and converter list are closed now.
    let err = shared.register_class(ClassShape::of::<Tagged>()).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Configuration(ConfigurationError::OptionsFrozen)
    ));
    let err = shared
        .declare_converter(
            TypeRef::of::<Tagged>(),
            MarkerConverter::for_type::<Tagged>("late"),
        )
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Configuration(ConfigurationError::OptionsFrozen)
    ));

    // Repeated first uses are consistent: the same document parses the same
    // way after the freeze.
    let again: Order = from_slice(br#"{"id":1}"#, &shared).unwrap();
    assert_eq!(again.id, 1);
}

#[test]
fn dynamic_members_write_their_actual_shape() {
    #[derive(Clone, Default, PartialEq, Debug)]
    struct Carrier;
    let options = Arc::new(SerializerOptions::new());
    options
        .register_class(
            ClassShape::of::<Carrier>()
                .constructor(Carrier::default)
                .read_only_property("payload", |_: &Carrier| {
                    JsonValue::Number(Number::Int(5))
                }),
        )
        .unwrap();
    let bytes = to_vec(&Carrier, &options).unwrap();
    assert_eq!(bytes, br#"{"payload":5}"#);
}

#[test]
fn runtime_type_resolves_a_fresh_converter() {
    // A serializer declared for JsonValue handed an i64: the engine
    // re-resolves on the runtime type and writes with no discriminator, so
    // reading back into the declared type loses the runtime identity.
    let options = Arc::new(SerializerOptions::new());
    let mut driver = Serializer::new(TypeRef::of::<JsonValue>(), &options).unwrap();
    let mut out = Vec::new();
    let payload: i64 = 5;
    while !driver.write_step(&payload, &mut out).unwrap() {}
    assert_eq!(out, b"5");

    let back: JsonValue = from_slice(&out, &options).unwrap();
    assert_eq!(back, JsonValue::Number(Number::Int(5)));
}
