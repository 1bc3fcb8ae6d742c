//! Type descriptors: the metadata the mapping engine runs on.
//!
//! The engine never inspects Rust types itself. Callers (or a code
//! generator) register a [`TypeShape`] per type in a [`TypeCatalog`]: the
//! member table of an object, the element type of a collection, the variant
//! names of an enum, and the thunks that construct, get, and set values.
//! Values travel the engine as `Box<dyn Any>`; every thunk bridges between
//! that dynamic representation and the concrete type it was built for.
//!
//! [`ClassInfo`] is the engine-facing compiled form of an object shape:
//! names run through the naming policy, UTF-8 and pre-escaped name bytes
//! cached, and a sort index built for binary-search lookup.

use std::{
    any::{Any, TypeId},
    sync::{Arc, OnceLock},
};

use crate::{
    convert::Converter,
    error::{ConfigurationError, Error, Result},
    escape::{self, Escaper},
    options::SerializerOptions,
    value::{JsonValue, Map},
};

/// A runtime type handle plus its human-readable name for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeRef {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeRef {
    /// The handle for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for TypeRef {}

pub(crate) type Ctor = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;
pub(crate) type Getter = Arc<dyn Fn(&dyn Any) -> Box<dyn Any> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, Box<dyn Any>) + Send + Sync>;
pub(crate) type Predicate = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// How a type maps to and from JSON.
pub enum TypeShape {
    Nullable(NullableShape),
    Enum(EnumShape),
    KeyValue(KeyValueShape),
    Collection(CollectionShape),
    Dictionary(DictionaryShape),
    Object(ClassShape),
}

impl TypeShape {
    pub(crate) fn ty(&self) -> TypeRef {
        match self {
            Self::Nullable(s) => s.ty,
            Self::Enum(s) => s.ty,
            Self::KeyValue(s) => s.ty,
            Self::Collection(s) => s.ty,
            Self::Dictionary(s) => s.ty,
            Self::Object(s) => s.ty,
        }
    }
}

/// `Option<T>`-like types: JSON `null` or the inner value.
pub struct NullableShape {
    pub(crate) ty: TypeRef,
    pub(crate) inner: TypeRef,
    /// Builds the nullable from an inner value (or from null).
    pub(crate) wrap: Arc<dyn Fn(Option<Box<dyn Any>>) -> Box<dyn Any> + Send + Sync>,
    /// Projects the inner value out for writing; `None` when null.
    pub(crate) project: Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>,
}

impl NullableShape {
    /// Shape for `Option<T>`.
    #[must_use]
    pub fn of<T: Clone + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<Option<T>>(),
            inner: TypeRef::of::<T>(),
            wrap: Arc::new(|inner| match inner {
                Some(boxed) => match boxed.downcast::<T>() {
                    Ok(v) => Box::new(Some(*v)),
                    Err(_) => Box::new(None::<T>),
                },
                None => Box::new(None::<T>),
            }),
            project: Arc::new(|value| {
                value
                    .downcast_ref::<Option<T>>()
                    .and_then(|opt| opt.as_ref())
                    .map(|v| Box::new(v.clone()) as Box<dyn Any>)
            }),
        }
    }
}

/// A string-named enum variant.
pub struct EnumVariant {
    pub(crate) name: String,
    pub(crate) make: Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>,
    pub(crate) matches: Predicate,
}

/// Unit enums serialized as their variant name.
pub struct EnumShape {
    pub(crate) ty: TypeRef,
    pub(crate) variants: Vec<EnumVariant>,
}

impl EnumShape {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            variants: Vec::new(),
        }
    }

    /// Adds a variant under `name`.
    #[must_use]
    pub fn variant<T: Clone + PartialEq + Send + Sync + 'static>(
        mut self,
        name: &str,
        value: T,
    ) -> Self {
        let probe = value.clone();
        self.variants.push(EnumVariant {
            name: name.to_owned(),
            make: Arc::new(move || Box::new(value.clone())),
            matches: Arc::new(move |v| v.downcast_ref::<T>() == Some(&probe)),
        });
        self
    }
}

/// A two-member `{key, value}` pair.
pub struct KeyValueShape {
    pub(crate) ty: TypeRef,
    pub(crate) value: TypeRef,
    pub(crate) split: Arc<dyn Fn(&dyn Any) -> (String, Box<dyn Any>) + Send + Sync>,
    pub(crate) join: Arc<dyn Fn(String, Box<dyn Any>) -> Box<dyn Any> + Send + Sync>,
}

impl KeyValueShape {
    /// Shape for `(String, V)` tuples.
    #[must_use]
    pub fn of_pair<V: Clone + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<(String, V)>(),
            value: TypeRef::of::<V>(),
            split: Arc::new(|value| {
                value.downcast_ref::<(String, V)>().map_or_else(
                    || (String::new(), Box::new(()) as Box<dyn Any>),
                    |(k, v)| (k.clone(), Box::new(v.clone()) as Box<dyn Any>),
                )
            }),
            join: Arc::new(|key, value| match value.downcast::<V>() {
                Ok(v) => Box::new((key, *v)) as Box<dyn Any>,
                Err(other) => other,
            }),
        }
    }
}

type Finish = Arc<dyn Fn(Vec<Box<dyn Any>>) -> Result<Box<dyn Any>> + Send + Sync>;
type EntryFinish =
    Arc<dyn Fn(Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>> + Send + Sync>;

/// Sequence types. Elements are collected into a working list during read
/// and converted into the concrete collection by `finish`.
pub struct CollectionShape {
    pub(crate) ty: TypeRef,
    pub(crate) element: TypeRef,
    pub(crate) finish: Finish,
    pub(crate) elements: Arc<dyn Fn(&dyn Any) -> Vec<Box<dyn Any>> + Send + Sync>,
}

impl CollectionShape {
    /// Shape for `Vec<T>`.
    #[must_use]
    pub fn of_vec<T: Clone + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<Vec<T>>(),
            element: TypeRef::of::<T>(),
            finish: Arc::new(|items| {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.downcast::<T>() {
                        Ok(v) => out.push(*v),
                        Err(_) => {
                            return Err(mismatch::<Vec<T>>());
                        }
                    }
                }
                Ok(Box::new(out))
            }),
            elements: Arc::new(|value| {
                value.downcast_ref::<Vec<T>>().map_or_else(Vec::new, |v| {
                    v.iter()
                        .map(|item| Box::new(item.clone()) as Box<dyn Any>)
                        .collect()
                })
            }),
        }
    }
}

/// String-keyed mapping types.
pub struct DictionaryShape {
    pub(crate) ty: TypeRef,
    pub(crate) value: TypeRef,
    pub(crate) finish: EntryFinish,
    pub(crate) entries: Arc<dyn Fn(&dyn Any) -> Vec<(String, Box<dyn Any>)> + Send + Sync>,
}

impl DictionaryShape {
    /// Shape for `indexmap::IndexMap<String, V>`.
    #[must_use]
    pub fn of_index_map<V: Clone + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<indexmap::IndexMap<String, V>>(),
            value: TypeRef::of::<V>(),
            finish: Arc::new(|entries| {
                let mut out = indexmap::IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    match value.downcast::<V>() {
                        Ok(v) => {
                            // Last one wins on duplicate keys.
                            out.insert(key, *v);
                        }
                        Err(_) => return Err(mismatch::<indexmap::IndexMap<String, V>>()),
                    }
                }
                Ok(Box::new(out))
            }),
            entries: Arc::new(|value| {
                value
                    .downcast_ref::<indexmap::IndexMap<String, V>>()
                    .map_or_else(Vec::new, |map| {
                        map.iter()
                            .map(|(k, v)| (k.clone(), Box::new(v.clone()) as Box<dyn Any>))
                            .collect()
                    })
            }),
        }
    }

    /// Shape for `std::collections::HashMap<String, V>`.
    #[must_use]
    pub fn of_hash_map<V: Clone + 'static>() -> Self {
        use std::collections::HashMap;
        Self {
            ty: TypeRef::of::<HashMap<String, V>>(),
            value: TypeRef::of::<V>(),
            finish: Arc::new(|entries| {
                let mut out = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    match value.downcast::<V>() {
                        Ok(v) => {
                            out.insert(key, *v);
                        }
                        Err(_) => return Err(mismatch::<HashMap<String, V>>()),
                    }
                }
                Ok(Box::new(out))
            }),
            entries: Arc::new(|value| {
                value
                    .downcast_ref::<HashMap<String, V>>()
                    .map_or_else(Vec::new, |map| {
                        map.iter()
                            .map(|(k, v)| (k.clone(), Box::new(v.clone()) as Box<dyn Any>))
                            .collect()
                    })
            }),
        }
    }
}

fn mismatch<T: 'static>() -> Error {
    Error::detached(ConfigurationError::ConverterTypeMismatch {
        converts: "mapped element",
        requested: core::any::type_name::<T>(),
    })
}

/// One declared member of an object shape.
pub struct PropertyDef {
    pub(crate) name: String,
    pub(crate) member_type: TypeRef,
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Setter>,
    pub(crate) should_serialize: Option<Predicate>,
    pub(crate) converter: Option<Arc<dyn Converter>>,
    pub(crate) ignored: bool,
}

/// Extension-data thunks: the catch-all member absorbing unknown properties.
pub(crate) struct ExtensionHooks {
    pub(crate) insert: Arc<dyn Fn(&mut dyn Any, String, JsonValue) + Send + Sync>,
    pub(crate) remove: Arc<dyn Fn(&mut dyn Any, &str) + Send + Sync>,
    pub(crate) entries: Arc<dyn Fn(&dyn Any) -> Vec<(String, JsonValue)> + Send + Sync>,
}

/// The declared member table of an object type.
pub struct ClassShape {
    pub(crate) ty: TypeRef,
    pub(crate) ctor: Option<Ctor>,
    pub(crate) properties: Vec<PropertyDef>,
    pub(crate) extension: Option<ExtensionHooks>,
    pub(crate) extension_declared_twice: bool,
}

impl ClassShape {
    /// An empty shape for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            ctor: None,
            properties: Vec::new(),
            extension: None,
            extension_declared_twice: false,
        }
    }

    /// Registers the constructor used to create instances during read.
    #[must_use]
    pub fn constructor<T: 'static>(mut self, make: fn() -> T) -> Self {
        self.ctor = Some(Arc::new(move || Box::new(make())));
        self
    }

    /// Adds a read-write property.
    #[must_use]
    pub fn property<T: 'static, V: 'static>(
        self,
        name: &str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.push_property(name, Some(get), Some(set))
    }

    /// Adds a property that is serialized but never populated.
    #[must_use]
    pub fn read_only_property<T: 'static, V: 'static>(self, name: &str, get: fn(&T) -> V) -> Self {
        self.push_property::<T, V>(name, Some(get), None)
    }

    fn push_property<T: 'static, V: 'static>(
        mut self,
        name: &str,
        get: Option<fn(&T) -> V>,
        set: Option<fn(&mut T, V)>,
    ) -> Self {
        let getter: Option<Getter> = get.map(|get| {
            Arc::new(move |obj: &dyn Any| {
                obj.downcast_ref::<T>()
                    .map_or_else(|| Box::new(()) as Box<dyn Any>, |t| Box::new(get(t)) as _)
            }) as Getter
        });
        let setter: Option<Setter> = set.map(|set| {
            Arc::new(move |obj: &mut dyn Any, value: Box<dyn Any>| {
                if let (Some(t), Ok(v)) = (obj.downcast_mut::<T>(), value.downcast::<V>()) {
                    set(t, *v);
                }
            }) as Setter
        });
        self.properties.push(PropertyDef {
            name: name.to_owned(),
            member_type: TypeRef::of::<V>(),
            getter,
            setter,
            should_serialize: None,
            converter: None,
            ignored: false,
        });
        self
    }

    /// Attaches a member-level converter to the most recently added property.
    #[must_use]
    pub fn with_member_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        if let Some(last) = self.properties.last_mut() {
            last.converter = Some(converter);
        }
        self
    }

    /// Attaches a serialize predicate to the most recently added property.
    /// The predicate receives the member value.
    #[must_use]
    pub fn with_should_serialize(mut self, predicate: Predicate) -> Self {
        if let Some(last) = self.properties.last_mut() {
            last.should_serialize = Some(predicate);
        }
        self
    }

    /// Marks the most recently added property as ignored.
    #[must_use]
    pub fn ignore(mut self) -> Self {
        if let Some(last) = self.properties.last_mut() {
            last.ignored = true;
        }
        self
    }

    /// Designates the extension-data member: an order-preserving
    /// `String -> JsonValue` map that absorbs unknown properties. At most one
    /// may be declared.
    #[must_use]
    pub fn extension_data<T: 'static>(
        mut self,
        get: fn(&T) -> &Map,
        get_mut: fn(&mut T) -> &mut Map,
    ) -> Self {
        if self.extension.is_some() {
            self.extension_declared_twice = true;
            return self;
        }
        self.extension = Some(ExtensionHooks {
            insert: Arc::new(move |obj, key, value| {
                if let Some(t) = obj.downcast_mut::<T>() {
                    get_mut(t).insert(key, value);
                }
            }),
            remove: Arc::new(move |obj, key| {
                if let Some(t) = obj.downcast_mut::<T>() {
                    get_mut(t).shift_remove(key);
                }
            }),
            entries: Arc::new(move |obj| {
                obj.downcast_ref::<T>().map_or_else(Vec::new, |t| {
                    get(t).iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                })
            }),
        });
        self
    }
}

/// Registered shapes, keyed by type. Shared by every (de)serialize that uses
/// the owning options; concurrent reads are lock-free in the common case.
#[derive(Default)]
pub struct TypeCatalog {
    shapes: parking_lot::RwLock<std::collections::HashMap<TypeId, Arc<TypeShape>>>,
    declared: parking_lot::RwLock<std::collections::HashMap<TypeId, Arc<dyn Converter>>>,
}

impl TypeCatalog {
    pub(crate) fn insert_shape(&self, shape: TypeShape) {
        let ty = shape.ty();
        self.shapes.write().insert(ty.id, Arc::new(shape));
    }

    pub(crate) fn insert_declared_converter(&self, ty: TypeRef, converter: Arc<dyn Converter>) {
        self.declared.write().insert(ty.id, converter);
    }

    pub(crate) fn shape(&self, ty: TypeId) -> Option<Arc<TypeShape>> {
        self.shapes.read().get(&ty).cloned()
    }

    pub(crate) fn declared_converter(&self, ty: TypeId) -> Option<Arc<dyn Converter>> {
        self.declared.read().get(&ty).cloned()
    }
}

// -- compiled object metadata ------------------------------------------------

/// Engine-facing compiled property.
pub(crate) struct PropertyInfo {
    pub(crate) declared_name: String,
    /// Policy-transformed UTF-8 name, as it appears on the wire.
    pub(crate) utf8_name: Box<[u8]>,
    /// Quoted and escaped name bytes for the writer fast path.
    pub(crate) escaped_name: Box<[u8]>,
    pub(crate) name_hash: u64,
    pub(crate) member_type: TypeRef,
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Setter>,
    pub(crate) should_serialize: Option<Predicate>,
    pub(crate) converter: Option<Arc<dyn Converter>>,
}

/// Engine-facing compiled object type.
pub(crate) struct ClassInfo {
    pub(crate) ty: TypeRef,
    pub(crate) ctor: Option<Ctor>,
    pub(crate) properties: Box<[PropertyInfo]>,
    sorted: OnceLock<Box<[u16]>>,
    pub(crate) extension: Option<ExtensionHooks>,
}

impl std::fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassInfo").field("ty", &self.ty).finish_non_exhaustive()
    }
}

impl ClassInfo {
    /// Compiles a shape under the given options (naming policy, escaper).
    pub(crate) fn build(shape: &ClassShape, options: &SerializerOptions) -> Result<Arc<Self>> {
        if shape.extension_declared_twice {
            return Err(Error::detached(ConfigurationError::DuplicateExtensionMember(
                shape.ty.name,
            )));
        }
        let mut properties = Vec::with_capacity(shape.properties.len());
        for def in shape.properties.iter().filter(|d| !d.ignored) {
            let wire_name = options.property_naming_policy().apply(&def.name);
            let utf8_name = wire_name.clone().into_bytes().into_boxed_slice();
            let escaped_name = quote_name(&wire_name, options.encoder());
            properties.push(PropertyInfo {
                name_hash: fnv1a(&utf8_name),
                declared_name: def.name.clone(),
                utf8_name,
                escaped_name,
                member_type: def.member_type,
                getter: def.getter.clone(),
                setter: def.setter.clone(),
                should_serialize: def.should_serialize.clone(),
                converter: def.converter.clone(),
            });
        }
        Ok(Arc::new(Self {
            ty: shape.ty,
            ctor: shape.ctor.clone(),
            properties: properties.into_boxed_slice(),
            sorted: OnceLock::new(),
            extension: shape.extension.as_ref().map(|e| ExtensionHooks {
                insert: e.insert.clone(),
                remove: e.remove.clone(),
                entries: e.entries.clone(),
            }),
        }))
    }

    /// Indices of `properties` ordered by wire name, built on first use.
    fn sorted(&self) -> &[u16] {
        self.sorted.get_or_init(|| {
            let mut order: Vec<u16> = (0..self.properties.len() as u16).collect();
            order.sort_by(|&a, &b| {
                self.properties[a as usize]
                    .utf8_name
                    .cmp(&self.properties[b as usize].utf8_name)
            });
            order.into_boxed_slice()
        })
    }

    /// Resolves a wire name to a property index. Checks the caller's ring of
    /// recent matches first, then binary-searches the sorted table and
    /// promotes the hit into the ring.
    pub(crate) fn find_property(
        &self,
        name: &[u8],
        case_insensitive: bool,
        ring: &mut PropertyRing,
    ) -> Option<usize> {
        let hash = fnv1a(name);
        if let Some(idx) = ring.probe(hash, name.len()) {
            if self.properties[idx].utf8_name.as_ref() == name {
                return Some(idx);
            }
        }
        let found = if case_insensitive {
            self.properties
                .iter()
                .position(|p| p.utf8_name.eq_ignore_ascii_case(name))
        } else {
            let sorted = self.sorted();
            sorted
                .binary_search_by(|&i| self.properties[i as usize].utf8_name.as_ref().cmp(name))
                .ok()
                .map(|slot| sorted[slot] as usize)
        };
        if let Some(idx) = found {
            ring.promote(hash, name.len(), idx);
        }
        found
    }
}

/// A small ring of recently matched property entries, keyed by name hash and
/// length. Lives on the frame so each in-flight document has its own.
const RING_SIZE: usize = 8;

#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyRing {
    entries: [(u64, usize, usize); RING_SIZE],
    filled: usize,
    cursor: usize,
}

impl PropertyRing {

    fn probe(&self, hash: u64, len: usize) -> Option<usize> {
        self.entries[..self.filled]
            .iter()
            .find(|&&(h, l, _)| h == hash && l == len)
            .map(|&(_, _, idx)| idx)
    }

    fn promote(&mut self, hash: u64, len: usize, idx: usize) {
        self.entries[self.cursor] = (hash, len, idx);
        self.cursor = (self.cursor + 1) % RING_SIZE;
        self.filled = (self.filled + 1).min(RING_SIZE);
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Builds the quoted, escaped wire form of a property name.
fn quote_name(name: &str, escaper: Escaper) -> Box<[u8]> {
    let mut out = Vec::with_capacity(name.len() + 2);
    out.push(b'"');
    escape::escape_into(name, escaper, &mut out);
    out.push(b'"');
    out.into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{NamingPolicy, SerializerOptions};

    #[derive(Clone, Default, PartialEq, Debug)]
    struct Sample {
        first: i32,
        second_value: String,
    }

    fn sample_shape() -> ClassShape {
        ClassShape::of::<Sample>()
            .constructor(Sample::default)
            .property("first", |s: &Sample| s.first, |s, v| s.first = v)
            .property(
                "second_value",
                |s: &Sample| s.second_value.clone(),
                |s, v| s.second_value = v,
            )
    }

    #[test]
    fn build_caches_wire_names() {
        let options = SerializerOptions::new();
        let info = ClassInfo::build(&sample_shape(), &options).unwrap();
        assert_eq!(info.properties[0].utf8_name.as_ref(), b"first");
        assert_eq!(info.properties[0].escaped_name.as_ref(), b"\"first\"");
    }

    #[test]
    fn camel_case_policy_applies_at_build() {
        let mut options = SerializerOptions::new();
        options.set_property_naming_policy(NamingPolicy::CamelCase).unwrap();
        let shape = ClassShape::of::<Sample>()
            .property("FirstValue", |s: &Sample| s.first, |s, v| s.first = v);
        let info = ClassInfo::build(&shape, &options).unwrap();
        assert_eq!(info.properties[0].utf8_name.as_ref(), b"firstValue");
    }

    #[test]
    fn find_property_uses_ring_then_sorted_table() {
        let options = SerializerOptions::new();
        let info = ClassInfo::build(&sample_shape(), &options).unwrap();
        let mut ring = PropertyRing::default();
        assert_eq!(info.find_property(b"second_value", false, &mut ring), Some(1));
        // Second lookup hits the ring.
        assert_eq!(info.find_property(b"second_value", false, &mut ring), Some(1));
        assert_eq!(info.find_property(b"first", false, &mut ring), Some(0));
        assert_eq!(info.find_property(b"missing", false, &mut ring), None);
    }

    #[test]
    fn case_insensitive_lookup() {
        let options = SerializerOptions::new();
        let info = ClassInfo::build(&sample_shape(), &options).unwrap();
        let mut ring = PropertyRing::default();
        assert_eq!(info.find_property(b"FIRST", true, &mut ring), Some(0));
        assert_eq!(info.find_property(b"FIRST", false, &mut ring), None);
    }

    #[test]
    fn duplicate_extension_member_rejected() {
        #[derive(Default)]
        struct WithExt {
            extra: crate::value::Map,
        }
        let shape = ClassShape::of::<WithExt>()
            .extension_data(|s: &WithExt| &s.extra, |s| &mut s.extra)
            .extension_data(|s: &WithExt| &s.extra, |s| &mut s.extra);
        let options = SerializerOptions::new();
        let err = ClassInfo::build(&shape, &options).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::ErrorKind::Configuration(ConfigurationError::DuplicateExtensionMember(_))
        ));
    }
}
