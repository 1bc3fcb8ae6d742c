//! Serializer options.
//!
//! A [`SerializerOptions`] value collects the converter list, the type
//! catalog, naming policies, and document limits. Options freeze on first
//! (de)serialize: the converter list and catalog become immutable, and every
//! later mutation attempt fails with a configuration error. Frozen options
//! also own the process-lifetime caches of compiled class metadata and
//! resolved converters, which are safe for concurrent readers.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use parking_lot::RwLock;

use crate::{
    convert::Converter,
    descriptor::{ClassInfo, ClassShape, TypeCatalog, TypeRef, TypeShape},
    error::{ConfigurationError, Error, Result},
    escape::Escaper,
    reader::{CommentHandling, ReaderOptions},
    writer::WriterOptions,
};

/// Transforms declared member names into wire names.
#[derive(Clone, Default)]
pub enum NamingPolicy {
    /// Wire names equal declared names.
    #[default]
    Identity,
    /// `FirstValue` becomes `firstValue`; a leading acronym run is
    /// lowercased as a unit (`IOStream` becomes `ioStream`).
    CamelCase,
    /// Caller-supplied transform.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl core::fmt::Debug for NamingPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::CamelCase => f.write_str("CamelCase"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl NamingPolicy {
    /// Applies the policy to a declared name.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Identity => name.to_owned(),
            Self::CamelCase => camel_case(name),
            Self::Custom(f) => f(name),
        }
    }
}

fn camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            // Lowercase the leading uppercase run, but keep the last capital
            // of the run when it starts a new word.
            if i == 0 || (!next_is_lower && chars[..i].iter().all(|c| c.is_uppercase())) {
                out.extend(ch.to_lowercase());
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// What happens when extension data holds a key that is also a declared
/// member name once population finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionDataConflict {
    /// Entries shadowed by declared members are dropped from the extension
    /// map.
    #[default]
    DeclaredMemberWins,
    /// The extension map keeps whatever it holds.
    Keep,
}

/// Options governing the mapping engine. See the module docs for the freeze
/// contract.
pub struct SerializerOptions {
    converters: RwLock<Vec<Arc<dyn Converter>>>,
    catalog: TypeCatalog,
    property_naming_policy: NamingPolicy,
    property_name_case_insensitive: bool,
    dictionary_key_policy: NamingPolicy,
    ignore_null_values: bool,
    ignore_read_only_properties: bool,
    allow_trailing_commas: bool,
    write_indented: bool,
    max_depth: usize,
    default_buffer_size: usize,
    read_comment_handling: CommentHandling,
    extension_data_conflict: ExtensionDataConflict,
    encoder: Escaper,
    frozen: AtomicBool,
    class_cache: RwLock<HashMap<TypeId, Arc<ClassInfo>>>,
    converter_cache: RwLock<HashMap<TypeId, Arc<dyn Converter>>>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerOptions {
    /// Options with every knob at its default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converters: RwLock::new(Vec::new()),
            catalog: TypeCatalog::default(),
            property_naming_policy: NamingPolicy::Identity,
            property_name_case_insensitive: false,
            dictionary_key_policy: NamingPolicy::Identity,
            ignore_null_values: false,
            ignore_read_only_properties: false,
            allow_trailing_commas: false,
            write_indented: false,
            max_depth: 64,
            default_buffer_size: 16 * 1024,
            read_comment_handling: CommentHandling::Disallow,
            extension_data_conflict: ExtensionDataConflict::default(),
            encoder: Escaper::default(),
            frozen: AtomicBool::new(false),
            class_cache: RwLock::new(HashMap::new()),
            converter_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide default options, frozen on first use.
    pub fn shared_default() -> &'static Arc<SerializerOptions> {
        static DEFAULT: OnceLock<Arc<SerializerOptions>> = OnceLock::new();
        DEFAULT.get_or_init(|| Arc::new(SerializerOptions::new()))
    }

    // -- mutation (rejected once frozen) -------------------------------------

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            Err(Error::detached(ConfigurationError::OptionsFrozen))
        } else {
            Ok(())
        }
    }

    /// Appends a user converter. Earlier registrations win.
    pub fn push_converter(&mut self, converter: Arc<dyn Converter>) -> Result<()> {
        self.ensure_mutable()?;
        self.converters.write().push(converter);
        Ok(())
    }

    /// Registers a type shape in the catalog.
    pub fn register_type(&self, shape: TypeShape) -> Result<()> {
        self.ensure_mutable()?;
        self.catalog.insert_shape(shape);
        Ok(())
    }

    /// Registers an object shape; convenience over [`Self::register_type`].
    pub fn register_class(&self, shape: ClassShape) -> Result<()> {
        self.register_type(TypeShape::Object(shape))
    }

    /// Declares the converter a type carries, taking precedence over
    /// built-ins for that type.
    pub fn declare_converter(&self, ty: TypeRef, converter: Arc<dyn Converter>) -> Result<()> {
        self.ensure_mutable()?;
        self.catalog.insert_declared_converter(ty, converter);
        Ok(())
    }

    pub fn set_property_naming_policy(&mut self, policy: NamingPolicy) -> Result<()> {
        self.ensure_mutable()?;
        self.property_naming_policy = policy;
        Ok(())
    }

    pub fn set_property_name_case_insensitive(&mut self, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.property_name_case_insensitive = value;
        Ok(())
    }

    pub fn set_dictionary_key_policy(&mut self, policy: NamingPolicy) -> Result<()> {
        self.ensure_mutable()?;
        self.dictionary_key_policy = policy;
        Ok(())
    }

    pub fn set_ignore_null_values(&mut self, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.ignore_null_values = value;
        Ok(())
    }

    pub fn set_ignore_read_only_properties(&mut self, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.ignore_read_only_properties = value;
        Ok(())
    }

    pub fn set_allow_trailing_commas(&mut self, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.allow_trailing_commas = value;
        Ok(())
    }

    pub fn set_write_indented(&mut self, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.write_indented = value;
        Ok(())
    }

    pub fn set_max_depth(&mut self, value: usize) -> Result<()> {
        self.ensure_mutable()?;
        self.max_depth = value;
        Ok(())
    }

    pub fn set_default_buffer_size(&mut self, value: usize) -> Result<()> {
        self.ensure_mutable()?;
        self.default_buffer_size = value.max(1);
        Ok(())
    }

    pub fn set_read_comment_handling(&mut self, value: CommentHandling) -> Result<()> {
        self.ensure_mutable()?;
        self.read_comment_handling = value;
        Ok(())
    }

    pub fn set_extension_data_conflict(&mut self, value: ExtensionDataConflict) -> Result<()> {
        self.ensure_mutable()?;
        self.extension_data_conflict = value;
        Ok(())
    }

    pub fn set_encoder(&mut self, value: Escaper) -> Result<()> {
        self.ensure_mutable()?;
        self.encoder = value;
        Ok(())
    }

    // -- accessors -----------------------------------------------------------

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Marks the options immutable. Idempotent; called by every engine entry
    /// point before work starts.
    pub(crate) fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn property_naming_policy(&self) -> &NamingPolicy {
        &self.property_naming_policy
    }

    #[must_use]
    pub fn property_name_case_insensitive(&self) -> bool {
        self.property_name_case_insensitive
    }

    #[must_use]
    pub fn dictionary_key_policy(&self) -> &NamingPolicy {
        &self.dictionary_key_policy
    }

    #[must_use]
    pub fn ignore_null_values(&self) -> bool {
        self.ignore_null_values
    }

    #[must_use]
    pub fn ignore_read_only_properties(&self) -> bool {
        self.ignore_read_only_properties
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn default_buffer_size(&self) -> usize {
        self.default_buffer_size
    }

    #[must_use]
    pub fn extension_data_conflict(&self) -> ExtensionDataConflict {
        self.extension_data_conflict
    }

    #[must_use]
    pub fn encoder(&self) -> Escaper {
        self.encoder
    }

    /// Reader configuration derived from these options.
    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            max_depth: self.max_depth,
            allow_trailing_commas: self.allow_trailing_commas,
            comment_handling: self.read_comment_handling,
        }
    }

    /// Writer configuration derived from these options.
    #[must_use]
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            indented: self.write_indented,
            escaper: self.encoder,
            skip_validation: false,
            max_depth: self.max_depth,
        }
    }

    pub(crate) fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub(crate) fn user_converters(&self) -> Vec<Arc<dyn Converter>> {
        self.converters.read().clone()
    }

    /// Compiled class metadata for a type, built once and cached.
    pub(crate) fn class_info(&self, ty: TypeRef) -> Result<Arc<ClassInfo>> {
        if let Some(info) = self.class_cache.read().get(&ty.id) {
            return Ok(info.clone());
        }
        let Some(shape) = self.catalog.shape(ty.id) else {
            return Err(Error::detached(ConfigurationError::MissingDescriptor(ty.name)));
        };
        let TypeShape::Object(class_shape) = shape.as_ref() else {
            return Err(Error::detached(ConfigurationError::MissingDescriptor(ty.name)));
        };
        let built = ClassInfo::build(class_shape, self)?;
        // Optimistic insert: a racing build produced an equivalent table.
        let mut cache = self.class_cache.write();
        let entry = cache.entry(ty.id).or_insert(built);
        Ok(entry.clone())
    }

    /// Converter cache, populated only once the options are frozen.
    pub(crate) fn cached_converter(&self, ty: TypeId) -> Option<Arc<dyn Converter>> {
        self.converter_cache.read().get(&ty).cloned()
    }

    pub(crate) fn cache_converter(&self, ty: TypeId, converter: Arc<dyn Converter>) {
        if self.is_frozen() {
            self.converter_cache.write().entry(ty).or_insert(converter);
        }
    }
}
