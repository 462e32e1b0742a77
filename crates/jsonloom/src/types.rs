//! Descriptions of the types typed decoding can produce.
//!
//! A [`TypeDescriptor`] is the metadata the security gate and the binder need
//! about a type: its name, declared fields, supertypes and a few capability
//! markers. Descriptors are immutable and shared as [`TypeRef`].
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// A shared type descriptor.
pub type TypeRef = Arc<TypeDescriptor>;

/// Name of the built-in generic object type.
pub const OBJECT_TYPE: &str = "jsonloom.Object";
/// Name of the built-in generic array type.
pub const ARRAY_TYPE: &str = "jsonloom.Array";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeKind {
    /// Fixed fields, decoded into a [`TypedObject`](crate::TypedObject).
    #[default]
    Bean,
    /// Any keys, decoded into a generic object.
    Map,
    /// Decoded into an array.
    List,
}

/// What a type can do once instantiated, as far as the security gate cares.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Plain,
    /// Loads code by name.
    ClassLoader,
    /// Opens connections to external data sources.
    DataSource,
    /// Opens database cursors.
    RowSet,
}

impl Capability {
    #[must_use]
    pub fn is_dangerous(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// The declared shape of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Any,
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    Double,
    Decimal,
    String,
    Date,
    Bytes,
    List(Box<DeclaredType>),
    /// String keys to values of the given type.
    Map(Box<DeclaredType>),
    /// A registered type, looked up by name.
    Named(Arc<str>),
}

impl DeclaredType {
    #[must_use]
    pub fn list_of(element: DeclaredType) -> Self {
        Self::List(Box::new(element))
    }

    #[must_use]
    pub fn map_of(value: DeclaredType) -> Self {
        Self::Map(Box::new(value))
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::Decimal => f.write_str("decimal"),
            Self::String => f.write_str("string"),
            Self::Date => f.write_str("date"),
            Self::Bytes => f.write_str("bytes"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Map(value) => write!(f, "map<{value}>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: Arc<str>,
    declared: DeclaredType,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: &str, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
        }
    }

    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[must_use]
    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }
}

/// Metadata about a decodable type.
///
/// # Examples
///
/// ```
/// use jsonloom::{DeclaredType, TypeDescriptor};
///
/// let point = TypeDescriptor::builder("demo.Point")
///     .field("x", DeclaredType::Int)
///     .field("y", DeclaredType::Int)
///     .supertype("demo.Shape")
///     .build();
/// assert!(point.field("x").is_some());
/// assert!(point.is_assignable_to_name("demo.Shape"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: Arc<str>,
    kind: TypeKind,
    fields: Vec<FieldDescriptor>,
    supertypes: Vec<Arc<str>>,
    auto_type_eligible: bool,
    creator: bool,
    capability: Capability,
    marker: bool,
}

impl TypeDescriptor {
    #[must_use]
    pub fn builder(name: &str) -> TypeBuilder {
        TypeBuilder {
            descriptor: Self {
                name: name.into(),
                kind: TypeKind::Bean,
                fields: Vec::new(),
                supertypes: Vec::new(),
                auto_type_eligible: false,
                creator: false,
                capability: Capability::Plain,
                marker: false,
            },
        }
    }

    /// The built-in generic object type.
    #[must_use]
    pub fn object() -> TypeRef {
        Self::builder(OBJECT_TYPE).kind(TypeKind::Map).build()
    }

    /// The built-in generic array type.
    #[must_use]
    pub fn array() -> TypeRef {
        Self::builder(ARRAY_TYPE).kind(TypeKind::List).build()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    #[must_use]
    pub fn supertypes(&self) -> &[Arc<str>] {
        &self.supertypes
    }

    /// Whether the type's own metadata opts into auto-type loading.
    #[must_use]
    pub fn is_auto_type_eligible(&self) -> bool {
        self.auto_type_eligible
    }

    /// Whether instances are built through an explicit creator rather than a
    /// zero-argument constructor.
    #[must_use]
    pub fn has_creator(&self) -> bool {
        self.creator
    }

    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Whether this is a marker type that carries no expectation, such as a
    /// serialization marker. Marker expected types do not enable loading.
    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.marker
    }

    #[must_use]
    pub fn is_assignable_to_name(&self, name: &str) -> bool {
        &*self.name == name || self.supertypes.iter().any(|s| &**s == name)
    }

    /// Whether a value of this type may stand where `expected` is declared.
    ///
    /// Every map-kind type accepts every other map-kind type.
    #[must_use]
    pub fn is_assignable_to(&self, expected: &TypeDescriptor) -> bool {
        (self.kind == TypeKind::Map && expected.kind == TypeKind::Map)
            || self.is_assignable_to_name(&expected.name)
    }
}

pub struct TypeBuilder {
    descriptor: TypeDescriptor,
}

impl TypeBuilder {
    #[must_use]
    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.descriptor.kind = kind;
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, declared: DeclaredType) -> Self {
        self.descriptor
            .fields
            .push(FieldDescriptor::new(name, declared));
        self
    }

    #[must_use]
    pub fn supertype(mut self, name: &str) -> Self {
        self.descriptor.supertypes.push(name.into());
        self
    }

    #[must_use]
    pub fn auto_type_eligible(mut self) -> Self {
        self.descriptor.auto_type_eligible = true;
        self
    }

    #[must_use]
    pub fn creator(mut self) -> Self {
        self.descriptor.creator = true;
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.descriptor.capability = capability;
        self
    }

    #[must_use]
    pub fn marker(mut self) -> Self {
        self.descriptor.marker = true;
        self
    }

    #[must_use]
    pub fn build(self) -> TypeRef {
        Arc::new(self.descriptor)
    }
}

/// Resolves type names to descriptors.
///
/// The security gate calls [`TypeLoader::load`] only after a name passed its
/// checks, so implementations may know about types that must never be
/// decoded from untrusted input.
pub trait TypeLoader: Send + Sync + fmt::Debug {
    fn load(&self, name: &str) -> Option<TypeRef>;

    /// Whether `name` opts into auto-type loading without being loaded first.
    fn is_auto_type_eligible(&self, name: &str) -> bool {
        let _ = name;
        false
    }
}

/// A thread-safe name-to-descriptor map.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<Arc<str>, TypeRef>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in object and array types.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(TypeDescriptor::object());
        registry.register(TypeDescriptor::array());
        registry
    }

    /// Adds or replaces a type under its own name.
    pub fn register(&self, ty: TypeRef) {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ty.name.clone(), ty);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeLoader for TypeRegistry {
    fn load(&self, name: &str) -> Option<TypeRef> {
        self.get(name)
    }

    fn is_auto_type_eligible(&self, name: &str) -> bool {
        self.get(name).is_some_and(|t| t.is_auto_type_eligible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_kinds_are_mutually_assignable() {
        let custom = TypeDescriptor::builder("demo.Bag").kind(TypeKind::Map).build();
        assert!(custom.is_assignable_to(&TypeDescriptor::object()));
        assert!(!TypeDescriptor::array().is_assignable_to(&TypeDescriptor::object()));
    }

    #[test]
    fn registry_serves_as_loader() {
        let registry = TypeRegistry::with_builtins();
        registry.register(TypeDescriptor::builder("demo.Open").auto_type_eligible().build());
        assert_eq!(registry.len(), 3);
        assert!(registry.load(OBJECT_TYPE).is_some());
        assert!(registry.is_auto_type_eligible("demo.Open"));
        assert!(!registry.is_auto_type_eligible(ARRAY_TYPE));
        assert!(registry.load("demo.Missing").is_none());
    }

    #[test]
    fn declared_types_display_nested() {
        let declared = DeclaredType::map_of(DeclaredType::list_of(DeclaredType::named("demo.Point")));
        assert_eq!(declared.to_string(), "map<list<demo.Point>>");
    }
}
