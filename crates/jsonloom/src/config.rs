//! Process-wide parser configuration: the auto-type gate's lists and
//! caches, the type registry and the symbol table.
use std::{
    collections::HashMap,
    env,
    sync::{
        Arc, OnceLock, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::debug;

use crate::{
    options::ParserOptions,
    security::{self, AutoTypeError, HashList},
    symbols::SymbolTable,
    types::{TypeLoader, TypeRef, TypeRegistry},
};

/// Default name of the type-discriminator key.
pub const DEFAULT_TYPE_KEY: &str = "@type";

/// Shared state consulted by every parse that uses it.
///
/// All methods take `&self`; lists and caches only ever grow and are safe to
/// extend while other threads parse.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use jsonloom::{ParserConfig, ParserOptions, TypeDescriptor, TypeRegistry};
///
/// let loader = TypeRegistry::new();
/// loader.register(TypeDescriptor::builder("demo.Point").build());
/// let config = ParserConfig::new().with_loader(Arc::new(loader));
/// config.add_accept("demo.");
/// assert!(config.check_auto_type("demo.Point", None, &ParserOptions::default()).is_ok());
/// ```
#[derive(Debug)]
pub struct ParserConfig {
    safe_mode: AtomicBool,
    auto_type_support: AtomicBool,
    pub(crate) deny: HashList,
    pub(crate) accept: HashList,
    registry: TypeRegistry,
    cache: RwLock<HashMap<Arc<str>, TypeRef>>,
    loader: Option<Arc<dyn TypeLoader>>,
    symbols: SymbolTable,
    type_key: Arc<str>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserConfig {
    /// A configuration with empty lists, the built-in types and no loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            safe_mode: AtomicBool::new(false),
            auto_type_support: AtomicBool::new(false),
            deny: HashList::default(),
            accept: HashList::default(),
            registry: TypeRegistry::with_builtins(),
            cache: RwLock::default(),
            loader: None,
            symbols: SymbolTable::default(),
            type_key: DEFAULT_TYPE_KEY.into(),
        }
    }

    /// The configuration used by the crate-level entry points.
    ///
    /// Built on first use from the environment; see
    /// [`AutoTypeSettings::from_env`].
    pub fn global() -> &'static ParserConfig {
        static GLOBAL: OnceLock<ParserConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }

    /// A fresh configuration with [`AutoTypeSettings::from_env`] applied.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::new();
        AutoTypeSettings::from_env().apply(&config);
        config
    }

    /// Uses `loader` to resolve names the registry does not know.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn TypeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Renames the type-discriminator key.
    #[must_use]
    pub fn with_type_key(mut self, key: &str) -> Self {
        self.type_key = key.into();
        self
    }

    #[must_use]
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    #[must_use]
    pub fn is_safe_mode(&self) -> bool {
        self.safe_mode.load(Ordering::Acquire)
    }

    pub fn set_safe_mode(&self, on: bool) {
        self.safe_mode.store(on, Ordering::Release);
    }

    #[must_use]
    pub fn is_auto_type_supported(&self) -> bool {
        self.auto_type_support.load(Ordering::Acquire)
    }

    pub fn set_auto_type_support(&self, on: bool) {
        self.auto_type_support.store(on, Ordering::Release);
    }

    /// Denies every type whose name starts with `prefix`.
    pub fn add_deny(&self, prefix: &str) -> bool {
        self.deny.add(prefix)
    }

    /// Accepts every type whose name starts with `prefix`, unless denied.
    pub fn add_accept(&self, prefix: &str) -> bool {
        self.accept.add(prefix)
    }

    #[must_use]
    pub fn deny_len(&self) -> usize {
        self.deny.len()
    }

    #[must_use]
    pub fn accept_len(&self) -> usize {
        self.accept.len()
    }

    /// Registers a type the gate resolves without loading.
    pub fn register(&self, ty: TypeRef) {
        self.registry.register(ty);
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Runs the auto-type gate for `name`.
    ///
    /// `expected` is the type the decoded value must be assignable to, if
    /// any.
    ///
    /// # Errors
    ///
    /// Returns the gate's reason when the name is rejected.
    pub fn check_auto_type(
        &self,
        name: &str,
        expected: Option<&TypeRef>,
        options: &ParserOptions,
    ) -> Result<TypeRef, AutoTypeError> {
        security::check_auto_type(self, name, expected, options)
    }

    /// Resolves a name written in a declared field type. Declared names are
    /// trusted and bypass the gate.
    #[must_use]
    pub fn resolve_declared(&self, name: &str) -> Option<TypeRef> {
        self.known(name).or_else(|| self.load(name))
    }

    /// A type the registry or the cache already knows.
    pub(crate) fn known(&self, name: &str) -> Option<TypeRef> {
        self.registry.get(name).or_else(|| {
            self.cache
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(name)
                .cloned()
        })
    }

    pub(crate) fn load(&self, name: &str) -> Option<TypeRef> {
        self.loader.as_ref()?.load(name)
    }

    pub(crate) fn is_loader_eligible(&self, name: &str) -> bool {
        self.loader
            .as_ref()
            .is_some_and(|loader| loader.is_auto_type_eligible(name))
    }

    pub(crate) fn remember(&self, name: &str, ty: &TypeRef) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.into())
            .or_insert_with(|| ty.clone());
    }
}

/// Gate settings that can be loaded from application configuration and
/// applied to a [`ParserConfig`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoTypeSettings {
    /// Rejects every type-key name.
    pub safe_mode: bool,
    /// Loads any name that passes the deny lists.
    pub auto_type_support: bool,
    /// Denied name prefixes.
    pub deny: Vec<String>,
    /// Accepted name prefixes.
    pub accept: Vec<String>,
}

impl AutoTypeSettings {
    /// Reads `JSONLOOM_SAFE_MODE`, `JSONLOOM_AUTO_TYPE_SUPPORT` (`true` or
    /// `1`), `JSONLOOM_DENY` and `JSONLOOM_AUTO_TYPE_ACCEPT` (comma separated
    /// prefixes). Unset variables keep the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key).is_some_and(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true")
            })
        };
        let list = |key: &str| {
            lookup(key)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            safe_mode: flag("JSONLOOM_SAFE_MODE"),
            auto_type_support: flag("JSONLOOM_AUTO_TYPE_SUPPORT"),
            deny: list("JSONLOOM_DENY"),
            accept: list("JSONLOOM_AUTO_TYPE_ACCEPT"),
        }
    }

    /// Applies the settings. Flags are overwritten; list entries are added.
    pub fn apply(&self, config: &ParserConfig) {
        config.set_safe_mode(self.safe_mode);
        config.set_auto_type_support(self.auto_type_support);
        for prefix in &self.deny {
            config.add_deny(prefix);
        }
        for prefix in &self.accept {
            config.add_accept(prefix);
        }
        debug!(
            safe_mode = self.safe_mode,
            auto_type_support = self.auto_type_support,
            deny = self.deny.len(),
            accept = self.accept.len(),
            "auto type settings applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_flags_and_lists() {
        let settings = AutoTypeSettings::from_lookup(|key| match key {
            "JSONLOOM_SAFE_MODE" => Some("TRUE".into()),
            "JSONLOOM_AUTO_TYPE_SUPPORT" => Some("0".into()),
            "JSONLOOM_DENY" => Some(" demo.bad , ,other.".into()),
            _ => None,
        });
        assert_eq!(
            settings,
            AutoTypeSettings {
                safe_mode: true,
                auto_type_support: false,
                deny: vec!["demo.bad".into(), "other.".into()],
                accept: Vec::new(),
            }
        );
    }

    #[test]
    fn apply_extends_lists() {
        let config = ParserConfig::new();
        AutoTypeSettings {
            deny: vec!["a.b.".into(), "a.b.".into()],
            accept: vec!["c.d.".into()],
            ..Default::default()
        }
        .apply(&config);
        assert_eq!(config.deny_len(), 1);
        assert_eq!(config.accept_len(), 1);
        assert!(!config.is_safe_mode());
    }

    #[test]
    fn type_key_is_configurable() {
        assert_eq!(ParserConfig::new().type_key(), "@type");
        assert_eq!(ParserConfig::new().with_type_key("kind").type_key(), "kind");
    }

    #[test]
    fn declared_names_resolve_through_registry_and_loader() {
        let loader = TypeRegistry::new();
        loader.register(crate::TypeDescriptor::builder("demo.Late").build());
        let config = ParserConfig::new().with_loader(Arc::new(loader));
        assert!(config.resolve_declared(crate::types::OBJECT_TYPE).is_some());
        assert!(config.resolve_declared("demo.Late").is_some());
        assert!(config.resolve_declared("demo.Nope").is_none());
    }
}
