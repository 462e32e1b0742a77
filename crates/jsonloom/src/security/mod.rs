//! The auto-type gate: decides whether a type-key name may resolve to a
//! type.
//!
//! Decision order
//! - Safe mode (per call or in the [`ParserConfig`]) rejects every name
//!   before anything else is looked at.
//! - Names shorter than 3 or at least 192 bytes, array descriptors (`[..`)
//!   and `L..;` descriptors are malformed.
//! - The internal whitelist bypasses every deny list. Otherwise a name with
//!   a prefix in the internal deny set is rejected.
//! - The configured accept and deny lists are checked by prefix hash, then
//!   the explicit registry and the resolution cache.
//! - Loading through the [`TypeLoader`](crate::TypeLoader) happens only when
//!   auto-type support is on, the loader reports the name as eligible, or a
//!   usable expected type was supplied. Loaded types with a dangerous
//!   capability are always rejected.
//!
//! Successful resolutions are cached for later checks.
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::ParserConfig,
    options::ParserOptions,
    types::{ARRAY_TYPE, OBJECT_TYPE, TypeKind, TypeRef},
};

pub(crate) mod hash;

/// Names shorter than this are malformed.
pub const MIN_NAME_LEN: usize = 3;
/// Names this long or longer are malformed.
pub const MAX_NAME_LEN: usize = 192;

/// Prefixes of type families that can execute code, open connections or
/// load classes when instantiated.
const INTERNAL_DENY: [u64; 28] = hash::sorted_hashes([
    "bsh.",
    "com.mchange.v2.c3p0",
    "com.sun.",
    "com.zaxxer.hikari",
    "java.lang.Class",
    "java.lang.ProcessBuilder",
    "java.lang.Runtime",
    "java.lang.Thread",
    "java.net.URLClassLoader",
    "java.rmi",
    "javax.management.",
    "javax.naming.",
    "javax.script.",
    "javax.sql.",
    "jdk.internal.",
    "oracle.jdbc.",
    "org.apache.bcel",
    "org.apache.commons.collections.functors",
    "org.apache.commons.dbcp",
    "org.apache.ibatis.datasource",
    "org.apache.tomcat.dbcp",
    "org.apache.xalan",
    "org.apache.xbean",
    "org.codehaus.groovy.",
    "org.hibernate.jmx",
    "org.mozilla.javascript",
    "org.springframework.",
    "sun.",
]);

/// First-party types that are always trusted.
const INTERNAL_WHITELIST: [u64; 2] = hash::sorted_hashes([OBJECT_TYPE, ARRAY_TYPE]);

/// Why a type-key name was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AutoTypeError {
    #[error("safe mode rejects type {0}")]
    SafeMode(String),
    #[error("malformed type name {0:?}")]
    Malformed(String),
    #[error("type {0} is denied")]
    Denied(String),
    #[error("auto type is not supported for {0}")]
    NotAllowed(String),
    #[error("type {0} can load code and is never decoded")]
    DangerousType(String),
    #[error("type {name} is not assignable to {expected}")]
    TypeMismatch { name: String, expected: String },
    #[error("type {0} needs a creator, which implicit auto type does not allow")]
    CreatorConstructor(String),
    #[error("type {0} not found")]
    NotFound(String),
}

/// An append-only set of prefix hashes.
///
/// Readers take a snapshot of the sorted slice; writers replace it with a
/// grown copy.
#[derive(Debug, Default)]
pub(crate) struct HashList {
    hashes: RwLock<Arc<[u64]>>,
}

impl HashList {
    pub(crate) fn snapshot(&self) -> Arc<[u64]> {
        self.hashes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds the hash of `prefix`. Returns `false` when it was already
    /// present.
    pub(crate) fn add(&self, prefix: &str) -> bool {
        let h = hash::hash(prefix);
        let mut guard = self.hashes.write().unwrap_or_else(PoisonError::into_inner);
        let Err(at) = guard.binary_search(&h) else {
            return false;
        };
        let mut grown = Vec::with_capacity(guard.len() + 1);
        grown.extend_from_slice(&guard[..at]);
        grown.push(h);
        grown.extend_from_slice(&guard[at..]);
        *guard = grown.into();
        trace!(prefix, len = guard.len(), "type list extended");
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot().len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Listed {
    Accept,
    Deny,
}

/// Finds the first listed prefix of `name`, checking `first` before
/// `second` at each length.
fn listed(name: &str, first: (&[u64], Listed), second: (&[u64], Listed)) -> Option<Listed> {
    hash::find_prefix(name, |h| {
        if first.0.binary_search(&h).is_ok() {
            Some(first.1)
        } else if second.0.binary_search(&h).is_ok() {
            Some(second.1)
        } else {
            None
        }
    })
}

fn is_malformed(name: &str) -> bool {
    name.len() < MIN_NAME_LEN
        || name.len() >= MAX_NAME_LEN
        || name.starts_with('[')
        || (name.starts_with('L') && name.ends_with(';'))
}

fn fits(ty: &TypeRef, expected: Option<&TypeRef>) -> bool {
    expected.is_none_or(|e| e.is_marker() || ty.kind() == TypeKind::Map || ty.is_assignable_to(e))
}

fn mismatch(name: &str, expected: Option<&TypeRef>) -> AutoTypeError {
    AutoTypeError::TypeMismatch {
        name: name.to_owned(),
        expected: expected.map_or_else(String::new, |e| e.name().to_owned()),
    }
}

/// Final checks shared by every path that returns a type: the capability,
/// then the expected supertype. Admitted types are cached.
fn admit(config: &ParserConfig, name: &str, ty: TypeRef, expected: Option<&TypeRef>) -> Result<TypeRef, AutoTypeError> {
    if ty.capability().is_dangerous() {
        return Err(AutoTypeError::DangerousType(name.to_owned()));
    }
    if !fits(&ty, expected) {
        return Err(mismatch(name, expected));
    }
    config.remember(name, &ty);
    Ok(ty)
}

/// Runs the gate for `name`.
pub(crate) fn check_auto_type(
    config: &ParserConfig,
    name: &str,
    expected: Option<&TypeRef>,
    options: &ParserOptions,
) -> Result<TypeRef, AutoTypeError> {
    let decision = decide(config, name, expected, options);
    match &decision {
        Ok(ty) => debug!(name, resolved = ty.name(), "auto type accepted"),
        Err(error) => debug!(name, %error, "auto type rejected"),
    }
    decision
}

fn decide(
    config: &ParserConfig,
    name: &str,
    expected: Option<&TypeRef>,
    options: &ParserOptions,
) -> Result<TypeRef, AutoTypeError> {
    if options.safe_mode || config.is_safe_mode() {
        return Err(AutoTypeError::SafeMode(name.to_owned()));
    }
    if is_malformed(name) {
        return Err(AutoTypeError::Malformed(name.to_owned()));
    }

    let expect_flag = expected.is_some_and(|e| !e.is_marker() && !e.capability().is_dangerous());
    let support = options.support_auto_type || config.is_auto_type_supported();
    let whitelisted = INTERNAL_WHITELIST.binary_search(&hash::hash(name)).is_ok();
    let deny = config.deny.snapshot();
    let accept = config.accept.snapshot();

    if !whitelisted {
        if hash::find_prefix(name, |h| INTERNAL_DENY.binary_search(&h).ok()).is_some() {
            return Err(AutoTypeError::Denied(name.to_owned()));
        }
        if support || expect_flag {
            match listed(name, (&accept, Listed::Accept), (&deny, Listed::Deny)) {
                Some(Listed::Accept) => {
                    if let Some(ty) = config.load(name) {
                        return admit(config, name, ty, expected);
                    }
                }
                Some(Listed::Deny) if config.known(name).is_none() => {
                    return Err(AutoTypeError::Denied(name.to_owned()));
                }
                _ => {}
            }
        }
    }

    if let Some(ty) = config.known(name) {
        return admit(config, name, ty, expected);
    }

    if !support && !whitelisted {
        match listed(name, (&deny, Listed::Deny), (&accept, Listed::Accept)) {
            Some(Listed::Deny) => return Err(AutoTypeError::Denied(name.to_owned())),
            Some(Listed::Accept) => {
                if let Some(ty) = config.load(name) {
                    return admit(config, name, ty, expected);
                }
            }
            None => {}
        }
    }

    let eligible = config.is_loader_eligible(name);
    let loaded = if support || eligible || expect_flag {
        config.load(name)
    } else {
        None
    };

    if let Some(ty) = &loaded {
        if ty.capability().is_dangerous() {
            return Err(AutoTypeError::DangerousType(name.to_owned()));
        }
        if eligible || ty.is_auto_type_eligible() {
            return admit(config, name, ty.clone(), expected);
        }
        if let Some(e) = expected {
            if !fits(ty, Some(e)) {
                return Err(mismatch(name, expected));
            }
            if expect_flag {
                config.remember(name, ty);
                return Ok(ty.clone());
            }
        }
        if ty.has_creator() && support {
            return Err(AutoTypeError::CreatorConstructor(name.to_owned()));
        }
    }

    if !support {
        return Err(AutoTypeError::NotAllowed(name.to_owned()));
    }
    let ty = loaded.ok_or_else(|| AutoTypeError::NotFound(name.to_owned()))?;
    admit(config, name, ty, expected)
}
