//! Namespace registry
//!
//! Maps short prefixes to base IRIs and resolves `(prefix, local)` pairs.
//! Registration order is preserved so serializers can emit declarations
//! deterministically.

use crate::error::NamespaceError;
use crate::name::{is_valid_local_name, is_valid_prefix, QualifiedName};
use indexmap::IndexMap;

/// W3C PROV namespace
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";

/// XML Schema datatypes namespace
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// A prefix binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
    base_iri: String,
    builtin: bool,
}

impl Namespace {
    /// Short prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Base IRI local names are appended to
    #[must_use]
    pub fn base_iri(&self) -> &str {
        &self.base_iri
    }

    /// `prov` and `xsd` are implicit in every document
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }
}

/// Prefix → base IRI bindings
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    bindings: IndexMap<String, Namespace>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRegistry {
    /// Registry holding only the built-in `prov` and `xsd` bindings
    #[must_use]
    pub fn new() -> Self {
        let mut bindings = IndexMap::new();
        for (prefix, iri) in [("prov", PROV_NS), ("xsd", XSD_NS)] {
            bindings.insert(
                prefix.to_string(),
                Namespace {
                    prefix: prefix.to_string(),
                    base_iri: iri.to_string(),
                    builtin: true,
                },
            );
        }
        Self { bindings }
    }

    /// Bind `prefix` to `base_iri`
    ///
    /// Re-registering an identical binding is a no-op.
    ///
    /// # Errors
    /// - `InvalidPrefix` / `InvalidBaseIri` for malformed input
    /// - `DuplicatePrefix` if the prefix is bound to a different IRI
    pub fn register(&mut self, prefix: &str, base_iri: &str) -> Result<(), NamespaceError> {
        if !is_valid_prefix(prefix) {
            return Err(NamespaceError::InvalidPrefix(prefix.to_string()));
        }
        if base_iri.is_empty() || base_iri.chars().any(char::is_whitespace) {
            return Err(NamespaceError::InvalidBaseIri {
                prefix: prefix.to_string(),
                iri: base_iri.to_string(),
            });
        }

        if let Some(existing) = self.bindings.get(prefix) {
            if existing.base_iri == base_iri {
                return Ok(());
            }
            return Err(NamespaceError::DuplicatePrefix {
                prefix: prefix.to_string(),
                existing: existing.base_iri.clone(),
                requested: base_iri.to_string(),
            });
        }

        tracing::debug!(prefix, base_iri, "namespace registered");
        self.bindings.insert(
            prefix.to_string(),
            Namespace {
                prefix: prefix.to_string(),
                base_iri: base_iri.to_string(),
                builtin: false,
            },
        );
        Ok(())
    }

    /// Resolve `(prefix, local)` into a full IRI
    ///
    /// # Errors
    /// `UnknownPrefix` if the prefix is not registered, `InvalidLocalName`
    /// if the local part is empty or contains whitespace.
    pub fn resolve(&self, prefix: &str, local: &str) -> Result<String, NamespaceError> {
        let ns = self
            .bindings
            .get(prefix)
            .ok_or_else(|| NamespaceError::UnknownPrefix(prefix.to_string()))?;
        if !is_valid_local_name(local) {
            return Err(NamespaceError::InvalidLocalName {
                prefix: prefix.to_string(),
                local: local.to_string(),
            });
        }
        Ok(format!("{}{}", ns.base_iri, local))
    }

    /// Resolve into a [`QualifiedName`]
    ///
    /// # Errors
    /// Same as [`NamespaceRegistry::resolve`]
    pub fn qualify(&self, prefix: &str, local: &str) -> Result<QualifiedName, NamespaceError> {
        let iri = self.resolve(prefix, local)?;
        Ok(QualifiedName::new(prefix.to_string(), local.to_string(), iri))
    }

    /// Check that `name` resolves identically under this registry
    ///
    /// # Errors
    /// `UnknownPrefix` when the prefix is unbound here, `ForeignName` when it
    /// is bound to a different base IRI.
    pub fn check(&self, name: &QualifiedName) -> Result<(), NamespaceError> {
        let bound = self.resolve(name.prefix(), name.local_name())?;
        if bound != name.iri() {
            return Err(NamespaceError::ForeignName {
                name: name.to_string(),
                prefix: name.prefix().to_string(),
                iri: name.iri().to_string(),
                bound,
            });
        }
        Ok(())
    }

    /// Look up a binding
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&Namespace> {
        self.bindings.get(prefix)
    }

    /// Check if prefix is bound
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.bindings.contains_key(prefix)
    }

    /// User-registered bindings, in registration order
    pub fn declared(&self) -> impl Iterator<Item = &Namespace> {
        self.bindings.values().filter(|ns| !ns.builtin)
    }

    /// All bindings including built-ins
    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.bindings.values()
    }

    /// Number of user-registered bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.declared().count()
    }

    /// No user-registered bindings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve() {
        let mut reg = NamespaceRegistry::new();
        reg.register("ex", "http://example.org/").unwrap();
        assert_eq!(
            reg.resolve("ex", "ml/filter/1").unwrap(),
            "http://example.org/ml/filter/1"
        );
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut reg = NamespaceRegistry::new();
        reg.register("ex", "http://example.org/").unwrap();
        reg.register("ex", "http://example.org/").unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn conflicting_registration_fails() {
        let mut reg = NamespaceRegistry::new();
        reg.register("ex", "http://example.org/").unwrap();
        let err = reg.register("ex", "http://other.org/").unwrap_err();
        assert!(matches!(err, NamespaceError::DuplicatePrefix { .. }));
        assert_eq!(reg.get("ex").unwrap().base_iri(), "http://example.org/");
    }

    #[test]
    fn builtin_prov_cannot_be_rebound() {
        let mut reg = NamespaceRegistry::new();
        assert!(reg.register("prov", PROV_NS).is_ok());
        assert!(matches!(
            reg.register("prov", "http://evil/"),
            Err(NamespaceError::DuplicatePrefix { .. })
        ));
    }

    #[test]
    fn unknown_prefix() {
        let reg = NamespaceRegistry::new();
        assert_eq!(
            reg.resolve("ex", "a"),
            Err(NamespaceError::UnknownPrefix("ex".into()))
        );
    }

    #[test]
    fn declared_preserves_registration_order_and_skips_builtins() {
        let mut reg = NamespaceRegistry::new();
        reg.register("zeta", "http://z/").unwrap();
        reg.register("alpha", "http://a/").unwrap();
        let prefixes: Vec<_> = reg.declared().map(Namespace::prefix).collect();
        assert_eq!(prefixes, vec!["zeta", "alpha"]);
        assert!(reg.contains("prov"));
    }

    #[test]
    fn check_detects_foreign_binding() {
        let mut a = NamespaceRegistry::new();
        a.register("ex", "http://a/").unwrap();
        let mut b = NamespaceRegistry::new();
        b.register("ex", "http://b/").unwrap();

        let name = a.qualify("ex", "x").unwrap();
        assert!(a.check(&name).is_ok());
        assert!(matches!(b.check(&name), Err(NamespaceError::ForeignName { .. })));
        assert!(matches!(
            NamespaceRegistry::new().check(&name),
            Err(NamespaceError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn malformed_input_rejected() {
        let mut reg = NamespaceRegistry::new();
        assert!(matches!(
            reg.register("", "http://a/"),
            Err(NamespaceError::InvalidPrefix(_))
        ));
        assert!(matches!(
            reg.register("ex", ""),
            Err(NamespaceError::InvalidBaseIri { .. })
        ));
        reg.register("ex", "http://a/").unwrap();
        assert!(matches!(
            reg.qualify("ex", "two words"),
            Err(NamespaceError::InvalidLocalName { .. })
        ));
    }
}
