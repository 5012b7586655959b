//! Qualified names
//!
//! A [`QualifiedName`] is a `(prefix, local-name)` pair that has already been
//! resolved against a [`NamespaceRegistry`](crate::NamespaceRegistry). Identity
//! is the resolved IRI: two names written with different prefixes bound to the
//! same base IRI are equal.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Namespace-prefixed identifier with its canonical IRI
///
/// Only obtainable through [`NamespaceRegistry::qualify`](crate::NamespaceRegistry::qualify),
/// so a prefix is always registered before a name using it exists.
#[derive(Debug, Clone)]
pub struct QualifiedName {
    prefix: String,
    local: String,
    iri: String,
}

impl QualifiedName {
    pub(crate) fn new(prefix: String, local: String, iri: String) -> Self {
        Self { prefix, local, iri }
    }

    /// Namespace prefix as written
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local part as written
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Fully-qualified IRI
    #[inline]
    #[must_use]
    pub fn iri(&self) -> &str {
        &self.iri
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.iri == other.iri
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.iri.hash(state);
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iri.cmp(&other.iri)
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}

/// Characters that may not appear in an IRI, and so never in a local name
pub(crate) const IRI_EXCLUDED: &[char] = &['"', '<', '>', '\\', '{', '}', '|', '^', '`'];

/// Local names: non-empty, no whitespace, no control or IRI-excluded characters
pub(crate) fn is_valid_local_name(local: &str) -> bool {
    !local.is_empty()
        && !local
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || IRI_EXCLUDED.contains(&c))
}

/// Prefixes: an ASCII letter followed by letters, digits, `_`, `-` or `.`
pub(crate) fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
