//! Attribute values
//!
//! Attribute bags are closed: every value is one of five [`AttrValue`]
//! variants so serializers can match exhaustively.

use crate::name::QualifiedName;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Typed scalar attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// UTF-8 string
    Str(String),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float; NaN and infinities are stored but not serializable
    Float(f64),
    /// UTC timestamp
    Time(DateTime<Utc>),
    /// Reference to another identifier
    Ref(QualifiedName),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Saturates at `i64::MAX`
impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Saturates at `i64::MAX`
impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<QualifiedName> for AttrValue {
    fn from(value: QualifiedName) -> Self {
        Self::Ref(value)
    }
}

impl From<&QualifiedName> for AttrValue {
    fn from(value: &QualifiedName) -> Self {
        Self::Ref(value.clone())
    }
}

/// Insertion-ordered attribute map keyed by qualified name
///
/// Writing an existing key replaces the value in place, keeping the key's
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: IndexMap<QualifiedName, AttrValue>,
}

impl Attributes {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: QualifiedName, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite; returns the previous value
    pub fn insert(&mut self, key: QualifiedName, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.entries.insert(key, value.into())
    }

    /// Union merge; values in `other` win on key collision
    pub fn merge(&mut self, other: Attributes) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, key: &QualifiedName) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    /// Look up by local name and prefix, ignoring IRI
    #[must_use]
    pub fn get_by_name(&self, prefix: &str, local: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.prefix() == prefix && k.local_name() == local)
            .map(|(_, v)| v)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &AttrValue)> {
        self.entries.iter()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &QualifiedName> {
        self.entries.keys()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(QualifiedName, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (QualifiedName, AttrValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a QualifiedName, &'a AttrValue);
    type IntoIter = indexmap::map::Iter<'a, QualifiedName, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
