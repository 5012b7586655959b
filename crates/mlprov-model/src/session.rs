//! Session scoping
//!
//! A [`SessionContext`] is created once per pipeline run and passed to every
//! call that mints an identifier. It embeds a [`SessionToken`] in activity and
//! record identifiers so one run's records are distinguishable from another's,
//! and hands out counter-based identifiers for in-memory objects.

use crate::error::NamespaceError;
use crate::name::{QualifiedName, IRI_EXCLUDED};
use crate::namespace::NamespaceRegistry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix for file-backed entities
pub const FILE_PREFIX: &str = "file";

/// Base IRI bound to [`FILE_PREFIX`]
pub const FILE_BASE_IRI: &str = "file:";

static LAST_HIGH_RES: AtomicU64 = AtomicU64::new(0);

/// Integer embedded in identifiers to scope one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Caller-chosen token (tests, replays)
    #[must_use]
    pub const fn fixed(value: u64) -> Self {
        Self(value)
    }

    /// Seconds since the epoch
    ///
    /// Two runs started within the same second collide.
    #[must_use]
    pub fn coarse_clock() -> Self {
        Self(u64::try_from(Utc::now().timestamp()).unwrap_or(0))
    }

    /// Nanoseconds since the epoch, strictly increasing within this process
    #[must_use]
    pub fn high_resolution() -> Self {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        let mut prev = LAST_HIGH_RES.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST_HIGH_RES.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Self(next),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Uniformly random 64-bit token
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a run obtains its token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStrategy {
    /// [`SessionToken::coarse_clock`]
    CoarseClock,
    /// [`SessionToken::high_resolution`]
    #[default]
    HighResolution,
    /// [`SessionToken::random`]
    Random,
}

impl TokenStrategy {
    /// Issue a token
    #[must_use]
    pub fn issue(self) -> SessionToken {
        match self {
            Self::CoarseClock => SessionToken::coarse_clock(),
            Self::HighResolution => SessionToken::high_resolution(),
            Self::Random => SessionToken::random(),
        }
    }
}

/// Identifier factory for one pipeline run
#[derive(Debug)]
pub struct SessionContext {
    prefix: String,
    token: SessionToken,
    objects: AtomicU64,
}

impl SessionContext {
    /// Context minting identifiers under `prefix`
    #[must_use]
    pub fn new(prefix: impl Into<String>, token: SessionToken) -> Self {
        Self {
            prefix: prefix.into(),
            token,
            objects: AtomicU64::new(0),
        }
    }

    /// Namespace prefix for session identifiers
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Session token
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// `<prefix>:ml/<stage>/<token>`
    ///
    /// # Errors
    /// Namespace errors if the prefix is unregistered or `stage` is malformed
    pub fn activity_id(&self, ns: &NamespaceRegistry, stage: &str) -> Result<QualifiedName, NamespaceError> {
        ns.qualify(&self.prefix, &format!("ml/{stage}/{}", self.token))
    }

    /// `<prefix>:records/<token>`
    ///
    /// # Errors
    /// Namespace errors if the prefix is unregistered
    pub fn record_id(&self, ns: &NamespaceRegistry) -> Result<QualifiedName, NamespaceError> {
        ns.qualify(&self.prefix, &format!("records/{}", self.token))
    }

    /// `<prefix>:staff/<id>`
    ///
    /// # Errors
    /// Namespace errors if the prefix is unregistered or `id` is malformed
    pub fn staff_id(&self, ns: &NamespaceRegistry, id: &str) -> Result<QualifiedName, NamespaceError> {
        ns.qualify(&self.prefix, &format!("staff/{id}"))
    }

    /// `<prefix>:institution`
    ///
    /// # Errors
    /// Namespace errors if the prefix is unregistered
    pub fn institution_id(&self, ns: &NamespaceRegistry) -> Result<QualifiedName, NamespaceError> {
        ns.qualify(&self.prefix, "institution")
    }

    /// `<prefix>:objects/<kind>/<token>/<n>`, `n` counting from 1 per session
    ///
    /// # Errors
    /// Namespace errors if the prefix is unregistered or `kind` is malformed
    pub fn next_object_id(&self, ns: &NamespaceRegistry, kind: &str) -> Result<QualifiedName, NamespaceError> {
        let n = self.objects.fetch_add(1, Ordering::Relaxed) + 1;
        ns.qualify(&self.prefix, &format!("objects/{kind}/{}/{n}", self.token))
    }

    /// `file:<path>`, with whitespace, control characters and `%` percent-encoded
    ///
    /// # Errors
    /// `UnknownPrefix` unless [`FILE_PREFIX`] is registered
    pub fn file_id(&self, ns: &NamespaceRegistry, path: &Path) -> Result<QualifiedName, NamespaceError> {
        ns.qualify(FILE_PREFIX, &encode_path(path))
    }
}

fn encode_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c.is_whitespace() || c.is_control() || IRI_EXCLUDED.contains(&c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}
