//! Recorder configuration

use mlprov_fingerprint::DEFAULT_CHUNK_SIZE;
use mlprov_model::{SessionToken, TokenStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default namespace prefix for session identifiers
pub const DEFAULT_PREFIX: &str = "ex";

/// Default base IRI bound to [`DEFAULT_PREFIX`]
pub const DEFAULT_BASE_IRI: &str = "http://example.org/";

/// Settings for one [`PipelineRecorder`](crate::PipelineRecorder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Prefix for activity, agent, record and object identifiers
    pub prefix: String,
    /// Base IRI bound to `prefix`
    pub base_iri: String,
    /// How the session token is issued
    pub token_strategy: TokenStrategy,
    /// Use this token instead of issuing one
    pub fixed_token: Option<u64>,
    /// Fingerprint read buffer size in bytes
    pub chunk_size: usize,
    /// Per-file fingerprint deadline in seconds
    pub fingerprint_timeout_secs: Option<u64>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            base_iri: DEFAULT_BASE_IRI.to_string(),
            token_strategy: TokenStrategy::default(),
            fixed_token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fingerprint_timeout_secs: None,
        }
    }
}

impl RecorderConfig {
    /// Token for a new session
    #[must_use]
    pub fn session_token(&self) -> SessionToken {
        self.fixed_token
            .map_or_else(|| self.token_strategy.issue(), SessionToken::fixed)
    }

    /// Fingerprint deadline
    #[must_use]
    pub fn fingerprint_timeout(&self) -> Option<Duration> {
        self.fingerprint_timeout_secs.map(Duration::from_secs)
    }
}
