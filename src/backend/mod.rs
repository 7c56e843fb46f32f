//! Text-generation backend boundary.
//!
//! The dispatcher only ever talks to a [`GenerationBackend`]: one call that
//! takes a prompt plus optional generation parameters and yields text or a
//! typed [`BackendError`]. The adapter decides the failure kind from the
//! upstream status, so nothing downstream has to pattern-match error text.

// Author: kelexine (https://github.com/kelexine)

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Optional per-request generation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub system_instruction: Option<String>,
}

impl GenerateOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_output_tokens.is_none()
            && self.system_instruction.is_none()
    }
}

/// Why a backend call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Upstream quota or rate limit exhausted. Carries the upstream retry hint.
    RateLimited { retry_after: Option<Duration> },
    /// Network or upstream service fault.
    Unavailable,
    /// Upstream rejected the request or sent something we could not use.
    Invalid,
    /// No answer within the configured deadline.
    Timeout,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendErrorKind::RateLimited { .. } => "rate_limited",
            BackendErrorKind::Unavailable => "unavailable",
            BackendErrorKind::Invalid => "invalid",
            BackendErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Failure returned by a [`GenerationBackend`].
///
/// `Clone` so one outcome can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    /// Upstream detail, for server-side logs only.
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimited { retry_after }, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Invalid, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }
}

/// A service that turns a prompt into generated text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, BackendError>;

    /// Short name used in logs and metric labels.
    fn name(&self) -> &str {
        "backend"
    }
}
