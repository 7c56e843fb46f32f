// Prompt key normalization
// Author: kelexine (https://github.com/kelexine)

use crate::backend::GenerateOptions;
use sha2::{Digest, Sha256};
use std::fmt;

/// Separates the message from the options digest in a scoped key.
/// A unit separator cannot survive `trim()` at either end of a message,
/// but may appear inside one, so scoped keys also carry a fixed-length digest.
const SCOPE_SEPARATOR: char = '\u{1f}';

/// Lower-case and trim a user message.
pub fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

/// Cache lookup key derived from a user message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptKey(String);

impl PromptKey {
    /// Key on the normalized message text only.
    pub fn new(message: &str) -> Self {
        Self(normalize(message))
    }

    /// Key on the normalized message plus a digest of the generation
    /// overrides. Requests without overrides share the unscoped key.
    pub fn scoped(message: &str, options: &GenerateOptions) -> Self {
        if options.is_empty() {
            return Self::new(message);
        }
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(options).unwrap_or_default().as_bytes());
        Self(format!(
            "{}{}{:x}",
            normalize(message),
            SCOPE_SEPARATOR,
            hasher.finalize()
        ))
    }

    /// Short digest for log lines, so prompts never end up in the logs.
    pub fn fingerprint(&self) -> String {
        let digest = format!("{:x}", Sha256::digest(self.0.as_bytes()));
        digest[..12].to_string()
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}
