//! Uniform validation result shared by every ledger check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a validation: a success flag plus a message.
///
/// Checks never panic or return `Err`; they hand back one of these so a
/// caller can compose them or forward them to a client unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    success: bool,
    message: String,
}

impl Validation {
    /// A successful validation with no message.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    /// A successful validation carrying a message (usually an accepted hash).
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed validation.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "ok")?;
        } else {
            write!(f, "failed")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
