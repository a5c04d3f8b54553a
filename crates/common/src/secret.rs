//! Credential wrapper
//!
//! The upstream token lives in exactly one place: a `Secret`. It renders as
//! `[REDACTED]` through `Debug` and `Display`, is zeroized on drop, and can
//! scrub its own value out of any text that is about to leave the process.

use std::fmt;
use zeroize::Zeroize;

const REDACTED: &str = "[REDACTED]";

/// Sensitive string value, redacted in Debug/Display/logs
pub struct Secret(String);

impl Secret {
    /// Wrap a credential. Surrounding whitespace is trimmed; a blank value
    /// yields `None` so an empty env var never counts as configured.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let mut raw: String = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            raw.zeroize();
            return None;
        }
        let secret = Self(trimmed.to_owned());
        raw.zeroize();
        Some(secret)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Replace every occurrence of the secret in `text` with `[REDACTED]`.
    pub fn scrub(&self, text: &str) -> String {
        if text.contains(self.0.as_str()) {
            text.replace(self.0.as_str(), REDACTED)
        } else {
            text.to_owned()
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_debug_and_display() {
        let secret = Secret::new("r8_live_token").unwrap();
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn exposes_trimmed_value() {
        let secret = Secret::new("  r8_live_token\n").unwrap();
        assert_eq!(secret.expose(), "r8_live_token");
    }

    #[test]
    fn blank_value_is_absent() {
        assert!(Secret::new("").is_none());
        assert!(Secret::new(" \n\t ").is_none());
    }

    #[test]
    fn scrub_replaces_every_occurrence() {
        let secret = Secret::new("r8_abc").unwrap();
        assert_eq!(
            secret.scrub("Token r8_abc rejected (r8_abc)"),
            "Token [REDACTED] rejected ([REDACTED])"
        );
    }

    #[test]
    fn scrub_leaves_unrelated_text_alone() {
        let secret = Secret::new("r8_abc").unwrap();
        assert_eq!(secret.scrub("prediction failed"), "prediction failed");
    }
}
