//! Upstream API abstraction
//!
//! Defines the `Provider` trait that decouples the dispatcher from how a
//! particular upstream authenticates and reports failures. The dispatcher
//! asks the provider to sign each outgoing request and to classify every
//! non-success status; it never looks at the credential itself.

pub mod classify;
pub mod replicate;

pub use classify::classify_status;
pub use replicate::ReplicateProvider;

use reqwest::header::HeaderMap;
use serde::Serialize;

/// Classification of a non-success upstream status.
///
/// Only `InsufficientCredit` changes what the client sees; the other
/// variants exist so logs and metrics can tell failure modes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// 402: the upstream account ran out of billing credit
    InsufficientCredit,
    /// 401/403: the configured credential was refused
    CredentialRejected,
    /// Anything else, forwarded with its original status
    Upstream,
}

impl ErrorClassification {
    /// Metric label for `proxy_upstream_errors_total`.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::InsufficientCredit => "insufficient_credit",
            Self::CredentialRejected => "credential_rejected",
            Self::Upstream => "upstream_status",
        }
    }
}

/// Health reported by a provider for the /health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub api_url: String,
}

/// Errors from provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credential cannot be encoded as a header value")]
    InvalidCredential,
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Abstraction over an authenticated upstream prediction API.
pub trait Provider: Send + Sync {
    /// Identifier for logging and health reporting (e.g. "replicate")
    fn id(&self) -> &str;

    /// Base URL every upstream path is resolved against.
    fn api_url(&self) -> &reqwest::Url;

    /// Inject the credential header appropriate to this upstream.
    fn prepare_request(&self, headers: &mut HeaderMap) -> Result<()>;

    /// Classify a non-success upstream status.
    fn classify_error(&self, status: u16) -> ErrorClassification;

    /// Remove any trace of the credential from text bound for a client.
    fn scrub(&self, text: &str) -> String;

    /// Provider health for the /health endpoint.
    fn health(&self) -> ProviderHealth {
        ProviderHealth {
            provider: self.id().to_owned(),
            api_url: self.api_url().to_string(),
        }
    }
}
