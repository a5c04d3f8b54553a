//! Client-facing error taxonomy
//!
//! Every failure the proxy reports is a `ClassifiedError`, serialized as the
//! envelope `{"error", "message"?, "code"?, "details"?}`. The HTTP status
//! travels alongside and is never part of the body.

use provider::{ErrorClassification, Provider};
use serde::Serialize;
use serde_json::Value;

use crate::constants::CREDIT_TOP_UP_HINT;
use crate::invocation::Operation;

/// Rejections detected before any network access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing prediction ID")]
    MissingPredictionId,

    #[error("Invalid prediction ID")]
    InvalidPredictionId,

    #[error("Missing image or scale (or model/input for effect calls)")]
    MissingFields,

    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("Request body could not be read")]
    UnreadableBody,

    #[error("model must be a string")]
    InvalidModel,

    #[error("version must be a string")]
    InvalidVersion,

    #[error("scale must be a number")]
    InvalidScale,
}

/// Machine-readable error code. Only credit exhaustion has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "INSUFFICIENT_CREDIT")]
    InsufficientCredit,
}

/// Coarse kind of a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    MethodNotAllowed,
    UpstreamBilling,
    Upstream,
    Internal,
}

/// A failure ready to be written to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    #[serde(skip)]
    pub status: u16,
    #[serde(skip)]
    pub kind: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ClassifiedError {
    fn bare(status: u16, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            error: error.into(),
            message: None,
            code: None,
            details: None,
        }
    }

    pub fn validation(err: &ValidationError) -> Self {
        Self::bare(400, ErrorKind::Validation, err.to_string())
    }

    /// The credential is not configured.
    pub fn configuration() -> Self {
        Self::bare(500, ErrorKind::Configuration, "REPLICATE_TOKEN not configured")
    }

    pub fn method_not_allowed() -> Self {
        Self::bare(405, ErrorKind::MethodNotAllowed, "Method not allowed")
    }

    pub fn internal() -> Self {
        Self::bare(500, ErrorKind::Internal, "Internal server error")
    }

    /// Wrap a non-success upstream response.
    ///
    /// 402 always yields `INSUFFICIENT_CREDIT` at 402; every other status is
    /// forwarded unchanged under the operation's generic label.
    pub fn upstream(
        operation: Operation,
        classification: ErrorClassification,
        status: u16,
        details: Value,
    ) -> Self {
        match classification {
            ErrorClassification::InsufficientCredit => {
                let (error, message) = match operation {
                    Operation::Upscale => ("Insufficient credit", Some(CREDIT_TOP_UP_HINT)),
                    Operation::Poll | Operation::Model => ("Insufficient Replicate credits", None),
                };
                Self {
                    status: 402,
                    kind: ErrorKind::UpstreamBilling,
                    error: error.to_owned(),
                    message: message.map(str::to_owned),
                    code: Some(ErrorCode::InsufficientCredit),
                    details: Some(details),
                }
            }
            ErrorClassification::CredentialRejected | ErrorClassification::Upstream => Self {
                details: Some(details),
                ..Self::bare(status, ErrorKind::Upstream, operation.error_label())
            },
        }
    }

    /// Strip the credential from every string in the envelope.
    pub fn scrubbed(mut self, provider: &dyn Provider) -> Self {
        self.error = provider.scrub(&self.error);
        if let Some(message) = self.message.take() {
            self.message = Some(provider.scrub(&message));
        }
        if let Some(details) = self.details.as_mut() {
            scrub_value(details, provider);
        }
        self
    }

    /// Serialized envelope body.
    pub fn body(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "error": "Internal server error" })
        })
    }
}

fn scrub_value(value: &mut Value, provider: &dyn Provider) {
    match value {
        Value::String(s) => *s = provider.scrub(s),
        Value::Array(items) => items.iter_mut().for_each(|v| scrub_value(v, provider)),
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                if let Some(mut v) = map.remove(&key) {
                    scrub_value(&mut v, provider);
                    map.insert(provider.scrub(&key), v);
                }
            }
        }
        _ => {}
    }
}
