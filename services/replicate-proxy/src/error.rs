//! Service error types

use thiserror::Error;

/// Faults inside the request path that are not the client's or the
/// upstream's doing. The dispatcher reports all of them as a plain 500
/// `Internal server error`; the detail only goes to the log.
#[derive(Error, Debug)]
pub enum Error {
    #[error("provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("cannot build upstream URL from base {0}")]
    UpstreamUrl(String),

    #[error("path segment {0:?} cannot be sent upstream")]
    PathSegment(String),

    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
