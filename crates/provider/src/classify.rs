//! Status classification for Replicate responses

use crate::ErrorClassification;

/// Classify a non-success upstream status.
///
/// 402 is the only status with a dedicated client contract. 401/403 are
/// singled out so operators can alert on a revoked token; they are still
/// forwarded to the client unchanged.
pub fn classify_status(status: u16) -> ErrorClassification {
    match status {
        402 => ErrorClassification::InsufficientCredit,
        401 | 403 => ErrorClassification::CredentialRejected,
        _ => ErrorClassification::Upstream,
    }
}
