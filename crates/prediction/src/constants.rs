//! Replicate model constants
//!
//! Pinned model identifiers and version hashes. Versions are immutable on
//! Replicate, so pinning them keeps the output of each effect stable.

/// Background removal model, always called through its model-named endpoint.
pub const BACKGROUND_REMOVAL_MODEL: &str = "bria-ai/bria-rmbg-2.0";

/// Any model string containing this marker is routed to the pinned sticker version.
pub const FACE_TO_STICKER_MARKER: &str = "face-to-sticker";

/// Pinned face-to-sticker version.
pub const FACE_TO_STICKER_VERSION: &str =
    "764d4827ea159608a07cdde8ddf1c6000019627515eb02b6b449695fd547e5ef";

/// Real-ESRGAN version used by the upscale shape.
pub const UPSCALE_VERSION: &str =
    "42fed1c4974146d4d2414e2be2c5277c7fcf05fcc3a73abf41610695738c1d7b";

/// Separator between model name and version hash in `owner/model:hash`.
pub const VERSION_SEPARATOR: char = ':';

/// Guidance returned alongside an upscale credit exhaustion error.
pub const CREDIT_TOP_UP_HINT: &str =
    "No Replicate credits left. Top up at replicate.com/account/billing";
