//! Model resolution
//!
//! Turns a classified request into the single upstream call the proxy will
//! make. Resolution is pure and deterministic: the same shape and entry point
//! always produce the same call, and nothing here touches the network.

use serde::Serialize;
use serde_json::{Value, json};

use crate::constants::{
    BACKGROUND_REMOVAL_MODEL, FACE_TO_STICKER_MARKER, FACE_TO_STICKER_VERSION, UPSCALE_VERSION,
    VERSION_SEPARATOR,
};
use crate::entry::EntryPoint;
use crate::shape::RequestShape;

/// What the client asked for; selects error labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Poll,
    Model,
    Upscale,
}

impl Operation {
    /// Label used for non-402 upstream failures.
    pub fn error_label(self) -> &'static str {
        match self {
            Self::Poll => "Replicate poll error",
            Self::Model => "Replicate model error",
            Self::Upscale => "Replicate API error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Model => "model",
            Self::Upscale => "upscale",
        }
    }
}

/// Upstream endpoint, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /v1/predictions`: version-pinned predictions
    Predictions,
    /// `POST /v1/models/{model}/predictions`: latest version of a named model
    Model(String),
    /// `GET /v1/predictions/{id}`
    Prediction(String),
}

impl Endpoint {
    /// Path segments after the base URL. The caller percent-encodes each
    /// one, so `/` and `?` stay inside their segment. Dot and empty segments
    /// are not encodable and must be refused by the caller.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Predictions => vec!["v1", "predictions"],
            Self::Model(model) => {
                let mut segments = vec!["v1", "models"];
                segments.extend(model.split('/'));
                segments.push("predictions");
                segments
            }
            Self::Prediction(id) => vec!["v1", "predictions", id.as_str()],
        }
    }
}

/// Prediction request body. `version` is present only for the
/// version-pinned endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: Value,
}

/// A resolved prediction call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInvocation {
    pub endpoint: Endpoint,
    pub payload: Payload,
    /// Send `Prefer: wait` so the upstream blocks until the prediction finishes
    pub prefer_wait: bool,
}

impl ModelInvocation {
    fn versioned(version: impl Into<String>, input: Value) -> Self {
        Self {
            endpoint: Endpoint::Predictions,
            payload: Payload {
                version: Some(version.into()),
                input,
            },
            prefer_wait: false,
        }
    }

    fn named(model: impl Into<String>, input: Value) -> Self {
        Self {
            endpoint: Endpoint::Model(model.into()),
            payload: Payload {
                version: None,
                input,
            },
            prefer_wait: false,
        }
    }

    /// Resolve an explicit model call. Rules apply in order:
    ///
    /// 1. background removal → its model endpoint, `Prefer: wait`
    /// 2. face-to-sticker → pinned version (a client version is ignored)
    /// 3. explicit `version` → predictions endpoint
    /// 4. `owner/model:hash` → predictions endpoint with `hash`
    /// 5. bare name → model endpoint, no version
    pub fn resolve(model: &str, input: Value, version: Option<&str>) -> Self {
        if model == BACKGROUND_REMOVAL_MODEL {
            return Self {
                prefer_wait: true,
                ..Self::named(model, input)
            };
        }

        if model.contains(FACE_TO_STICKER_MARKER) {
            return Self::versioned(FACE_TO_STICKER_VERSION, input);
        }

        if let Some(version) = version.filter(|v| !v.is_empty()) {
            return Self::versioned(version, input);
        }

        match split_model_version(model) {
            (name, Some(hash)) => {
                tracing::trace!(model = name, "using version embedded in model string");
                Self::versioned(hash, input)
            }
            (name, None) => Self::named(name, input),
        }
    }

    /// Resolve an upscale with the entry point's clamp range and
    /// `face_enhance` flag.
    pub fn upscale(image: Value, scale: f64, entry: &EntryPoint) -> Self {
        Self::versioned(
            UPSCALE_VERSION,
            json!({
                "image": image,
                "scale": entry.clamp_scale(scale),
                "face_enhance": entry.face_enhance,
            }),
        )
    }
}

/// Split `owner/model:hash` into `("owner/model", Some("hash"))`.
///
/// The version is the second colon-separated segment; an empty one counts
/// as absent.
fn split_model_version(model: &str) -> (&str, Option<&str>) {
    let mut parts = model.split(VERSION_SEPARATOR);
    let name = parts.next().unwrap_or(model);
    match parts.next() {
        Some(hash) if !hash.is_empty() => (name, Some(hash)),
        Some(_) => (name, None),
        None => (model, None),
    }
}

/// The one upstream call a request maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamCall {
    Poll { id: String },
    Predict {
        operation: Operation,
        invocation: ModelInvocation,
    },
}

impl UpstreamCall {
    /// Plan the upstream call for a classified request.
    pub fn plan(shape: RequestShape, entry: &EntryPoint) -> Self {
        match shape {
            RequestShape::Poll { id } => Self::Poll { id },
            RequestShape::ExplicitModel {
                model,
                input,
                version,
            } => Self::Predict {
                operation: Operation::Model,
                invocation: ModelInvocation::resolve(&model, input, version.as_deref()),
            },
            RequestShape::LegacyUpscale { image, scale } => Self::Predict {
                operation: Operation::Upscale,
                invocation: ModelInvocation::upscale(image, scale, entry),
            },
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Poll { .. } => Operation::Poll,
            Self::Predict { operation, .. } => *operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_removal_uses_model_endpoint_and_waits() {
        let inv = ModelInvocation::resolve(
            "bria-ai/bria-rmbg-2.0",
            json!({"image": "http://x"}),
            None,
        );
        assert_eq!(inv.endpoint, Endpoint::Model("bria-ai/bria-rmbg-2.0".into()));
        assert!(inv.prefer_wait);
        assert_eq!(inv.payload.version, None);
        assert_eq!(
            inv.endpoint.segments(),
            vec!["v1", "models", "bria-ai", "bria-rmbg-2.0", "predictions"]
        );
    }

    #[test]
    fn background_removal_ignores_explicit_version() {
        let inv = ModelInvocation::resolve("bria-ai/bria-rmbg-2.0", json!({}), Some("abc"));
        assert_eq!(inv.payload.version, None);
        assert!(inv.prefer_wait);
    }

    #[test]
    fn face_to_sticker_uses_pinned_version() {
        let inv = ModelInvocation::resolve(
            "fofr/face-to-sticker",
            json!({"image": "http://x"}),
            Some("client-version"),
        );
        assert_eq!(inv.endpoint, Endpoint::Predictions);
        assert_eq!(inv.payload.version.as_deref(), Some(FACE_TO_STICKER_VERSION));
        assert!(!inv.prefer_wait);
    }

    #[test]
    fn explicit_version_targets_predictions_endpoint() {
        let inv = ModelInvocation::resolve("owner/model", json!({"a": 1}), Some("v123"));
        assert_eq!(inv.endpoint, Endpoint::Predictions);
        assert_eq!(inv.payload.version.as_deref(), Some("v123"));
        assert_eq!(inv.payload.input, json!({"a": 1}));
    }

    #[test]
    fn explicit_version_wins_over_embedded_hash() {
        let inv = ModelInvocation::resolve("owner/model:embedded", json!({}), Some("explicit"));
        assert_eq!(inv.payload.version.as_deref(), Some("explicit"));
    }

    #[test]
    fn embedded_hash_is_split_out() {
        let inv = ModelInvocation::resolve("owner/model:abcdef", json!({"p": true}), None);
        assert_eq!(inv.endpoint, Endpoint::Predictions);
        assert_eq!(
            serde_json::to_value(&inv.payload).unwrap(),
            json!({"version": "abcdef", "input": {"p": true}})
        );
    }

    #[test]
    fn split_takes_second_segment_only() {
        assert_eq!(split_model_version("owner/model:abc:def"), ("owner/model", Some("abc")));
        assert_eq!(split_model_version("owner/model:"), ("owner/model", None));
        assert_eq!(split_model_version("owner/model"), ("owner/model", None));
    }

    #[test]
    fn empty_embedded_hash_falls_back_to_model_endpoint() {
        let inv = ModelInvocation::resolve("owner/model:", json!({}), None);
        assert_eq!(inv.endpoint, Endpoint::Model("owner/model".into()));
        assert_eq!(inv.payload.version, None);
    }

    #[test]
    fn bare_name_targets_model_endpoint_without_version() {
        let inv = ModelInvocation::resolve("black-forest-labs/flux-schnell", json!({}), None);
        assert_eq!(
            inv.endpoint,
            Endpoint::Model("black-forest-labs/flux-schnell".into())
        );
        assert_eq!(
            serde_json::to_value(&inv.payload).unwrap(),
            json!({"input": {}})
        );
    }

    #[test]
    fn upscale_applies_entry_point_constants() {
        let legacy = ModelInvocation::upscale(json!("http://x/img.png"), 3.0, &EntryPoint::LEGACY);
        assert_eq!(legacy.endpoint, Endpoint::Predictions);
        assert_eq!(legacy.payload.version.as_deref(), Some(UPSCALE_VERSION));
        assert_eq!(
            legacy.payload.input,
            json!({"image": "http://x/img.png", "scale": 3, "face_enhance": false})
        );

        let v2 = ModelInvocation::upscale(json!("http://x/img.png"), 15.0, &EntryPoint::V2);
        assert_eq!(
            v2.payload.input,
            json!({"image": "http://x/img.png", "scale": 4, "face_enhance": true})
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = ModelInvocation::resolve("owner/model:abc", json!({"x": 1}), None);
        let b = ModelInvocation::resolve("owner/model:abc", json!({"x": 1}), None);
        assert_eq!(a, b);
    }

    #[test]
    fn plan_maps_shapes_to_operations() {
        let poll = UpstreamCall::plan(RequestShape::Poll { id: "abc123".into() }, &EntryPoint::V2);
        assert_eq!(poll, UpstreamCall::Poll { id: "abc123".into() });
        assert_eq!(poll.operation(), Operation::Poll);

        let model = UpstreamCall::plan(
            RequestShape::ExplicitModel {
                model: "owner/model:abcdef".into(),
                input: json!({}),
                version: None,
            },
            &EntryPoint::V2,
        );
        assert_eq!(model.operation(), Operation::Model);

        let upscale = UpstreamCall::plan(
            RequestShape::LegacyUpscale {
                image: json!("http://x"),
                scale: 9.0,
            },
            &EntryPoint::LEGACY,
        );
        match upscale {
            UpstreamCall::Predict {
                operation: Operation::Upscale,
                invocation,
            } => assert_eq!(invocation.payload.input["scale"], 9),
            other => panic!("expected upscale, got {other:?}"),
        }
    }

    #[test]
    fn poll_segments_keep_id_as_one_segment() {
        let endpoint = Endpoint::Prediction("a/b".into());
        assert_eq!(endpoint.segments(), vec!["v1", "predictions", "a/b"]);
    }
}
