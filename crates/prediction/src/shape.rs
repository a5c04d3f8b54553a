//! Request classification
//!
//! Every inbound request is turned into exactly one `RequestShape` before any
//! upstream call is considered. Classification is pure: a body that does not
//! fit a shape is rejected here, so malformed requests never cost a network
//! round trip.

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// The three request shapes the proxy accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestShape {
    /// `GET ?id=...`: relay the status of an existing prediction
    Poll { id: String },
    /// `POST {model, input, version?}`: run a specific model
    ExplicitModel {
        model: String,
        input: Value,
        version: Option<String>,
    },
    /// `POST {image, scale}`: Real-ESRGAN upscale. `scale` is the parsed,
    /// not yet rounded or clamped, factor.
    LegacyUpscale { image: Value, scale: f64 },
}

impl RequestShape {
    /// Classify a GET request from its `id` query parameter.
    ///
    /// The id is used untouched. Ids that a URL path would reinterpret
    /// (`.`, `..`) or that contain whitespace are rejected rather than
    /// altered.
    pub fn from_query(id: Option<&str>) -> Result<Self, ValidationError> {
        match id {
            None | Some("") => Err(ValidationError::MissingPredictionId),
            Some("." | "..") => Err(ValidationError::InvalidPredictionId),
            Some(id) if id.contains(char::is_whitespace) => {
                Err(ValidationError::InvalidPredictionId)
            }
            Some(id) => Ok(Self::Poll { id: id.to_owned() }),
        }
    }

    /// Parse a raw POST body and classify it.
    pub fn from_bytes(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
        match value {
            Value::Object(map) => Self::from_body(map),
            _ => Err(ValidationError::InvalidJson),
        }
    }

    /// Classify a parsed POST body.
    ///
    /// `{model, input}` wins over `{image, scale}` when both are present.
    pub fn from_body(mut body: Map<String, Value>) -> Result<Self, ValidationError> {
        if is_present(body.get("model")) && is_present(body.get("input")) {
            let model = match body.remove("model") {
                Some(Value::String(model)) => model,
                _ => return Err(ValidationError::InvalidModel),
            };
            let input = body.remove("input").unwrap_or(Value::Null);
            let version = match body.remove("version") {
                Some(v) if !is_present(Some(&v)) => None,
                Some(Value::String(v)) => Some(v),
                Some(_) => return Err(ValidationError::InvalidVersion),
                None => None,
            };
            return Ok(Self::ExplicitModel {
                model,
                input,
                version,
            });
        }

        if is_present(body.get("image")) && is_present(body.get("scale")) {
            let scale = body
                .get("scale")
                .and_then(parse_scale)
                .ok_or(ValidationError::InvalidScale)?;
            let image = body.remove("image").unwrap_or(Value::Null);
            return Ok(Self::LegacyUpscale { image, scale });
        }

        Err(ValidationError::MissingFields)
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Poll { .. } => "poll",
            Self::ExplicitModel { .. } => "model",
            Self::LegacyUpscale { .. } => "upscale",
        }
    }
}

/// A field counts as present unless it is missing, `null`, `false`, zero or
/// the empty string. Empty objects and arrays are present.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

/// Accept a JSON number or a numeric string; reject anything non-finite.
fn parse_scale(value: &Value) -> Option<f64> {
    let scale = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    scale.is_finite().then_some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(body: Value) -> Result<RequestShape, ValidationError> {
        match body {
            Value::Object(map) => RequestShape::from_body(map),
            other => panic!("test body must be an object, got {other}"),
        }
    }

    #[test]
    fn poll_requires_non_empty_id() {
        assert_eq!(
            RequestShape::from_query(Some("abc123")).unwrap(),
            RequestShape::Poll {
                id: "abc123".into()
            }
        );
        assert_eq!(
            RequestShape::from_query(None).unwrap_err(),
            ValidationError::MissingPredictionId
        );
        assert_eq!(
            RequestShape::from_query(Some("")).unwrap_err(),
            ValidationError::MissingPredictionId
        );
    }

    #[test]
    fn poll_rejects_dot_segments_and_whitespace() {
        for id in [".", "..", "  ", " abc123", "abc 123", "abc123\n"] {
            assert_eq!(
                RequestShape::from_query(Some(id)).unwrap_err(),
                ValidationError::InvalidPredictionId,
                "id {id:?} must be rejected"
            );
        }
    }

    #[test]
    fn poll_id_is_not_rewritten() {
        assert_eq!(
            RequestShape::from_query(Some("..abc/x?y")).unwrap(),
            RequestShape::Poll {
                id: "..abc/x?y".into()
            }
        );
    }

    #[test]
    fn model_and_input_classify_as_explicit_model() {
        let shape = classify(json!({
            "model": "bria-ai/bria-rmbg-2.0",
            "input": {"image": "http://x"}
        }))
        .unwrap();
        assert_eq!(
            shape,
            RequestShape::ExplicitModel {
                model: "bria-ai/bria-rmbg-2.0".into(),
                input: json!({"image": "http://x"}),
                version: None,
            }
        );
    }

    #[test]
    fn explicit_version_is_captured() {
        let shape = classify(json!({
            "model": "owner/model",
            "input": {},
            "version": "abc"
        }))
        .unwrap();
        assert!(matches!(
            shape,
            RequestShape::ExplicitModel { version: Some(ref v), .. } if v == "abc"
        ));
    }

    #[test]
    fn empty_version_is_ignored() {
        let shape = classify(json!({"model": "m", "input": {}, "version": ""})).unwrap();
        assert!(matches!(
            shape,
            RequestShape::ExplicitModel { version: None, .. }
        ));
    }

    #[test]
    fn explicit_model_wins_over_upscale_fields() {
        let shape = classify(json!({
            "model": "owner/model",
            "input": {"x": 1},
            "image": "http://x/img.png",
            "scale": 3
        }))
        .unwrap();
        assert_eq!(shape.kind(), "model");
    }

    #[test]
    fn image_and_scale_classify_as_upscale() {
        let shape = classify(json!({"image": "http://x/img.png", "scale": "3"})).unwrap();
        assert_eq!(
            shape,
            RequestShape::LegacyUpscale {
                image: json!("http://x/img.png"),
                scale: 3.0,
            }
        );
    }

    #[test]
    fn numeric_scale_is_accepted() {
        let shape = classify(json!({"image": "http://x", "scale": 15})).unwrap();
        assert!(matches!(shape, RequestShape::LegacyUpscale { scale, .. } if scale == 15.0));
    }

    #[test]
    fn empty_body_is_missing_fields() {
        assert_eq!(
            classify(json!({})).unwrap_err(),
            ValidationError::MissingFields
        );
    }

    #[test]
    fn partial_shapes_are_missing_fields() {
        for body in [
            json!({"model": "owner/model"}),
            json!({"input": {}}),
            json!({"image": "http://x"}),
            json!({"scale": 2}),
            json!({"model": "m", "scale": 2}),
        ] {
            assert_eq!(
                classify(body.clone()).unwrap_err(),
                ValidationError::MissingFields,
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn falsy_values_count_as_missing() {
        for body in [
            json!({"image": "", "scale": 2}),
            json!({"image": "http://x", "scale": 0}),
            json!({"image": null, "scale": 2}),
            json!({"model": "m", "input": false}),
            json!({"model": "", "input": {}}),
        ] {
            assert_eq!(
                classify(body.clone()).unwrap_err(),
                ValidationError::MissingFields,
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn empty_input_object_is_present() {
        let shape = classify(json!({"model": "m", "input": {}})).unwrap();
        assert_eq!(shape.kind(), "model");
    }

    #[test]
    fn non_string_model_is_rejected() {
        assert_eq!(
            classify(json!({"model": 42, "input": {}})).unwrap_err(),
            ValidationError::InvalidModel
        );
    }

    #[test]
    fn non_string_version_is_rejected() {
        assert_eq!(
            classify(json!({"model": "m", "input": {}, "version": 7})).unwrap_err(),
            ValidationError::InvalidVersion
        );
    }

    #[test]
    fn non_numeric_scale_is_rejected() {
        assert_eq!(
            classify(json!({"image": "http://x", "scale": "big"})).unwrap_err(),
            ValidationError::InvalidScale
        );
        assert_eq!(
            classify(json!({"image": "http://x", "scale": [2]})).unwrap_err(),
            ValidationError::InvalidScale
        );
    }

    #[test]
    fn raw_bytes_must_be_a_json_object() {
        assert_eq!(
            RequestShape::from_bytes(b"not json").unwrap_err(),
            ValidationError::InvalidJson
        );
        assert_eq!(
            RequestShape::from_bytes(b"[1,2]").unwrap_err(),
            ValidationError::InvalidJson
        );
        assert_eq!(
            RequestShape::from_bytes(b"{}").unwrap_err(),
            ValidationError::MissingFields
        );
    }
}
