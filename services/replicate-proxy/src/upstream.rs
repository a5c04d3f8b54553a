//! Upstream invoker
//!
//! Makes exactly one HTTP call per request and always hands back an
//! `UpstreamResult`. Status interpretation is left to the caller; transport
//! faults and unparseable success bodies are folded into a synthetic 502 so
//! nothing here escapes as an unhandled error. Success bodies are kept as
//! the upstream's bytes and never re-serialized.

use axum::body::Bytes;
use prediction::{Endpoint, UpstreamCall};
use provider::Provider;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Status reported when the upstream could not be reached or answered
/// with a success status but an unparseable body.
pub const SYNTHETIC_FAILURE_STATUS: u16 = 502;

/// Why a result carries the synthetic status instead of a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection, TLS, timeout or body read error
    Network,
    /// 2xx response whose body is not JSON
    MalformedBody,
}

impl TransportFailure {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Network => "transport",
            Self::MalformedBody => "malformed_body",
        }
    }
}

/// Raw outcome of the single upstream call.
#[derive(Debug)]
pub struct UpstreamResult {
    pub status: u16,
    /// Upstream body as received. Valid JSON whenever `is_success()`.
    pub body: Bytes,
    pub failure: Option<TransportFailure>,
}

impl UpstreamResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed for an error envelope; `{}` when it is not JSON.
    pub fn details(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            debug!(
                status = self.status,
                error = %e,
                "upstream body is not JSON, using empty details"
            );
            Value::Object(Map::new())
        })
    }

    fn synthetic(failure: TransportFailure) -> Self {
        Self {
            status: SYNTHETIC_FAILURE_STATUS,
            body: Bytes::from_static(b"{}"),
            failure: Some(failure),
        }
    }
}

/// Build the absolute URL for an endpoint, percent-encoding each segment.
///
/// Empty, `.` and `..` segments are refused: the URL parser would drop or
/// collapse them and the request would land on a different endpoint.
pub fn endpoint_url(base: &Url, endpoint: &Endpoint) -> Result<Url> {
    let segments = endpoint.segments();
    if let Some(bad) = segments
        .iter()
        .find(|s| matches!(**s, "" | "." | ".."))
    {
        return Err(Error::PathSegment((*bad).to_owned()));
    }

    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| Error::UpstreamUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Perform the upstream call for `call`.
///
/// Returns `Err` only for local faults (credential cannot be encoded, base
/// URL unusable); those happen before any bytes leave the process.
pub async fn invoke(
    client: &reqwest::Client,
    provider: &dyn Provider,
    call: &UpstreamCall,
) -> Result<UpstreamResult> {
    let mut headers = HeaderMap::new();
    provider.prepare_request(&mut headers)?;

    let request = match call {
        UpstreamCall::Poll { id } => {
            let url = endpoint_url(provider.api_url(), &Endpoint::Prediction(id.clone()))?;
            client.request(Method::GET, url).headers(headers)
        }
        UpstreamCall::Predict { invocation, .. } => {
            let url = endpoint_url(provider.api_url(), &invocation.endpoint)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            if invocation.prefer_wait {
                headers.insert(
                    HeaderName::from_static("prefer"),
                    HeaderValue::from_static("wait"),
                );
            }
            let body = serde_json::to_vec(&invocation.payload)?;
            client.request(Method::POST, url).headers(headers).body(body)
        }
    };

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "upstream request failed");
            return Ok(UpstreamResult::synthetic(TransportFailure::Network));
        }
    };

    let status = response.status().as_u16();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(status, error = %e, "failed to read upstream response body");
            return Ok(UpstreamResult::synthetic(TransportFailure::Network));
        }
    };

    let result = UpstreamResult {
        status,
        body: bytes,
        failure: None,
    };
    if result.is_success() {
        if let Err(e) = serde_json::from_slice::<IgnoredAny>(&result.body) {
            warn!(status, error = %e, "upstream success body is not JSON");
            return Ok(UpstreamResult::synthetic(TransportFailure::MalformedBody));
        }
    }
    Ok(result)
}
