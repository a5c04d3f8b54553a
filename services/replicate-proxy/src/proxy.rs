//! Request dispatcher
//!
//! One dispatcher serves every entry point:
//! credential check → classify → resolve → one upstream call →
//! classify failure → shape response. Every response, including errors and
//! preflights, carries the same CORS headers and a JSON content type.

use axum::body::{Body, Bytes};
use axum::extract::Query;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use prediction::{ClassifiedError, EntryPoint, ErrorKind, RequestShape, UpstreamCall};
use provider::Provider;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::upstream;

/// Largest accepted POST body. Images may arrive inline as data URIs.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state passed to the entry-point handlers
#[derive(Clone)]
pub struct ProxyState {
    pub client: reqwest::Client,
    /// `None` when no credential is configured; every proxied request then
    /// fails with 500 before classification.
    pub provider: Option<Arc<dyn Provider>>,
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct PollQuery {
    id: Option<String>,
}

/// Fixed header set on every entry-point response.
fn standard_headers() -> [(HeaderName, &'static str); 4] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (CONTENT_TYPE, "application/json"),
    ]
}

/// Preflight: 200, empty body, regardless of configuration.
pub fn preflight() -> Response {
    (StatusCode::OK, standard_headers(), "").into_response()
}

/// Relay a successful upstream payload byte for byte. Any 2xx becomes 200.
fn relay(body: Bytes) -> Response {
    (StatusCode::OK, standard_headers(), body).into_response()
}

/// Render a classified error as the stable envelope.
pub fn error_response(err: &ClassifiedError) -> Response {
    let status = StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, standard_headers(), err.body().to_string()).into_response()
}

/// Dispatch one entry-point request.
#[instrument(skip_all, fields(request_id = %request_id, entry = entry.name, method = %request.method()))]
pub async fn dispatch(
    state: &ProxyState,
    entry: &EntryPoint,
    request: Request<Body>,
    request_id: String,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();

    if method == Method::OPTIONS {
        return preflight();
    }

    state.requests_total.fetch_add(1, Ordering::Relaxed);

    let response = match handle(state, entry, request).await {
        Ok(body) => relay(body),
        Err(err) => {
            if err.kind != ErrorKind::Validation && err.kind != ErrorKind::MethodNotAllowed {
                state.errors_total.fetch_add(1, Ordering::Relaxed);
            }
            error_response(&err)
        }
    };

    crate::metrics::record_request(
        response.status().as_u16(),
        method.as_str(),
        entry.name,
        started.elapsed().as_secs_f64(),
    );
    response
}

/// Classify, resolve, invoke. `Ok` carries the upstream success payload.
async fn handle(
    state: &ProxyState,
    entry: &EntryPoint,
    request: Request<Body>,
) -> Result<Bytes, ClassifiedError> {
    let Some(provider) = state.provider.as_deref() else {
        error!("REPLICATE_TOKEN is not configured, rejecting request");
        return Err(ClassifiedError::configuration());
    };

    let shape = classify(request).await.map_err(|err| {
        debug!(error = %err.error, status = err.status, "request rejected before upstream call");
        err
    })?;
    debug!(shape = shape.kind(), "request classified");

    let call = UpstreamCall::plan(shape, entry);
    let operation = call.operation();

    let result = match upstream::invoke(&state.client, provider, &call).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to prepare upstream call");
            return Err(ClassifiedError::internal());
        }
    };

    if result.is_success() {
        return Ok(result.body);
    }

    let classification = provider.classify_error(result.status);
    let error_type = result
        .failure
        .map(|f| f.as_label())
        .unwrap_or_else(|| classification.as_label());
    crate::metrics::record_upstream_error(error_type);
    warn!(
        status = result.status,
        operation = operation.as_str(),
        error_type,
        "upstream call failed"
    );

    Err(
        ClassifiedError::upstream(operation, classification, result.status, result.details())
            .scrubbed(provider),
    )
}

/// Fully determine the request shape. No network access happens here.
async fn classify(request: Request<Body>) -> Result<RequestShape, ClassifiedError> {
    let validation = |e| ClassifiedError::validation(&e);
    let method = request.method().clone();
    match method {
        Method::GET => {
            let id = Query::<PollQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(q)| q.id);
            RequestShape::from_query(id.as_deref()).map_err(validation)
        }
        Method::POST => {
            let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
                .await
                .map_err(|e| {
                    warn!(error = %e, "failed to read request body");
                    ClassifiedError::validation(&prediction::ValidationError::UnreadableBody)
                })?;
            RequestShape::from_bytes(&bytes).map_err(validation)
        }
        _ => Err(ClassifiedError::method_not_allowed()),
    }
}
