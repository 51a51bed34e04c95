use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Query, RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    RequestExt,
};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::collections::HashMap;

use crate::api::handlers::AppState;
use crate::context::RequestContext;
use crate::errors::{DomainFailure, ErrorKey, Failure, FailureMarker, UnexpectedFailure};
use crate::logger::redact::{prepare_body_for_logging, redacted_copy};

/// Wraps each matched handler: timing, completion log and failure summary.
///
/// Failure responses are logged here at info level with the redacted request
/// inputs; the failure translator owns the warning/error event.
pub async fn lifecycle_stage(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::resolve(&request, &state.config));

    if ctx.health_check {
        return next.run(request).await;
    }

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let operation = format!("{} {}", ctx.method, route);
    let request_id = Some(ctx.correlation_id.as_str());

    let query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(query)| query)
        .unwrap_or_default();
    let params: Map<String, Value> = match request.extract_parts::<RawPathParams>().await {
        Ok(params) => params
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect(),
        Err(_) => Map::new(),
    };

    state
        .logger
        .debug(format!("{operation} - Executing"), Some(&operation), request_id, None);

    let started = std::time::Instant::now();
    let (body, response) = match buffer_body(request, state.config.http.body_limit_bytes).await {
        Ok((request, body)) => (body, next.run(request).await),
        Err(failure) => (Bytes::new(), failure.into_response()),
    };
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Some(FailureMarker(failure)) = response.extensions().get::<FailureMarker>().cloned() {
        let (error_code, name) = match failure.as_ref() {
            Failure::Domain(domain) => (Some(domain.code()), domain.key().as_str()),
            Failure::Unexpected(_) => (None, failure.name()),
        };
        let request_data = json!({
            "body": prepare_body_for_logging(&body),
            "query": redacted_copy(&json!(query)),
            "params": redacted_copy(&Value::Object(params)),
        });

        state.logger.info(
            format!("{operation} - Error: {}", failure.message()),
            Some(&operation),
            request_id,
            Some(json!({
                "duration": duration_ms,
                "error": {
                    "message": failure.message(),
                    "name": name,
                    "statusCode": failure.status(),
                    "errorCode": error_code,
                },
                "requestData": request_data,
            })),
        );
        return response;
    }

    let status = response.status();
    state.logger.info(
        format!("{operation} - Completed {} - {duration_ms}ms", status.as_u16()),
        Some(&operation),
        request_id,
        None,
    );

    let thresholds = &state.config.logging;
    if duration_ms > thresholds.slow_handler_warn_ms && duration_ms <= thresholds.slow_handler_ceiling_ms {
        state.logger.log_performance(
            &operation,
            duration_ms,
            Some(json!({"method": ctx.method.as_str(), "url": ctx.url})),
            request_id,
        );
    }

    response
}

/// Read the body so it can be echoed on failure, then hand back an equivalent request
async fn buffer_body(request: Request, limit: usize) -> Result<(Request, Bytes), Failure> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|err| {
        DomainFailure::new(ErrorKey::InvalidInput)
            .with_message("The request body could not be read")
            .with_details(json!({ "body": err.to_string() }))
    })?;
    Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes))
}

/// Panic hook for the catch-panic layer: the panic becomes an unexpected failure
pub fn panic_to_failure(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };

    Failure::Unexpected(UnexpectedFailure::new("Handler panicked", format!("panic: {detail}")))
        .into_response()
}
