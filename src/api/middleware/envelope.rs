use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    middleware::Next,
    response::Response,
};

use crate::api::handlers::AppState;
use crate::context::RequestContext;
use crate::envelope::{fallback_response, HandlerOutput};
use crate::errors::FailureMarker;

/// Turns handler outcomes into envelopes.
///
/// Failures go through the failure translator, success values through the
/// envelope transformer. Responses carrying neither pass unchanged.
pub async fn envelope_stage(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::resolve(&request, &state.config));

    let mut response = next.run(request).await;

    if let Some(FailureMarker(failure)) = response.extensions_mut().remove::<FailureMarker>() {
        return state.failure_translator().into_response(&failure, &ctx);
    }

    let Some(HandlerOutput(value)) = response.extensions_mut().remove::<HandlerOutput>() else {
        return response;
    };

    let envelope = state.envelope_transformer().transform(value, &ctx.url);
    let bytes = match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response envelope");
            return fallback_response(&state.config.app.api_version);
        }
    };

    let (mut parts, _) = response.into_parts();
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
