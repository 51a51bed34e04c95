use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use serde_json::json;
use tracing::Instrument;

use crate::api::handlers::AppState;
use crate::context::RequestContext;

/// First stage of every request.
///
/// Resolves the correlation id and request context, logs the request start,
/// and echoes the correlation id on the response.
pub async fn correlation_stage(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::resolve(&request, &state.config);
    request.extensions_mut().insert(ctx.clone());

    if !ctx.health_check {
        state.logger.info(
            format!("HTTP {} {} - Started", ctx.method, ctx.url),
            Some("HttpRequest"),
            Some(&ctx.correlation_id),
            Some(json!({
                "method": ctx.method.as_str(),
                "url": ctx.url,
                "ip": ctx.client_ip,
                "userAgent": ctx.user_agent,
            })),
        );
    }

    let span = tracing::info_span!("request", request_id = %ctx.correlation_id);
    let mut response = next.run(request).instrument(span).await;

    let echoed = match ctx.inbound_correlation.clone() {
        Some(inbound) => Ok(inbound),
        None => HeaderValue::from_str(&ctx.correlation_id),
    };
    match echoed {
        Ok(value) => {
            response
                .headers_mut()
                .insert(state.config.http.correlation_header.clone(), value);
        }
        Err(err) => {
            tracing::warn!(error = %err, "Correlation id is not a valid header value");
        }
    }

    let elapsed_ms = ctx.elapsed_ms();
    if !ctx.health_check && elapsed_ms > state.config.logging.slow_handler_ceiling_ms {
        state.logger.log_performance(
            "HTTP Request",
            elapsed_ms,
            Some(json!({
                "method": ctx.method.as_str(),
                "url": ctx.url,
                "statusCode": response.status().as_u16(),
            })),
            Some(&ctx.correlation_id),
        );
    }

    response
}
