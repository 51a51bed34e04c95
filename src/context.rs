//! Per-request context shared by the lifecycle stages

use axum::{
    extract::{ConnectInfo, Request},
    http::{header::USER_AGENT, HeaderValue, Method},
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use crate::config::Config;

/// Identity and request facts resolved once by the correlation stage.
///
/// Inserted into request extensions and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id as text, used in log events
    pub correlation_id: String,
    /// Inbound correlation header, echoed byte for byte when present
    pub inbound_correlation: Option<HeaderValue>,
    pub api_version: String,
    pub started_at: Instant,
    pub method: Method,
    /// Path and query as received
    pub url: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Load balancer probe; exempt from request logging
    pub health_check: bool,
}

impl RequestContext {
    pub fn resolve(request: &Request, config: &Config) -> Self {
        let headers = request.headers();

        // Header values may carry non-UTF-8 bytes; only an empty value is replaced
        let inbound_correlation = headers
            .get(&config.http.correlation_header)
            .filter(|value| !String::from_utf8_lossy(value.as_bytes()).trim().is_empty())
            .cloned();
        let correlation_id = inbound_correlation
            .as_ref()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_else(generate_correlation_id);

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let url = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        let health_check = request.method() == Method::GET
            && url == "/"
            && user_agent.as_deref() == Some(config.http.health_check_user_agent.as_str());

        Self {
            correlation_id,
            inbound_correlation,
            api_version: config.app.api_version.clone(),
            started_at: Instant::now(),
            method: request.method().clone(),
            url,
            client_ip: client_ip(request),
            user_agent,
            health_check,
        }
    }

    /// Milliseconds since the request was accepted
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn client_ip(request: &Request) -> Option<String> {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip().to_string());
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}
