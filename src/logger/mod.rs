//! Structured logging with redaction
//!
//! Events are built by [`StructuredLogger`] and handed to a [`LogSink`].
//! The production sink forwards to `tracing`; the subscriber prints JSON
//! outside development and a human-readable format during development.

pub mod redact;
pub mod service;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

pub use service::{LogEvent, LogLevel, LogMeta, LogSink, RecordingSink, StructuredLogger, TracingSink};

/// Install the global tracing subscriber
pub fn init_tracing(environment: Environment) {
    let default_filter = match environment {
        Environment::Development => "debug,hyper=info,tower_http=info",
        Environment::Staging | Environment::Production => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match environment {
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).init(),
        Environment::Staging | Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init(),
    }
}
