use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::redact::redact_map;
use crate::config::{Config, Environment};

/// Metadata attached to a log event
pub type LogMeta = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Verbose => "verbose",
        };
        f.write_str(name)
    }
}

/// One structured log record. Built and handed to the sink synchronously.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<LogMeta>,
    pub service: String,
    pub environment: Environment,
    pub timestamp: DateTime<Utc>,
}

/// Destination for log events. Must tolerate concurrent writers.
pub trait LogSink: Send + Sync {
    fn write(&self, event: LogEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

macro_rules! emit {
    ($macro:ident, $event:expr, $meta:expr) => {
        tracing::$macro!(
            context = %$event.context,
            request_id = $event.request_id.as_deref().unwrap_or("-"),
            service = %$event.service,
            environment = %$event.environment,
            meta = %$meta,
            "{}",
            $event.message
        )
    };
}

impl LogSink for TracingSink {
    fn write(&self, event: LogEvent) {
        let meta = event
            .meta
            .as_ref()
            .map(|meta| Value::Object(meta.clone()).to_string())
            .unwrap_or_default();

        match event.level {
            LogLevel::Error => emit!(error, event, meta),
            LogLevel::Warn => emit!(warn, event, meta),
            LogLevel::Info => emit!(info, event, meta),
            LogLevel::Debug => emit!(debug, event, meta),
            LogLevel::Verbose => emit!(trace, event, meta),
        }
    }
}

/// Keeps every event in memory; used to assert on logging behaviour
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Application logger. Constructed once at startup and shared by reference.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
    environment: Environment,
    sensitive_fields: Arc<[String]>,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLogger")
            .field("service", &self.service)
            .field("environment", &self.environment)
            .field("sensitive_fields", &self.sensitive_fields)
            .finish_non_exhaustive()
    }
}

impl StructuredLogger {
    pub fn new(config: &Config, sink: Arc<dyn LogSink>) -> Self {
        Self {
            service: config.app.name.clone(),
            environment: config.app.environment,
            sensitive_fields: config.logging.sensitive_fields.clone().into(),
            sink,
        }
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        let meta = meta.map(|meta| {
            let mut map = into_meta(meta);
            redact_map(&mut map, &self.sensitive_fields[..]);
            map
        });

        self.sink.write(LogEvent {
            level,
            message: message.into(),
            context: context.unwrap_or("Application").to_string(),
            request_id: request_id.map(str::to_string),
            meta,
            service: self.service.clone(),
            environment: self.environment,
            timestamp: Utc::now(),
        });
    }

    pub fn info(
        &self,
        message: impl Into<String>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        self.log(LogLevel::Info, message, context, request_id, meta);
    }

    pub fn warn(
        &self,
        message: impl Into<String>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        self.log(LogLevel::Warn, message, context, request_id, meta);
    }

    /// Error event; `trace` is stored under `meta.trace`
    pub fn error(
        &self,
        message: impl Into<String>,
        trace: Option<&str>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        let mut map = meta.map(into_meta).unwrap_or_default();
        if let Some(trace) = trace {
            map.insert("trace".to_string(), Value::String(trace.to_string()));
        }
        let meta = (!map.is_empty()).then_some(Value::Object(map));
        self.log(LogLevel::Error, message, context, request_id, meta);
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        self.log(LogLevel::Debug, message, context, request_id, meta);
    }

    pub fn verbose(
        &self,
        message: impl Into<String>,
        context: Option<&str>,
        request_id: Option<&str>,
        meta: Option<Value>,
    ) {
        self.log(LogLevel::Verbose, message, context, request_id, meta);
    }

    /// Timing event: warn above one second, debug otherwise
    pub fn log_performance(
        &self,
        operation: &str,
        duration_ms: u64,
        meta: Option<Value>,
        request_id: Option<&str>,
    ) {
        let level = if duration_ms > 1000 {
            LogLevel::Warn
        } else {
            LogLevel::Debug
        };

        let mut map = meta.map(into_meta).unwrap_or_default();
        map.insert("operation".to_string(), json!(operation));
        map.insert("durationMs".to_string(), json!(duration_ms));

        self.log(
            level,
            format!("Operation {operation} took {duration_ms}ms"),
            Some("Performance"),
            request_id,
            Some(Value::Object(map)),
        );
    }

    pub fn log_business_event(&self, name: &str, data: Value, request_id: Option<&str>) {
        self.info(
            format!("Business Event: {name}"),
            Some("BusinessEvent"),
            request_id,
            Some(data),
        );
    }
}

fn into_meta(value: Value) -> LogMeta {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_logger() -> (StructuredLogger, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let logger = StructuredLogger::new(&Config::default(), sink.clone());
        (logger, sink)
    }

    #[test]
    fn test_attaches_service_and_environment() {
        let (logger, sink) = recording_logger();
        logger.info("hello", None, Some("req-1"), None);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[0].context, "Application");
        assert_eq!(events[0].request_id.as_deref(), Some("req-1"));
        assert_eq!(events[0].service, "service-skeleton");
        assert_eq!(events[0].environment, Environment::Development);
        assert_eq!(events[0].meta, None);
    }

    #[test]
    fn test_redacts_configured_meta_fields() {
        let (logger, sink) = recording_logger();
        logger.warn(
            "payment",
            Some("Billing"),
            None,
            Some(json!({"creditCard": "4111", "token": "t", "amount": 3})),
        );

        let meta = sink.events()[0].meta.clone().unwrap();
        assert_eq!(meta["creditCard"], "[REDACTED]");
        assert_eq!(meta["token"], "[REDACTED]");
        assert_eq!(meta["amount"], 3);
    }

    #[test]
    fn test_error_carries_trace() {
        let (logger, sink) = recording_logger();
        logger.error("boom", Some("stack"), Some("Worker"), None, Some(json!({"attempt": 2})));

        let event = &sink.events()[0];
        assert_eq!(event.level, LogLevel::Error);
        let meta = event.meta.as_ref().unwrap();
        assert_eq!(meta["trace"], "stack");
        assert_eq!(meta["attempt"], 2);
    }

    #[test]
    fn test_performance_level_depends_on_duration() {
        let (logger, sink) = recording_logger();
        logger.log_performance("GET /users", 450, None, None);
        logger.log_performance("GET /users", 1500, Some(json!({"method": "GET"})), None);

        let events = sink.events();
        assert_eq!(events[0].level, LogLevel::Debug);
        assert_eq!(events[0].message, "Operation GET /users took 450ms");
        assert_eq!(events[1].level, LogLevel::Warn);
        let meta = events[1].meta.as_ref().unwrap();
        assert_eq!(meta["durationMs"], 1500);
        assert_eq!(meta["method"], "GET");
        assert!(events.iter().all(|event| event.context == "Performance"));
    }

    #[test]
    fn test_business_event() {
        let (logger, sink) = recording_logger();
        logger.log_business_event("UserCreated", json!({"userId": 1}), Some("req-9"));

        let event = &sink.events()[0];
        assert_eq!(event.message, "Business Event: UserCreated");
        assert_eq!(event.context, "BusinessEvent");
    }

    #[test]
    fn test_event_serializes_with_fixed_fields() {
        let (logger, sink) = recording_logger();
        logger.debug("x", Some("Ctx"), Some("id"), Some(json!({"k": "v"})));

        let value = serde_json::to_value(&sink.events()[0]).unwrap();
        assert_eq!(value["level"], "debug");
        assert_eq!(value["requestId"], "id");
        assert_eq!(value["meta"], json!({"k": "v"}));
        assert_eq!(value["environment"], "development");
    }
}
