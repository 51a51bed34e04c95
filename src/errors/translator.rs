use axum::{http::StatusCode, response::Response};
use serde_json::{json, Value};

use super::codes::INTERNAL_ERROR_CODE;
use super::failure::{DomainFailure, Failure, UnexpectedFailure};
use super::registry::ErrorRegistry;
use crate::config::Environment;
use crate::context::RequestContext;
use crate::envelope::{ErrorBody, ResponseEnvelope, ResponseMeta, RENDER_FAILED_MESSAGE};
use crate::logger::StructuredLogger;

/// Message returned for unexpected failures in production
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// The single place where failures become responses and failure logs
#[derive(Debug, Clone, Copy)]
pub struct FailureTranslator<'a> {
    registry: &'a ErrorRegistry,
    logger: &'a StructuredLogger,
    environment: Environment,
    version: &'a str,
}

impl<'a> FailureTranslator<'a> {
    pub fn new(
        registry: &'a ErrorRegistry,
        logger: &'a StructuredLogger,
        environment: Environment,
        version: &'a str,
    ) -> Self {
        Self {
            registry,
            logger,
            environment,
            version,
        }
    }

    /// Log the failure once and build its envelope
    pub fn translate(&self, failure: &Failure, ctx: &RequestContext) -> (StatusCode, ResponseEnvelope) {
        let status =
            StatusCode::from_u16(failure.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error = self.error_body(failure).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to derive error body");
            ErrorBody::new(INTERNAL_ERROR_CODE, RENDER_FAILED_MESSAGE)
        });

        self.log(failure, status, ctx);

        let path = (!self.environment.is_production()).then(|| ctx.url.clone());
        let envelope = ResponseEnvelope::failure(error, ResponseMeta::new(self.version, path));
        (status, envelope)
    }

    pub fn into_response(&self, failure: &Failure, ctx: &RequestContext) -> Response {
        let (status, envelope) = self.translate(failure, ctx);
        envelope.into_http(status)
    }

    fn error_body(&self, failure: &Failure) -> Result<ErrorBody, serde_json::Error> {
        match failure {
            Failure::Domain(domain) => {
                let mut body = ErrorBody::new(domain.code(), domain.message());
                body.sub_code = domain.sub_code();
                if !self.environment.is_production() || domain.is_user_friendly() {
                    body.details = domain.details().map(serde_json::to_value).transpose()?;
                }
                Ok(body)
            }
            Failure::Unexpected(unexpected) => {
                let message = if self.environment.is_production() || unexpected.message.is_empty() {
                    GENERIC_INTERNAL_MESSAGE
                } else {
                    unexpected.message.as_str()
                };
                Ok(ErrorBody::new(INTERNAL_ERROR_CODE, message))
            }
        }
    }

    fn log(&self, failure: &Failure, status: StatusCode, ctx: &RequestContext) {
        let request_meta = json!({
            "status": status.as_u16(),
            "path": ctx.url,
            "method": ctx.method.as_str(),
            "ip": ctx.client_ip,
            "userAgent": ctx.user_agent,
        });

        match failure {
            Failure::Domain(domain) => self.log_domain(domain, status, ctx, request_meta),
            Failure::Unexpected(unexpected) => self.log_unexpected(unexpected, ctx, request_meta),
        }
    }

    fn log_domain(&self, domain: &DomainFailure, status: StatusCode, ctx: &RequestContext, mut meta: Value) {
        if !self.registry.definition_of(domain.key()).logging {
            return;
        }

        if let Value::Object(map) = &mut meta {
            map.insert("code".to_string(), json!(domain.code()));
            map.insert("subCode".to_string(), json!(domain.sub_code()));
            map.insert("details".to_string(), json!(domain.details()));
            map.insert("errorKey".to_string(), json!(domain.key()));
        }

        let message = format!("Business exception: {domain}");
        let request_id = Some(ctx.correlation_id.as_str());

        if status.is_server_error() {
            self.logger.error(message, None, Some("BusinessException"), request_id, Some(meta));
        } else {
            self.logger.warn(message, Some("BusinessException"), request_id, Some(meta));
        }
    }

    fn log_unexpected(&self, unexpected: &UnexpectedFailure, ctx: &RequestContext, meta: Value) {
        self.logger.error(
            format!("Unhandled exception: {}", unexpected.message),
            Some(&unexpected.diagnostic),
            Some("UnhandledException"),
            Some(&ctx.correlation_id),
            Some(meta),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::{ErrorKey, FieldErrors};
    use crate::logger::{LogLevel, RecordingSink};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;

    struct Fixture {
        registry: ErrorRegistry,
        logger: StructuredLogger,
        sink: Arc<RecordingSink>,
        ctx: RequestContext,
    }

    fn fixture(environment: Environment) -> Fixture {
        let config = Config::for_environment(environment);
        let sink = Arc::new(RecordingSink::new());
        let logger = StructuredLogger::new(&config, sink.clone());
        let request = Request::builder()
            .uri("/orders/7")
            .header("x-request-id", "corr-1")
            .body(Body::empty())
            .unwrap();
        Fixture {
            registry: ErrorRegistry::load().unwrap(),
            logger,
            sink,
            ctx: RequestContext::resolve(&request, &config),
        }
    }

    impl Fixture {
        fn translator(&self, environment: Environment) -> FailureTranslator<'_> {
            FailureTranslator::new(&self.registry, &self.logger, environment, "1.0.0")
        }
    }

    #[test]
    fn test_insufficient_funds_with_sub_code() {
        let fx = fixture(Environment::Production);
        let failure = Failure::from(DomainFailure::new(ErrorKey::InsufficientFunds).with_sub_code("BALANCE_ZERO"));

        let (status, envelope) = fx.translator(Environment::Production).translate(&failure, &fx.ctx);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = envelope.error().unwrap();
        assert_eq!(error.code, 5001);
        assert_eq!(error.sub_code, Some(1));
        assert!(!envelope.is_success());
        assert!(envelope.data().is_none());

        let events = fx.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Warn);
        assert_eq!(events[0].context, "BusinessException");
        assert_eq!(events[0].request_id.as_deref(), Some("corr-1"));
        assert_eq!(events[0].meta.as_ref().unwrap()["errorKey"], "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn test_logging_disabled_definition_is_silent() {
        let fx = fixture(Environment::Development);
        let failure = Failure::from(ErrorKey::ResourceNotFound);

        let (status, envelope) = fx.translator(Environment::Development).translate(&failure, &fx.ctx);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(envelope.error().unwrap().code, 4001);
        assert!(fx.sink.events().is_empty());
    }

    #[test]
    fn test_server_side_domain_failure_logs_error() {
        let fx = fixture(Environment::Development);
        let failure = Failure::from(ErrorKey::ServiceUnavailable);

        let (status, _) = fx.translator(Environment::Development).translate(&failure, &fx.ctx);

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let events = fx.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Error);
    }

    #[test]
    fn test_details_withheld_in_production_unless_user_friendly() {
        let fx = fixture(Environment::Production);
        let hidden = Failure::from(
            DomainFailure::new(ErrorKey::DatabaseError).with_details(json!({"table": "users"})),
        );
        let shown = Failure::from(
            DomainFailure::new(ErrorKey::DuplicateEntry).with_details(json!({"field": "name"})),
        );

        let prod = fx.translator(Environment::Production);
        assert_eq!(prod.translate(&hidden, &fx.ctx).1.error().unwrap().details, None);
        assert_eq!(
            prod.translate(&shown, &fx.ctx).1.error().unwrap().details,
            Some(json!({"field": "name"}))
        );

        let dev = fx.translator(Environment::Development);
        assert_eq!(
            dev.translate(&hidden, &fx.ctx).1.error().unwrap().details,
            Some(json!({"table": "users"}))
        );
    }

    #[test]
    fn test_field_errors_are_reported_as_details() {
        let fx = fixture(Environment::Production);
        let mut fields = FieldErrors::new();
        fields.insert("name".to_string(), vec!["name must not be empty".to_string()]);
        let failure = Failure::from(DomainFailure::new(ErrorKey::InvalidInput).with_details(fields));

        let (_, envelope) = fx.translator(Environment::Production).translate(&failure, &fx.ctx);
        assert_eq!(
            envelope.error().unwrap().details,
            Some(json!({"name": ["name must not be empty"]}))
        );
    }

    #[test]
    fn test_unexpected_failure_in_production() {
        let fx = fixture(Environment::Production);
        let failure = Failure::Unexpected(UnexpectedFailure::new(
            "connection refused",
            "connection refused\n\nCaused by: os error 111",
        ));

        let (status, envelope) = fx.translator(Environment::Production).translate(&failure, &fx.ctx);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = envelope.error().unwrap();
        assert_eq!(error.code, INTERNAL_ERROR_CODE);
        assert_eq!(error.message, GENERIC_INTERNAL_MESSAGE);
        assert_eq!(error.details, None);
        assert_eq!(envelope.meta().path, None);

        let events = fx.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Error);
        assert_eq!(events[0].context, "UnhandledException");
        let meta = events[0].meta.as_ref().unwrap();
        assert!(meta["trace"].as_str().unwrap().contains("os error 111"));
    }

    #[test]
    fn test_unexpected_failure_outside_production_shows_message() {
        let fx = fixture(Environment::Development);
        let failure = Failure::Unexpected(UnexpectedFailure::new("connection refused", ""));

        let (_, envelope) = fx.translator(Environment::Development).translate(&failure, &fx.ctx);

        assert_eq!(envelope.error().unwrap().message, "connection refused");
        assert_eq!(envelope.meta().path.as_deref(), Some("/orders/7"));
    }
}
