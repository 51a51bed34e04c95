use anyhow::{Context, Result};
use axum::http::HeaderName;
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown environment {0:?}, expected development, staging or production")]
    UnknownEnvironment(String),
}

/// Deployment environment. Production is the restricted mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub api_version: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Header carrying the correlation id in both directions
    pub correlation_header: HeaderName,
    /// User agent of the load balancer health probe
    pub health_check_user_agent: String,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Handlers slower than this emit a performance event
    pub slow_handler_warn_ms: u64,
    /// Upper bound of the handler performance window; whole requests slower than this
    /// are reported by the correlation stage instead
    pub slow_handler_ceiling_ms: u64,
    /// Metadata keys the logger redacts
    pub sensitive_fields: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "service-skeleton".to_string(),
                environment: Environment::Development,
                api_version: "1.0.0".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            http: HttpConfig {
                correlation_header: HeaderName::from_static("x-request-id"),
                health_check_user_agent: "ELB-HealthChecker/2.0".to_string(),
                body_limit_bytes: 2 * 1024 * 1024,
            },
            logging: LoggingConfig {
                slow_handler_warn_ms: 300,
                slow_handler_ceiling_ms: 1000,
                sensitive_fields: default_sensitive_fields(),
            },
        }
    }
}

fn default_sensitive_fields() -> Vec<String> {
    ["password", "creditCard", "token"]
        .iter()
        .map(|field| field.to_string())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = match env::var("APP_ENV") {
            Ok(value) => value
                .parse::<Environment>()
                .context("APP_ENV must be development, staging or production")?,
            Err(_) => defaults.app.environment,
        };

        let correlation_header = match env::var("CORRELATION_HEADER") {
            Ok(value) => HeaderName::from_bytes(value.to_ascii_lowercase().as_bytes())
                .context("CORRELATION_HEADER must be a valid header name")?,
            Err(_) => defaults.http.correlation_header,
        };

        let sensitive_fields = match env::var("LOG_SENSITIVE_FIELDS") {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.logging.sensitive_fields,
        };

        let config = Config {
            app: AppConfig {
                name: env::var("APP_NAME").unwrap_or(defaults.app.name),
                environment,
                api_version: env::var("API_VERSION").unwrap_or(defaults.app.api_version),
            },
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or(defaults.server.host),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
            },
            http: HttpConfig {
                correlation_header,
                health_check_user_agent: env::var("HEALTH_CHECK_USER_AGENT")
                    .unwrap_or(defaults.http.health_check_user_agent),
                body_limit_bytes: env::var("REQUEST_BODY_LIMIT_BYTES")
                    .unwrap_or_else(|_| "2097152".to_string())
                    .parse()
                    .context("REQUEST_BODY_LIMIT_BYTES must be a valid number")?,
            },
            logging: LoggingConfig {
                slow_handler_warn_ms: env::var("SLOW_HANDLER_WARN_MS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("SLOW_HANDLER_WARN_MS must be a valid number")?,
                slow_handler_ceiling_ms: env::var("SLOW_HANDLER_CEILING_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .context("SLOW_HANDLER_CEILING_MS must be a valid number")?,
                sensitive_fields,
            },
        };

        anyhow::ensure!(
            config.logging.slow_handler_warn_ms < config.logging.slow_handler_ceiling_ms,
            "SLOW_HANDLER_WARN_MS must be below SLOW_HANDLER_CEILING_MS"
        );

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Same defaults, different environment
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::default();
        config.app.environment = environment;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8081;

        assert_eq!(config.server_address(), "127.0.0.1:8081");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" Staging ".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!(
            "prodution".parse::<Environment>(),
            Err(ConfigError::UnknownEnvironment("prodution".to_string()))
        );
    }

    #[test]
    fn test_only_production_is_restricted() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(!Environment::Development.is_production());
    }

    #[test]
    fn test_defaults() {
        let config = Config::for_environment(Environment::Production);
        assert_eq!(config.app.environment, Environment::Production);
        assert_eq!(config.http.correlation_header.as_str(), "x-request-id");
        assert_eq!(config.logging.slow_handler_warn_ms, 300);
        assert_eq!(config.logging.slow_handler_ceiling_ms, 1000);
        assert_eq!(config.logging.sensitive_fields, vec!["password", "creditCard", "token"]);
    }
}
