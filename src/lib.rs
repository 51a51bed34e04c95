// Library exports for testing
pub mod api;
pub mod config;
pub mod context;
pub mod envelope;
pub mod errors;
pub mod logger;
pub mod models;
