//! Request lifecycle stages, outermost first:
//! correlation, envelope, lifecycle (route layer).

pub mod correlation;
pub mod envelope;
pub mod lifecycle;

pub use correlation::correlation_stage;
pub use envelope::envelope_stage;
pub use lifecycle::{lifecycle_stage, panic_to_failure};
