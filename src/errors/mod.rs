//! Error taxonomy and failure handling
//!
//! - [`codes`]: the closed set of error keys and their static definitions
//! - [`registry`]: startup validation and lookup of the definitions
//! - [`failure`]: the values handlers fail with
//! - [`translator`]: turns failures into envelopes and failure logs

pub mod codes;
pub mod failure;
pub mod registry;
pub mod translator;

pub use codes::{ErrorCategory, ErrorDefinition, ErrorKey, INTERNAL_ERROR_CODE};
pub use failure::{Details, DomainFailure, Failure, FailureMarker, FieldErrors, UnexpectedFailure};
pub use registry::{ErrorRegistry, RegistryError};
pub use translator::{FailureTranslator, GENERIC_INTERNAL_MESSAGE};
