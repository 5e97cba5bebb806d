//! Request data validation.
//!
//! # Data Flow
//! ```text
//! ValidationSchema (built in code, or deserialized from JSON/TOML)
//!     → validator.rs checks each field of the body or query
//!     → ValidationResult { valid, errors }
//!     → validate_or_throw: ApiError::Validation (422) with every field error
//! ```

pub mod rule;
pub mod validator;

pub use rule::{FieldKind, FieldPattern, ValidationRule, ValidationSchema, Verdict};
pub use validator::{validate, validate_body, validate_or_throw, validate_query, ValidationResult};
