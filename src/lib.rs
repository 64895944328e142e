//! RGS Log - Parser and validator for Rehabilitation Gaming System session logs
//!
//! Uploaded session logs are deeply nested JSON documents. This crate turns
//! them into a strongly-typed [`RawLogFile`] through a fixed pipeline:
//! decode → validate and coerce → build typed tree → encode.
//!
//! Validation is fail-fast: the first field that cannot be coerced aborts the
//! parse with a [`ValidationError`] carrying its path. Every NaN found in a
//! float-typed field is replaced with an absent value (`None`).
//!
//! ## Modules
//!
//! - **Pipeline**: Upload-facing entry points (`parse_upload`, `parse_log_file`)
//! - **Schema**: Descriptor tree of the session-log format
//! - **Validator**: Recursive coercion of a decoded document against the schema

pub mod decode;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod validator;
pub mod value;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod test_support;

pub use error::LogFileError;
pub use pipeline::{normalize_log_file, parse_log_file, parse_upload};
pub use types::{LogSummary, RawLogFile};
pub use validator::{parse, ValidationError, ValidationErrorKind};
pub use value::Node;

// Schema exports
pub use schema::{session_log_schema, EntitySchema, FieldSpec, FieldType, SCHEMA_ID};

/// Library version reported by the CLI and FFI
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "rgs-log";
