//! Pipeline orchestration
//!
//! This module provides the public API used by upload handlers and the CLI.
//! It runs an uploaded log file through every stage: decode → validate and
//! coerce → build typed tree → encode.

use tracing::debug;

use crate::decode;
use crate::encode;
use crate::error::LogFileError;
use crate::types::RawLogFile;
use crate::validator;

/// Parse an uploaded log file from raw bytes.
///
/// # Arguments
/// * `bytes` - File contents as received, optionally starting with a UTF-8 BOM
///
/// # Example
/// ```ignore
/// let log = parse_upload(&std::fs::read("session.json")?)?;
/// println!("session {}", log.header.session_info.session_id);
/// ```
pub fn parse_upload(bytes: &[u8]) -> Result<RawLogFile, LogFileError> {
    debug!(bytes = bytes.len(), "decoding uploaded log file");
    let document = decode::from_slice(bytes)?;
    validate_document(&document)
}

/// Parse a log file from JSON text.
pub fn parse_log_file(raw_json: &str) -> Result<RawLogFile, LogFileError> {
    debug!(bytes = raw_json.len(), "decoding log file");
    let document = decode::from_str(raw_json)?;
    validate_document(&document)
}

/// Parse a log file and serialize the validated tree back to compact JSON.
///
/// Absent values, including former NaNs, are written as `null`; infinities
/// are written as the bare `Infinity` / `-Infinity` tokens.
pub fn normalize_log_file(raw_json: &str) -> Result<String, LogFileError> {
    let log = parse_log_file(raw_json)?;
    to_json(&log)
}

/// Encode a validated log file as compact JSON
pub fn to_json(log: &RawLogFile) -> Result<String, LogFileError> {
    encode::to_string(log)
}

/// Encode a validated log file as indented JSON
pub fn to_json_pretty(log: &RawLogFile) -> Result<String, LogFileError> {
    encode::to_string_pretty(log)
}

fn validate_document(document: &crate::value::Node) -> Result<RawLogFile, LogFileError> {
    match validator::parse(document) {
        Ok(log) => {
            debug!(
                session_id = log.header.session_info.session_id,
                object_streams = log.data.object_events.len(),
                "log file validated"
            );
            Ok(log)
        }
        Err(e) => {
            debug!(path = %e.path, error = %e.kind, "log file rejected");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_log, SAMPLE_LOG_JSON};
    use crate::validator::ValidationErrorKind;

    #[test]
    fn test_parse_log_file() {
        let log = parse_log_file(SAMPLE_LOG_JSON).unwrap();
        assert_eq!(log, sample_log());
    }

    #[test]
    fn test_parse_upload_with_nan_token() {
        let raw = SAMPLE_LOG_JSON.replace(r#""X": 1.0"#, r#""X": NaN"#);
        assert_ne!(raw, SAMPLE_LOG_JSON);

        let log = parse_upload(raw.as_bytes()).unwrap();
        let event = &log.data.object_events["cam1"][0];
        assert_eq!(event.x, None);
        assert_eq!(event.y, Some(0.0));
        assert_eq!(event.z, Some(0.0));
    }

    #[test]
    fn test_normalize_writes_null_for_nan() {
        let raw = SAMPLE_LOG_JSON.replace(r#""X": 1.0"#, r#""X": NaN"#);
        let normalized = normalize_log_file(&raw).unwrap();

        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        let event = &value["Data"]["ObjectEvents"]["cam1"][0];
        assert!(event["X"].is_null());
        assert_eq!(event["Y"], 0.0);
        assert_eq!(value["Header"]["SessionInfo"]["IsPrescribedAsRoutine"], "false");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_log_file(SAMPLE_LOG_JSON).unwrap();
        let twice = normalize_log_file(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_infinity_round_trips() {
        let raw = SAMPLE_LOG_JSON
            .replace(r#""X": 1.0"#, r#""X": Infinity"#)
            .replace(r#""Z": -0.5"#, r#""Z": -Infinity"#);

        let first = parse_log_file(&raw).unwrap();
        assert_eq!(first.data.object_events["cam1"][0].x, Some(f64::INFINITY));
        assert_eq!(first.data.object_events["cam1"][1].z, Some(f64::NEG_INFINITY));

        for encoded in [to_json(&first).unwrap(), to_json_pretty(&first).unwrap()] {
            assert!(encoded.contains("-Infinity"));
            assert_eq!(parse_log_file(&encoded).unwrap(), first);
        }
    }

    #[test]
    fn test_pretty_output_reparses() {
        let pretty = to_json_pretty(&sample_log()).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(parse_log_file(&pretty).unwrap(), sample_log());
    }

    #[test]
    fn test_validation_error_surfaces() {
        let result = parse_log_file(r#"{"Header": {}, "Data": {}}"#);
        match result {
            Err(LogFileError::Validation(e)) => {
                assert_eq!(e.path, "$.LogFileDescription");
                assert_eq!(e.kind, ValidationErrorKind::MissingField);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        let result = parse_log_file("not valid json");
        assert!(matches!(result, Err(LogFileError::JsonError(_))));
    }
}
