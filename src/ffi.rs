//! FFI bindings for RGS log parsing
//!
//! This module provides C-compatible functions for calling the parser from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `rgs_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::LogFileError;
use crate::pipeline::{normalize_log_file, parse_log_file};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Validation failures are reported as JSON so callers can read the path
fn error_message(e: &LogFileError) -> String {
    match e {
        LogFileError::Validation(v) => {
            serde_json::to_string(v).unwrap_or_else(|_| v.to_string())
        }
        other => other.to_string(),
    }
}

/// Parse a log file and return the normalized JSON document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rgs_free_string`.
/// - Returns NULL on error; call `rgs_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rgs_parse_log(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match normalize_log_file(&json_str) {
        Ok(normalized) => string_to_cstr(&normalized),
        Err(e) => {
            set_last_error(&error_message(&e));
            ptr::null_mut()
        }
    }
}

/// Validate a log file without returning the parsed document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 if the log file is valid, non-zero otherwise.
/// - On error, call `rgs_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rgs_validate_log(json: *const c_char) -> i32 {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match parse_log_file(&json_str) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&error_message(&e));
            1
        }
    }
}

/// Parse a log file and return its summary as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rgs_free_string`.
/// - Returns NULL on error; call `rgs_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rgs_log_summary(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let summary = match parse_log_file(&json_str) {
        Ok(log) => log.summary(),
        Err(e) => {
            set_last_error(&error_message(&e));
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&summary) {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `rgs_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rgs_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `rgs_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rgs_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rgs_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SAMPLE_LOG_JSON;

    #[test]
    fn test_ffi_parse_log() {
        let json = CString::new(SAMPLE_LOG_JSON.replace(r#""X": 1.0"#, r#""X": NaN"#)).unwrap();

        unsafe {
            let result = rgs_parse_log(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.starts_with('{'));
            assert!(result_str.contains(r#""X":null"#));

            rgs_free_string(result);
        }
    }

    #[test]
    fn test_ffi_validate_log() {
        let valid = CString::new(SAMPLE_LOG_JSON).unwrap();
        let invalid = CString::new(r#"{"Header": {}}"#).unwrap();

        unsafe {
            assert_eq!(rgs_validate_log(valid.as_ptr()), 0);
            assert!(rgs_last_error().is_null());

            assert_eq!(rgs_validate_log(invalid.as_ptr()), 1);
            let error = CStr::from_ptr(rgs_last_error()).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(error).unwrap();
            assert_eq!(value["path"], "$.LogFileDescription");
            assert_eq!(value["kind"], "MissingField");
        }
    }

    #[test]
    fn test_ffi_summary() {
        let json = CString::new(SAMPLE_LOG_JSON).unwrap();

        unsafe {
            let result = rgs_log_summary(json.as_ptr());
            assert!(!result.is_null());

            let summary: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(summary["session_id"], 4711);
            assert_eq!(summary["protocol_duration"], 60000);

            rgs_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = rgs_parse_log(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = rgs_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());

            assert!(rgs_parse_log(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = rgs_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }
}
