//! Input validation utilities
//!
//! Common validation for command-line parameters and file paths, with
//! structured errors from [`crate::errors`].

use std::path::Path;

use crate::errors::{EncpipeError, Result};

/// Validate that a file exists.
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description ("Input file", "Key file")
///
/// # Errors
/// Returns a setup error if the file does not exist.
///
/// # Example
/// ```
/// use encpipe_lib::validation::validate_file_exists;
///
/// assert!(validate_file_exists("/nonexistent/input", "Input file").is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EncpipeError::Setup {
            component: description.to_string(),
            path: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate a queue capacity parameter: it must be strictly greater than 1
/// so a producer and a consumer can both make progress.
///
/// # Errors
/// Returns `InvalidParameter` for capacities of 0 or 1.
pub fn validate_queue_capacity(parameter: &str, value: usize) -> Result<()> {
    if value <= 1 {
        return Err(EncpipeError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: format!("must be greater than 1, got {value}"),
        });
    }
    Ok(())
}
