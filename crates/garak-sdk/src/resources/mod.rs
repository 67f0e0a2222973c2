//! One facade per service area. Each method maps to exactly one HTTP call.

mod metadata;
mod reports;
mod scans;

pub use metadata::Metadata;
pub use reports::Reports;
pub use scans::Scans;

use crate::error::{GarakError, Result};

/// Validate an identifier before splicing it into a URL path.
fn path_segment<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GarakError::scan_validation(format!("{what} must not be blank")));
    }
    if trimmed.contains(['/', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
        return Err(GarakError::scan_validation(format!(
            "{what} `{value}` contains characters not allowed in a path segment"
        )));
    }
    Ok(trimmed)
}

/// Reinterpret a 404 as "this scan (or its report) does not exist".
fn not_found_as(message: String) -> impl FnOnce(GarakError) -> GarakError {
    move |err| match err {
        GarakError::Api {
            status_code: Some(404),
            response,
            ..
        } => GarakError::ScanNotFound { message, response },
        other => other,
    }
}
