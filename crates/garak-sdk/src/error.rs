use std::fmt;

use thiserror::Error;

/// Snapshot of the HTTP response that produced a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)
    }
}

pub type Result<T> = std::result::Result<T, GarakError>;

/// Every failure the SDK can surface. The set is closed: callers can match exhaustively.
#[derive(Debug, Error)]
pub enum GarakError {
    #[error("{message}")]
    Authentication {
        message: String,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    InvalidConfiguration {
        message: String,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    QuotaExceeded {
        message: String,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    ScanNotFound {
        message: String,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    ScanValidation {
        message: String,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    ScanTimeout {
        message: String,
        elapsed_secs: f64,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    RateLimit {
        message: String,
        /// Seconds from the `Retry-After` header, when the service sent one.
        retry_after: Option<u64>,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
        response: Option<RawResponse>,
    },
    #[error("{message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        error_code: Option<String>,
        response: Option<RawResponse>,
    },
}

impl GarakError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            response: None,
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            response: None,
        }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
            response: None,
        }
    }

    pub fn scan_not_found(message: impl Into<String>) -> Self {
        Self::ScanNotFound {
            message: message.into(),
            response: None,
        }
    }

    pub fn scan_validation(message: impl Into<String>) -> Self {
        Self::ScanValidation {
            message: message.into(),
            response: None,
        }
    }

    pub fn scan_timeout(message: impl Into<String>, elapsed_secs: f64) -> Self {
        Self::ScanTimeout {
            message: message.into(),
            elapsed_secs,
            response: None,
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
            response: None,
        }
    }

    pub fn network(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Self::Network {
            message: message.into(),
            source,
            response: None,
        }
    }

    pub fn api(
        message: impl Into<String>,
        status_code: Option<u16>,
        error_code: Option<String>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
            error_code,
            response: None,
        }
    }

    /// Attach the raw HTTP response that triggered this error.
    pub fn with_response(mut self, raw: RawResponse) -> Self {
        *self.response_slot() = Some(raw);
        self
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::InvalidConfiguration { message, .. }
            | Self::QuotaExceeded { message, .. }
            | Self::ScanNotFound { message, .. }
            | Self::ScanValidation { message, .. }
            | Self::ScanTimeout { message, .. }
            | Self::RateLimit { message, .. }
            | Self::Network { message, .. }
            | Self::Api { message, .. } => message,
        }
    }

    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Self::Authentication { response, .. }
            | Self::InvalidConfiguration { response, .. }
            | Self::QuotaExceeded { response, .. }
            | Self::ScanNotFound { response, .. }
            | Self::ScanValidation { response, .. }
            | Self::ScanTimeout { response, .. }
            | Self::RateLimit { response, .. }
            | Self::Network { response, .. }
            | Self::Api { response, .. } => response.as_ref(),
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api {
                status_code: Some(code),
                ..
            } => Some(*code),
            _ => self.response().map(|raw| raw.status),
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    fn response_slot(&mut self) -> &mut Option<RawResponse> {
        match self {
            Self::Authentication { response, .. }
            | Self::InvalidConfiguration { response, .. }
            | Self::QuotaExceeded { response, .. }
            | Self::ScanNotFound { response, .. }
            | Self::ScanValidation { response, .. }
            | Self::ScanTimeout { response, .. }
            | Self::RateLimit { response, .. }
            | Self::Network { response, .. }
            | Self::Api { response, .. } => response,
        }
    }
}
