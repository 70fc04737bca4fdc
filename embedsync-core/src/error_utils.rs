use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::FeedApi(e) => {
                error!("Patreon API error details: {:?}", e);
            }
            CoreError::VideoApi(e) => {
                error!("YouTube API error details: {:?}", e);
            }
            CoreError::Database(e) => {
                error!("Database error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::FeedApi(e) => e.is_retryable(),
            CoreError::VideoApi(e) => e.is_retryable(),
            CoreError::Database(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::FeedApi(e) => e.retry_after(),
            CoreError::VideoApi(e) => e.retry_after(),
            CoreError::Database(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::FeedApi(e) => e.user_friendly_message(),
            CoreError::VideoApi(e) => e.user_friendly_message(),
            CoreError::Database(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::FeedApi(_) => "PATREON_API".to_string(),
            CoreError::VideoApi(_) => "YOUTUBE_API".to_string(),
            CoreError::Database(_) => "DATABASE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
        }
    }
}

impl ErrorExt for FeedApiError {
    fn log_error(&self) -> &Self {
        error!("FeedApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FeedApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            FeedApiError::RequestTimeout => true,
            FeedApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(30))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FeedApiError::AuthenticationFailed { .. } | FeedApiError::SessionUnavailable => {
                "Patreon login failed. Please check PATREON_EMAIL and PATREON_PASSWORD.".to_string()
            }
            FeedApiError::InvalidSession => {
                "Patreon rejected the cached session. Delete the session file and retry."
                    .to_string()
            }
            FeedApiError::Forbidden { resource } => {
                format!("Access denied to {}.", resource)
            }
            FeedApiError::RequestTimeout => {
                "Request to Patreon timed out. Please try again.".to_string()
            }
            _ => "Patreon API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            FeedApiError::AuthenticationFailed { .. } => "PATREON_AUTH_FAILED".to_string(),
            FeedApiError::SessionUnavailable => "PATREON_SESSION_UNAVAILABLE".to_string(),
            FeedApiError::InvalidSession => "PATREON_INVALID_SESSION".to_string(),
            FeedApiError::Forbidden { .. } => "PATREON_FORBIDDEN".to_string(),
            FeedApiError::RequestTimeout => "PATREON_TIMEOUT".to_string(),
            FeedApiError::InvalidResponse { .. } => "PATREON_INVALID_RESPONSE".to_string(),
            FeedApiError::ServerError { .. } => "PATREON_SERVER_ERROR".to_string(),
            FeedApiError::RequestFailed { .. } => "PATREON_REQUEST_FAILED".to_string(),
        }
    }
}

impl ErrorExt for VideoApiError {
    fn log_error(&self) -> &Self {
        error!("VideoApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("VideoApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, VideoApiError::RequestTimeout)
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(10))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            VideoApiError::VideosNotFound { ids } => {
                format!("YouTube has no videos for: {}", ids)
            }
            VideoApiError::CountMismatch {
                found, requested, ..
            } => format!(
                "YouTube returned {} video(s) for {} requested id(s).",
                found, requested
            ),
            VideoApiError::RequestFailed { message } => {
                format!("YouTube request failed: {}", message)
            }
            _ => "YouTube metadata could not be retrieved.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            VideoApiError::NoIdsProvided => "YOUTUBE_NO_IDS".to_string(),
            VideoApiError::VideosNotFound { .. } => "YOUTUBE_NOT_FOUND".to_string(),
            VideoApiError::CountMismatch { .. } => "YOUTUBE_COUNT_MISMATCH".to_string(),
            VideoApiError::MissingSnippet { .. } => "YOUTUBE_MISSING_SNIPPET".to_string(),
            VideoApiError::RequestFailed { .. } => "YOUTUBE_REQUEST_FAILED".to_string(),
            VideoApiError::RequestTimeout => "YOUTUBE_TIMEOUT".to_string(),
            VideoApiError::InvalidResponse { .. } => "YOUTUBE_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for DatabaseError {
    fn log_error(&self) -> &Self {
        error!("DatabaseError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DatabaseError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::ConnectionFailed { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(1))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => {
                "Database connection failed. Please check DATABASE_URL.".to_string()
            }
            DatabaseError::ConstraintViolation { constraint } => {
                format!("A post already exists ({}).", constraint)
            }
            _ => "Database error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => "DB_CONNECTION_FAILED".to_string(),
            DatabaseError::MigrationFailed { .. } => "DB_MIGRATION_FAILED".to_string(),
            DatabaseError::QueryFailed { .. } => "DB_QUERY_FAILED".to_string(),
            DatabaseError::ConstraintViolation { .. } => "DB_CONSTRAINT_VIOLATION".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' was not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs failures with their code, user-facing message and retry hint.
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if let Some(retry_after) = error.retry_after() {
            info!("Error is transient; a later run may succeed after {:?}", retry_after);
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
        info!("Error code: {}", error.error_code());
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
