use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Patreon API error: {0}")]
    FeedApi(#[from] FeedApiError),

    #[error("YouTube API error: {0}")]
    VideoApi(#[from] VideoApiError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum FeedApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Patreon session unavailable")]
    SessionUnavailable,

    #[error("Session rejected by the feed")]
    InvalidSession,

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Request to {url} failed with status {status_code}")]
    RequestFailed { url: String, status_code: u16 },
}

#[derive(Error, Debug, Clone)]
pub enum VideoApiError {
    #[error("No video Id(s) provided")]
    NoIdsProvided,

    #[error("Video(s) not found: {ids}")]
    VideosNotFound { ids: String },

    #[error("{found} video(s) found but {requested} Id(s) provided: {ids}")]
    CountMismatch {
        found: u64,
        requested: usize,
        ids: String,
    },

    #[error("Video {id} returned without a snippet")]
    MissingSnippet { id: String },

    #[error("Error retrieving YouTube resources: {message}")]
    RequestFailed { message: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Query execution failed: {reason}\nquery: {query}")]
    QueryFailed { query: String, reason: String },

    #[error("Constraint violation: {constraint}")]
    ConstraintViolation { constraint: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
