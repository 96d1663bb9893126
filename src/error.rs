use thiserror::Error;

/// Server error code returned by `createUser` when the user is already defined.
pub const USER_ALREADY_EXISTS_CODE: i32 = 51003;

/// Server error code (`NamespaceExists`) returned by `create` for an existing collection.
pub const NAMESPACE_EXISTS_CODE: i32 = 48;

/// Bootstrap-wide error types.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("User '{0}' already exists")]
    UserExists(String),

    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BootstrapError {
    /// Classify a driver error raised while creating `subject` (a user or collection name).
    pub fn from_driver(err: mongodb::error::Error, subject: &str) -> Self {
        match command_code(&err) {
            Some(USER_ALREADY_EXISTS_CODE) => BootstrapError::UserExists(subject.to_string()),
            Some(NAMESPACE_EXISTS_CODE) => BootstrapError::CollectionExists(subject.to_string()),
            _ => BootstrapError::Database(err.to_string()),
        }
    }
}

/// Server-side command error code, if the driver error carries one.
pub fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        mongodb::error::ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

impl From<config::ConfigError> for BootstrapError {
    fn from(err: config::ConfigError) -> Self {
        BootstrapError::Config(err.to_string())
    }
}
