use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Catalog serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to write asset: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    #[error("Missing signature")]
    MissingSignature,

    #[error("Malformed signature")]
    MalformedSignature,

    #[error("Invalid signature")]
    InvalidSignature,
}

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deploy is disabled in {0}")]
    Forbidden(String),

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: std::time::Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Log file not found: {0}")]
    NotFound(String),

    #[error("Invalid log file name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
