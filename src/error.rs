use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("required environment variable '{0}' is not set")]
    MissingVar(&'static str),
    #[error("environment variable '{0}' is invalid: {1}")]
    InvalidVar(&'static str, String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("CORS configuration error: {0}")]
    Cors(String),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Bson(#[from] bson::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Decode(#[from] base64::DecodeError),
}
