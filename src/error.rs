use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed artifact reference: {0}")]
    InvalidReference(String),

    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error("Artifact store error: {message}")]
    Store { message: String },
}

pub type Result<T> = std::result::Result<T, CleaningError>;
