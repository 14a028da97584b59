//! Error types for Axiom

use thiserror::Error;

/// Main error type for Axiom
#[derive(Error, Debug)]
pub enum AxiomError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The manual batch buffer could not be used as a batch
    #[error("Invalid JSON array: {0}")]
    MalformedBatch(String),

    /// An engine operation was attempted while a run is in progress
    #[error("Batch engine is busy: {0}")]
    Busy(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Failed to parse cURL: {0}")]
    Curl(String),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transmit::TransportError),
}

pub type Result<T> = std::result::Result<T, AxiomError>;
