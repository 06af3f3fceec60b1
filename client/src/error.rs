use engine::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The proxy answered and reported a failure.
    #[error("{0}")]
    Proxy(String),

    /// The proxy could not be reached or answered garbage. The field holds the
    /// cause for the logs, the user only sees the generic message.
    #[error("An error occurred while generating the QR code")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to fetch image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Failed to save image: {0}")]
    Save(#[from] std::io::Error),
}
