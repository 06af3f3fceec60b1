use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use thiserror::Error;

use crate::api::ErrorBody;

/// Rejected user input, caught before any network call.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a creative prompt")]
    MissingStyleDescription,

    #[error("Please enter data for the QR code")]
    MissingPayload,
}

/// Everything that can go wrong between accepting a generation request and
/// handing back the finished prediction.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The prediction service refused to create or report on the job.
    #[error("API Error: {detail}")]
    Upstream { status: u16, detail: String },

    /// The prediction service marked the job as failed or canceled.
    #[error("{detail}")]
    GenerationFailed { detail: String },

    #[error("Generation timed out")]
    Timeout { attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response from prediction service: {0}")]
    MalformedResponse(String),

    #[error("Generation task aborted: {0}")]
    TaskAborted(String),
}

impl GenerationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        error!("Proxy error: {self:?}");
        (self.status_code(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
