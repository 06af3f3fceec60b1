//! Wire types of the inbound HTTP interface, shared by the proxy and its clients.

use serde::{Deserialize, Serialize};

pub const GENERATE_QR_PATH: &str = "/api/generate-qr";

/// Fixed `details` text of every error body.
pub const ERROR_DETAILS: &str = "Failed to generate QR code";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    pub prompt: String,
    pub qr_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: ERROR_DETAILS.into(),
        }
    }
}
