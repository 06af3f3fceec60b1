use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated request for one stylized QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    style_description: String,
    payload: String,
}

impl GenerationRequest {
    /// Both inputs must contain something besides whitespace. The text is kept
    /// as typed, trimming only decides emptiness.
    pub fn new(
        style_description: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let style_description = style_description.into();
        let payload = payload.into();
        if style_description.trim().is_empty() {
            return Err(ValidationError::MissingStyleDescription);
        }
        if payload.trim().is_empty() {
            return Err(ValidationError::MissingPayload);
        }
        Ok(Self {
            style_description,
            payload,
        })
    }

    pub fn style_description(&self) -> &str {
        &self.style_description
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Model parameters that are fixed by configuration, never by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub controlnet_conditioning_scale: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_inference_steps: 20,
            guidance_scale: 7.5,
            controlnet_conditioning_scale: 1.0,
        }
    }
}
