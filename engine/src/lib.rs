pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod job_proxy;
pub mod prediction;
pub mod prediction_service;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{GenerationError, ValidationError};
pub use generation::GenerationRequest;
pub use job_proxy::JobProxy;
pub use prediction::{Prediction, PredictionStatus};

pub type ServiceBox = std::sync::Arc<dyn prediction_service::PredictionService + Send + Sync>;

/// Port the proxy listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 3001;
