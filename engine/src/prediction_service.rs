use std::pin::Pin;

use crate::{error::GenerationError, generation::GenerationRequest, prediction::Prediction};

pub mod replicate;
pub use replicate::ReplicateService;

pub type ServiceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Prediction, GenerationError>> + Send + 'a>>;

/// An upstream that runs predictions as long-lived jobs.
///
/// `get` must be a pure read: asking for the same finished job twice yields the
/// same answer.
pub trait PredictionService {
    /// Submits a new job. The returned prediction may already be finished.
    fn create<'a>(&'a self, request: &'a GenerationRequest) -> ServiceFuture<'a>;

    /// Reads the current state of a job.
    fn get<'a>(&'a self, id: &'a str) -> ServiceFuture<'a>;
}
