//! The proxy between an inbound generation request and the upstream job.
//!
//! A request becomes one upstream prediction. If the creation answer is not yet
//! final, the job is polled under a [`PollPolicy`] until it succeeds, fails, or
//! the attempt budget runs out. All outcomes come back as
//! `Result<Prediction, GenerationError>`.

use log::{debug, info, warn};

use crate::{
    ServiceBox,
    error::GenerationError,
    generation::GenerationRequest,
    prediction::{JobState, Prediction, PredictionStatus},
};

pub mod retry;
use retry::{Attempt, PollOutcome, PollPolicy, poll_with_interval};

#[derive(Clone)]
pub struct JobProxy {
    service: ServiceBox,
    policy: PollPolicy,
}

impl JobProxy {
    pub fn new(service: ServiceBox, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Prediction, GenerationError> {
        info!(
            "Generating QR code with prompt: {}",
            request.style_description()
        );
        let mut state = JobState::Created;

        let created = self.service.create(request).await?;
        let label = created.id.as_deref().unwrap_or("<unnamed>");
        observe(&mut state, label, &created);

        match created.status {
            PredictionStatus::Succeeded => {
                info!("Prediction {label} finished on creation");
                Ok(created)
            }
            PredictionStatus::Failed | PredictionStatus::Canceled => Err(failed(label, &created)),
            _ => {
                let id = created.id.as_deref().ok_or_else(|| {
                    GenerationError::MalformedResponse(
                        "pending prediction carries no id to poll".into(),
                    )
                })?;
                self.wait_for(id, &mut state).await
            }
        }
    }

    /// Polls `id` until it is terminal. The id always comes from the creation
    /// answer; poll answers need not repeat it.
    async fn wait_for(
        &self,
        id: &str,
        state: &mut JobState,
    ) -> Result<Prediction, GenerationError> {
        debug!("Polling prediction {id} with {:?}", self.policy);

        let service = &self.service;
        let outcome = poll_with_interval(self.policy, move |attempt| async move {
            let prediction = service.get(id).await?;
            debug!("Prediction {id}, attempt {attempt}: {}", prediction.status);
            Ok::<_, GenerationError>(if prediction.status.is_terminal() {
                Attempt::Done(prediction)
            } else {
                Attempt::Pending
            })
        })
        .await?;

        match outcome {
            PollOutcome::Ready(prediction) => {
                observe(state, id, &prediction);
                if prediction.status == PredictionStatus::Succeeded {
                    info!("Prediction {id} succeeded");
                    Ok(prediction)
                } else {
                    Err(failed(id, &prediction))
                }
            }
            PollOutcome::Exhausted { attempts } => {
                state.time_out();
                warn!("Prediction {id} still running after {attempts} polls, giving up");
                Err(GenerationError::Timeout { attempts })
            }
        }
    }
}

fn observe(state: &mut JobState, id: &str, prediction: &Prediction) {
    let before = *state;
    if state.observe(prediction.status) {
        debug!("Prediction {id}: {before} -> {state}");
    }
}

fn failed(id: &str, prediction: &Prediction) -> GenerationError {
    let detail = prediction
        .error_detail()
        .unwrap_or_else(|| "Generation failed".into());
    warn!("Prediction {id} failed: {detail}");
    GenerationError::GenerationFailed { detail }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use tokio::time::Instant;

    use crate::testing::{ScriptedService, prediction};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn proxy(service: &Arc<ScriptedService>) -> JobProxy {
        JobProxy::new(
            service.clone(),
            PollPolicy {
                interval: INTERVAL,
                max_attempts: 30,
            },
        )
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("cyberpunk neon city", "https://example.com").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_skips_polling() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p0", "status": "succeeded", "output": ["https://img/abc.png"]})),
            vec![],
        );
        let start = Instant::now();

        let result = proxy(&service).generate(&request()).await.unwrap();

        assert_eq!(result.first_output_url(), Some("https://img/abc.png"));
        assert_eq!(service.polls(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(
            service.created_with(),
            vec![("cyberpunk neon city".to_string(), "https://example.com".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_third_poll() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p1", "status": "processing"})),
            vec![
                prediction(json!({"id": "p1", "status": "processing"})),
                prediction(json!({"id": "p1", "status": "processing"})),
                prediction(json!({"id": "p1", "status": "succeeded", "output": ["https://img/x.png"]})),
            ],
        );
        let start = Instant::now();

        let result = proxy(&service).generate(&request()).await.unwrap();

        assert_eq!(result.first_output_url(), Some("https://img/x.png"));
        assert_eq!(service.polls(), 3);
        assert_eq!(service.polled_ids(), vec!["p1", "p1", "p1"]);
        assert_eq!(start.elapsed(), 2 * INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_k_processing_polls() {
        for k in [0usize, 1, 5, 28] {
            let mut polls: Vec<_> = (0..k)
                .map(|_| prediction(json!({"id": "p3", "status": "processing"})))
                .collect();
            polls.push(prediction(
                json!({"id": "p3", "status": "failed", "error": "CUDA out of memory"}),
            ));
            let service =
                ScriptedService::new(prediction(json!({"id": "p3", "status": "starting"})), polls);

            let err = proxy(&service).generate(&request()).await.unwrap_err();

            match err {
                GenerationError::GenerationFailed { detail } => {
                    assert_eq!(detail, "CUDA out of memory")
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(service.polls(), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failure_without_detail_uses_fallback() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p4", "status": "starting"})),
            vec![prediction(json!({"id": "p4", "status": "canceled", "error": null}))],
        );

        let err = proxy(&service).generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Generation failed");
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_max_attempts() {
        let polls = (0..40)
            .map(|_| prediction(json!({"id": "p2", "status": "processing"})))
            .collect();
        let service =
            ScriptedService::new(prediction(json!({"id": "p2", "status": "processing"})), polls);
        let start = Instant::now();

        let err = proxy(&service).generate(&request()).await.unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { attempts: 30 }));
        assert_eq!(err.to_string(), "Generation timed out");
        assert_eq!(service.polls(), 30);
        assert_eq!(start.elapsed(), 29 * INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn creation_rejection_is_not_retried() {
        let service = ScriptedService::rejecting(401, "Invalid token.");

        let err = proxy(&service).generate(&request()).await.unwrap_err();

        assert_eq!(err.to_string(), "API Error: Invalid token.");
        assert_eq!(service.creates(), 1);
        assert_eq!(service.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_on_creation_is_not_polled() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p5", "status": "failed", "error": "bad input"})),
            vec![],
        );

        let err = proxy(&service).generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "bad input");
        assert_eq!(service.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_keeps_polling() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p6", "status": "queued"})),
            vec![
                prediction(json!({"id": "p6", "status": "queued"})),
                prediction(json!({"id": "p6", "status": "succeeded", "output": "https://img/s.png"})),
            ],
        );

        let result = proxy(&service).generate(&request()).await.unwrap();
        assert_eq!(result.first_output_url(), Some("https://img/s.png"));
        assert_eq!(service.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_creation_without_id_is_malformed() {
        let service = ScriptedService::new(prediction(json!({"status": "starting"})), vec![]);

        let err = proxy(&service).generate(&request()).await.unwrap_err();

        assert!(matches!(err, GenerationError::MalformedResponse(_)));
        assert_eq!(service.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_answers_without_id_keep_the_created_id() {
        let service = ScriptedService::new(
            prediction(json!({"id": "p7", "status": "processing"})),
            vec![
                prediction(json!({"status": "processing"})),
                prediction(json!({"status": "succeeded", "output": ["https://img/abc.png"]})),
            ],
        );

        let result = proxy(&service).generate(&request()).await.unwrap();

        assert_eq!(result.first_output_url(), Some("https://img/abc.png"));
        assert_eq!(service.polled_ids(), vec!["p7", "p7"]);
    }
}
