use std::time::Duration;

use log::trace;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two attempts.
    pub interval: Duration,
    pub max_attempts: u32,
}

pub enum Attempt<T> {
    Done(T),
    Pending,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32 },
}

/// Runs `check` until it reports `Done`, fails, or the attempt budget is used up.
///
/// The first attempt starts immediately and there is no pause after the last
/// one, so exhausting the budget takes `(max_attempts - 1) * interval`. The
/// returned future owns no task: dropping it stops polling.
pub async fn poll_with_interval<T, E, F, Fut>(
    policy: PollPolicy,
    mut check: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Attempt::Done(value) = check(attempt).await? {
            return Ok(PollOutcome::Ready(value));
        }
        if attempt < policy.max_attempts {
            trace!("Attempt {attempt} pending, retrying in {:?}", policy.interval);
            sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}
