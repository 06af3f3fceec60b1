use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// Any status string this crate does not know. Treated as still running.
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// A prediction as reported by the upstream service.
///
/// Only `id` and `status` are typed; every other key, `output` and `error`
/// included, stays in `extra` as received so that serializing a `Prediction`
/// reproduces the upstream JSON. Poll answers may omit the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: PredictionStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Prediction {
    pub fn output(&self) -> Option<&Value> {
        self.extra.get("output")
    }

    pub fn error(&self) -> Option<&Value> {
        self.extra.get("error")
    }

    /// All output URLs. Models return either a list of URLs or a single one.
    pub fn output_urls(&self) -> Vec<&str> {
        match self.output() {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(url)) => vec![url.as_str()],
            _ => vec![],
        }
    }

    pub fn first_output_url(&self) -> Option<&str> {
        self.output_urls().into_iter().next()
    }

    /// The service's error text, if it reported a non-empty one.
    pub fn error_detail(&self) -> Option<String> {
        match self.error() {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// The proxy's view of a submitted job.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
pub enum JobState {
    Created,
    Starting,
    Processing,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// Moves to the state implied by `status`. Terminal states never move.
    /// Returns whether the state changed.
    pub fn observe(&mut self, status: PredictionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        let next = match status {
            PredictionStatus::Starting => JobState::Starting,
            PredictionStatus::Processing => JobState::Processing,
            PredictionStatus::Succeeded => JobState::Succeeded,
            PredictionStatus::Failed | PredictionStatus::Canceled => JobState::Failed,
            PredictionStatus::Unknown => return false,
        };
        let changed = next != *self;
        *self = next;
        changed
    }

    /// Gives up on a job that is still running.
    pub fn time_out(&mut self) {
        if !self.is_terminal() {
            *self = JobState::TimedOut;
        }
    }
}
