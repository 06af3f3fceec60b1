//! Test doubles for the upstream prediction service.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;

use crate::{
    error::GenerationError,
    generation::GenerationRequest,
    prediction::Prediction,
    prediction_service::{PredictionService, ServiceFuture},
};

pub fn prediction(value: Value) -> Prediction {
    serde_json::from_value(value).expect("invalid prediction fixture")
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

enum CreateScript {
    Answer(Prediction),
    Reject { status: u16, detail: String },
}

/// Answers `create` with a fixed prediction and each `get` with the next
/// scripted one, recording every call.
pub struct ScriptedService {
    create: CreateScript,
    polls: Mutex<VecDeque<Prediction>>,
    created_with: Mutex<Vec<(String, String)>>,
    polled_ids: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new(created: Prediction, polls: Vec<Prediction>) -> Arc<Self> {
        Self::with_script(CreateScript::Answer(created), polls)
    }

    pub fn rejecting(status: u16, detail: &str) -> Arc<Self> {
        Self::with_script(
            CreateScript::Reject {
                status,
                detail: detail.into(),
            },
            vec![],
        )
    }

    fn with_script(create: CreateScript, polls: Vec<Prediction>) -> Arc<Self> {
        Arc::new(Self {
            create,
            polls: Mutex::new(polls.into()),
            created_with: Mutex::default(),
            polled_ids: Mutex::default(),
        })
    }

    pub fn creates(&self) -> usize {
        self.created_with.lock().unwrap().len()
    }

    pub fn created_with(&self) -> Vec<(String, String)> {
        self.created_with.lock().unwrap().clone()
    }

    pub fn polls(&self) -> usize {
        self.polled_ids.lock().unwrap().len()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }
}

impl PredictionService for ScriptedService {
    fn create<'a>(&'a self, request: &'a GenerationRequest) -> ServiceFuture<'a> {
        Box::pin(async move {
            self.created_with.lock().unwrap().push((
                request.style_description().to_string(),
                request.payload().to_string(),
            ));
            match &self.create {
                CreateScript::Answer(p) => Ok(p.clone()),
                CreateScript::Reject { status, detail } => Err(GenerationError::Upstream {
                    status: *status,
                    detail: detail.clone(),
                }),
            }
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> ServiceFuture<'a> {
        Box::pin(async move {
            self.polled_ids.lock().unwrap().push(id.to_string());
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GenerationError::MalformedResponse("script exhausted".into()))
        })
    }
}
