use color_eyre::eyre::eyre;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, header::AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{ApiToken, Config},
    error::GenerationError,
    generation::{GenerationParams, GenerationRequest},
    prediction::Prediction,
};

use super::{PredictionService, ServiceFuture};

/// Replicate's prediction API.
#[derive(Clone)]
pub struct ReplicateService {
    client: Client,
    base_url: String,
    version: String,
    api_token: ApiToken,
    params: GenerationParams,
}

#[derive(Debug, Serialize)]
pub struct CreatePredictionBody<'a> {
    pub version: &'a str,
    pub input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct PredictionInput<'a> {
    pub prompt: &'a str,
    pub qr_code_content: &'a str,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub controlnet_conditioning_scale: f64,
}

impl ReplicateService {
    pub fn new(
        base_url: impl Into<String>,
        version: impl Into<String>,
        api_token: ApiToken,
        params: GenerationParams,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version: version.into(),
            api_token,
            params,
        }
    }

    pub fn from_config(cfg: &Config) -> color_eyre::Result<Self> {
        let token = cfg
            .upstream
            .api_token
            .clone()
            .ok_or(eyre!("No API token configured"))?;
        Ok(Self::new(
            &cfg.upstream.base_url,
            &cfg.upstream.model_version,
            token,
            cfg.generation,
        ))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Token {}", self.api_token.expose()))
    }

    fn create_body<'a>(&'a self, request: &'a GenerationRequest) -> CreatePredictionBody<'a> {
        CreatePredictionBody {
            version: &self.version,
            input: PredictionInput {
                prompt: request.style_description(),
                qr_code_content: request.payload(),
                num_inference_steps: self.params.num_inference_steps,
                guidance_scale: self.params.guidance_scale,
                controlnet_conditioning_scale: self.params.controlnet_conditioning_scale,
            },
        }
    }
}

impl PredictionService for ReplicateService {
    fn create<'a>(&'a self, request: &'a GenerationRequest) -> ServiceFuture<'a> {
        Box::pin(async move {
            let body = self.create_body(request);
            debug!("Creating prediction: {body:?}");
            let resp = self
                .authorized(self.client.post(format!("{}/v1/predictions", self.base_url)))
                .json(&body)
                .send()
                .await?;
            read_prediction(resp).await
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> ServiceFuture<'a> {
        Box::pin(async move {
            let resp = self
                .authorized(
                    self.client
                        .get(format!("{}/v1/predictions/{id}", self.base_url)),
                )
                .send()
                .await?;
            read_prediction(resp).await
        })
    }
}

async fn read_prediction(resp: Response) -> Result<Prediction, GenerationError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        debug!("Prediction service answered {status}: {body}");
        return Err(GenerationError::Upstream {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| GenerationError::MalformedResponse(format!("{e}: {body}")))
}

/// Replicate reports errors as `{"detail": "..."}`.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["detail"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".into())
}
