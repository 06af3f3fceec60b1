use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use engine::{
    GenerationRequest,
    api::{ErrorBody, GENERATE_QR_PATH, GenerateQrRequest},
};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    Config, download,
    error::{DownloadError, SubmitError},
};

const GENERIC_FAILURE: &str = "Failed to generate QR code";
const DOWNLOAD_FAILURE: &str = "Failed to download image";

/// What a front end shows: spinner, error line, and the finished image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub in_flight: bool,
    pub error: Option<String>,
    pub image_url: Option<String>,
}

pub struct Submitter {
    http: Client,
    endpoint: String,
    view: watch::Sender<View>,
}

/// Clears the in-flight flag when dropped, whichever way `submit` ends.
struct InFlight<'a>(&'a watch::Sender<View>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|v| v.in_flight = false);
    }
}

/// The part of the proxy's success body the submitter reads.
#[derive(Debug, Deserialize)]
struct GeneratedBody {
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl GeneratedBody {
    fn first_output(&self) -> Option<String> {
        match &self.output {
            Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
            Some(Value::String(url)) => Some(url.clone()),
            _ => None,
        }
    }

    fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

impl Submitter {
    pub fn new(cfg: &Config) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, &cfg.proxy_url))
    }

    pub fn with_client(http: Client, proxy_url: &str) -> Self {
        let (view, _) = watch::channel(View::default());
        Self {
            http,
            endpoint: format!("{}{GENERATE_QR_PATH}", proxy_url.trim_end_matches('/')),
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Asks the proxy for a QR code and returns the image URL.
    ///
    /// Blank input fails without touching the network. Every outcome is also
    /// reflected in the [`View`].
    pub async fn submit(&self, style_description: &str, payload: &str) -> Result<String, SubmitError> {
        let request = match GenerationRequest::new(style_description, payload) {
            Ok(request) => request,
            Err(e) => {
                self.view.send_modify(|v| v.error = Some(e.to_string()));
                return Err(e.into());
            }
        };

        self.view.send_modify(|v| {
            v.in_flight = true;
            v.error = None;
            v.image_url = None;
        });
        let _in_flight = InFlight(&self.view);

        let result = self.dispatch(&request).await;
        self.view.send_modify(|v| match &result {
            Ok(url) => v.image_url = Some(url.clone()),
            Err(e) => v.error = Some(e.to_string()),
        });
        result
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<String, SubmitError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&GenerateQrRequest {
                prompt: request.style_description().to_string(),
                qr_data: request.payload().to_string(),
            })
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => {
                    error!("Proxy failed ({status}): {} - {}", err.error, err.details);
                    SubmitError::Proxy(err.error)
                }
                Err(_) => {
                    error!("Server error: {status}: {body}");
                    SubmitError::Transport(format!("Server error: {status}"))
                }
            });
        }

        let generated: GeneratedBody = serde_json::from_str(&body).map_err(|e| {
            error!("Unreadable proxy response: {e}: {body}");
            SubmitError::Transport(e.to_string())
        })?;

        if let Some(msg) = generated.error_message() {
            return Err(SubmitError::Proxy(msg));
        }
        let url = generated
            .first_output()
            .ok_or_else(|| SubmitError::Proxy(GENERIC_FAILURE.into()))?;
        info!("Generated {url}");
        Ok(url)
    }

    /// Saves the image at `image_url` into `dir`. A failure shows up as the
    /// visible error as well.
    pub async fn download(&self, image_url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        match download::save_image(&self.http, image_url, dir).await {
            Ok(path) => {
                info!("Saved {}", path.display());
                Ok(path)
            }
            Err(e) => {
                error!("Download error: {e}");
                self.view
                    .send_modify(|v| v.error = Some(DOWNLOAD_FAILURE.into()));
                Err(e)
            }
        }
    }
}

fn transport(e: reqwest::Error) -> SubmitError {
    error!("API error: {e}");
    SubmitError::Transport(e.to_string())
}
