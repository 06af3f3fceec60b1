use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{
    Result,
    eyre::{ensure, eyre},
};
use log::{debug, info};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{DEFAULT_PORT, generation::GenerationParams, job_proxy::retry::PollPolicy};

pub const TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";

/// The QR-code ControlNet model the proxy asks for.
pub const DEFAULT_MODEL_VERSION: &str = "monster-labs/control_v1p_sd15_qrcode_monster:c7c75a9e7c3f4b8b5b0c6f3e9b2a8d7e1c5b9f8a2d4e7c1b6a9f3e8d2c5b7a4f1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: ListenConfig,
    pub upstream: UpstreamConfig,
    pub generation: GenerationParams,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub model_version: String,
    #[serde(skip_serializing)]
    pub api_token: Option<ApiToken>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.replicate.com".into(),
            model_version: DEFAULT_MODEL_VERSION.into(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_attempts: 30,
        }
    }
}

impl From<PollingConfig> for PollPolicy {
    fn from(cfg: PollingConfig) -> Self {
        PollPolicy {
            interval: Duration::from_secs(cfg.interval_secs),
            max_attempts: cfg.max_attempts,
        }
    }
}

/// The service credential. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl Config {
    /// Reads the config file (the explicit one, or the default location if it
    /// exists), then takes the credential from the environment or `.env`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => load_ron_file(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    load_ron_file(&path)?
                } else {
                    debug!("No config file at {}, using defaults", path.display());
                    Config::default()
                }
            }
        };

        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env");
        }
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            cfg.upstream.api_token = Some(ApiToken::new(token));
        }

        cfg.validate()?;
        info!(
            "Using model {} at {}",
            cfg.upstream.model_version, cfg.upstream.base_url
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.polling.max_attempts >= 1,
            "polling.max_attempts must be at least 1"
        );
        let token = self
            .upstream
            .api_token
            .as_ref()
            .ok_or(eyre!("{TOKEN_ENV_VAR} environment variable is not set"))?;
        ensure!(
            !token.expose().trim().is_empty(),
            "{TOKEN_ENV_VAR} is empty"
        );
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.polling.into()
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join("qr_proxy.ron"))
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}
