use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub mod cli;
pub mod download;
pub mod error;
pub mod submitter;

pub use error::{DownloadError, SubmitError};
pub use submitter::{Submitter, View};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub proxy_url: String,
    /// Where downloads go. Defaults to the working directory.
    pub download_dir: Option<PathBuf>,
    /// How long to wait for the proxy before giving up. The upstream job keeps
    /// running regardless.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: format!("http://localhost:{}", engine::DEFAULT_PORT),
            download_dir: None,
            request_timeout_secs: 360,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join("qr_studio.ron"))
}

pub fn load_config() -> Result<Option<Config>> {
    let path = config_path()?;
    if !path.exists() {
        Ok(None)
    } else {
        load_ron_file(&path).map(Some)
    }
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let path = config_path()?;
    save_ron_file(&path, cfg)?;
    Ok(())
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

pub fn save_ron_file<T: Serialize>(path: &Path, x: &T) -> Result<()> {
    Ok(fs::write(path, ron::to_string(x)?)?)
}
