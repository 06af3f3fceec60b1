use std::{
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use tempfile::NamedTempFile;

use crate::error::DownloadError;

pub fn file_name(at: DateTime<Utc>) -> String {
    format!("ai-qr-code-{}.png", at.timestamp_millis())
}

/// Fetches the image at `url` and stores it in `dir`.
///
/// The bytes go to a temporary file first, which is renamed into place once
/// complete, so a failed download never leaves a partial image behind.
pub async fn save_image(http: &Client, url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    debug!("Fetched {} bytes from {url}", bytes.len());

    let target = dir.join(file_name(Utc::now()));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    drop(bytes);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}
