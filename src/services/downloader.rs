use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use tracing::{info, warn};

use crate::errors::{LauncherError, Result};
use crate::models::{DownloadProgress, FetchOutcome, VersionManifest};
use crate::services::asset_store::AssetStore;
use crate::services::ui_bridge::{ProgressSink, RetryDecision, RetryPrompt, UserPrompt};
use crate::utils::file::write_atomic;

/// Result of a user-gated fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResolution {
    Fetched(FetchOutcome),
    /// The user declined to retry after `error`.
    Abandoned { error: String },
}

/// Upper bound on the buffer reserved from an advertised `Content-Length`.
/// Larger bodies grow the buffer as bytes arrive.
const INITIAL_BUFFER_CAP: u64 = 1024 * 1024;

type InFlight = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    store: AssetStore,
    progress: Arc<dyn ProgressSink>,
    prompt: Arc<dyn UserPrompt>,
    in_flight: InFlight,
    dismiss_delay: Duration,
}

pub fn percent_of(loaded: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let percent = (loaded as f64 * 100.0 / total as f64).round();
            percent.clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(INITIAL_BUFFER_CAP) as usize
}

impl Downloader {
    pub fn new(
        store: AssetStore,
        progress: Arc<dyn ProgressSink>,
        prompt: Arc<dyn UserPrompt>,
        dismiss_delay: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("GhostliteLauncher/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            store,
            progress,
            prompt,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            dismiss_delay,
        }
    }

    pub fn progress(&self) -> &Arc<dyn ProgressSink> {
        &self.progress
    }

    /// Fetches `name` from `url` into the asset store once. An artifact that
    /// is already on disk is reported with `already_exists` and no request is
    /// made. Callers racing on the same name are serialised.
    pub async fn fetch_artifact(
        &self,
        name: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchOutcome> {
        let dest = self.store.artifact_path(name)?;
        let gate = self.gate_for(name);
        let _guard = gate.lock().await;

        if dest.exists() {
            info!(artifact = name, "artifact already present");
            return Ok(FetchOutcome {
                file_name: name.to_string(),
                already_exists: true,
            });
        }

        self.progress.publish(Some(DownloadProgress {
            percent: 0,
            status: format!("Downloading {name}..."),
        }));

        match self.stream_to_disk(name, url, dest, timeout).await {
            Ok(bytes) => {
                info!(artifact = name, bytes, "artifact downloaded");
                self.progress.publish(Some(DownloadProgress {
                    percent: 100,
                    status: format!("{name} downloaded"),
                }));
                self.schedule_dismiss();
                Ok(FetchOutcome {
                    file_name: name.to_string(),
                    already_exists: false,
                })
            }
            Err(err) => {
                self.progress.publish(None);
                Err(err)
            }
        }
    }

    /// Runs [`Downloader::fetch_artifact`] until it succeeds or the user
    /// stops retrying. Each retry starts over from the existence check.
    pub async fn fetch_with_retry(
        &self,
        name: &str,
        url: &str,
        timeout: Duration,
        help_url: Option<&str>,
    ) -> Result<FetchResolution> {
        loop {
            let err = match self.fetch_artifact(name, url, timeout).await {
                Ok(outcome) => return Ok(FetchResolution::Fetched(outcome)),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };
            let message = err.to_string();
            warn!(artifact = name, url, error = %message, "download failed");

            let decision = self
                .prompt
                .retry_download(RetryPrompt {
                    artifact: name,
                    error: &message,
                    help_url,
                })
                .await;
            match decision {
                RetryDecision::Retry => {
                    info!(artifact = name, "retrying download");
                    continue;
                }
                RetryDecision::OpenHelpPage => {
                    if let Some(page) = help_url {
                        self.prompt.open_external(page);
                    }
                    return Ok(FetchResolution::Abandoned { error: message });
                }
                RetryDecision::Cancel => return Ok(FetchResolution::Abandoned { error: message }),
            }
        }
    }

    /// Lightweight manifest fetch. Any failure means "no version info".
    pub async fn fetch_manifest(&self, url: &str, timeout: Duration) -> Option<VersionManifest> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .timeout(timeout)
            .send()
            .await;
        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(url, status = %response.status(), "version manifest unavailable");
                return None;
            }
            Err(err) => {
                warn!(url, error = %err, "version manifest request failed");
                return None;
            }
        };
        match response.json::<VersionManifest>().await {
            Ok(manifest) if !manifest.latest.trim().is_empty() => Some(manifest),
            Ok(_) => {
                warn!(url, "version manifest has no latest version");
                None
            }
            Err(err) => {
                warn!(url, error = %err, "version manifest is malformed");
                None
            }
        }
    }

    async fn stream_to_disk(
        &self,
        name: &str,
        url: &str,
        dest: PathBuf,
        timeout: Duration,
    ) -> Result<u64> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::Http(format!("{url} returned {status}")));
        }

        let total = response.content_length();
        let mut payload = Vec::with_capacity(initial_capacity(total));
        let mut last_percent = None;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            payload.extend_from_slice(&chunk);
            let percent = percent_of(payload.len() as u64, total);
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                self.progress.publish(Some(DownloadProgress {
                    percent,
                    status: format!("Downloading {name}..."),
                }));
            }
        }

        let written = payload.len() as u64;
        tokio::task::spawn_blocking(move || write_atomic(&dest, &payload))
            .await
            .map_err(|err| LauncherError::Config(format!("write task failed: {err}")))??;
        Ok(written)
    }

    fn gate_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(name.to_string()).or_default().clone()
    }

    pub(crate) fn schedule_dismiss(&self) {
        let progress = self.progress.clone();
        let delay = self.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            progress.publish(None);
        });
    }
}
