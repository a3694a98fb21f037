use async_trait::async_trait;

use crate::models::DownloadProgress;

/// Receives `download-progress` updates. `None` tells the UI to hide the bar.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, progress: Option<DownloadProgress>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    /// Open the manual download page and give up on this attempt.
    OpenHelpPage,
    Cancel,
}

#[derive(Clone, Debug)]
pub struct RetryPrompt<'a> {
    pub artifact: &'a str,
    pub error: &'a str,
    pub help_url: Option<&'a str>,
}

/// Blocking questions the core asks the user, plus the system browser.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    async fn retry_download(&self, prompt: RetryPrompt<'_>) -> RetryDecision;

    /// Asks whether to open `url`; returns true when the user agreed.
    async fn offer_download_page(&self, title: &str, message: &str, url: &str) -> bool;

    fn open_external(&self, url: &str);
}

/// Used when no window is attached: never retries, never opens anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessUi;

impl ProgressSink for HeadlessUi {
    fn publish(&self, progress: Option<DownloadProgress>) {
        if let Some(progress) = progress {
            tracing::debug!(percent = progress.percent, status = %progress.status, "download progress");
        }
    }
}

#[async_trait]
impl UserPrompt for HeadlessUi {
    async fn retry_download(&self, prompt: RetryPrompt<'_>) -> RetryDecision {
        tracing::warn!(artifact = prompt.artifact, error = prompt.error, "download failed, not retrying");
        RetryDecision::Cancel
    }

    async fn offer_download_page(&self, title: &str, message: &str, url: &str) -> bool {
        tracing::warn!(title, message, url, "prompt suppressed");
        false
    }

    fn open_external(&self, url: &str) {
        tracing::info!(url, "open external suppressed");
    }
}
