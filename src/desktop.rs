use async_trait::async_trait;
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_shell::ShellExt;
use tokio::sync::oneshot;

use ghostlite_launcher::models::DownloadProgress;
use ghostlite_launcher::services::{ProgressSink, RetryDecision, RetryPrompt, UserPrompt};

pub const DOWNLOAD_PROGRESS_EVENT: &str = "download-progress";
pub const ACCOUNTS_CHANGED_EVENT: &str = "accounts-file-changed";

pub struct WindowProgress {
    app: AppHandle,
}

impl WindowProgress {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ProgressSink for WindowProgress {
    fn publish(&self, progress: Option<DownloadProgress>) {
        if let Err(err) = self.app.emit(DOWNLOAD_PROGRESS_EVENT, progress) {
            tracing::debug!(error = %err, "failed to emit download progress");
        }
    }
}

/// Native message boxes and the system browser.
pub struct DialogPrompt {
    app: AppHandle,
}

impl DialogPrompt {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    async fn ask(
        &self,
        title: &str,
        message: String,
        kind: MessageDialogKind,
        accept: &str,
        decline: &str,
    ) -> bool {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .message(message)
            .title(title)
            .kind(kind)
            .buttons(MessageDialogButtons::OkCancelCustom(
                accept.to_string(),
                decline.to_string(),
            ))
            .show(move |answer| {
                let _ = tx.send(answer);
            });
        rx.await.unwrap_or(false)
    }
}

#[async_trait]
impl UserPrompt for DialogPrompt {
    async fn retry_download(&self, prompt: RetryPrompt<'_>) -> RetryDecision {
        let retry = self
            .ask(
                "Download Failed",
                format!("Failed to download {}.\n\nError: {}", prompt.artifact, prompt.error),
                MessageDialogKind::Warning,
                "Try Again",
                "Cancel",
            )
            .await;
        if retry {
            return RetryDecision::Retry;
        }
        let Some(help_url) = prompt.help_url else {
            return RetryDecision::Cancel;
        };
        let open = self
            .ask(
                "Manual Download",
                format!("You can download {} manually from:\n{help_url}", prompt.artifact),
                MessageDialogKind::Info,
                "Open Page",
                "Continue",
            )
            .await;
        if open {
            RetryDecision::OpenHelpPage
        } else {
            RetryDecision::Cancel
        }
    }

    async fn offer_download_page(&self, title: &str, message: &str, _url: &str) -> bool {
        self.ask(title, message.to_string(), MessageDialogKind::Error, "Yes", "No")
            .await
    }

    #[allow(deprecated)]
    fn open_external(&self, url: &str) {
        if let Err(err) = self.app.shell().open(url, None) {
            tracing::warn!(url, error = %err, "failed to open browser");
        }
    }
}
