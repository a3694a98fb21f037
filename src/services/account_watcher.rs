use std::ffi::OsString;
use std::path::Path;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::errors::{LauncherError, Result};
use crate::services::account_store::{AccountStore, ChangeSource};

/// Keeps a filesystem watch on `accounts.json` alive and forwards every
/// change to [`AccountStore::subscribe`] receivers. Dropping it stops the
/// watch.
pub struct AccountFileWatcher {
    _watcher: RecommendedWatcher,
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_matches
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

impl AccountFileWatcher {
    /// Watches the parent directory so the file may be created after the
    /// launcher starts.
    pub fn start(store: &AccountStore) -> Result<Self> {
        let path = store.path();
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| LauncherError::Config("accounts path has no file name".into()))?;
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let notifier = store.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) if is_relevant(&event, &file_name) => {
                    tracing::debug!(kind = ?event.kind, "accounts file changed");
                    notifier.notify_changed(ChangeSource::FileSystem);
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = ?err, "accounts watch error"),
            },
            Config::default(),
        )
        .map_err(|err| LauncherError::Config(format!("failed to create watcher: {err}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|err| LauncherError::Config(format!("failed to watch {}: {err}", dir.display())))?;
        tracing::info!(dir = %dir.display(), "watching accounts file");

        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::account_store::ACCOUNTS_FILE;
    use crate::test_support::temp_dir;
    use std::time::Duration;

    #[tokio::test]
    async fn external_write_reaches_subscribers() {
        let dir = temp_dir("watcher");
        let store = AccountStore::new(dir.join(ACCOUNTS_FILE));
        let mut changes = store.subscribe();
        let _watcher = AccountFileWatcher::start(&store).expect("start watcher");

        std::fs::write(dir.join("unrelated.txt"), b"x").expect("write unrelated");
        std::fs::write(
            dir.join(ACCOUNTS_FILE),
            br#"[{"accountId":"a9","displayName":"New","sessionId":"s"}]"#,
        )
        .expect("write accounts");

        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .expect("change within timeout")
            .expect("change event");
        assert_eq!(change.source, ChangeSource::FileSystem);
        assert_eq!(store.list().expect("list").len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
