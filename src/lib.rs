pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::config::LauncherConfig;
use crate::errors::Result;
use crate::services::account_store::{ACCOUNTS_FILE, LEGACY_ACCOUNTS_FILE, PREFERENCES_FILE};
use crate::services::{
    AccountStore, AssetStore, Downloader, LaunchService, LegacyAccountStore, PreferencesStore,
    ProcessSupervisor, ProgressSink, SystemSignaller, UserPrompt,
};

/// Everything a UI shell needs, wired around one data directory.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LauncherConfig>,
    pub assets: AssetStore,
    pub downloader: Downloader,
    pub supervisor: ProcessSupervisor,
    pub accounts: AccountStore,
    pub legacy_accounts: LegacyAccountStore,
    pub preferences: PreferencesStore,
    pub launch: LaunchService,
}

impl AppState {
    pub fn new(
        config: LauncherConfig,
        progress: Arc<dyn ProgressSink>,
        prompt: Arc<dyn UserPrompt>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let assets = AssetStore::new(config.data_dir.clone())?;
        let downloader = Downloader::new(
            assets.clone(),
            progress,
            prompt.clone(),
            config.progress_dismiss_delay,
        );
        let supervisor = ProcessSupervisor::new(
            Arc::new(SystemSignaller),
            prompt.clone(),
            config.shutdown_grace,
        );
        let accounts = AccountStore::new(assets.state_file(ACCOUNTS_FILE));
        let legacy_accounts = LegacyAccountStore::new(assets.state_file(LEGACY_ACCOUNTS_FILE));
        let preferences = PreferencesStore::new(assets.state_file(PREFERENCES_FILE));
        let launch = LaunchService::new(
            config.clone(),
            assets.clone(),
            downloader.clone(),
            supervisor.clone(),
            accounts.clone(),
            prompt,
        );

        tracing::info!(data_dir = %config.data_dir.display(), "launcher state ready");
        Ok(Self {
            config,
            assets,
            downloader,
            supervisor,
            accounts,
            legacy_accounts,
            preferences,
            launch,
        })
    }
}
