pub mod account_store;
pub mod account_watcher;
pub mod archive;
pub mod asset_store;
pub mod credentials;
pub mod downloader;
pub mod json_store;
pub mod launch_service;
pub mod process_supervisor;
pub mod ui_bridge;

pub use account_store::{
    AccountStore, AccountsChanged, ChangeSource, LegacyAccountStore, PreferencesStore,
};
pub use account_watcher::AccountFileWatcher;
pub use asset_store::AssetStore;
pub use downloader::{Downloader, FetchResolution};
pub use launch_service::{LaunchService, Readiness};
pub use process_supervisor::{
    ProcessSignaller, ProcessSupervisor, ShutdownReport, SupervisorEvent, SystemSignaller,
    TrackedProcess,
};
pub use ui_bridge::{HeadlessUi, ProgressSink, RetryDecision, RetryPrompt, UserPrompt};
