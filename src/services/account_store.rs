use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::{LauncherError, Result};
use crate::models::{Account, LegacyAccount, ProxyConfig, ResourcePreferences};
use crate::services::json_store::JsonFileStore;

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const LEGACY_ACCOUNTS_FILE: &str = "legacy_accounts.json";
pub const PREFERENCES_FILE: &str = "resource_versions.json";
/// Id prefix the UI uses for rows that were never saved.
pub const UNSAVED_ID_PREFIX: &str = "new-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeSource {
    /// The backing file changed on disk.
    FileSystem,
    /// The sub-launcher exited and may have written new accounts.
    SubLauncherExit,
    /// This process rewrote the file.
    Local,
}

#[derive(Clone, Debug)]
pub struct AccountsChanged {
    pub path: PathBuf,
    pub source: ChangeSource,
}

fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Parses one raw entry, `None` when it is not a usable account.
fn parse_account(entry: &Value) -> Option<Account> {
    serde_json::from_value(entry.clone()).ok()
}

/// Session accounts in `accounts.json`. The sub-launcher adds entries; this
/// store edits proxies and removes entries. Entries are rewritten as raw
/// JSON so fields in forms this launcher does not model stay untouched.
#[derive(Clone)]
pub struct AccountStore {
    file: JsonFileStore<Vec<Value>>,
    write_lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<AccountsChanged>,
}

impl AccountStore {
    pub fn new(path: PathBuf) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            file: JsonFileStore::new(path),
            write_lock: Arc::new(Mutex::new(())),
            changes,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Accounts in file order. Entries that cannot be read as an account are
    /// skipped here and kept on disk.
    pub fn list(&self) -> Result<Vec<Account>> {
        let entries = {
            let _guard = lock(&self.write_lock);
            self.file.load()?
        };
        let mut accounts = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match parse_account(entry) {
                Some(account) => accounts.push(account),
                None => tracing::warn!(index, "skipping unreadable account entry"),
            }
        }
        Ok(accounts)
    }

    pub fn find(&self, account_id: &str) -> Result<Account> {
        self.list()?
            .into_iter()
            .find(|account| account.account_id == account_id)
            .ok_or_else(|| LauncherError::NotFound(format!("Account {account_id}")))
    }

    /// Sets or clears the proxy of one account.
    pub fn update_proxy(&self, account_id: &str, proxy: Option<ProxyConfig>) -> Result<()> {
        let proxy = match proxy.filter(ProxyConfig::is_set) {
            Some(proxy) => Some(serde_json::to_value(proxy)?),
            None => None,
        };
        self.mutate(account_id, |entries, index| {
            if let Some(fields) = entries[index].as_object_mut() {
                match proxy {
                    Some(proxy) => {
                        fields.insert("proxy".to_string(), proxy);
                    }
                    None => {
                        fields.remove("proxy");
                    }
                }
            }
        })?;
        tracing::info!(account_id, "updated account proxy");
        Ok(())
    }

    pub fn remove(&self, account_id: &str) -> Result<()> {
        self.mutate(account_id, |entries, index| {
            entries.remove(index);
        })?;
        tracing::info!(account_id, "removed account");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountsChanged> {
        self.changes.subscribe()
    }

    pub fn notify_changed(&self, source: ChangeSource) {
        // No receivers is fine.
        let _ = self.changes.send(AccountsChanged {
            path: self.path(),
            source,
        });
    }

    fn mutate<F>(&self, account_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Value>, usize),
    {
        {
            let _guard = lock(&self.write_lock);
            let mut entries = self.file.load()?;
            let index = entries
                .iter()
                .position(|entry| {
                    parse_account(entry).is_some_and(|account| account.account_id == account_id)
                })
                .ok_or_else(|| LauncherError::NotFound(format!("Account {account_id}")))?;
            apply(&mut entries, index);
            self.file.save(&entries)?;
        }
        self.notify_changed(ChangeSource::Local);
        Ok(())
    }
}

/// Username/password accounts in `legacy_accounts.json`, owned entirely by
/// the launcher and saved as a whole.
#[derive(Clone)]
pub struct LegacyAccountStore {
    file: JsonFileStore<Vec<LegacyAccount>>,
    write_lock: Arc<Mutex<()>>,
}

impl LegacyAccountStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFileStore::new(path),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn list(&self) -> Result<Vec<LegacyAccount>> {
        let _guard = lock(&self.write_lock);
        self.file.load()
    }

    /// Replaces the collection. Rows without an id, or with an unsaved
    /// placeholder id, get a fresh one. Returns what was written.
    pub fn replace(&self, accounts: Vec<LegacyAccount>) -> Result<Vec<LegacyAccount>> {
        let accounts: Vec<LegacyAccount> = accounts.into_iter().map(assign_id).collect();
        let _guard = lock(&self.write_lock);
        self.file.save(&accounts)?;
        tracing::info!(count = accounts.len(), "saved legacy accounts");
        Ok(accounts)
    }
}

fn assign_id(mut account: LegacyAccount) -> LegacyAccount {
    let id = account.id.trim();
    if id.is_empty() || id.starts_with(UNSAVED_ID_PREFIX) {
        account.id = Uuid::new_v4().to_string();
    }
    account
}

/// `resource_versions.json`: the selected client version.
#[derive(Clone)]
pub struct PreferencesStore {
    file: JsonFileStore<ResourcePreferences>,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: JsonFileStore::new(path),
        }
    }

    pub fn read(&self) -> Result<ResourcePreferences> {
        self.file.load_or_init()
    }

    pub fn write(&self, preferences: &ResourcePreferences) -> Result<()> {
        self.file.save(preferences)
    }

    pub fn set_version_pref(&self, version: &str) -> Result<()> {
        let mut preferences = self.read()?;
        preferences.version_pref = version.to_string();
        self.write(&preferences)
    }
}
