use std::sync::Arc;

use tauri::State;

use ghostlite_launcher::errors::LauncherError;
use ghostlite_launcher::models::{
    Account, CommandResult, LegacyAccount, LegacySaveResult, ProxyConfig,
};
use ghostlite_launcher::services::credentials::write_session_credentials;
use ghostlite_launcher::AppState;

fn to_result(outcome: Result<(), LauncherError>) -> CommandResult {
    match outcome {
        Ok(()) => CommandResult::ok(),
        Err(LauncherError::NotFound(what)) => CommandResult::failure(format!("{what} not found")),
        Err(err) => CommandResult::failure(err.to_string()),
    }
}

#[tauri::command]
pub async fn read_accounts(state: State<'_, Arc<AppState>>) -> Result<Vec<Account>, String> {
    state.accounts.list().map_err(|err| err.to_string())
}

#[tauri::command]
pub async fn save_account_proxy(
    account_id: String,
    proxy: Option<ProxyConfig>,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(to_result(state.accounts.update_proxy(&account_id, proxy)))
}

#[tauri::command]
pub async fn remove_jagex_account(
    account_id: String,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(to_result(state.accounts.remove(&account_id)))
}

#[tauri::command]
pub async fn overwrite_credential_properties(
    account: Account,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(to_result(
        write_session_credentials(&state.config.runelite_dir, &account).map(|_| ()),
    ))
}

#[tauri::command]
pub async fn read_legacy_accounts(
    state: State<'_, Arc<AppState>>,
) -> Result<Vec<LegacyAccount>, String> {
    state.legacy_accounts.list().map_err(|err| err.to_string())
}

#[tauri::command]
pub async fn save_legacy_accounts(
    accounts: Vec<LegacyAccount>,
    state: State<'_, Arc<AppState>>,
) -> Result<LegacySaveResult, String> {
    let accounts = state
        .legacy_accounts
        .replace(accounts)
        .map_err(|err| err.to_string())?;
    Ok(LegacySaveResult {
        success: true,
        accounts,
    })
}
