use std::sync::Arc;

use tauri::State;

use ghostlite_launcher::models::{CommandResult, DependencyReport, OpenClientRequest};
use ghostlite_launcher::services::TrackedProcess;
use ghostlite_launcher::AppState;

#[tauri::command]
pub async fn open_client(
    options: Option<OpenClientRequest>,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(state.launch.open_client(options.unwrap_or_default()).await)
}

#[tauri::command]
pub async fn open_clients(
    version: String,
    account_ids: Vec<String>,
    state: State<'_, Arc<AppState>>,
) -> Result<Vec<CommandResult>, String> {
    Ok(state.launch.open_session_clients(&version, &account_ids).await)
}

#[tauri::command]
pub async fn open_launcher(state: State<'_, Arc<AppState>>) -> Result<CommandResult, String> {
    Ok(state.launch.open_launcher().await)
}

#[tauri::command]
pub async fn check_dependencies(
    state: State<'_, Arc<AppState>>,
) -> Result<DependencyReport, String> {
    Ok(state.launch.check_dependencies())
}

#[tauri::command]
pub async fn list_processes(state: State<'_, Arc<AppState>>) -> Result<Vec<TrackedProcess>, String> {
    Ok(state.supervisor.snapshot())
}
