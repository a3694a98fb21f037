use std::sync::Arc;

use tauri::State;

use ghostlite_launcher::models::{CommandResult, ResourcePreferences};
use ghostlite_launcher::AppState;

#[tauri::command]
pub async fn read_properties(
    state: State<'_, Arc<AppState>>,
) -> Result<ResourcePreferences, String> {
    state.preferences.read().map_err(|err| err.to_string())
}

#[tauri::command]
pub async fn write_properties(
    data: ResourcePreferences,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(match state.preferences.write(&data) {
        Ok(()) => CommandResult::ok(),
        Err(err) => CommandResult::failure(err.to_string()),
    })
}
