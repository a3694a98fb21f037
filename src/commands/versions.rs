use std::path::PathBuf;
use std::sync::Arc;

use tauri::{AppHandle, State};
use tauri_plugin_dialog::{DialogExt, FilePath};
use tokio::sync::oneshot;

use ghostlite_launcher::models::{CommandResult, LatestVersionStatus, VersionCatalog};
use ghostlite_launcher::AppState;

#[tauri::command]
pub async fn list_jars(state: State<'_, Arc<AppState>>) -> Result<Vec<String>, String> {
    state.launch.list_artifacts().map_err(|err| err.to_string())
}

#[tauri::command]
pub async fn delete_jars(
    keep: Option<Vec<String>>,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(state.launch.delete_artifacts(&keep.unwrap_or_default()))
}

#[tauri::command]
pub async fn check_latest_version(
    state: State<'_, Arc<AppState>>,
) -> Result<Option<LatestVersionStatus>, String> {
    Ok(state.launch.check_latest_version().await)
}

#[tauri::command]
pub async fn get_all_versions(state: State<'_, Arc<AppState>>) -> Result<VersionCatalog, String> {
    Ok(state.launch.all_versions().await)
}

#[tauri::command]
pub async fn download_version(
    version: String,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(state.launch.download_version(&version).await)
}

#[tauri::command]
pub async fn download_latest_version(
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    Ok(state.launch.download_latest().await)
}

#[tauri::command]
pub async fn load_custom_jar(
    app: AppHandle,
    state: State<'_, Arc<AppState>>,
) -> Result<CommandResult, String> {
    let (tx, rx) = oneshot::channel::<Option<PathBuf>>();
    app.dialog()
        .file()
        .set_title("Select JAR")
        .add_filter("JAR Files", &["jar"])
        .pick_file(move |file| {
            let picked = match file {
                Some(FilePath::Path(path)) => Some(path),
                _ => None,
            };
            let _ = tx.send(picked);
        });
    let picked = rx.await.unwrap_or(None);
    Ok(state.launch.load_custom_artifact(picked))
}
