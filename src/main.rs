#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;
mod desktop;

use std::sync::Arc;

use tauri::{Emitter, Manager, RunEvent};
use tokio::sync::broadcast::error::RecvError;

use ghostlite_launcher::config::LauncherConfig;
use ghostlite_launcher::services::{AccountFileWatcher, ChangeSource, SupervisorEvent};
use ghostlite_launcher::utils::paths::resolve_log_dir;
use ghostlite_launcher::{logging, AppState};

use crate::desktop::{DialogPrompt, WindowProgress, ACCOUNTS_CHANGED_EVENT};

/// Keeps the accounts file watch alive for the lifetime of the app.
struct AccountWatch(#[allow(dead_code)] Option<AccountFileWatcher>);

fn show_main_window(app: &tauri::AppHandle) {
    if let Some(main_window) = app.get_webview_window("main") {
        let _ = main_window.show();
        let _ = main_window.unminimize();
        let _ = main_window.set_focus();
    }
}

fn forward_events(app: &tauri::AppHandle, state: &AppState) {
    let mut changes = state.accounts.subscribe();
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    tracing::debug!(source = ?change.source, "accounts changed");
                    let _ = handle.emit(ACCOUNTS_CHANGED_EVENT, ());
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut events = state.supervisor.subscribe();
    let accounts = state.accounts.clone();
    tauri::async_runtime::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SupervisorEvent::SubLauncherExited) => {
                    accounts.notify_changed(ChangeSource::SubLauncherExit);
                }
                Ok(SupervisorEvent::Exited { .. }) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn main() {
    let config = LauncherConfig::from_env();
    if let Err(err) = logging::init(&resolve_log_dir(&config.data_dir)) {
        eprintln!("failed to initialise logging: {err}");
    }

    let app = match tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            show_main_window(app);
        }))
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_shell::init())
        .setup(move |app| {
            let handle = app.handle().clone();
            let state = AppState::new(
                config,
                Arc::new(WindowProgress::new(handle.clone())),
                Arc::new(DialogPrompt::new(handle.clone())),
            )?;

            let watcher = match AccountFileWatcher::start(&state.accounts) {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    tracing::warn!(error = %err, "accounts file watch unavailable");
                    None
                }
            };
            forward_events(&handle, &state);

            app.manage(AccountWatch(watcher));
            app.manage(Arc::new(state));
            show_main_window(&handle);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::accounts::read_accounts,
            commands::accounts::save_account_proxy,
            commands::accounts::remove_jagex_account,
            commands::accounts::overwrite_credential_properties,
            commands::accounts::read_legacy_accounts,
            commands::accounts::save_legacy_accounts,
            commands::launch::open_client,
            commands::launch::open_clients,
            commands::launch::open_launcher,
            commands::launch::check_dependencies,
            commands::launch::list_processes,
            commands::versions::list_jars,
            commands::versions::delete_jars,
            commands::versions::check_latest_version,
            commands::versions::get_all_versions,
            commands::versions::download_version,
            commands::versions::download_latest_version,
            commands::versions::load_custom_jar,
            commands::properties::read_properties,
            commands::properties::write_properties,
            commands::system::get_launcher_version,
        ])
        .build(tauri::generate_context!())
    {
        Ok(app) => app,
        Err(error) => {
            tracing::error!("error while building tauri application: {error}");
            eprintln!("error while building tauri application: {error}");
            return;
        }
    };

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            // Game clients keep running; helpers are stopped.
            if let Some(state) = app.try_state::<Arc<AppState>>() {
                let state = state.inner().clone();
                tauri::async_runtime::block_on(async move {
                    state.launch.shutdown().await;
                });
            }
        }
    });
}
