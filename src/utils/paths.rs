use std::path::{Path, PathBuf};

pub(crate) fn ensure_dir(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if std::fs::create_dir_all(path).is_ok() {
        return Some(path.to_path_buf());
    }
    None
}

fn env_dir(key: &str) -> Option<PathBuf> {
    let value = std::env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    ensure_dir(&PathBuf::from(trimmed))
}

fn home_child(name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(name)
}

/// Directory holding jars, the JCEF bundle and the JSON state files.
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = env_dir("GHOSTLITE_DATA_DIR") {
        return dir;
    }
    let fallback = home_child(".microbot");
    ensure_dir(&fallback).unwrap_or(fallback)
}

/// Directory the game client reads `credentials.properties` from.
pub fn resolve_runelite_dir() -> PathBuf {
    if let Some(dir) = env_dir("GHOSTLITE_RUNELITE_DIR") {
        return dir;
    }
    home_child(".runelite")
}

pub fn resolve_log_dir(data_dir: &Path) -> PathBuf {
    if let Some(dir) = env_dir("GHOSTLITE_LOG_DIR") {
        return dir;
    }

    let candidate = data_dir.join("logs");
    if let Some(found) = ensure_dir(&candidate) {
        return found;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("logs");
            if let Some(found) = ensure_dir(&candidate) {
                return found;
            }
        }
    }

    PathBuf::from("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn log_dir_defaults_under_data_dir() {
        let data = std::env::temp_dir().join(format!("ghostlite-paths-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&data).expect("create data dir");
        if std::env::var("GHOSTLITE_LOG_DIR").is_err() {
            assert_eq!(resolve_log_dir(&data), data.join("logs"));
            assert!(data.join("logs").is_dir());
        }
        let _ = std::fs::remove_dir_all(&data);
    }

    #[test]
    fn ensure_dir_rejects_empty_path() {
        assert!(ensure_dir(Path::new("")).is_none());
    }
}
