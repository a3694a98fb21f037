use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;
use crate::utils::file::write_atomic;

/// A whole-file JSON document. Every read parses the full file and every
/// write replaces it.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonFileStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or blank files read as the default value without touching
    /// disk. Files that are not JSON at all are moved aside and reset. Valid
    /// JSON of the wrong shape is an error and the file is left alone.
    pub fn load(&self) -> Result<T> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(err) => return Err(err.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        match serde_json::from_slice(&raw) {
            Ok(value) => Ok(value),
            Err(err) if err.is_data() => {
                tracing::warn!(file = %self.path.display(), error = %err, "store has unexpected shape");
                Err(err.into())
            }
            Err(err) => self.recover(&raw, &err),
        }
    }

    /// Like [`JsonFileStore::load`], but writes the default when the file is
    /// missing so the user can find and edit it.
    pub fn load_or_init(&self) -> Result<T> {
        if !self.path.exists() {
            let value = T::default();
            self.save(&value)?;
            return Ok(value);
        }
        self.load()
    }

    pub fn save(&self, value: &T) -> Result<()> {
        let body = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.path, &body)?;
        Ok(())
    }

    fn recover(&self, raw: &[u8], err: &serde_json::Error) -> Result<T> {
        let backup = self.backup_path();
        fs::write(&backup, raw)?;
        let value = T::default();
        self.save(&value)?;
        tracing::warn!(
            file = %self.path.display(),
            backup = %backup.display(),
            error = %err,
            "corrupt store reset to empty"
        );
        Ok(value)
    }

    fn backup_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("store.json");
        let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f");
        self.path.with_file_name(format!("{name}.corrupt-{stamp}.bak"))
    }
}
