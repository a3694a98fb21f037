use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{LauncherError, Result};
use crate::utils::file::count_entries;

pub const CLIENT_JAR_PREFIX: &str = "microbot-";
pub const SUB_LAUNCHER_JAR: &str = "microbot-launcher.jar";
pub const JCEF_BUNDLE_DIR: &str = "jcef-bundle";
/// A bundle directory with this many entries or fewer is treated as empty.
pub const BUNDLE_PLACEHOLDER_COUNT: usize = 3;

#[cfg(windows)]
const JCEF_ESSENTIALS: [&str; 2] = ["jcef.jar", "jcef_helper.exe"];
#[cfg(not(windows))]
const JCEF_ESSENTIALS: [&str; 2] = ["jcef.jar", "jcef_helper"];

/// Flat directory of downloaded artifacts and launcher state files.
#[derive(Clone, Debug)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an artifact file name inside the store, rejecting anything
    /// that would escape it.
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        let trimmed = name.trim();
        let is_plain = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && Path::new(trimmed).file_name().and_then(|n| n.to_str()) == Some(trimmed);
        if !is_plain {
            return Err(LauncherError::Config(format!("Invalid artifact name: {name}")));
        }
        Ok(self.root.join(trimmed))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifact_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    pub fn state_file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Client jars, newest first.
    pub fn list_client_jars(&self) -> Result<Vec<String>> {
        let mut jars = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_client_jar(&name) {
                jars.push(name);
            }
        }
        jars.sort_by(|a, b| compare_natural(b, a));
        Ok(jars)
    }

    /// Removes every client jar not named in `keep`; returns what was removed.
    pub fn delete_client_jars(&self, keep: &[String]) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in self.list_client_jars()? {
            if keep.iter().any(|k| k == &name) {
                continue;
            }
            fs::remove_file(self.root.join(&name))?;
            tracing::info!(jar = %name, "deleted client jar");
            removed.push(name);
        }
        Ok(removed)
    }

    /// Copies a user-picked jar into the store under its own file name.
    pub fn import_artifact(&self, source: &Path) -> Result<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LauncherError::Config(format!("Invalid file: {}", source.display())))?
            .to_string();
        if !source.is_file() {
            return Err(LauncherError::NotFound(source.display().to_string()));
        }
        let target = self.artifact_path(&name)?;
        if target != source {
            fs::copy(source, &target)?;
        }
        tracing::info!(jar = %name, from = %source.display(), "imported custom jar");
        Ok(name)
    }

    pub fn bundle_dir(&self) -> PathBuf {
        self.root.join(JCEF_BUNDLE_DIR)
    }

    pub fn bundle_is_materialized(&self) -> bool {
        count_entries(&self.bundle_dir()) > BUNDLE_PLACEHOLDER_COUNT
    }

    pub fn missing_bundle_essentials(&self) -> Vec<&'static str> {
        let dir = self.bundle_dir();
        JCEF_ESSENTIALS
            .iter()
            .copied()
            .filter(|name| !dir.join(name).exists())
            .collect()
    }

    pub fn sub_launcher_path(&self) -> PathBuf {
        self.root.join(SUB_LAUNCHER_JAR)
    }
}

pub fn is_client_jar(name: &str) -> bool {
    name.starts_with(CLIENT_JAR_PREFIX) && name.ends_with(".jar") && name != SUB_LAUNCHER_JAR
}

/// Archive file name for a bundle URL, falling back to a fixed name.
pub fn archive_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "jcef-bundle.tar.gz".to_string())
}

/// Orders names the way a person reads version numbers: digit runs compare
/// by value, everything else case-insensitively.
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_digits(&mut left);
                let rn = take_digits(&mut right);
                let ord = compare_digit_runs(&ln, &rn);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> AssetStore {
        let dir = std::env::temp_dir().join(format!("ghostlite-assets-{}", Uuid::new_v4()));
        AssetStore::new(dir).expect("create asset store")
    }

    fn touch(store: &AssetStore, name: &str) {
        fs::write(store.root().join(name), b"jar").expect("write artifact");
    }

    #[test]
    fn lists_client_jars_newest_first() {
        let store = temp_store();
        for name in [
            "microbot-1.9.7.jar",
            "microbot-1.10.0.jar",
            "microbot-1.9.10.jar",
            "microbot-launcher.jar",
            "accounts.json",
            "other.jar",
        ] {
            touch(&store, name);
        }

        let jars = store.list_client_jars().expect("list jars");
        assert_eq!(
            jars,
            vec!["microbot-1.10.0.jar", "microbot-1.9.10.jar", "microbot-1.9.7.jar"]
        );
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn delete_keeps_requested_jars_and_the_sub_launcher() {
        let store = temp_store();
        for name in ["microbot-1.9.6.jar", "microbot-1.9.7.jar", "microbot-launcher.jar"] {
            touch(&store, name);
        }

        let removed = store
            .delete_client_jars(&["microbot-1.9.7.jar".to_string()])
            .expect("delete jars");

        assert_eq!(removed, vec!["microbot-1.9.6.jar"]);
        assert!(store.contains("microbot-1.9.7.jar"));
        assert!(store.sub_launcher_path().exists());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn artifact_names_cannot_escape_the_store() {
        let store = temp_store();
        assert!(store.artifact_path("../evil.jar").is_err());
        assert!(store.artifact_path("nested/evil.jar").is_err());
        assert!(store.artifact_path("").is_err());
        assert!(store.artifact_path("microbot-1.9.7.jar").is_ok());
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn bundle_needs_more_than_placeholder_entries() {
        let store = temp_store();
        let bundle = store.bundle_dir();
        fs::create_dir_all(&bundle).expect("create bundle");
        for name in ["a", "b", "c"] {
            fs::write(bundle.join(name), b"").expect("write entry");
        }
        assert!(!store.bundle_is_materialized());

        fs::write(bundle.join("jcef.jar"), b"").expect("write jcef.jar");
        assert!(store.bundle_is_materialized());
        assert_eq!(store.missing_bundle_essentials().len(), 1);
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn imports_custom_jar_by_file_name() {
        let store = temp_store();
        let source_dir = std::env::temp_dir().join(format!("ghostlite-import-{}", Uuid::new_v4()));
        fs::create_dir_all(&source_dir).expect("create source dir");
        let source = source_dir.join("microbot-custom.jar");
        fs::write(&source, b"custom").expect("write source");

        let name = store.import_artifact(&source).expect("import");

        assert_eq!(name, "microbot-custom.jar");
        assert_eq!(fs::read(store.root().join(&name)).expect("read copy"), b"custom");
        let _ = fs::remove_dir_all(store.root());
        let _ = fs::remove_dir_all(&source_dir);
    }

    #[test]
    fn natural_compare_orders_numbers_by_value() {
        assert_eq!(compare_natural("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_natural("a2", "a10"), Ordering::Less);
        assert_eq!(compare_natural("A", "a"), "A".cmp("a"));
        assert_eq!(compare_natural("1.9", "1.9.1"), Ordering::Less);
    }

    #[test]
    fn archive_name_is_last_url_segment() {
        assert_eq!(
            archive_name_from_url("https://host/x/jcef-distrib-win64.tar.gz?raw=1"),
            "jcef-distrib-win64.tar.gz"
        );
        assert_eq!(archive_name_from_url("https://host/"), "jcef-bundle.tar.gz");
    }
}
