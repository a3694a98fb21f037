use std::path::PathBuf;
use std::time::Duration;

use crate::utils::paths::{resolve_data_dir, resolve_runelite_dir};

pub const DEFAULT_RELEASES_URL: &str =
    "https://gitlab.com/osrsislamg-group/microbot-releases/-/raw/main";
pub const DEFAULT_SUB_LAUNCHER_URL: &str =
    "https://files.microbot.cloud/assets/microbot-launcher/microbot-launcher.jar";
pub const JCEF_RELEASE_BASE: &str = "https://github.com/jcefmaven/jcefbuild/releases/download";
pub const JCEF_RELEASE_VERSION: &str = "1.0.66";
pub const JCEF_RELEASES_PAGE: &str = "https://github.com/jcefmaven/jcefbuild/releases";
pub const JAVA_DOWNLOAD_PAGE: &str = "https://www.oracle.com/java/technologies/downloads/";
pub const VCREDIST_DOWNLOAD_URL: &str = "https://aka.ms/vs/17/release/vc_redist.x64.exe";

/// Runtime settings for the launcher core. `from_env` applies the
/// `GHOSTLITE_*` overrides on top of [`LauncherConfig::with_dirs`].
#[derive(Clone, Debug)]
pub struct LauncherConfig {
    pub data_dir: PathBuf,
    pub runelite_dir: PathBuf,
    pub releases_url: String,
    pub sub_launcher_url: String,
    pub jcef_bundle_url: String,
    pub java_bin: PathBuf,
    pub manifest_timeout: Duration,
    pub jar_timeout: Duration,
    pub bundle_timeout: Duration,
    pub shutdown_grace: Duration,
    pub progress_dismiss_delay: Duration,
    pub multi_launch_spacing: Duration,
}

fn env_string(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Platform suffix used by the jcefbuild release archives.
pub fn jcef_platform() -> &'static str {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "aarch64") => "windows-arm64",
        ("windows", _) => "win64",
        ("macos", "aarch64") => "macosx-arm64",
        ("macos", _) => "macosx-amd64",
        ("linux", "aarch64") => "linux-arm64",
        _ => "linux-amd64",
    }
}

pub fn default_jcef_bundle_url() -> String {
    format!(
        "{JCEF_RELEASE_BASE}/{JCEF_RELEASE_VERSION}/jcef-distrib-{}.tar.gz",
        jcef_platform()
    )
}

fn default_java_bin() -> PathBuf {
    if let Some(home) = env_string("JAVA_HOME") {
        let name = if cfg!(windows) { "java.exe" } else { "java" };
        let candidate = PathBuf::from(home).join("bin").join(name);
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from("java")
}

impl LauncherConfig {
    pub fn with_dirs(data_dir: PathBuf, runelite_dir: PathBuf) -> Self {
        Self {
            data_dir,
            runelite_dir,
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            sub_launcher_url: DEFAULT_SUB_LAUNCHER_URL.to_string(),
            jcef_bundle_url: default_jcef_bundle_url(),
            java_bin: PathBuf::from("java"),
            manifest_timeout: Duration::from_secs(15),
            jar_timeout: Duration::from_secs(60),
            bundle_timeout: Duration::from_secs(300),
            shutdown_grace: Duration::from_secs(2),
            progress_dismiss_delay: Duration::from_secs(2),
            multi_launch_spacing: Duration::from_secs(2),
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::with_dirs(resolve_data_dir(), resolve_runelite_dir());
        if let Some(url) = env_string("GHOSTLITE_RELEASES_URL") {
            config.releases_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = env_string("GHOSTLITE_SUB_LAUNCHER_URL") {
            config.sub_launcher_url = url;
        }
        if let Some(url) = env_string("GHOSTLITE_JCEF_URL") {
            config.jcef_bundle_url = url;
        }
        config.java_bin = env_string("GHOSTLITE_JAVA")
            .map(PathBuf::from)
            .unwrap_or_else(default_java_bin);
        config
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/version.json", self.releases_url)
    }

    pub fn client_jar_url(&self, version: &str) -> String {
        format!("{}/{}", self.releases_url, client_jar_name(version))
    }
}

pub fn client_jar_name(version: &str) -> String {
    format!("microbot-{version}.jar")
}
