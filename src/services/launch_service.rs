use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{
    client_jar_name, LauncherConfig, JCEF_RELEASES_PAGE, VCREDIST_DOWNLOAD_URL,
};
use crate::errors::{LauncherError, Result};
use crate::models::{
    CommandResult, DependencyReport, DownloadProgress, LatestVersionStatus, LifecycleClass,
    OpenClientRequest, ProxyConfig, VersionCatalog, VersionInfo, VersionManifest,
};
use crate::services::account_store::AccountStore;
use crate::services::archive::extract_bundle;
use crate::services::asset_store::{archive_name_from_url, AssetStore, SUB_LAUNCHER_JAR};
use crate::services::credentials::{write_session_credentials, CredentialServer};
use crate::services::downloader::{Downloader, FetchResolution};
use crate::services::process_supervisor::{ProcessSupervisor, ShutdownReport, TrackedProcess};
use crate::services::ui_bridge::{RetryDecision, RetryPrompt, UserPrompt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Abandoned(String),
}

/// Client JVM arguments. Order matters to the client.
pub fn client_args(
    jar: &Path,
    proxy: Option<&ProxyConfig>,
    has_username: bool,
    api_port: Option<u16>,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(port) = api_port {
        args.push(format!("-Drunelite.api.port={port}"));
    }
    args.push("-jar".to_string());
    args.push(jar.display().to_string());
    if let Some(proxy) = proxy.filter(|p| p.is_set()) {
        args.push(format!("--proxy={}", proxy.ip.trim()));
        args.push(format!("--proxy-type={}", proxy.effective_type()));
    }
    if has_username {
        args.push("--clean-jagex-launcher".to_string());
    }
    args
}

pub fn sub_launcher_args(bundle_dir: &Path, launcher_jar: &Path) -> Vec<String> {
    vec![
        format!("-Djava.library.path={}", bundle_dir.display()),
        "-jar".to_string(),
        launcher_jar.display().to_string(),
    ]
}

/// Whether the MSVC runtime the embedded browser needs is present.
pub fn vcpp_installed() -> bool {
    if !cfg!(windows) {
        return true;
    }
    let root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
    let system32 = PathBuf::from(root).join("System32");
    ["msvcp140.dll", "vcruntime140.dll", "vcruntime140_1.dll"]
        .iter()
        .all(|dll| system32.join(dll).exists())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Failure text shown to the user, with a next step where one exists.
pub fn describe_failure(err: &LauncherError) -> String {
    match err {
        LauncherError::Network(_) | LauncherError::Http(_) => {
            format!("{err}. Check your internet connection and try again.")
        }
        LauncherError::NotFound(what) => format!("{what} was not found."),
        LauncherError::Archive(_) => {
            format!("{err}. Try again, or download the bundle manually from {JCEF_RELEASES_PAGE}")
        }
        _ => err.to_string(),
    }
}

/// Request boundary for launching and version management. Every public
/// operation returns a structured result instead of an error.
#[derive(Clone)]
pub struct LaunchService {
    config: Arc<LauncherConfig>,
    assets: AssetStore,
    downloader: Downloader,
    supervisor: ProcessSupervisor,
    accounts: AccountStore,
    prompt: Arc<dyn UserPrompt>,
}

impl LaunchService {
    pub fn new(
        config: Arc<LauncherConfig>,
        assets: AssetStore,
        downloader: Downloader,
        supervisor: ProcessSupervisor,
        accounts: AccountStore,
        prompt: Arc<dyn UserPrompt>,
    ) -> Self {
        Self {
            config,
            assets,
            downloader,
            supervisor,
            accounts,
            prompt,
        }
    }

    pub async fn open_client(&self, request: OpenClientRequest) -> CommandResult {
        match self.try_open_client(request).await {
            Ok(process) => {
                info!(id = process.id, pid = ?process.pid, "client launched");
                CommandResult::ok()
            }
            Err(err) => {
                error!(error = %err, "client launch failed");
                CommandResult::failure(describe_failure(&err))
            }
        }
    }

    /// Launches one client per session account, spaced apart so each client
    /// reads its own `credentials.properties`.
    pub async fn open_session_clients(
        &self,
        version: &str,
        account_ids: &[String],
    ) -> Vec<CommandResult> {
        let mut results = Vec::with_capacity(account_ids.len());
        for (index, account_id) in account_ids.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.multi_launch_spacing).await;
            }
            let request = OpenClientRequest {
                version: Some(version.to_string()),
                account_id: Some(account_id.clone()),
                ..OpenClientRequest::default()
            };
            results.push(self.open_client(request).await);
        }
        results
    }

    async fn try_open_client(&self, request: OpenClientRequest) -> Result<TrackedProcess> {
        let version = non_empty(request.version.as_deref())
            .ok_or_else(|| LauncherError::Precondition("Version is required".into()))?;
        let jar = self.assets.artifact_path(version)?;
        if !jar.is_file() {
            return Err(LauncherError::Precondition(format!(
                "{version} is not downloaded. Download it or load a custom jar first."
            )));
        }

        let mut proxy = request.proxy.clone();
        if let Some(account_id) = non_empty(request.account_id.as_deref()) {
            let account = self.accounts.find(account_id)?;
            write_session_credentials(&self.config.runelite_dir, &account)?;
            if proxy.is_none() {
                proxy = account.proxy.clone();
            }
        }

        let username = non_empty(request.username.as_deref());
        let password = non_empty(request.password.as_deref());
        let api_port = match (username, password) {
            (Some(user), Some(pass)) => {
                let server = CredentialServer::start(user.to_string(), pass.to_string()).await?;
                Some(server.port())
            }
            _ => None,
        };

        let args = client_args(&jar, proxy.as_ref(), username.is_some(), api_port);
        let class = request.client_type.unwrap_or(LifecycleClass::Client);
        self.supervisor
            .launch(&self.config.java_bin, &args, class)
            .await
    }

    pub async fn open_launcher(&self) -> CommandResult {
        match self.try_open_launcher().await {
            Ok(Readiness::Ready) => CommandResult::ok(),
            Ok(Readiness::Abandoned(error)) => CommandResult::failure(error),
            Err(err) => {
                error!(error = %err, "sub-launcher launch failed");
                CommandResult::failure(describe_failure(&err))
            }
        }
    }

    async fn try_open_launcher(&self) -> Result<Readiness> {
        if !vcpp_installed() {
            warn!("Visual C++ Redistributable not found");
            if self
                .prompt
                .offer_download_page(
                    "Visual C++ Redistributable Required",
                    "The account launcher needs the Microsoft Visual C++ 2015-2022 Redistributable. Download it now?",
                    VCREDIST_DOWNLOAD_URL,
                )
                .await
            {
                self.prompt.open_external(VCREDIST_DOWNLOAD_URL);
            }
            return Err(LauncherError::Precondition(
                "Visual C++ Redistributable is required. Please install it and try again.".into(),
            ));
        }

        if let Readiness::Abandoned(error) = self.ensure_jcef_bundle().await? {
            return Ok(Readiness::Abandoned(format!(
                "Failed to prepare JCEF bundle: {error}. Check your internet connection or download it from {JCEF_RELEASES_PAGE}"
            )));
        }
        if let Readiness::Abandoned(error) = self.ensure_sub_launcher().await? {
            return Ok(Readiness::Abandoned(format!(
                "Failed to download {SUB_LAUNCHER_JAR}: {error}. Check your internet connection."
            )));
        }

        let launcher_jar = self.assets.sub_launcher_path();
        if !launcher_jar.is_file() {
            return Err(LauncherError::Precondition(format!(
                "{SUB_LAUNCHER_JAR} not found after download attempt."
            )));
        }
        let args = sub_launcher_args(&self.assets.bundle_dir(), &launcher_jar);
        self.supervisor
            .launch(&self.config.java_bin, &args, LifecycleClass::Jcef)
            .await?;
        Ok(Readiness::Ready)
    }

    /// Downloads and unpacks the JCEF bundle unless it is already there.
    /// A failed extraction discards the archive and goes through the same
    /// retry prompt as a failed download, so a retry fetches it again.
    pub async fn ensure_jcef_bundle(&self) -> Result<Readiness> {
        if self.assets.bundle_is_materialized() {
            info!("JCEF bundle already present");
            return Ok(Readiness::Ready);
        }

        let url = self.config.jcef_bundle_url.clone();
        let archive_name = archive_name_from_url(&url);
        loop {
            let resolution = self
                .downloader
                .fetch_with_retry(
                    &archive_name,
                    &url,
                    self.config.bundle_timeout,
                    Some(JCEF_RELEASES_PAGE),
                )
                .await?;
            if let FetchResolution::Abandoned { error } = resolution {
                return Ok(Readiness::Abandoned(error));
            }

            let err = match self.extract_jcef_archive(&archive_name).await {
                Ok(()) => break,
                Err(err) => err,
            };
            let message = err.to_string();
            warn!(archive = %archive_name, error = %message, "JCEF bundle extraction failed");
            match self
                .prompt
                .retry_download(RetryPrompt {
                    artifact: &archive_name,
                    error: &message,
                    help_url: Some(JCEF_RELEASES_PAGE),
                })
                .await
            {
                RetryDecision::Retry => continue,
                RetryDecision::OpenHelpPage => {
                    self.prompt.open_external(JCEF_RELEASES_PAGE);
                    return Ok(Readiness::Abandoned(message));
                }
                RetryDecision::Cancel => return Ok(Readiness::Abandoned(message)),
            }
        }

        let missing = self.assets.missing_bundle_essentials();
        if !missing.is_empty() {
            warn!(?missing, "JCEF bundle is missing expected files");
        }
        Ok(Readiness::Ready)
    }

    async fn extract_jcef_archive(&self, archive_name: &str) -> Result<()> {
        let progress = self.downloader.progress().clone();
        progress.publish(Some(DownloadProgress {
            percent: 90,
            status: "Extracting JCEF bundle...".into(),
        }));
        let archive = self.assets.artifact_path(archive_name)?;
        let dest = self.assets.bundle_dir();
        let discard = archive.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_bundle(&archive, &dest))
            .await
            .map_err(|err| LauncherError::Archive(format!("extraction task failed: {err}")))
            .and_then(|result| result);
        if let Err(err) = extracted {
            progress.publish(None);
            // A bad archive must not satisfy the next existence check.
            if let Err(remove_err) = std::fs::remove_file(&discard) {
                warn!(archive = %discard.display(), error = %remove_err, "failed to discard archive");
            }
            return Err(err);
        }

        progress.publish(Some(DownloadProgress {
            percent: 100,
            status: "JCEF bundle ready!".into(),
        }));
        self.downloader.schedule_dismiss();
        Ok(())
    }

    pub async fn ensure_sub_launcher(&self) -> Result<Readiness> {
        let resolution = self
            .downloader
            .fetch_with_retry(
                SUB_LAUNCHER_JAR,
                &self.config.sub_launcher_url,
                self.config.bundle_timeout,
                None,
            )
            .await?;
        Ok(match resolution {
            FetchResolution::Fetched(_) => Readiness::Ready,
            FetchResolution::Abandoned { error } => Readiness::Abandoned(error),
        })
    }

    pub fn check_dependencies(&self) -> DependencyReport {
        DependencyReport {
            vcpp_installed: vcpp_installed(),
            jcef_installed: self.assets.bundle_is_materialized(),
        }
    }

    fn version_info(&self, manifest: VersionManifest) -> VersionInfo {
        let version = manifest.latest.trim().to_string();
        let all_versions = if manifest.all_versions.is_empty() {
            vec![version.clone()]
        } else {
            manifest.all_versions
        };
        VersionInfo {
            jar_name: client_jar_name(&version),
            download_url: self.config.client_jar_url(&version),
            version,
            all_versions,
        }
    }

    pub async fn latest_version(&self) -> Option<VersionInfo> {
        self.downloader
            .fetch_manifest(&self.config.manifest_url(), self.config.manifest_timeout)
            .await
            .map(|manifest| self.version_info(manifest))
    }

    pub async fn check_latest_version(&self) -> Option<LatestVersionStatus> {
        let info = self.latest_version().await?;
        let is_downloaded = self.assets.contains(&info.jar_name);
        Some(LatestVersionStatus {
            info,
            is_downloaded,
        })
    }

    pub async fn all_versions(&self) -> VersionCatalog {
        let latest = self.latest_version().await;
        let all_versions = latest
            .as_ref()
            .map(|info| info.all_versions.clone())
            .unwrap_or_default();
        VersionCatalog {
            latest,
            all_versions,
        }
    }

    pub async fn download_version(&self, version: &str) -> CommandResult {
        let version = version.trim();
        if version.is_empty() {
            return CommandResult::failure("Version is required");
        }
        let name = client_jar_name(version);
        let url = self.config.client_jar_url(version);
        self.download_client_jar(&name, &url).await
    }

    pub async fn download_latest(&self) -> CommandResult {
        let Some(info) = self.latest_version().await else {
            return CommandResult::failure(
                "Could not get latest version information. Check your internet connection and try again.",
            );
        };
        self.download_client_jar(&info.jar_name, &info.download_url).await
    }

    async fn download_client_jar(&self, name: &str, url: &str) -> CommandResult {
        match self
            .downloader
            .fetch_with_retry(name, url, self.config.jar_timeout, None)
            .await
        {
            Ok(FetchResolution::Fetched(outcome)) => CommandResult::fetched(outcome),
            Ok(FetchResolution::Abandoned { error }) => CommandResult::failure(format!(
                "Download of {name} failed: {error}. Try again later or load a custom jar."
            )),
            Err(err) => CommandResult::failure(describe_failure(&err)),
        }
    }

    pub fn list_artifacts(&self) -> Result<Vec<String>> {
        self.assets.list_client_jars()
    }

    pub fn delete_artifacts(&self, keep: &[String]) -> CommandResult {
        match self.assets.delete_client_jars(keep) {
            Ok(removed) => CommandResult {
                success: true,
                deleted: Some(removed),
                ..CommandResult::default()
            },
            Err(err) => CommandResult::failure(describe_failure(&err)),
        }
    }

    /// Imports a picked jar. `None` means the picker was dismissed.
    pub fn load_custom_artifact(&self, picked: Option<PathBuf>) -> CommandResult {
        let Some(path) = picked else {
            return CommandResult::canceled();
        };
        let is_jar = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jar"))
            .unwrap_or(false);
        if !is_jar {
            return CommandResult::failure("Select a .jar file to load.");
        }
        match self.assets.import_artifact(&path) {
            Ok(file_name) => CommandResult {
                success: true,
                file_name: Some(file_name),
                ..CommandResult::default()
            },
            Err(err) => CommandResult::failure(describe_failure(&err)),
        }
    }

    pub async fn shutdown(&self) -> ShutdownReport {
        let report = self.supervisor.shutdown().await;
        info!(?report, "launcher shutdown complete");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ui_bridge::HeadlessUi;
    use crate::test_support::{temp_dir, RecordingSignaller, RecordingSink, ScriptedPrompt, TestServer};
    use std::fs;
    use std::time::Duration;

    struct Fixture {
        service: LaunchService,
        assets: AssetStore,
        sink: Arc<RecordingSink>,
        root: PathBuf,
    }

    fn fixture(configure: impl FnOnce(&mut LauncherConfig)) -> Fixture {
        fixture_with_prompt(Arc::new(HeadlessUi), configure)
    }

    fn fixture_with_prompt(
        prompt: Arc<dyn UserPrompt>,
        configure: impl FnOnce(&mut LauncherConfig),
    ) -> Fixture {
        let root = temp_dir("launch");
        let mut config = LauncherConfig::with_dirs(root.join("data"), root.join("runelite"));
        config.java_bin = PathBuf::from("/definitely/not/java");
        config.progress_dismiss_delay = Duration::from_millis(10);
        configure(&mut config);
        let config = Arc::new(config);

        let assets = AssetStore::new(config.data_dir.clone()).expect("asset store");
        let sink = Arc::new(RecordingSink::default());
        let downloader = Downloader::new(
            assets.clone(),
            sink.clone(),
            prompt.clone(),
            config.progress_dismiss_delay,
        );
        let supervisor =
            ProcessSupervisor::new(Arc::new(RecordingSignaller::default()), prompt.clone(), config.shutdown_grace);
        let accounts = AccountStore::new(assets.state_file("accounts.json"));
        let service = LaunchService::new(config, assets.clone(), downloader, supervisor, accounts, prompt);
        Fixture {
            service,
            assets,
            sink,
            root,
        }
    }

    #[test]
    fn client_args_follow_the_launch_contract() {
        let jar = Path::new("/data/microbot-1.9.7.jar");
        let proxy = ProxyConfig {
            ip: "1.2.3.4:1080".into(),
            proxy_type: String::new(),
        };

        let args = client_args(jar, Some(&proxy), true, Some(43111));

        assert_eq!(
            args,
            vec![
                "-Drunelite.api.port=43111".to_string(),
                "-jar".to_string(),
                jar.display().to_string(),
                "--proxy=1.2.3.4:1080".to_string(),
                "--proxy-type=http".to_string(),
                "--clean-jagex-launcher".to_string(),
            ]
        );
        assert_eq!(
            client_args(jar, None, false, None),
            vec!["-jar".to_string(), jar.display().to_string()]
        );
    }

    #[test]
    fn sub_launcher_uses_bundle_library_path() {
        let args = sub_launcher_args(Path::new("/d/jcef-bundle"), Path::new("/d/microbot-launcher.jar"));
        assert_eq!(args[0], format!("-Djava.library.path={}", Path::new("/d/jcef-bundle").display()));
        assert_eq!(args[1], "-jar");
    }

    #[tokio::test]
    async fn open_client_requires_a_version_and_a_downloaded_jar() {
        let fx = fixture(|_| {});

        let missing_version = fx.service.open_client(OpenClientRequest::default()).await;
        assert!(!missing_version.success);
        assert_eq!(missing_version.error.as_deref(), Some("Version is required"));

        let missing_jar = fx
            .service
            .open_client(OpenClientRequest {
                version: Some("microbot-9.9.9.jar".into()),
                ..OpenClientRequest::default()
            })
            .await;
        assert!(!missing_jar.success);
        assert!(missing_jar.error.unwrap_or_default().contains("not downloaded"));
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn open_client_with_unknown_account_reports_not_found() {
        let fx = fixture(|_| {});
        fs::write(fx.assets.root().join("microbot-1.9.7.jar"), b"jar").expect("seed jar");

        let result = fx
            .service
            .open_client(OpenClientRequest {
                version: Some("microbot-1.9.7.jar".into()),
                account_id: Some("ghost".into()),
                ..OpenClientRequest::default()
            })
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("not found"));
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn missing_java_is_a_structured_failure() {
        let fx = fixture(|_| {});
        fs::write(fx.assets.root().join("microbot-1.9.7.jar"), b"jar").expect("seed jar");

        let result = fx
            .service
            .open_client(OpenClientRequest {
                version: Some("microbot-1.9.7.jar".into()),
                username: Some("alice".into()),
                password: Some("pw".into()),
                ..OpenClientRequest::default()
            })
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("Java is required"));
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn download_version_then_latest_short_circuits() {
        let server = TestServer::start(|path, _| match path {
            "/version.json" => (200, br#"{"latest":"1.9.7"}"#.to_vec()),
            "/microbot-1.9.7.jar" => (200, vec![1u8; 10_000]),
            _ => (404, Vec::new()),
        });
        let base = server.base_url.clone();
        let fx = fixture(move |config| config.releases_url = base);

        let first = fx.service.download_version("1.9.7").await;
        assert!(first.success);
        assert_eq!(first.file_name.as_deref(), Some("microbot-1.9.7.jar"));
        assert_eq!(first.already_exists, None);
        assert!(fx.sink.percents().contains(&100));

        let status = fx.service.check_latest_version().await.expect("latest");
        assert!(status.is_downloaded);
        assert_eq!(status.info.all_versions, vec!["1.9.7".to_string()]);

        let again = fx.service.download_latest().await;
        assert!(again.success);
        assert_eq!(again.already_exists, Some(true));
        assert_eq!(server.hits(), 3);
        assert_eq!(fx.service.list_artifacts().expect("list"), vec!["microbot-1.9.7.jar"]);
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn unreachable_manifest_means_no_version_info() {
        let server = TestServer::start(|_, _| (500, Vec::new()));
        let base = server.base_url.clone();
        let fx = fixture(move |config| config.releases_url = base);

        assert!(fx.service.check_latest_version().await.is_none());
        let catalog = fx.service.all_versions().await;
        assert!(catalog.latest.is_none());
        assert!(catalog.all_versions.is_empty());
        assert!(!fx.service.download_latest().await.success);
        let _ = fs::remove_dir_all(&fx.root);
    }

    fn jcef_tarball() -> Vec<u8> {
        let mut archive = Vec::new();
        {
            let encoder = flate2::write::GzEncoder::new(&mut archive, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for name in ["jcef.jar", "jcef_helper", "libcef.so", "icudtl.dat"] {
                let body = name.as_bytes();
                let mut header = tar::Header::new_gnu();
                header.set_size(body.len() as u64);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, format!("jcef-distrib/{name}"), body)
                    .expect("append");
            }
            builder.into_inner().expect("tar").finish().expect("gzip");
        }
        archive
    }

    #[tokio::test]
    async fn bundle_is_downloaded_and_extracted_once() {
        let server = TestServer::serving(jcef_tarball());
        let url = server.url("jcef-distrib-linux-amd64.tar.gz");
        let fx = fixture(move |config| config.jcef_bundle_url = url);

        let first = fx.service.ensure_jcef_bundle().await.expect("ensure bundle");
        assert_eq!(first, Readiness::Ready);
        assert!(fx.assets.bundle_dir().join("jcef.jar").exists());
        assert!(!fx.assets.root().join("jcef-distrib-linux-amd64.tar.gz").exists());
        assert!(fx.service.check_dependencies().jcef_installed);

        let second = fx.service.ensure_jcef_bundle().await.expect("ensure bundle again");
        assert_eq!(second, Readiness::Ready);
        assert_eq!(server.hits(), 1);
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn unreadable_bundle_is_fetched_again_on_retry() {
        let good = jcef_tarball();
        let server = TestServer::start(move |_, hit| {
            if hit == 0 {
                (200, b"<html>proxy error page</html>".to_vec())
            } else {
                (200, good.clone())
            }
        });
        let url = server.url("jcef-distrib-linux-amd64.tar.gz");
        let prompt = Arc::new(ScriptedPrompt::answering(vec![RetryDecision::Retry]));
        let fx = fixture_with_prompt(prompt.clone(), move |config| config.jcef_bundle_url = url);

        let readiness = fx.service.ensure_jcef_bundle().await.expect("ensure bundle");

        assert_eq!(readiness, Readiness::Ready);
        assert_eq!(server.hits(), 2);
        assert_eq!(prompt.asked(), 1);
        assert!(fx.assets.bundle_dir().join("jcef.jar").exists());
        assert!(!fx.assets.root().join("jcef-distrib-linux-amd64.tar.gz").exists());
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn declined_retry_after_bad_bundle_leaves_nothing_behind() {
        let server = TestServer::serving(b"<html>proxy error page</html>".to_vec());
        let url = server.url("jcef-distrib-linux-amd64.tar.gz");
        let prompt = Arc::new(ScriptedPrompt::answering(vec![RetryDecision::Cancel]));
        let fx = fixture_with_prompt(prompt.clone(), move |config| config.jcef_bundle_url = url);

        let first = fx.service.ensure_jcef_bundle().await.expect("ensure bundle");
        assert!(matches!(first, Readiness::Abandoned(_)));
        assert!(!fx.assets.root().join("jcef-distrib-linux-amd64.tar.gz").exists());
        assert_eq!(fx.sink.events().last(), Some(&None));

        let second = fx.service.ensure_jcef_bundle().await.expect("ensure bundle again");
        assert!(matches!(second, Readiness::Abandoned(_)));
        assert_eq!(server.hits(), 2);
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[test]
    fn delete_artifacts_reports_removed_jars() {
        let fx = fixture(|_| {});
        for name in ["microbot-1.9.6.jar", "microbot-1.9.7.jar", "microbot-launcher.jar"] {
            fs::write(fx.assets.root().join(name), b"jar").expect("seed jar");
        }

        let result = fx.service.delete_artifacts(&["microbot-1.9.7.jar".to_string()]);

        assert!(result.success);
        assert_eq!(result.deleted, Some(vec!["microbot-1.9.6.jar".to_string()]));
        assert!(fx.assets.contains("microbot-launcher.jar"));
        assert_eq!(fx.service.list_artifacts().expect("list"), vec!["microbot-1.9.7.jar"]);
        let _ = fs::remove_dir_all(&fx.root);
    }

    #[test]
    fn custom_jar_import_and_cancel() {
        let fx = fixture(|_| {});
        assert_eq!(fx.service.load_custom_artifact(None), CommandResult::canceled());

        let picked = fx.root.join("microbot-custom.jar");
        fs::write(&picked, b"custom").expect("write picked jar");
        let result = fx.service.load_custom_artifact(Some(picked));
        assert!(result.success);
        assert!(fx.assets.contains("microbot-custom.jar"));

        let not_jar = fx.root.join("notes.txt");
        fs::write(&not_jar, b"x").expect("write txt");
        assert!(!fx.service.load_custom_artifact(Some(not_jar)).success);
        let _ = fs::remove_dir_all(&fx.root);
    }
}
