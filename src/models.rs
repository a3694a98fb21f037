use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reads a string field written by other tools: `null` becomes empty and
/// numbers or booleans keep their JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

/// A proxy that is not an object reads as no proxy.
fn lenient_proxy<'de, D>(deserializer: D) -> Result<Option<ProxyConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub proxy_type: String,
}

impl ProxyConfig {
    pub fn is_set(&self) -> bool {
        !self.ip.trim().is_empty()
    }

    /// `http` unless the account names another scheme.
    pub fn effective_type(&self) -> &str {
        let value = self.proxy_type.trim();
        if value.is_empty() {
            "http"
        } else {
            value
        }
    }
}

/// Session account written by the sub-launcher. Fields the launcher does not
/// know about are carried through untouched when the file is rewritten.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(deserialize_with = "lenient_string")]
    pub account_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_id: String,
    #[serde(
        default,
        deserialize_with = "lenient_proxy",
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy: Option<ProxyConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacyAccount {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub proxy: String,
}

/// Body of the remote `version.json`.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub latest: String,
    #[serde(default)]
    pub all_versions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub jar_name: String,
    pub download_url: String,
    pub all_versions: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LatestVersionStatus {
    #[serde(flatten)]
    pub info: VersionInfo,
    pub is_downloaded: bool,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VersionCatalog {
    pub latest: Option<VersionInfo>,
    pub all_versions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DownloadProgress {
    pub percent: u8,
    pub status: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub file_name: String,
    pub already_exists: bool,
}

/// Structured reply for every UI-facing request.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Vec<String>>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn fetched(outcome: FetchOutcome) -> Self {
        Self {
            success: true,
            file_name: Some(outcome.file_name),
            already_exists: outcome.already_exists.then_some(true),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn canceled() -> Self {
        Self {
            success: false,
            canceled: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct LegacySaveResult {
    pub success: bool,
    pub accounts: Vec<LegacyAccount>,
}

/// Contents of `resource_versions.json`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResourcePreferences {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version_pref: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub vcpp_installed: bool,
    pub jcef_installed: bool,
}

/// Decides whether a spawned process outlives the launcher.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleClass {
    /// Game client: detached and left running on shutdown.
    Client,
    /// Embedded browser sub-launcher: terminated on shutdown.
    Jcef,
    #[default]
    Other,
}

impl LifecycleClass {
    pub const ALL: [LifecycleClass; 3] = [
        LifecycleClass::Client,
        LifecycleClass::Jcef,
        LifecycleClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleClass::Client => "client",
            LifecycleClass::Jcef => "jcef",
            LifecycleClass::Other => "other",
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpenClientRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub client_type: Option<LifecycleClass>,
}
