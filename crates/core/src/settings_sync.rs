//! Remote editor settings from a settings-sync gist
//!
//! A gist holding `settings.json` and `keybindings.json` (or
//! `keybindingsMac.json`) can contribute editor settings and key bindings to
//! the generated image. Everything here is optional enrichment: callers get a
//! typed error and decide whether to continue without the remote content.

use crate::errors::{CodeupError, Result, SettingsError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Environment variable holding the gist id
pub const SETTINGS_SYNC_GIST_ENV: &str = "SETTINGS_SYNC_GIST_ID";

/// GitHub REST API root
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Remote file holding editor settings
pub const SETTINGS_FILE: &str = "settings.json";

/// Remote key binding files, in lookup order
pub const KEYBINDINGS_FILES: [&str; 2] = ["keybindings.json", "keybindingsMac.json"];

const USER_AGENT: &str = concat!("codeup/", env!("CARGO_PKG_VERSION"));

/// Settings sync configuration
#[derive(Debug, Clone)]
pub struct SettingsSyncConfig {
    /// Gist identifier; `None` disables settings sync
    pub gist_id: Option<String>,
    /// API root, overridable for tests
    pub api_base_url: String,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl Default for SettingsSyncConfig {
    fn default() -> Self {
        Self {
            gist_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SettingsSyncConfig {
    /// Configuration for a gist id. Blank ids count as unset.
    pub fn new(gist_id: Option<String>) -> Self {
        Self {
            gist_id: gist_id.filter(|id| !id.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Override the API root
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// A key binding entry as written to keybindings.json
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyBinding {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub when: String,
}

/// Source of remote settings files
#[async_trait::async_trait]
pub trait SettingsSource: Send + Sync {
    /// Return the non-empty content of `filename`
    async fn fetch_file(&self, filename: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

/// Settings source backed by the GitHub gist API.
///
/// The gist document is fetched at most once per instance.
pub struct GistSettingsSource {
    config: SettingsSyncConfig,
    client: reqwest::Client,
    gist: OnceCell<Gist>,
}

impl GistSettingsSource {
    /// Create a source; no request is made until a file is fetched
    pub fn new(config: SettingsSyncConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(request_error)?;
        Ok(Self {
            config,
            client,
            gist: OnceCell::new(),
        })
    }

    /// Whether a gist id is configured
    pub fn is_configured(&self) -> bool {
        self.config.gist_id.is_some()
    }

    async fn gist(&self) -> Result<&Gist> {
        let gist_id = self
            .config
            .gist_id
            .as_deref()
            .ok_or(SettingsError::NotConfigured)?;

        self.gist
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/gists/{}",
                    self.config.api_base_url.trim_end_matches('/'),
                    gist_id
                );
                debug!("Fetching settings gist from {}", url);
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(request_error)?;
                let gist: Gist = response.json().await.map_err(request_error)?;
                debug!("Gist {} lists {} files", gist_id, gist.files.len());
                Ok::<_, CodeupError>(gist)
            })
            .await
    }

    async fn download_raw(&self, url: &str) -> Result<String> {
        debug!("Downloading truncated gist file from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?;
        response.text().await.map_err(request_error)
    }
}

#[async_trait::async_trait]
impl SettingsSource for GistSettingsSource {
    #[instrument(skip(self))]
    async fn fetch_file(&self, filename: &str) -> Result<String> {
        let gist = self.gist().await?;
        let not_found = || {
            CodeupError::Settings(SettingsError::FileNotFound {
                filename: filename.to_string(),
            })
        };

        let file = gist.files.get(filename).ok_or_else(not_found)?;
        let content = match (&file.raw_url, file.truncated) {
            (Some(raw_url), true) => self.download_raw(raw_url).await?,
            _ => file.content.clone().unwrap_or_default(),
        };

        if content.is_empty() {
            return Err(not_found());
        }
        Ok(content)
    }
}

fn request_error(err: reqwest::Error) -> CodeupError {
    CodeupError::Settings(SettingsError::Request {
        message: err.to_string(),
    })
}

/// Fetch and parse the remote `settings.json`
pub async fn load_remote_settings(
    source: &dyn SettingsSource,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let content = source.fetch_file(SETTINGS_FILE).await?;
    let value: serde_json::Value = json5::from_str(&content).map_err(|e| SettingsError::Parsing {
        filename: SETTINGS_FILE.to_string(),
        message: e.to_string(),
    })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(CodeupError::Settings(SettingsError::Parsing {
            filename: SETTINGS_FILE.to_string(),
            message: "expected a JSON object".to_string(),
        })),
    }
}

/// Fetch the first usable key binding file.
///
/// Files are tried in [`KEYBINDINGS_FILES`] order; a file that is missing,
/// empty or unparsable moves on to the next one. When none works the last
/// error is returned. `NotConfigured` is returned immediately.
pub async fn load_remote_keybindings(source: &dyn SettingsSource) -> Result<Vec<KeyBinding>> {
    let mut last_error = None;
    for filename in KEYBINDINGS_FILES {
        let content = match source.fetch_file(filename).await {
            Ok(content) => content,
            Err(CodeupError::Settings(SettingsError::NotConfigured)) => {
                return Err(SettingsError::NotConfigured.into())
            }
            Err(e) => {
                debug!("Skipping {}: {}", filename, e);
                last_error = Some(e);
                continue;
            }
        };

        match json5::from_str::<Vec<KeyBinding>>(&content) {
            Ok(bindings) => {
                debug!("Loaded {} key bindings from {}", bindings.len(), filename);
                return Ok(bindings);
            }
            Err(e) => {
                debug!("Skipping unparsable {}: {}", filename, e);
                last_error = Some(
                    SettingsError::Parsing {
                        filename: filename.to_string(),
                        message: e.to_string(),
                    }
                    .into(),
                );
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        SettingsError::FileNotFound {
            filename: KEYBINDINGS_FILES[0].to_string(),
        }
        .into()
    }))
}

/// Merge `remote` into `local` without overwriting local values.
///
/// Keys missing locally are added. When both sides hold an object under the
/// same key the merge recurses into it.
pub fn merge_settings(
    local: &mut serde_json::Map<String, serde_json::Value>,
    remote: serde_json::Map<String, serde_json::Value>,
) {
    for (key, remote_value) in remote {
        match local.get_mut(&key) {
            None => {
                local.insert(key, remote_value);
            }
            Some(serde_json::Value::Object(local_obj)) => {
                if let serde_json::Value::Object(remote_obj) = remote_value {
                    merge_settings(local_obj, remote_obj);
                }
            }
            Some(_) => {}
        }
    }
}
