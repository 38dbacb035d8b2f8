use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

const APP_DIR: &str = "ado-leadtime";

/// Configuration file structure.
///
/// Holds the Azure DevOps connection settings and output preferences so
/// repeated runs only need the flags that change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureDevOpsConfig {
    /// Organisation root, e.g. `https://dev.azure.com/contoso`
    pub organization_url: Option<String>,

    /// Release management root, derived from the organisation URL when unset
    pub release_url: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Personal access token
    pub token: Option<String>,

    /// Project name
    pub project: Option<String>,

    /// Release definition name
    pub release_definition: Option<String>,

    /// Only measure deployments to this environment (e.g. "PRD")
    pub environment: Option<String>,

    /// Number of most recent releases to inspect
    #[serde(default = "default_top")]
    pub top: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Releases and artifacts processed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Emit commit-to-production metrics for artifacts with no merging pull request
    #[serde(default)]
    pub include_unmerged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub pretty: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            organization_url: None,
            release_url: None,
            api_version: default_api_version(),
            token: None,
            project: None,
            release_definition: None,
            environment: None,
            top: default_top(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_factor: default_backoff_factor(),
            concurrency: default_concurrency(),
            include_unmerged: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            log_level: default_log_level(),
        }
    }
}

fn default_api_version() -> String {
    "7.1".to_string()
}

fn default_top() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_concurrency() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AzureDevOpsConfig {
    /// Release management root.
    ///
    /// Falls back to the `vsrm` host matching the organisation URL for both
    /// `dev.azure.com/<org>` and `<org>.visualstudio.com` layouts.
    pub fn resolved_release_url(&self) -> Result<String> {
        if let Some(url) = &self.release_url {
            return Ok(url.clone());
        }

        let organization = self
            .organization_url
            .as_deref()
            .context("organization-url is not set")?;
        let mut url = Url::parse(organization)
            .with_context(|| format!("Invalid organization URL: {organization}"))?;

        let release_host = match url.host_str() {
            Some("dev.azure.com") => "vsrm.dev.azure.com".to_string(),
            Some(host) if host.ends_with(".visualstudio.com") => {
                let org = host.trim_end_matches(".visualstudio.com");
                format!("{org}.vsrm.visualstudio.com")
            }
            _ => anyhow::bail!(
                "Cannot derive release-url from {organization}; set release-url explicitly"
            ),
        };

        url.set_host(Some(&release_host))
            .with_context(|| format!("Invalid release host: {release_host}"))?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./leadtime.toml, ./leadtime.json, ./leadtime.yaml, ./leadtime.yml
    /// 3. `<user config dir>/ado-leadtime/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["leadtime.toml", "leadtime.json", "leadtime.yaml", "leadtime.yml"];
        let user_config = Self::user_config_path();

        for candidate in candidates
            .iter()
            .map(PathBuf::from)
            .chain(user_config.into_iter())
        {
            if candidate.exists() {
                return Self::load_from_path(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file, choosing the format from the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
