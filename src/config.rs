use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONFIG_FILE, DEFAULT_CSV_PATH, DEFAULT_SYNC_BATCH_SIZE,
    DEFAULT_SYNC_MAX_WORKERS, DEFAULT_TIMEOUT_SECS, DEFAULT_VAULT_PATH,
};
use crate::error::{PipelineError, Result};

/// Runtime configuration, built once at startup and passed to each stage.
///
/// Precedence: defaults, then the TOML file, then environment variables,
/// then CLI flags (applied by the binary).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub import: ImportConfig,
    pub export: ExportConfig,
    pub supabase: SupabaseConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    pub csv_path: PathBuf,
    pub output_dir: PathBuf,
    pub chunk_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            output_dir: PathBuf::from(DEFAULT_VAULT_PATH),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub vault_path: PathBuf,
    pub batch_size: usize,
    pub max_workers: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::from(DEFAULT_VAULT_PATH),
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            max_workers: DEFAULT_SYNC_MAX_WORKERS,
        }
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_role_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Validated credentials for the remote store
#[derive(Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub service_role_key: String,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    /// Check that the endpoint and key are present and not template placeholders.
    pub fn credentials(&self) -> Result<SupabaseCredentials> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::Config("SUPABASE_URL not set".to_string()))?;
        let key = self
            .service_role_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::Config("SUPABASE_SERVICE_ROLE_KEY not set".to_string()))?;

        if url.contains("YOUR_") || key.contains("YOUR_") || url.contains("your-") {
            return Err(PipelineError::Config(
                "Replace placeholder Supabase values in .env".to_string(),
            ));
        }

        Ok(SupabaseCredentials {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: key.to_string(),
            timeout_secs: self.timeout_secs,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub pushgateway_url: Option<String>,
}

impl Config {
    /// Load configuration from an optional TOML file and the process environment.
    ///
    /// An explicit `path` must exist; the default file is only read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay recognised environment keys using `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CSV_PATH") {
            self.import.csv_path = PathBuf::from(v);
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.import.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("BATCH_SIZE") {
            self.import.chunk_size = parse_size("BATCH_SIZE", &v, self.import.chunk_size);
        }

        if let Some(v) = get("VAULT_PATH") {
            self.export.vault_path = PathBuf::from(v);
        }
        if let Some(v) = get("SYNC_BATCH_SIZE") {
            self.export.batch_size = parse_size("SYNC_BATCH_SIZE", &v, self.export.batch_size);
        }
        if let Some(v) = get("SYNC_MAX_WORKERS") {
            self.export.max_workers = parse_size("SYNC_MAX_WORKERS", &v, self.export.max_workers);
        }

        // Accept either a full URL or a project ref
        if let Some(v) = get("SUPABASE_URL") {
            self.supabase.url = Some(v);
        } else if let Some(project_ref) = get("SUPABASE_PROJECT_REF") {
            self.supabase.url = Some(format!("https://{}.supabase.co", project_ref));
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(v);
        }
        if let Some(v) = get("SUPABASE_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(secs) if secs > 0 => self.supabase.timeout_secs = secs,
                _ => warn!("Ignoring invalid SUPABASE_TIMEOUT_SECS={}", v),
            }
        }

        if let Some(v) = get("FP_PUSHGATEWAY_URL") {
            self.metrics.pushgateway_url = Some(v);
        }

        self.clamp();
    }

    /// Validated store credentials for a live export; `None` for a dry run.
    ///
    /// Call this before any stage runs so bad credentials never leave a
    /// half-finished run behind.
    pub fn export_credentials(&self, dry_run: bool) -> Result<Option<SupabaseCredentials>> {
        if dry_run {
            return Ok(None);
        }
        self.supabase.credentials().map(Some)
    }

    /// Sizes of zero would stall chunking and batching.
    pub fn clamp(&mut self) {
        self.import.chunk_size = self.import.chunk_size.max(1);
        self.export.batch_size = self.export.batch_size.max(1);
        self.export.max_workers = self.export.max_workers.max(1);
    }
}

fn parse_size(key: &str, raw: &str, current: usize) -> usize {
    match raw.parse::<usize>() {
        Ok(n) => n,
        Err(_) => {
            warn!("Ignoring invalid {}={}, keeping {}", key, raw, current);
            current
        }
    }
}
