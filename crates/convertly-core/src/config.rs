//! Configuration module
//!
//! Server, validation, polling, provider and storage settings, loaded from the
//! environment (with optional `.env` file) and validated at startup.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const MAX_FILE_SIZE_MB: usize = 10;
const POLL_INTERVAL_MS: u64 = 1000;
const BATCH_POLL_INTERVAL_MS: u64 = 2000;
const MAX_POLL_ATTEMPTS: u32 = 60;
const PROVIDER_TIMEOUT_SECS: u64 = 300;
const UPLOAD_TTL_SECS: u64 = 86_400;
const JOB_TTL_SECS: u64 = 86_400;
const CLEANUP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_PROVIDER_URL: &str = "https://api.cloudconvert.com/v2";

const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "application/pdf,\
application/msword,\
application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
application/vnd.ms-excel,\
application/vnd.openxmlformats-officedocument.spreadsheetml.sheet,\
application/vnd.ms-powerpoint,\
application/vnd.openxmlformats-officedocument.presentationml.presentation,\
text/plain,text/html,text/csv,application/rtf,\
image/jpeg,image/png,image/gif,image/webp,image/tiff,image/bmp";

const PLACEHOLDER_KEYS: &[&str] = &["your-api-key", "your_api_key", "changeme", "xxx"];

/// API key for the hosted conversion provider.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, Default)]
pub struct ProviderCredential(String);

impl ProviderCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        let value = self.0.trim();
        value.is_empty()
            || PLACEHOLDER_KEYS.contains(&value.to_lowercase().as_str())
            || value.starts_with('<')
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderCredential(<redacted>)")
    }
}

/// How the provider obtains the source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Bytes are posted to the provider's upload form.
    #[default]
    Upload,
    /// The provider fetches `PUBLIC_BASE_URL/files/{id}` itself.
    Url,
}

impl std::str::FromStr for ImportMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upload" => Ok(ImportMode::Upload),
            "url" => Ok(ImportMode::Url),
            _ => Err(anyhow::anyhow!("Invalid import mode: {}", s)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub public_base_url: String,
}

/// Conversion service configuration
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    pub base: BaseConfig,
    // Upload validation
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    // Polling
    pub poll_interval_ms: u64,
    pub batch_poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    // Provider
    pub provider_api_key: ProviderCredential,
    pub provider_base_url: String,
    pub provider_import_mode: ImportMode,
    pub provider_timeout_secs: u64,
    // Key-value store
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub upload_ttl_secs: u64,
    pub job_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                public_base_url: format!("http://localhost:{}", SERVER_PORT),
            },
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_content_types: split_list(DEFAULT_ALLOWED_CONTENT_TYPES),
            poll_interval_ms: POLL_INTERVAL_MS,
            batch_poll_interval_ms: BATCH_POLL_INTERVAL_MS,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            provider_api_key: ProviderCredential::default(),
            provider_base_url: DEFAULT_PROVIDER_URL.to_string(),
            provider_import_mode: ImportMode::Upload,
            provider_timeout_secs: PROVIDER_TIMEOUT_SECS,
            storage_backend: StorageBackend::Memory,
            local_storage_path: None,
            upload_ttl_secs: UPLOAD_TTL_SECS,
            job_ttl_secs: JOB_TTL_SECS,
            cleanup_interval_secs: CLEANUP_INTERVAL_SECS,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ConverterConfig>);

impl Config {
    fn as_converter(&self) -> &ConverterConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.as_converter().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ConverterConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_converter().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_converter().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_converter().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_converter().base.environment
    }

    pub fn public_base_url(&self) -> &str {
        self.as_converter().base.public_base_url.trim_end_matches('/')
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_converter().max_file_size_bytes
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_converter().allowed_content_types
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.as_converter().poll_interval_ms)
    }

    pub fn batch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.as_converter().batch_poll_interval_ms)
    }

    pub fn max_poll_attempts(&self) -> u32 {
        self.as_converter().max_poll_attempts
    }

    pub fn provider_api_key(&self) -> &ProviderCredential {
        &self.as_converter().provider_api_key
    }

    pub fn provider_base_url(&self) -> &str {
        self.as_converter().provider_base_url.trim_end_matches('/')
    }

    pub fn provider_import_mode(&self) -> ImportMode {
        self.as_converter().provider_import_mode
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.as_converter().provider_timeout_secs)
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_converter().storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_converter().local_storage_path.as_deref()
    }

    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.as_converter().upload_ttl_secs)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.as_converter().job_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.as_converter().cleanup_interval_secs)
    }

    /// URL at which an uploaded file is re-served by this server.
    pub fn file_url(&self, file_id: &uuid::Uuid) -> String {
        format!("{}/files/{}", self.public_base_url(), file_id)
    }
}

impl ConverterConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port));

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_file_size_bytes = megabytes_to_bytes(max_file_size_mb)
            .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large"))?;

        let allowed_content_types = split_list(
            &env::var("ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_CONTENT_TYPES.to_string()),
        );

        let provider_api_key = ProviderCredential::new(
            env::var("CLOUDCONVERT_API_KEY")
                .map_err(|_| anyhow::anyhow!("CLOUDCONVERT_API_KEY must be set"))?,
        );

        let provider_import_mode = env::var("CLOUDCONVERT_IMPORT_MODE")
            .unwrap_or_else(|_| "upload".to_string())
            .parse()?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        Ok(ConverterConfig {
            base: BaseConfig {
                server_port,
                cors_origins: cors_origins_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                environment,
                public_base_url,
            },
            max_file_size_bytes,
            allowed_content_types,
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(POLL_INTERVAL_MS),
            batch_poll_interval_ms: env::var("BATCH_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| BATCH_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(BATCH_POLL_INTERVAL_MS),
            max_poll_attempts: env::var("MAX_POLL_ATTEMPTS")
                .unwrap_or_else(|_| MAX_POLL_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(MAX_POLL_ATTEMPTS),
            provider_api_key,
            provider_base_url: env::var("CLOUDCONVERT_API_URL")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_URL.to_string()),
            provider_import_mode,
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| PROVIDER_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(PROVIDER_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            upload_ttl_secs: env::var("UPLOAD_TTL_SECS")
                .unwrap_or_else(|_| UPLOAD_TTL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_TTL_SECS),
            job_ttl_secs: env::var("JOB_TTL_SECS")
                .unwrap_or_else(|_| JOB_TTL_SECS.to_string())
                .parse()
                .unwrap_or(JOB_TTL_SECS),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| CLEANUP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(CLEANUP_INTERVAL_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.provider_api_key.is_placeholder() {
            return Err(anyhow::anyhow!(
                "CLOUDCONVERT_API_KEY must be set to a real API key"
            ));
        }

        if !self.provider_base_url.starts_with("http://")
            && !self.provider_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "CLOUDCONVERT_API_URL must be an http(s) URL"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must list at least one type"
            ));
        }

        if self.poll_interval_ms == 0 || self.batch_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("Poll intervals must be greater than 0"));
        }

        if self.max_poll_attempts == 0 {
            return Err(anyhow::anyhow!("MAX_POLL_ATTEMPTS must be greater than 0"));
        }

        if self.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLEANUP_INTERVAL_SECS must be greater than 0"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        if self.provider_import_mode == ImportMode::Url
            && self.base.public_base_url.contains("localhost")
        {
            tracing::warn!(
                public_base_url = %self.base.public_base_url,
                "URL import mode with a localhost PUBLIC_BASE_URL; the provider will not reach it"
            );
        }

        Ok(())
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn megabytes_to_bytes(megabytes: usize) -> Option<usize> {
    megabytes.checked_mul(1024 * 1024)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
