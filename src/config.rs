use std::env;
use std::str::FromStr;
use anyhow::{bail, Context, Result};

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Which storage engine backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Spanner,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spanner" => Ok(StoreBackend::Spanner),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND must be one of: spanner, memory, got '{}'", other),
        }
    }
}

/// Spanner connection settings, only present for the Spanner backend
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub spanner: Option<SpannerConfig>,
    pub service_port: u16,
    pub service_host: String,
    pub blob_threshold_bytes: usize,
    /// Request body limit; `0` disables it
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "spanner".to_string())
            .parse::<StoreBackend>()?;

        let spanner = match backend {
            StoreBackend::Spanner => Some(SpannerConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let blob_threshold_bytes = env::var("BLOB_THRESHOLD_BYTES")
            .unwrap_or_else(|_| "4096".to_string())
            .parse::<usize>()
            .context("BLOB_THRESHOLD_BYTES must be a non-negative integer")?;

        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_BODY_BYTES.to_string())
            .parse::<usize>()
            .context("MAX_BODY_BYTES must be a non-negative integer")?;

        Ok(Config {
            backend,
            spanner,
            service_port,
            service_host,
            blob_threshold_bytes,
            max_body_bytes,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Config {
            backend: StoreBackend::Memory,
            spanner: None,
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
            blob_threshold_bytes: 4096,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Store backend: {:?}", self.backend);
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        tracing::info!("  Blob threshold: {} bytes", self.blob_threshold_bytes);
        match self.max_body_bytes {
            0 => tracing::info!("  Max body size: unlimited"),
            limit => tracing::info!("  Max body size: {} bytes", limit),
        }
        tracing::info!("  Service listening on: {}", self.bind_address());
    }
}

impl SpannerConfig {
    fn from_env() -> Result<Self> {
        let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        Ok(SpannerConfig {
            emulator_host,
            project,
            instance,
            database,
        })
    }
}
