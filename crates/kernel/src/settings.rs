use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use ingestion_telemetry::{LogFormat, LoggingConfig};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "INGESTION_ENV";
const CONFIG_DIR_ENV: &str = "INGESTION_CONFIG_DIR";
const ENV_PREFIX: &str = "INGESTION";
const STANDARD_CONNECTION_STRING_ENV: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";
const REDACTED: &str = "<redacted>";

/// Routes the HTTP runtime always serves; API docs may not shadow them.
pub const OPERATIONAL_PATHS: &[&str] = &["/healthz", "/readyz"];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Typed configuration bound from layered sources at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApplicationProperties {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub api_docs: ApiDocsSettings,
}

impl ApplicationProperties {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// `INGESTION_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(None, None)
    }

    /// Like [`ApplicationProperties::load`], with explicit values taking
    /// precedence over `INGESTION_ENV` and `INGESTION_CONFIG_DIR`.
    pub fn load_with(
        environment: Option<Environment>,
        config_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = match environment {
            Some(environment) => environment,
            None => std::env::var(ENV_VAR_NAME)
                .unwrap_or_else(|_| DEFAULT_ENV.to_string())
                .parse()?,
        };
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => match std::env::var(CONFIG_DIR_ENV) {
                Ok(dir) => PathBuf::from(dir),
                // Default to repo root `config` directory.
                Err(_) => std::env::current_dir()
                    .context("unable to resolve current directory")?
                    .join("config"),
            },
        };

        Self::load_from(&config_dir, environment)
    }

    /// Load configuration from `config_dir` for an explicit environment.
    pub fn load_from(config_dir: &Path, environment: Environment) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut properties: ApplicationProperties = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selected environment wins over anything written in the files.
        properties.environment = environment;

        let telemetry = &mut properties.telemetry;
        for value in [
            &mut telemetry.connection_string,
            &mut telemetry.cloud_role,
            &mut telemetry.otlp_endpoint,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }

        if properties.telemetry.connection_string.is_none() {
            properties.telemetry.connection_string = std::env::var(STANDARD_CONNECTION_STRING_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty());
        }

        tracing::debug!(
            config_dir = %config_dir.display(),
            environment = %properties.environment,
            "configuration loaded"
        );

        Ok(properties)
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.application.name.trim().is_empty() {
            bail!("application.name must not be empty");
        }
        if self.server.request_timeout_ms == 0 {
            bail!("server.request_timeout_ms must be greater than zero");
        }
        if self.environment == Environment::Production {
            if self.server.port == 0 {
                bail!("server.port must be set explicitly in production");
            }
            let connection_string = self.telemetry.connection_string.as_deref();
            if connection_string.map_or(true, |cs| cs.trim().is_empty()) {
                bail!(
                    "telemetry.connection_string (or {}) must be set in production",
                    STANDARD_CONNECTION_STRING_ENV
                );
            }
        }
        for (key, path) in [
            ("api_docs.ui_path", &self.api_docs.ui_path),
            ("api_docs.spec_path", &self.api_docs.spec_path),
        ] {
            if !path.starts_with('/') {
                bail!("{} must start with '/', got '{}'", key, path);
            }
        }
        if self.api_docs.enabled {
            self.validate_api_docs_paths()?;
        }
        Ok(())
    }

    fn validate_api_docs_paths(&self) -> anyhow::Result<()> {
        let ui_path = self.api_docs.ui_path.trim_end_matches('/');
        let spec_path = self.api_docs.spec_path.as_str();

        if ui_path.is_empty() {
            bail!("api_docs.ui_path must not be '/'");
        }
        for reserved in OPERATIONAL_PATHS {
            if ui_path == *reserved {
                bail!("api_docs.ui_path '{}' collides with {}", ui_path, reserved);
            }
            if spec_path == *reserved {
                bail!("api_docs.spec_path '{}' collides with {}", spec_path, reserved);
            }
        }
        if spec_path.trim_end_matches('/') == ui_path {
            bail!(
                "api_docs.spec_path '{}' collides with api_docs.ui_path '{}'",
                spec_path,
                self.api_docs.ui_path
            );
        }
        Ok(())
    }

    /// Cloud role reported by the telemetry client.
    pub fn cloud_role(&self) -> &str {
        self.telemetry
            .cloud_role
            .as_deref()
            .unwrap_or(&self.application.name)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            format: self.telemetry.log_format,
            filter: self.telemetry.log_filter.clone(),
            otlp_endpoint: self.telemetry.otlp_endpoint.clone(),
            service_name: self.application.name.clone(),
            service_version: self.application.version.clone(),
            environment: self.environment.to_string(),
        }
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.telemetry.connection_string.is_some() {
            copy.telemetry.connection_string = Some(REDACTED.to_string());
        }
        copy
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationSettings {
    #[serde(default = "ApplicationSettings::default_name")]
    pub name: String,
    #[serde(default = "ApplicationSettings::default_version")]
    pub version: String,
}

impl ApplicationSettings {
    fn default_name() -> String {
        "ingestion".to_string()
    }

    fn default_version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub cloud_role: Option<String>,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_filter")]
    pub log_filter: String,
}

impl TelemetrySettings {
    fn default_log_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            cloud_role: None,
            otlp_endpoint: None,
            log_format: LogFormat::Pretty,
            log_filter: Self::default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiDocsSettings {
    #[serde(default = "ApiDocsSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "ApiDocsSettings::default_ui_path")]
    pub ui_path: String,
    #[serde(default = "ApiDocsSettings::default_spec_path")]
    pub spec_path: String,
}

impl ApiDocsSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_ui_path() -> String {
        "/swagger-ui".to_string()
    }

    fn default_spec_path() -> String {
        "/api-docs/openapi.json".to_string()
    }
}

impl Default for ApiDocsSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            ui_path: Self::default_ui_path(),
            spec_path: Self::default_spec_path(),
        }
    }
}
