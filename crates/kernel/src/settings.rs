use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BLOGSMITH_ENV";
const CONFIG_DIR_ENV: &str = "BLOGSMITH_CONFIG_DIR";
const ENV_PREFIX: &str = "BLOGSMITH";

/// Well-known process variables honoured on top of the prefixed ones.
const PORT_ENV: &str = "PORT";
const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_FRONTEND_ORIGIN: &str = "https://ai-blog-generator-frontend-kes5.onrender.com";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
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

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub cors: CorsSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// prefixed environment variables and finally `PORT` / `OPENROUTER_API_KEY`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var(PORT_ENV).ok())
            .context("failed to apply PORT override")?
            .set_override_option("upstream.api_key", std::env::var(API_KEY_ENV).ok())
            .context("failed to apply OPENROUTER_API_KEY override")?;

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The environment name selected the overlay file, so it wins over any
        // `environment` key found inside the files.
        settings.environment = parsed_environment;
        settings.rate_limit.validate()?;
        if settings.upstream.timeout_ms == 0 {
            return Err(anyhow!("upstream.timeout_ms must be greater than zero"));
        }

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    /// Number of reverse proxies in front of the service whose
    /// `X-Forwarded-For` entries are trusted when identifying clients.
    #[serde(default = "ServerSettings::default_trusted_proxy_hops")]
    pub trusted_proxy_hops: usize,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_trusted_proxy_hops() -> usize {
        1
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            trusted_proxy_hops: Self::default_trusted_proxy_hops(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "CorsSettings::default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Whether requests without an `Origin` header (curl, server-to-server)
    /// are let through the origin guard.
    #[serde(default = "CorsSettings::default_allow_missing_origin")]
    pub allow_missing_origin: bool,
}

impl CorsSettings {
    fn default_allowed_origins() -> Vec<String> {
        vec![
            DEFAULT_FRONTEND_ORIGIN.to_string(),
            "http://localhost:3000".to_string(),
            "http://localhost:3001".to_string(),
        ]
    }

    fn default_allow_missing_origin() -> bool {
        true
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: Self::default_allowed_origins(),
            allow_missing_origin: Self::default_allow_missing_origin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "RateLimitSettings::default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "RateLimitSettings::default_max_requests")]
    pub max_requests: u32,
}

impl RateLimitSettings {
    fn default_window_secs() -> u64 {
        60
    }

    fn default_max_requests() -> u32 {
        5
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.window_secs == 0 {
            return Err(anyhow!("rate_limit.window_secs must be greater than zero"));
        }
        if self.max_requests == 0 {
            return Err(anyhow!("rate_limit.max_requests must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: Self::default_window_secs(),
            max_requests: Self::default_max_requests(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct UpstreamSettings {
    #[serde(default = "UpstreamSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "UpstreamSettings::default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "UpstreamSettings::default_referer")]
    pub referer: String,
    #[serde(default = "UpstreamSettings::default_app_title")]
    pub app_title: String,
    /// Whole-call limit for one completion request, connect through body.
    #[serde(default = "UpstreamSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl UpstreamSettings {
    /// The configured credential; an empty value counts as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    fn default_base_url() -> String {
        "https://openrouter.ai/api/v1".to_string()
    }

    fn default_model() -> String {
        "openrouter/auto".to_string()
    }

    fn default_referer() -> String {
        DEFAULT_FRONTEND_ORIGIN.to_string()
    }

    fn default_app_title() -> String {
        "AI Blog Generator".to_string()
    }

    fn default_timeout_ms() -> u64 {
        60_000
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key: None,
            referer: Self::default_referer(),
            app_title: Self::default_app_title(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blogsmith_settings_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_rate_limit_is_five_per_minute() {
        let settings = Settings::default();
        assert_eq!(settings.rate_limit.window_secs, 60);
        assert_eq!(settings.rate_limit.max_requests, 5);
    }

    #[test]
    fn default_origins_include_local_frontends() {
        let cors = CorsSettings::default();
        assert_eq!(cors.allowed_origins.len(), 3);
        assert!(cors
            .allowed_origins
            .contains(&"http://localhost:3000".to_string()));
        assert!(cors.allow_missing_origin);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert!(err.to_string().contains("unsupported environment"));
    }

    #[test]
    fn environment_overlay_wins_over_base_file() {
        let dir = scratch_dir("overlay");
        std::fs::write(
            dir.join("base.toml"),
            "[upstream]\nmodel = \"base/model\"\n\n[rate_limit]\nmax_requests = 7\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("staging.toml"),
            "[upstream]\nmodel = \"staging/model\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&dir, "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.upstream.model, "staging/model");
        assert_eq!(settings.rate_limit.max_requests, 7);
        assert_eq!(settings.rate_limit.window_secs, 60);
    }

    #[test]
    fn zero_rate_limit_window_fails_to_load() {
        let dir = scratch_dir("zero_window");
        std::fs::write(dir.join("base.toml"), "[rate_limit]\nwindow_secs = 0\n").unwrap();

        let err = Settings::load_from(&dir, "local").unwrap_err();
        assert!(format!("{:#}", err).contains("window_secs"));
    }

    #[test]
    fn zero_upstream_timeout_is_rejected() {
        let dir = scratch_dir("zero_timeout");
        std::fs::write(dir.join("base.toml"), "[upstream]\ntimeout_ms = 0\n").unwrap();

        let err = Settings::load_from(&dir, "local").unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_ms"));
    }

    #[test]
    fn empty_api_key_counts_as_unset() {
        let mut upstream = UpstreamSettings {
            api_key: Some(String::new()),
            ..UpstreamSettings::default()
        };
        assert_eq!(upstream.api_key(), None);

        upstream.api_key = Some("sk-live".to_string());
        assert_eq!(upstream.api_key(), Some("sk-live"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let upstream = UpstreamSettings {
            api_key: Some("sk-secret".to_string()),
            ..UpstreamSettings::default()
        };
        let rendered = format!("{:?}", upstream);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
