use crate::error::{Result, StudioError};
use crate::models::ModelProfile;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_PORT: u16 = 3000;

/// How prediction output is handed to the adaptation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Files,
    Urls,
    Events,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "files" | "file" => Some(OutputMode::Files),
            "urls" | "url" => Some(OutputMode::Urls),
            "events" | "stream" => Some(OutputMode::Events),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Files => "files",
            OutputMode::Urls => "urls",
            OutputMode::Events => "events",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub model: Option<String>,
    pub profile: ModelProfile,
    pub output_mode: OutputMode,
    pub wait_seconds: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub state_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub replicate: ReplicateConfig,
    pub storage: StorageConfig,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: None,
            profile: ModelProfile::Seedream,
            output_mode: OutputMode::Files,
            wait_seconds: 60,
            poll_interval_ms: 1000,
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_token = non_empty_env("REPLICATE_API_TOKEN");
        let api_base = non_empty_env("REPLICATE_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty_env("REPLICATE_MODEL");
        let profile = non_empty_env("REPLICATE_PROFILE")
            .and_then(|p| ModelProfile::parse(&p))
            .or_else(|| model.as_deref().map(ModelProfile::infer_from_model))
            .unwrap_or(ModelProfile::Seedream);
        let output_mode = non_empty_env("REPLICATE_OUTPUT_MODE")
            .and_then(|m| OutputMode::parse(&m))
            .unwrap_or(OutputMode::Files);
        let wait_seconds = env::var("REPLICATE_WAIT_SECONDS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(60)
            .clamp(1, 60);
        let poll_interval_ms = env::var("REPLICATE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(1000)
            .clamp(200, 5000);

        ReplicateConfig {
            api_token,
            api_base,
            model,
            profile,
            output_mode,
            wait_seconds,
            poll_interval_ms,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.profile.default_model())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let host = non_empty_env("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        ServerConfig { host, port }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            state_path: PathBuf::from("studio-state.json"),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        non_empty_env("STUDIO_STATE_PATH")
            .map(|path| StorageConfig {
                state_path: PathBuf::from(path),
            })
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            replicate: ReplicateConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            server: ServerConfig::from_env(),
            replicate: ReplicateConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.replicate.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(StudioError::ConfigError(
                "Missing REPLICATE_API_TOKEN environment variable".into(),
            )),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
