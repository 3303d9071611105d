use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use mentor::{agent::DEFAULT_MAX_STEPS, providers::configs::OpenAiProviderConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the optional configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "mentor";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_host")]
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Replaces the built-in system prompt template
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            data_dir: default_data_dir(),
            prompt_file: None,
            request_timeout_secs: None,
        }
    }
}

impl AgentSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate(File::with_name(CONFIG_FILE).required(false))
    }

    /// Load settings using an explicit configuration file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_and_validate(File::from(path.into()).required(true))
    }

    fn load_and_validate<F>(file: F) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.temperature", 0.0)?
            // Agent defaults
            .set_default("agent.max_steps", default_max_steps() as i64)?
            .set_default("agent.data_dir", "./data")?
            .add_source(file)
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("MENTOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        if let Err(config::ConfigError::NotFound(_)) = config.get_string("provider.api_key") {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        let mut settings = match result {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .split('`')
                        .next()
                        .unwrap_or_default();
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        if settings.agent.max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_steps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        settings.agent.data_dir = expand_path("agent.data_dir", &settings.agent.data_dir)?;
        if let Some(prompt_file) = &settings.agent.prompt_file {
            settings.agent.prompt_file = Some(expand_path("agent.prompt_file", prompt_file)?);
        }

        Ok(settings)
    }
}

/// Expand `~` and environment variables in a configured path
fn expand_path(field: &str, path: &std::path::Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| ConfigError::InvalidPath {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_provider_host() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
