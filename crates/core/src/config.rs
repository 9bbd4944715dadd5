use config::{Config, ConfigError, Environment, File, FileFormat};
use secrecy::Secret;
use serde::Deserialize;

use crate::types::{BusyPolicy, SuccessPolicy, VerificationPolicy};

/// Process configuration, layered from files and `DESKPILOT__*` variables.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub executor: ExecutorConfig,
    pub classifier: ClassifierConfig,
    pub decomposer: DecomposerConfig,
    pub capabilities: CapabilitiesConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Pause between consecutive steps so UI effects become observable.
    pub settle_delay_ms: u64,
    pub verification: VerificationPolicy,
    pub success_policy: SuccessPolicy,
}

impl ExecutorConfig {
    /// Configuration without any settling pause, for tests.
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            verification: VerificationPolicy::Strict,
            success_policy: SuccessPolicy::AnyVerified,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    /// YAML rule table replacing the built-in rules.
    pub rules_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecomposerConfig {
    /// YAML entity catalog replacing the built-in one.
    pub entities_path: Option<String>,
    /// YAML template table replacing the built-in one.
    pub templates_path: Option<String>,
    pub mailbox_url: String,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            entities_path: None,
            templates_path: None,
            mailbox_url: "https://mail.google.com".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CapabilitiesConfig {
    /// Behaviour of the automation channel under concurrent use.
    pub busy_policy: BusyPolicy,
    /// Modules registered but marked unavailable.
    pub disabled: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    /// `offline` or `openai`.
    pub provider: String,
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "offline".into(),
            endpoint: None,
            model: "gpt-4o-mini".into(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,deskpilot=debug".into(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("DESKPILOT_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map DESKPILOT__SERVER__PORT=3000 to server.port
            .add_source(Environment::with_prefix("DESKPILOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a TOML document on its own.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
