use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

/// Environment variable that overrides `provider.name`.
pub const PROVIDER_ENV: &str = "PROVIDER";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TangleConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    /// `groq`, `openai` or `mock`. Anything else runs in mock mode.
    pub name: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Overrides the provider's usual API key variable.
    pub api_key_env: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "groq".to_string(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: 0.3,
            max_tokens: 700,
            timeout_seconds: 30,
        }
    }
}

impl TangleConfig {
    /// Load defaults, then `path` if it exists, then `TANGLE__*` variables,
    /// then `PROVIDER`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`TangleConfig::load`], reading variables from `vars` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: &str,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let provider_override = match &vars {
            Some(vars) => vars.get(PROVIDER_ENV).cloned(),
            None => std::env::var(PROVIDER_ENV).ok(),
        };

        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TANGLE")
                    .prefix_separator("__")
                    .separator("__")
                    .source(vars),
            )
            .build()?;
        let mut config: TangleConfig = s.try_deserialize()?;

        if let Some(name) = provider_override {
            if !name.trim().is_empty() {
                config.provider.name = name.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "provider.timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}
