use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::compare::DEFAULT_API_CALL_BUDGET;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub estimator: EstimatorConfig,
    pub geocoder: GeocoderConfig,
    pub llm: LlmConfig,
    pub suppliers: SuppliersConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct EstimatorConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_call_budget: u32,
    pub cache_capacity: usize,
}

#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SuppliersConfig {
    pub data_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    OpenRouter,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub estimator_api_key: Option<String>,
    pub estimator_base_url: Option<String>,
    pub estimator_api_call_budget: Option<u32>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub suppliers_data_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig {
                api_key: String::new().into(),
                base_url: "https://www.carboninterface.com/api/v1/estimates".to_string(),
                timeout_secs: 8,
                api_call_budget: DEFAULT_API_CALL_BUDGET,
                cache_capacity: DEFAULT_CACHE_CAPACITY,
            },
            geocoder: GeocoderConfig {
                base_url: "https://nominatim.openstreetmap.org".to_string(),
                user_agent: "freightprint-distance-resolver".to_string(),
                timeout_secs: 8,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_tokens: 500,
                temperature: 0.3,
            },
            suppliers: SuppliersConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|openrouter|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("freightprint.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(estimator) = patch.estimator {
            if let Some(estimator_api_key_value) = estimator.api_key {
                self.estimator.api_key = secret_value(estimator_api_key_value);
            }
            if let Some(base_url) = estimator.base_url {
                self.estimator.base_url = base_url;
            }
            if let Some(timeout_secs) = estimator.timeout_secs {
                self.estimator.timeout_secs = timeout_secs;
            }
            if let Some(api_call_budget) = estimator.api_call_budget {
                self.estimator.api_call_budget = api_call_budget;
            }
            if let Some(cache_capacity) = estimator.cache_capacity {
                self.estimator.cache_capacity = cache_capacity;
            }
        }

        if let Some(geocoder) = patch.geocoder {
            if let Some(base_url) = geocoder.base_url {
                self.geocoder.base_url = base_url;
            }
            if let Some(user_agent) = geocoder.user_agent {
                self.geocoder.user_agent = user_agent;
            }
            if let Some(timeout_secs) = geocoder.timeout_secs {
                self.geocoder.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(suppliers) = patch.suppliers {
            if let Some(data_path) = suppliers.data_path {
                self.suppliers.data_path = Some(data_path);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FREIGHTPRINT_ESTIMATOR_API_KEY") {
            self.estimator.api_key = secret_value(value);
        }
        if let Some(value) = read_env("FREIGHTPRINT_ESTIMATOR_BASE_URL") {
            self.estimator.base_url = value;
        }
        if let Some(value) = read_env("FREIGHTPRINT_ESTIMATOR_TIMEOUT_SECS") {
            self.estimator.timeout_secs =
                parse_u64("FREIGHTPRINT_ESTIMATOR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FREIGHTPRINT_ESTIMATOR_API_CALL_BUDGET") {
            self.estimator.api_call_budget =
                parse_u32("FREIGHTPRINT_ESTIMATOR_API_CALL_BUDGET", &value)?;
        }
        if let Some(value) = read_env("FREIGHTPRINT_ESTIMATOR_CACHE_CAPACITY") {
            self.estimator.cache_capacity =
                parse_u32("FREIGHTPRINT_ESTIMATOR_CACHE_CAPACITY", &value)? as usize;
        }

        if let Some(value) = read_env("FREIGHTPRINT_GEOCODER_BASE_URL") {
            self.geocoder.base_url = value;
        }
        if let Some(value) = read_env("FREIGHTPRINT_GEOCODER_USER_AGENT") {
            self.geocoder.user_agent = value;
        }
        if let Some(value) = read_env("FREIGHTPRINT_GEOCODER_TIMEOUT_SECS") {
            self.geocoder.timeout_secs = parse_u64("FREIGHTPRINT_GEOCODER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FREIGHTPRINT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("FREIGHTPRINT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FREIGHTPRINT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("FREIGHTPRINT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("FREIGHTPRINT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("FREIGHTPRINT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FREIGHTPRINT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("FREIGHTPRINT_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("FREIGHTPRINT_SUPPLIERS_DATA_PATH") {
            self.suppliers.data_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("FREIGHTPRINT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FREIGHTPRINT_SERVER_PORT") {
            self.server.port = parse_u16("FREIGHTPRINT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("FREIGHTPRINT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("FREIGHTPRINT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("FREIGHTPRINT_LOGGING_LEVEL").or_else(|| read_env("FREIGHTPRINT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FREIGHTPRINT_LOGGING_FORMAT").or_else(|| read_env("FREIGHTPRINT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(estimator_api_key) = overrides.estimator_api_key {
            self.estimator.api_key = secret_value(estimator_api_key);
        }
        if let Some(estimator_base_url) = overrides.estimator_base_url {
            self.estimator.base_url = estimator_base_url;
        }
        if let Some(api_call_budget) = overrides.estimator_api_call_budget {
            self.estimator.api_call_budget = api_call_budget;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(data_path) = overrides.suppliers_data_path {
            self.suppliers.data_path = Some(data_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_estimator(&self.estimator)?;
        validate_geocoder(&self.geocoder)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("freightprint.toml"), PathBuf::from("config/freightprint.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_estimator(estimator: &EstimatorConfig) -> Result<(), ConfigError> {
    if estimator.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "estimator.api_key is required. Create one at https://www.carboninterface.com/account/api_credentials".to_string()
        ));
    }

    if !estimator.base_url.starts_with("http://") && !estimator.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "estimator.base_url must start with http:// or https://".to_string(),
        ));
    }

    if estimator.timeout_secs == 0 || estimator.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "estimator.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if estimator.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "estimator.cache_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_geocoder(geocoder: &GeocoderConfig) -> Result<(), ConfigError> {
    if !geocoder.base_url.starts_with("http://") && !geocoder.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "geocoder.base_url must start with http:// or https://".to_string(),
        ));
    }

    if geocoder.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "geocoder.user_agent is required; the public geocoding service rejects anonymous clients".to_string()
        ));
    }

    if geocoder.timeout_secs == 0 || geocoder.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "geocoder.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::OpenRouter => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/openrouter providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    estimator: Option<EstimatorPatch>,
    geocoder: Option<GeocoderPatch>,
    llm: Option<LlmPatch>,
    suppliers: Option<SuppliersPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EstimatorPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    api_call_budget: Option<u32>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocoderPatch {
    base_url: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct SuppliersPatch {
    data_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ESTIMATOR_API_KEY", "ci-key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("freightprint.toml");
            fs::write(
                &path,
                r#"
[estimator]
api_key = "${TEST_ESTIMATOR_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.estimator.api_key.expose_secret() == "ci-key-from-env",
                "estimator api key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ESTIMATOR_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FREIGHTPRINT_ESTIMATOR_API_KEY", "ci-test-key");
        env::set_var("FREIGHTPRINT_LOG_LEVEL", "warn");
        env::set_var("FREIGHTPRINT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "FREIGHTPRINT_ESTIMATOR_API_KEY",
            "FREIGHTPRINT_LOG_LEVEL",
            "FREIGHTPRINT_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FREIGHTPRINT_ESTIMATOR_API_KEY", "key-from-env");
        env::set_var("FREIGHTPRINT_ESTIMATOR_BASE_URL", "https://estimates.from-env.test");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("freightprint.toml");
            fs::write(
                &path,
                r#"
[estimator]
api_key = "key-from-file"
base_url = "https://estimates.from-file.test"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    estimator_base_url: Some("https://estimates.from-override.test".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.estimator.base_url == "https://estimates.from-override.test",
                "override base url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.estimator.api_key.expose_secret() == "key-from-env",
                "env api key should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["FREIGHTPRINT_ESTIMATOR_API_KEY", "FREIGHTPRINT_ESTIMATOR_BASE_URL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("estimator.api_key")
            );
            ensure(has_message, "validation failure should mention estimator.api_key")
        })();

        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FREIGHTPRINT_ESTIMATOR_API_KEY", "ci-secret-value");
        env::set_var("FREIGHTPRINT_LLM_API_KEY", "llm-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("ci-secret-value"),
                "debug output should not contain estimator api key",
            )?;
            ensure(
                !debug.contains("llm-secret-value"),
                "debug output should not contain llm api key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["FREIGHTPRINT_ESTIMATOR_API_KEY", "FREIGHTPRINT_LLM_API_KEY"]);
        result
    }

    #[test]
    fn invalid_budget_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FREIGHTPRINT_ESTIMATOR_API_KEY", "ci-test-key");
        env::set_var("FREIGHTPRINT_ESTIMATOR_API_CALL_BUDGET", "lots");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "FREIGHTPRINT_ESTIMATOR_API_CALL_BUDGET"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&[
            "FREIGHTPRINT_ESTIMATOR_API_KEY",
            "FREIGHTPRINT_ESTIMATOR_API_CALL_BUDGET",
        ]);
        result
    }
}
