//! Configuration loading for Varsity Plug.
//! Reads varsityplug.toml (or the path in VARSITYPLUG_CONFIG) and then applies
//! environment overrides, including anything in a local `.env` file.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder key used when nothing is configured. Refused when `debug` is off.
pub const INSECURE_DEV_SECRET: &str = "varsityplug-insecure-dev-key-only";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("SECRET_KEY must be set when DEBUG is off")]
    InsecureSecret,
}

#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub chat: ChatConfig,
    pub verification: VerificationConfig,
    secret_key: SecretString,
    chat_api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "bool_true")]
    pub debug: bool,
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
}

fn default_bind_addr()     -> String      { "127.0.0.1:8000".to_string() }
fn default_allowed_hosts() -> Vec<String> { vec!["localhost".to_string(), "127.0.0.1".to_string()] }
fn default_media_root()    -> PathBuf     { PathBuf::from("media") }
fn default_static_root()   -> PathBuf     { PathBuf::from("static") }
fn bool_true()             -> bool        { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            debug: true,
            allowed_hosts: default_allowed_hosts(),
            media_root: default_media_root(),
            static_root: default_static_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url()    -> String { "sqlite://varsityplug.db?mode=rwc".to_string() }
fn default_max_connections() -> u32    { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url(), max_connections: default_max_connections() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Two weeks, matching the cookie age the product has always used.
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_session_ttl() -> i64    { 336 }
fn default_cookie_name() -> String { "vp_session".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: default_session_ttl(), cookie_name: default_cookie_name() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_rpm")]
    pub rate_limit_per_minute: u32,
}

fn default_chat_base_url()    -> String { "https://api.openai.com/v1".to_string() }
fn default_chat_model()       -> String { "gpt-3.5-turbo".to_string() }
fn default_chat_max_tokens()  -> u32    { 150 }
fn default_chat_temperature() -> f32    { 0.6 }
fn default_chat_rpm()         -> u32    { 10 }

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            max_tokens: default_chat_max_tokens(),
            temperature: default_chat_temperature(),
            rate_limit_per_minute: default_chat_rpm(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Hours after upload before an unverified document counts as verified.
    /// Zero turns the fallback off.
    #[serde(default = "default_auto_verify_hours")]
    pub auto_verify_hours: u32,
}

fn default_auto_verify_hours() -> u32 { 24 }

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { auto_verify_hours: default_auto_verify_hours() }
    }
}

/// On-disk layout. Secrets are read here as plain strings and wrapped
/// straight away; this type never leaves the crate.
#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    chat: ChatConfig,
    #[serde(default)]
    verification: VerificationConfig,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    chat_api_key: Option<String>,
}


impl Config {
    /// Load configuration from varsityplug.toml plus the environment.
    /// Checks VARSITYPLUG_CONFIG first, then the current directory. A missing
    /// file is fine; every setting has a default or an env override.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }

        let path = std::env::var("VARSITYPLUG_CONFIG")
            .unwrap_or_else(|_| "varsityplug.toml".to_string());

        let contents = if Path::new(&path).exists() {
            Some(std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path: path.clone(), source })?)
        } else {
            None
        };

        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a config from optional TOML text and an environment lookup.
    pub fn from_sources<F>(toml_text: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut file: FileConfig = match toml_text {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };

        if let Some(v) = env("DEBUG") {
            file.server.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = env("ALLOWED_HOSTS") {
            file.server.allowed_hosts = v
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Some(v) = env("BIND_ADDR")    { file.server.bind_addr = v; }
        if let Some(v) = env("MEDIA_ROOT")   { file.server.media_root = PathBuf::from(v); }
        if let Some(v) = env("DATABASE_URL") { file.database.url = v; }
        if let Some(v) = env("SESSION_TTL_HOURS") {
            file.session.ttl_hours = parse_num("SESSION_TTL_HOURS", &v)?;
        }
        if let Some(v) = env("OPENAI_BASE_URL") { file.chat.base_url = v; }
        if let Some(v) = env("OPENAI_MODEL")    { file.chat.model = v; }
        if let Some(v) = env("CHAT_RATE_LIMIT_PER_MINUTE") {
            file.chat.rate_limit_per_minute = parse_num("CHAT_RATE_LIMIT_PER_MINUTE", &v)?;
        }
        if let Some(v) = env("AUTO_VERIFY_HOURS") {
            file.verification.auto_verify_hours = parse_num("AUTO_VERIFY_HOURS", &v)?;
        }

        let secret = env("SECRET_KEY")
            .or(file.secret_key.take())
            .filter(|s| !s.is_empty());
        let secret = match secret {
            Some(s) => s,
            None if file.server.debug => INSECURE_DEV_SECRET.to_string(),
            None => return Err(ConfigError::InsecureSecret),
        };
        if !file.server.debug && secret == INSECURE_DEV_SECRET {
            return Err(ConfigError::InsecureSecret);
        }

        let chat_api_key = env("OPENAI_API_KEY")
            .or(file.chat_api_key.take())
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        Ok(Self {
            server: file.server,
            database: file.database,
            session: file.session,
            chat: file.chat,
            verification: file.verification,
            secret_key: SecretString::from(secret),
            chat_api_key,
        })
    }

    /// Defaults with an in-memory database; used by tests and local tooling.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1 },
            session: SessionConfig::default(),
            chat: ChatConfig::default(),
            verification: VerificationConfig::default(),
            secret_key: SecretString::from(INSECURE_DEV_SECRET.to_string()),
            chat_api_key: None,
        }
    }

    pub fn with_chat_api_key(mut self, key: impl Into<String>) -> Self {
        self.chat_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }

    pub fn chat_api_key(&self) -> Option<&str> {
        self.chat_api_key.as_ref().map(|k| k.expose_secret())
    }

    /// Whether `host` (optionally carrying a port) is allowed to reach the app.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let bare = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
        let bare = bare.to_ascii_lowercase();
        self.server.allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            match allowed.strip_prefix('.') {
                // `.example.com` matches the domain itself and its subdomains.
                Some(domain) => bare == domain || bare.ends_with(&allowed),
                None => allowed == "*" || allowed == bare,
            }
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: value.to_string() }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: value.to_string() })
}
