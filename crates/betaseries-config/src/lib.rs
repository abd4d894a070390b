//! Shared configuration for BetaSeries tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `betaseries_api::ClientConfig`. The CLI layers its own
//! flag overrides on top.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use betaseries_api::client::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use betaseries_api::{ClientConfig, TransportConfig};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

const KEYRING_SERVICE: &str = "betaseries";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no client key configured for profile '{profile}'")]
    NoClientKey { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named API profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(key, profile)| (key.as_str(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            timeout: default_timeout(),
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.into()
}
fn default_timeout() -> u64 {
    30
}

/// A named API profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API root (defaults to the public API).
    pub api_url: Option<String>,

    /// Override the API version header.
    pub api_version: Option<String>,

    /// Client key (plaintext, prefer keyring or env var).
    pub client_key: Option<String>,

    /// Environment variable name containing the client key.
    pub client_key_env: Option<String>,

    /// Member token (plaintext, prefer keyring).
    pub token: Option<String>,

    /// Environment variable name containing the member token.
    pub token_env: Option<String>,

    /// Entry point of the delegated authentication flow.
    pub auth_url: Option<String>,

    /// Whether requests are made on behalf of a logged-in member.
    #[serde(default)]
    pub identified_user: bool,

    /// Give up on the authentication flow after this many seconds.
    pub auth_timeout: Option<u64>,

    /// Override HTTP timeout.
    pub timeout: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Profile {
    /// `None` waits for the authentication flow indefinitely.
    pub fn auth_timeout(&self) -> Option<Duration> {
        self.auth_timeout.map(Duration::from_secs)
    }

    pub fn auth_url(&self) -> Result<Option<Url>, ConfigError> {
        self.auth_url
            .as_deref()
            .map(|raw| parse_url("auth_url", raw))
            .transpose()
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "betaseries", "betaseries").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("betaseries");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn base_figment() -> Figment {
    Figment::new().merge(Serialized::defaults(Config::default()))
}

/// Load the full Config from file + environment.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `BETASERIES_DEFAULTS__TIMEOUT=10`.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();
    debug!(path = %path.display(), "loading config");

    let figment = base_figment()
        .merge(Toml::file(&path))
        .merge(Env::prefixed("BETASERIES_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Parse a TOML document on top of the defaults.
pub fn parse_config(toml_src: &str) -> Result<Config, ConfigError> {
    Ok(base_figment().merge(Toml::string(toml_src)).extract()?)
}

// ── Config rendering ────────────────────────────────────────────────

const REDACTED: &str = "********";

/// Render the config as TOML with plaintext secrets masked.
pub fn render_redacted(cfg: &Config) -> Result<String, ConfigError> {
    let mut profiles = cfg.profiles.clone();
    for profile in profiles.values_mut() {
        if profile.client_key.is_some() {
            profile.client_key = Some(REDACTED.into());
        }
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
    let masked = Config {
        default_profile: cfg.default_profile.clone(),
        defaults: cfg.defaults.clone(),
        profiles,
    };
    Ok(toml::to_string_pretty(&masked)?)
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str, item: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{item}"),
    )?)
}

fn keyring_secret(profile_name: &str, item: &str) -> Option<String> {
    keyring_entry(profile_name, item)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// Resolve the client key: env var, then keyring, then plaintext.
pub fn resolve_client_key(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    if let Some(val) = profile
        .client_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(val);
    }

    if let Some(secret) = keyring_secret(profile_name, "client-key") {
        return Ok(secret);
    }

    profile
        .client_key
        .clone()
        .ok_or_else(|| ConfigError::NoClientKey {
            profile: profile_name.into(),
        })
}

/// Resolve the member token: env var, then keyring, then plaintext.
///
/// An empty token is valid; the first rejected request triggers the
/// authentication flow.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> SecretString {
    if let Some(val) = profile
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return SecretString::from(val);
    }

    if let Some(secret) = keyring_secret(profile_name, "token") {
        return SecretString::from(secret);
    }

    SecretString::from(profile.token.clone().unwrap_or_default())
}

/// Persist a refreshed token in the system keyring.
pub fn store_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "token")?.set_password(token.expose_secret())?;
    debug!(profile = profile_name, "token stored in keyring");
    Ok(())
}

/// Build a `ClientConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let base_url = parse_url(
        "api_url",
        profile.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
    )?;
    let client_key = resolve_client_key(profile, profile_name)?;

    let transport = TransportConfig {
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        ca_cert: profile.ca_cert.clone(),
        ..TransportConfig::default()
    };

    let mut config = ClientConfig::new(base_url, client_key)
        .with_token(resolve_token(profile, profile_name))
        .with_identified_user(profile.identified_user);
    config.api_version = profile
        .api_version
        .clone()
        .unwrap_or_else(|| defaults.api_version.clone());
    config.transport = transport;
    Ok(config)
}
