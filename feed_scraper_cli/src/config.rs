use crate::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::browser::BrowserSettings;
use crate::error::ConfigError;
use crate::scraper::{ScrapeSettings, DEFAULT_MIN_LENGTH};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_FEED_URL: &str = "https://twitter.com/home";
pub const DEFAULT_SECRETS_PATH: &str = ".secrets/secrets.toml";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub scrape: ScrapeSettings,
    pub browser: BrowserSettings,
    /// Scrape saved HTML frames from this directory instead of a browser.
    pub replay_dir: Option<PathBuf>,
    pub model: String,
    pub base_url: String,
    pub secrets_path: PathBuf,
    pub server_addr: String,
    pub client_url: Option<String>,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut scrape = ScrapeSettings::default();
        if let Some(selector) = get("FEED_SELECTOR") {
            scrape.selector = selector;
        }
        scrape.min_length = parse_number("FEED_MIN_LENGTH", get("FEED_MIN_LENGTH"))?
            .unwrap_or(DEFAULT_MIN_LENGTH as u64) as usize;
        if let Some(secs) = parse_number("FEED_DURATION_SECS", get("FEED_DURATION_SECS"))? {
            scrape.duration = Duration::from_secs(secs);
        }

        let browser = BrowserSettings {
            headless: parse_bool("CHROME_HEADLESS", get("CHROME_HEADLESS"))?.unwrap_or(false),
            profile_dir: get("CHROME_PROFILE_DIR").map(PathBuf::from),
            executable: get("CHROME_EXECUTABLE").map(PathBuf::from),
            ..BrowserSettings::default()
        };

        Ok(Self {
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            scrape,
            browser,
            replay_dir: get("FEED_REPLAY_DIR").map(PathBuf::from),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            secrets_path: get("FEED_SECRETS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH)),
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            client_url: get("CLIENT_URL"),
        })
    }

    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_VAR).ok(), &self.secrets_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            scrape: ScrapeSettings::default(),
            browser: BrowserSettings::default(),
            replay_dir: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            client_url: None,
        }
    }
}

fn parse_number(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value: v })
        })
        .transpose()
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBool { key, value: v }),
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
struct Secrets {
    #[serde(rename = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
}

/// Reads the API key from a TOML secrets file, if the file exists.
pub fn read_secrets_file(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let secrets: Secrets = toml::from_str(&raw)?;
    Ok(secrets.openai_api_key.filter(|k| !k.trim().is_empty()))
}

/// Environment value first, then the secrets file. Unreadable secrets count
/// as absent.
pub fn resolve_api_key(env_value: Option<String>, secrets_path: &Path) -> Option<String> {
    if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
        return Some(key);
    }
    match read_secrets_file(secrets_path) {
        Ok(key) => key,
        Err(e) => {
            debug!("ignoring secrets file {:?}: {}", secrets_path, e);
            None
        }
    }
}
