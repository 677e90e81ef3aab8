use crate::error::Result;
use lazy_static::lazy_static;
use log::warn;
use parking_lot::RwLock;
use std::env;
use std::path::Path;
use std::time::Duration;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

/// Default interval between two continuity-error log lines for one PID.
pub const DEFAULT_CC_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    /// ISO 639-2 codes in order of preference, used when ordering audio and
    /// subtitle components.
    pub preferred_languages: Vec<String>,
    /// Minimum spacing of continuity-error warnings per stream.
    pub cc_log_interval: Duration,
}

impl Config {
    fn new() -> Self {
        let mut config = Config {
            preferred_languages: Vec::new(),
            cc_log_interval: DEFAULT_CC_LOG_INTERVAL,
        };

        if let Ok(langs) = env::var("ESSET_LANGUAGES") {
            config.preferred_languages = parse_languages(&langs);
        }
        if let Ok(ms) = env::var("ESSET_CC_LOG_INTERVAL_MS") {
            if let Ok(ms) = ms.trim().parse::<u64>() {
                config.cc_log_interval = Duration::from_millis(ms);
            }
        }

        let config_paths = ["./config.toml", "./esset_config.toml"];
        for path in &config_paths {
            if !Path::new(path).exists() {
                continue;
            }
            if let Err(e) = config.apply_path(path) {
                warn!("Failed to read config file {}: {}", path, e);
            }
        }

        config
    }

    /// Applies `key = value` lines from a config file on top of `self`.
    /// Unknown keys and malformed values are skipped.
    pub fn apply_file(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key.trim() {
                "languages" => {
                    let langs = parse_languages(value);
                    if !langs.is_empty() {
                        self.preferred_languages = langs;
                    }
                }
                "cc_log_interval_ms" => {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.cc_log_interval = Duration::from_millis(ms);
                    }
                }
                _ => {}
            }
        }
    }

    /// Reads a config file and applies it on top of `self`.
    pub fn apply_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.apply_file(&content);
        Ok(())
    }

    pub fn reload() {
        let new_config = Config::new();
        *CONFIG.write() = new_config;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_languages: Vec::new(),
            cc_log_interval: DEFAULT_CC_LOG_INTERVAL,
        }
    }
}

fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|l| l.len() == 3)
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Returns the preferred language list from configuration
pub fn get_preferred_languages() -> Vec<String> {
    CONFIG.read().preferred_languages.clone()
}

/// Returns the continuity-error log interval from configuration
pub fn get_cc_log_interval() -> Duration {
    CONFIG.read().cc_log_interval
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# ESSET Configuration
# This is a template. Replace the values with your actual configuration.

# Preferred audio/subtitle languages (ISO 639-2), most preferred first
languages = "eng,ger"

# Minimum milliseconds between continuity-error warnings of one stream
cc_log_interval_ms = 10000
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
