//! Process configuration, loaded with figment from `seace-runner.toml` and
//! the environment.

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::seace::chrome::ChromeOptions;
use crate::seace::layout::DEFAULT_SEACE_URL;
use crate::seace::session::RunSettings;

pub const CONFIG_FILE: &str = "seace-runner.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token for the export endpoint. Unset or empty disables auth.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_seace_url")]
    pub seace_url: String,
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    #[serde(default = "defaults::navigation", deserialize_with = "duration")]
    pub navigation_timeout: Duration,
    #[serde(default = "defaults::panel", deserialize_with = "duration")]
    pub panel_timeout: Duration,
    #[serde(default = "defaults::results", deserialize_with = "duration")]
    pub results_timeout: Duration,
    #[serde(default = "defaults::page", deserialize_with = "duration")]
    pub page_timeout: Duration,
    #[serde(default = "defaults::search_grace", deserialize_with = "duration")]
    pub search_grace: Duration,
    #[serde(default = "defaults::page_settle", deserialize_with = "duration")]
    pub page_settle: Duration,
    #[serde(default = "defaults::poll_interval", deserialize_with = "duration")]
    pub poll_interval: Duration,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "defaults::request", deserialize_with = "duration")]
    pub request_timeout: Duration,
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_seace_url() -> String {
    DEFAULT_SEACE_URL.to_owned()
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug")
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> u32 {
    200
}

mod defaults {
    use std::time::Duration;

    pub fn navigation() -> Duration {
        Duration::from_secs(60)
    }
    pub fn panel() -> Duration {
        Duration::from_secs(10)
    }
    pub fn results() -> Duration {
        Duration::from_secs(60)
    }
    pub fn page() -> Duration {
        Duration::from_secs(30)
    }
    pub fn search_grace() -> Duration {
        Duration::from_millis(1500)
    }
    pub fn page_settle() -> Duration {
        Duration::from_millis(500)
    }
    pub fn poll_interval() -> Duration {
        Duration::from_millis(250)
    }
    pub fn request() -> Duration {
        Duration::from_secs(15 * 60)
    }
}

/// Parse a human duration string such as `"1500ms"`, `"30s"` or `"2m"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let parsed = fundu::DurationParser::with_all_time_units()
        .parse(s.trim())
        .map_err(|e| format!("invalid duration {s:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {s:?}: {e}"))
}

/// Accepts integer seconds or a human duration string.
fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load from `seace-runner.toml` (optional) overlaid by the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::file(CONFIG_FILE)).merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        figment.extract().context("Failed to load config")
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            target_url: self.seace_url.clone(),
            navigation_timeout: self.navigation_timeout,
            panel_timeout: self.panel_timeout,
            results_timeout: self.results_timeout,
            page_timeout: self.page_timeout,
            search_grace: self.search_grace,
            page_settle: self.page_settle,
            poll_interval: self.poll_interval,
            max_pages: self.max_pages.max(1),
            debug_dir: self.debug_dir.clone(),
            ..RunSettings::default()
        }
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            executable: self.chrome_executable.clone(),
            ..ChromeOptions::default()
        }
    }
}
