use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::{Context, OptionExt};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = r#"[connectors.spotify]
# access_token = ""          # falls back to SPOTIFY_ACCESS_TOKEN
requests_per_second = 5

[connectors.tidal]
# access_token = ""          # falls back to TIDAL_ACCESS_TOKEN
country_code = "US"
requests_per_second = 2

[telemetry]
# otlp_endpoint = "http://localhost:4317"
"#;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connectors: ConnectorsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    #[serde(default)]
    pub spotify: Option<SpotifyConfig>,
    #[serde(default)]
    pub tidal: Option<TidalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_spotify_rate")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_tidal_rate")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_spotify_rate() -> u32 {
    5
}

fn default_tidal_rate() -> u32 {
    2
}

fn default_country_code() -> String {
    "US".to_string()
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            requests_per_second: default_spotify_rate(),
        }
    }
}

impl Default for TidalConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            country_code: default_country_code(),
            requests_per_second: default_tidal_rate(),
        }
    }
}

impl SpotifyConfig {
    pub fn access_token(&self) -> Result<&str> {
        non_empty(self.access_token.as_deref()).ok_or_eyre(
            "No Spotify access token. Set connectors.spotify.access_token or SPOTIFY_ACCESS_TOKEN",
        )
    }
}

impl TidalConfig {
    pub fn access_token(&self) -> Result<&str> {
        non_empty(self.access_token.as_deref()).ok_or_eyre(
            "No TIDAL access token. Set connectors.tidal.access_token or TIDAL_ACCESS_TOKEN",
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `<config dir>/playlist-mirror/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-mirror").join("config.toml"))
    }

    /// The file to load: `explicit` if given, else the default location when it exists. `None`
    /// means run on defaults, since every setting can come from the environment.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().filter(|path| path.exists()),
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Write the default config unless a file is already there. Returns `false` in that case.
    pub fn create_default_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, DEFAULT_CONFIG)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(true)
    }

    /// Spotify settings, with the access token falling back to `SPOTIFY_ACCESS_TOKEN`
    pub fn spotify_config(&self) -> SpotifyConfig {
        let mut config = self.connectors.spotify.clone().unwrap_or_default();
        if non_empty(config.access_token.as_deref()).is_none() {
            config.access_token = std::env::var("SPOTIFY_ACCESS_TOKEN").ok();
        }
        config
    }

    /// TIDAL settings, with the access token falling back to `TIDAL_ACCESS_TOKEN`
    pub fn tidal_config(&self) -> TidalConfig {
        let mut config = self.connectors.tidal.clone().unwrap_or_default();
        if non_empty(config.access_token.as_deref()).is_none() {
            config.access_token = std::env::var("TIDAL_ACCESS_TOKEN").ok();
        }
        config
    }
}
