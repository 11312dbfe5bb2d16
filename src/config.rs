//! Optional config file loading. Search order: ./reddit-exporter.toml, then
//! $XDG_CONFIG_HOME/reddit-exporter/config.toml (or ~/.config/reddit-exporter/config.toml).

use crate::reddit::Endpoints;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "reddit-exporter.toml";
pub const CREDS_FILE_NAME: &str = "creds";
pub const TOKEN_FILE_NAME: &str = "token";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Root of exported data: books in `<data_dir>/books`, images in `<data_dir>/images`.
    pub data_dir: Option<PathBuf>,
    /// Directory holding the `creds` and `token` files.
    pub secrets_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Book format: epub, html, markdown, or text.
    pub format: Option<String>,
    /// 2 or 3.
    pub epub_version: Option<u8>,
    /// Set to false to skip storing comment images.
    pub export_images: Option<bool>,
    /// Extra directories that receive a copy of every book.
    pub mirror_dirs: Option<Vec<PathBuf>>,
    /// Timeout in seconds for Reddit API calls and image downloads. Unbounded when unset.
    pub timeout_secs: Option<u64>,
    pub auth_url: Option<String>,
    pub api_base_url: Option<String>,
    pub images_base_url: Option<String>,
    /// Fixed device id for the token exchange instead of the machine-derived one.
    pub device_id: Option<String>,
}

impl Config {
    /// Default endpoints with any configured overrides applied.
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::default();
        if let Some(u) = &self.auth_url {
            endpoints.auth_url = u.clone();
        }
        if let Some(u) = &self.api_base_url {
            endpoints.api_base_url = u.clone();
        }
        if let Some(u) = &self.images_base_url {
            endpoints.images_base_url = u.clone();
        }
        endpoints
    }
}

/// `~/.reddit-exporter`, or `./.reddit-exporter` when there is no home directory.
pub fn default_secrets_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reddit-exporter")
}

/// Search order: (1) ./reddit-exporter.toml, (2) $XDG_CONFIG_HOME/reddit-exporter/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("reddit-exporter").join("config.toml"));
    }
    load_config_from(&paths)
}

/// Load the first existing file of `paths`.
pub fn load_config_from(paths: &[PathBuf]) -> Result<Option<Config>, String> {
    for path in paths {
        if path.exists() {
            return read_config(path).map(Some);
        }
    }
    Ok(None)
}

fn read_config(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}
