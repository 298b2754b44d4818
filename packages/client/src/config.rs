//! Command-line arguments and endpoint resolution.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Parser, Debug)]
#[command(name = "niwot-client")]
#[command(about = "Terminal client for the Niwot multiplayer quiz", long_about = None)]
pub struct Args {
    /// Base URL of the REST API
    #[arg(long, env = "NIWOT_API_BASE")]
    pub api_base: Option<String>,

    /// URL of the WebSocket event channel
    #[arg(long, env = "NIWOT_WS_BASE")]
    pub ws_base: Option<String>,

    /// JSON file with `API_BASE` / `WS_BASE`, used when neither flag nor environment is set
    #[arg(short = 'c', long, default_value = "config.json")]
    pub config: PathBuf,

    #[arg(short = 'e', long, env = "NIWOT_EMAIL")]
    pub email: String,

    #[arg(short = 'p', long, env = "NIWOT_PASSWORD")]
    pub password: String,

    /// Create an account with this username instead of logging in
    #[arg(long)]
    pub register: Option<String>,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Optional endpoint file.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(rename = "API_BASE")]
    pub api_base: Option<String>,
    #[serde(rename = "WS_BASE")]
    pub ws_base: Option<String>,
}

impl FileConfig {
    /// Read the file. A missing file is not an error; a malformed one is logged and ignored.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("No config file at {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring malformed config file {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub ws_base: String,
}

fn pick(flag: Option<String>, file: Option<String>) -> String {
    flag.filter(|v| !v.trim().is_empty())
        .or(file)
        .unwrap_or_default()
        .trim()
        .trim_end_matches('/')
        .to_string()
}

impl Endpoints {
    /// Flag or environment first (clap merges both), then the file.
    pub fn resolve(
        api_base: Option<String>,
        ws_base: Option<String>,
        file: Option<FileConfig>,
    ) -> Result<Self, ClientError> {
        let file = file.unwrap_or_default();
        let endpoints = Self {
            api_base: pick(api_base, file.api_base),
            ws_base: pick(ws_base, file.ws_base),
        };
        if endpoints.api_base.is_empty() {
            return Err(ClientError::NotConfigured("API_BASE is not set".to_string()));
        }
        if endpoints.ws_base.is_empty() {
            return Err(ClientError::NotConfigured("WS_BASE is not set".to_string()));
        }
        Ok(endpoints)
    }
}

impl Args {
    pub fn endpoints(&self) -> Result<Endpoints, ClientError> {
        Endpoints::resolve(
            self.api_base.clone(),
            self.ws_base.clone(),
            FileConfig::load(&self.config),
        )
    }
}
