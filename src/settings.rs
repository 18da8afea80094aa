use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{IvyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// External retrieval agent: program followed by fixed arguments.
    /// Empty means not configured.
    #[serde(default)]
    pub retriever_cmd: Vec<String>,
    /// External extraction service, same shape.
    #[serde(default)]
    pub extractor_cmd: Vec<String>,
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,
    #[serde(default = "default_collaborator_max_attempts")]
    pub collaborator_max_attempts: u32,
}

fn default_collaborator_timeout_secs() -> u64 {
    30
}

fn default_collaborator_max_attempts() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            retriever_cmd: Vec::new(),
            extractor_cmd: Vec::new(),
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            collaborator_max_attempts: default_collaborator_max_attempts(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ivy")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ivy")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| IvyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    // IVY_DATA_DIR wins so scripted runs stay off the user's real dataset.
    if let Ok(dir) = std::env::var("IVY_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join("ivy.db")
}
