//! Client settings persisted between sessions: custom tokens, the pairs
//! table filter and whether the risk warning was accepted. The transaction
//! queue is never written here.

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{Address, Token};

/// Save a serializable object to a JSON file.
pub fn save_to_file<T: Serialize>(data: &T, path: &str) -> Result<()> {
    let file =
        File::create(path).map_err(|e| anyhow!("Failed to create settings file {}: {}", path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data)
        .map_err(|e| anyhow!("Failed to write settings to {}: {}", path, e))?;
    Ok(())
}

/// Load a deserializable object from a JSON file.
pub fn load_from_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file =
        File::open(path).map_err(|e| anyhow!("Failed to open settings file {}: {}", path, e))?;
    let reader = BufReader::new(file);
    let data = serde_json::from_reader(reader)
        .map_err(|e| anyhow!("Failed to parse settings file {}: {}", path, e))?;
    Ok(data)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub custom_tokens: Vec<Token>,
    /// Pairs table filter, e.g. "all", "stable", "volatile", "staked".
    pub table_filter: String,
    pub accepted_warning: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            custom_tokens: Vec::new(),
            table_filter: "all".to_string(),
            accepted_warning: false,
        }
    }
}

impl ClientSettings {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &str) -> Self {
        if !Path::new(path).exists() {
            debug!("[settings] {} not found, using defaults", path);
            return Self::default();
        }
        match load_from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("[settings] {}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        save_to_file(self, path)
    }

    /// Returns false if a token with the same address is already listed.
    pub fn add_custom_token(&mut self, token: Token) -> bool {
        if self.custom_tokens.iter().any(|t| t.address == token.address) {
            return false;
        }
        self.custom_tokens.push(token);
        true
    }

    pub fn remove_custom_token(&mut self, address: &Address) -> bool {
        let before = self.custom_tokens.len();
        self.custom_tokens.retain(|t| &t.address != address);
        self.custom_tokens.len() != before
    }

    pub fn accept_warning(&mut self) {
        self.accepted_warning = true;
    }
}
