//! Pipeline configuration.
//!
//! Settings loaded from an INI file. Defaults are safe to start with, a
//! missing file or missing keys keep them.
//!
//! # Configuration File Format
//!
//! ```ini
//! [pipeline]
//! sanitize = true
//! worlds = events, ui
//! ```
//!
//! - `sanitize` turns the empty-entity check after every lifecycle call on or
//!   off. Builds without the `sanitize` feature never check.
//! - `worlds` lists the named worlds a pipeline creates on startup, next to
//!   the default world.

use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

const DEFAULT_SANITIZE: bool = true;
const DEFAULT_CONFIG_PATH: &str = "./pipeline.ini";

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Check for empty entities after every lifecycle call.
    pub sanitize: bool,
    /// Named worlds to create next to the default world.
    pub worlds: Vec<String>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            sanitize: DEFAULT_SANITIZE,
            worlds: Vec::new(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration reading from a custom file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Builder method to add a named world.
    pub fn with_world(mut self, name: impl Into<String>) -> Self {
        self.add_world(name);
        self
    }

    /// Adds a named world, ignoring duplicates and empty names.
    pub fn add_world(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() {
            warn!("Ignoring empty world name in pipeline config");
            return;
        }
        if !self.worlds.contains(&name) {
            self.worlds.push(name);
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        match config.getbool("pipeline", "sanitize") {
            Ok(Some(sanitize)) => self.sanitize = sanitize,
            Ok(None) => {}
            Err(e) => warn!("Ignoring pipeline.sanitize: {}", e),
        }

        if let Some(worlds) = config.get("pipeline", "worlds") {
            for name in worlds.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                self.add_world(name);
            }
        }

        info!(
            "Loaded config: sanitize={}, worlds={:?}",
            self.sanitize, self.worlds
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("pipeline", "sanitize", Some(self.sanitize.to_string()));
        config.set("pipeline", "worlds", Some(self.worlds.join(", ")));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
