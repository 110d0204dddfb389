//! Locating and loading the configuration file.

use std::path::{Path, PathBuf};

use crate::config::{BridgeConfig, ConfigError};

pub const CONFIG_FILE_NAME: &str = "console_bridge.json";

/// Directories the bridge reads its configuration from
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    pub config_dir: PathBuf,
}

impl DirectoryContext {
    /// Platform config directory (`~/.config/console-bridge` on Linux).
    /// This should only be called from `main()`.
    pub fn from_system() -> std::io::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine config directory",
                )
            })?
            .join("console-bridge");

        Ok(Self { config_dir })
    }

    /// All paths under `temp_dir`
    pub fn for_testing(temp_dir: &Path) -> Self {
        Self {
            config_dir: temp_dir.join("config"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// Load the effective configuration.
///
/// An explicit path must exist. The user config file is optional: when it is
/// missing the defaults apply.
pub fn load_config(
    explicit: Option<&Path>,
    dirs: Option<&DirectoryContext>,
) -> Result<BridgeConfig, ConfigError> {
    if let Some(path) = explicit {
        tracing::info!("Loading config from {:?}", path);
        return BridgeConfig::load_from_file(path);
    }

    let Some(dirs) = dirs else {
        return Ok(BridgeConfig::default());
    };

    let path = dirs.config_path();
    if !path.exists() {
        tracing::debug!("No config file at {:?}, using defaults", path);
        return Ok(BridgeConfig::default());
    }

    tracing::info!("Loading config from {:?}", path);
    BridgeConfig::load_from_file(&path)
}

/// Write `config` to the user config file, creating its directory
pub fn save_user_config(config: &BridgeConfig, dirs: &DirectoryContext) -> Result<(), ConfigError> {
    std::fs::create_dir_all(&dirs.config_dir).map_err(|e| ConfigError::IoError(e.to_string()))?;
    config.save_to_file(dirs.config_path())
}
