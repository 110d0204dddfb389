use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::SurfaceOptions;
use crate::services::encoding::TextEncoding;
use crate::services::process::{IoMode, SpawnSpec};

/// Console bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BridgeConfig {
    /// Shell executable. `$VAR`, `${VAR}` and (on Windows) `%VAR%` are expanded.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Extra arguments passed to the shell
    #[serde(default)]
    pub shell_args: Vec<String>,

    /// Appended to the shell's PATH. The parent environment is left untouched.
    #[serde(default = "default_custom_path")]
    pub custom_path: String,

    /// Extra environment variables for the shell
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for the shell (inherited when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Echo a `[cwd]$ command` line before each command (ignored on Windows)
    #[serde(default = "default_add_prompt")]
    pub add_prompt: bool,

    /// Text encoding of the shell's input and output (e.g. `utf8`, `cp866`)
    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default = "default_font_size")]
    pub font_size: u16,

    #[serde(default = "default_false")]
    pub show_line_numbers: bool,

    /// Space separated commands that close the console instead of being sent
    #[serde(default = "default_close_cmds")]
    pub close_cmds: String,

    /// Regex matched against the last transcript line. While it matches, the
    /// prompt echo is suppressed so password input is not echoed back.
    #[serde(default = "default_password_prompt_pattern")]
    pub password_prompt_pattern: String,

    /// How the output pipe is read
    #[serde(default)]
    pub io_mode: IoModeSetting,

    /// Flush period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Pause before each drain, letting the reader catch up
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Reader pause between empty polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for draining output while shutting down
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IoModeSetting {
    /// Poll on Windows, blocking reads elsewhere
    #[default]
    Auto,
    Blocking,
    Poll,
}

impl IoModeSetting {
    pub fn resolve(self) -> IoMode {
        match self {
            IoModeSetting::Auto => IoMode::detect(),
            IoModeSetting::Blocking => IoMode::BlockingStream,
            IoModeSetting::Poll => IoMode::PollSeek,
        }
    }
}

fn default_shell_path() -> String {
    if cfg!(windows) {
        r"%windir%\system32\cmd".to_string()
    } else {
        "bash".to_string()
    }
}

fn default_custom_path() -> String {
    if cfg!(target_os = "macos") {
        ":/usr/local/bin:/usr/local/sbin:/opt/local/bin:/opt/local/sbin".to_string()
    } else {
        String::new()
    }
}

fn default_add_prompt() -> bool {
    !cfg!(windows)
}

fn default_encoding() -> String {
    if cfg!(windows) {
        "cp866".to_string()
    } else {
        "utf8".to_string()
    }
}

fn default_font_size() -> u16 {
    9
}

fn default_false() -> bool {
    false
}

fn default_close_cmds() -> String {
    "quit exit close".to_string()
}

fn default_password_prompt_pattern() -> String {
    r"^\[sudo\] ".to_string()
}

fn default_tick_ms() -> u64 {
    200
}

fn default_debounce_ms() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            shell_path: default_shell_path(),
            shell_args: Vec::new(),
            custom_path: default_custom_path(),
            env: BTreeMap::new(),
            working_dir: None,
            add_prompt: default_add_prompt(),
            encoding: default_encoding(),
            font_size: default_font_size(),
            show_line_numbers: default_false(),
            close_cmds: default_close_cmds(),
            password_prompt_pattern: default_password_prompt_pattern(),
            io_mode: IoModeSetting::default(),
            tick_ms: default_tick_ms(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// JSON schema describing every option
    pub fn schema_json() -> Result<String, ConfigError> {
        let schema = schemars::schema_for!(BridgeConfig);
        serde_json::to_string_pretty(&schema).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.text_encoding()?;
        self.password_prompt_regex()?;

        if self.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_ms must be greater than 0".to_string(),
            ));
        }

        if self.shell_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shell_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn text_encoding(&self) -> Result<TextEncoding, ConfigError> {
        TextEncoding::for_label(&self.encoding).ok_or_else(|| {
            ConfigError::ValidationError(format!("unknown encoding '{}'", self.encoding))
        })
    }

    pub fn password_prompt_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.password_prompt_pattern).map_err(|e| {
            ConfigError::ValidationError(format!("invalid password_prompt_pattern: {e}"))
        })
    }

    pub fn close_keywords(&self) -> Vec<String> {
        self.close_cmds
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            font_size: self.font_size,
            show_line_numbers: self.show_line_numbers,
        }
    }

    pub fn spawn_spec(&self) -> SpawnSpec {
        SpawnSpec {
            shell: self.shell_path.clone(),
            args: self.shell_args.clone(),
            extra_path: self.custom_path.clone(),
            env: self.env.clone(),
            cwd: self.working_dir.clone(),
            io_mode: self.io_mode.resolve(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
