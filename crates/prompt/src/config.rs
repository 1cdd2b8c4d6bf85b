//! Prompt configuration
//!
//! Settings come from `~/.config/daedalos/prompt.json` when it exists,
//! then the `DAEDALOS_PROMPT_DIR` environment variable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::CompileOptions;
use crate::error::{PromptError, Result};

/// Environment variable overriding the prompts directory
pub const PROMPT_DIR_ENV: &str = "DAEDALOS_PROMPT_DIR";

/// Prompt tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding category subdirectories of templates
    pub prompts_dir: PathBuf,
    /// Normalize whitespace in compiled output unless told otherwise
    pub format_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            format_output: true,
        }
    }
}

impl Config {
    /// Config rooted at the given prompts directory, other settings default
    pub fn with_prompts_dir(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            ..Self::default()
        }
    }

    /// Load from the standard config path, then apply the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&get_config_path())?;
        config.apply_prompt_dir_override(std::env::var(PROMPT_DIR_ENV).ok());
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| PromptError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| PromptError::decode(path.display().to_string(), e))
    }

    /// Save to the standard config path
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| PromptError::io(dir, e))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| PromptError::Encode(e.to_string()))?;
        fs::write(path, content).map_err(|e| PromptError::io(path, e))
    }

    /// Use `dir` as the prompts directory when it is set and non-empty
    pub fn apply_prompt_dir_override(&mut self, dir: Option<String>) {
        if let Some(dir) = dir.filter(|d| !d.trim().is_empty()) {
            self.prompts_dir = PathBuf::from(dir);
        }
    }

    /// Compile options implied by this config
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            format: self.format_output,
        }
    }
}

/// Get the config directory path
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("daedalos")
}

/// Get the prompt config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("prompt.json")
}

/// Default prompts directory (~/.local/share/daedalos/prompt/prompts)
pub fn default_prompts_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("daedalos/prompt/prompts")
}
