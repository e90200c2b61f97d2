use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Selectable backend model variants, first entry is the default.
pub const MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-pro",
];

fn default_model() -> String {
    MODELS[0].to_string()
}

fn default_context_window() -> usize {
    20
}

fn default_max_history() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory holding persisted sessions - computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,

    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub default_model: String,

    /// Messages of trailing history sent per turn.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Sessions retained when persisting.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            data_dir: PathBuf::new(),
            api_key: None,
            default_model: default_model(),
            context_window: default_context_window(),
            max_history: default_max_history(),
        }
    }
}

impl Config {
    /// Load `~/.glimmer/config.toml`, writing a default one on first run.
    /// `GEMINI_API_KEY` in the environment overrides the file key.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .context("could not find home directory")?;
        let glimmer_dir = home.join(".glimmer");
        Self::load_or_init_at(glimmer_dir)
    }

    pub fn load_or_init_at(dir: PathBuf) -> Result<Self> {
        let config_path = dir.join("config.toml");
        if !dir.exists() {
            fs::create_dir_all(&dir).context("failed to create config directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("failed to read config file")?;
            toml::from_str::<Self>(&contents).context("failed to parse config file")?
        } else {
            let config = Self::default();
            let rendered =
                toml::to_string_pretty(&config).context("failed to serialize default config")?;
            fs::write(&config_path, rendered).context("failed to write default config")?;
            config
        };

        config.config_path = config_path;
        config.data_dir = dir;

        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            config.api_key = Some(key);
        }

        config.validate_model();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&self.config_path, rendered).context("failed to write config file")?;
        Ok(())
    }

    /// Fall back to the default model when the configured one is unknown.
    fn validate_model(&mut self) {
        if !MODELS.contains(&self.default_model.as_str()) {
            tracing::warn!(
                "unknown model '{}' in config, using '{}'",
                self.default_model,
                MODELS[0]
            );
            self.default_model = default_model();
        }
    }
}
