use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config as cfg;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canvas::CanvasOptions;
use crate::error::CanvasError;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8501,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CanvasConfig {
    #[serde(default = "CanvasConfig::default_width")]
    pub width: u32,
    #[serde(default = "CanvasConfig::default_height")]
    pub height: u32,
    #[serde(default = "CanvasConfig::default_top_offset")]
    pub top_offset: u32,
    #[serde(default = "CanvasConfig::default_show_details")]
    pub show_details: bool,
}

impl CanvasConfig {
    fn default_width() -> u32 {
        800
    }

    fn default_height() -> u32 {
        500
    }

    fn default_top_offset() -> u32 {
        60
    }

    fn default_show_details() -> bool {
        true
    }

    pub fn options(&self) -> CanvasOptions {
        CanvasOptions {
            width: self.width,
            height: self.height,
            top_offset: self.top_offset,
            show_details: self.show_details,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            top_offset: Self::default_top_offset(),
            show_details: Self::default_show_details(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LibraryConfig {
    /// Start with the reference ADV/MIT records loaded.
    #[serde(default = "LibraryConfig::default_seed")]
    pub seed_defaults: bool,
}

impl LibraryConfig {
    fn default_seed() -> bool {
        true
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            seed_defaults: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            canvas: CanvasConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Rejects settings the server or canvas cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let checks = [
            (!self.server.host.trim().is_empty(), "server.host cannot be empty"),
            (self.server.port > 0, "server.port must be > 0"),
            (
                self.canvas.width > 0 && self.canvas.height > 0,
                "canvas.width and canvas.height must be > 0",
            ),
            (!self.logging.level.trim().is_empty(), "logging.level cannot be empty"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(CanvasError::Config((*msg).to_string())),
            None => Ok(()),
        }
    }

    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Settings);
        serde_json::to_string_pretty(&schema).context("serializing settings schema")
    }
}

pub struct ConfigManager {
    settings: Settings,
    config_dir: PathBuf,
    env: String,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config_dir", &self.config_dir)
            .field("env", &self.env)
            .finish()
    }
}

impl ConfigManager {
    /// Loads settings from `config_dir` (or the default location) and the
    /// `ARCHCANVAS__*` environment.
    pub fn new(config_dir: Option<PathBuf>) -> Result<Self> {
        let env_name = Settings::default_env();
        let config_dir = Self::get_config_dir(config_dir);
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        Ok(Self {
            settings,
            config_dir,
            env: env_name,
        })
    }

    /// Built-in defaults only; nothing is read from disk or the environment.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            env: settings.env.clone(),
            settings,
            config_dir: PathBuf::from("."),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// Get the default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.archcanvas/
    /// 2. ./config/
    /// 3. Current directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let user_dir = home_dir.join(".archcanvas");
            if user_dir.exists() {
                info!("Using config directory: {:?}", user_dir);
                return user_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }

        info!("Using config directory: {:?}", cwd);
        cwd
    }

    pub fn get_config_dir(custom_path: Option<PathBuf>) -> PathBuf {
        custom_path.unwrap_or_else(Self::default_config_dir)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.yaml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.json")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.yaml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.json", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix("ARCHCANVAS").separator("__"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}
