// config lets you read a separate config file, overridden by PIMBRIDGE_* variables
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use ::config::builder::DefaultState;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "pimbridge";
const ENV_PREFIX: &str = "PIMBRIDGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Prompt round trip against the local store.
    Query,
    /// Two-way chat relay.
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_url: String,
    /// SQLite file backing the content store; in memory when unset.
    #[serde(default)]
    pub store_path: Option<String>,
    pub mode: Mode,
    pub prompt: String,
    pub log_filter: String,
}

impl Settings {
    /// Reads `<name>.{toml,json,yaml,...}` if present, then the environment.
    pub fn load(name: &str) -> Result<Self> {
        let settings = defaults()?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = defaults()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8000/ws".into(),
            store_path: None,
            mode: Mode::Query,
            prompt: "date of next sunday".into(),
            log_filter: "info".into(),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let d = Settings::default();
    Ok(Config::builder()
        .set_default("server_url", d.server_url)?
        .set_default("mode", "query")?
        .set_default("prompt", d.prompt)?
        .set_default("log_filter", d.log_filter)?)
}
