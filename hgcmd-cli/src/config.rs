use std::{collections::BTreeMap, fs};

use anyhow::Context;
use serde_derive::Deserialize;
use tracing::{info, instrument};

#[instrument(skip_all)]
pub fn read_config(config_file: &Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    if let Some(config_path) = config_file {
        info!("parsing explicitly passed in config ({})", config_path);
        let config_str = fs::read_to_string(config_path).context("reading config toml")?;
        config = toml::from_str(&config_str).context("parsing config file")?;
    } else if let Some(home) = dirs_home() {
        let config_path = home.join(".config").join("hgcmd").join("config.toml");
        if config_path.exists() {
            let config_str = fs::read_to_string(&config_path).context("reading config toml")?;
            config = toml::from_str(&config_str).context("parsing config file")?;
        }
    }

    Ok(config)
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct Config {
    /// Path to the `hg` executable, defaulting to `hg` on `PATH` when unset.
    pub hg_path: Option<String>,

    /// `HGENCODING` to set on every spawned command server.
    pub encoding: Option<String>,

    /// Extra `--config key=value` overrides applied to every spawned
    /// command server.
    pub config_overrides: Option<BTreeMap<String, String>>,
}

impl Config {
    pub fn hg_path(&self) -> Option<String> {
        self.hg_path.clone()
    }

    pub fn encoding(&self) -> Option<String> {
        self.encoding.clone()
    }

    pub fn config_overrides(&self) -> Option<BTreeMap<String, String>> {
        self.config_overrides.clone()
    }
}
