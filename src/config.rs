use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub minecraft_dir: PathBuf,
    #[serde(default = "default_game_version")]
    pub game_version: String,
    #[serde(default = "default_loader")]
    pub loader: String,
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            return Ok(config);
        }

        let config = AppConfig {
            minecraft_dir: default_minecraft_dir()?,
            game_version: default_game_version(),
            loader: default_loader(),
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.minecraft_dir.join("mods")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.minecraft_dir.join("config")
    }
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("moddy"))
}

fn default_minecraft_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    if cfg!(windows) {
        Ok(base.config_dir().join(".minecraft"))
    } else {
        Ok(base.home_dir().join(".minecraft"))
    }
}

fn default_game_version() -> String {
    "1.20.1".to_string()
}

fn default_loader() -> String {
    "fabric".to_string()
}
