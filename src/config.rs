use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::error::Error;
use crate::render::Layout;
use crate::source::SourceKind;
use crate::supervisor::SupervisorPolicy;

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,
    pub top: usize,
    pub tree_width: usize,
    pub summary_width: usize,
    pub supervisor: SupervisorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let layout = Layout::default();
        Config {
            source: SourceKind::default(),
            top: layout.top,
            tree_width: layout.tree_width,
            summary_width: layout.summary_width,
            supervisor: SupervisorPolicy::default(),
        }
    }
}

impl Config {
    /// Reads `path`, or the file in the home config directory when none is given.
    /// Anything unreadable falls back to defaults.
    pub fn load(path: Option<&Path>) -> Config {
        let path = path.map_or_else(get_home_config, Path::to_path_buf);
        if !path.exists() {
            debug!("no config at {}", path.display());
            return Config::default();
        }
        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config {}: {e}", path.display());
                Config::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Config, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    pub fn layout(&self) -> Layout {
        Layout {
            top: self.top,
            tree_width: self.tree_width,
            summary_width: self.summary_width,
        }
    }
}

fn get_home_config() -> PathBuf {
    //home directory
    if let Some(mut dir) = dirs::home_dir() {
        dir.push(".config");
        dir.push("memtree");
        dir.push("config.toml");
        return dir;
    }
    //should not happen, but just in case
    PathBuf::from("config.toml")
}
