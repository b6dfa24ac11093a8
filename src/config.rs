//! Scene configuration.
//!
//! [`SceneConfig`] is plain serde data stored as JSON. [`ConfigFileLoader`]
//! reads it from disk and writes the defaults back when the file is missing,
//! so a fresh checkout produces an editable file on first start.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::light::{CascadeSplits, DEFAULT_CASCADE_SPLITS};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Display refresh rate in Hz, one timestep advance per frame.
    pub refresh_rate: u32,
    /// World markup. Empty means the built-in default world.
    pub environment_file: String,
    /// Equirectangular panorama for the skybox. `None` draws a gradient.
    pub skybox_panorama: Option<String>,
    pub looping: bool,
    pub time_rate: f32,
    pub snapshot_mode: bool,
    pub num_snapshot: u32,
    pub follow_vehicle: usize,
    pub show_global_frame: bool,
    pub light_direction: [f32; 3],
    pub light_intensity: [f32; 3],
    pub cascade_splits: CascadeSplits,
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 60,
            environment_file: String::new(),
            skybox_panorama: None,
            looping: true,
            time_rate: 1.0,
            snapshot_mode: false,
            num_snapshot: 5,
            follow_vehicle: 0,
            show_global_frame: false,
            light_direction: [1.0, -1.0, -1.0],
            light_intensity: [1.0, 1.0, 1.0],
            cascade_splits: DEFAULT_CASCADE_SPLITS,
            fov_y_deg: 45.0,
            z_near: 0.1,
            z_far: 500.0,
        }
    }
}

impl SceneConfig {
    pub fn from_json(value: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(value)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read scene config {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("invalid scene config {:?}", path))
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
    config: Option<SceneConfig>,
}

impl ConfigFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: None,
        }
    }

    /// Loads the file, or falls back to defaults and writes them out when the
    /// file does not exist yet. A file that exists but does not parse is an error.
    pub fn load_config(&mut self) -> anyhow::Result<&mut SceneConfig> {
        let config = if self.path.exists() {
            SceneConfig::load(&self.path)?
        } else {
            log::warn!(
                "Scene config {:?} not found, writing defaults.",
                self.path
            );
            let config = SceneConfig::default();
            self.config = Some(config.clone());
            self.save_config()?;
            config
        };
        Ok(self.config.insert(config))
    }

    pub fn get_or_load_config(&mut self) -> anyhow::Result<&mut SceneConfig> {
        if self.config.is_none() {
            self.load_config()?;
        }
        self.config
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("scene config {:?} was not loaded", self.path))
    }

    pub fn save_config(&self) -> anyhow::Result<()> {
        if let Some(config) = &self.config {
            let content = serde_json::to_string_pretty(config)?;
            std::fs::write(&self.path, content)
                .with_context(|| format!("could not write scene config {:?}", self.path))?;
        }
        Ok(())
    }
}
