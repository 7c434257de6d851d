// src/thresholds.rs
//
// Per-tick HSV thresholds. The six values are read fresh every tick and
// passed through untouched.

use crate::types::{HsvBounds, HsvRange, ThresholdConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

pub trait ThresholdSource {
    fn current(&mut self) -> HsvRange;
}

pub fn from_config(config: &ThresholdConfig) -> Box<dyn ThresholdSource> {
    match &config.reload_file {
        Some(path) => Box::new(FileThresholds::new(path, config.bounds)),
        None => Box::new(FixedThresholds(config.bounds.range())),
    }
}

pub struct FixedThresholds(pub HsvRange);

impl ThresholdSource for FixedThresholds {
    fn current(&mut self) -> HsvRange {
        self.0
    }
}

/// Keys left out of the reload file fall back to the configured bounds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BoundsOverride {
    hue: Option<[u8; 2]>,
    saturation: Option<[u8; 2]>,
    value: Option<[u8; 2]>,
}

impl BoundsOverride {
    fn apply(self, base: HsvBounds) -> HsvBounds {
        HsvBounds {
            hue: self.hue.unwrap_or(base.hue),
            saturation: self.saturation.unwrap_or(base.saturation),
            value: self.value.unwrap_or(base.value),
        }
    }
}

/// Thresholds backed by a YAML file that can be edited while tracking.
///
/// The file is re-parsed whenever its modification time changes. A missing
/// or malformed file keeps the last good range and is retried next tick.
pub struct FileThresholds {
    path: PathBuf,
    base: HsvBounds,
    last_modified: Option<SystemTime>,
    range: HsvRange,
}

impl FileThresholds {
    pub fn new(path: impl AsRef<Path>, base: HsvBounds) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            base,
            last_modified: None,
            range: base.range(),
        }
    }

    fn reload_if_changed(&mut self) -> Result<()> {
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Cannot stat {}", self.path.display()))?;

        if self.last_modified == Some(modified) {
            return Ok(());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read {}", self.path.display()))?;
        let overrides: BoundsOverride = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid thresholds in {}", self.path.display()))?;
        // Only a parsed file counts as seen.
        self.last_modified = Some(modified);
        let range = overrides.apply(self.base).range();

        if range != self.range {
            info!(
                "HSV range updated: H {}-{} S {}-{} V {}-{}",
                range.min[0], range.max[0], range.min[1], range.max[1], range.min[2], range.max[2]
            );
        }
        self.range = range;
        Ok(())
    }
}

impl ThresholdSource for FileThresholds {
    fn current(&mut self) -> HsvRange {
        if let Err(e) = self.reload_if_changed() {
            warn!("Keeping previous thresholds: {:#}", e);
        }
        self.range
    }
}
