// src/diagnostics.rs
//
// Side channel for the raw segmentation mask. Observers never influence the
// steering decision.

use crate::types::{DiagnosticsConfig, Mask};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait MaskObserver {
    fn observe(&mut self, tick: u64, mask: &Mask) -> Result<()>;
}

pub fn from_config(config: &DiagnosticsConfig) -> Result<Option<Box<dyn MaskObserver>>> {
    match &config.mask_dir {
        Some(dir) => Ok(Some(Box::new(MaskSnapshotWriter::new(dir, config.every_n_ticks)?))),
        None => Ok(None),
    }
}

/// Dumps every Nth mask as a PNG.
pub struct MaskSnapshotWriter {
    dir: PathBuf,
    every_n_ticks: u64,
    written: u64,
}

impl MaskSnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, every_n_ticks: u64) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        info!("Mask snapshots: {} (every {} ticks)", dir.display(), every_n_ticks.max(1));

        Ok(Self {
            dir,
            every_n_ticks: every_n_ticks.max(1),
            written: 0,
        })
    }

    #[cfg(test)]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl MaskObserver for MaskSnapshotWriter {
    fn observe(&mut self, tick: u64, mask: &Mask) -> Result<()> {
        if mask.is_empty() || tick % self.every_n_ticks != 0 {
            return Ok(());
        }

        let path = self.dir.join(format!("mask_{:06}.png", tick));
        mask.to_gray_image()
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.written += 1;
        debug!("Mask snapshot #{} {}", self.written, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_every_nth_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = MaskSnapshotWriter::new(dir.path().join("masks"), 2).unwrap();

        let mut mask = Mask::new(16, 8);
        mask.fill_rect(2, 2, 4, 4);
        for tick in 1..=5 {
            writer.observe(tick, &mask).unwrap();
        }
        assert_eq!(writer.written(), 2);

        let saved = image::open(dir.path().join("masks/mask_000002.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(saved.dimensions(), (16, 8));
        assert_eq!(saved.get_pixel(3, 3).0[0], 255);
        assert_eq!(saved.get_pixel(10, 3).0[0], 0);
        assert!(!dir.path().join("masks/mask_000003.png").exists());
    }

    #[test]
    fn test_disabled_without_dir() {
        assert!(from_config(&DiagnosticsConfig::default()).unwrap().is_none());
    }
}
