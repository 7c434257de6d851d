// src/source.rs
//
// Frame sources. A source is pulled once per tick and distinguishes
// "no frame" (`Ok(None)`) from a read failure (`Err`).

use crate::types::{Frame, PixelOrder};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

pub trait FrameSource {
    fn name(&self) -> String;

    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// A finite source that has nothing left to give.
    fn is_exhausted(&self) -> bool {
        false
    }
}

// ============================================================================
// IMAGE SEQUENCE
// ============================================================================

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays still images from a directory in file-name order.
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    started_at: Instant,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!("Frame directory {} does not exist", dir.display());
        }

        let files = find_image_files(&dir);
        info!("Found {} frame image(s) in {}", files.len(), dir.display());

        Ok(Self {
            dir,
            files,
            cursor: 0,
            started_at: Instant::now(),
        })
    }
}

fn find_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> String {
        format!("images:{}", self.dir.display())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let rgb = image::open(path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Loaded {} ({}x{})", path.display(), width, height);

        let mut frame = Frame::new(rgb.into_raw(), width as usize, height as usize, PixelOrder::Rgb);
        frame.timestamp_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
        Ok(Some(frame))
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.files.len()
    }
}

// ============================================================================
// CAMERA
// ============================================================================

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use super::FrameSource;
    use crate::types::{Frame, PixelOrder};
    use anyhow::{Context, Result};
    use opencv::{
        core::{self, Mat},
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture, VideoCaptureTraitConst},
    };
    use std::time::Instant;
    use tracing::{info, warn};

    pub struct CameraSource {
        cap: VideoCapture,
        index: i32,
        started_at: Instant,
    }

    impl CameraSource {
        pub fn open(index: i32) -> Result<Self> {
            info!("Opening camera {}", index);

            let cap = VideoCapture::new(index, videoio::CAP_ANY)
                .with_context(|| format!("Failed to create capture for camera {}", index))?;

            if !cap.is_opened()? {
                anyhow::bail!("Failed to open the camera connection (index {})", index);
            }

            let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
            let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
            info!("Camera {} opened: {}x{}", index, width, height);

            Ok(Self {
                cap,
                index,
                started_at: Instant::now(),
            })
        }
    }

    impl FrameSource for CameraSource {
        fn name(&self) -> String {
            format!("camera:{}", self.index)
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            let mut mat = Mat::default();

            if !self.cap.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }

            let mat = to_bgr(mat)?;
            let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };
            let data = mat.data_bytes()?.to_vec();

            let mut frame = Frame::new(data, mat.cols() as usize, mat.rows() as usize, PixelOrder::Bgr);
            frame.timestamp_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
            Ok(Some(frame))
        }
    }

    /// Normalize a grabbed frame to packed 8-bit BGR.
    fn to_bgr(mat: Mat) -> Result<Mat> {
        let code = match mat.typ() {
            core::CV_8UC3 => return Ok(mat),
            core::CV_8UC1 => imgproc::COLOR_GRAY2BGR,
            core::CV_8UC4 => imgproc::COLOR_BGRA2BGR,
            other => anyhow::bail!("Unsupported camera frame type {} ({} channels)", other, mat.channels()),
        };

        let mut bgr = Mat::default();
        imgproc::cvt_color(&mat, &mut bgr, code, 0)
            .with_context(|| format!("Failed to convert {}-channel frame to BGR", mat.channels()))?;
        Ok(bgr)
    }

    impl Drop for CameraSource {
        fn drop(&mut self) {
            if let Err(e) = self.cap.release() {
                warn!("Failed to release camera {}: {}", self.index, e);
            }
        }
    }

}

// ============================================================================
// SCRIPTED (tests)
// ============================================================================

/// Replays a fixed list of ticks; `None` entries stand for dropped frames.
#[cfg(test)]
pub struct ScriptedSource {
    frames: std::collections::VecDeque<Option<Frame>>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(frames: Vec<Option<Frame>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

#[cfg(test)]
impl FrameSource for ScriptedSource {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front().flatten())
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb(color));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_image_sequence_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "frame_002.png", [0, 255, 0]);
        write_png(dir.path(), "frame_001.png", [255, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.files.len(), 2);
        assert!(!source.is_exhausted());

        let first = source.read_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height), (8, 6));
        assert_eq!(first.pixel_order, PixelOrder::Rgb);
        assert_eq!(first.rgb_at(0, 0), (255, 0, 0));

        let second = source.read_frame().unwrap().unwrap();
        assert_eq!(second.rgb_at(3, 3), (0, 255, 0));

        assert!(source.is_exhausted());
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_is_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitkeep"), "").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.is_exhausted());
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_fails() {
        assert!(ImageSequenceSource::open("/no/such/frames").is_err());
    }

    #[test]
    fn test_corrupt_image_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.read_frame().is_err());
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_scripted_source() {
        let frame = Frame::filled(2, 2, [0, 0, 0], PixelOrder::Bgr);
        let mut source = ScriptedSource::new(vec![Some(frame), None]);
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
        assert!(source.is_exhausted());
    }
}
