// src/types.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub thresholds: ThresholdConfig,
    pub morphology: MorphologyConfig,
    pub classifier: ClassifierConfig,
    pub actuator: ActuatorConfig,
    pub schedule: ScheduleConfig,
    pub diagnostics: DiagnosticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Images,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub camera_index: i32,
    pub images_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Images,
            camera_index: 1,
            images_dir: PathBuf::from("frames"),
        }
    }
}

/// Inclusive low/high pairs on the 8-bit HSV scale (H 0-179, S/V 0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvBounds {
    pub hue: [u8; 2],
    pub saturation: [u8; 2],
    pub value: [u8; 2],
}

impl Default for HsvBounds {
    fn default() -> Self {
        Self {
            hue: [5, 25],
            saturation: [100, 255],
            value: [100, 255],
        }
    }
}

impl HsvBounds {
    pub fn range(&self) -> HsvRange {
        HsvRange {
            min: [self.hue[0], self.saturation[0], self.value[0]],
            max: [self.hue[1], self.saturation[1], self.value[1]],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    #[serde(flatten)]
    pub bounds: HsvBounds,
    /// YAML file with the same hue/saturation/value keys, re-read when it changes.
    pub reload_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Feed erosion output into dilation instead of re-reading the raw mask.
    pub chained: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub left_bound: i32,
    pub right_bound: i32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            left_bound: 230,
            right_bound: 410,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    Log,
    Serial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub kind: ActuatorKind,
    pub port: String,
    pub baud_rate: u32,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Log,
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub tick_ms: u64,
    pub max_ticks: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_ms: 33,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub mask_dir: Option<PathBuf>,
    pub every_n_ticks: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            mask_dir: None,
            every_n_ticks: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// FRAMES AND MASKS
// ============================================================================

/// Channel order of a packed 3-channel frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Bgr,
    Rgb,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
    pub pixel_order: PixelOrder,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize, pixel_order: PixelOrder) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms: 0.0,
            pixel_order,
        }
    }

    #[cfg(test)]
    /// Uniform frame for synthetic input.
    pub fn filled(width: usize, height: usize, pixel: [u8; 3], pixel_order: PixelOrder) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&pixel);
        }
        Self::new(data, width, height, pixel_order)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.len() < self.width * self.height * 3
    }

    /// Pixel in (r, g, b) order regardless of the native layout.
    #[inline]
    pub fn rgb_at(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let i = (y * self.width + x) * 3;
        let (a, b, c) = (self.data[i], self.data[i + 1], self.data[i + 2]);
        match self.pixel_order {
            PixelOrder::Rgb => (a, b, c),
            PixelOrder::Bgr => (c, b, a),
        }
    }

    #[cfg(test)]
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, pixel: [u8; 3]) {
        for y in y0..(y0 + h).min(self.height) {
            for x in x0..(x0 + w).min(self.width) {
                let i = (y * self.width + x) * 3;
                self.data[i..i + 3].copy_from_slice(&pixel);
            }
        }
    }
}

/// Closed HSV interval. `min <= max` is not enforced; an inverted channel
/// simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl HsvRange {
    #[cfg(test)]
    pub fn new(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.min[c] && hsv[c] <= self.max[c])
    }
}

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Single-channel binary grid, 255 for in-range and 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![MASK_OFF; width * height],
            width,
            height,
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[cfg(test)]
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    #[cfg(test)]
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..(y0 + h).min(self.height) {
            for x in x0..(x0 + w).min(self.width) {
                self.set(x, y, MASK_ON);
            }
        }
    }

    #[cfg(test)]
    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&v| v != MASK_OFF).count()
    }

    pub fn from_gray_image(image: image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width: width as usize,
            height: height as usize,
        }
    }

    pub fn to_gray_image(&self) -> image::GrayImage {
        image::GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| image::GrayImage::new(self.width as u32, self.height as u32))
    }
}

// ============================================================================
// STEERING
// ============================================================================

/// Tracking state kept between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Left,
    Center,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Center => "CENTER",
            Direction::Right => "RIGHT",
        }
    }
}

/// The only two values ever sent to the actuator. Silence means "hold".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Turn {
    Left,
    Right,
}

impl From<Turn> for Direction {
    fn from(turn: Turn) -> Self {
        match turn {
            Turn::Left => Direction::Left,
            Turn::Right => Direction::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SteeringCommand {
    pub turn: Turn,
    /// True when the ball was lost and the last decisive turn is repeated.
    pub reasserted: bool,
}

impl SteeringCommand {
    pub fn fresh(turn: Turn) -> Self {
        Self {
            turn,
            reasserted: false,
        }
    }

    pub fn reasserted(turn: Turn) -> Self {
        Self {
            turn,
            reasserted: true,
        }
    }

    /// Single-byte symbol understood by the servo firmware: lowercase for a
    /// fresh decision, uppercase when repeating the last one.
    pub fn wire_symbol(&self) -> u8 {
        match (self.turn, self.reasserted) {
            (Turn::Left, false) => b'l',
            (Turn::Right, false) => b'r',
            (Turn::Left, true) => b'L',
            (Turn::Right, true) => b'R',
        }
    }
}
