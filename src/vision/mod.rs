use std::collections::BTreeMap;

use opencv::{core::Scalar, prelude::*};
use serde::{Deserialize, Serialize};

mod camera;
mod colour_detector;
mod still_source;

pub use camera::Camera;
pub use colour_detector::{ColourDetector, Region};
pub use still_source::StillSource;

/// Inclusive HSV bounds, using the 8-bit OpenCV convention (hue 0..=179).
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct ColourDefinition {
    pub name: String,
    // A colour may need several disjoint ranges, red wraps around hue 0
    pub ranges: Vec<HsvRange>,
    /// Annotation colour, BGR
    pub display: [u8; 3],
}

impl ColourDefinition {
    pub fn red() -> Self {
        Self {
            name: "red".to_string(),
            ranges: vec![
                HsvRange::new([0, 100, 100], [10, 255, 255]),
                HsvRange::new([160, 100, 100], [179, 255, 255]),
            ],
            display: [0, 0, 255],
        }
    }

    pub fn yellow() -> Self {
        Self {
            name: "yellow".to_string(),
            ranges: vec![HsvRange::new([20, 120, 120], [35, 255, 255])],
            display: [0, 255, 255],
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::red(), Self::yellow()]
    }

    pub fn display_scalar(&self) -> Scalar {
        Scalar::new(
            self.display[0].into(),
            self.display[1].into(),
            self.display[2].into(),
            0.0,
        )
    }

    /// "red" -> "Red", used for the summary line
    pub fn title(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

pub struct DetectionResult {
    pub annotated: Mat,
    pub counts: BTreeMap<String, u32>,
}

impl DetectionResult {
    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

/// Supplies frames to the capture loop. `None` is a failed read.
pub trait FrameSource {
    fn read_frame(&mut self) -> Option<Mat>;
}
