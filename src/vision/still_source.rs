use std::time::Duration;

use opencv::{core::StsObjectNotFound, imgcodecs::IMREAD_COLOR, prelude::*};

use crate::vision::FrameSource;

/// Repeats a single image, for running without a camera.
pub struct StillSource {
    frame: Mat,
    remaining: Option<u32>,
    interval: Duration,
}

impl StillSource {
    const DEFAULT_INTERVAL: Duration = Duration::from_millis(33);

    pub fn new(frame: Mat) -> Self {
        Self {
            frame,
            remaining: None,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn from_file(path: &str) -> opencv::Result<Self> {
        let frame = opencv::imgcodecs::imread(path, IMREAD_COLOR)?;
        if frame.empty() {
            return Err(opencv::Error::new(
                StsObjectNotFound,
                format!("Couldn't read image '{}'", path),
            ));
        }
        log::info!("Using still image '{}'", path);
        Ok(Self::new(frame))
    }

    /// Stop after `frames` reads, as a camera would on unplug.
    pub fn with_limit(mut self, frames: u32) -> Self {
        self.remaining = Some(frames);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl FrameSource for StillSource {
    fn read_frame(&mut self) -> Option<Mat> {
        match self.remaining {
            Some(0) => return None,
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.frame.try_clone().ok()
    }
}
