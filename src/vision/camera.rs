use opencv::{
    prelude::*,
    videoio::{CAP_ANY, VideoCapture},
};

use crate::vision::FrameSource;

/// Capture device, acquired once at startup and released on drop.
pub struct Camera {
    cam: VideoCapture,
    device: String,
    opened: bool,
}

impl Camera {
    /// `device` is either a numeric index ("0") or a path/URL.
    pub fn open(device: &str) -> opencv::Result<Self> {
        log::info!("Starting video capture on '{}'", device);
        let cam = match device.parse::<i32>() {
            Ok(index) => VideoCapture::new(index, CAP_ANY)?,
            Err(_) => VideoCapture::from_file(device, CAP_ANY)?,
        };

        let opened = cam.is_opened()?;
        if opened {
            log::debug!("Video capture opened");
        } else {
            log::warn!("Could not open camera '{}'", device);
        }

        Ok(Self {
            cam,
            device: device.to_string(),
            opened,
        })
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }
}

impl FrameSource for Camera {
    fn read_frame(&mut self) -> Option<Mat> {
        if !self.opened {
            return None;
        }
        let mut frame = Mat::default();
        match self.cam.read(&mut frame) {
            Ok(true) if !frame.empty() => Some(frame),
            Ok(_) => {
                log::warn!("No frame from '{}'", self.device);
                None
            }
            Err(e) => {
                log::error!("Failed to read from '{}': {}", self.device, e);
                None
            }
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if self.opened {
            log::debug!("Releasing video capture '{}'", self.device);
            if let Err(e) = self.cam.release() {
                log::error!("Failed to release '{}': {}", self.device, e);
            }
        }
    }
}
