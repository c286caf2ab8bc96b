use opencv::{
    core::{Point, Scalar},
    highgui,
    imgproc::{FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

use crate::{
    app::AppError,
    vision::{Camera, ColourDefinition, ColourDetector, FrameSource},
};

const QUIT_KEY: char = 'q';

/// Local window showing the annotated feed, each colour toggled by the first
/// letter of its name.
pub struct Preview {
    detector: ColourDetector,
    colours: Vec<ColourDefinition>,
    keys: Vec<char>,
    enabled: Vec<bool>,
}

impl Preview {
    const INSTRUCTION_SPACING: i32 = 20;
    const INSTRUCTION_SCALE: f64 = 0.5;

    /// Fails when two colours share a first letter or one starts with the quit key
    pub fn new(
        detector: ColourDetector,
        colours: Vec<ColourDefinition>,
    ) -> Result<Self, AppError> {
        let mut keys: Vec<char> = Vec::with_capacity(colours.len());
        for colour in &colours {
            let key = colour
                .name
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .ok_or_else(|| AppError::Config("Colour with empty name".to_string()))?;
            if key == QUIT_KEY || keys.contains(&key) {
                return Err(AppError::Config(format!(
                    "Key '{}' for {} is already taken",
                    key, colour.name
                )));
            }
            keys.push(key);
        }

        let enabled = vec![true; colours.len()];
        Ok(Self {
            detector,
            colours,
            keys,
            enabled,
        })
    }

    pub fn window_title(&self) -> String {
        let names: Vec<String> = self.colours.iter().map(|c| c.name.to_uppercase()).collect();
        format!("Colour Detection - {}", names.join(" & "))
    }

    pub fn instructions(&self) -> Vec<String> {
        let mut lines = vec![format!("Press '{}' to quit", QUIT_KEY)];
        for (colour, key) in self.colours.iter().zip(&self.keys) {
            lines.push(format!("Press '{}' to toggle {} detection", key, colour.name));
        }
        lines
    }

    /// Returns false when the key asks to quit
    pub fn handle_key(&mut self, key: char) -> bool {
        if key == QUIT_KEY {
            return false;
        }
        if let Some(index) = self.keys.iter().position(|k| *k == key) {
            let enabled = &mut self.enabled[index];
            *enabled = !*enabled;
            log::info!(
                "{} detection: {}",
                self.colours[index].title(),
                if *enabled { "ON" } else { "OFF" }
            );
        }
        true
    }

    pub fn enabled_colours(&self) -> Vec<ColourDefinition> {
        self.colours
            .iter()
            .zip(&self.enabled)
            .filter(|(_, enabled)| **enabled)
            .map(|(colour, _)| colour.clone())
            .collect()
    }

    pub fn render(&self, frame: &Mat) -> opencv::Result<Mat> {
        let mut mirrored = Mat::default();
        opencv::core::flip(frame, &mut mirrored, 1)?;

        let enabled = self.enabled_colours();
        let mut shown = if enabled.is_empty() {
            mirrored
        } else {
            self.detector.process(&mirrored, &enabled)?.annotated
        };

        let top = shown.rows() - 60;
        for (i, line) in self.instructions().iter().enumerate() {
            opencv::imgproc::put_text(
                &mut shown,
                line,
                Point::new(10, top + i as i32 * Self::INSTRUCTION_SPACING),
                FONT_HERSHEY_SIMPLEX,
                Self::INSTRUCTION_SCALE,
                Scalar::all(255.0),
                1,
                LINE_8,
                false,
            )?;
        }
        Ok(shown)
    }

    pub fn run(mut self, device: &str) -> Result<(), AppError> {
        let mut camera = Camera::open(device)?;
        if !camera.is_opened() {
            return Err(AppError::Camera(format!("Could not open camera '{}'", device)));
        }

        let title = self.window_title();
        highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;
        log::info!("Colour detection started, press '{}' to quit", QUIT_KEY);

        while let Some(frame) = camera.read_frame() {
            let shown = self.render(&frame)?;
            highgui::imshow(&title, &shown)?;

            let key = highgui::wait_key(1)?;
            if key >= 0 && !self.handle_key(((key & 0xFF) as u8) as char) {
                break;
            }
        }

        highgui::destroy_all_windows()?;
        log::info!("Colour detection stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::CV_8UC3;

    use super::*;

    fn preview() -> Preview {
        Preview::new(ColourDetector::default(), ColourDefinition::defaults()).unwrap()
    }

    fn named(name: &str) -> ColourDefinition {
        ColourDefinition {
            name: name.to_string(),
            ..ColourDefinition::red()
        }
    }

    #[test]
    fn shared_initial_is_rejected() {
        let colours = vec![named("red"), named("rose")];
        assert!(Preview::new(ColourDetector::default(), colours).is_err());
    }

    #[test]
    fn quit_key_cannot_be_a_colour() {
        let colours = vec![named("quartz"), ColourDefinition::yellow()];
        assert!(Preview::new(ColourDetector::default(), colours).is_err());
    }

    #[test]
    fn unknown_key_changes_nothing() {
        let mut preview = preview();
        assert!(preview.handle_key('x'));
        assert_eq!(preview.enabled_colours().len(), 2);
    }

    #[test]
    fn title_lists_colours() {
        assert_eq!(preview().window_title(), "Colour Detection - RED & YELLOW");
    }

    #[test]
    fn instructions_cover_each_colour() {
        assert_eq!(
            preview().instructions(),
            vec![
                "Press 'q' to quit",
                "Press 'r' to toggle red detection",
                "Press 'y' to toggle yellow detection",
            ]
        );
    }

    #[test]
    fn keys_toggle_colours() {
        let mut preview = preview();
        assert!(preview.handle_key('r'));
        let names: Vec<String> = preview.enabled_colours().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["yellow"]);

        assert!(preview.handle_key('y'));
        assert!(preview.enabled_colours().is_empty());

        assert!(preview.handle_key('r'));
        assert_eq!(preview.enabled_colours().len(), 1);
    }

    #[test]
    fn quit_key() {
        assert!(!preview().handle_key('q'));
    }

    #[test]
    fn render_keeps_size() {
        let frame = Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::all(0.0)).unwrap();
        let shown = preview().render(&frame).unwrap();
        assert_eq!(shown.rows(), 120);
        assert_eq!(shown.cols(), 160);
    }
}
