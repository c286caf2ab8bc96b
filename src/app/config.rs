use std::path::{Path, PathBuf};

use crate::{
    app::AppError,
    vision::{Camera, ColourDefinition, ColourDetector, FrameSource, StillSource},
};

#[derive(Clone, Debug, PartialEq)]
pub enum FrameInput {
    /// Device index or capture path/URL
    Camera(String),
    Still(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub input: FrameInput,
    pub bind: String,
    pub static_dir: PathBuf,
    pub colours: Vec<ColourDefinition>,
    pub min_area: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: FrameInput::Camera("0".to_string()),
            bind: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("./static"),
            colours: ColourDefinition::defaults(),
            min_area: ColourDetector::DEFAULT_MIN_AREA,
        }
    }
}

impl Config {
    pub fn info(&self) -> String {
        match &self.input {
            FrameInput::Camera(device) => format!("Camera '{}' on {}", device, self.bind),
            FrameInput::Still(path) => format!("Still image {:?} on {}", path, self.bind),
        }
    }

    pub fn description(&self) -> String {
        let names: Vec<&str> = self.colours.iter().map(|c| c.name.as_str()).collect();
        format!(
            "Detecting [{}], min area {}, static files from {:?}",
            names.join(", "),
            self.min_area,
            self.static_dir
        )
    }

    pub fn open_source(&self) -> Result<Box<dyn FrameSource + Send>, AppError> {
        match &self.input {
            FrameInput::Camera(device) => {
                let camera = Camera::open(device).map_err(|e| AppError::Camera(e.to_string()))?;
                Ok(Box::new(camera))
            }
            FrameInput::Still(path) => {
                let path = path
                    .to_str()
                    .ok_or_else(|| AppError::Config(format!("Invalid path {:?}", path)))?;
                let still =
                    StillSource::from_file(path).map_err(|e| AppError::Camera(e.to_string()))?;
                Ok(Box::new(still))
            }
        }
    }

    /// Read colour definitions from a JSON array
    pub fn load_colours(path: &Path) -> Result<Vec<ColourDefinition>, AppError> {
        let data = std::fs::read_to_string(path)?;
        let colours: Vec<ColourDefinition> = serde_json::from_str(&data)?;
        Self::validate_colours(&colours)?;
        Ok(colours)
    }

    pub fn validate_colours(colours: &[ColourDefinition]) -> Result<(), AppError> {
        if colours.is_empty() {
            return Err(AppError::Config("No colours defined".to_string()));
        }
        for colour in colours {
            if colour.name.is_empty() {
                return Err(AppError::Config("Colour with empty name".to_string()));
            }
            if colour.ranges.is_empty() {
                return Err(AppError::Config(format!("'{}' has no ranges", colour.name)));
            }
            for range in &colour.ranges {
                let ordered = range.lower.iter().zip(&range.upper).all(|(lo, hi)| lo <= hi);
                if !ordered || range.upper[0] > 179 {
                    return Err(AppError::Config(format!(
                        "'{}' has an invalid range {:?}",
                        colour.name, range
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::vision::HsvRange;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::validate_colours(&Config::default().colours).is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut colour = ColourDefinition::yellow();
        colour.ranges = vec![HsvRange::new([40, 0, 0], [20, 255, 255])];
        assert!(Config::validate_colours(&[colour]).is_err());
    }

    #[test]
    fn rejects_hue_past_179() {
        let mut colour = ColourDefinition::red();
        colour.ranges.push(HsvRange::new([170, 0, 0], [200, 255, 255]));
        assert!(Config::validate_colours(&[colour]).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(Config::validate_colours(&[]).is_err());
    }

    #[test]
    fn missing_colour_file_is_io_error() {
        let res = Config::load_colours(Path::new("no/such/colours.json"));
        assert!(matches!(res, Err(AppError::Io(_))));
    }
}
