use std::fmt::Display;

#[derive(Debug)]
pub enum AppError {
    Camera(String),
    Config(String),
    Vision(opencv::Error),
    Io(std::io::Error),
    Server(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera(msg) => write!(f, "Camera Error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration Error: {}", msg),
            Self::Vision(e) => write!(f, "Vision Error: {}", e),
            Self::Io(e) => write!(f, "IO Error: {}", e),
            Self::Server(msg) => write!(f, "Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<opencv::Error> for AppError {
    fn from(e: opencv::Error) -> Self {
        Self::Vision(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
