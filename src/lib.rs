pub mod app;
pub mod preview;
pub mod vision;
