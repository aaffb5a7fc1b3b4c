pub mod config;
pub mod error;
pub mod logging;
pub mod plate_detection;

pub use error::{Error, Result};
