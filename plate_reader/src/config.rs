//! Pipeline configuration, loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ocr: OcrConfig,
    pub crop: CropConfig,
    pub render: RenderConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the configuration at `path`, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml_str(&content)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Settings for the Tesseract engine used when OCR runs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub data_path: String,
    pub language: String,
    pub char_whitelist: String,
    pub page_seg_mode: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            data_path: "models".to_string(),
            language: "licence".to_string(),
            char_whitelist: "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string(),
            page_seg_mode: 7,
        }
    }
}

/// Fractions of the plate box trimmed from each edge before OCR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub margin_left: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// BGR
    pub car_color: (u8, u8, u8),
    pub car_thickness: i32,
    pub car_line_length_x: i32,
    pub car_line_length_y: i32,
    /// BGR
    pub plate_color: (u8, u8, u8),
    pub plate_thickness: i32,
    /// Height the best plate crop is resized to before it is pasted.
    pub crop_height: i32,
    /// Vertical gap between the top of the car box and the pasted crop.
    pub crop_gap: i32,
    /// Height of the white band the plate text is drawn on.
    pub text_band_height: i32,
    pub font_scale: f64,
    pub font_thickness: i32,
    pub progress_every: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            car_color: (0, 255, 0),
            car_thickness: 25,
            car_line_length_x: 200,
            car_line_length_y: 200,
            plate_color: (0, 0, 255),
            plate_thickness: 12,
            crop_height: 400,
            crop_gap: 100,
            text_band_height: 300,
            font_scale: 2.0,
            font_thickness: 6,
            progress_every: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.render.crop_height, 400);
        assert_eq!(config.ocr.page_seg_mode, 7);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [ocr]
            language = "eng"

            [render]
            crop_gap = 50
            plate_color = [255, 0, 0]
            "#,
        )
        .unwrap();
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.data_path, "models");
        assert_eq!(config.render.crop_gap, 50);
        assert_eq!(config.render.plate_color, (255, 0, 0));
        assert_eq!(config.render.car_thickness, 25);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        assert!(PipelineConfig::from_toml_str("[render\ncrop_gap = ").is_err());
    }

    #[test]
    fn missing_path_loads_defaults() {
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }
}
