use super::{PlateFormat, PlateReading, RawCandidate};
use crate::error::Result;

use log::debug;

/// An OCR engine that turns one plate crop into an ordered list of
/// candidates. Built once per process and lent to every read.
pub trait OcrEngine {
    type Crop: ?Sized;

    fn read_text(&mut self, crop: &Self::Crop) -> Result<Vec<RawCandidate>>;
}

/// Replays candidates that were produced by an OCR engine ahead of time.
#[derive(Debug, Default)]
pub struct RecordedOcr;

impl OcrEngine for RecordedOcr {
    type Crop = [RawCandidate];

    fn read_text(&mut self, crop: &Self::Crop) -> Result<Vec<RawCandidate>> {
        Ok(crop.to_vec())
    }
}

/// Picks the plate reading for a crop out of the engine's candidates.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlateTextResolver;

impl PlateTextResolver {
    pub fn new() -> Self {
        Self
    }

    /// Run `engine` on `crop` and resolve its candidates.
    pub fn read_license_plate<E: OcrEngine + ?Sized>(
        &self,
        engine: &mut E,
        crop: &E::Crop,
    ) -> Result<Option<PlateReading>> {
        let candidates = engine.read_text(crop)?;
        Ok(self.resolve(&candidates))
    }

    /// The first candidate, in engine order, that satisfies a plate grammar,
    /// corrected under that grammar. Scores do not reorder candidates.
    pub fn resolve(&self, candidates: &[RawCandidate]) -> Option<PlateReading> {
        candidates.iter().find_map(|candidate| {
            let text = normalize(&candidate.text);
            let format = PlateFormat::detect(&text)?;
            debug!("OCR candidate {:?} accepted as {:?}", candidate.text, format);
            Some(PlateReading {
                text: format.correct(&text),
                format,
                score: candidate.score,
            })
        })
    }
}

/// Uppercase with all whitespace removed.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(feature = "vision")]
pub use self::tesseract::{crop_plate, TesseractOcr};

#[cfg(feature = "vision")]
mod tesseract {
    use super::OcrEngine;
    use crate::config::{CropConfig, OcrConfig};
    use crate::error::{Error, Result};
    use crate::plate_detection::{BBox, RawCandidate};

    use leptess::tesseract::TessApi;
    use log::debug;
    use opencv::core::Rect;
    use opencv::imgproc::{cvt_color, COLOR_BGR2GRAY};
    use opencv::prelude::{Mat, MatTraitConst, MatTraitConstManual};
    use std::ffi::CString;

    fn tess_error(e: impl std::fmt::Debug) -> Error {
        Error::Tesseract(format!("{:?}", e))
    }

    fn c_string(value: &str) -> Result<CString> {
        CString::new(value).map_err(tess_error)
    }

    /// Tesseract restricted to plate characters, reading one text line.
    pub struct TesseractOcr {
        ocr: TessApi,
    }

    impl TesseractOcr {
        pub fn new(config: &OcrConfig) -> Result<Self> {
            let mut api =
                TessApi::new(Some(&config.data_path), &config.language).map_err(tess_error)?;
            api.raw
                .set_variable(
                    &c_string("tessedit_char_whitelist")?,
                    &c_string(&config.char_whitelist)?,
                )
                .map_err(tess_error)?;
            api.raw
                .set_variable(
                    &c_string("tessedit_pageseg_mode")?,
                    &c_string(&config.page_seg_mode.to_string())?,
                )
                .map_err(tess_error)?;

            Ok(Self { ocr: api })
        }
    }

    impl OcrEngine for TesseractOcr {
        type Crop = Mat;

        /// Expects a single channel, continuous crop as made by [`crop_plate`].
        fn read_text(&mut self, crop: &Mat) -> Result<Vec<RawCandidate>> {
            let cols = crop.cols();
            let rows = crop.rows();
            self.ocr
                .raw
                .set_image(crop.data_bytes()?, cols, rows, 1, cols)
                .map_err(tess_error)?;
            let text = self.ocr.get_utf8_text().map_err(tess_error)?;
            let score = (self.ocr.mean_text_conf() as f64 / 100.0).clamp(0.0, 1.0);
            debug!("Tesseract read {:?} ({:.2})", text.trim(), score);

            let (w, h) = (cols as f64, rows as f64);
            Ok(vec![RawCandidate {
                text: text.trim().to_string(),
                score,
                bbox: [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]],
            }])
        }
    }

    /// Grayscale crop of `bbox`, trimmed by the configured margins and
    /// clamped to the frame.
    pub fn crop_plate(frame: &Mat, bbox: &BBox, margins: &CropConfig) -> Result<Mat> {
        let (w, h) = (bbox.width(), bbox.height());
        let x1 = (bbox.x1 + w * margins.margin_left).max(0.0) as i32;
        let y1 = (bbox.y1 + h * margins.margin_top).max(0.0) as i32;
        let x2 = ((bbox.x2 - w * margins.margin_right) as i32).min(frame.cols());
        let y2 = ((bbox.y2 - h * margins.margin_bottom) as i32).min(frame.rows());
        if x2 <= x1 || y2 <= y1 {
            return Err(Error::MalformedBBox(bbox.to_string()));
        }

        let cropped = Mat::roi(frame, Rect::new(x1, y1, x2 - x1, y2 - y1))?;
        let mut grey = Mat::default();
        cvt_color(&cropped, &mut grey, COLOR_BGR2GRAY, 0)?;
        // Make it contiguous
        Ok(grey.try_clone()?)
    }
}
