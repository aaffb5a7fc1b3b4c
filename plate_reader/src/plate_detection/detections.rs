//! Recorded detector and tracker output, one JSON object per frame.
//!
//! ```text
//! {"frame": 0,
//!  "vehicles": [[x1, y1, x2, y2, track_id], ...],
//!  "plates": [{"bbox": [x1, y1, x2, y2], "score": 0.9, "class_id": 0,
//!              "candidates": [{"text": "MH20DV2366", "score": 0.8,
//!                              "bbox": [[x, y], [x, y], [x, y], [x, y]]}]}]}
//! ```
//!
//! `candidates` is the OCR engine's output for that plate crop and may be
//! left out when OCR is run live.

use super::{PlateDetection, RawCandidate, VehicleTrack};
use crate::error::Result;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame: u64,
    #[serde(default)]
    pub vehicles: Vec<VehicleTrack>,
    #[serde(default)]
    pub plates: Vec<RecordedPlate>,
}

impl FrameDetections {
    pub fn plate_detections(&self) -> Vec<PlateDetection> {
        self.plates.iter().map(|plate| plate.detection).collect()
    }

    /// Recorded OCR candidates for `detection`, if any were stored.
    pub fn candidates_for(&self, detection: &PlateDetection) -> Option<&[RawCandidate]> {
        self.plates
            .iter()
            .find(|plate| plate.detection == *detection)
            .and_then(|plate| plate.candidates.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPlate {
    #[serde(flatten)]
    pub detection: PlateDetection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<RawCandidate>>,
}

/// Iterator over the frames of a JSON Lines detections file. Blank lines
/// are skipped.
pub struct DetectionReader<R> {
    lines: Lines<R>,
}

impl<R: BufRead> DetectionReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl DetectionReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for DetectionReader<R> {
    type Item = Result<FrameDetections>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(Into::into));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::plate_detection::BBox;

    const FRAMES: &str = r#"{"frame": 0, "vehicles": [[100, 100, 300, 300, 1]], "plates": [{"bbox": [150, 150, 200, 180], "score": 0.9, "class_id": 0, "candidates": [{"text": "MH2ODV2366", "score": 0.8}]}]}

{"frame": 1, "vehicles": [], "plates": [{"bbox": [1, 2, 3, 4], "score": 0.4}]}
"#;

    #[test]
    fn reads_frames_and_skips_blank_lines() {
        let frames: Vec<FrameDetections> = DetectionReader::new(FRAMES.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);

        let first = &frames[0];
        assert_eq!(first.vehicles[0].id, 1);
        let detections = first.plate_detections();
        assert_eq!(detections[0].bbox, BBox::new(150.0, 150.0, 200.0, 180.0));
        let candidates = first.candidates_for(&detections[0]).unwrap();
        assert_eq!(candidates[0].text, "MH2ODV2366");

        let second = &frames[1];
        assert_eq!(second.plates[0].detection.class_id, 0);
        assert_eq!(second.candidates_for(&second.plate_detections()[0]), None);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut reader = DetectionReader::new(r#"{"frame": 0, "vehicles": [[1, 2, 3]]}"#.as_bytes());
        assert!(matches!(reader.next(), Some(Err(Error::Json(_)))));
    }
}
