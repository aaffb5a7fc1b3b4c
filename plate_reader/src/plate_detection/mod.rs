pub mod associator;
pub mod best_reading;
pub mod bounding_box_render;
pub mod detections;
pub mod dnn_ocr;
pub mod plate_format;
pub mod results_csv;
pub mod vehicle_matcher;
#[cfg(feature = "vision")]
pub mod video_reader;

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use plate_format::{CharClass, PlateFormat};

/// Axis aligned box in pixel coordinates, `(x1, y1)` top left and `(x2, y2)`
/// bottom right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// True when `inner` lies strictly inside `self` on all four edges.
    pub fn strictly_contains(&self, inner: &BBox) -> bool {
        inner.x1 > self.x1 && inner.y1 > self.y1 && inner.x2 < self.x2 && inner.y2 < self.y2
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

/// Formats as `[x1 y1 x2 y2]`, the layout of the results table. Whole
/// coordinates keep their fractional part (`100.0`).
impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?} {:?} {:?} {:?}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Parses `[x1 y1 x2 y2]`. Padding spaces inside the brackets and comma
/// separators are tolerated.
impl FromStr for BBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedBBox(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(malformed)?;

        let values = inner
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [x1, y1, x2, y2] => Ok(BBox::new(*x1, *y1, *x2, *y2)),
            _ => Err(malformed()),
        }
    }
}

/// A tracked vehicle in one frame, as produced by the external tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct VehicleTrack {
    pub bbox: BBox,
    pub id: i64,
}

impl VehicleTrack {
    /// Id carried by [`VehicleTrack::none`].
    pub const NO_VEHICLE_ID: i64 = -1;

    pub fn new(bbox: BBox, id: i64) -> Self {
        Self { bbox, id }
    }

    /// The `(-1, -1, -1, -1, -1)` sentinel for a plate outside every vehicle.
    pub fn none() -> Self {
        Self {
            bbox: BBox::new(-1.0, -1.0, -1.0, -1.0),
            id: Self::NO_VEHICLE_ID,
        }
    }

    pub fn is_none(&self) -> bool {
        self.id == Self::NO_VEHICLE_ID
    }
}

impl From<[f64; 5]> for VehicleTrack {
    fn from([x1, y1, x2, y2, id]: [f64; 5]) -> Self {
        Self {
            bbox: BBox::new(x1, y1, x2, y2),
            id: id as i64,
        }
    }
}

impl From<VehicleTrack> for [f64; 5] {
    fn from(track: VehicleTrack) -> Self {
        let [x1, y1, x2, y2]: [f64; 4] = track.bbox.into();
        [x1, y1, x2, y2, track.id as f64]
    }
}

/// A plate found by the external detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateDetection {
    pub bbox: BBox,
    pub score: f64,
    #[serde(default)]
    pub class_id: i64,
}

/// Four corner points of the text region reported by the OCR engine.
pub type Quad = [[f64; 2]; 4];

/// One OCR hypothesis for a plate crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub text: String,
    pub score: f64,
    #[serde(default)]
    pub bbox: Quad,
}

impl RawCandidate {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            score,
            bbox: Quad::default(),
        }
    }
}

/// A validated and corrected plate string with the score of the candidate it
/// came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    pub text: String,
    pub format: PlateFormat,
    pub score: f64,
}

/// One row of the association table: a plate detection in a frame, the
/// vehicle that encloses it and its reading, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRecord {
    pub frame: u64,
    pub car_id: i64,
    pub car_bbox: BBox,
    pub plate_bbox: BBox,
    pub plate_bbox_score: f64,
    pub plate_text: Option<String>,
    pub plate_text_score: Option<f64>,
}

impl AssociationRecord {
    pub fn new(
        frame: u64,
        car: &VehicleTrack,
        plate: &PlateDetection,
        reading: Option<PlateReading>,
    ) -> Self {
        let (plate_text, plate_text_score) = match reading {
            Some(reading) => (Some(reading.text), Some(reading.score)),
            None => (None, None),
        };
        Self {
            frame,
            car_id: car.id,
            car_bbox: car.bbox,
            plate_bbox: plate.bbox,
            plate_bbox_score: plate.score,
            plate_text,
            plate_text_score,
        }
    }

    pub fn has_vehicle(&self) -> bool {
        self.car_id != VehicleTrack::NO_VEHICLE_ID
    }

    pub fn has_reading(&self) -> bool {
        self.plate_text.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_display_is_bracketed_and_space_separated() {
        assert_eq!(BBox::new(1.5, 2.0, 30.25, 4.0).to_string(), "[1.5 2.0 30.25 4.0]");
    }

    #[test]
    fn bbox_parses_padded_and_comma_forms() {
        let expected = BBox::new(12.5, 3.0, 40.0, 8.0);
        assert_eq!("[12.5 3 40 8]".parse::<BBox>().unwrap(), expected);
        assert_eq!("[ 12.5   3  40 8 ]".parse::<BBox>().unwrap(), expected);
        assert_eq!("[12.5, 3, 40, 8]".parse::<BBox>().unwrap(), expected);
    }

    #[test]
    fn bbox_rejects_malformed_cells() {
        for cell in ["12.5 3 40 8", "[12.5 3 40]", "[a b c d]", "[1 2 3 4 5]", ""] {
            assert!(
                matches!(cell.parse::<BBox>(), Err(Error::MalformedBBox(_))),
                "{cell:?} should not parse"
            );
        }
    }

    #[test]
    fn containment_is_strict() {
        let car = BBox::new(100.0, 100.0, 300.0, 300.0);
        assert!(car.strictly_contains(&BBox::new(150.0, 150.0, 200.0, 180.0)));
        assert!(!car.strictly_contains(&BBox::new(100.0, 150.0, 200.0, 180.0)));
        assert!(!car.strictly_contains(&BBox::new(150.0, 150.0, 300.0, 180.0)));
    }

    #[test]
    fn vehicle_track_reads_tracker_rows() {
        let track: VehicleTrack = serde_json::from_str("[1, 2, 3, 4, 7.0]").unwrap();
        assert_eq!(track, VehicleTrack::new(BBox::new(1.0, 2.0, 3.0, 4.0), 7));
        assert!(VehicleTrack::none().is_none());
    }

    #[test]
    fn record_without_reading_has_no_text_or_score() {
        let plate = PlateDetection {
            bbox: BBox::new(1.0, 1.0, 2.0, 2.0),
            score: 0.8,
            class_id: 0,
        };
        let record = AssociationRecord::new(3, &VehicleTrack::none(), &plate, None);
        assert!(!record.has_vehicle());
        assert!(!record.has_reading());
        assert_eq!(record.plate_text_score, None);
        assert_eq!(record.car_bbox, BBox::new(-1.0, -1.0, -1.0, -1.0));
    }
}
