use super::{AssociationRecord, BBox};

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// The highest scoring reading seen for one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct BestReading {
    pub car_id: i64,
    pub frame: u64,
    pub car_bbox: BBox,
    pub plate_bbox: BBox,
    pub text: String,
    pub score: f64,
}

impl BestReading {
    fn from_record(record: &AssociationRecord) -> Option<Self> {
        Some(Self {
            car_id: record.car_id,
            frame: record.frame,
            car_bbox: record.car_bbox,
            plate_bbox: record.plate_bbox,
            text: record.plate_text.clone()?,
            score: record.plate_text_score?,
        })
    }
}

/// Reduce the complete association table to one reading per vehicle.
///
/// Records without a reading, or with a NaN score, are ignored. Among the
/// rest the maximum `plate_text_score` wins; on a tie the record that comes
/// first in table order is kept.
pub fn best_readings(records: &[AssociationRecord]) -> BTreeMap<i64, BestReading> {
    let mut best = BTreeMap::new();
    for candidate in records
        .iter()
        .filter_map(BestReading::from_record)
        .filter(|candidate| !candidate.score.is_nan())
    {
        match best.entry(candidate.car_id) {
            Entry::Vacant(entry) => {
                entry.insert(candidate);
            }
            Entry::Occupied(mut entry) => {
                if candidate.score > entry.get().score {
                    entry.insert(candidate);
                }
            }
        }
    }
    best
}
