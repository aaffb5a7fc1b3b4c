use super::vehicle_matcher::get_car;
use super::{AssociationRecord, PlateDetection, PlateReading, VehicleTrack};
use crate::error::{Error, Result};

use log::debug;
use std::collections::HashMap;

/// Accumulates the association table over a run, one frame at a time.
///
/// Frames must arrive in non-decreasing order. Within a frame each vehicle
/// keeps a single record: a later plate matched to the same vehicle
/// replaces the earlier one in place, unless the later plate has no reading
/// and the earlier one does. Plates outside every vehicle are kept with the
/// `-1` sentinel and are never sent to OCR.
#[derive(Debug, Default)]
pub struct Associator {
    records: Vec<AssociationRecord>,
    current_frame: Option<u64>,
    // car_id -> index into `records` for the current frame
    frame_index: HashMap<i64, usize>,
}

impl Associator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate the plates of one frame with its vehicle tracks.
    ///
    /// `read_plate` is called for every plate that lies inside a vehicle and
    /// returns its reading, if any.
    pub fn process_frame<F>(
        &mut self,
        frame: u64,
        tracks: &[VehicleTrack],
        plates: &[PlateDetection],
        mut read_plate: F,
    ) -> Result<()>
    where
        F: FnMut(&PlateDetection) -> Result<Option<PlateReading>>,
    {
        match self.current_frame {
            Some(previous) if frame < previous => return Err(Error::FrameOutOfOrder { frame, previous }),
            Some(previous) if frame == previous => {}
            _ => {
                self.current_frame = Some(frame);
                self.frame_index.clear();
            }
        }
        debug!(
            "Frame {}: {} vehicles, {} plates",
            frame,
            tracks.len(),
            plates.len()
        );

        for plate in plates {
            let car = get_car(&plate.bbox, tracks);
            if car.is_none() {
                self.records
                    .push(AssociationRecord::new(frame, &car, plate, None));
                continue;
            }

            let reading = read_plate(plate)?;
            let record = AssociationRecord::new(frame, &car, plate, reading);
            match self.frame_index.get(&car.id) {
                Some(&index) => {
                    if record.has_reading() || !self.records[index].has_reading() {
                        self.records[index] = record;
                    } else {
                        debug!(
                            "Frame {}: kept the earlier reading for car {}",
                            frame, car.id
                        );
                    }
                }
                None => {
                    self.frame_index.insert(car.id, self.records.len());
                    self.records.push(record);
                }
            }
        }

        Ok(())
    }

    pub fn records(&self) -> &[AssociationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AssociationRecord> {
        self.records
    }
}
