//! The association table on disk.
//!
//! Columns: `frame_nmr, car_id, car_bbox, license_plate_bbox,
//! license_plate_bbox_score, license_number, license_number_score`, boxes as
//! `[x1 y1 x2 y2]`. Only records with both a vehicle and a reading are
//! written.

use super::{AssociationRecord, BBox};
use crate::error::{Error, Result};

use csv::StringRecord;
use log::info;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

pub const HEADER: [&str; 7] = [
    "frame_nmr",
    "car_id",
    "car_bbox",
    "license_plate_bbox",
    "license_plate_bbox_score",
    "license_number",
    "license_number_score",
];

/// Write the rows of `records` that have a vehicle and a reading, in table
/// order. Returns the number of rows written.
pub fn write_csv<W: Write>(records: &[AssociationRecord], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;

    let mut rows = 0;
    for record in records.iter().filter(|r| r.has_vehicle()) {
        if let (Some(text), Some(text_score)) = (&record.plate_text, record.plate_text_score) {
            csv_writer.write_record([
                record.frame.to_string(),
                record.car_id.to_string(),
                record.car_bbox.to_string(),
                record.plate_bbox.to_string(),
                record.plate_bbox_score.to_string(),
                text.clone(),
                text_score.to_string(),
            ])?;
            rows += 1;
        }
    }
    csv_writer.flush()?;
    Ok(rows)
}

pub fn write_csv_file(records: &[AssociationRecord], path: &Path) -> Result<usize> {
    let rows = write_csv(records, File::create(path)?)?;
    info!("Wrote {} rows to {}", rows, path.display());
    Ok(rows)
}

/// Read a table written by [`write_csv`] back into records.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<AssociationRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let columns = Columns::locate(csv_reader.headers()?)?;

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        // header is row 1
        records.push(columns.parse(&row?, i + 2)?);
    }
    Ok(records)
}

pub fn read_csv_file(path: &Path) -> Result<Vec<AssociationRecord>> {
    let records = read_csv(File::open(path)?)?;
    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Position of each known column in the header row.
struct Columns([usize; 7]);

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let mut positions = [0; 7];
        for (position, name) in positions.iter_mut().zip(HEADER) {
            *position = headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(Error::MissingField { row: 1, field: name })?;
        }
        Ok(Self(positions))
    }

    fn field<'r>(&self, row: &'r StringRecord, column: usize, line: usize) -> Result<&'r str> {
        row.get(self.0[column])
            .map(str::trim)
            .ok_or(Error::MissingField {
                row: line,
                field: HEADER[column],
            })
    }

    fn number<T: FromStr>(&self, row: &StringRecord, column: usize, line: usize) -> Result<T> {
        self.field(row, column, line)?
            .parse()
            .map_err(|_| Error::MissingField {
                row: line,
                field: HEADER[column],
            })
    }

    fn parse(&self, row: &StringRecord, line: usize) -> Result<AssociationRecord> {
        let car_id = match self.number::<i64>(row, 1, line) {
            Ok(id) => id,
            // trackers emit float ids
            Err(_) => self.number::<f64>(row, 1, line)? as i64,
        };
        let text = self.field(row, 5, line)?;

        Ok(AssociationRecord {
            frame: self.number(row, 0, line)?,
            car_id,
            car_bbox: self.field(row, 2, line)?.parse::<BBox>()?,
            plate_bbox: self.field(row, 3, line)?.parse::<BBox>()?,
            plate_bbox_score: self.number(row, 4, line)?,
            plate_text: (!text.is_empty()).then(|| text.to_string()),
            plate_text_score: Some(self.number(row, 6, line)?),
        })
    }
}
