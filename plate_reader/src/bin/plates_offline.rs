use clap::Parser;
use log::{debug, info};
use std::error::Error;
use std::path::PathBuf;

use plate_reader::config::PipelineConfig;
use plate_reader::logging;
use plate_reader::plate_detection::associator::Associator;
use plate_reader::plate_detection::best_reading::best_readings;
use plate_reader::plate_detection::detections::DetectionReader;
use plate_reader::plate_detection::dnn_ocr::{PlateTextResolver, RecordedOcr};
use plate_reader::plate_detection::results_csv::write_csv_file;

/// Associate recorded plate detections with vehicle tracks, read the plates
/// and export the results table.
#[derive(Parser)]
#[command(name = "plates_offline")]
#[command(version)]
struct Cli {
    /// Detector and tracker output, one JSON object per frame
    #[arg(long)]
    detections: PathBuf,

    /// Results table to write
    #[arg(long, default_value = "./test.csv")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source video; plates without recorded OCR candidates are read live
    #[cfg(feature = "vision")]
    #[arg(long)]
    video: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    let resolver = PlateTextResolver::new();
    let mut recorded = RecordedOcr;
    #[cfg(feature = "vision")]
    let mut live = match &cli.video {
        Some(video) => Some(live::LiveOcr::open(video, &config)?),
        None => None,
    };

    let mut associator = Associator::new();
    let mut frames = 0u64;
    for frame in DetectionReader::open(&cli.detections)? {
        let frame = frame?;
        let plates = frame.plate_detections();
        associator.process_frame(frame.frame, &frame.vehicles, &plates, |plate| {
            if let Some(candidates) = frame.candidates_for(plate) {
                return resolver.read_license_plate(&mut recorded, candidates);
            }
            #[cfg(feature = "vision")]
            if let Some(live) = live.as_mut() {
                return live.read(&resolver, frame.frame, plate);
            }
            debug!("Frame {}: no OCR candidates for plate {}", frame.frame, plate.bbox);
            Ok(None)
        })?;

        frames += 1;
        if config.render.progress_every > 0 && frames % config.render.progress_every == 0 {
            info!("Processed {} frames...", frames);
        }
    }

    let records = associator.into_records();
    write_csv_file(&records, &cli.output)?;

    let best = best_readings(&records);
    for reading in best.values() {
        info!(
            "Car {}: {} ({:.3}) at frame {}",
            reading.car_id, reading.text, reading.score, reading.frame
        );
    }
    info!("Done: {} frames, {} vehicles with a plate", frames, best.len());

    Ok(())
}

#[cfg(feature = "vision")]
mod live {
    use plate_reader::config::{CropConfig, PipelineConfig};
    use plate_reader::error::{Error, Result};
    use plate_reader::plate_detection::dnn_ocr::{crop_plate, PlateTextResolver, TesseractOcr};
    use plate_reader::plate_detection::video_reader::VideoReader;
    use plate_reader::plate_detection::{PlateDetection, PlateReading};

    use opencv::prelude::Mat;
    use std::path::Path;

    /// Tesseract over crops of the source video, one decoded frame at a time.
    pub struct LiveOcr {
        video: VideoReader,
        engine: TesseractOcr,
        margins: CropConfig,
        current: Option<(u64, Mat)>,
    }

    impl LiveOcr {
        pub fn open(path: &Path, config: &PipelineConfig) -> Result<Self> {
            let path = path
                .to_str()
                .ok_or_else(|| Error::Io(std::io::Error::other("video path is not UTF-8")))?;
            Ok(Self {
                video: VideoReader::open(path)?,
                engine: TesseractOcr::new(&config.ocr)?,
                margins: config.crop.clone(),
                current: None,
            })
        }

        pub fn read(
            &mut self,
            resolver: &PlateTextResolver,
            frame: u64,
            plate: &PlateDetection,
        ) -> Result<Option<PlateReading>> {
            if self.current.as_ref().map(|(n, _)| *n) != Some(frame) {
                let image = self
                    .video
                    .frame_at(frame)?
                    .ok_or(Error::MissingFrame(frame))?;
                self.current = Some((frame, image));
            }
            let Some((_, image)) = &self.current else {
                return Ok(None);
            };
            let crop = crop_plate(image, &plate.bbox, &self.margins)?;
            resolver.read_license_plate(&mut self.engine, &crop)
        }
    }
}
