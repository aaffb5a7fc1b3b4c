use clap::Parser;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::path::PathBuf;

use plate_reader::config::PipelineConfig;
use plate_reader::logging;
use plate_reader::plate_detection::best_reading::best_readings;
use plate_reader::plate_detection::bounding_box_render::{plate_overlay, BoundingBoxRender, RenderOutcome};
use plate_reader::plate_detection::results_csv::read_csv_file;
use plate_reader::plate_detection::video_reader::{open_writer, write_frame, VideoReader};
use plate_reader::plate_detection::AssociationRecord;

/// Overlay each vehicle's best plate reading onto the source video.
#[derive(Parser)]
#[command(name = "plates_render")]
#[command(version)]
struct Cli {
    /// Source video
    #[arg(long)]
    video: String,

    /// Results table written by plates_offline
    #[arg(long, default_value = "./test.csv")]
    results: PathBuf,

    /// Annotated video to write
    #[arg(long, default_value = "./out.mp4")]
    output: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    let records = read_csv_file(&cli.results)?;
    let mut by_frame: BTreeMap<u64, Vec<&AssociationRecord>> = BTreeMap::new();
    for record in &records {
        by_frame.entry(record.frame).or_default().push(record);
    }

    let mut video = VideoReader::open(&cli.video)?;

    let mut overlays = HashMap::new();
    for (car_id, best) in best_readings(&records) {
        let Some(frame) = video.frame_at(best.frame)? else {
            warn!("Car {}: frame {} of its best reading is missing", car_id, best.frame);
            continue;
        };
        match plate_overlay(&frame, &best, &config.render)? {
            Some(overlay) => {
                overlays.insert(car_id, overlay);
            }
            None => warn!("Car {}: plate box {} cannot be cropped", car_id, best.plate_bbox),
        }
    }
    info!("Prepared plate crops for {} vehicles", overlays.len());

    let render = BoundingBoxRender::new(config.render.clone(), overlays);
    let mut writer = open_writer(&cli.output, video.fps()?, video.frame_size()?)?;

    video.seek(0)?;
    let mut skipped = 0;
    loop {
        let frame_nmr = video.position();
        let Some(mut frame) = video.read_frame()? else {
            break;
        };

        if let Some(rows) = by_frame.get(&frame_nmr) {
            let outcomes = render.render_frame(&mut frame, frame_nmr, rows.iter().copied());
            skipped += outcomes
                .iter()
                .filter(|outcome| matches!(outcome, RenderOutcome::Skipped(_)))
                .count();
        }

        write_frame(&mut writer, &frame)?;
        let progress_every = render.config().progress_every;
        if progress_every > 0 && frame_nmr % progress_every == 0 {
            info!("Processed {} frames...", frame_nmr);
        }
    }

    info!("Wrote {} ({} overlays skipped)", cli.output, skipped);
    Ok(())
}
