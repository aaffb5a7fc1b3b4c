use std::fs;
use std::io::Write;

use plate_reader::config::PipelineConfig;
use plate_reader::plate_detection::associator::Associator;
use plate_reader::plate_detection::best_reading::best_readings;
use plate_reader::plate_detection::detections::DetectionReader;
use plate_reader::plate_detection::dnn_ocr::{PlateTextResolver, RecordedOcr};
use plate_reader::plate_detection::results_csv::{read_csv_file, write_csv_file};
use plate_reader::plate_detection::BBox;

const DETECTIONS: &str = r#"{"frame": 0, "vehicles": [[100, 100, 300, 300, 5], [400, 400, 600, 600, 6]], "plates": [{"bbox": [150, 150, 200, 180], "score": 0.91, "class_id": 0, "candidates": [{"text": "XX-garbage", "score": 0.99}, {"text": "MH2ODV2366", "score": 0.7}]}, {"bbox": [700, 700, 750, 720], "score": 0.5, "candidates": [{"text": "KA01AB1234", "score": 0.9}]}]}
{"frame": 1, "vehicles": [[100, 100, 300, 300, 5], [400, 400, 600, 600, 6]], "plates": [{"bbox": [151, 151, 201, 181], "score": 0.93, "candidates": [{"text": "MH 20 DV 2366", "score": 0.9}]}, {"bbox": [450, 450, 500, 470], "score": 0.8, "candidates": [{"text": "unreadable", "score": 0.95}]}]}
{"frame": 2, "vehicles": [[100, 100, 300, 300, 5], [400, 400, 600, 600, 6]], "plates": [{"bbox": [152, 152, 202, 182], "score": 0.94, "candidates": [{"text": "MH20DV2368", "score": 0.9}]}, {"bbox": [450, 450, 500, 470], "score": 0.8, "candidates": [{"text": "228H1234AA", "score": 0.4}]}]}
"#;

fn run(detections: &str) -> Associator {
    let resolver = PlateTextResolver::new();
    let mut engine = RecordedOcr;
    let mut associator = Associator::new();
    for frame in DetectionReader::new(detections.as_bytes()) {
        let frame = frame.unwrap();
        let plates = frame.plate_detections();
        associator
            .process_frame(frame.frame, &frame.vehicles, &plates, |plate| {
                let candidates = frame.candidates_for(plate).unwrap_or_default();
                resolver.read_license_plate(&mut engine, candidates)
            })
            .unwrap();
    }
    associator
}

#[test]
fn accumulate_export_and_reduce() {
    let associator = run(DETECTIONS);
    let records = associator.records();
    // frame 0: car 5 read, stray plate unmatched; frame 1: both cars; frame 2: both cars
    assert_eq!(records.len(), 6);
    assert_eq!(records[1].car_id, -1);
    assert_eq!(records[0].plate_text.as_deref(), Some("MH20DV2366"));
    assert_eq!(records[0].plate_text_score, Some(0.7));
    assert!(!records[3].has_reading());

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("test.csv");
    let rows = write_csv_file(records, &csv_path).unwrap();
    assert_eq!(rows, 4);

    let content = fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("frame_nmr,car_id,car_bbox,license_plate_bbox,"));
    assert!(content.contains("0,5,[100.0 100.0 300.0 300.0],[150.0 150.0 200.0 180.0],0.91,MH20DV2366,0.7"));
    assert!(!content.contains("KA01AB1234"));

    let table = read_csv_file(&csv_path).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table.iter().all(|r| r.has_vehicle() && r.has_reading()));

    let best = best_readings(&table);
    assert_eq!(best.len(), 2);
    // 0.9 at frames 1 and 2: the earlier one wins
    assert_eq!(best[&5].frame, 1);
    assert_eq!(best[&5].text, "MH20DV2366");
    assert_eq!(best[&5].plate_bbox, BBox::new(151.0, 151.0, 201.0, 181.0));
    assert_eq!(best[&6].text, "22BH1234AA");
    assert_eq!(best[&6].score, 0.4);

    // the reduction is the same before and after the round trip through disk
    assert_eq!(best_readings(records), best);
}

#[test]
fn out_of_order_frames_abort_the_run() {
    let detections = "{\"frame\": 3}\n{\"frame\": 2}\n";
    let mut associator = Associator::new();
    let mut results = DetectionReader::new(detections.as_bytes())
        .map(|frame| {
            let frame = frame?;
            associator.process_frame(frame.frame, &frame.vehicles, &frame.plate_detections(), |_| Ok(None))
        })
        .collect::<Vec<_>>()
        .into_iter();
    assert!(results.next().unwrap().is_ok());
    assert!(results.next().unwrap().is_err());
}

#[test]
fn config_file_overrides_render_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[render]\ncrop_height = 200\nprogress_every = 10").unwrap();

    let config = PipelineConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.render.crop_height, 200);
    assert_eq!(config.render.progress_every, 10);
    assert_eq!(config.render.crop_gap, 100);
    assert_eq!(config.ocr, PipelineConfig::default().ocr);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(matches!(err, plate_reader::Error::Io(_)));
}
