//! Pull cursor over framed files.

mod common;

use std::io::Write;

use common::{write_records, RunBuilder};
use rust_hessio::accessor::{Sentinel, NO_DATA, TEL_INDEX_NOT_VALID};
use rust_hessio::cursor::PullCursor;
use rust_hessio::records::{PixelTiming, RecordKind, TelEvent, TriggeredEvent};
use rust_hessio::stream::{MemorySource, SYNC_MARKER};
use rust_hessio::HessioError;

fn sample_run() -> RunBuilder {
    let mut run = RunBuilder::new(103, &[1, 2, 3]);
    run.camera(1, 4, 400.0)
        .camera(2, 4, 100.0)
        .calibration(1, 4, 10.0, 1.0)
        .mc_run_header()
        .shower(1, 1.5)
        .event(100, &[1, 2], 4, 60)
        .shower(2, 0.2)
        .event(101, &[2], 4, 20);
    run
}

#[test]
fn reads_events_from_framed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run103.sim");
    sample_run().write_to(&path);

    let mut cursor = PullCursor::new();
    cursor.open(&path).unwrap();

    let first = cursor.advance().unwrap().unwrap();
    assert_eq!(first.event_id, 100);
    assert_eq!(first.run, 103);
    {
        let acc = cursor.accessor();
        assert_eq!(acc.num_telescopes(), Ok(3));
        assert_eq!(acc.num_teldata(), Ok(2));
        assert_eq!(acc.global_event_count(), Ok(100));
        assert_eq!(acc.num_pixels(1), Ok(4));
        assert_eq!(acc.num_gains(1), Ok(2));
        assert_eq!(acc.mirror_area(1), Ok(400.0));
        assert_eq!(acc.adc_sum(2, 0), Ok(vec![60; 4]));
        assert_eq!(acc.mc_shower_energy(), Ok(1.5));
        assert_eq!(acc.mc_event_core(), Ok((12.5, -3.0)));
        // (60 - 10) * 1.0 * 0.92
        let amplitudes = acc.calibrated_amplitudes(1).unwrap();
        assert!((amplitudes[3] - 46.0).abs() < 1e-9);
    }

    let second = cursor.advance().unwrap().unwrap();
    assert_eq!(second.event_id, 101);
    assert_eq!(second.generation, first.generation);
    {
        let acc = cursor.accessor();
        assert_eq!(acc.teldata_list(), Ok(vec![2]));
        // Telescope 1 did not report in this event.
        assert_eq!(acc.adc_sum(1, 0).map_err(|e| e.code()), Err(NO_DATA));
        assert_eq!(acc.num_pixels(42).or_sentinel(), i64::from(TEL_INDEX_NOT_VALID));
        assert_eq!(acc.mc_shower_energy(), Ok(0.2));
    }

    assert_eq!(cursor.advance().unwrap(), None);
    assert!(cursor.is_terminated());
    assert_eq!(cursor.events(), 2);
    // The last run stays readable after the end of the input.
    assert_eq!(cursor.accessor().run_number(), Ok(103));
}

#[test]
fn truncated_file_fails_once_then_stays_at_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.sim");
    sample_run().write_to(&path);
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    // Header of a record whose payload never arrives.
    file.write_all(&SYNC_MARKER.to_le_bytes()).unwrap();
    file.write_all(&RecordKind::Event.code().to_le_bytes()).unwrap();
    file.write_all(&102i32.to_le_bytes()).unwrap();
    file.write_all(&64u32.to_le_bytes()).unwrap();
    drop(file);

    let mut cursor = PullCursor::new();
    cursor.open(&path).unwrap();
    assert!(cursor.advance().unwrap().is_some());
    assert!(cursor.advance().unwrap().is_some());
    let err = cursor.advance().unwrap_err();
    assert!(matches!(err, HessioError::Framing(_)));
    assert!(cursor.is_terminated());
    assert_eq!(cursor.advance().unwrap(), None);
    assert_eq!(cursor.advance().unwrap(), None);
}

#[test]
fn unknown_telescope_configuration_terminates_cursor() {
    let mut run = RunBuilder::new(5, &[1]);
    run.camera(9, 2, 100.0).event(1, &[1], 2, 3);
    let mut cursor = PullCursor::new();
    cursor.bind(run.source()).unwrap();

    let err = cursor.advance().unwrap_err();
    assert!(matches!(err, HessioError::UnknownTelescope { tel_id: 9, .. }));
    assert_eq!(cursor.advance().unwrap(), None);
}

#[test]
fn calibration_events_do_not_stop_the_cursor() {
    let mut run = RunBuilder::new(8, &[1]);
    let calibration = rust_hessio::records::CalibrationEvent {
        calibration_type: 2,
        event: TriggeredEvent::default(),
    };
    run.push(RecordKind::CalibrationEvent, 1, &calibration)
        .event(2, &[1], 2, 7);

    let mut cursor = PullCursor::new();
    cursor.bind(run.source()).unwrap();
    let handle = cursor.advance().unwrap().unwrap();
    assert_eq!(handle.event_id, 2);
    assert_eq!(cursor.stats().calibration_events, 1);
    assert_eq!(cursor.advance().unwrap(), None);
}

#[test]
fn timing_accessors_need_timing_data() {
    let mut run = RunBuilder::new(9, &[1, 2]);
    let event = TriggeredEvent {
        central: Default::default(),
        tel_events: vec![TelEvent {
            tel_id: 1,
            raw: Some(common::adc(2, 1)),
            timing: Some(PixelTiming {
                num_pixels: 2,
                time_type: vec![1, 2],
                time_level: vec![0.2, 0.5],
                threshold: 5,
                peak_global: 12.5,
                timval: vec![vec![3.0, 4.0], vec![5.0, 6.0]],
            }),
            ..Default::default()
        }],
    };
    run.push(RecordKind::Event, 1, &event);

    let mut cursor = PullCursor::new();
    cursor.bind(run.source()).unwrap();
    cursor.advance().unwrap().unwrap();
    let acc = cursor.accessor();
    assert_eq!(acc.num_types(1), Ok(2));
    assert_eq!(acc.pixel_timing_threshold(1), Ok(5));
    assert_eq!(acc.pixel_timing_peak_global(1), Ok(12.5));
    assert_eq!(acc.pixel_timing_timval(1).unwrap()[1], vec![5.0, 6.0]);
    assert_eq!(acc.pixel_timing_threshold(2).or_sentinel(), NO_DATA);
    assert!(acc.pixel_timing_peak_global(2).or_sentinel().is_nan());
}

#[test]
fn rebinding_releases_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("second.sim");
    let mut second = RunBuilder::new(2, &[7]);
    second.event(1, &[7], 1, 1);
    write_records(&path, &second.build());

    let mut cursor = PullCursor::new();
    cursor.bind(sample_run().source()).unwrap();
    assert!(cursor.advance().unwrap().is_some());

    cursor.bind(MemorySource::new(Vec::new())).unwrap();
    assert!(cursor.accessor().run_number().is_err());
    assert_eq!(cursor.advance().unwrap(), None);

    cursor.open(&path).unwrap();
    assert_eq!(cursor.advance().unwrap().map(|h| h.run), Some(2));
}
