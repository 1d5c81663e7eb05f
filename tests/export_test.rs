//! Table export to CSV through batch ingestion.
#![cfg(feature = "storage_csv")]

mod common;

use std::path::Path;

use common::RunBuilder;
use rust_hessio::export::{CsvSink, SinkRegistry};
use rust_hessio::ingest::{BatchIngest, IngestOptions};
use rust_hessio::layout::LayoutCatalog;

fn rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn column(path: &Path, name: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_path(path)
        .unwrap();
    let idx = reader
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == name)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap()[idx].to_string())
        .collect()
}

fn two_telescope_run(run: i32) -> RunBuilder {
    let mut builder = RunBuilder::new(run, &[1, 2]);
    builder
        .camera(1, 3, 400.0)
        .camera(2, 2, 100.0)
        .mc_run_header()
        .shower(1, 2.0)
        .event(1, &[1, 2], 3, 40)
        .shower(2, 0.7)
        .event(2, &[1], 3, 41);
    builder
}

#[test]
fn writes_four_tables_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(dir.path()).unwrap();
    let mut ingest = BatchIngest::new(IngestOptions::default()).with_exporter(Box::new(sink));
    ingest
        .process_source(&mut two_telescope_run(11).source())
        .unwrap();
    let stats = ingest.finish().unwrap();
    assert_eq!(stats.failures, 0);

    let header = rows(&dir.path().join("HEADER_RUN.csv"));
    assert_eq!(header.len(), 1);
    assert_eq!(header[0][0], "11");
    assert_eq!(header[0][1], "2017-07-14T02:40:00+00:00");
    assert_eq!(header[0][12], "2");

    let telescopes = dir.path().join("HEADER_TEL_11.csv");
    assert_eq!(column(&telescopes, "tel_id"), vec!["1", "2"]);
    assert_eq!(column(&telescopes, "num_mirrors"), vec!["198", "198"]);
    assert_eq!(column(&telescopes, "tel_pos_x"), vec!["0", "10"]);

    let pixels = dir.path().join("HEADER_CAM_11.csv");
    assert_eq!(rows(&pixels).len(), 5);
    assert_eq!(column(&pixels, "drawer"), vec!["0", "1", "2", "0", "1"]);

    let showers = dir.path().join("MC_SHOWER_11.csv");
    assert_eq!(column(&showers, "seq"), vec!["1", "2"]);
    assert_eq!(column(&showers, "energy"), vec!["2", "0.7"]);
}

#[test]
fn excluded_telescopes_export_sentinel_mirror_count() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LayoutCatalog::from_toml_str(
        r#"
        [layouts.lst-only]
        lst = "1"
        "#,
    )
    .unwrap();
    let sink = SinkRegistry::new().create("csv", dir.path()).unwrap();
    let mut ingest = BatchIngest::new(IngestOptions {
        max_events: None,
        layout: Some("lst-only".to_string()),
    })
    .with_layouts(Box::new(catalog))
    .with_exporter(sink);

    let file = ingest
        .process_source(&mut two_telescope_run(12).source())
        .unwrap();
    ingest.finish();

    let telescopes = dir.path().join("HEADER_TEL_12.csv");
    assert_eq!(column(&telescopes, "num_mirrors"), vec!["198", "-1"]);
    assert_eq!(file.events, 2);
    assert_eq!(file.triggered, 2);
}

#[test]
fn run_header_table_accumulates_across_runs_and_sessions() {
    let dir = tempfile::tempdir().unwrap();
    for run in [21, 22] {
        let sink = CsvSink::new(dir.path()).unwrap();
        let mut ingest =
            BatchIngest::new(IngestOptions::default()).with_exporter(Box::new(sink));
        ingest
            .process_source(&mut two_telescope_run(run).source())
            .unwrap();
        ingest.finish();
    }
    let header = dir.path().join("HEADER_RUN.csv");
    assert_eq!(column(&header, "run_number"), vec!["21", "22"]);
    assert!(dir.path().join("HEADER_TEL_22.csv").exists());

    let text = std::fs::read_to_string(dir.path().join("MC_SHOWER_21.csv")).unwrap();
    assert!(text.starts_with("# table: MC_SHOWER_21\n# units: DN,DN,DN,[TeV]"));
}
