//! Integration tests for hitsong-data against real files on disk.

use std::fs;

use hitsong_data::{target_distribution, DataLoader};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn test_processed_path_preferred_and_decade_backfilled() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();

    write(
        &processed,
        "train_dataset.csv",
        "target,danceability,energy\n1,0.8,0.9\n0,0.6,0.7\n1,0.7,0.8\n",
    );
    write(
        &processed,
        "test_dataset.csv",
        "target,danceability,energy\n0,0.5,0.6\n",
    );

    let loader = DataLoader::new(raw.path(), processed.path());
    let loaded = loader.load().unwrap();

    assert_eq!(loaded.combined.n_rows(), 4);
    assert_eq!(loaded.train.as_ref().unwrap().n_rows(), 3);
    assert_eq!(loaded.test.as_ref().unwrap().n_rows(), 1);

    // Decade backfilled with the placeholder on every returned frame.
    let decades = loaded.combined.categorical("decade").unwrap();
    assert!(decades.iter().all(|d| d == "00s"));
    assert!(loaded.train.as_ref().unwrap().has_column("decade"));
}

#[test]
fn test_raw_decade_files_tagged_and_synthesized() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();

    // No target column in either file; both decades clean of duplicates.
    let mut sixties = String::from("danceability,energy\n");
    let mut seventies = String::from("danceability,energy\n");
    for i in 0..60 {
        sixties.push_str(&format!("0.{:02},0.5\n", i));
        seventies.push_str(&format!("0.5,0.{:02}\n", i));
    }
    write(&raw, "dataset-of-60s.csv", &sixties);
    write(&raw, "dataset-of-70s.csv", &seventies);

    let loader = DataLoader::new(raw.path(), processed.path()).synthesize_target(true);
    let loaded = loader.load().unwrap();

    assert_eq!(loaded.combined.n_rows(), 120);
    assert!(loaded.train.is_none());
    assert!(loaded.test.is_none());

    let decades = loaded.combined.unique_categories("decade").unwrap();
    assert_eq!(decades, &["60s", "70s"]);

    let (non_hits, hits) = target_distribution(&loaded.combined).unwrap();
    assert!(hits > 0 && non_hits > 0, "both classes must be present");
}

#[test]
fn test_raw_fallback_to_other_csv() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();

    write(
        &raw,
        "songs.csv",
        "target,energy\n1,0.9\n0,0.4\n1,0.8\n0,0.3\n",
    );

    let loader = DataLoader::new(raw.path(), processed.path());
    let loaded = loader.load().unwrap();
    assert_eq!(loaded.combined.n_rows(), 4);
    let decades = loaded.combined.unique_categories("decade").unwrap();
    assert_eq!(decades, &["unknown"]);
}

#[test]
fn test_empty_raw_dir_fails() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();

    let loader = DataLoader::new(raw.path(), processed.path());
    assert!(loader.load().is_err());
}

#[test]
fn test_mixed_types_parse() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();

    write(
        &raw,
        "dataset-of-90s.csv",
        "track,artist,target,energy\nSong A,Artist A,1,0.9\nSong B,Artist B,0,\n",
    );

    let loader = DataLoader::new(raw.path(), processed.path());
    let loaded = loader.load().unwrap();
    let frame = &loaded.combined;

    assert!(!frame.column("track").unwrap().is_numeric());
    // Empty energy imputed with the column median (the only finite value).
    assert_eq!(frame.numeric("energy").unwrap(), &[0.9, 0.9]);
}
