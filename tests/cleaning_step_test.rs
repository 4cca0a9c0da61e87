use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use listings_cleaner::artifacts::{ArtifactDraft, ArtifactStore, FsArtifactStore};
use listings_cleaner::cleaning::{CleaningArgs, CleaningStep};
use listings_cleaner::config::Config;
use listings_cleaner::table::RecordTable;

// Covers the boundary and rejection cases: a below-minimum price, an
// out-of-box longitude, a full-row duplicate, the inclusive price ceiling,
// an out-of-box latitude and an unparseable price.
const RAW_CSV: &str = "\
id,name,price,longitude,latitude
1,Budget bunk,5,-73.95,40.72
2,Midtown walkup,300,-80.0,41.0
3,Harlem duplex,100,-74.0,40.8
3,Harlem duplex,100,-74.0,40.8
5,Top floor suite,350,-73.9,40.7
6,Latitude outlier,200,-73.9,42.0
7,Bad price,n/a,-73.9,40.8
8,Greenpoint view,120,-73.95,40.73
";

async fn seed_raw_artifact(store: &FsArtifactStore, scratch: &Path) -> Result<()> {
    let raw_path = scratch.join("raw_listings.csv");
    fs::write(&raw_path, RAW_CSV)?;
    store
        .publish(
            &ArtifactDraft {
                name: "raw_listings.csv".to_string(),
                artifact_type: "raw_data".to_string(),
                description: "unprocessed listings export".to_string(),
            },
            &raw_path,
            None,
            "seed-run",
        )
        .await?;
    Ok(())
}

fn step_args(input: &str, output: &Path) -> CleaningArgs {
    CleaningArgs {
        input_artifact: input.to_string(),
        output_artifact: output.to_string_lossy().into_owned(),
        output_type: "clean_sample".to_string(),
        output_description: "listings with price and geolocation outliers removed".to_string(),
        min_price: 10.0,
        max_price: 350.0,
    }
}

fn test_config(data_root: &Path) -> Config {
    let mut config = Config::default();
    config.store.data_root = data_root.to_path_buf();
    config
}

#[tokio::test]
async fn cleaning_step_end_to_end() -> Result<()> {
    let scratch = tempdir()?;
    let data_root = scratch.path().join("store");
    let store = Arc::new(FsArtifactStore::new(&data_root));
    seed_raw_artifact(&store, scratch.path()).await?;

    let output_path = scratch.path().join("clean_listings.csv");
    let args = step_args("raw_listings.csv:latest", &output_path);
    let config = test_config(&data_root);

    let summary = CleaningStep::new(args)
        .run(store.clone(), &config)
        .await?;

    assert_eq!(summary.rows_in, 8);
    assert_eq!(summary.dropped_price, 2); // price=5 and the unparseable one
    assert_eq!(summary.dropped_duplicates, 1);
    assert_eq!(summary.dropped_geo, 2); // longitude -80.0 and latitude 42.0
    assert_eq!(summary.rows_out, 3);

    // Every surviving row satisfies all invariants at once
    let cleaned = RecordTable::load(&output_path)?;
    assert_eq!(cleaned.len(), 3);
    let price = cleaned.column_index("price")?;
    let lon = cleaned.column_index("longitude")?;
    let lat = cleaned.column_index("latitude")?;
    for row in cleaned.rows() {
        let p = RecordTable::numeric_cell(row, price).unwrap();
        let x = RecordTable::numeric_cell(row, lon).unwrap();
        let y = RecordTable::numeric_cell(row, lat).unwrap();
        assert!((10.0..=350.0).contains(&p));
        assert!((-74.25..=-73.50).contains(&x));
        assert!((40.5..=41.2).contains(&y));
    }
    let distinct: HashSet<&Vec<String>> = cleaned.rows().iter().collect();
    assert_eq!(distinct.len(), cleaned.len());

    let kept_ids: Vec<&str> = cleaned.rows().iter().map(|r| r[0].as_str()).collect();
    assert_eq!(kept_ids, vec!["3", "5", "8"]);

    // Provenance points at the exact input version consumed
    assert_eq!(
        summary.output_version.derived_from.as_ref().unwrap(),
        &summary.input_version.provenance()
    );
    assert_eq!(summary.output_version.version, 0);
    assert_eq!(
        summary.output_version.created_by_run.as_deref(),
        Some(summary.run_id.as_str())
    );

    // The run is journaled
    let run_log = fs::read_to_string(data_root.join("runs.ndjson"))?;
    let lines: Vec<&str> = run_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(&summary.run_id));
    assert!(lines[0].contains("basic_cleaning"));

    Ok(())
}

#[tokio::test]
async fn cleaning_already_clean_data_changes_nothing() -> Result<()> {
    let scratch = tempdir()?;
    let data_root = scratch.path().join("store");
    let store = Arc::new(FsArtifactStore::new(&data_root));
    seed_raw_artifact(&store, scratch.path()).await?;
    let config = test_config(&data_root);

    let first_output = scratch.path().join("clean_listings.csv");
    let first = CleaningStep::new(step_args("raw_listings.csv:latest", &first_output))
        .run(store.clone(), &config)
        .await?;

    let second_output = scratch.path().join("clean_listings_again.csv");
    let second = CleaningStep::new(step_args(
        &first.output_version.locator(),
        &second_output,
    ))
    .run(store.clone(), &config)
    .await?;

    assert_eq!(second.rows_in, first.rows_out);
    assert_eq!(second.rows_out, first.rows_out);
    assert_eq!(second.dropped_price, 0);
    assert_eq!(second.dropped_duplicates, 0);
    assert_eq!(second.dropped_geo, 0);

    let first_table = RecordTable::load(&first_output)?;
    let second_table = RecordTable::load(&second_output)?;
    assert_eq!(first_table, second_table);
    assert_eq!(
        first.output_version.checksum.sha256,
        second.output_version.checksum.sha256
    );

    Ok(())
}

#[tokio::test]
async fn fetching_a_pinned_version_survives_later_publishes() -> Result<()> {
    let scratch = tempdir()?;
    let data_root = scratch.path().join("store");
    let store = Arc::new(FsArtifactStore::new(&data_root));
    seed_raw_artifact(&store, scratch.path()).await?;

    // A newer raw export lands before the step runs against the pinned version
    let newer = scratch.path().join("raw_listings_v1.csv");
    fs::write(&newer, "id,name,price,longitude,latitude\n9,New pad,90,-73.9,40.8\n")?;
    store
        .publish(
            &ArtifactDraft {
                name: "raw_listings.csv".to_string(),
                artifact_type: "raw_data".to_string(),
                description: "second export".to_string(),
            },
            &newer,
            None,
            "seed-run-2",
        )
        .await?;

    let output_path = scratch.path().join("clean_listings.csv");
    let config = test_config(&data_root);
    let summary = CleaningStep::new(step_args("raw_listings.csv:v0", &output_path))
        .run(store.clone(), &config)
        .await?;

    assert_eq!(summary.input_version.version, 0);
    assert_eq!(summary.rows_in, 8);

    Ok(())
}
