pub mod filters;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::artifacts::run_log::{self, RunRecordV1};
use crate::artifacts::{
    ArtifactDraft, ArtifactRef, ArtifactStore, ArtifactVersionV1,
};
use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics::{CleaningMetrics, StoreMetrics};
use crate::table::RecordTable;
use filters::{ExactDuplicates, GeoBounds, PriceBand, RowFilter};

pub const JOB_TYPE: &str = "basic_cleaning";
const RUN_RECORD_VERSION: &str = "1.0.0";

/// Arguments for one invocation of the cleaning step.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningArgs {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Result of a completed cleaning run.
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub run_id: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_price: usize,
    pub dropped_duplicates: usize,
    pub dropped_geo: usize,
    pub input_version: ArtifactVersionV1,
    pub output_version: ArtifactVersionV1,
    pub output_file: PathBuf,
}

/// The basic cleaning step: fetch the raw table, run the filter passes in
/// their fixed order, publish the cleaned table as a new version.
pub struct CleaningStep {
    args: CleaningArgs,
}

impl CleaningStep {
    pub fn new(args: CleaningArgs) -> Self {
        Self { args }
    }

    pub async fn run(
        &self,
        store: Arc<dyn ArtifactStore>,
        config: &Config,
    ) -> Result<StepSummary> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let step_t0 = Instant::now();
        info!(run = %run_id, "Starting basic cleaning step");

        // Fetch the input artifact; the run record keeps the exact version used
        let input_ref: ArtifactRef = self.args.input_artifact.parse()?;
        info!("Fetching input artifact {}", input_ref);
        let fetch_t0 = Instant::now();
        let fetched = match store.fetch(&input_ref).await {
            Ok(fetched) => {
                StoreMetrics::record_fetch_success(
                    fetch_t0.elapsed().as_secs_f64(),
                    fetched.version.size_bytes,
                );
                fetched
            }
            Err(e) => {
                StoreMetrics::record_fetch_error();
                return Err(e);
            }
        };

        let mut table = RecordTable::load(&fetched.local_path)?;
        let rows_in = table.len();
        CleaningMetrics::record_rows_in(rows_in);
        info!(
            "Loaded {} rows from {}",
            rows_in,
            fetched.local_path.display()
        );

        // Dropping outliers
        info!("Dropping outliers");
        let price_band = PriceBand {
            min_price: self.args.min_price,
            max_price: self.args.max_price,
        };
        let price_outcome = price_band.apply(&mut table)?;
        CleaningMetrics::record_rows_dropped(price_band.name(), price_outcome.rows_dropped);

        // Dropping duplicates
        info!("Dropping duplicates");
        let dedup_outcome = ExactDuplicates.apply(&mut table)?;
        CleaningMetrics::record_rows_dropped(ExactDuplicates.name(), dedup_outcome.rows_dropped);

        // Drop rows with improper geolocation
        info!("Dropping rows outside the service area");
        let geo_bounds = GeoBounds::nyc();
        let geo_outcome = geo_bounds.apply(&mut table)?;
        CleaningMetrics::record_rows_dropped(geo_bounds.name(), geo_outcome.rows_dropped);

        let rows_out = table.len();
        CleaningMetrics::record_rows_out(rows_out);

        // Save to csv file
        info!("Save to csv file");
        let output_file = PathBuf::from(&self.args.output_artifact);
        table.write_csv(&output_file)?;

        // Version control via the artifact store
        info!("Publishing cleaned artifact");
        let draft = ArtifactDraft {
            name: self.args.output_artifact.clone(),
            artifact_type: self.args.output_type.clone(),
            description: self.args.output_description.clone(),
        };
        let publish_t0 = Instant::now();
        let published = match store
            .publish(
                &draft,
                &output_file,
                Some(fetched.version.provenance()),
                &run_id,
            )
            .await
        {
            Ok(published) => {
                StoreMetrics::record_publish_success(
                    publish_t0.elapsed().as_secs_f64(),
                    published.size_bytes,
                );
                published
            }
            Err(e) => {
                StoreMetrics::record_publish_error();
                return Err(e);
            }
        };
        if published.dedupe_of.is_some() {
            StoreMetrics::record_publish_deduplicated();
            info!(
                "Published content matches an existing version of {}",
                published.name
            );
        }

        let record = RunRecordV1 {
            record_version: RUN_RECORD_VERSION.to_string(),
            run_id: run_id.clone(),
            job_type: JOB_TYPE.to_string(),
            started_at,
            finished_at: Utc::now(),
            config: serde_json::to_value(&self.args)?,
            used_artifacts: vec![fetched.version.locator()],
            logged_artifacts: vec![published.locator()],
        };
        run_log::append(&config.store.data_root.join("runs.ndjson"), &record)?;

        CleaningMetrics::record_step_duration(step_t0.elapsed().as_secs_f64());
        info!(
            "Cleaning finished: {} rows in, {} rows out, published {}",
            rows_in,
            rows_out,
            published.locator()
        );

        Ok(StepSummary {
            run_id,
            rows_in,
            rows_out,
            dropped_price: price_outcome.rows_dropped,
            dropped_duplicates: dedup_outcome.rows_dropped,
            dropped_geo: geo_outcome.rows_dropped,
            input_version: fetched.version,
            output_version: published,
            output_file,
        })
    }
}
