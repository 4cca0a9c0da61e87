use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One completed run of the cleaning step, as journaled to the run log.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunRecordV1 {
    pub record_version: String, // "1.0.0"
    pub run_id: String,
    pub job_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Snapshot of the arguments the step ran with.
    pub config: serde_json::Value,
    /// Locators of input versions consumed.
    pub used_artifacts: Vec<String>,
    /// Locators of output versions published.
    pub logged_artifacts: Vec<String>,
}

/// Appends one run record as a single ndjson line.
pub fn append(path: &Path, record: &RunRecordV1) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_one_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("runs.ndjson");

        let record = RunRecordV1 {
            record_version: "1.0.0".to_string(),
            run_id: "run-1".to_string(),
            job_type: "basic_cleaning".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            config: serde_json::json!({"min_price": 10.0}),
            used_artifacts: vec!["raw_listings.csv:v0".to_string()],
            logged_artifacts: vec!["clean_listings.csv:v0".to_string()],
        };
        append(&path, &record).unwrap();
        append(&path, &record).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunRecordV1 = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.run_id, "run-1");
    }
}
