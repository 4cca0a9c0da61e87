use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::checksum::{compute_publish_key, sha256_hex};
use super::{
    ArtifactDraft, ArtifactRef, ArtifactStore, ArtifactVersionV1, ChecksumMeta, FetchedArtifact,
    ProvenanceLink, VersionSpec,
};
use crate::error::{CleaningError, Result};

const RECORD_VERSION: &str = "1.0.0";

/// Filesystem-backed artifact store: content-addressed payloads under
/// `objects/sha256/` and an append-only ndjson version catalog.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let _ = fs::create_dir_all(root.join("objects"));
        Self { root }
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join("catalog.ndjson")
    }

    fn object_path(&self, hex_digest: &str) -> PathBuf {
        self.root
            .join("objects")
            .join("sha256")
            .join(&hex_digest[0..2])
            .join(&hex_digest[2..4])
            .join(hex_digest)
    }

    /// All version records, oldest first. A missing catalog reads as empty.
    fn read_catalog(&self) -> Result<Vec<ArtifactVersionV1>> {
        let path = self.catalog_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        let mut versions = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            versions.push(serde_json::from_str(line)?);
        }
        Ok(versions)
    }

    fn append_catalog(&self, version: &ArtifactVersionV1) -> Result<()> {
        let path = self.catalog_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = serde_json::to_string(version)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Writes a payload into the sha256 fanout tree, skipping objects that
    /// already exist. Returns the payload ref and the hex digest.
    fn write_object(&self, bytes: &[u8]) -> Result<(String, String)> {
        let hex_digest = sha256_hex(bytes);
        let path = self.object_path(&hex_digest);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok((format!("cas:sha256:{}", hex_digest), hex_digest))
    }

    fn resolve(
        &self,
        versions: &[ArtifactVersionV1],
        reference: &ArtifactRef,
    ) -> Result<ArtifactVersionV1> {
        let named: Vec<&ArtifactVersionV1> = versions
            .iter()
            .filter(|v| v.name == reference.name)
            .collect();
        let resolved = match reference.version {
            VersionSpec::Latest => named.into_iter().max_by_key(|v| v.version),
            VersionSpec::Number(n) => named.into_iter().find(|v| v.version == n),
        };
        resolved
            .cloned()
            .ok_or_else(|| CleaningError::UnknownArtifact(reference.to_string()))
    }

    /// Local file name the payload materializes under. Artifact names are
    /// free text, so only the final path component is used.
    fn payload_file_name(name: &str) -> String {
        Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "payload".to_string())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact> {
        let versions = self.read_catalog()?;
        let version = self.resolve(&versions, reference)?;

        let object = self.object_path(&version.checksum.sha256);
        if !object.exists() {
            return Err(CleaningError::Store {
                message: format!(
                    "payload {} for {} missing from object store",
                    version.payload_ref,
                    version.locator()
                ),
            });
        }

        let staging = self.root.join("staging").join(&version.artifact_id);
        fs::create_dir_all(&staging)?;
        let local_path = staging.join(Self::payload_file_name(&version.name));
        fs::copy(&object, &local_path)?;
        debug!(
            "Materialized {} at {}",
            version.locator(),
            local_path.display()
        );

        Ok(FetchedArtifact {
            version,
            local_path,
        })
    }

    async fn publish(
        &self,
        draft: &ArtifactDraft,
        file: &Path,
        derived_from: Option<ProvenanceLink>,
        run_id: &str,
    ) -> Result<ArtifactVersionV1> {
        let bytes = fs::read(file)?;
        let (payload_ref, hex_digest) = self.write_object(&bytes)?;

        let versions = self.read_catalog()?;
        let publish_key = compute_publish_key(&draft.name, &hex_digest);
        let dedupe_of = versions
            .iter()
            .find(|v| compute_publish_key(&v.name, &v.checksum.sha256) == publish_key)
            .map(|v| v.artifact_id.clone());
        let next_version = versions
            .iter()
            .filter(|v| v.name == draft.name)
            .map(|v| v.version + 1)
            .max()
            .unwrap_or(0);

        let record = ArtifactVersionV1 {
            record_version: RECORD_VERSION.to_string(),
            artifact_id: Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            version: next_version,
            artifact_type: draft.artifact_type.clone(),
            description: draft.description.clone(),
            payload_ref,
            checksum: ChecksumMeta { sha256: hex_digest },
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
            created_by_run: Some(run_id.to_string()),
            derived_from,
            dedupe_of,
        };
        self.append_catalog(&record)?;
        debug!("Registered {} as {}", record.locator(), record.payload_ref);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn draft(name: &str) -> ArtifactDraft {
        ArtifactDraft {
            name: name.to_string(),
            artifact_type: "raw_data".to_string(),
            description: "test artifact".to_string(),
        }
    }

    fn write_payload(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("payload.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let payload = write_payload(dir.path(), "id,price\n1,100\n");

        let published = store
            .publish(&draft("sample.csv"), &payload, None, "run-1")
            .await
            .unwrap();
        assert_eq!(published.version, 0);
        assert!(published.dedupe_of.is_none());

        let fetched = store
            .fetch(&"sample.csv:latest".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.version.artifact_id, published.artifact_id);
        assert_eq!(
            fs::read_to_string(&fetched.local_path).unwrap(),
            "id,price\n1,100\n"
        );
    }

    #[tokio::test]
    async fn versions_bump_and_latest_resolves() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let first = write_payload(dir.path(), "id\n1\n");
        store
            .publish(&draft("sample.csv"), &first, None, "run-1")
            .await
            .unwrap();

        let second = dir.path().join("payload2.csv");
        fs::write(&second, "id\n2\n").unwrap();
        let published = store
            .publish(&draft("sample.csv"), &second, None, "run-2")
            .await
            .unwrap();
        assert_eq!(published.version, 1);

        let latest = store
            .fetch(&"sample.csv".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(latest.version.version, 1);

        let pinned = store
            .fetch(&"sample.csv:v0".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(&pinned.local_path).unwrap(),
            "id\n1\n"
        );
    }

    #[tokio::test]
    async fn republishing_identical_bytes_marks_dedupe() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let payload = write_payload(dir.path(), "id\n1\n");

        let original = store
            .publish(&draft("sample.csv"), &payload, None, "run-1")
            .await
            .unwrap();
        let republished = store
            .publish(&draft("sample.csv"), &payload, None, "run-2")
            .await
            .unwrap();

        assert_eq!(republished.version, 1);
        assert_eq!(republished.dedupe_of, Some(original.artifact_id));
        // Same bytes, same object
        assert_eq!(republished.payload_ref, original.payload_ref);
    }

    #[tokio::test]
    async fn unknown_artifact_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let err = store
            .fetch(&"missing.csv:latest".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CleaningError::UnknownArtifact(_)));
    }
}
