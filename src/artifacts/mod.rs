pub mod checksum;
pub mod fs_store;
pub mod http_store;
pub mod run_log;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, StoreBackend};
use crate::error::{CleaningError, Result};

pub use fs_store::FsArtifactStore;
pub use http_store::HttpArtifactStore;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChecksumMeta {
    pub sha256: String,
}

/// Recorded reference from an output artifact to the input version consumed
/// in producing it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProvenanceLink {
    pub artifact_id: String,
    pub name: String,
    pub version: u32,
}

/// One immutable, versioned artifact as the store records it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtifactVersionV1 {
    pub record_version: String, // "1.0.0"
    pub artifact_id: String,
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub payload_ref: String,
    pub checksum: ChecksumMeta,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub created_by_run: Option<String>,
    pub derived_from: Option<ProvenanceLink>,
    /// Set when the published bytes were identical to an existing version of
    /// the same name.
    pub dedupe_of: Option<String>,
}

impl ArtifactVersionV1 {
    /// The `name:vN` locator, the human-facing handle for this version.
    pub fn locator(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }

    pub fn provenance(&self) -> ProvenanceLink {
        ProvenanceLink {
            artifact_id: self.artifact_id.clone(),
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// Metadata for a version about to be published.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
}

/// Version selector inside an [`ArtifactRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Number(u32),
}

/// A parsed `name`, `name:latest` or `name:vN` artifact reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSpec,
}

impl FromStr for ArtifactRef {
    type Err = CleaningError;

    fn from_str(raw: &str) -> Result<Self> {
        let (name, version) = match raw.rsplit_once(':') {
            None => (raw, VersionSpec::Latest),
            Some((name, "latest")) => (name, VersionSpec::Latest),
            Some((name, tail)) => {
                let number = tail
                    .strip_prefix('v')
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| CleaningError::InvalidReference(raw.to_string()))?;
                (name, VersionSpec::Number(number))
            }
        };
        if name.is_empty() {
            return Err(CleaningError::InvalidReference(raw.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            VersionSpec::Latest => write!(f, "{}:latest", self.name),
            VersionSpec::Number(n) => write!(f, "{}:v{}", self.name, n),
        }
    }
}

/// A fetched artifact: the resolved version record plus the local payload copy.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub version: ArtifactVersionV1,
    pub local_path: PathBuf,
}

/// The two operations this step needs from the artifact-tracking collaborator.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolves a reference and materializes its payload to a local file.
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact>;

    /// Publishes a file as a new version of `draft.name`, recording the
    /// provenance link and the publishing run.
    async fn publish(
        &self,
        draft: &ArtifactDraft,
        file: &Path,
        derived_from: Option<ProvenanceLink>,
        run_id: &str,
    ) -> Result<ArtifactVersionV1>;
}

/// Builds the store backend selected by configuration.
pub fn build_store(config: &Config) -> Result<Arc<dyn ArtifactStore>> {
    match config.store.backend {
        StoreBackend::Fs => Ok(Arc::new(FsArtifactStore::new(&config.store.data_root))),
        StoreBackend::Http => {
            let base_url = config.store.base_url.clone().ok_or_else(|| {
                CleaningError::Config("store.base_url is required for the http backend".to_string())
            })?;
            Ok(Arc::new(HttpArtifactStore::new(
                base_url,
                config.store.api_key.clone(),
                &config.store.data_root,
                config.store.timeout_seconds,
            )?))
        }
    }
}
