use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::checksum::{compute_publish_key, sha256_hex};
use super::{
    ArtifactDraft, ArtifactRef, ArtifactStore, ArtifactVersionV1, FetchedArtifact, ProvenanceLink,
    VersionSpec,
};
use crate::error::{CleaningError, Result};

/// Client for a remote artifact store.
///
/// Speaks a small REST surface: version records under
/// `/artifacts/{name}/versions/{selector}`, content-addressed payloads under
/// `/objects/{hex}`. Object uploads use `upsert=true` so re-publishing
/// identical bytes is idempotent on the store side.
pub struct HttpArtifactStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    staging_root: PathBuf,
}

impl HttpArtifactStore {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        data_root: &Path,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            staging_root: data_root.join("staging"),
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder
                .header("Authorization", format!("Bearer {}", key))
                .header("apikey", key.clone()),
            None => builder,
        }
    }

    fn selector(reference: &ArtifactRef) -> String {
        match reference.version {
            VersionSpec::Latest => "latest".to_string(),
            VersionSpec::Number(n) => format!("v{}", n),
        }
    }

    fn payload_file_name(name: &str) -> String {
        Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "payload".to_string())
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact> {
        let meta_url = format!(
            "{}/artifacts/{}/versions/{}",
            self.base_url,
            reference.name,
            Self::selector(reference)
        );
        let resp = self.authorize(self.client.get(&meta_url)).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CleaningError::UnknownArtifact(reference.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CleaningError::Store {
                message: format!("version lookup failed: {} - {}", status, body),
            });
        }
        let version: ArtifactVersionV1 = resp.json().await?;

        let object_url = format!("{}/objects/{}", self.base_url, version.checksum.sha256);
        let resp = self.authorize(self.client.get(&object_url)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CleaningError::Store {
                message: format!("payload download failed: {} - {}", status, body),
            });
        }
        let bytes = resp.bytes().await?.to_vec();

        // Verify the payload against the version record before handing it on
        let digest = sha256_hex(&bytes);
        if digest != version.checksum.sha256 {
            return Err(CleaningError::Store {
                message: format!(
                    "checksum mismatch for {}: expected {}, got {}",
                    version.locator(),
                    version.checksum.sha256,
                    digest
                ),
            });
        }

        let staging = self.staging_root.join(&version.artifact_id);
        fs::create_dir_all(&staging)?;
        let local_path = staging.join(Self::payload_file_name(&version.name));
        fs::write(&local_path, &bytes)?;
        debug!(
            "Downloaded {} ({} bytes) to {}",
            version.locator(),
            bytes.len(),
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
        let hex_digest = sha256_hex(&bytes);

        let object_url = format!("{}/objects/{}", self.base_url, hex_digest);
        let resp = self
            .authorize(self.client.put(&object_url))
            .query(&[("upsert", "true")])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.clone())
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CleaningError::Store {
                message: format!("object upload failed: {} - {}", status, body),
            });
        }

        let submission = serde_json::json!({
            "artifact_type": draft.artifact_type,
            "description": draft.description,
            "payload_ref": format!("cas:sha256:{}", hex_digest),
            "checksum": { "sha256": hex_digest },
            "size_bytes": bytes.len() as u64,
            "created_by_run": run_id,
            "derived_from": derived_from,
        });
        let version_url = format!("{}/artifacts/{}/versions", self.base_url, draft.name);
        let resp = self
            .authorize(self.client.post(&version_url))
            .header(
                "Idempotency-Key",
                compute_publish_key(&draft.name, &hex_digest),
            )
            .json(&submission)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CleaningError::Store {
                message: format!("version registration failed: {} - {}", status, body),
            });
        }
        let version: ArtifactVersionV1 = resp.json().await?;
        debug!("Registered {} with remote store", version.locator());

        Ok(version)
    }
}
