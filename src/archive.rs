//! Versioned, checksum-validated archive for inspection records.
//!
//! Inspections are a small, whole-collection dataset with their own
//! persistence boundary: a single JSON document on disk wrapped in an
//! envelope carrying a schema version and a SHA-256 checksum. The checksum is
//! validated on every load; an unknown schema version or a mismatched
//! checksum is a hard error, never a silent reset.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Inspection;

/// Current on-disk schema version. Bump when the payload shape changes.
pub const ARCHIVE_SCHEMA_VERSION: u32 = 1;

/// On-disk envelope around the serialized inspection collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEnvelope {
    /// Payload schema version.
    pub schema_version: u32,
    /// SHA-256 checksum of `payload` (hex encoded).
    pub checksum: String,
    /// The serialized inspection collection (JSON string).
    pub payload: String,
}

impl ArchiveEnvelope {
    /// Wraps a serialized payload with the current version and its checksum.
    pub fn seal(payload: String) -> Self {
        let checksum = Self::compute_checksum(&payload);
        Self {
            schema_version: ARCHIVE_SCHEMA_VERSION,
            checksum,
            payload,
        }
    }

    fn compute_checksum(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verifies the stored checksum against the payload.
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.payload) == self.checksum
    }

    /// Validates version and checksum, returning the payload on success.
    pub fn open(self) -> Result<String, AppError> {
        if self.schema_version != ARCHIVE_SCHEMA_VERSION {
            return Err(AppError::ArchiveError(format!(
                "Unsupported archive schema version {} (expected {})",
                self.schema_version, ARCHIVE_SCHEMA_VERSION
            )));
        }
        if !self.is_valid() {
            tracing::warn!(
                "Archive checksum mismatch: expected {}, payload length {}",
                self.checksum,
                self.payload.len()
            );
            return Err(AppError::ArchiveError(
                "Archive checksum mismatch".to_string(),
            ));
        }
        Ok(self.payload)
    }
}

/// Persistence contract for the inspection collection.
#[async_trait]
pub trait InspectionArchive: Send + Sync {
    /// Loads the full collection. A missing archive is the empty collection.
    async fn load_all(&self) -> Result<Vec<Inspection>, AppError>;

    /// Replaces the full collection.
    async fn replace_all(&self, inspections: &[Inspection]) -> Result<(), AppError>;

    /// Appends one inspection under the archive lock.
    async fn append(&self, inspection: Inspection) -> Result<Inspection, AppError>;

    /// Updates one inspection's status under the archive lock.
    async fn update_status(&self, id: Uuid, status: &str) -> Result<Inspection, AppError>;
}

/// File-backed archive: one JSON envelope document, rewritten wholesale.
pub struct JsonFileArchive {
    path: PathBuf,
    // Serializes read-modify-write cycles across handlers
    lock: Mutex<()>,
}

impl JsonFileArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_collection(&self) -> Result<Vec<Inspection>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::ArchiveError(format!(
                    "Failed to read archive {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let envelope: ArchiveEnvelope = serde_json::from_str(&raw).map_err(|e| {
            AppError::ArchiveError(format!("Malformed archive envelope: {}", e))
        })?;

        let payload = envelope.open()?;
        serde_json::from_str(&payload)
            .map_err(|e| AppError::ArchiveError(format!("Malformed archive payload: {}", e)))
    }

    async fn write_collection(&self, inspections: &[Inspection]) -> Result<(), AppError> {
        let payload = serde_json::to_string(inspections)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize archive: {}", e)))?;
        let envelope = ArchiveEnvelope::seal(payload);
        let raw = serde_json::to_string_pretty(&envelope)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize envelope: {}", e)))?;

        // Write-then-rename so a crash mid-write never corrupts the archive
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw.as_bytes()).await.map_err(|e| {
            AppError::ArchiveError(format!("Failed to write archive {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::ArchiveError(format!(
                "Failed to replace archive {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(
            "Archive rewritten: {} inspection(s) at {}",
            inspections.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl InspectionArchive for JsonFileArchive {
    async fn load_all(&self) -> Result<Vec<Inspection>, AppError> {
        let _guard = self.lock.lock().await;
        self.read_collection().await
    }

    async fn replace_all(&self, inspections: &[Inspection]) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        self.write_collection(inspections).await
    }

    async fn append(&self, inspection: Inspection) -> Result<Inspection, AppError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_collection().await?;
        all.push(inspection.clone());
        self.write_collection(&all).await?;
        Ok(inspection)
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<Inspection, AppError> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_collection().await?;
        let found = all
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Inspection {} not found", id)))?;
        found.status = status.to_string();
        let updated = found.clone();
        self.write_collection(&all).await?;
        Ok(updated)
    }
}
