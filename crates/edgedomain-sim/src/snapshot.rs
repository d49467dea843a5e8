// # Snapshot File
//
// Persists a `CloudState` to disk between invocations.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good snapshot
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "cloud": {
//     "account_id": "123456789012",
//     "zones": [{ "id": "Z123", "name": "example.com.", "records": [] }],
//     "roles": {},
//     "functions": {},
//     "stacks": { "site-prod": [{ "key": "CloudFrontDomainName", "value": "d1.cloudfront.net" }] }
//   }
// }
// ```

use edgedomain_core::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::state::CloudState;

/// Snapshot format version
const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotFormat {
    version: String,
    cloud: CloudState,
}

/// A snapshot file on disk
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Point at `path`, creating its parent directory if needed
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create snapshot directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, recovering from the backup if the file is corrupt
    ///
    /// Recovery strategy:
    /// 1. Load the main file (missing file means empty state)
    /// 2. If it does not parse, load the backup and restore it
    /// 3. If the backup also fails, start with empty state
    pub async fn load_with_recovery(&self) -> Result<CloudState, Error> {
        match Self::load(&self.path).await {
            Ok(state) => {
                tracing::debug!(
                    "Loaded snapshot from {}: {} zones",
                    self.path.display(),
                    state.zones.len()
                );
                Ok(state)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Snapshot appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(&self.path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(CloudState::default());
                }

                match Self::load(&backup_path).await {
                    Ok(state) => {
                        tracing::info!("Recovered snapshot from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, &self.path).await {
                            tracing::error!(
                                "Failed to restore snapshot from backup: {}",
                                restore_err
                            );
                        }
                        Ok(state)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(CloudState::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<CloudState, Error> {
        if !path.exists() {
            tracing::debug!("Snapshot does not exist: {}", path.display());
            return Ok(CloudState::default());
        }

        let content = fs::read_to_string(path).await?;
        let snapshot: SnapshotFormat = serde_json::from_str(&content)?;

        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version mismatch: expected {}, got {}. Attempting to load anyway.",
                SNAPSHOT_VERSION,
                snapshot.version
            );
        }

        Ok(snapshot.cloud)
    }

    /// Write `state` atomically, keeping the previous file as backup
    pub async fn write(&self, state: &CloudState) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&SnapshotFormat {
            version: SNAPSHOT_VERSION.to_string(),
            cloud: state.clone(),
        })?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await?;

        tracing::trace!("Snapshot written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded(output: &str) -> CloudState {
        let mut state = CloudState::default();
        state.add_zone("ZEX", "example.com");
        state.set_stack_output("site", "CloudFrontDomainName", output);
        state
    }

    #[tokio::test]
    async fn missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let snapshot = SnapshotFile::open(dir.path().join("nested/cloud.json"))
            .await
            .unwrap();

        assert_eq!(snapshot.load_with_recovery().await.unwrap(), CloudState::default());
        assert!(dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn written_state_loads_back() {
        let dir = tempdir().unwrap();
        let snapshot = SnapshotFile::open(dir.path().join("cloud.json")).await.unwrap();

        snapshot.write(&seeded("d1.cloudfront.net")).await.unwrap();

        let reopened = SnapshotFile::open(snapshot.path()).await.unwrap();
        assert_eq!(
            reopened.load_with_recovery().await.unwrap(),
            seeded("d1.cloudfront.net")
        );
    }

    #[tokio::test]
    async fn corrupted_snapshot_recovers_previous_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        let snapshot = SnapshotFile::open(&path).await.unwrap();

        snapshot.write(&seeded("d1.cloudfront.net")).await.unwrap();
        snapshot.write(&seeded("d2.cloudfront.net")).await.unwrap();
        assert!(SnapshotFile::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = snapshot.load_with_recovery().await.unwrap();
        assert_eq!(recovered, seeded("d1.cloudfront.net"));

        let restored = fs::read_to_string(&path).await.unwrap();
        assert!(restored.contains("d1.cloudfront.net"));
    }
}
