//! Append-only backup of every installed [`MockRuleDescriptor`], one JSON
//! object per line, for operators who want an offline record of what got
//! installed without standing up the mock server's own export tooling.
//! Failures here are logged, never propagated: the backup is a convenience,
//! not part of the install contract.

use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::types::MockRuleDescriptor;

pub struct BackupSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl BackupSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    /// Append `descriptor` as one NDJSON line. Logs and returns on any failure;
    /// callers should not treat this as part of the install's success/failure.
    pub async fn append(&self, descriptor: &MockRuleDescriptor) {
        let _guard = self.lock.lock().await;

        let line = match serde_json::to_string(descriptor) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, fingerprint = %descriptor.fingerprint, "failed to serialize descriptor for backup");
                return;
            }
        };

        let file = OpenOptions::new().create(true).append(true).open(&self.path).await;
        let mut file = match file {
            Ok(file) => file,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to open backup sink");
                return;
            }
        };

        if let Err(err) = file.write_all(format!("{line}\n").as_bytes()).await {
            warn!(error = %err, path = %self.path.display(), "failed to append to backup sink");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyPredicate, DescriptorMetadata, MatchBlock, ResponseBlock};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn descriptor() -> MockRuleDescriptor {
        MockRuleDescriptor {
            fingerprint: "xyz".to_string(),
            r#match: MatchBlock {
                method: "GET".to_string(),
                path: "/ping".to_string(),
                query: BTreeMap::new(),
                body_predicate: BodyPredicate::Any,
            },
            response: ResponseBlock { status: 204, headers: BTreeMap::new(), body: Vec::new() },
            metadata: DescriptorMetadata {
                observed_at: Utc::now(),
                source_labels: BTreeMap::new(),
                sanitization_report: BTreeMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn append_writes_one_ndjson_line_per_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.ndjson");
        let sink = BackupSink::new(path.clone());

        sink.append(&descriptor()).await;
        sink.append(&descriptor()).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|line| serde_json::from_str::<MockRuleDescriptor>(line).is_ok()));
    }
}
