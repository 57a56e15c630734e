use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loom_browser::BrowserDriver;
use loom_core_types::dom::{Snapshot, SnapshotOpts};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::SnapshotError;
use crate::script::{render_walker_script, A11Y_SCRIPT};

/// Captures `Snapshot`s of live pages and persists them under `root_dir`,
/// one directory per `snapshot_id` (spec §4.1).
pub struct SnapshotService {
    browser: Arc<dyn BrowserDriver>,
    root_dir: PathBuf,
    max_age: Duration,
}

impl SnapshotService {
    pub fn new(browser: Arc<dyn BrowserDriver>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            browser,
            root_dir: root_dir.into(),
            max_age: Duration::from_secs(24 * 3600),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub async fn snapshot(&self, url: &str, opts: &SnapshotOpts) -> Result<Snapshot, SnapshotError> {
        let timeout = Duration::from_millis(opts.timeout_ms);

        self.browser
            .navigate(url, timeout)
            .await
            .map_err(|e| match e {
                loom_browser::BrowserError::Navigate { .. } | loom_browser::BrowserError::Transport(_) => {
                    SnapshotError::FetchTimeout {
                        url: url.to_string(),
                        timeout_ms: opts.timeout_ms,
                    }
                }
                other => SnapshotError::FetchError(other.to_string()),
            })?;

        if let Some(selector) = &opts.wait_for {
            self.browser
                .text_content(selector, timeout)
                .await
                .map_err(|_| SnapshotError::FetchTimeout {
                    url: url.to_string(),
                    timeout_ms: opts.timeout_ms,
                })?;
        }

        let script = render_walker_script(opts.max_depth as usize, opts.max_nodes as usize);
        let walked = self
            .browser
            .evaluate(&script)
            .await
            .map_err(|e| SnapshotError::FetchError(e.to_string()))?;

        let dom_tree = serde_json::from_value(
            walked
                .get("dom_tree")
                .cloned()
                .ok_or_else(|| SnapshotError::Parse("walker output missing dom_tree".into()))?,
        )
        .map_err(|e| SnapshotError::Parse(e.to_string()))?;

        let controls = serde_json::from_value(
            walked
                .get("controls")
                .cloned()
                .unwrap_or_else(|| serde_json::json!([])),
        )
        .map_err(|e| SnapshotError::Parse(e.to_string()))?;

        let stats = serde_json::from_value(
            walked
                .get("stats")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"node_count": 0, "max_depth": 0})),
        )
        .map_err(|e| SnapshotError::Parse(e.to_string()))?;

        let a11y_tree = self
            .browser
            .evaluate(A11Y_SCRIPT)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "accessibility pass failed, recording empty tree");
                serde_json::json!([])
            });

        let html = self
            .browser
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| SnapshotError::FetchError(e.to_string()))?
            .as_str()
            .unwrap_or_default()
            .to_string();

        let title = self
            .browser
            .title()
            .await
            .map_err(|e| SnapshotError::FetchError(e.to_string()))?;
        let current_url = self
            .browser
            .current_url()
            .await
            .map_err(|e| SnapshotError::FetchError(e.to_string()))?;

        let snapshot = Snapshot {
            snapshot_id: Uuid::new_v4().to_string(),
            url: current_url,
            title,
            created_at: Utc::now(),
            dom_tree,
            controls,
            a11y_tree,
            html,
            stats,
        };

        if let Err(e) = self.persist(&snapshot).await {
            self.cleanup_failed(&snapshot.snapshot_id).await;
            return Err(e);
        }

        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let final_dir = self.root_dir.join(&snapshot.snapshot_id);
        let temp_dir = self.root_dir.join(format!("{}.tmp", snapshot.snapshot_id));

        fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;

        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;
        fs::write(temp_dir.join("snapshot.json"), body)
            .await
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;

        fs::rename(&temp_dir, &final_dir)
            .await
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;

        info!(snapshot_id = %snapshot.snapshot_id, dir = %final_dir.display(), "snapshot persisted");
        Ok(())
    }

    async fn cleanup_failed(&self, snapshot_id: &str) {
        let temp_dir = self.root_dir.join(format!("{snapshot_id}.tmp"));
        let final_dir = self.root_dir.join(snapshot_id);
        let _ = fs::remove_dir_all(&temp_dir).await;
        let _ = fs::remove_dir_all(&final_dir).await;
    }

    /// Deletes snapshot directories older than `max_age`. Returns the count removed.
    pub async fn cleanup_expired(&self) -> Result<usize, SnapshotError> {
        cleanup_expired_under(&self.root_dir, self.max_age).await
    }
}

async fn cleanup_expired_under(root_dir: &Path, max_age: Duration) -> Result<usize, SnapshotError> {
    let mut removed = 0;
    let mut entries = match fs::read_dir(root_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(SnapshotError::Persist(e.to_string())),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SnapshotError::Persist(e.to_string()))?
    {
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !metadata.is_dir() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(_) => continue,
        };
        if modified.elapsed().unwrap_or_default() > max_age {
            if fs::remove_dir_all(entry.path()).await.is_ok() {
                removed += 1;
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cleanup_of_missing_root_is_a_noop() {
        let removed = cleanup_expired_under(Path::new("/nonexistent/loom/root"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}
