use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use loom_browser::BrowserDriver;
use loom_core_types::dom::Snapshot;
use loom_snapshot::{render_walker_script, SnapshotService, A11Y_SCRIPT};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::SessionError;
use crate::factory::HeadedLauncher;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HighlightAction {
    Show,
    Hide,
}

struct Session {
    driver: Arc<dyn BrowserDriver>,
    last_active: Instant,
}

/// Pool of headed browser contexts for a human calibration UI (spec §4.10).
/// Up to `max_sessions` may be open at once; `sweep_idle` closes any session
/// quiet for longer than `idle_timeout`.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    launcher: Arc<dyn HeadedLauncher>,
    max_sessions: usize,
    idle_timeout: Duration,
    snapshot_root: std::path::PathBuf,
}

impl SessionManager {
    pub fn new(
        launcher: Arc<dyn HeadedLauncher>,
        max_sessions: usize,
        idle_timeout: Duration,
        snapshot_root: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            launcher,
            max_sessions,
            idle_timeout,
            snapshot_root: snapshot_root.into(),
        }
    }

    pub async fn create_session(
        &self,
        url: &str,
        viewport: (u32, u32),
    ) -> Result<String, SessionError> {
        if self.sessions.len() >= self.max_sessions {
            self.sweep_idle().await;
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(SessionError::MaxSessionsReached(self.max_sessions));
        }

        let driver = self.launcher.launch(viewport).await?;
        driver
            .navigate(url, Duration::from_millis(30_000))
            .await?;

        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            Session {
                driver,
                last_active: Instant::now(),
            },
        );
        info!(session_id = %session_id, url, "calibration session created");
        Ok(session_id)
    }

    pub async fn sync_dom(&self, session_id: &str) -> Result<Snapshot, SessionError> {
        let driver = self.touch(session_id)?;

        let script = render_walker_script(40, 4000);
        let walked = driver
            .evaluate(&script)
            .await
            .map_err(|e| SessionError::Capture(e.to_string()))?;

        let dom_tree = serde_json::from_value(
            walked
                .get("dom_tree")
                .cloned()
                .ok_or_else(|| SessionError::Capture("walker output missing dom_tree".into()))?,
        )
        .map_err(|e| SessionError::Capture(e.to_string()))?;
        let controls = serde_json::from_value(
            walked.get("controls").cloned().unwrap_or_else(|| serde_json::json!([])),
        )
        .map_err(|e| SessionError::Capture(e.to_string()))?;
        let stats = serde_json::from_value(
            walked
                .get("stats")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"node_count": 0, "max_depth": 0})),
        )
        .map_err(|e| SessionError::Capture(e.to_string()))?;

        let a11y_tree = driver.evaluate(A11Y_SCRIPT).await.unwrap_or_else(|e| {
            warn!(error = %e, "accessibility pass failed during sync, recording empty tree");
            serde_json::json!([])
        });

        let html = driver
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| SessionError::Capture(e.to_string()))?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let title = driver.title().await?;
        let current_url = driver.current_url().await?;

        Ok(Snapshot {
            snapshot_id: Uuid::new_v4().to_string(),
            url: current_url,
            title,
            created_at: Utc::now(),
            dom_tree,
            controls,
            a11y_tree,
            html,
            stats,
        })
    }

    pub async fn highlight(
        &self,
        session_id: &str,
        dom_id: &str,
        action: HighlightAction,
    ) -> Result<(), SessionError> {
        let driver = self.touch(session_id)?;
        let script = match action {
            HighlightAction::Show => format!(
                "(function(){{var el=document.querySelector('[data-dom-id=\"{dom_id}\"]');\
                 if(el) el.setAttribute('data-loom-highlight','1');}})()"
            ),
            HighlightAction::Hide => format!(
                "(function(){{var el=document.querySelector('[data-dom-id=\"{dom_id}\"]');\
                 if(el) el.removeAttribute('data-loom-highlight');}})()"
            ),
        };
        driver
            .evaluate(&script)
            .await
            .map_err(|e| SessionError::Capture(e.to_string()))?;
        Ok(())
    }

    pub async fn persist_snapshot(&self, session_id: &str) -> Result<String, SessionError> {
        let driver = self.touch(session_id)?;
        let current_url = driver.current_url().await?;
        let service = SnapshotService::new(driver, &self.snapshot_root);
        let opts = loom_core_types::dom::SnapshotOpts::default();
        let snapshot = service.snapshot(&current_url, &opts).await?;
        Ok(snapshot.snapshot_id)
    }

    pub async fn close_session(&self, session_id: &str) -> Result<(), SessionError> {
        let (_, session) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.driver.close().await?;
        info!(session_id, "calibration session closed");
        Ok(())
    }

    /// Closes every session idle for longer than `idle_timeout`.
    pub async fn sweep_idle(&self) {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().last_active.elapsed() > self.idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        for session_id in stale {
            if let Some((_, session)) = self.sessions.remove(&session_id) {
                let _ = session.driver.close().await;
                info!(session_id, "idle calibration session reaped");
            }
        }
    }

    fn touch(&self, session_id: &str) -> Result<Arc<dyn BrowserDriver>, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.last_active = Instant::now();
        Ok(entry.driver.clone())
    }
}
