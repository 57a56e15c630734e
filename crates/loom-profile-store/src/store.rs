use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use loom_core_types::profile::{AnnotatedPage, MergeResult, PageEntry, SiteInfo, SiteProfile};
use tracing::info;

use crate::errors::ProfileStoreError;

const TIMESTAMP_FMT: &str = "%Y%m%dT%H%M%SZ";

fn now_ts() -> String {
    Utc::now().format(TIMESTAMP_FMT).to_string()
}

/// Loads and merges Site Profile documents on disk. Reads never mutate;
/// every write is atomic (temp then rename), per spec §4.2.
pub struct SiteProfileStore;

impl SiteProfileStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn load_profile(&self, path: &Path) -> Result<SiteProfile, ProfileStoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ProfileStoreError::Read {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;
        let raw: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ProfileStoreError::Read {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;
        validate_profile_shape(&raw)?;
        serde_json::from_value(raw).map_err(|e| ProfileStoreError::InvalidProfile(e.to_string()))
    }

    /// Merges an `AnnotatedPage` into the profile at `path`, creating it if
    /// absent. The prior entry for the same `page_id`, if any, is snapshotted
    /// into `history` before being overwritten (monotone merge, §3 invariant).
    pub async fn merge_page(
        &self,
        path: &Path,
        annotated_page: &AnnotatedPage,
        site_name: Option<&str>,
    ) -> Result<MergeResult, ProfileStoreError> {
        let (mut profile, created_new_file) = match tokio::fs::read(path).await {
            Ok(bytes) => {
                let raw: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
                    ProfileStoreError::Read {
                        path: path.display().to_string(),
                        source: e.to_string(),
                    }
                })?;
                validate_profile_shape(&raw)?;
                let profile: SiteProfile = serde_json::from_value(raw)
                    .map_err(|e| ProfileStoreError::InvalidProfile(e.to_string()))?;
                (profile, false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (SiteProfile::empty(now_ts()), true)
            }
            Err(e) => {
                return Err(ProfileStoreError::Read {
                    path: path.display().to_string(),
                    source: e.to_string(),
                })
            }
        };

        if let Some(site_name) = site_name {
            let site = profile.site.get_or_insert_with(SiteInfo::default);
            if site.name.is_none() {
                site.name = Some(site_name.to_string());
            }
        }

        let timestamp = now_ts();
        let mut aliases = BTreeMap::new();
        for alias in &annotated_page.aliases {
            aliases.insert(alias.name.clone(), alias.clone());
        }
        let mut new_entry = PageEntry {
            id: annotated_page.page_id.clone(),
            name: annotated_page.page_name.clone(),
            url_pattern: annotated_page.url_pattern.clone(),
            version: timestamp.clone(),
            generated_at: timestamp.clone(),
            generated_by: "loom-profile-store".to_string(),
            summary: annotated_page.summary.clone(),
            aliases,
            history: Vec::new(),
        };

        match profile
            .pages
            .iter()
            .position(|p| p.id == annotated_page.page_id)
        {
            Some(index) => {
                let existing = &profile.pages[index];
                let mut snapshot = serde_json::to_value(existing)
                    .map_err(|e| ProfileStoreError::InvalidProfile(e.to_string()))?;
                if let Some(obj) = snapshot.as_object_mut() {
                    obj.remove("history");
                }
                let mut history = existing.history.clone();
                history.push(snapshot);
                new_entry.history = history;
                profile.pages[index] = new_entry;
            }
            None => profile.pages.push(new_entry),
        }

        profile.version = now_ts();

        self.write_atomic(path, &profile).await?;

        info!(page_id = %annotated_page.page_id, path = %path.display(), "merged page into site profile");
        Ok(MergeResult {
            output_path: path.to_path_buf(),
            created_new_file,
            page_id: annotated_page.page_id.clone(),
            warnings: annotated_page.warnings.clone(),
        })
    }

    async fn write_atomic(&self, path: &Path, profile: &SiteProfile) -> Result<(), ProfileStoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProfileStoreError::Write {
                    path: path.display().to_string(),
                    source: e.to_string(),
                })?;
        }
        let body = serde_json::to_vec_pretty(profile)
            .map_err(|e| ProfileStoreError::Write {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;

        let temp_path: PathBuf = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, body)
            .await
            .map_err(|e| ProfileStoreError::Write {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| ProfileStoreError::Write {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;
        Ok(())
    }
}

impl Default for SiteProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_profile_shape(raw: &serde_json::Value) -> Result<(), ProfileStoreError> {
    match raw.get("pages") {
        Some(serde_json::Value::Array(_)) => Ok(()),
        Some(_) => Err(ProfileStoreError::InvalidProfile(
            "top-level `pages` is not a list".into(),
        )),
        None => Err(ProfileStoreError::InvalidProfile(
            "top-level `pages` is missing".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core_types::profile::SiteAlias;
    use tempfile::tempdir;

    fn page(page_id: &str) -> AnnotatedPage {
        AnnotatedPage {
            page_id: page_id.to_string(),
            page_name: "Home".to_string(),
            url_pattern: "/home".to_string(),
            summary: None,
            aliases: vec![SiteAlias {
                name: "search.input".to_string(),
                selector: "#q".to_string(),
                description: None,
                role: Some("输入框".to_string()),
                confidence: None,
                notes: None,
                page_id: None,
            }],
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn merge_creates_file_when_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let store = SiteProfileStore::new();

        let result = store.merge_page(&path, &page("home"), Some("acme")).await.unwrap();
        assert!(result.created_new_file);

        let profile = store.load_profile(&path).await.unwrap();
        assert_eq!(profile.pages.len(), 1);
        assert!(profile.pages[0].history.is_empty());
    }

    #[tokio::test]
    async fn merge_moves_prior_entry_into_history_without_shrinking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let store = SiteProfileStore::new();

        store.merge_page(&path, &page("home"), None).await.unwrap();
        store.merge_page(&path, &page("home"), None).await.unwrap();
        let profile = store.load_profile(&path).await.unwrap();
        assert_eq!(profile.pages[0].history.len(), 1);

        store.merge_page(&path, &page("home"), None).await.unwrap();
        let profile = store.load_profile(&path).await.unwrap();
        assert_eq!(profile.pages[0].history.len(), 2);
    }

    #[tokio::test]
    async fn rejects_profile_missing_pages_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(&path, r#"{"version":"x"}"#).await.unwrap();
        let store = SiteProfileStore::new();
        assert!(store.load_profile(&path).await.is_err());
    }
}
