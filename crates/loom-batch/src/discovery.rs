use std::path::{Path, PathBuf};

use crate::errors::BatchError;

/// One discovered case: a name plus the path to its `action_plan.json`
/// (either `<case>/action_plan.json` or a top-level `<case>.json`).
#[derive(Clone, Debug)]
pub struct CaseEntry {
    pub name: String,
    pub plan_path: PathBuf,
}

/// Scans `plan_dir/cases/*`, stable-sorted by name (spec §4.9).
pub async fn discover_cases(plan_dir: &Path) -> Result<Vec<CaseEntry>, BatchError> {
    let cases_dir = plan_dir.join("cases");
    if !tokio::fs::try_exists(&cases_dir).await.unwrap_or(false) {
        return Err(BatchError::CasesDirNotFound(cases_dir.display().to_string()));
    }

    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(&cases_dir)
        .await
        .map_err(|e| BatchError::Io(e.to_string()))?;

    while let Some(entry) = reader.next_entry().await.map_err(|e| BatchError::Io(e.to_string()))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| BatchError::Io(e.to_string()))?;

        if file_type.is_dir() {
            let plan_path = path.join("action_plan.json");
            if tokio::fs::try_exists(&plan_path).await.unwrap_or(false) {
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                entries.push(CaseEntry { name, plan_path });
            }
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            let name = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            entries.push(CaseEntry { name, plan_path: path });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
