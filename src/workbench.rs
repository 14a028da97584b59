//! Workbench persistence
//!
//! History, the saved request library and environments, exported to and
//! restored from a single pretty-printed JSON backup file.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::{AxiomError, Result};
use crate::models::{generate_id, now_millis, ApiRequest, ApiResponse, HistoryItem};
use crate::transmit::EngineSnapshot;
use crate::variables::{Environment, EnvironmentStore};

/// Most history entries kept
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// In-memory workbench state
#[derive(Debug, Clone, PartialEq)]
pub struct Workbench {
    pub history: Vec<HistoryItem>,
    pub library: Vec<ApiRequest>,
    pub environments: EnvironmentStore,
    history_limit: usize,
}

/// On-disk backup format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkbenchFile {
    #[serde(default)]
    history: Vec<HistoryItem>,
    #[serde(default)]
    library: Vec<ApiRequest>,
    #[serde(default)]
    environments: Vec<Environment>,
    #[serde(default)]
    active_env_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_at: Option<DateTime<Utc>>,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            library: Vec::new(),
            environments: EnvironmentStore::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.history.truncate(limit);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Prepend a sent request to history, dropping the oldest past the limit.
    ///
    /// Returns the new entry, or `None` when the limit is zero and history is off.
    pub fn record(&mut self, request: ApiRequest, response: Option<ApiResponse>) -> Option<&HistoryItem> {
        let item = HistoryItem {
            id: generate_id(),
            request,
            response,
            timestamp: now_millis(),
        };
        self.history.insert(0, item);
        self.history.truncate(self.history_limit);
        self.history.first()
    }

    /// Record a batch run as one history entry holding its outcome counts.
    ///
    /// The entry's status is 200 when every item succeeded, otherwise the
    /// status of the first item that did not (`0` for a transport failure).
    pub fn record_batch(&mut self, template: ApiRequest, snapshot: &EngineSnapshot) -> Option<&HistoryItem> {
        let ok = snapshot.log.iter().filter(|r| r.is_success()).count();
        let failed = snapshot.failures();
        let status = snapshot
            .log
            .iter()
            .find(|r| !r.is_success())
            .map_or(200, |r| r.status);
        let data = json!({
            "state": snapshot.state,
            "total": snapshot.total,
            "sent": snapshot.log.len(),
            "ok": ok,
            "rejected": snapshot.log.len() - ok - failed,
            "failed": failed,
        });
        let response = ApiResponse {
            status,
            status_text: "Batch".to_string(),
            size: data.to_string().len(),
            data,
            headers: Default::default(),
            time: snapshot.log.iter().map(|r| r.time).sum(),
        };
        self.record(template, Some(response))
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Save a request to the library, replacing one with the same id
    pub fn save_to_library(&mut self, request: ApiRequest) {
        match self.library.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request,
            None => self.library.push(request),
        }
    }

    pub fn remove_from_library(&mut self, id: &str) -> Option<ApiRequest> {
        let pos = self.library.iter().position(|r| r.id == id)?;
        Some(self.library.remove(pos))
    }

    pub fn find_in_library(&self, name: &str) -> Option<&ApiRequest> {
        self.library.iter().find(|r| r.name == name)
    }

    /// Serialize the workbench as a backup document
    pub fn to_json(&self) -> Result<String> {
        let file = WorkbenchFile {
            history: self.history.clone(),
            library: self.library.clone(),
            environments: self.environments.environments().to_vec(),
            active_env_id: Some(self.environments.active_id().to_string()),
            exported_at: Some(Utc::now()),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Restore from a backup document
    pub fn from_json(content: &str) -> Result<Self> {
        let file: WorkbenchFile = serde_json::from_str(content)
            .map_err(|e| AxiomError::Persistence(format!("Invalid backup file: {}", e)))?;
        let mut workbench = Self {
            history: file.history,
            library: file.library,
            environments: EnvironmentStore::from_parts(file.environments, file.active_env_id),
            history_limit: DEFAULT_HISTORY_LIMIT,
        };
        workbench.history.truncate(workbench.history_limit);
        Ok(workbench)
    }

    /// Write the backup atomically (temp file in the same directory, then rename)
    pub fn export_to(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .map_err(|e| AxiomError::Persistence(format!("Failed to create directory: {}", e)))?;

        let content = self.to_json()?;
        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| AxiomError::Persistence(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| AxiomError::Persistence(format!("Failed to write workbench: {}", e)))?;
        temp.persist(path)
            .map_err(|e| AxiomError::Persistence(format!("Failed to save workbench: {}", e)))?;

        tracing::debug!(path = %path.display(), history = self.history.len(), "Workbench exported");
        Ok(())
    }

    pub fn import_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| AxiomError::Persistence(format!("Failed to read workbench: {}", e)))?;
        Self::from_json(&content)
    }

    /// Load `path` if it exists, otherwise start empty
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::import_from(path)
        } else {
            Ok(Self::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn test_history_is_newest_first_and_capped() {
        let mut wb = Workbench::new().with_history_limit(3);
        for i in 0..5 {
            wb.record(ApiRequest::new(HttpMethod::Get, format!("https://x.test/{}", i)), None);
        }
        assert_eq!(wb.history.len(), 3);
        assert_eq!(wb.history[0].request.url, "https://x.test/4");
        assert_eq!(wb.history[2].request.url, "https://x.test/2");
    }

    #[test]
    fn test_zero_history_limit_keeps_nothing() {
        let mut wb = Workbench::new().with_history_limit(0);
        assert!(wb.record(ApiRequest::new(HttpMethod::Get, "http://x.test"), None).is_none());
        assert!(wb.history.is_empty());

        let mut wb = Workbench::new().with_history_limit(1);
        let item = wb.record(ApiRequest::new(HttpMethod::Get, "http://x.test"), None).unwrap();
        assert_eq!(item.request.url, "http://x.test");
    }

    #[test]
    fn test_batch_run_recorded_as_summary() {
        use crate::transmit::{TransmissionResult, TransmissionState};

        let result = |index: usize, status: u16| TransmissionResult {
            index,
            sequence: index as i64 + 1,
            status,
            text: String::new(),
            time: if status == 0 { 0 } else { 5 },
        };
        let snapshot = EngineSnapshot {
            state: TransmissionState::Finished,
            progress: 100.0,
            total: 3,
            log: vec![result(0, 201), result(1, 409), result(2, 0)],
            run: 1,
        };

        let mut wb = Workbench::new();
        let template = ApiRequest::new(HttpMethod::Post, "http://x.test/users");
        let item = wb.record_batch(template, &snapshot).unwrap();
        let response = item.response.as_ref().unwrap();
        assert_eq!(item.request.url, "http://x.test/users");
        assert_eq!(response.status, 409);
        assert_eq!(response.status_text, "Batch");
        assert_eq!(response.time, 10);
        assert_eq!(response.data["state"], "finished");
        assert_eq!(response.data["sent"], 3);
        assert_eq!(response.data["ok"], 1);
        assert_eq!(response.data["rejected"], 1);
        assert_eq!(response.data["failed"], 1);

        let clean = EngineSnapshot {
            log: vec![result(0, 200)],
            total: 1,
            ..snapshot
        };
        assert_eq!(wb.record_batch(ApiRequest::new(HttpMethod::Put, "http://x.test"), &clean).unwrap().response.as_ref().unwrap().status, 200);
        assert_eq!(wb.history.len(), 2);

        let mut off = Workbench::new().with_history_limit(0);
        assert!(off.record_batch(ApiRequest::new(HttpMethod::Put, "http://x.test"), &clean).is_none());
    }

    #[test]
    fn test_library_replaces_by_id() {
        let mut wb = Workbench::new();
        let mut req = ApiRequest::new(HttpMethod::Post, "https://x.test").with_name("create");
        wb.save_to_library(req.clone());
        req.url = "https://y.test".into();
        wb.save_to_library(req.clone());
        assert_eq!(wb.library.len(), 1);
        assert_eq!(wb.find_in_library("create").unwrap().url, "https://y.test");
        assert!(wb.remove_from_library(&req.id).is_some());
        assert!(wb.library.is_empty());
    }

    #[test]
    fn test_export_import_keeps_active_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("backup.json");

        let mut wb = Workbench::new();
        let staging = wb.environments.create("Staging");
        wb.environments.activate(&staging).unwrap();
        wb.environments.set_variable("host", "staging.x");
        wb.record(ApiRequest::new(HttpMethod::Get, "https://{{host}}/"), None);
        wb.export_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"activeEnvId\""));
        assert!(raw.contains("\"exportedAt\""));

        let restored = Workbench::import_from(&path).unwrap();
        assert_eq!(restored.environments.active().name, "Staging");
        assert_eq!(restored.environments.active().get("host"), Some("staging.x"));
        assert_eq!(restored.history.len(), 1);
    }

    #[test]
    fn test_import_repairs_dangling_active_id() {
        let json = r#"{"environments":[{"id":"a","name":"A","variables":[]}],"activeEnvId":"gone"}"#;
        let wb = Workbench::from_json(json).unwrap();
        assert_eq!(wb.environments.active_id(), "a");
    }

    #[test]
    fn test_import_without_environments_gets_default() {
        let wb = Workbench::from_json("{}").unwrap();
        assert_eq!(wb.environments.environments().len(), 1);
        assert!(wb.history.is_empty());
    }

    #[test]
    fn test_invalid_backup_is_rejected() {
        assert!(matches!(Workbench::from_json("not json"), Err(AxiomError::Persistence(_))));
    }
}
