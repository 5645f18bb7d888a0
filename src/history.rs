//! Project history: append-only records of generation runs, listed newest first and fetched by id.

use crate::error::HistoryError;
use crate::generator::GeneratedArtifactSet;
use crate::store::HistoryStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default time allowed for one store call.
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub requester: String,
    pub recorded_at: DateTime<Utc>,
    pub artifacts: GeneratedArtifactSet,
}

/// One row of the history listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecordSummary {
    pub id: Uuid,
    pub project_name: String,
    pub database: String,
    pub requester: String,
    pub generated_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub table_count: usize,
    pub column_count: usize,
}

/// Totals over a history listing, reported next to the listing's count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistoryTotals {
    /// Distinct project names.
    pub project_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    /// Distinct requesters.
    pub requester_count: usize,
}

impl HistoryTotals {
    pub fn from_summaries(summaries: &[HistoryRecordSummary]) -> Self {
        let projects: HashSet<&str> = summaries.iter().map(|s| s.project_name.as_str()).collect();
        let requesters: HashSet<&str> = summaries.iter().map(|s| s.requester.as_str()).collect();
        HistoryTotals {
            project_count: projects.len(),
            table_count: summaries.iter().map(|s| s.table_count).sum(),
            column_count: summaries.iter().map(|s| s.column_count).sum(),
            requester_count: requesters.len(),
        }
    }
}

impl HistoryRecord {
    pub fn summary(&self) -> HistoryRecordSummary {
        HistoryRecordSummary {
            id: self.id,
            project_name: self.artifacts.project.project_name.clone(),
            database: self.artifacts.database.clone(),
            requester: self.requester.clone(),
            generated_at: self.artifacts.generated_at,
            recorded_at: self.recorded_at,
            table_count: self.artifacts.table_count(),
            column_count: self.artifacts.column_count(),
        }
    }
}

/// Records generation runs through a [`HistoryStore`], each store call bounded by a timeout.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
    timeout: Duration,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>, timeout: Duration) -> Self {
        HistoryRecorder { store, timeout }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, HistoryError>>,
    ) -> Result<T, HistoryError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HistoryError::StorageUnavailable(format!(
                "{} timed out after {} ms",
                op,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Append a record for `artifacts`. Any store failure is reported as `StorageUnavailable`.
    pub async fn record(
        &self,
        artifacts: &GeneratedArtifactSet,
        requester: &str,
    ) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord {
            id: Uuid::new_v4(),
            requester: requester.to_string(),
            recorded_at: Utc::now(),
            artifacts: artifacts.clone(),
        };
        self.bounded("append", self.store.append(&record))
            .await
            .map_err(|e| match e {
                HistoryError::StorageUnavailable(_) => e,
                other => HistoryError::StorageUnavailable(other.to_string()),
            })?;
        tracing::info!(
            id = %record.id,
            requester = %record.requester,
            project = %record.artifacts.project.project_name,
            "generation recorded"
        );
        Ok(record)
    }

    /// Summaries, newest first.
    pub async fn list_history(&self) -> Result<Vec<HistoryRecordSummary>, HistoryError> {
        let mut summaries = self.bounded("list", self.store.list()).await?;
        summaries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(summaries)
    }

    pub async fn fetch(&self, id: Uuid) -> Result<HistoryRecord, HistoryError> {
        self.bounded("fetch", self.store.fetch(id))
            .await?
            .ok_or(HistoryError::NotFound(id))
    }

    pub async fn ping(&self) -> Result<(), HistoryError> {
        self.bounded("ping", self.store.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project;
    use crate::generator::generate;
    use crate::store::MemoryHistoryStore;

    fn artifacts(name: &str) -> GeneratedArtifactSet {
        let p = parse_project(&format!(
            r#"{{ "project_name": "{}", "prefix": "P", "tables": [{{ "name": "T", "columns": [
                {{ "name": "a", "type": "integer" }}, {{ "name": "b", "type": "boolean" }}
            ]}}] }}"#,
            name
        ))
        .unwrap();
        generate(&p).unwrap()
    }

    fn recorder() -> HistoryRecorder {
        HistoryRecorder::new(Arc::new(MemoryHistoryStore::default()), DEFAULT_HISTORY_TIMEOUT)
    }

    #[tokio::test]
    async fn record_then_fetch_and_list() {
        let r = recorder();
        let first = r.record(&artifacts("First"), "alice").await.unwrap();
        let second = r.record(&artifacts("Second"), "bob").await.unwrap();

        let fetched = r.fetch(first.id).await.unwrap();
        assert_eq!(fetched, first);

        let list = r.list_history().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[0].requester, "bob");
        assert_eq!(list[1].project_name, "First");
        assert_eq!(list[1].database, "P_DB");
        assert_eq!((list[1].table_count, list[1].column_count), (1, 2));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let id = Uuid::new_v4();
        assert!(matches!(recorder().fetch(id).await, Err(HistoryError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn totals_count_distinct_projects_and_requesters() {
        let r = recorder();
        r.record(&artifacts("First"), "alice").await.unwrap();
        r.record(&artifacts("First"), "bob").await.unwrap();
        r.record(&artifacts("Second"), "alice").await.unwrap();

        let totals = HistoryTotals::from_summaries(&r.list_history().await.unwrap());
        assert_eq!(
            totals,
            HistoryTotals { project_count: 2, table_count: 3, column_count: 6, requester_count: 2 }
        );
        assert_eq!(HistoryTotals::from_summaries(&[]), HistoryTotals::default());
    }
}
