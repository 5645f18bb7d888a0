//! Generation pipeline: validate and resolve the description, build the three artifacts, record history.
//! A history failure never discards the artifacts; it is returned as a warning on the outcome.

use crate::codegen::{build_app_source, build_documentation, ArtifactNames};
use crate::config::{resolve, ProjectDescription};
use crate::error::{AppError, ErrorReport, GenerateError};
use crate::history::HistoryRecorder;
use crate::sql::build_sql_script;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// The three artifacts of one generation run, with the description that produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifactSet {
    pub project: ProjectDescription,
    /// Target database name, `{PREFIX}_DB` unless an existing one was named.
    pub database: String,
    pub names: ArtifactNames,
    pub sql_script: String,
    pub app_source: String,
    pub documentation: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Sql,
    App,
    Docs,
}

impl FromStr for ArtifactKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql" => Ok(ArtifactKind::Sql),
            "app" => Ok(ArtifactKind::App),
            "docs" => Ok(ArtifactKind::Docs),
            other => Err(AppError::BadRequest(format!(
                "unknown artifact kind '{}' (expected sql, app or docs)",
                other
            ))),
        }
    }
}

impl ArtifactKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Sql => "application/sql; charset=utf-8",
            ArtifactKind::App => "text/x-python; charset=utf-8",
            ArtifactKind::Docs => "text/markdown; charset=utf-8",
        }
    }
}

impl GeneratedArtifactSet {
    /// File name and text of one artifact.
    pub fn artifact(&self, kind: ArtifactKind) -> (&str, &str) {
        match kind {
            ArtifactKind::Sql => (self.names.sql_script.as_str(), self.sql_script.as_str()),
            ArtifactKind::App => (self.names.app_source.as_str(), self.app_source.as_str()),
            ArtifactKind::Docs => (self.names.documentation.as_str(), self.documentation.as_str()),
        }
    }

    pub fn table_count(&self) -> usize {
        self.project.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.project.total_columns()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerationOutcome {
    pub artifacts: GeneratedArtifactSet,
    /// Present when the run was recorded.
    pub record_id: Option<Uuid>,
    pub warnings: Vec<ErrorReport>,
}

pub fn generate(project: &ProjectDescription) -> Result<GeneratedArtifactSet, GenerateError> {
    generate_at(project, Utc::now())
}

/// Generate with a fixed timestamp. Same description and timestamp give identical artifacts.
pub fn generate_at(
    project: &ProjectDescription,
    generated_at: DateTime<Utc>,
) -> Result<GeneratedArtifactSet, GenerateError> {
    let resolved = resolve(project)?;
    let names = ArtifactNames::for_project(&resolved);
    let sql_script = build_sql_script(&resolved, generated_at).render();
    let app_source = build_app_source(&resolved, generated_at);
    let documentation = build_documentation(&resolved, &names, generated_at);
    tracing::info!(
        project = %resolved.project_name,
        database = %resolved.database,
        tables = resolved.tables.len(),
        columns = resolved.total_columns(),
        "artifacts generated"
    );
    Ok(GeneratedArtifactSet {
        project: project.clone(),
        database: resolved.database.to_string(),
        names,
        sql_script,
        app_source,
        documentation,
        generated_at,
    })
}

/// Generate, then append a history record. Validation and escaping errors abort; history errors do not.
pub async fn generate_and_record(
    recorder: &HistoryRecorder,
    project: &ProjectDescription,
    requester: &str,
) -> Result<GenerationOutcome, GenerateError> {
    let artifacts = generate(project)?;
    Ok(record_outcome(recorder, artifacts, requester).await)
}

pub(crate) async fn record_outcome(
    recorder: &HistoryRecorder,
    artifacts: GeneratedArtifactSet,
    requester: &str,
) -> GenerationOutcome {
    match recorder.record(&artifacts, requester).await {
        Ok(record) => GenerationOutcome {
            artifacts,
            record_id: Some(record.id),
            warnings: Vec::new(),
        },
        Err(e) => {
            tracing::warn!(error = %e, project = %artifacts.project.project_name, "generation not recorded");
            GenerationOutcome {
                artifacts,
                record_id: None,
                warnings: vec![e.report()],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project;
    use chrono::TimeZone;

    fn project() -> ProjectDescription {
        parse_project(
            r#"{
                "project_name": "Safety",
                "prefix": "safety",
                "tables": [{ "name": "incidents", "columns": [
                    { "name": "description", "type": "long_text", "required": true }
                ]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn regeneration_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap();
        let a = generate_at(&project(), at).unwrap();
        let b = generate_at(&project(), at).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.database, "SAFETY_DB");
        assert_eq!(a.artifact(ArtifactKind::Sql).0, "SAFETY_complete_setup.sql");
        assert_eq!(a.artifact(ArtifactKind::App).0, "safety_app.py");
        assert_eq!(a.artifact(ArtifactKind::Docs).0, "README.md");
    }

    #[test]
    fn validation_failure_builds_nothing() {
        let mut p = project();
        p.tables.clear();
        assert!(matches!(generate(&p), Err(GenerateError::Validation(_))));
    }

    #[test]
    fn artifact_kind_parses_route_segment() {
        assert_eq!("docs".parse::<ArtifactKind>().unwrap(), ArtifactKind::Docs);
        assert!("pdf".parse::<ArtifactKind>().is_err());
    }
}
