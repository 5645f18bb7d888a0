//! Zip bundle of one generation run: the three artifacts plus `project.json` for re-loading the description.

use crate::error::AppError;
use crate::generator::{ArtifactKind, GeneratedArtifactSet};
use chrono::{Datelike, Timelike};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PROJECT_FILE_NAME: &str = "project.json";

fn bundle_err(e: impl std::fmt::Display) -> AppError {
    AppError::Bundle(e.to_string())
}

/// Download name for the bundle, e.g. `safety_bundle.zip`.
pub fn bundle_file_name(artifacts: &GeneratedArtifactSet) -> String {
    let stem = artifacts.names.app_source.trim_end_matches("_app.py");
    format!("{}_bundle.zip", stem)
}

/// Build the zip archive in memory. Entry timestamps are the generation time so equal runs give equal bytes.
pub fn build_bundle(artifacts: &GeneratedArtifactSet) -> Result<Vec<u8>, AppError> {
    let at = artifacts.generated_at;
    let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    if let Ok(ts) = zip::DateTime::from_date_and_time(
        at.year().clamp(1980, 2107) as u16,
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
    ) {
        options = options.last_modified_time(ts);
    }

    let project_json = serde_json::to_string_pretty(&artifacts.project).map_err(bundle_err)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let entries = [ArtifactKind::Sql, ArtifactKind::App, ArtifactKind::Docs]
        .map(|kind| artifacts.artifact(kind))
        .into_iter()
        .chain(std::iter::once((PROJECT_FILE_NAME, project_json.as_str())));
    for (name, text) in entries {
        zip.start_file(name, options).map_err(bundle_err)?;
        zip.write_all(text.as_bytes()).map_err(bundle_err)?;
    }
    let cursor = zip.finish().map_err(bundle_err)?;
    let bytes = cursor.into_inner();
    tracing::debug!(
        project = %artifacts.project.project_name,
        bytes = bytes.len(),
        "bundle built"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project;
    use crate::generator::generate_at;
    use chrono::{TimeZone, Utc};
    use std::io::Read;
    use zip::ZipArchive;

    fn artifacts() -> GeneratedArtifactSet {
        let p = parse_project(
            r#"{ "project_name": "Safety", "prefix": "Safety", "tables": [
                { "name": "INCIDENTS", "columns": [{ "name": "note", "type": "long_text" }] }
            ] }"#,
        )
        .unwrap();
        generate_at(&p, Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap()).unwrap()
    }

    fn entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut s = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn bundle_holds_artifacts_and_project_file() {
        let a = artifacts();
        let mut archive = ZipArchive::new(Cursor::new(build_bundle(&a).unwrap())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            ["README.md", "SAFETY_complete_setup.sql", "project.json", "safety_app.py"]
        );
        assert_eq!(entry(&mut archive, "SAFETY_complete_setup.sql"), a.sql_script);
        let project = parse_project(&entry(&mut archive, PROJECT_FILE_NAME)).unwrap();
        assert_eq!(project, a.project);
        assert_eq!(bundle_file_name(&a), "safety_bundle.zip");
    }

    #[test]
    fn equal_runs_give_equal_bytes() {
        assert_eq!(build_bundle(&artifacts()).unwrap(), build_bundle(&artifacts()).unwrap());
    }
}
