//! Process settings from environment variables (`.env` is loaded by the binary before this runs).

use crate::history::DEFAULT_HISTORY_TIMEOUT;
use crate::store::history_schema;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    /// When set, history is kept in PostgreSQL; otherwise in process memory.
    pub database_url: Option<String>,
    pub history_schema: String,
    pub history_timeout: Duration,
    /// One-shot mode: generate from this file into `out_dir` and exit.
    pub project_file: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> Self {
        let history_timeout = non_empty_var("APPGEN_HISTORY_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HISTORY_TIMEOUT);
        Settings {
            bind_addr: non_empty_var("APPGEN_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            database_url: non_empty_var("DATABASE_URL"),
            history_schema: history_schema(),
            history_timeout,
            project_file: non_empty_var("APPGEN_PROJECT_FILE").map(PathBuf::from),
            out_dir: non_empty_var("APPGEN_OUT_DIR").map(PathBuf::from),
        }
    }

    /// Both paths of one-shot mode, when both are configured.
    pub fn one_shot(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.project_file.as_ref().zip(self.out_dir.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_needs_both_paths() {
        let mut s = Settings {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_url: None,
            history_schema: "generator_governance".into(),
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            project_file: Some("project.json".into()),
            out_dir: None,
        };
        assert!(s.one_shot().is_none());
        s.out_dir = Some("out".into());
        assert_eq!(s.one_shot().map(|(f, _)| f.clone()), Some(PathBuf::from("project.json")));
    }
}
