//! Appgen SDK: turns a project description into a warehouse SQL setup script, a data capture
//! application and a deployment guide, and keeps a history of what was generated.

pub mod bundle;
pub mod case;
pub mod codegen;
pub mod config;
pub mod error;
pub mod extractors;
pub mod generator;
pub mod handlers;
pub mod history;
pub mod mapping;
pub mod response;
pub mod routes;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod wizard;

pub use bundle::build_bundle;
pub use config::{load_project_file, parse_project, resolve, validate, ProjectDescription, ResolvedProject};
pub use error::{AppError, ConfigError, ErrorReport, GenerateError, HistoryError, ValidationError};
pub use generator::{generate, generate_and_record, generate_at, ArtifactKind, GeneratedArtifactSet, GenerationOutcome};
pub use history::{HistoryRecord, HistoryRecordSummary, HistoryRecorder};
pub use routes::{app, common_routes_with_ready};
pub use settings::Settings;
pub use state::AppState;
pub use store::{ensure_database_exists, HistoryStore, MemoryHistoryStore, PgHistoryStore};
pub use wizard::{WizardState, WizardStep};
