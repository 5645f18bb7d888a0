//! Text artifacts built from the resolved model: the data capture application and the deployment guide.

pub mod app;
pub mod docs;

pub use app::*;
pub use docs::*;

use crate::case::to_code_name;
use crate::config::ResolvedProject;
use serde::{Deserialize, Serialize};

/// File names of the three artifacts, derived from the prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNames {
    pub sql_script: String,
    pub app_source: String,
    pub documentation: String,
}

impl ArtifactNames {
    pub fn for_project(project: &ResolvedProject) -> Self {
        ArtifactNames {
            sql_script: format!("{}_complete_setup.sql", project.prefix),
            app_source: format!("{}_app.py", to_code_name(project.prefix.as_str())),
            documentation: "README.md".to_string(),
        }
    }
}
