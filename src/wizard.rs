//! Step-by-step collection of a project description with back/forward navigation.
//! `advance` validates only the fields owned by the current step; `back` never validates.

use crate::config::{
    validate, validate_project_setup, validate_tables, ProjectDescription, ReferenceTableSpec, ResourceTarget,
    SecurityConfig, TableSpec,
};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ProjectSetup,
    DefineTables,
    SecurityAudit,
    Review,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::ProjectSetup => Some(WizardStep::DefineTables),
            WizardStep::DefineTables => Some(WizardStep::SecurityAudit),
            WizardStep::SecurityAudit => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::ProjectSetup => None,
            WizardStep::DefineTables => Some(WizardStep::ProjectSetup),
            WizardStep::SecurityAudit => Some(WizardStep::DefineTables),
            WizardStep::Review => Some(WizardStep::SecurityAudit),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::ProjectSetup => "Project setup",
            WizardStep::DefineTables => "Define tables",
            WizardStep::SecurityAudit => "Security and audit",
            WizardStep::Review => "Review and generate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    step: WizardStep,
    draft: ProjectDescription,
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState {
            step: WizardStep::ProjectSetup,
            draft: ProjectDescription {
                project_name: String::new(),
                description: None,
                team_name: None,
                primary_contact: None,
                prefix: String::new(),
                namespace: ResourceTarget::Create,
                compute: ResourceTarget::Create,
                tables: Vec::new(),
                reference_tables: Vec::new(),
                security: SecurityConfig::default(),
            },
        }
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a saved description, e.g. an uploaded project file.
    pub fn from_description(draft: ProjectDescription) -> Self {
        WizardState {
            step: WizardStep::ProjectSetup,
            draft,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &ProjectDescription {
        &self.draft
    }

    /// Edit the draft in place; nothing is validated until `advance` or `finish`.
    pub fn draft_mut(&mut self) -> &mut ProjectDescription {
        &mut self.draft
    }

    pub fn add_table(&mut self, table: TableSpec) {
        self.draft.tables.push(table);
    }

    pub fn remove_table(&mut self, index: usize) -> Option<TableSpec> {
        (index < self.draft.tables.len()).then(|| self.draft.tables.remove(index))
    }

    pub fn add_reference_table(&mut self, table: ReferenceTableSpec) {
        self.draft.reference_tables.push(table);
    }

    pub fn set_security(&mut self, security: SecurityConfig) {
        self.draft.security = security;
    }

    /// Validate the fields owned by the current step.
    pub fn validate_step(&self) -> Result<(), ValidationError> {
        match self.step {
            WizardStep::ProjectSetup => validate_project_setup(&self.draft),
            WizardStep::DefineTables => validate_tables(&self.draft),
            WizardStep::SecurityAudit => Ok(()),
            WizardStep::Review => validate(&self.draft),
        }
    }

    /// Move forward when the current step is valid. Stays on `Review` once there.
    pub fn advance(&mut self) -> Result<WizardStep, ValidationError> {
        self.validate_step()?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.previous() {
            self.step = prev;
        }
        self.step
    }

    /// Fully validated description, ready for generation.
    pub fn finish(&self) -> Result<ProjectDescription, ValidationError> {
        validate(&self.draft)?;
        Ok(self.draft.clone())
    }
}
