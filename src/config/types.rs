//! Raw project description types as received from the collector (wizard, HTTP body, JSON file).

use serde::{Deserialize, Serialize};

/// Whether a warehouse object is created by the script or already exists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResourceTarget {
    /// Created by the script under the naming contract (`{PREFIX}_DB`, `{PREFIX}_WH`).
    #[default]
    Create,
    /// Used as-is; the script never creates or alters it.
    Existing { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Text length for short_text, precision for decimal.
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub required: bool,
    /// Column default, given as a user literal and escaped per the column type.
    #[serde(default)]
    pub default: Option<String>,
    /// Reference table whose values populate a selection widget for this column.
    #[serde(default)]
    pub lookup: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTableSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub values: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_true")]
    pub enable_rbac: bool,
    #[serde(default = "default_true")]
    pub enable_audit: bool,
    #[serde(default)]
    pub enable_change_tracking: bool,
    #[serde(default)]
    pub enable_activity_monitoring: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            enable_rbac: true,
            enable_audit: true,
            enable_change_tracking: false,
            enable_activity_monitoring: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescription {
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub primary_contact: Option<String>,
    /// Prefix for every generated object name.
    pub prefix: String,
    #[serde(default)]
    pub namespace: ResourceTarget,
    #[serde(default)]
    pub compute: ResourceTarget,
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub reference_tables: Vec<ReferenceTableSpec>,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl ProjectDescription {
    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}
