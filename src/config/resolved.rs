//! Resolved project model: description validated and every name decided once, for the builders.

use crate::config::SecurityConfig;
use crate::mapping::{ColumnType, SqlType, WidgetContract};
use crate::sql::{qualified, Identifier, LiteralText};

/// Identifying column added to every data table.
pub const RECORD_ID_COLUMN: &str = "RECORD_ID";
/// Audit columns appended to audited tables, in emission order.
pub const AUDIT_COLUMNS: [&str; 4] = ["CREATED_BY", "CREATED_AT", "MODIFIED_BY", "MODIFIED_AT"];

pub const RAW_SCHEMA: &str = "RAW_DATA";
pub const APPS_SCHEMA: &str = "APPS";
pub const AUDIT_SCHEMA: &str = "AUDIT";
pub const AUDIT_LOG_TABLE: &str = "AUDIT_LOG";
pub const ACTIVITY_VIEW: &str = "USER_ACTIVITY";

#[derive(Clone, Debug)]
pub struct RoleNames {
    pub admin: Identifier,
    pub user: Identifier,
    pub readonly: Identifier,
}

#[derive(Clone, Debug)]
pub struct ResolvedColumn {
    pub name: Identifier,
    pub label: String,
    pub column_type: ColumnType,
    pub sql_type: SqlType,
    pub widget: WidgetContract,
    pub length: Option<u32>,
    pub required: bool,
    pub default: Option<LiteralText>,
    /// Fully qualified reference table feeding a selection widget.
    pub lookup: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub name: Identifier,
    /// `DB.RAW_DATA.NAME`
    pub qualified_name: String,
    pub label: String,
    pub description: Option<String>,
    pub columns: Vec<ResolvedColumn>,
    pub audited: bool,
    /// `ALTER TABLE ... SET CHANGE_TRACKING = TRUE` is emitted for this table.
    pub change_tracking: bool,
    /// `DB.AUDIT.NAME_CHANGES`, present when audit and change tracking are both enabled.
    pub change_stream: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedReferenceTable {
    pub name: Identifier,
    /// `DB.APPS.NAME`
    pub qualified_name: String,
    pub description: Option<String>,
    /// Raw values in display order.
    pub values: Vec<String>,
    /// Escaped literals, same order as `values`.
    pub literals: Vec<LiteralText>,
}

#[derive(Clone, Debug)]
pub struct ResolvedProject {
    pub project_name: String,
    pub description: Option<String>,
    pub team_name: Option<String>,
    pub primary_contact: Option<String>,
    pub prefix: Identifier,
    pub database: Identifier,
    pub create_database: bool,
    pub warehouse: Identifier,
    pub create_warehouse: bool,
    pub raw_schema: Identifier,
    pub apps_schema: Identifier,
    pub audit_schema: Identifier,
    /// Present when RBAC is enabled.
    pub roles: Option<RoleNames>,
    pub tables: Vec<ResolvedTable>,
    pub reference_tables: Vec<ResolvedReferenceTable>,
    /// `DB` literal for filters on account views.
    pub database_literal: LiteralText,
    pub security: SecurityConfig,
}

impl ResolvedProject {
    /// `DB.SCHEMA`
    pub fn schema_path(&self, schema: &Identifier) -> String {
        qualified(&[&self.database, schema])
    }

    pub fn audit_log_table(&self) -> Option<String> {
        self.security
            .enable_audit
            .then(|| qualified(&[&self.database, &self.audit_schema, &Identifier::fixed(AUDIT_LOG_TABLE)]))
    }

    pub fn activity_view(&self) -> Option<String> {
        self.security
            .enable_activity_monitoring
            .then(|| qualified(&[&self.database, &self.audit_schema, &Identifier::fixed(ACTIVITY_VIEW)]))
    }

    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}
