//! Builds parameterized INSERT, SELECT, UPDATE templates for the generated application.
//! Identifiers come from the resolved model; values are always `?` parameters bound at runtime.

use crate::config::{ResolvedProject, ResolvedTable, AUDIT_COLUMNS, RECORD_ID_COLUMN};
use crate::sql::Identifier;

/// What the generated application binds to one `?` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamSlot {
    /// Value collected by the column's widget.
    Column(Identifier),
    /// Caller identity captured from the session.
    Caller,
    /// Identifying column of the selected record.
    RecordId,
    /// Name of the table being written, for audit rows.
    TableName,
    /// `INSERT` or `UPDATE`, for audit rows.
    Operation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementTemplate {
    pub sql: String,
    pub params: Vec<ParamSlot>,
}

impl StatementTemplate {
    fn new() -> Self {
        StatementTemplate {
            sql: String::new(),
            params: Vec::new(),
        }
    }
}

/// SELECT list: identifying column, user columns, then audit columns when audited.
fn select_column_list(table: &ResolvedTable) -> String {
    let mut cols = vec![RECORD_ID_COLUMN.to_string()];
    cols.extend(table.columns.iter().map(|c| c.name.to_string()));
    if table.audited {
        cols.extend(AUDIT_COLUMNS.iter().map(|c| c.to_string()));
    }
    cols.join(", ")
}

/// SELECT all rows in insertion order.
pub fn select_all(table: &ResolvedTable) -> StatementTemplate {
    let mut q = StatementTemplate::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(table),
        table.qualified_name,
        RECORD_ID_COLUMN
    );
    q
}

/// SELECT one row by identifying column.
pub fn select_by_id(table: &ResolvedTable) -> StatementTemplate {
    let mut q = StatementTemplate::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_column_list(table),
        table.qualified_name,
        RECORD_ID_COLUMN
    );
    q.params.push(ParamSlot::RecordId);
    q
}

/// INSERT every user column; audited tables also set CREATED_BY / CREATED_AT.
/// Date and timestamp placeholders carry the widget contract's cast so string values bind correctly.
/// A column default is applied through `COALESCE` since binding NULL would override it.
pub fn insert(table: &ResolvedTable) -> StatementTemplate {
    let mut q = StatementTemplate::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        cols.push(c.name.to_string());
        let placeholder = c.widget.placeholder();
        placeholders.push(match &c.default {
            Some(d) => format!("COALESCE({}, {})", placeholder, d),
            None => placeholder,
        });
        q.params.push(ParamSlot::Column(c.name.clone()));
    }
    if table.audited {
        cols.push(AUDIT_COLUMNS[0].to_string());
        placeholders.push("?".to_string());
        q.params.push(ParamSlot::Caller);
        cols.push(AUDIT_COLUMNS[1].to_string());
        placeholders.push("CURRENT_TIMESTAMP()".to_string());
    }
    q.sql = format!(
        "INSERT INTO {} ({}) SELECT {}",
        table.qualified_name,
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by identifying column: SET every user column; audited tables also set MODIFIED_BY / MODIFIED_AT.
pub fn update(table: &ResolvedTable) -> StatementTemplate {
    let mut q = StatementTemplate::new();
    let mut sets = Vec::new();
    for c in &table.columns {
        sets.push(format!("{} = {}", c.name, c.widget.placeholder()));
        q.params.push(ParamSlot::Column(c.name.clone()));
    }
    if table.audited {
        sets.push(format!("{} = ?", AUDIT_COLUMNS[2]));
        q.params.push(ParamSlot::Caller);
        sets.push(format!("{} = CURRENT_TIMESTAMP()", AUDIT_COLUMNS[3]));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table.qualified_name,
        sets.join(", "),
        RECORD_ID_COLUMN
    );
    q.params.push(ParamSlot::RecordId);
    q
}

/// INSERT into the shared audit log; `None` when audit is disabled.
pub fn audit_log_insert(project: &ResolvedProject) -> Option<StatementTemplate> {
    let log = project.audit_log_table()?;
    let mut q = StatementTemplate::new();
    q.sql = format!(
        "INSERT INTO {} (TABLE_NAME, OPERATION, USER_NAME, RECORD_ID) SELECT ?, ?, ?, ?",
        log
    );
    q.params = vec![
        ParamSlot::TableName,
        ParamSlot::Operation,
        ParamSlot::Caller,
        ParamSlot::RecordId,
    ];
    Some(q)
}

/// Active values of a reference table in display order.
pub fn lookup_values(qualified_reference_table: &str) -> StatementTemplate {
    let mut q = StatementTemplate::new();
    q.sql = format!(
        "SELECT VALUE FROM {} WHERE IS_ACTIVE ORDER BY DISPLAY_ORDER, VALUE",
        qualified_reference_table
    );
    q
}
