//! Provisioning script: namespace, roles and grants, tables, reference data, audit objects, monitoring.
//! Order follows object dependencies; later statements only reference objects created earlier.
//! Every statement is re-runnable (IF NOT EXISTS, GRANT, USE, MERGE ... WHEN NOT MATCHED, ALTER ... SET).

use crate::config::{ResolvedProject, ResolvedReferenceTable, ResolvedTable, RoleNames, RECORD_ID_COLUMN};
use crate::sql::{comment_text, text_literal, Identifier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Setup,
    Namespace,
    Roles,
    Tables,
    ReferenceData,
    Audit,
    Monitoring,
    Summary,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::Setup => "Setup",
            Section::Namespace => "Database, schemas and warehouse",
            Section::Roles => "Roles and grants",
            Section::Tables => "Data tables",
            Section::ReferenceData => "Reference tables",
            Section::Audit => "Audit log and change streams",
            Section::Monitoring => "Activity monitoring",
            Section::Summary => "Summary",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One statement, without the trailing semicolon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub section: Section,
    pub sql: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SqlScript {
    pub header: Vec<String>,
    pub statements: Vec<Statement>,
}

impl SqlScript {
    pub fn in_section(&self, section: Section) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(move |s| s.section == section)
    }

    /// Script text: header comment, then each section under a banner, statements terminated by `;`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = format!("-- {}\n", "=".repeat(72));
        out.push_str(&rule);
        for line in &self.header {
            out.push_str("-- ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        let mut current = None;
        for s in &self.statements {
            if current != Some(s.section) {
                out.push_str(&format!("-- ---- {} ----\n\n", s.section.title()));
                current = Some(s.section);
            }
            out.push_str(&s.sql);
            out.push_str(";\n\n");
        }
        out
    }
}

struct ScriptBuf {
    section: Section,
    statements: Vec<Statement>,
}

impl ScriptBuf {
    fn push(&mut self, sql: impl Into<String>) {
        self.statements.push(Statement {
            section: self.section,
            sql: sql.into(),
        });
    }
}

/// Build the full provisioning script for a resolved project.
pub fn build_sql_script(project: &ResolvedProject, generated_at: DateTime<Utc>) -> SqlScript {
    let mut buf = ScriptBuf {
        section: Section::Setup,
        statements: Vec::new(),
    };

    buf.push("USE ROLE ACCOUNTADMIN");

    buf.section = Section::Namespace;
    namespace(&mut buf, project);

    if let Some(roles) = &project.roles {
        buf.section = Section::Roles;
        grants(&mut buf, project, roles);
    }

    buf.section = Section::Tables;
    for t in &project.tables {
        data_table(&mut buf, t);
    }

    if !project.reference_tables.is_empty() {
        buf.section = Section::ReferenceData;
        for r in &project.reference_tables {
            reference_table(&mut buf, r);
        }
    }

    if let Some(log) = project.audit_log_table() {
        buf.section = Section::Audit;
        buf.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  \
             AUDIT_ID NUMBER AUTOINCREMENT START 1 INCREMENT 1 PRIMARY KEY,\n  \
             TABLE_NAME VARCHAR(255) NOT NULL,\n  \
             OPERATION VARCHAR(20) NOT NULL,\n  \
             USER_NAME VARCHAR(255) DEFAULT CURRENT_USER(),\n  \
             EVENT_AT TIMESTAMP_NTZ DEFAULT CURRENT_TIMESTAMP(),\n  \
             {} NUMBER,\n  \
             CHANGES VARIANT\n) COMMENT = {}",
            log,
            RECORD_ID_COLUMN,
            text_literal("Insert and update events written by the data capture application")
        ));
        for t in &project.tables {
            if let Some(stream) = &t.change_stream {
                buf.push(format!(
                    "CREATE STREAM IF NOT EXISTS {} ON TABLE {}",
                    stream, t.qualified_name
                ));
            }
        }
    }

    if let Some(view) = project.activity_view() {
        buf.section = Section::Monitoring;
        buf.push(format!(
            "CREATE VIEW IF NOT EXISTS {} AS\n\
             SELECT USER_NAME, ROLE_NAME, QUERY_TYPE, QUERY_TEXT, START_TIME, END_TIME, EXECUTION_STATUS\n\
             FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY\n\
             WHERE DATABASE_NAME = {}",
            view, project.database_literal
        ));
    }

    buf.section = Section::Summary;
    buf.push(format!(
        "SELECT {} AS STATUS, {} AS TABLES_CREATED",
        text_literal(&format!("Setup complete for {}", project.database)),
        project.tables.len()
    ));

    let mut header = vec![format!("{}: complete setup", comment_text(&project.project_name))];
    if let Some(d) = &project.description {
        header.push(comment_text(d));
    }
    header.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    header.push(format!("Database: {}  Warehouse: {}", project.database, project.warehouse));
    header.push("Safe to re-run: existing objects are skipped, never dropped.".to_string());

    tracing::debug!(
        database = %project.database,
        statements = buf.statements.len(),
        "sql script built"
    );

    SqlScript {
        header,
        statements: buf.statements,
    }
}

fn namespace(buf: &mut ScriptBuf, project: &ResolvedProject) {
    if project.create_database {
        let comment = match &project.description {
            Some(d) => format!("{}: {}", project.project_name, d),
            None => project.project_name.clone(),
        };
        buf.push(format!(
            "CREATE DATABASE IF NOT EXISTS {} COMMENT = {}",
            project.database,
            text_literal(&comment)
        ));
    }
    buf.push(format!("USE DATABASE {}", project.database));

    let mut schemas: Vec<(&Identifier, &str)> = vec![
        (&project.raw_schema, "Data captured through the application"),
        (&project.apps_schema, "Reference tables and application objects"),
    ];
    if audit_schema_needed(project) {
        schemas.push((&project.audit_schema, "Audit log, change streams and activity views"));
    }
    for (schema, comment) in schemas {
        buf.push(format!(
            "CREATE SCHEMA IF NOT EXISTS {} COMMENT = {}",
            project.schema_path(schema),
            text_literal(comment)
        ));
    }

    if project.create_warehouse {
        buf.push(format!(
            "CREATE WAREHOUSE IF NOT EXISTS {} WITH WAREHOUSE_SIZE = 'XSMALL' AUTO_SUSPEND = 60 \
             AUTO_RESUME = TRUE INITIALLY_SUSPENDED = TRUE",
            project.warehouse
        ));
    }
    buf.push(format!("USE WAREHOUSE {}", project.warehouse));
}

fn audit_schema_needed(project: &ResolvedProject) -> bool {
    project.security.enable_audit || project.security.enable_activity_monitoring
}

fn grants(buf: &mut ScriptBuf, project: &ResolvedProject, roles: &RoleNames) {
    let all = [&roles.admin, &roles.user, &roles.readonly];
    for r in all {
        buf.push(format!("CREATE ROLE IF NOT EXISTS {}", r));
    }
    buf.push(format!("GRANT ROLE {} TO ROLE SYSADMIN", roles.admin));
    buf.push(format!("GRANT ROLE {} TO ROLE {}", roles.user, roles.admin));
    buf.push(format!("GRANT ROLE {} TO ROLE {}", roles.readonly, roles.user));

    for r in all {
        buf.push(format!("GRANT USAGE ON DATABASE {} TO ROLE {}", project.database, r));
        buf.push(format!("GRANT USAGE ON WAREHOUSE {} TO ROLE {}", project.warehouse, r));
    }

    let raw = project.schema_path(&project.raw_schema);
    let apps = project.schema_path(&project.apps_schema);
    for schema in [&raw, &apps] {
        for r in all {
            buf.push(format!("GRANT USAGE ON SCHEMA {} TO ROLE {}", schema, r));
        }
        buf.push(format!("GRANT ALL PRIVILEGES ON SCHEMA {} TO ROLE {}", schema, roles.admin));
        table_grants(buf, schema, "ALL PRIVILEGES", &roles.admin);
    }
    table_grants(buf, &raw, "SELECT, INSERT, UPDATE", &roles.user);
    table_grants(buf, &raw, "SELECT", &roles.readonly);
    table_grants(buf, &apps, "SELECT", &roles.user);
    table_grants(buf, &apps, "SELECT", &roles.readonly);

    if audit_schema_needed(project) {
        let audit = project.schema_path(&project.audit_schema);
        buf.push(format!("GRANT USAGE ON SCHEMA {} TO ROLE {}", audit, roles.admin));
        buf.push(format!("GRANT USAGE ON SCHEMA {} TO ROLE {}", audit, roles.user));
        buf.push(format!("GRANT ALL PRIVILEGES ON SCHEMA {} TO ROLE {}", audit, roles.admin));
        table_grants(buf, &audit, "ALL PRIVILEGES", &roles.admin);
        if project.security.enable_audit {
            // the application appends audit rows as the user role
            table_grants(buf, &audit, "INSERT", &roles.user);
        }
        if project.security.enable_activity_monitoring {
            buf.push(format!(
                "GRANT SELECT ON FUTURE VIEWS IN SCHEMA {} TO ROLE {}",
                audit, roles.admin
            ));
        }
    }
}

fn table_grants(buf: &mut ScriptBuf, schema: &str, privileges: &str, role: &Identifier) {
    buf.push(format!(
        "GRANT {} ON ALL TABLES IN SCHEMA {} TO ROLE {}",
        privileges, schema, role
    ));
    buf.push(format!(
        "GRANT {} ON FUTURE TABLES IN SCHEMA {} TO ROLE {}",
        privileges, schema, role
    ));
}

fn data_table(buf: &mut ScriptBuf, t: &ResolvedTable) {
    let mut col_defs = vec![format!(
        "{} NUMBER AUTOINCREMENT START 1 INCREMENT 1 PRIMARY KEY",
        RECORD_ID_COLUMN
    )];
    for c in &t.columns {
        let mut def = format!("{} {}", c.name, c.sql_type);
        if let Some(d) = &c.default {
            def.push_str(" DEFAULT ");
            def.push_str(d.as_str());
        }
        if c.required {
            def.push_str(" NOT NULL");
        }
        col_defs.push(def);
    }
    if t.audited {
        col_defs.extend([
            "CREATED_BY VARCHAR(255) DEFAULT CURRENT_USER()".to_string(),
            "CREATED_AT TIMESTAMP_NTZ DEFAULT CURRENT_TIMESTAMP()".to_string(),
            "MODIFIED_BY VARCHAR(255)".to_string(),
            "MODIFIED_AT TIMESTAMP_NTZ".to_string(),
        ]);
    }
    let comment = t
        .description
        .as_deref()
        .map(|d| format!(" COMMENT = {}", text_literal(d)))
        .unwrap_or_default();
    buf.push(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n){}",
        t.qualified_name,
        col_defs.join(",\n  "),
        comment
    ));
    if t.change_tracking {
        buf.push(format!("ALTER TABLE {} SET CHANGE_TRACKING = TRUE", t.qualified_name));
    }
}

fn reference_table(buf: &mut ScriptBuf, r: &ResolvedReferenceTable) {
    let comment = r
        .description
        .as_deref()
        .map(|d| format!(" COMMENT = {}", text_literal(d)))
        .unwrap_or_default();
    buf.push(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  \
         VALUE VARCHAR(255) PRIMARY KEY,\n  \
         DISPLAY_ORDER INTEGER,\n  \
         IS_ACTIVE BOOLEAN DEFAULT TRUE\n){}",
        r.qualified_name, comment
    ));
    for (i, lit) in r.literals.iter().enumerate() {
        buf.push(format!(
            "MERGE INTO {} AS t USING (SELECT {} AS VALUE, {} AS DISPLAY_ORDER) AS s ON t.VALUE = s.VALUE \
             WHEN NOT MATCHED THEN INSERT (VALUE, DISPLAY_ORDER, IS_ACTIVE) VALUES (s.VALUE, s.DISPLAY_ORDER, TRUE)",
            r.qualified_name,
            lit,
            i + 1
        ));
    }
}

/// Qualified names of every object the script may create, in creation order.
pub fn created_objects(project: &ResolvedProject) -> Vec<String> {
    let mut out = Vec::new();
    if project.create_database {
        out.push(project.database.to_string());
    }
    out.push(project.schema_path(&project.raw_schema));
    out.push(project.schema_path(&project.apps_schema));
    if audit_schema_needed(project) {
        out.push(project.schema_path(&project.audit_schema));
    }
    if project.create_warehouse {
        out.push(project.warehouse.to_string());
    }
    if let Some(roles) = &project.roles {
        out.extend([&roles.admin, &roles.user, &roles.readonly].iter().map(|r| r.to_string()));
    }
    out.extend(project.tables.iter().map(|t| t.qualified_name.clone()));
    out.extend(project.reference_tables.iter().map(|r| r.qualified_name.clone()));
    out.extend(project.audit_log_table());
    out.extend(project.tables.iter().filter_map(|t| t.change_stream.clone()));
    out.extend(project.activity_view());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_project, resolve, ProjectDescription};
    use chrono::TimeZone;

    fn description() -> ProjectDescription {
        parse_project(
            r#"{
                "project_name": "Safety",
                "prefix": "SAFETY",
                "tables": [
                    { "name": "INCIDENTS", "description": "Reported incidents", "columns": [
                        { "name": "description", "type": "long_text", "required": true },
                        { "name": "severity", "type": "integer", "required": true, "default": "3" }
                    ]},
                    { "name": "ACTIONS", "columns": [
                        { "name": "note", "type": "short_text", "length": 200 }
                    ]}
                ],
                "reference_tables": [{ "name": "STATUSES", "values": ["Open", "O'Brien"] }],
                "security": { "enable_change_tracking": true, "enable_activity_monitoring": true }
            }"#,
        )
        .unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap()
    }

    #[test]
    fn sections_appear_in_dependency_order() {
        let script = build_sql_script(&resolve(&description()).unwrap(), at());
        let sections: Vec<Section> = script.statements.iter().map(|s| s.section).collect();
        let mut sorted = sections.clone();
        sorted.sort();
        assert_eq!(sections, sorted);
        assert_eq!(sections.first(), Some(&Section::Setup));
        assert_eq!(sections.last(), Some(&Section::Summary));
    }

    #[test]
    fn tables_follow_input_order_with_audit_columns() {
        let script = build_sql_script(&resolve(&description()).unwrap(), at());
        let creates: Vec<&Statement> = script
            .in_section(Section::Tables)
            .filter(|s| s.sql.starts_with("CREATE TABLE"))
            .collect();
        assert_eq!(creates.len(), 2);
        assert!(creates[0].sql.starts_with("CREATE TABLE IF NOT EXISTS SAFETY_DB.RAW_DATA.INCIDENTS ("));
        assert!(creates[1].sql.starts_with("CREATE TABLE IF NOT EXISTS SAFETY_DB.RAW_DATA.ACTIONS ("));
        let incidents = &creates[0].sql;
        assert!(incidents.contains("DESCRIPTION TEXT NOT NULL"));
        assert!(incidents.contains("SEVERITY INTEGER DEFAULT 3 NOT NULL"));
        assert!(incidents.contains("MODIFIED_AT TIMESTAMP_NTZ"));
        assert!(incidents.ends_with("COMMENT = 'Reported incidents'"));
        assert!(script
            .in_section(Section::Tables)
            .any(|s| s.sql == "ALTER TABLE SAFETY_DB.RAW_DATA.ACTIONS SET CHANGE_TRACKING = TRUE"));
    }

    #[test]
    fn reference_rows_are_merged_with_escaped_values() {
        let script = build_sql_script(&resolve(&description()).unwrap(), at());
        let merges: Vec<&Statement> = script
            .in_section(Section::ReferenceData)
            .filter(|s| s.sql.starts_with("MERGE INTO"))
            .collect();
        assert_eq!(merges.len(), 2);
        assert!(merges[1].sql.contains("SELECT 'O''Brien' AS VALUE, 2 AS DISPLAY_ORDER"));
        assert!(merges[1].sql.contains("WHEN NOT MATCHED THEN INSERT"));
    }

    #[test]
    fn audit_and_monitoring_objects() {
        let script = build_sql_script(&resolve(&description()).unwrap(), at());
        assert!(script
            .in_section(Section::Audit)
            .any(|s| s.sql.starts_with("CREATE TABLE IF NOT EXISTS SAFETY_DB.AUDIT.AUDIT_LOG (")));
        assert!(script.in_section(Section::Audit).any(|s| s.sql
            == "CREATE STREAM IF NOT EXISTS SAFETY_DB.AUDIT.INCIDENTS_CHANGES ON TABLE SAFETY_DB.RAW_DATA.INCIDENTS"));
        let view = script.in_section(Section::Monitoring).next().unwrap();
        assert!(view.sql.ends_with("WHERE DATABASE_NAME = 'SAFETY_DB'"));
    }

    #[test]
    fn disabled_security_blocks_are_omitted() {
        let mut p = description();
        p.security.enable_rbac = false;
        p.security.enable_audit = false;
        p.security.enable_activity_monitoring = false;
        let script = build_sql_script(&resolve(&p).unwrap(), at());
        assert_eq!(script.in_section(Section::Roles).count(), 0);
        assert_eq!(script.in_section(Section::Audit).count(), 0);
        assert_eq!(script.in_section(Section::Monitoring).count(), 0);
        let text = script.render();
        assert!(!text.contains("SAFETY_DB.AUDIT"));
        assert!(!text.contains("CREATED_BY"));
    }

    #[test]
    fn change_tracking_does_not_depend_on_audit() {
        let mut p = description();
        p.security.enable_audit = false;
        p.security.enable_change_tracking = true;
        let script = build_sql_script(&resolve(&p).unwrap(), at());
        let alters: Vec<&str> = script
            .in_section(Section::Tables)
            .filter(|s| s.sql.starts_with("ALTER TABLE"))
            .map(|s| s.sql.as_str())
            .collect();
        assert_eq!(
            alters,
            [
                "ALTER TABLE SAFETY_DB.RAW_DATA.INCIDENTS SET CHANGE_TRACKING = TRUE",
                "ALTER TABLE SAFETY_DB.RAW_DATA.ACTIONS SET CHANGE_TRACKING = TRUE",
            ]
        );
        assert!(!script.render().contains("CREATE STREAM"));
    }

    #[test]
    fn existing_namespace_and_compute_are_only_used() {
        let mut p = description();
        p.namespace = crate::config::ResourceTarget::Existing { name: "SHARED_DB".into() };
        p.compute = crate::config::ResourceTarget::Existing { name: "SHARED_WH".into() };
        let script = build_sql_script(&resolve(&p).unwrap(), at());
        let text = script.render();
        assert!(!text.contains("CREATE DATABASE"));
        assert!(!text.contains("CREATE WAREHOUSE"));
        assert!(text.contains("USE DATABASE SHARED_DB;"));
        assert!(text.contains("USE WAREHOUSE SHARED_WH;"));
    }

    #[test]
    fn render_has_header_and_banners() {
        let script = build_sql_script(&resolve(&description()).unwrap(), at());
        let text = script.render();
        assert!(text.starts_with("-- ====="));
        assert!(text.contains("-- Generated: 2025-11-03 08:00:00 UTC\n"));
        assert!(text.contains("-- ---- Roles and grants ----\n\nCREATE ROLE IF NOT EXISTS SAFETY_ADMIN;\n"));
        assert_eq!(script.render(), build_sql_script(&resolve(&description()).unwrap(), at()).render());
    }
}
