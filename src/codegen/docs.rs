//! Markdown deployment guide: overview, object inventory, setup order, deployment steps, warnings.

use crate::codegen::ArtifactNames;
use crate::config::{ResolvedProject, AUDIT_COLUMNS, RECORD_ID_COLUMN};
use crate::sql::{build_sql_script, created_objects, Section};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Escape free text for inline Markdown: whitespace runs (newlines included) collapse to one space.
pub fn markdown_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn code(name: impl std::fmt::Display) -> String {
    format!("`{}`", name)
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub fn build_documentation(
    project: &ResolvedProject,
    names: &ArtifactNames,
    generated_at: DateTime<Utc>,
) -> String {
    let mut md = String::new();
    write_documentation(&mut md, project, names, generated_at)
        .map(|()| md)
        .unwrap_or_default()
}

fn write_documentation(
    md: &mut String,
    project: &ResolvedProject,
    names: &ArtifactNames,
    generated_at: DateTime<Utc>,
) -> std::fmt::Result {
    let sec = project.security;

    writeln!(md, "# {}", markdown_text(&project.project_name))?;
    writeln!(md)?;
    writeln!(md, "Generated {}.", generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(md)?;

    writeln!(md, "## Overview")?;
    writeln!(md)?;
    if let Some(d) = &project.description {
        writeln!(md, "{}", markdown_text(d))?;
        writeln!(md)?;
    }
    writeln!(
        md,
        "This bundle provisions {} data table(s) with {} column(s) in {} and a data capture application for them.",
        project.tables.len(),
        project.total_columns(),
        code(&project.database)
    )?;
    writeln!(md)?;
    if project.team_name.is_some() || project.primary_contact.is_some() {
        writeln!(md, "## Team")?;
        writeln!(md)?;
        if let Some(t) = &project.team_name {
            writeln!(md, "- Team: {}", markdown_text(t))?;
        }
        if let Some(c) = &project.primary_contact {
            writeln!(md, "- Primary contact: {}", markdown_text(c))?;
        }
        writeln!(md)?;
    }

    writeln!(md, "## Files")?;
    writeln!(md)?;
    writeln!(md, "- {}: setup script, run once per environment (safe to re-run)", code(&names.sql_script))?;
    writeln!(md, "- {}: Streamlit data capture application", code(&names.app_source))?;
    writeln!(md, "- {}: this guide", code(&names.documentation))?;
    writeln!(md)?;

    writeln!(md, "## Objects")?;
    writeln!(md)?;
    let origin = |created: bool| if created { "created by the setup script" } else { "existing, used as is" };
    writeln!(md, "- Database: {} ({})", code(&project.database), origin(project.create_database))?;
    writeln!(md, "- Warehouse: {} ({})", code(&project.warehouse), origin(project.create_warehouse))?;
    let mut schemas = vec![code(&project.raw_schema), code(&project.apps_schema)];
    if sec.enable_audit || sec.enable_activity_monitoring {
        schemas.push(code(&project.audit_schema));
    }
    writeln!(md, "- Schemas: {}", schemas.join(", "))?;
    match &project.roles {
        Some(r) => writeln!(
            md,
            "- Roles: {} (full control), {} (read and write data), {} (read only)",
            code(&r.admin),
            code(&r.user),
            code(&r.readonly)
        )?,
        None => writeln!(md, "- Roles: none (role-based access disabled)")?,
    }
    writeln!(md)?;

    writeln!(md, "### Data tables")?;
    writeln!(md)?;
    for t in &project.tables {
        writeln!(md, "#### {}", code(&t.qualified_name))?;
        writeln!(md)?;
        if let Some(d) = &t.description {
            writeln!(md, "{}", markdown_text(d))?;
            writeln!(md)?;
        }
        writeln!(md, "| Column | Type | Required | Default | Choices from |")?;
        writeln!(md, "| --- | --- | --- | --- | --- |")?;
        writeln!(md, "| {} | `NUMBER` | yes | auto increment | |", code(RECORD_ID_COLUMN))?;
        for c in &t.columns {
            writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                code(&c.name),
                code(&c.sql_type),
                yes_no(c.required),
                c.default.as_ref().map(|d| markdown_text(d.as_str())).unwrap_or_default(),
                c.lookup.as_deref().map(code).unwrap_or_default()
            )?;
        }
        if t.audited {
            for a in AUDIT_COLUMNS {
                writeln!(md, "| {} | audit | filled by the application | | |", code(a))?;
            }
        }
        writeln!(md)?;
    }

    if !project.reference_tables.is_empty() {
        writeln!(md, "### Reference tables")?;
        writeln!(md)?;
        for r in &project.reference_tables {
            let values: Vec<String> = r.values.iter().map(|v| markdown_text(v)).collect();
            write!(md, "- {} ({} values)", code(&r.qualified_name), values.len())?;
            if let Some(d) = &r.description {
                write!(md, ": {}", markdown_text(d))?;
            }
            writeln!(md)?;
            if !values.is_empty() {
                writeln!(md, "  - {}", values.join(", "))?;
            }
        }
        writeln!(md)?;
    }

    if sec.enable_audit || sec.enable_activity_monitoring {
        writeln!(md, "### Audit and monitoring")?;
        writeln!(md)?;
        if let Some(log) = project.audit_log_table() {
            writeln!(md, "- Audit log: {} (one row per insert and update made in the app)", code(log))?;
        }
        for t in &project.tables {
            if let Some(s) = &t.change_stream {
                writeln!(md, "- Change stream: {} on {}", code(s), code(&t.qualified_name))?;
            }
        }
        if let Some(v) = project.activity_view() {
            writeln!(md, "- Activity view: {} (queries against this database)", code(v))?;
        }
        writeln!(md)?;
    }

    writeln!(md, "## Setup order")?;
    writeln!(md)?;
    let script = build_sql_script(project, generated_at);
    let mut order: Vec<(Section, usize)> = Vec::new();
    for s in &script.statements {
        match order.last_mut() {
            Some((section, n)) if *section == s.section => *n += 1,
            _ => order.push((s.section, 1)),
        }
    }
    for (i, (section, n)) in order.iter().enumerate() {
        writeln!(md, "{}. {} ({} statement(s))", i + 1, section.title(), n)?;
    }
    writeln!(md)?;
    writeln!(md, "After a run, each of these objects should exist:")?;
    writeln!(md)?;
    for name in created_objects(project) {
        writeln!(md, "- [ ] {}", code(name))?;
    }
    writeln!(md)?;

    writeln!(md, "## Deployment")?;
    writeln!(md)?;
    writeln!(
        md,
        "1. Open a worksheet as a user holding `ACCOUNTADMIN` and run {} from top to bottom.",
        code(&names.sql_script)
    )?;
    writeln!(md, "2. Check the final summary row reports the database and table count.")?;
    writeln!(
        md,
        "3. Create a Streamlit app in {} using warehouse {} and replace its source with {}.",
        code(project.schema_path(&project.apps_schema)),
        code(&project.warehouse),
        code(&names.app_source)
    )?;
    match &project.roles {
        Some(r) => {
            writeln!(
                md,
                "4. Grant access: `GRANT ROLE {} TO USER <user>;` for data entry, `GRANT ROLE {} TO USER <user>;` for read only.",
                r.user, r.readonly
            )?;
            writeln!(md, "5. Share the app with {} and {}.", code(&r.user), code(&r.readonly))?;
        }
        None => writeln!(md, "4. Share the app with the roles that should use it.")?,
    }
    writeln!(md)?;

    writeln!(md, "## Warnings")?;
    writeln!(md)?;
    writeln!(
        md,
        "- Re-running the setup script skips objects that already exist. It never alters an existing table, \
         so columns added to the project later are not applied to tables created by an earlier run."
    )?;
    if !project.create_database || !project.create_warehouse {
        writeln!(
            md,
            "- Existing objects are used as is. Tables with the same names in {} keep their current columns.",
            code(&project.database)
        )?;
    }
    if !sec.enable_audit {
        writeln!(md, "- Audit is disabled: the app does not record who created or changed a record.")?;
    }
    if project.roles.is_none() {
        writeln!(md, "- Role-based access is disabled: grant privileges on the new objects manually.")?;
    }
    if project.tables.iter().any(|t| t.change_stream.is_some()) {
        writeln!(md, "- Change streams keep changes until consumed; read them regularly to avoid staleness.")?;
    }
    if sec.enable_activity_monitoring {
        writeln!(
            md,
            "- The activity view reads `SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY`, which lags by up to 45 minutes \
             and needs `IMPORTED PRIVILEGES` on the `SNOWFLAKE` database."
        )?;
    }
    Ok(())
}
