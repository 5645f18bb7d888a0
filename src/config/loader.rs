//! Load a project description from JSON and resolve it into the builders' model.

use crate::case::to_display_label;
use crate::config::resolved::*;
use crate::config::types::*;
use crate::config::validate;
use crate::error::{ConfigError, EscapeError, GenerateError, ValidationError};
use crate::mapping::{sql_type_for, widget_contract_for, ColumnType};
use crate::sql::{qualified, safe_bounded_literal, safe_identifier, safe_literal, Identifier};
use std::collections::HashMap;
use std::path::Path;

/// Reference table values are stored as `VARCHAR(255)`.
pub const REFERENCE_VALUE_LENGTH: u32 = 255;

pub fn parse_project(json: &str) -> Result<ProjectDescription, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
}

pub async fn load_project_file(path: impl AsRef<Path>) -> Result<ProjectDescription, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_project(&text)
}

fn ident(field: impl Into<String>, raw: &str, prefix: Option<&str>) -> Result<Identifier, GenerateError> {
    safe_identifier(raw, prefix).map_err(|source| {
        GenerateError::Validation(ValidationError::Identifier {
            field: field.into(),
            source,
        })
    })
}

fn target_name(
    field: &str,
    target: &ResourceTarget,
    prefix: &Identifier,
    suffix: &str,
) -> Result<(Identifier, bool), GenerateError> {
    match target {
        ResourceTarget::Create => Ok((ident(field, suffix, Some(prefix.as_str()))?, true)),
        ResourceTarget::Existing { name } => Ok((ident(format!("{}.name", field), name, None)?, false)),
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn escaping(table: &Identifier, field: String) -> impl FnOnce(EscapeError) -> GenerateError + '_ {
    move |source| GenerateError::Escaping {
        table: table.to_string(),
        field,
        source,
    }
}

/// Build the resolved model from a project description (validates first).
pub fn resolve(project: &ProjectDescription) -> Result<ResolvedProject, GenerateError> {
    validate(project)?;

    let prefix = ident("prefix", &project.prefix, None)?;
    let (database, create_database) = target_name("namespace", &project.namespace, &prefix, "DB")?;
    let (warehouse, create_warehouse) = target_name("compute", &project.compute, &prefix, "WH")?;
    let raw_schema = Identifier::fixed(RAW_SCHEMA);
    let apps_schema = Identifier::fixed(APPS_SCHEMA);
    let audit_schema = Identifier::fixed(AUDIT_SCHEMA);
    let security = project.security;

    let roles = if security.enable_rbac {
        Some(RoleNames {
            admin: ident("prefix", "ADMIN", Some(prefix.as_str()))?,
            user: ident("prefix", "USER", Some(prefix.as_str()))?,
            readonly: ident("prefix", "READONLY", Some(prefix.as_str()))?,
        })
    } else {
        None
    };

    let mut reference_tables = Vec::with_capacity(project.reference_tables.len());
    for (i, r) in project.reference_tables.iter().enumerate() {
        let name = ident(format!("reference_tables[{}].name", i), &r.name, None)?;
        let mut literals = Vec::with_capacity(r.values.len());
        for (j, v) in r.values.iter().enumerate() {
            let lit = safe_bounded_literal(v, ColumnType::ShortText, Some(REFERENCE_VALUE_LENGTH))
                .map_err(escaping(&name, format!("values[{}]", j)))?;
            literals.push(lit);
        }
        reference_tables.push(ResolvedReferenceTable {
            qualified_name: qualified(&[&database, &apps_schema, &name]),
            name,
            description: non_blank(&r.description),
            values: r.values.clone(),
            literals,
        });
    }
    let lookup_by_name: HashMap<&str, &str> = reference_tables
        .iter()
        .map(|r| (r.name.as_str(), r.qualified_name.as_str()))
        .collect();

    let mut tables = Vec::with_capacity(project.tables.len());
    for (i, t) in project.tables.iter().enumerate() {
        let name = ident(format!("tables[{}].name", i), &t.name, None)?;
        let mut columns = Vec::with_capacity(t.columns.len());
        for (j, c) in t.columns.iter().enumerate() {
            let col_name = ident(format!("tables[{}].columns[{}].name", i, j), &c.name, None)?;
            let type_error = |source| {
                GenerateError::Validation(ValidationError::ColumnType {
                    table: name.to_string(),
                    column: col_name.to_string(),
                    source,
                })
            };
            let column_type = ColumnType::from_tag(&c.type_tag).map_err(type_error)?;
            let sql_type = sql_type_for(column_type, c.length, c.scale).map_err(type_error)?;
            let default = match &c.default {
                Some(v) => Some(
                    safe_bounded_literal(v, column_type, c.length)
                        .map_err(escaping(&name, col_name.to_string()))?,
                ),
                None => None,
            };
            let lookup = match &c.lookup {
                Some(l) => {
                    let key = ident(format!("tables[{}].columns[{}].lookup", i, j), l, None)?;
                    let q = lookup_by_name.get(key.as_str()).ok_or_else(|| {
                        GenerateError::Validation(ValidationError::UnknownLookup {
                            table: name.to_string(),
                            column: col_name.to_string(),
                            lookup: l.clone(),
                        })
                    })?;
                    Some(q.to_string())
                }
                None => None,
            };
            columns.push(ResolvedColumn {
                label: to_display_label(col_name.as_str()),
                name: col_name,
                column_type,
                sql_type,
                widget: widget_contract_for(column_type, c.length, c.scale),
                length: c.length,
                required: c.required,
                default,
                lookup,
            });
        }
        let change_stream = if security.enable_audit && security.enable_change_tracking {
            let stream = ident(format!("tables[{}].name", i), "CHANGES", Some(name.as_str()))?;
            Some(qualified(&[&database, &audit_schema, &stream]))
        } else {
            None
        };
        tables.push(ResolvedTable {
            qualified_name: qualified(&[&database, &raw_schema, &name]),
            label: to_display_label(name.as_str()),
            description: non_blank(&t.description),
            columns,
            audited: security.enable_audit,
            change_tracking: security.enable_change_tracking,
            change_stream,
            name,
        });
    }

    let database_literal = safe_literal(database.as_str(), ColumnType::ShortText)
        .map_err(escaping(&database, "namespace".into()))?;

    Ok(ResolvedProject {
        project_name: project.project_name.trim().to_string(),
        description: non_blank(&project.description),
        team_name: non_blank(&project.team_name),
        primary_contact: non_blank(&project.primary_contact),
        prefix,
        database,
        create_database,
        warehouse,
        create_warehouse,
        raw_schema,
        apps_schema,
        audit_schema,
        roles,
        tables,
        reference_tables,
        database_literal,
        security,
    })
}
