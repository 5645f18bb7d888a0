//! Project validation: required fields, name uniqueness, type tags, lookups.

use crate::config::resolved::{AUDIT_COLUMNS, RECORD_ID_COLUMN};
use crate::config::{ProjectDescription, ResourceTarget};
use crate::error::ValidationError;
use crate::mapping::{sql_type_for, ColumnType};
use crate::sql::safe_identifier;
use std::collections::HashSet;

fn identifier(field: String, raw: &str, prefix: Option<&str>) -> Result<String, ValidationError> {
    safe_identifier(raw, prefix)
        .map(|id| id.as_str().to_string())
        .map_err(|source| ValidationError::Identifier { field, source })
}

fn validate_target(field: &str, target: &ResourceTarget) -> Result<(), ValidationError> {
    if let ResourceTarget::Existing { name } = target {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: format!("{}.name", field),
            });
        }
        identifier(format!("{}.name", field), name, None)?;
    }
    Ok(())
}

/// Full validation, run before anything is resolved or built.
pub fn validate(project: &ProjectDescription) -> Result<(), ValidationError> {
    validate_project_setup(project)?;
    validate_tables(project)
}

/// Project name, prefix, and namespace/compute targets.
pub fn validate_project_setup(project: &ProjectDescription) -> Result<(), ValidationError> {
    if project.project_name.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "project_name".into(),
        });
    }
    if project.prefix.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "prefix".into(),
        });
    }
    identifier("prefix".into(), &project.prefix, None)?;
    // Longest derived name bounds the usable prefix length.
    identifier("prefix".into(), "READONLY", Some(&project.prefix))?;
    validate_target("namespace", &project.namespace)?;
    validate_target("compute", &project.compute)?;
    Ok(())
}

/// Reference tables, tables, columns, type tags, and lookups.
pub fn validate_tables(project: &ProjectDescription) -> Result<(), ValidationError> {
    let mut reference_names = HashSet::new();
    for (i, r) in project.reference_tables.iter().enumerate() {
        let name = identifier(format!("reference_tables[{}].name", i), &r.name, None)?;
        if !reference_names.insert(name.clone()) {
            return Err(ValidationError::DuplicateTable { table: name });
        }
    }

    if project.tables.is_empty() {
        return Err(ValidationError::NoTables);
    }

    let generated: HashSet<&str> = std::iter::once(RECORD_ID_COLUMN)
        .chain(AUDIT_COLUMNS.iter().copied())
        .collect();
    let mut table_names = HashSet::new();
    for (i, t) in project.tables.iter().enumerate() {
        let table = identifier(format!("tables[{}].name", i), &t.name, None)?;
        if !table_names.insert(table.clone()) {
            return Err(ValidationError::DuplicateTable { table });
        }
        if t.columns.is_empty() {
            return Err(ValidationError::EmptyTable { table });
        }

        let mut column_names = HashSet::new();
        for (j, c) in t.columns.iter().enumerate() {
            let column = identifier(format!("tables[{}].columns[{}].name", i, j), &c.name, None)?;
            if generated.contains(column.as_str()) {
                return Err(ValidationError::ReservedColumn { table, column });
            }
            if !column_names.insert(column.clone()) {
                return Err(ValidationError::DuplicateColumn { table, column });
            }
            let column_type = ColumnType::from_tag(&c.type_tag).map_err(|source| ValidationError::ColumnType {
                table: table.clone(),
                column: column.clone(),
                source,
            })?;
            sql_type_for(column_type, c.length, c.scale).map_err(|source| ValidationError::ColumnType {
                table: table.clone(),
                column: column.clone(),
                source,
            })?;
            if let Some(lookup) = &c.lookup {
                if !column_type.is_text() {
                    return Err(ValidationError::LookupNotText { table, column });
                }
                let known = safe_identifier(lookup, None)
                    .map(|id| reference_names.contains(id.as_str()))
                    .unwrap_or(false);
                if !known {
                    return Err(ValidationError::UnknownLookup {
                        table,
                        column,
                        lookup: lookup.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
