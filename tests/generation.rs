use appgen_sdk::error::TypeError;
use appgen_sdk::sql::{build_sql_script, Section};
use appgen_sdk::{generate_at, parse_project, resolve, GenerateError, ProjectDescription, ValidationError};
use chrono::{DateTime, TimeZone, Utc};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap()
}

fn safety() -> ProjectDescription {
    parse_project(
        r#"{
            "project_name": "Patient Safety",
            "prefix": "SAFETY",
            "tables": [{ "name": "INCIDENTS", "columns": [
                { "name": "description", "type": "long_text", "required": true },
                { "name": "severity", "type": "integer", "required": true }
            ]}],
            "security": { "enable_audit": true }
        }"#,
    )
    .unwrap()
}

#[test]
fn safety_project_produces_contract_names_and_audited_table() {
    let a = generate_at(&safety(), at()).unwrap();
    assert_eq!(a.database, "SAFETY_DB");

    let sql = &a.sql_script;
    assert!(sql.contains("CREATE DATABASE IF NOT EXISTS SAFETY_DB"));
    assert!(sql.contains("CREATE WAREHOUSE IF NOT EXISTS SAFETY_WH"));
    for role in ["SAFETY_ADMIN", "SAFETY_USER", "SAFETY_READONLY"] {
        assert!(sql.contains(&format!("CREATE ROLE IF NOT EXISTS {};", role)), "{}", role);
    }

    let script = build_sql_script(&resolve(&safety()).unwrap(), at());
    let incidents: Vec<_> = script
        .in_section(Section::Tables)
        .filter(|s| s.sql.starts_with("CREATE TABLE IF NOT EXISTS SAFETY_DB.RAW_DATA.INCIDENTS ("))
        .collect();
    assert_eq!(incidents.len(), 1);
    let ddl = &incidents[0].sql;
    for column in [
        "DESCRIPTION TEXT NOT NULL",
        "SEVERITY INTEGER NOT NULL",
        "CREATED_BY ",
        "CREATED_AT ",
        "MODIFIED_BY ",
        "MODIFIED_AT ",
    ] {
        assert!(ddl.contains(column), "missing {} in {}", column, ddl);
    }

    let app = &a.app_source;
    assert!(app.contains("\"Description *\""));
    assert!(app.contains("\"Severity *\""));
}

#[test]
fn tables_are_created_once_each_in_input_order() {
    let names = ["ZETA", "ALPHA", "MIDDLE", "BETA"];
    let tables: Vec<String> = names
        .iter()
        .map(|n| format!(r#"{{ "name": "{}", "columns": [{{ "name": "c", "type": "integer" }}] }}"#, n))
        .collect();
    let p = parse_project(&format!(
        r#"{{ "project_name": "Order", "prefix": "ORD", "tables": [{}] }}"#,
        tables.join(",")
    ))
    .unwrap();
    let script = build_sql_script(&resolve(&p).unwrap(), at());
    let created: Vec<&str> = script
        .in_section(Section::Tables)
        .filter_map(|s| s.sql.strip_prefix("CREATE TABLE IF NOT EXISTS ORD_DB.RAW_DATA."))
        .filter_map(|rest| rest.split(' ').next())
        .collect();
    assert_eq!(created, names);
    assert!(script.render().contains(&format!("{} AS TABLES_CREATED;", names.len())));
}

#[test]
fn every_statement_is_rerunnable() {
    let p = parse_project(
        r#"{
            "project_name": "Everything",
            "prefix": "ALL_ON",
            "tables": [{ "name": "EVENTS", "columns": [
                { "name": "kind", "type": "short_text", "length": 40, "lookup": "KINDS" },
                { "name": "at", "type": "timestamp", "required": true }
            ]}],
            "reference_tables": [{ "name": "KINDS", "values": ["Fall", "Medication"] }],
            "security": { "enable_change_tracking": true, "enable_activity_monitoring": true }
        }"#,
    )
    .unwrap();
    let script = build_sql_script(&resolve(&p).unwrap(), at());
    let allowed = ["USE ", "GRANT ", "MERGE INTO ", "ALTER TABLE ", "SELECT "];
    for s in &script.statements {
        let sql = s.sql.as_str();
        let ok = allowed.iter().any(|p| sql.starts_with(p))
            || (sql.starts_with("CREATE ") && sql.contains(" IF NOT EXISTS "));
        assert!(ok, "not re-runnable: {}", sql);
        assert!(!sql.starts_with("DROP") && !sql.starts_with("INSERT"), "{}", sql);
        assert!(!sql.contains("OR REPLACE"), "{}", sql);
        if sql.starts_with("ALTER TABLE ") {
            assert!(sql.contains(" SET "), "{}", sql);
        }
        if sql.starts_with("MERGE INTO ") {
            assert!(sql.contains("WHEN NOT MATCHED THEN INSERT"), "{}", sql);
        }
    }
}

#[test]
fn required_inputs_are_checked_before_the_insert() {
    let a = generate_at(&safety(), at()).unwrap();
    let app = &a.app_source;
    let insert = app
        .find("run_statement(session, STATEMENTS[\"INCIDENTS\"][\"insert\"]")
        .unwrap();
    for column in ["DESCRIPTION", "SEVERITY"] {
        let check = app.find(&format!("if _is_blank(values[\"{}\"]):", column)).unwrap();
        assert!(check < insert, "{} checked after insert", column);
    }
}

#[test]
fn quotes_in_reference_values_are_doubled() {
    let p = parse_project(
        r#"{
            "project_name": "Names",
            "prefix": "NM",
            "tables": [{ "name": "PEOPLE", "columns": [
                { "name": "surname", "type": "short_text", "length": 50, "lookup": "SURNAMES" }
            ]}],
            "reference_tables": [{ "name": "SURNAMES", "values": ["O'Brien"] }]
        }"#,
    )
    .unwrap();
    let a = generate_at(&p, at()).unwrap();
    assert!(a.sql_script.contains("SELECT 'O''Brien' AS VALUE"));
}

#[test]
fn short_text_without_length_is_rejected() {
    let mut p = safety();
    p.tables[0].columns[0].type_tag = "short_text".into();
    match generate_at(&p, at()) {
        Err(GenerateError::Validation(ValidationError::ColumnType { table, column, source })) => {
            assert_eq!((table.as_str(), column.as_str()), ("INCIDENTS", "DESCRIPTION"));
            assert_eq!(source, TypeError::MissingLength);
        }
        other => panic!("expected MissingLength, got {:?}", other.map(|a| a.database)),
    }
}

#[test]
fn same_input_and_time_give_same_artifacts() {
    assert_eq!(generate_at(&safety(), at()).unwrap(), generate_at(&safety(), at()).unwrap());
}
