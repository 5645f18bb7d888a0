//! Streamlit data capture application, one Python source file per project.
//!
//! The session is acquired once at module level together with the caller identity, and both are passed
//! into every page function. SQL text lives in module-level constants built by [`crate::sql`]; form values
//! are always bound as `?` parameters. Statement failures are caught where they run and shown with
//! `st.error`.

use crate::case::to_code_name;
use crate::config::{ResolvedColumn, ResolvedProject, ResolvedTable};
use crate::mapping::{LiteralShape, WidgetKind};
use crate::sql::{
    audit_log_insert, comment_text, insert, lookup_values, select_all, select_by_id, update, ParamSlot,
    StatementTemplate,
};
use chrono::{DateTime, Utc};

const HELPERS: &str = r#"def _is_blank(value):
    if value is None:
        return True
    if isinstance(value, str):
        return value.strip() == ""
    return False


def _blank_to_none(value):
    return None if _is_blank(value) else value


def _combine_datetime(day, time_of_day):
    if day is None or time_of_day is None:
        return None
    return datetime.datetime.combine(day, time_of_day).strftime("%Y-%m-%d %H:%M:%S")


def _iso_date(day):
    return None if day is None else day.isoformat()


def _value(row, column):
    value = row[column]
    if value is None or pd.isna(value):
        return None
    return value


def _text(value):
    return "" if value is None else str(value)


def _int(value):
    return None if value is None else int(value)


def _float(value):
    return None if value is None else float(value)


def _date_part(value):
    if isinstance(value, datetime.datetime):
        return value.date()
    return value


def _time_part(value):
    if isinstance(value, datetime.datetime):
        return value.time()
    return None


def _option_index(options, value):
    return options.index(value) if value in options else None


def _first_row(frame):
    if frame is None or frame.empty:
        return None
    return frame.iloc[0]


def run_statement(session, query, params=None):
    try:
        return session.sql(query, params=params).collect()
    except Exception as exc:
        st.error(f"Statement failed: {exc}")
        return None


def fetch_frame(session, query, params=None):
    try:
        return session.sql(query, params=params).to_pandas()
    except Exception as exc:
        st.error(f"Query failed: {exc}")
        return None


def fetch_options(session, query):
    frame = fetch_frame(session, query)
    if frame is None:
        return []
    return frame["VALUE"].tolist()


def current_caller(session):
    rows = run_statement(session, "SELECT CURRENT_USER() AS CALLER")
    if not rows:
        return "unknown"
    return rows[0]["CALLER"]
"#;

/// Python string literal. JSON string syntax is a subset of Python's.
fn py_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[derive(Default)]
struct PySource {
    out: String,
    depth: usize,
}

impl PySource {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

struct TableStatements {
    insert: StatementTemplate,
    select_all: StatementTemplate,
    select_one: StatementTemplate,
    update: StatementTemplate,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FormMode {
    Create,
    Edit,
}

/// Build the application source for a resolved project.
pub fn build_app_source(project: &ResolvedProject, generated_at: DateTime<Utc>) -> String {
    let statements: Vec<TableStatements> = project
        .tables
        .iter()
        .map(|t| TableStatements {
            insert: insert(t),
            select_all: select_all(t),
            select_one: select_by_id(t),
            update: update(t),
        })
        .collect();
    let audit = audit_log_insert(project);

    let mut py = PySource::default();
    py.line(format!("# {}: data capture application", comment_text(&project.project_name)));
    py.line(format!("# Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    py.line(format!("# Database: {}  Warehouse: {}", project.database, project.warehouse));
    py.line("# Run the setup script first; this app only reads and writes the tables it creates.");
    py.blank();
    py.line("import datetime");
    py.blank();
    py.line("import pandas as pd");
    py.line("import streamlit as st");
    py.line("from snowflake.snowpark.context import get_active_session");
    py.blank();
    py.line(format!("APP_TITLE = {}", py_str(&project.project_name)));
    py.line("st.set_page_config(page_title=APP_TITLE, layout=\"wide\")");
    py.blank();

    py.line("STATEMENTS = {");
    py.indent();
    for (t, s) in project.tables.iter().zip(&statements) {
        py.line(format!("{}: {{", py_str(t.name.as_str())));
        py.indent();
        for (key, q) in [
            ("insert", &s.insert),
            ("select_all", &s.select_all),
            ("select_one", &s.select_one),
            ("update", &s.update),
        ] {
            py.line(format!("{}: {},", py_str(key), py_str(&q.sql)));
        }
        py.dedent();
        py.line("},");
    }
    py.dedent();
    py.line("}");
    py.blank();

    py.line("LOOKUPS = {");
    py.indent();
    for r in &project.reference_tables {
        let used = project
            .tables
            .iter()
            .flat_map(|t| &t.columns)
            .any(|c| c.lookup.as_deref() == Some(r.qualified_name.as_str()));
        if used {
            py.line(format!(
                "{}: {},",
                py_str(&r.qualified_name),
                py_str(&lookup_values(&r.qualified_name).sql)
            ));
        }
    }
    py.dedent();
    py.line("}");
    py.blank();

    match &audit {
        Some(q) => py.line(format!("AUDIT_INSERT = {}", py_str(&q.sql))),
        None => py.line("AUDIT_INSERT = None"),
    }
    py.blank();
    py.blank();

    py.out.push_str(HELPERS);

    if let Some(q) = &audit {
        py.blank();
        py.blank();
        py.line("def write_audit(session, caller, table_name, operation, record_id):");
        py.indent();
        py.line(format!(
            "run_statement(session, AUDIT_INSERT, {})",
            param_list(q, &[])
        ));
        py.dedent();
    }

    for (t, s) in project.tables.iter().zip(&statements) {
        py.blank();
        py.blank();
        page(&mut py, t, s, audit.is_some());
    }

    py.blank();
    py.blank();
    py.line("PAGES = [");
    py.indent();
    for t in &project.tables {
        py.line(format!("({}, page_{}),", py_str(&t.label), to_code_name(t.name.as_str())));
    }
    py.dedent();
    py.line("]");
    py.blank();
    py.line("try:");
    py.indent();
    py.line("session = get_active_session()");
    py.dedent();
    py.line("except Exception as exc:");
    py.indent();
    py.line("st.error(f\"No active session: {exc}\")");
    py.line("st.stop()");
    py.dedent();
    py.line("caller = current_caller(session)");
    py.blank();
    py.line("st.sidebar.title(APP_TITLE)");
    py.line("st.sidebar.caption(f\"Signed in as {caller}\")");
    py.line("choice = st.sidebar.radio(\"Table\", range(len(PAGES)), format_func=lambda i: PAGES[i][0])");
    py.line("st.title(APP_TITLE)");
    py.line("PAGES[choice][1](session, caller)");

    tracing::debug!(
        database = %project.database,
        tables = project.tables.len(),
        bytes = py.out.len(),
        "app source built"
    );
    py.out
}

/// Python list of bound values, one per `?` slot in the template.
fn param_list(q: &StatementTemplate, columns: &[ResolvedColumn]) -> String {
    let exprs: Vec<String> = q
        .params
        .iter()
        .map(|slot| match slot {
            ParamSlot::Column(name) => {
                let value = format!("values[{}]", py_str(name.as_str()));
                let shape = columns
                    .iter()
                    .find(|c| &c.name == name)
                    .map(|c| c.widget.literal_shape);
                match shape {
                    Some(LiteralShape::Text) => format!("_blank_to_none({})", value),
                    Some(LiteralShape::Boolean) => format!("bool({})", value),
                    Some(LiteralShape::IsoDate) => format!("_iso_date({})", value),
                    _ => value,
                }
            }
            ParamSlot::Caller => "caller".to_string(),
            ParamSlot::RecordId => "record_id".to_string(),
            ParamSlot::TableName => "table_name".to_string(),
            ParamSlot::Operation => "operation".to_string(),
        })
        .collect();
    format!("[{}]", exprs.join(", "))
}

fn page(py: &mut PySource, t: &ResolvedTable, s: &TableStatements, audit: bool) {
    let code = to_code_name(t.name.as_str());
    let table_key = py_str(t.name.as_str());
    let stmt = |kind: &str| format!("STATEMENTS[{}][{}]", table_key, py_str(kind));

    py.line(format!("def page_{}(session, caller):", code));
    py.indent();
    py.line(format!("st.header({})", py_str(&t.label)));
    if let Some(d) = &t.description {
        py.line(format!("st.caption({})", py_str(d)));
    }
    let mut lookups: Vec<&str> = Vec::new();
    for c in &t.columns {
        if let Some(q) = c.lookup.as_deref() {
            if !lookups.contains(&q) {
                lookups.push(q);
            }
        }
    }
    if !lookups.is_empty() {
        py.line("options = {");
        py.indent();
        for q in &lookups {
            py.line(format!(
                "{}: fetch_options(session, LOOKUPS[{}]),",
                py_str(q),
                py_str(q)
            ));
        }
        py.dedent();
        py.line("}");
    }
    py.line("create_tab, view_tab, edit_tab = st.tabs([\"Create\", \"View\", \"Edit\"])");
    py.blank();

    // Create
    py.line("with create_tab:");
    py.indent();
    py.line(format!("with st.form({}):", py_str(&format!("{}:create", code))));
    py.indent();
    py.line("values = {}");
    for c in &t.columns {
        widget(py, &code, c, FormMode::Create);
    }
    py.line("submitted = st.form_submit_button(\"Create\")");
    py.dedent();
    py.line("if submitted:");
    py.indent();
    required_guard(py, t, |py| {
        py.line(format!(
            "if run_statement(session, {}, {}) is not None:",
            stmt("insert"),
            param_list(&s.insert, &t.columns)
        ));
        py.indent();
        if audit {
            py.line(format!("write_audit(session, caller, {}, \"INSERT\", None)", table_key));
        }
        py.line("st.success(\"Record created.\")");
        py.dedent();
    });
    py.dedent();
    py.dedent();
    py.blank();

    // View
    py.line("with view_tab:");
    py.indent();
    py.line(format!("frame = fetch_frame(session, {})", stmt("select_all")));
    py.line("if frame is not None:");
    py.indent();
    py.line("if frame.empty:");
    py.indent();
    py.line("st.info(\"No records yet.\")");
    py.dedent();
    py.line("else:");
    py.indent();
    py.line("st.dataframe(frame, use_container_width=True, hide_index=True)");
    py.dedent();
    py.dedent();
    py.dedent();
    py.blank();

    // Edit
    py.line("with edit_tab:");
    py.indent();
    py.line(format!("records = fetch_frame(session, {})", stmt("select_all")));
    py.line("if records is None or records.empty:");
    py.indent();
    py.line("st.info(\"No records to edit.\")");
    py.dedent();
    py.line("else:");
    py.indent();
    py.line(format!(
        "record_id = int(st.selectbox(\"Record\", records[\"RECORD_ID\"].tolist(), key={}))",
        py_str(&format!("{}:edit:record", code))
    ));
    py.line(format!(
        "current = _first_row(fetch_frame(session, {}, [record_id]))",
        stmt("select_one")
    ));
    py.line("if current is None:");
    py.indent();
    py.line("st.warning(\"The selected record could not be loaded.\")");
    py.dedent();
    py.line("else:");
    py.indent();
    py.line(format!("with st.form({}):", py_str(&format!("{}:edit", code))));
    py.indent();
    py.line("values = {}");
    for c in &t.columns {
        widget(py, &code, c, FormMode::Edit);
    }
    py.line("submitted = st.form_submit_button(\"Save changes\")");
    py.dedent();
    py.line("if submitted:");
    py.indent();
    required_guard(py, t, |py| {
        py.line(format!(
            "if run_statement(session, {}, {}) is not None:",
            stmt("update"),
            param_list(&s.update, &t.columns)
        ));
        py.indent();
        if audit {
            py.line(format!("write_audit(session, caller, {}, \"UPDATE\", record_id)", table_key));
        }
        py.line("st.success(\"Record updated.\")");
        py.dedent();
    });
    py.dedent();
    py.dedent();
    py.dedent();
    py.dedent();
    py.dedent();
}

/// Emit required-field checks, then `body` only when every required field has a value.
/// Checkboxes always hold a value and are not checked.
fn required_guard(py: &mut PySource, t: &ResolvedTable, body: impl FnOnce(&mut PySource)) {
    let required: Vec<&ResolvedColumn> = t
        .columns
        .iter()
        .filter(|c| c.required && c.widget.kind != WidgetKind::Checkbox)
        .collect();
    if required.is_empty() {
        body(py);
        return;
    }
    py.line("missing = []");
    for c in required {
        py.line(format!("if _is_blank(values[{}]):", py_str(c.name.as_str())));
        py.indent();
        py.line(format!("missing.append({})", py_str(&c.label)));
        py.dedent();
    }
    py.line("if missing:");
    py.indent();
    py.line("st.error(\"Required fields are empty: \" + \", \".join(missing))");
    py.dedent();
    py.line("else:");
    py.indent();
    body(py);
    py.dedent();
}

fn widget(py: &mut PySource, table_code: &str, c: &ResolvedColumn, mode: FormMode) {
    let col_code = to_code_name(c.name.as_str());
    let key = |suffix: &str| match mode {
        FormMode::Create => py_str(&format!("{}:create:{}{}", table_code, col_code, suffix)),
        FormMode::Edit => format!(
            "f{}",
            py_str(&format!("{}:edit:{{record_id}}:{}{}", table_code, col_code, suffix))
        ),
    };
    let init = match mode {
        FormMode::Create => None,
        FormMode::Edit => Some(format!("_value(current, {})", py_str(c.name.as_str()))),
    };
    let wrap = |f: &str, empty: &str| match &init {
        Some(i) => format!("{}({})", f, i),
        None => empty.to_string(),
    };
    let label = if c.required && c.widget.kind != WidgetKind::Checkbox {
        py_str(&format!("{} *", c.label))
    } else {
        py_str(&c.label)
    };

    let expr = if let Some(q) = &c.lookup {
        let opts = format!("options[{}]", py_str(q));
        let index = match &init {
            Some(i) => format!("_option_index({}, {})", opts, i),
            None => "None".to_string(),
        };
        format!("st.selectbox({}, {}, index={}, key={})", label, opts, index, key(""))
    } else {
        match c.widget.kind {
            WidgetKind::TextInput => {
                let max_chars = c.length.map(|n| format!(", max_chars={}", n)).unwrap_or_default();
                format!(
                    "st.text_input({}, value={}{}, key={})",
                    label,
                    wrap("_text", "\"\""),
                    max_chars,
                    key("")
                )
            }
            WidgetKind::TextArea => format!(
                "st.text_area({}, value={}, key={})",
                label,
                wrap("_text", "\"\""),
                key("")
            ),
            WidgetKind::NumberInput => {
                let conv = if c.widget.literal_shape == LiteralShape::Integer {
                    "_int"
                } else {
                    "_float"
                };
                let format = c
                    .widget
                    .number_format()
                    .map(|f| format!(", format={}", py_str(&f)))
                    .unwrap_or_default();
                format!(
                    "st.number_input({}, value={}, step={}{}, key={})",
                    label,
                    wrap(conv, "None"),
                    c.widget.step().unwrap_or_else(|| "1".to_string()),
                    format,
                    key("")
                )
            }
            WidgetKind::Checkbox => {
                let initial = match c.default.as_ref().map(|d| d.as_str()) {
                    Some("TRUE") => "True",
                    _ => "False",
                };
                format!(
                    "st.checkbox({}, value={}, key={})",
                    label,
                    wrap("bool", initial),
                    key("")
                )
            }
            WidgetKind::DateInput => format!(
                "st.date_input({}, value={}, key={})",
                label,
                wrap("_date_part", "None"),
                key("")
            ),
            WidgetKind::DateTimeInput => format!(
                "_combine_datetime(st.date_input({}, value={}, key={}), st.time_input({}, value={}, key={}))",
                label,
                wrap("_date_part", "None"),
                key(":date"),
                py_str(&format!("{} (time)", c.label)),
                wrap("_time_part", "None"),
                key(":time")
            ),
        }
    };
    py.line(format!("values[{}] = {}", py_str(c.name.as_str()), expr));
}
