//! Identifier and literal escaping. Every name and user value that reaches SQL text goes through here.

use crate::error::EscapeError;
use crate::mapping::ColumnType;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

const MAX_IDENTIFIER_LEN: usize = 255;

/// Words the warehouse reserves; an unquoted identifier may not equal one of them.
const RESERVED_WORDS: &[&str] = &[
    "ACCOUNT", "ALL", "ALTER", "AND", "ANY", "AS", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLUMN",
    "CONNECT", "CONNECTION", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE", "DELETE", "DISTINCT", "DROP", "ELSE", "EXISTS",
    "FALSE", "FOLLOWING", "FOR", "FROM", "FULL", "GRANT", "GROUP", "GSCLUSTER", "HAVING", "ILIKE", "IN",
    "INCREMENT", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "ISSUE", "JOIN", "LATERAL", "LEFT", "LIKE",
    "LOCALTIME", "LOCALTIMESTAMP", "MINUS", "NATURAL", "NOT", "NULL", "OF", "ON", "OR", "ORDER",
    "ORGANIZATION", "QUALIFY", "REGEXP", "REVOKE", "RIGHT", "RLIKE", "ROW", "ROWS", "SAMPLE", "SCHEMA",
    "SELECT", "SET", "SOME", "START", "TABLE", "TABLESAMPLE", "THEN", "TO", "TRIGGER", "TRUE",
    "TRY_CAST", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHENEVER", "WHERE",
    "WITH",
];

/// Validated, normalized identifier: `[A-Z_][A-Z0-9_]*`, not reserved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Built-in names (schemas, generated columns). Must already satisfy the identifier rules.
    pub(crate) fn fixed(name: &'static str) -> Identifier {
        debug_assert!(safe_identifier(name, None).map(|i| i.0 == name).unwrap_or(false));
        Identifier(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form, used for generated function names, widget keys, and file names.
    pub fn to_lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dot-joined qualified name, e.g. `SAFETY_DB.RAW_DATA.INCIDENTS`.
pub fn qualified(parts: &[&Identifier]) -> String {
    parts.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(".")
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() || c == '-' {
                Some('_')
            } else {
                let u = c.to_ascii_uppercase();
                (u.is_ascii_uppercase() || u.is_ascii_digit() || u == '_').then_some(u)
            }
        })
        .collect()
}

/// Normalize `raw` into an identifier, optionally composed as `{PREFIX}_{NAME}`.
pub fn safe_identifier(raw: &str, prefix: Option<&str>) -> Result<Identifier, EscapeError> {
    let invalid = |reason| EscapeError::InvalidIdentifier {
        raw: raw.to_string(),
        reason,
    };
    let name = normalize(raw);
    if name.is_empty() {
        return Err(invalid("empty after normalization"));
    }
    let composed = match prefix {
        Some(p) => {
            let p = normalize(p);
            if p.is_empty() {
                return Err(invalid("empty prefix"));
            }
            format!("{}_{}", p, name)
        }
        None => name,
    };
    if composed.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("must start with a letter or underscore"));
    }
    if composed.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("longer than 255 characters"));
    }
    if RESERVED_WORDS.contains(&composed.as_str()) {
        return Err(invalid("reserved word"));
    }
    Ok(Identifier(composed))
}

/// SQL literal text, ready to splice into a statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LiteralText(String);

impl LiteralText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LiteralText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a quoted string literal: `'` doubled, `\` doubled.
pub fn escape_text(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Inverse of [`escape_text`].
pub fn unescape_text(escaped: &str) -> String {
    escaped.replace("''", "'").replace("\\\\", "\\")
}

/// Single-line text for `--` comments: control characters become spaces.
pub fn comment_text(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

const DECIMAL_SHAPE: &str = r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$";
const DATE_SHAPE: &str = r"^\d{4}-\d{2}-\d{2}$";
const TIMESTAMP_SHAPE: &str = r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?$";

static DECIMAL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static DATE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static TIMESTAMP_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn has_shape(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn quoted(value: &str) -> String {
    format!("'{}'", escape_text(value))
}

/// Quoted text literal. Text never fails to render; other shapes go through [`safe_literal`].
pub fn text_literal(value: &str) -> LiteralText {
    LiteralText(quoted(value))
}

/// Render `value` as a SQL literal of type `tag`.
pub fn safe_literal(value: &str, tag: ColumnType) -> Result<LiteralText, EscapeError> {
    let invalid = || EscapeError::InvalidLiteral {
        value: value.to_string(),
        expected: tag.tag(),
    };
    let text = match tag {
        ColumnType::ShortText | ColumnType::LongText => return Ok(text_literal(value)),
        ColumnType::Integer => value.trim().parse::<i64>().map_err(|_| invalid())?.to_string(),
        ColumnType::Decimal => {
            let v = value.trim();
            if !has_shape(&DECIMAL_RE, DECIMAL_SHAPE, v) || !v.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                return Err(invalid());
            }
            v.trim_start_matches('+').to_string()
        }
        ColumnType::Boolean => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => "TRUE".to_string(),
            "false" | "no" | "0" => "FALSE".to_string(),
            _ => return Err(invalid()),
        },
        ColumnType::Date => {
            let v = value.trim();
            if !has_shape(&DATE_RE, DATE_SHAPE, v) {
                return Err(invalid());
            }
            let d = NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| invalid())?;
            format!("TO_DATE({})", quoted(&d.format("%Y-%m-%d").to_string()))
        }
        ColumnType::Timestamp => {
            let v = value.trim();
            if !has_shape(&TIMESTAMP_RE, TIMESTAMP_SHAPE, v) {
                return Err(invalid());
            }
            let ts = parse_timestamp(&v.replacen('T', " ", 1)).ok_or_else(invalid)?;
            let rendered = if ts.nanosecond() == 0 {
                ts.format("%Y-%m-%d %H:%M:%S").to_string()
            } else {
                ts.format("%Y-%m-%d %H:%M:%S%.9f").to_string()
            };
            format!("TO_TIMESTAMP_NTZ({})", quoted(&rendered))
        }
    };
    Ok(LiteralText(text))
}

/// [`safe_literal`] plus the declared maximum length for short text.
pub fn safe_bounded_literal(
    value: &str,
    tag: ColumnType,
    length: Option<u32>,
) -> Result<LiteralText, EscapeError> {
    if let (ColumnType::ShortText, Some(max)) = (tag, length) {
        if value.chars().count() > max as usize {
            return Err(EscapeError::InvalidLiteral {
                value: value.to_string(),
                expected: "short_text within declared length",
            });
        }
    }
    safe_literal(value, tag)
}

fn parse_timestamp(v: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
}
