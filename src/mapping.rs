//! Column type tags: target SQL type syntax and the input-widget contract for each tag.

use crate::error::TypeError;
use serde::Serialize;
use std::fmt;

/// Largest VARCHAR length the warehouse accepts.
pub const MAX_TEXT_LENGTH: u32 = 16_777_216;
/// Largest NUMBER precision the warehouse accepts.
pub const MAX_PRECISION: u32 = 38;
const DEFAULT_SCALE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    ShortText,
    LongText,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
}

impl ColumnType {
    /// Parse a tag. Warehouse spellings (`varchar`, `number`, `timestamp_ntz`, ...) are accepted as aliases.
    pub fn from_tag(tag: &str) -> Result<Self, TypeError> {
        let normalized = tag.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Ok(match normalized.as_str() {
            "short_text" | "varchar" | "string" => ColumnType::ShortText,
            "long_text" | "text" => ColumnType::LongText,
            "integer" | "int" | "number" => ColumnType::Integer,
            "decimal" | "float" | "numeric" => ColumnType::Decimal,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "timestamp" | "timestamp_ntz" | "datetime" => ColumnType::Timestamp,
            _ => return Err(TypeError::InvalidTypeTag(tag.to_string())),
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            ColumnType::ShortText => "short_text",
            ColumnType::LongText => "long_text",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::ShortText | ColumnType::LongText)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Rendered SQL type, e.g. `VARCHAR(255)` or `NUMBER(10, 2)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SqlType(String);

impl SqlType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a tag to its SQL type. `length` is the text length for short_text and the precision for decimal.
pub fn sql_type_for(tag: ColumnType, length: Option<u32>, scale: Option<u32>) -> Result<SqlType, TypeError> {
    let ty = match tag {
        ColumnType::ShortText => {
            let n = length.ok_or(TypeError::MissingLength)?;
            if n == 0 || n > MAX_TEXT_LENGTH {
                return Err(TypeError::InvalidLength(n));
            }
            format!("VARCHAR({})", n)
        }
        ColumnType::LongText => "TEXT".to_string(),
        ColumnType::Integer => "INTEGER".to_string(),
        ColumnType::Decimal => match length {
            Some(precision) => {
                if precision == 0 || precision > MAX_PRECISION {
                    return Err(TypeError::InvalidLength(precision));
                }
                let scale = scale.unwrap_or(DEFAULT_SCALE.min(precision));
                if scale > precision {
                    return Err(TypeError::InvalidScale { precision, scale });
                }
                format!("NUMBER({}, {})", precision, scale)
            }
            None => "FLOAT".to_string(),
        },
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Timestamp => "TIMESTAMP_NTZ".to_string(),
    };
    Ok(SqlType(ty))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    TextInput,
    TextArea,
    NumberInput,
    Checkbox,
    DateInput,
    /// Date input plus time input, merged into one `YYYY-MM-DD HH:MM:SS` literal.
    DateTimeInput,
}

/// Shape the collected value must have before it reaches the statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralShape {
    Text,
    Integer,
    Decimal,
    Boolean,
    IsoDate,
    IsoTimestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WidgetContract {
    pub kind: WidgetKind,
    pub literal_shape: LiteralShape,
    /// Fraction digits shown by a number input; `None` for non-numeric widgets.
    pub decimals: Option<u32>,
    /// SQL wrapper around a bound `?` parameter.
    pub bind_cast: Option<&'static str>,
}

impl WidgetContract {
    /// Placeholder expression for this widget's value in a parameterized statement.
    pub fn placeholder(&self) -> String {
        match self.bind_cast {
            Some(cast) => format!("{}(?)", cast),
            None => "?".to_string(),
        }
    }

    /// Number input step as Python source: `1` for integers, `0.01` for two decimals.
    pub fn step(&self) -> Option<String> {
        match (self.literal_shape, self.decimals) {
            (LiteralShape::Integer, _) => Some("1".to_string()),
            (_, Some(0)) => Some("1.0".to_string()),
            (_, Some(d)) => Some(format!("0.{}1", "0".repeat(d as usize - 1))),
            (_, None) => None,
        }
    }

    /// printf-style display format for decimal inputs.
    pub fn number_format(&self) -> Option<String> {
        match (self.literal_shape, self.decimals) {
            (LiteralShape::Decimal, Some(d)) => Some(format!("%.{}f", d)),
            _ => None,
        }
    }
}

/// Widget for a column. `length` and `scale` are the declared precision and scale of decimals.
pub fn widget_contract_for(tag: ColumnType, length: Option<u32>, scale: Option<u32>) -> WidgetContract {
    let decimal_places = match length {
        Some(precision) => scale.unwrap_or(DEFAULT_SCALE.min(precision)),
        None => DEFAULT_SCALE,
    };
    let (kind, literal_shape, decimals, bind_cast) = match tag {
        ColumnType::ShortText => (WidgetKind::TextInput, LiteralShape::Text, None, None),
        ColumnType::LongText => (WidgetKind::TextArea, LiteralShape::Text, None, None),
        ColumnType::Integer => (WidgetKind::NumberInput, LiteralShape::Integer, Some(0), None),
        ColumnType::Decimal => (WidgetKind::NumberInput, LiteralShape::Decimal, Some(decimal_places), None),
        ColumnType::Boolean => (WidgetKind::Checkbox, LiteralShape::Boolean, None, None),
        ColumnType::Date => (WidgetKind::DateInput, LiteralShape::IsoDate, None, Some("TO_DATE")),
        ColumnType::Timestamp => (
            WidgetKind::DateTimeInput,
            LiteralShape::IsoTimestamp,
            None,
            Some("TO_TIMESTAMP_NTZ"),
        ),
    };
    WidgetContract {
        kind,
        literal_shape,
        decimals,
        bind_cast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_without_length_is_rejected() {
        assert_eq!(
            sql_type_for(ColumnType::ShortText, None, None),
            Err(TypeError::MissingLength)
        );
        assert_eq!(
            sql_type_for(ColumnType::ShortText, Some(0), None),
            Err(TypeError::InvalidLength(0))
        );
        assert_eq!(
            sql_type_for(ColumnType::ShortText, Some(100), None).unwrap().as_str(),
            "VARCHAR(100)"
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            ColumnType::from_tag("geometry"),
            Err(TypeError::InvalidTypeTag("geometry".into()))
        );
        assert_eq!(ColumnType::from_tag("TIMESTAMP_NTZ"), Ok(ColumnType::Timestamp));
        assert_eq!(ColumnType::from_tag("Short Text"), Ok(ColumnType::ShortText));
    }

    #[test]
    fn decimal_precision_and_scale() {
        assert_eq!(sql_type_for(ColumnType::Decimal, None, None).unwrap().as_str(), "FLOAT");
        assert_eq!(
            sql_type_for(ColumnType::Decimal, Some(10), None).unwrap().as_str(),
            "NUMBER(10, 2)"
        );
        assert_eq!(
            sql_type_for(ColumnType::Decimal, Some(1), None).unwrap().as_str(),
            "NUMBER(1, 1)"
        );
        assert_eq!(
            sql_type_for(ColumnType::Decimal, Some(4), Some(6)),
            Err(TypeError::InvalidScale { precision: 4, scale: 6 })
        );
        assert_eq!(
            sql_type_for(ColumnType::Decimal, Some(39), None),
            Err(TypeError::InvalidLength(39))
        );
    }

    #[test]
    fn timestamp_uses_combined_date_time_widget() {
        let w = widget_contract_for(ColumnType::Timestamp, None, None);
        assert_eq!(w.kind, WidgetKind::DateTimeInput);
        assert_eq!(w.placeholder(), "TO_TIMESTAMP_NTZ(?)");
        assert_eq!(widget_contract_for(ColumnType::Integer, None, None).placeholder(), "?");
        assert_eq!(widget_contract_for(ColumnType::Integer, None, None).step().as_deref(), Some("1"));
    }

    #[test]
    fn decimal_widget_step_tracks_scale() {
        let w = widget_contract_for(ColumnType::Decimal, Some(10), Some(4));
        assert_eq!(w.step().as_deref(), Some("0.0001"));
        assert_eq!(w.number_format().as_deref(), Some("%.4f"));
        let float = widget_contract_for(ColumnType::Decimal, None, None);
        assert_eq!(float.step().as_deref(), Some("0.01"));
        let whole = widget_contract_for(ColumnType::Decimal, Some(6), Some(0));
        assert_eq!(whole.step().as_deref(), Some("1.0"));
        assert_eq!(widget_contract_for(ColumnType::Integer, None, None).number_format(), None);
        assert_eq!(widget_contract_for(ColumnType::ShortText, Some(20), None).step(), None);
    }
}
