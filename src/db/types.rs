//! MySQL row to JSON conversion.
//!
//! Each column is decoded according to a [`ColumnKind`] derived from the
//! type name the server reports. Key order follows column order
//! (`serde_json` is built with `preserve_order`).
//!
//! `DESCRIBE` and `SHOW INDEX` report several columns as binary strings, so
//! bytes become UTF-8 text whenever they are valid UTF-8 and base64 otherwise.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Number, Value as JsonValue};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, MySql, Row, Type, TypeInfo};
use tracing::warn;

/// A result row as an ordered JSON object.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// How a column is turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    /// Exact numerics, kept as the server's text to avoid rounding.
    Decimal,
    Boolean,
    Json,
    Bytes,
    /// Strings, dates, times and anything unrecognised.
    Text,
}

impl ColumnKind {
    /// Classify a MySQL type name as reported by the driver, e.g.
    /// `BIGINT UNSIGNED` or `VARBINARY`.
    pub fn from_type_name(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        let base = upper.split_whitespace().next().unwrap_or_default();

        match base {
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
                if upper.contains("UNSIGNED") || base == "YEAR" {
                    Self::Unsigned
                } else {
                    Self::Signed
                }
            }
            "FLOAT" | "DOUBLE" | "REAL" => Self::Float,
            "DECIMAL" | "NUMERIC" => Self::Decimal,
            "JSON" => Self::Json,
            "BIT" | "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
            | "GEOMETRY" => Self::Bytes,
            _ => Self::Text,
        }
    }
}

/// DECIMAL read as the exact text the server sent.
#[derive(Debug)]
struct ExactDecimal(String);

impl Type<MySql> for ExactDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        matches!(ty.name(), "DECIMAL" | "NUMERIC")
    }
}

impl<'r> Decode<'r, MySql> for ExactDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<MySql>>::decode(value).map(|s| ExactDecimal(s.to_owned()))
    }
}

/// UTF-8 text when the bytes allow it, base64 otherwise.
pub fn bytes_to_json(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(text) => JsonValue::String(text.to_owned()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_to_json(v: f64) -> JsonValue {
    // NaN and infinities have no JSON number form
    Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> JsonRow {
        self.columns()
            .iter()
            .map(|col| {
                let kind = ColumnKind::from_type_name(col.type_info().name());
                (col.name().to_owned(), column_value(self, col.ordinal(), kind))
            })
            .collect()
    }
}

fn get<'r, T>(row: &'r MySqlRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn column_value(row: &MySqlRow, idx: usize, kind: ColumnKind) -> JsonValue {
    let decoded = match kind {
        ColumnKind::Signed => get::<i64>(row, idx).map(|v| v.map(JsonValue::from)),
        ColumnKind::Unsigned => get::<u64>(row, idx).map(|v| v.map(JsonValue::from)),
        ColumnKind::Float => get::<f64>(row, idx)
            .or_else(|_| get::<f32>(row, idx).map(|v| v.map(f64::from)))
            .map(|v| v.map(float_to_json)),
        ColumnKind::Decimal => get::<ExactDecimal>(row, idx).map(|v| v.map(|d| JsonValue::String(d.0))),
        ColumnKind::Boolean => get::<bool>(row, idx).map(|v| v.map(JsonValue::Bool)),
        ColumnKind::Json => get::<JsonValue>(row, idx),
        ColumnKind::Bytes => get::<Vec<u8>>(row, idx).map(|v| v.map(|b| bytes_to_json(&b))),
        ColumnKind::Text => get::<String>(row, idx).map(|v| v.map(JsonValue::String)),
    };

    match decoded {
        Ok(value) => value.unwrap_or(JsonValue::Null),
        // Temporal types and binary-collated strings land here
        Err(first) => match get::<Vec<u8>>(row, idx) {
            Ok(bytes) => bytes.map(|b| bytes_to_json(&b)).unwrap_or(JsonValue::Null),
            Err(_) => {
                warn!(column = idx, ?kind, error = %first, "Undecodable column, returning null");
                JsonValue::Null
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_signedness() {
        assert_eq!(ColumnKind::from_type_name("INT"), ColumnKind::Signed);
        assert_eq!(ColumnKind::from_type_name("BIGINT"), ColumnKind::Signed);
        assert_eq!(
            ColumnKind::from_type_name("BIGINT UNSIGNED"),
            ColumnKind::Unsigned
        );
        assert_eq!(
            ColumnKind::from_type_name("tinyint unsigned"),
            ColumnKind::Unsigned
        );
        assert_eq!(ColumnKind::from_type_name("YEAR"), ColumnKind::Unsigned);
    }

    #[test]
    fn test_exact_and_approximate_numerics() {
        assert_eq!(ColumnKind::from_type_name("DECIMAL"), ColumnKind::Decimal);
        assert_eq!(ColumnKind::from_type_name("NUMERIC"), ColumnKind::Decimal);
        assert_eq!(ColumnKind::from_type_name("DOUBLE"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_type_name("FLOAT"), ColumnKind::Float);
    }

    #[test]
    fn test_strings_bytes_and_fallback() {
        assert_eq!(ColumnKind::from_type_name("VARCHAR"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_type_name("ENUM"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_type_name("DATETIME"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_type_name("VARBINARY"), ColumnKind::Bytes);
        assert_eq!(ColumnKind::from_type_name("BLOB"), ColumnKind::Bytes);
        assert_eq!(ColumnKind::from_type_name("JSON"), ColumnKind::Json);
        assert_eq!(ColumnKind::from_type_name("BOOLEAN"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_type_name(""), ColumnKind::Text);
    }

    #[test]
    fn test_bytes_to_json() {
        assert_eq!(bytes_to_json(b"varchar(255)"), JsonValue::from("varchar(255)"));
        assert_eq!(bytes_to_json(&[0xFF, 0xFE, 0x00, 0x01]), JsonValue::from("//4AAQ=="));
        assert_eq!(bytes_to_json(&[]), JsonValue::from(""));
    }

    #[test]
    fn test_non_finite_floats_become_strings() {
        assert_eq!(float_to_json(1.5), JsonValue::from(1.5));
        assert_eq!(float_to_json(f64::NAN), JsonValue::from("NaN"));
    }
}
