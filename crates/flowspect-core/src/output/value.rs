//! Decoded results of a process function.

use std::fmt;
use std::path::PathBuf;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Cell text in a tab separated table; missing values are empty.
    pub fn field(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    /// Python `str()`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// A data frame: index, column names and rows.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Table {
    pub index: Vec<Value>,
    pub columns: Vec<Value>,
    pub data: Vec<Vec<Value>>,
}

impl Table {
    pub fn rows(&self) -> usize {
        self.data.len()
    }

    /// First `n` rows; a negative `n` drops the last `-n` rows.
    pub fn peek(&self, n: i64) -> Self {
        let len = self.data.len();
        let keep = if n >= 0 {
            len.min(n as usize)
        } else {
            len.saturating_sub(n.unsigned_abs() as usize)
        };
        let range = 0..keep;
        Self {
            index: self.index.get(range.clone()).map(<[Value]>::to_vec).unwrap_or_default(),
            columns: self.columns.clone(),
            data: self.data[range].to_vec(),
        }
    }

    /// Tab separated text with a header row and the index as first column.
    pub fn to_tsv(&self) -> String {
        let mut text = String::new();
        for column in &self.columns {
            text.push('\t');
            text.push_str(&json_field(column));
        }
        text.push('\n');
        for (position, row) in self.data.iter().enumerate() {
            let label = self.index.get(position).map_or_else(|| position.to_string(), json_field);
            text.push_str(&label);
            for cell in row {
                text.push('\t');
                text.push_str(&json_field(cell));
            }
            text.push('\n');
        }
        text
    }
}

/// An encoded figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    /// Image format, also the file extension
    pub format: String,
    pub data: Vec<u8>,
}

/// A value returned by a process function.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Scalar(Scalar),
    Sequence(Vec<ResultValue>),
    /// Key order is the order the function produced.
    Mapping(Vec<(String, ResultValue)>),
    Table(Table),
    Plot(Plot),
}

impl ResultValue {
    /// Decode a JSON encoded result.
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Scalar(Scalar::Int(i)),
                None => Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Self::Scalar(Scalar::Str(s.clone())),
            Value::Array(items) => {
                Self::Sequence(items.iter().map(Self::from_json).collect::<Result<_>>()?)
            }
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(table) = map.get("__table__") {
                        return Ok(Self::Table(serde_json::from_value(table.clone())?));
                    }
                    if let Some(plot) = map.get("__plot__") {
                        return decode_plot(plot).map(Self::Plot);
                    }
                }
                Self::Mapping(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(Scalar::Null) => "NoneType",
            Self::Scalar(Scalar::Bool(_)) => "bool",
            Self::Scalar(Scalar::Int(_)) => "int",
            Self::Scalar(Scalar::Float(_)) => "float",
            Self::Scalar(Scalar::Str(_)) => "str",
            Self::Sequence(_) => "list",
            Self::Mapping(_) => "dict",
            Self::Table(_) => "DataFrame",
            Self::Plot(_) => "Figure",
        }
    }

    /// Python `str()` of nested values.
    pub fn py_str(&self) -> String {
        match self {
            Self::Scalar(s) => s.to_string(),
            other => other.repr(),
        }
    }

    fn repr(&self) -> String {
        match self {
            Self::Scalar(s) => s.repr(),
            Self::Sequence(items) => format!(
                "[{}]",
                items.iter().map(Self::repr).collect::<Vec<_>>().join(", ")
            ),
            Self::Mapping(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Table(_) => "<DataFrame>".to_string(),
            Self::Plot(_) => "<Figure>".to_string(),
        }
    }
}

/// One result with where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// File to write; stdout when absent
    pub destination: Option<PathBuf>,
    /// The value as received, written verbatim to `.json` destinations
    pub raw: Value,
    pub value: ResultValue,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    value: Value,
}

/// Decode the payload a generated script sends to `save`.
///
/// The payload is a JSON list of `{"destination": ..., "value": ...}`.
pub fn decode_payload(text: &str) -> Result<Vec<ResultEntry>> {
    let entries: Vec<RawEntry> = serde_json::from_str(text)?;
    entries
        .into_iter()
        .map(|entry| {
            Ok(ResultEntry {
                destination: entry
                    .destination
                    .filter(|d| !d.is_empty() && d != "None")
                    .map(PathBuf::from),
                value: ResultValue::from_json(&entry.value)?,
                raw: entry.value,
            })
        })
        .collect()
}

fn decode_plot(plot: &Value) -> Result<Plot> {
    let format = plot
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or("png")
        .to_string();
    let encoded = plot.get("data").and_then(Value::as_str).unwrap_or_default();
    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::Serialization(format!("invalid figure data: {e}")))?;
    Ok(Plot { format, data })
}

fn json_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => ResultValue::from_json(other)
            .map(|v| v.py_str())
            .unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_tagged_objects() {
        let value = ResultValue::from_json(&json!({
            "__table__": {"index": ["a", "b"], "columns": ["n"], "data": [[1], [2]]}
        }))
        .unwrap();
        let ResultValue::Table(table) = value else {
            panic!("expected a table");
        };
        assert_eq!(table.to_tsv(), "\tn\na\t1\nb\t2\n");

        let value =
            ResultValue::from_json(&json!({"__plot__": {"format": "svg", "data": "PHN2Zy8+"}}))
                .unwrap();
        assert_eq!(
            value,
            ResultValue::Plot(Plot {
                format: "svg".to_string(),
                data: b"<svg/>".to_vec()
            })
        );
    }

    #[test]
    fn test_mapping_keeps_order() {
        let value = ResultValue::from_json(&json!({"zeta": 1, "alpha": 2.5})).unwrap();
        assert_eq!(
            value,
            ResultValue::Mapping(vec![
                ("zeta".to_string(), ResultValue::Scalar(Scalar::Int(1))),
                ("alpha".to_string(), ResultValue::Scalar(Scalar::Float(2.5))),
            ])
        );
    }

    #[test]
    fn test_decode_payload() {
        let entries = decode_payload(
            r#"[{"destination": null, "value": "hi"}, {"destination": "out.tsv", "value": [1, 2]}]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].destination, None);
        assert_eq!(entries[1].destination, Some(PathBuf::from("out.tsv")));
        assert_eq!(entries[1].raw, json!([1, 2]));
    }

    #[test]
    fn test_table_peek() {
        let table = Table {
            index: vec![json!(0), json!(1), json!(2)],
            columns: vec![json!("x")],
            data: vec![vec![json!(1.5)], vec![json!(null)], vec![json!("z")]],
        };
        assert_eq!(table.peek(2).to_tsv(), "\tx\n0\t1.5\n1\t\n");
        assert_eq!(table.peek(-1).to_tsv(), "\tx\n0\t1.5\n1\t\n");
        assert_eq!(table.peek(-5).to_tsv(), "\tx\n");
    }

    #[test]
    fn test_py_str() {
        let value = ResultValue::from_json(&json!(["a", 1, {"k": null}])).unwrap();
        assert_eq!(value.py_str(), "['a', 1, {'k': None}]");
        assert_eq!(ResultValue::Scalar(Scalar::Float(3.0)).py_str(), "3.0");
    }
}
