//! Text rendering of results.

use std::str::FromStr;

use super::value::ResultValue;
use crate::error::Error;

/// Output truncation requested with `--peek N[,C]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Peek {
    /// Lines (or table rows) to keep; negative keeps the tail
    pub rows: Option<i64>,
    /// Characters to keep, applied before the line limit
    pub chars: Option<usize>,
}

impl FromStr for Peek {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = text.split(',').map(str::trim);
        let invalid = || Error::Arguments(format!("invalid peek '{text}', expected N[,C]"));

        let rows = match parts.next() {
            Some("") | None => None,
            Some(n) => Some(n.parse().map_err(|_| invalid())?),
        };
        let chars = match parts.next() {
            Some("") | None => None,
            Some(c) => Some(c.parse().map_err(|_| invalid())?),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { rows, chars })
    }
}

impl Peek {
    /// Truncate rendered text.
    pub fn apply(&self, text: &str) -> String {
        let mut text = match self.chars {
            Some(chars) => text.chars().take(chars).collect(),
            None => text.to_string(),
        };
        if let Some(rows) = self.rows {
            let lines: Vec<&str> = text.split('\n').collect();
            let keep = if rows >= 0 {
                lines.len().min(rows as usize)
            } else {
                lines.len().saturating_sub(rows.unsigned_abs() as usize)
            };
            text = lines[..keep].join("\n");
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }
}

/// A result that has no text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported {
    pub type_name: &'static str,
}

/// Render a value as text.
///
/// Tables and figures nested in sequences or mappings have no text form.
pub fn render_text(value: &ResultValue) -> Result<String, Unsupported> {
    let text = match value {
        ResultValue::Scalar(scalar) => format!("{scalar}\n"),
        ResultValue::Table(table) => table.to_tsv(),
        ResultValue::Plot(_) => return Err(unsupported(value)),
        ResultValue::Sequence(items) => render_sequence(items)?,
        ResultValue::Mapping(entries) => render_mapping(entries)?,
    };
    Ok(text)
}

fn unsupported(value: &ResultValue) -> Unsupported {
    Unsupported {
        type_name: value.type_name(),
    }
}

fn check_nested(value: &ResultValue) -> Result<(), Unsupported> {
    match value {
        ResultValue::Table(_) | ResultValue::Plot(_) => Err(unsupported(value)),
        _ => Ok(()),
    }
}

/// Items of a row: a sequence is spread, anything else is one cell.
fn cells(value: &ResultValue) -> Vec<String> {
    match value {
        ResultValue::Sequence(items) => items.iter().map(ResultValue::py_str).collect(),
        other => vec![other.py_str()],
    }
}

/// Column names in first-seen order.
fn union_keys<'a>(rows: impl Iterator<Item = &'a [(String, ResultValue)]>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for (key, _) in row {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    keys
}

fn lookup<'a>(row: &'a [(String, ResultValue)], key: &str) -> String {
    row.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| match v {
            ResultValue::Scalar(s) => s.field(),
            other => other.py_str(),
        })
        .unwrap_or_default()
}

fn render_sequence(items: &[ResultValue]) -> Result<String, Unsupported> {
    items.iter().try_for_each(check_nested)?;
    let Some(first) = items.first() else {
        return Ok(String::new());
    };

    let mut text = String::new();
    match first {
        ResultValue::Sequence(_) => {
            for item in items {
                text.push_str(&cells(item).join("\t"));
                text.push('\n');
            }
        }
        ResultValue::Mapping(_) => {
            let rows: Vec<&[(String, ResultValue)]> = items
                .iter()
                .map(|item| match item {
                    ResultValue::Mapping(entries) => entries.as_slice(),
                    _ => Default::default(),
                })
                .collect();
            let keys = union_keys(rows.iter().copied());
            text.push_str(&keys.join("\t"));
            text.push('\n');
            for row in rows {
                let fields: Vec<String> = keys.iter().map(|k| lookup(row, k)).collect();
                text.push_str(&fields.join("\t"));
                text.push('\n');
            }
        }
        _ => {
            for item in items {
                text.push_str(&item.py_str());
                text.push('\n');
            }
        }
    }
    Ok(text)
}

fn render_mapping(entries: &[(String, ResultValue)]) -> Result<String, Unsupported> {
    for (_, value) in entries {
        check_nested(value)?;
    }
    // The last value decides the layout.
    let Some((_, last)) = entries.last() else {
        return Ok(String::new());
    };

    let mut text = String::new();
    match last {
        ResultValue::Mapping(_) => {
            let rows: Vec<&[(String, ResultValue)]> = entries
                .iter()
                .map(|(_, v)| match v {
                    ResultValue::Mapping(inner) => inner.as_slice(),
                    _ => Default::default(),
                })
                .collect();
            let keys = union_keys(rows.iter().copied());
            text.push('\t');
            text.push_str(&keys.join("\t"));
            text.push('\n');
            for ((name, _), row) in entries.iter().zip(rows) {
                let fields: Vec<String> = keys.iter().map(|k| lookup(row, k)).collect();
                text.push_str(&format!("{}\t{}\n", name, fields.join("\t")));
            }
        }
        _ => {
            for (name, value) in entries {
                text.push_str(&format!("{}\t{}\n", name, cells(value).join("\t")));
            }
        }
    }
    Ok(text)
}
