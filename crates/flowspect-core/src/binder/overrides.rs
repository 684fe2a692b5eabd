//! Per-parameter argument settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::python::PyValue;

/// Value type of a command line argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Str,
    Int,
    Float,
    /// List of strings from an annotation like `list` or `List[str]`
    List,
    StrList,
    IntList,
    FloatList,
}

impl ValueKind {
    /// Infer the kind from a Python annotation.
    pub fn from_annotation(annotation: &str) -> Self {
        let annotation = annotation.trim().trim_start_matches("typing.");
        match annotation {
            "int" => return Self::Int,
            "float" => return Self::Float,
            "list" | "tuple" => return Self::List,
            _ => {}
        }

        let base = annotation.split('[').next().unwrap_or_default().trim();
        match base {
            "List" | "Tuple" | "Sequence" | "list" | "tuple" => Self::List,
            "Union" | "Optional" => {
                let inner = annotation
                    .get(base.len()..)
                    .unwrap_or_default()
                    .trim()
                    .trim_start_matches('[')
                    .trim_end_matches(']');
                let holds_list = union_members(inner)
                    .into_iter()
                    .any(|member| Self::from_annotation(member) == Self::List);
                if holds_list { Self::List } else { Self::Str }
            }
            _ => Self::Str,
        }
    }

    /// Whether the argument accumulates several values.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::List | Self::StrList | Self::IntList | Self::FloatList
        )
    }

    /// Convert one raw command line item.
    ///
    /// Items of numeric lists that do not parse become `0`.
    pub fn convert(self, raw: &str) -> PyValue {
        match self {
            Self::Str | Self::List | Self::StrList => PyValue::Str(raw.to_string()),
            Self::Int => raw
                .trim()
                .parse()
                .map_or_else(|_| PyValue::Str(raw.to_string()), PyValue::Int),
            Self::Float => raw
                .trim()
                .parse()
                .map_or_else(|_| PyValue::Str(raw.to_string()), PyValue::Float),
            Self::IntList => PyValue::Int(raw.trim().parse().unwrap_or(0)),
            Self::FloatList => PyValue::Float(raw.trim().parse().unwrap_or(0.0)),
        }
    }
}

/// Members of a `Union[...]` annotation.
fn union_members(inner: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (idx, c) in inner.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ',' if depth == 0 => {
                members.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    members.push(&inner[start..]);
    members
}

/// Extra settings for one argument.
///
/// Keys matching a function parameter tune how that parameter is exposed.
/// Other keys describe output arguments: `output = n` routes the function's
/// n-th result (1-based) to the file named by the argument.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArgOverride {
    /// Result index for output arguments, `0` for inputs
    pub output: usize,
    /// Flag spellings, e.g. `["-o", "--outFile"]`
    pub flags: Vec<String>,
    /// Name the parsed value is stored under
    pub dest: Option<String>,
    pub help: Option<String>,
    pub default: Option<PyValue>,
    pub kind: Option<ValueKind>,
    /// Explicit `nargs` for the generated `argparse` call
    pub nargs: Option<String>,
}

/// Module variable of a generated script holding its overrides as JSON.
pub const OVERRIDES_VARIABLE: &str = "__arguments__";

/// Argument settings keyed by parameter name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ArgumentOverrides(BTreeMap<String, ArgOverride>);

impl ArgumentOverrides {
    /// No overrides at all: results go to stdout only.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgOverride) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgOverride> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgOverride)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ArgumentOverrides {
    /// The single `-o/--outFile` output argument.
    fn default() -> Self {
        let mut overrides = Self::empty();
        overrides.insert(
            "outFile",
            ArgOverride {
                output: 1,
                flags: vec!["-o".to_string(), "--outFile".to_string()],
                dest: Some("outFile".to_string()),
                help: Some(
                    "Location where results should be saved. If not specified, STDOUT will be used."
                        .to_string(),
                ),
                ..ArgOverride::default()
            },
        );
        overrides
    }
}
