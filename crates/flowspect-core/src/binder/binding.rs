//! Binding of a Python function to command line arguments.

use tracing::{debug, warn};

use super::overrides::{ArgumentOverrides, ValueKind};
use crate::docstring::ParsedDocstring;
use crate::error::Result;
use crate::python::{FunctionSignature, ParamKind, PyValue, PythonModule};

/// Whether an argument feeds the function or names a result destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRole {
    Input,
    /// Destination of the n-th result (1-based)
    Output(usize),
}

/// One command line argument of a generated script.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    /// Function parameter (or override key for outputs)
    pub param: String,
    /// Name the parsed value is stored under
    pub dest: String,
    /// Flag spellings; empty for positional arguments
    pub flags: Vec<String>,
    pub help: String,
    pub default: Option<PyValue>,
    pub kind: ValueKind,
    pub nargs: Option<String>,
    pub role: ArgRole,
    /// Bound as a keyword argument when calling the function
    pub keyword: bool,
}

impl ArgumentSpec {
    pub fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    /// Rendered flag spelling with a trailing space, or `""` for positionals.
    pub fn spelling(&self) -> String {
        self.flags
            .first()
            .map(|flag| format!("{flag} "))
            .unwrap_or_default()
    }

    /// Whether the generated parser reads a variable number of values.
    pub fn takes_many(&self) -> bool {
        match self.nargs.as_deref() {
            Some(nargs) => matches!(nargs, "*" | "+" | "?"),
            None => self.kind.is_list(),
        }
    }
}

/// Parameter name to its flag spelling (`"--name "`), or `""` for positionals.
///
/// Input parameters and output arguments are kept apart so the channel
/// compiler can route them to the `input:` and `output:` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagTable {
    inputs: Vec<(String, String)>,
    outputs: Vec<(String, String)>,
}

impl FlagTable {
    pub fn insert_input(&mut self, param: impl Into<String>, spelling: impl Into<String>) {
        self.inputs.push((param.into(), spelling.into()));
    }

    pub fn insert_output(&mut self, param: impl Into<String>, spelling: impl Into<String>) {
        self.outputs.push((param.into(), spelling.into()));
    }

    /// Spelling for a parameter, inputs first.
    pub fn get(&self, param: &str) -> Option<&str> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .find(|(name, _)| name == param)
            .map(|(_, spelling)| spelling.as_str())
    }

    pub fn is_output(&self, param: &str) -> bool {
        self.outputs.iter().any(|(name, _)| name == param)
    }

    /// Input parameters in function order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inputs.iter().map(|(n, s)| (n.as_str(), s.as_str()))
    }

    /// Output arguments in result order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outputs.iter().map(|(n, s)| (n.as_str(), s.as_str()))
    }
}

/// Everything needed to expose one function on the command line.
#[derive(Debug, Clone)]
pub struct CommandBinding {
    /// Exposed function name
    pub function: String,
    /// Description shown by `--help`
    pub description: String,
    /// Arguments: function parameters in declared order, then outputs
    pub arguments: Vec<ArgumentSpec>,
    pub flag_table: FlagTable,
    /// Destination argument per result index
    pub outputs: Vec<Option<String>>,
    /// Module `__version__`, enables `--version`
    pub version: Option<String>,
    /// Text printed by `--inspect`
    pub inspect_doc: String,
    /// Name of the function's `*args` collector
    pub var_args: Option<String>,
}

impl CommandBinding {
    /// Bind `function` of `module`.
    pub fn from_module(
        module: &PythonModule,
        function: &str,
        overrides: &ArgumentOverrides,
    ) -> Result<Self> {
        let signature = module.function(function)?;
        let mut binding = Self::new(signature, overrides);
        binding.version = module.version().map(str::to_string);
        binding.inspect_doc = inspect_doc(module, signature);
        Ok(binding)
    }

    /// Bind a parsed signature.
    pub fn new(signature: &FunctionSignature, overrides: &ArgumentOverrides) -> Self {
        let doc = ParsedDocstring::parse(signature.docstring.as_deref());
        let mut arguments = Vec::new();
        let mut flag_table = FlagTable::default();

        for param in signature.exposed_params() {
            let keyword = param.kind == ParamKind::KeywordOnly;
            let tune = overrides.get(&param.name);
            if tune.is_some_and(|t| t.output > 0) {
                warn!(
                    "Parameter '{}' of '{}' is a function parameter and cannot be an output",
                    param.name, signature.name
                );
            }

            let help = tune
                .and_then(|t| t.help.clone())
                .or_else(|| doc.param_help(&param.name).map(str::to_string))
                .unwrap_or_default();
            let default = tune.and_then(|t| t.default.clone()).or_else(|| {
                keyword.then(|| param.default.clone()).flatten()
            });
            let kind = tune
                .and_then(|t| t.kind)
                .or_else(|| param.annotation.as_deref().map(ValueKind::from_annotation))
                .unwrap_or(ValueKind::Str);

            let mut flags = tune.map(|t| t.flags.clone()).unwrap_or_default();
            let mut dest = tune.and_then(|t| t.dest.clone());
            if default.is_some() && flags.len() < 2 {
                flags = vec![format!("--{}", param.name)];
                dest = Some(param.name.clone());
            }
            let flags = if dest.is_some() || flags.iter().any(|f| f.starts_with('-')) {
                flags
            } else {
                Vec::new()
            };

            let spec = ArgumentSpec {
                param: param.name.clone(),
                dest: dest.unwrap_or_else(|| param.name.clone()),
                flags,
                help,
                default,
                kind,
                nargs: tune.and_then(|t| t.nargs.clone()),
                role: ArgRole::Input,
                keyword,
            };
            flag_table.insert_input(&spec.param, spec.spelling());
            arguments.push(spec);
        }

        let mut result_count = 1;
        let mut output_specs: Vec<ArgumentSpec> = Vec::new();
        for (name, tune) in overrides.iter() {
            if signature.param(name).is_some() || name == "self" {
                continue;
            }
            if tune.output == 0 {
                warn!(
                    "Argument '{}' matches no parameter of '{}' and names no output",
                    name, signature.name
                );
                continue;
            }
            result_count = result_count.max(tune.output);
            if tune.flags.is_empty() {
                continue;
            }
            let dest = tune.dest.clone().unwrap_or_else(|| {
                let long = tune
                    .flags
                    .iter()
                    .find(|f| f.starts_with("--"))
                    .unwrap_or(&tune.flags[0]);
                long.trim_start_matches('-').to_string()
            });
            output_specs.push(ArgumentSpec {
                param: name.to_string(),
                dest,
                flags: tune.flags.clone(),
                help: tune.help.clone().unwrap_or_default(),
                default: tune.default.clone(),
                kind: tune.kind.unwrap_or(ValueKind::Str),
                nargs: tune.nargs.clone(),
                role: ArgRole::Output(tune.output),
                keyword: false,
            });
        }
        output_specs.sort_by_key(|spec| match spec.role {
            ArgRole::Output(index) => index,
            ArgRole::Input => 0,
        });

        let mut outputs = vec![None; result_count];
        for spec in &output_specs {
            if let ArgRole::Output(index) = spec.role {
                outputs[index - 1] = Some(spec.dest.clone());
            }
            flag_table.insert_output(&spec.param, spec.spelling());
        }
        arguments.extend(output_specs);

        debug!(
            "Bound '{}': {} arguments, {} results",
            signature.name,
            arguments.len(),
            outputs.len()
        );

        Self {
            function: signature.name.clone(),
            description: doc.description,
            arguments,
            flag_table,
            outputs,
            version: None,
            inspect_doc: String::new(),
            var_args: signature.var_args().map(str::to_string),
        }
    }

    /// Look up an argument by parameter name.
    pub fn argument(&self, param: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|a| a.param == param)
    }

    /// Input arguments, in function parameter order.
    pub fn inputs(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.arguments.iter().filter(|a| a.role == ArgRole::Input)
    }

    /// Output arguments, in result order.
    pub fn output_arguments(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.arguments.iter().filter(|a| a.role != ArgRole::Input)
    }
}

/// Master function doc followed by the docs of every helper function.
fn inspect_doc(module: &PythonModule, master: &FunctionSignature) -> String {
    let mut doc = String::from("The master function:\n\n");
    doc.push_str(&master.name);
    doc.push('\n');
    doc.push_str(master.docstring.as_deref().unwrap_or_default());
    doc.push_str("\n\n\nThe helper functions:\n\n");
    for helper in module.helpers(&master.name) {
        doc.push_str(&helper.name);
        doc.push('\n');
        doc.push_str(helper.docstring.as_deref().unwrap_or_default());
        doc.push_str("\n\n\n");
    }
    doc
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::binder::ArgOverride;

    const SOURCE: &str = r#"
__version__ = '0.3'

def helper():
    """Helps."""
    pass

def process(inputFile: str, label, *, sizes: list = ['1'], factor: float = 1.5, verbose=False):
    """
    Process things.

    Parameters
    ----------
    inputFile
        Input table.
    sizes
        Sizes to use.
    """
    return inputFile
"#;

    fn binding(overrides: &ArgumentOverrides) -> CommandBinding {
        let module = PythonModule::parse_str(SOURCE, Path::new("p.py")).unwrap();
        CommandBinding::from_module(&module, "process", overrides).unwrap()
    }

    #[test]
    fn test_positionals_and_keyword_flags() {
        let binding = binding(&ArgumentOverrides::empty());
        let table = &binding.flag_table;
        assert_eq!(table.get("inputFile"), Some(""));
        assert_eq!(table.get("label"), Some(""));
        assert_eq!(table.get("sizes"), Some("--sizes "));
        assert_eq!(table.get("factor"), Some("--factor "));
        assert_eq!(table.get("verbose"), Some("--verbose "));
        assert_eq!(binding.outputs, vec![None]);
    }

    #[test]
    fn test_types_and_help() {
        let binding = binding(&ArgumentOverrides::empty());
        let sizes = binding.argument("sizes").unwrap();
        assert_eq!(sizes.kind, ValueKind::List);
        assert_eq!(sizes.help, "Sizes to use.");
        assert!(sizes.keyword);
        assert_eq!(binding.argument("factor").unwrap().kind, ValueKind::Float);
        assert_eq!(binding.argument("inputFile").unwrap().help, "Input table.");
        assert_eq!(binding.description, "Process things.");
    }

    #[test]
    fn test_default_output_argument() {
        let binding = binding(&ArgumentOverrides::default());
        assert_eq!(binding.outputs, vec![Some("outFile".to_string())]);
        assert_eq!(binding.flag_table.get("outFile"), Some("-o "));
        assert!(binding.flag_table.is_output("outFile"));
        let out = binding.argument("outFile").unwrap();
        assert_eq!(out.role, ArgRole::Output(1));
        assert_eq!(binding.arguments.last().unwrap().param, "outFile");
    }

    #[test]
    fn test_override_gives_positional_a_flag() {
        let mut overrides = ArgumentOverrides::empty();
        overrides.insert(
            "label",
            ArgOverride {
                default: Some(PyValue::Str("x".to_string())),
                ..ArgOverride::default()
            },
        );
        let binding = binding(&overrides);
        assert_eq!(binding.flag_table.get("label"), Some("--label "));
        assert!(!binding.argument("label").unwrap().keyword);
    }

    #[test]
    fn test_result_count_from_bare_outputs() {
        let mut overrides = ArgumentOverrides::default();
        overrides.insert(
            "third",
            ArgOverride {
                output: 3,
                ..ArgOverride::default()
            },
        );
        let binding = binding(&overrides);
        assert_eq!(binding.outputs.len(), 3);
        assert_eq!(binding.outputs[0].as_deref(), Some("outFile"));
        assert_eq!(binding.outputs[2], None);
    }

    #[test]
    fn test_inspect_doc_lists_helpers() {
        let binding = binding(&ArgumentOverrides::empty());
        assert!(binding.inspect_doc.starts_with("The master function:\n\nprocess\n"));
        assert!(binding.inspect_doc.contains("helper\nHelps."));
        assert_eq!(binding.version.as_deref(), Some("0.3"));
    }
}
