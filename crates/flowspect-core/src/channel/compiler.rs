//! Reconciles function parameters, channel variables and shell flags.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::spec::{ChannelSpec, shell_reference};
use crate::binder::CommandBinding;
use crate::error::{Error, Result};
use crate::python::PyValue;

/// Notebook capture settings of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCommand {
    /// Executable of the capture renderer
    pub program: String,
    /// Nextflow variable holding the notebook title
    pub title: String,
    /// Nextflow variable holding the notebook path
    pub notebook: String,
    /// Function the captured script wraps
    pub function: String,
}

/// Everything the compiler needs to know about one process.
#[derive(Debug, Clone, Copy)]
pub struct CompilerInput<'a> {
    /// Process name; the script is `<name>.py`
    pub process: &'a str,
    pub binding: &'a CommandBinding,
    /// All channel specifications known to the process, in declaration order
    pub channels: &'a [ChannelSpec],
    pub inchannels: &'a [String],
    pub outchannels: &'a [String],
    /// Values for parameters that fall back to pipeline parameters
    pub params: &'a BTreeMap<String, PyValue>,
    pub capture: Option<&'a CaptureCommand>,
}

/// Result of compiling the channels of one process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledChannels {
    /// `input:` block lines
    pub inputs: Vec<String>,
    /// `output:` block lines
    pub outputs: Vec<String>,
    /// Shell command (one line, or two with capture)
    pub command: String,
    /// Flagged arguments in emission order
    pub flags: Vec<String>,
    /// Positional arguments in function parameter order
    pub positionals: Vec<String>,
    /// Unflagged trailing arguments, forwarded to `*args`
    pub lazy: Vec<String>,
    /// Pipeline parameters this process reads, with their values
    pub pipeline_params: Vec<(String, PyValue)>,
}

/// Parameters not yet claimed by a channel, in function order.
struct Remainder(Vec<String>);

impl Remainder {
    fn claim(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        before != self.0.len()
    }
}

struct Emitter<'a> {
    input: CompilerInput<'a>,
    flags: Vec<String>,
    positionals: BTreeMap<String, String>,
    lazy: Vec<String>,
}

impl Emitter<'_> {
    /// Emit the argument passing `reference` to `param`.
    fn emit(&mut self, param: &str, reference: String) {
        if let Some(lazy) = param.strip_prefix('*') {
            debug!("Deferring lazy argument '{}' of {}", lazy, self.input.process);
            self.lazy.push(reference);
            return;
        }
        let many = self
            .input
            .binding
            .argument(param)
            .is_some_and(|arg| arg.takes_many());
        match self.input.binding.flag_table.get(param) {
            Some("") => {
                self.positionals.insert(param.to_string(), reference);
            }
            // A variable-length flag would swallow the words after it.
            Some(flag) if many => self.flags.push(format!("{}={reference}", flag.trim_end())),
            Some(flag) => self.flags.push(format!("{flag}{reference}")),
            None => self.flags.push(format!("--{param} {reference}")),
        }
    }

    /// Emit an argument a channel feeds, refusing parameters fed twice.
    fn emit_bound(
        &mut self,
        bound: &mut Vec<String>,
        channel: &str,
        param: &str,
        reference: String,
    ) -> Result<()> {
        if !param.starts_with('*') {
            if bound.iter().any(|b| b == param) {
                return Err(Error::DuplicateBinding {
                    process: self.input.process.to_string(),
                    channel: channel.to_string(),
                    param: param.to_string(),
                });
            }
            bound.push(param.to_string());
        }
        self.emit(param, reference);
        Ok(())
    }
}

/// Compile the `input:`/`output:` blocks and the command of a process.
pub fn compile_channels(input: CompilerInput<'_>) -> Result<CompiledChannels> {
    let binding = input.binding;
    let mut emitter = Emitter {
        input,
        flags: Vec::new(),
        positionals: BTreeMap::new(),
        lazy: Vec::new(),
    };
    let mut compiled = CompiledChannels::default();
    let mut bound = Vec::new();

    for name in input.params.keys() {
        let is_channel = input
            .channels
            .iter()
            .any(|c| c.name.names().contains(&name.as_str()));
        if binding.argument(name).is_none() && !is_channel {
            warn!(
                "Parameter '{}' is not a parameter of {} and is ignored",
                name, input.process
            );
        }
    }

    // Inputs.
    let mut remainder = Remainder(
        binding
            .flag_table
            .inputs()
            .map(|(name, _)| name.to_string())
            .collect(),
    );

    for spec in input.channels {
        let Some(name) = spec.name.single() else {
            if spec.name.names().iter().any(|n| input.inchannels.iter().any(|c| c == n)) {
                warn!(
                    "Channel '{}' fans out and cannot be an input of {}, ignoring it",
                    spec.name, input.process
                );
            }
            continue;
        };
        if !input.inchannels.iter().any(|c| c == name) {
            continue;
        }
        if spec.is_skipped() {
            for python in spec.python_names() {
                remainder.claim(&python);
            }
            debug!("Skipping bookkeeping channel '{}' of {}", name, input.process);
            continue;
        }

        let resolved = spec.resolve()?;
        for (position, python) in resolved.python.iter().enumerate() {
            let Some(python) = python else { continue };
            remainder.claim(python.trim_start_matches('*'));
            let reference = shell_reference(&resolved.variables[position]);
            emitter.emit_bound(&mut bound, name, python, reference)?;
        }

        let source = if spec.from_params {
            let value = input.params.get(name).cloned().unwrap_or(PyValue::None);
            compiled.pipeline_params.push((name.to_string(), value));
            format!("params.{name}")
        } else {
            name.to_string()
        };
        compiled.inputs.push(format!(
            "{} {} from {}{}",
            spec.kind.as_deref().unwrap_or_default(),
            resolved.declaration,
            source,
            spec.transform.as_deref().unwrap_or_default()
        ));
    }

    for param in &remainder.0 {
        compiled
            .inputs
            .push(format!("val {param} from params.{param}"));
        compiled
            .pipeline_params
            .push((param.clone(), fallback_value(&input, param)));
        emitter.emit(param, format!("${param}"));
    }

    // Outputs.
    let mut unrouted = Remainder(
        binding
            .flag_table
            .outputs()
            .map(|(name, _)| name.to_string())
            .collect(),
    );

    for spec in input.channels {
        if !spec
            .name
            .names()
            .iter()
            .any(|n| input.outchannels.iter().any(|c| c == n))
        {
            continue;
        }
        if spec.is_skipped() {
            for python in spec.python_names() {
                unrouted.claim(&python);
            }
            continue;
        }

        let resolved = spec.resolve()?;
        for (position, python) in resolved.python.iter().enumerate() {
            let Some(python) = python else { continue };
            unrouted.claim(python.trim_start_matches('*'));
            let reference = shell_reference(&resolved.variables[position]);
            let channel = spec.name.to_string();
            emitter.emit_bound(&mut bound, &channel, python, reference)?;
        }

        let kind = spec.kind.as_deref().unwrap_or_default();
        let line = if resolved.declaration.is_empty() {
            format!("{kind}{}", spec.name.route())
        } else {
            format!("{kind} {}{}", resolved.declaration, spec.name.route())
        };
        compiled
            .outputs
            .push(format!("{line}{}", spec.transform.as_deref().unwrap_or_default()));
    }

    for param in &unrouted.0 {
        debug!(
            "Output '{}' of {} is not routed to a channel, exposing it as a pipeline parameter",
            param, input.process
        );
        compiled
            .inputs
            .push(format!("val {param} from params.{param}"));
        compiled
            .pipeline_params
            .push((param.clone(), fallback_value(&input, param)));
        compiled.outputs.push(format!("val {param} into {param}"));
        emitter.emit(param, format!("${param}"));
    }

    // Command.
    let positionals: Vec<String> = binding
        .arguments
        .iter()
        .filter_map(|arg| emitter.positionals.get(&arg.param).cloned())
        .collect();

    let mut parts = vec![format!("{}.py", input.process)];
    parts.extend(positionals.iter().cloned());
    parts.extend(emitter.flags.iter().cloned());
    parts.extend(emitter.lazy.iter().cloned());
    let mut command = parts.join(" ");

    if let Some(capture) = input.capture {
        command = format!(
            "{command}\n{} --notebooktitle ${} --capturednotebook ${} --function {} {command}",
            capture.program, capture.title, capture.notebook, capture.function
        );
    }

    compiled.command = command;
    compiled.flags = emitter.flags;
    compiled.positionals = positionals;
    compiled.lazy = emitter.lazy;
    Ok(compiled)
}

/// Value of a parameter that falls back to a pipeline parameter.
fn fallback_value(input: &CompilerInput<'_>, param: &str) -> PyValue {
    input
        .params
        .get(param)
        .cloned()
        .or_else(|| input.binding.argument(param).and_then(|a| a.default.clone()))
        .unwrap_or(PyValue::None)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::binder::ArgumentOverrides;
    use crate::channel::{ChannelName, Names};
    use crate::python::PythonModule;

    const SOURCE: &str = "
def process(table, sample, *rest, minCount: int = 5, label: str = 'x'):
    return table
";

    fn binding(overrides: &ArgumentOverrides) -> CommandBinding {
        let module = PythonModule::parse_str(SOURCE, Path::new("p.py")).unwrap();
        CommandBinding::from_module(&module, "process", overrides).unwrap()
    }

    fn compile(
        binding: &CommandBinding,
        channels: &[ChannelSpec],
        inchannels: &[&str],
        outchannels: &[&str],
    ) -> Result<CompiledChannels> {
        let inchannels: Vec<String> = inchannels.iter().map(|s| s.to_string()).collect();
        let outchannels: Vec<String> = outchannels.iter().map(|s| s.to_string()).collect();
        let params = BTreeMap::new();
        compile_channels(CompilerInput {
            process: "countThings",
            binding,
            channels,
            inchannels: &inchannels,
            outchannels: &outchannels,
            params: &params,
            capture: None,
        })
    }

    #[test]
    fn test_remaining_params_fall_back_once() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![ChannelSpec::new("tables", "file", "table", Some("table"))];
        let compiled = compile(&binding, &channels, &["tables"], &[]).unwrap();

        assert_eq!(
            compiled.inputs,
            vec![
                "file table from tables",
                "val sample from params.sample",
                "val minCount from params.minCount",
                "val label from params.label",
            ]
        );
        let names: Vec<_> = compiled.pipeline_params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["sample", "minCount", "label"]);
        assert_eq!(compiled.pipeline_params[1].1, PyValue::Int(5));
        assert_eq!(
            compiled.command,
            "countThings.py $table $sample --minCount $minCount --label $label"
        );
    }

    #[test]
    fn test_literal_gets_no_sigil() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![ChannelSpec::new(
            "pairs",
            "tuple",
            "val(sample), 'counts.tsv'",
            None,
        )];
        let channels = vec![ChannelSpec {
            python: Some(Names::Many(vec!["sample".to_string(), "table".to_string()])),
            nextflow: Some(Names::Many(vec![
                "val(sample)".to_string(),
                "'counts.tsv'".to_string(),
            ])),
            ..channels[0].clone()
        }];
        let compiled = compile(&binding, &channels, &["pairs"], &[]).unwrap();
        assert_eq!(compiled.inputs[0], "tuple val(sample), 'counts.tsv' from pairs");
        assert_eq!(compiled.positionals, vec!["counts.tsv", "$sample"]);
        assert!(!compiled.command.contains("$counts"));
    }

    #[test]
    fn test_skip_sentinel_emits_nothing() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![
            ChannelSpec::new("tables", "file", "table", Some("table")),
            ChannelSpec::new("docs", "None", "sample", Some("sample")),
        ];
        let compiled = compile(&binding, &channels, &["tables", "docs"], &[]).unwrap();
        assert_eq!(compiled.inputs.len(), 3);
        assert!(!compiled.command.contains("sample"));
        assert!(compiled.inputs.iter().all(|l| !l.contains("sample")));
    }

    #[test]
    fn test_outputs_route_into_channels() {
        let binding = binding(&ArgumentOverrides::default());
        let channels = vec![
            ChannelSpec::new("tables", "file", "table", Some("table")),
            ChannelSpec {
                name: ChannelName::Many(vec!["forPlot".to_string(), "forReport".to_string()]),
                ..ChannelSpec::new("", "file", "'counts.tsv'", Some("outFile"))
            },
        ];
        let compiled = compile(&binding, &channels, &["tables"], &["forPlot"]).unwrap();
        assert_eq!(compiled.outputs, vec!["file 'counts.tsv' into{forPlot; forReport}"]);
        assert!(compiled.flags.contains(&"-o counts.tsv".to_string()));
        assert!(compiled.pipeline_params.iter().all(|(n, _)| n != "outFile"));
    }

    #[test]
    fn test_unrouted_output_becomes_pipeline_value() {
        let binding = binding(&ArgumentOverrides::default());
        let channels = vec![ChannelSpec::new("tables", "file", "table", Some("table"))];
        let compiled = compile(&binding, &channels, &["tables"], &[]).unwrap();
        assert_eq!(compiled.outputs, vec!["val outFile into outFile"]);
        assert!(compiled.inputs.contains(&"val outFile from params.outFile".to_string()));
        let flagged = compiled.flags.iter().filter(|f| f.starts_with("-o ")).count();
        assert_eq!(flagged, 1);
    }

    #[test]
    fn test_lazy_and_none_positions() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![ChannelSpec {
            nextflow: Some(Names::Many(vec![
                "table".to_string(),
                "extra".to_string(),
                "ignored".to_string(),
            ])),
            python: Some(Names::Many(vec![
                "table".to_string(),
                "*rest".to_string(),
                "None".to_string(),
            ])),
            ..ChannelSpec::new("bundle", "tuple", "", None)
        }];
        let compiled = compile(&binding, &channels, &["bundle"], &[]).unwrap();
        assert_eq!(compiled.lazy, vec!["$extra"]);
        assert!(compiled.command.starts_with("countThings.py $table $sample --"));
        assert!(compiled.command.ends_with(" $extra"));
        assert!(!compiled.command.contains("ignored"));
    }

    #[test]
    fn test_from_params_registers_channel() {
        let binding = binding(&ArgumentOverrides::empty());
        let mut spec = ChannelSpec::new("inputTable", "file", "table", Some("table"));
        spec.from_params = true;
        spec.transform = Some(".first()".to_string());
        let compiled = compile(&binding, &[spec], &["inputTable"], &[]).unwrap();
        assert_eq!(compiled.inputs[0], "file table from params.inputTable.first()");
        assert_eq!(compiled.pipeline_params[0].0, "inputTable");
    }

    #[test]
    fn test_capture_chains_second_command() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![ChannelSpec::new("tables", "file", "table", Some("table"))];
        let inchannels = vec!["tables".to_string()];
        let params = BTreeMap::new();
        let capture = CaptureCommand {
            program: "captureIntoNotebook.py".to_string(),
            title: "notebooktitle".to_string(),
            notebook: "capturednotebook".to_string(),
            function: "process".to_string(),
        };
        let compiled = compile_channels(CompilerInput {
            process: "countThings",
            binding: &binding,
            channels: &channels,
            inchannels: &inchannels,
            outchannels: &[],
            params: &params,
            capture: Some(&capture),
        })
        .unwrap();
        let lines: Vec<_> = compiled.command.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            format!(
                "captureIntoNotebook.py --notebooktitle $notebooktitle --capturednotebook $capturednotebook --function process {}",
                lines[0]
            )
        );
    }

    #[test]
    fn test_list_flag_follows_positionals() {
        let source = "def process(table, *, sizes: list = ['a']):\n    return table\n";
        let module = PythonModule::parse_str(source, Path::new("p.py")).unwrap();
        let binding =
            CommandBinding::from_module(&module, "process", &ArgumentOverrides::empty()).unwrap();
        let channels = vec![ChannelSpec::new("tables", "file", "table", Some("table"))];
        let compiled = compile(&binding, &channels, &["tables"], &[]).unwrap();
        assert_eq!(compiled.command, "countThings.py $table --sizes=$sizes");
    }

    #[test]
    fn test_parameter_fed_twice_is_refused() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![
            ChannelSpec::new("a", "val", "la", Some("label")),
            ChannelSpec::new("b", "val", "lb", Some("label")),
        ];
        let err = compile(&binding, &channels, &["a", "b"], &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateBinding { ref channel, ref param, .. } if channel == "b" && param == "label"
        ));
    }

    #[test]
    fn test_lazy_names_may_repeat() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![
            ChannelSpec::new("a", "val", "x", Some("*rest")),
            ChannelSpec::new("b", "val", "y", Some("*rest")),
        ];
        let compiled = compile(&binding, &channels, &["a", "b"], &[]).unwrap();
        assert_eq!(compiled.lazy, vec!["$x", "$y"]);
    }

    #[test]
    fn test_fan_out_channel_is_not_an_input() {
        let binding = binding(&ArgumentOverrides::empty());
        let channels = vec![ChannelSpec {
            name: ChannelName::Many(vec!["forPlot".to_string(), "forReport".to_string()]),
            ..ChannelSpec::new("", "file", "table", Some("table"))
        }];
        let compiled = compile(&binding, &channels, &["forPlot"], &[]).unwrap();
        assert_eq!(compiled.inputs[0], "val table from params.table");
        assert!(compiled.inputs.iter().all(|l| !l.contains("forPlot")));
    }
}
