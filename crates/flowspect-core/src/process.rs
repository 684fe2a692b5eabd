//! Process nodes: one stage of a pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::binder::{ArgumentOverrides, CommandBinding};
use crate::channel::{CaptureCommand, ChannelSpec, CompiledChannels, CompilerInput, compile_channels};
use crate::error::{Error, Result};
use crate::paths::{PipelineDirs, write_executable};
use crate::pipeline::PipelineSettings;
use crate::python::{PyValue, PythonModule};
use crate::templates::{ProcessTemplate, ScriptTemplate, Template};

/// A channel statement placed before a process block.
///
/// A list is an operator chain: `["x = Channel", "from(1, 2)"]` renders as
/// `x = Channel\n    .from(1, 2)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Statement {
    Line(String),
    Chain(Vec<String>),
}

impl Statement {
    pub fn parts(&self) -> Vec<String> {
        match self {
            Self::Line(line) => vec![line.clone()],
            Self::Chain(parts) => parts.clone(),
        }
    }

    /// Text of the whole statement on one line.
    pub fn text(&self) -> String {
        self.parts().join(".")
    }
}

/// Software a process needs besides its own script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dependencies {
    /// Conda environment used when the process sets none
    pub conda: Option<String>,
    /// Container used when the process sets none
    pub container: Option<String>,
    /// Extra import statements for the script
    pub imports: Vec<String>,
    /// Packages expected to be installed from git in the environment
    pub git_packages: Vec<String>,
    /// Local package directories copied into `<pipeline>/packages`
    pub inhouse_packages: Vec<PathBuf>,
}

fn default_function() -> String {
    "process".to_string()
}

fn default_capture_params() -> [String; 2] {
    ["notebooktitle".to_string(), "capturednotebook".to_string()]
}

/// One pipeline stage, backed by a Python function or a shell command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessNode {
    /// Process name; also the name of its script
    pub name: String,
    /// Python module holding the function
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Function exposed by the process
    #[serde(default = "default_function")]
    pub function: String,
    /// Shell command replacing the Python function
    #[serde(default)]
    pub command: Option<String>,
    /// Channels consumed by the process
    #[serde(default)]
    pub inchannels: Vec<String>,
    /// Channels produced by the process
    #[serde(default)]
    pub outchannels: Vec<String>,
    /// Values of parameters that become pipeline parameters
    #[serde(default)]
    pub params: BTreeMap<String, PyValue>,
    /// Explicit `input:` lines, bypassing the channel compiler
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
    /// Explicit `output:` lines, bypassing the channel compiler
    #[serde(default)]
    pub outputs: Option<Vec<String>>,
    #[serde(default)]
    pub conda: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    /// `withName:` settings of the process
    #[serde(default)]
    pub process_settings: BTreeMap<String, PyValue>,
    /// Also render a notebook of the run
    #[serde(default)]
    pub capture: bool,
    /// Variables holding the notebook title and path
    #[serde(default = "default_capture_params")]
    pub capture_params: [String; 2],
    /// Argument settings; absent means the default `-o/--outFile`
    #[serde(default)]
    pub arguments: Option<ArgumentOverrides>,
    /// Description replacing the function docstring
    #[serde(default)]
    pub manual_doc: Option<String>,
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub pretreat: Vec<Statement>,
    /// Raw `directive value` pairs
    #[serde(default)]
    pub directives: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Dependencies,
}

/// Output of compiling one process node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProcess {
    pub name: String,
    /// The Nextflow block, pretreat statements included
    pub block: String,
    /// Pipeline parameters read by the process, with their values
    pub pipeline_params: Vec<(String, PyValue)>,
    /// `withName:` settings
    pub settings: Vec<(String, PyValue)>,
    /// Container reference, not yet resolved
    pub container: Option<String>,
    pub conda: Option<String>,
    /// Generated script, for Python-backed processes
    pub script: Option<PathBuf>,
}

impl ProcessNode {
    /// A Python-backed process with default settings.
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            function: default_function(),
            command: None,
            inchannels: Vec::new(),
            outchannels: Vec::new(),
            params: BTreeMap::new(),
            inputs: None,
            outputs: None,
            conda: None,
            container: None,
            process_settings: BTreeMap::new(),
            capture: false,
            capture_params: default_capture_params(),
            arguments: None,
            manual_doc: None,
            channels: Vec::new(),
            pretreat: Vec::new(),
            directives: BTreeMap::new(),
            dependencies: Dependencies::default(),
        }
    }

    /// Conda environment, falling back to the declared dependency.
    pub fn effective_conda(&self) -> Option<String> {
        non_empty(&self.conda).or_else(|| non_empty(&self.dependencies.conda))
    }

    /// Container reference: the node's own, its process settings, then the
    /// declared dependency.
    pub fn effective_container(&self) -> Option<String> {
        non_empty(&self.container)
            .or_else(|| match self.process_settings.get("container") {
                Some(PyValue::Str(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .or_else(|| non_empty(&self.dependencies.container))
    }

    /// Compile the node: write its script and render its Nextflow block.
    pub fn compile(&self, dirs: &PipelineDirs, settings: &PipelineSettings) -> Result<CompiledProcess> {
        let (lines, doc, script) = match &self.command {
            Some(command) => {
                let inputs = self
                    .inputs
                    .clone()
                    .ok_or_else(|| Error::MissingInputs(self.name.clone()))?;
                let lines = CompiledChannels {
                    inputs,
                    outputs: self.outputs.clone().unwrap_or_default(),
                    command: command.trim().to_string(),
                    ..CompiledChannels::default()
                };
                (lines, self.manual_doc.clone().unwrap_or_default(), None)
            }
            None => self.compile_python(dirs, settings)?,
        };

        let mut directives: Vec<(String, String)> = self
            .directives
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let conda = self.effective_conda();
        if let Some(conda) = &conda {
            directives.push(("conda".to_string(), quoted(conda)));
        }

        let pretreat: Vec<Vec<String>> = self.pretreat.iter().map(Statement::parts).collect();
        let block = ProcessTemplate {
            name: &self.name,
            doc: &doc,
            pretreat: &pretreat,
            directives: &directives,
            inputs: &lines.inputs,
            outputs: &lines.outputs,
            command: &lines.command,
        }
        .render();

        Ok(CompiledProcess {
            name: self.name.clone(),
            block,
            pipeline_params: lines.pipeline_params,
            settings: self
                .process_settings
                .iter()
                .filter(|(k, _)| k.as_str() != "container")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            container: self.effective_container(),
            conda,
            script,
        })
    }

    fn compile_python(
        &self,
        dirs: &PipelineDirs,
        settings: &PipelineSettings,
    ) -> Result<(CompiledChannels, String, Option<PathBuf>)> {
        let source = self.source.as_ref().ok_or_else(|| {
            Error::Manifest(format!(
                "process '{}' needs either `source` or `command`",
                self.name
            ))
        })?;
        let module = PythonModule::parse_file(source)?;
        let overrides = self.arguments.clone().unwrap_or_default();
        let binding = CommandBinding::from_module(&module, &self.function, &overrides)?;
        let function = module.function(&self.function)?;

        let deps = &self.dependencies;
        copy_packages(&deps.inhouse_packages, &dirs.packages_dir)?;

        let mut imports = module.imports().to_vec();
        imports.extend(deps.imports.iter().cloned());
        for package in &deps.git_packages {
            imports.push(format!("# requires: {package}"));
        }
        let helpers: Vec<String> = module
            .helpers(&self.function)
            .map(|helper| helper.source.clone())
            .collect();
        let save_command = settings.save_command();
        let embedded = self.arguments.as_ref().map(serde_json::to_string).transpose()?;

        let script = ScriptTemplate {
            packages_dir: &dirs.packages_dir,
            imports: &imports,
            helpers: &helpers,
            function_source: &function.source,
            binding: &binding,
            overrides: embedded.as_deref(),
            save_command: &save_command,
        }
        .render();
        let script_path = dirs.script(&self.name);
        write_executable(&script_path, &script)?;
        debug!("Wrote {}", script_path.display());

        let capture = self.capture.then(|| CaptureCommand {
            program: settings.capture_program.clone(),
            title: self.capture_params[0].clone(),
            notebook: self.capture_params[1].clone(),
            function: self.function.clone(),
        });
        let mut lines = compile_channels(CompilerInput {
            process: &self.name,
            binding: &binding,
            channels: &self.channels,
            inchannels: &self.inchannels,
            outchannels: &self.outchannels,
            params: &self.params,
            capture: capture.as_ref(),
        })?;

        if let Some(inputs) = &self.inputs {
            lines.inputs = inputs.clone();
            lines.pipeline_params.clear();
        }
        if let Some(outputs) = &self.outputs {
            lines.outputs = outputs.clone();
        }

        let doc = self
            .manual_doc
            .clone()
            .or_else(|| function.docstring.clone())
            .unwrap_or_default();
        Ok((lines, doc, Some(script_path)))
    }
}

/// Copy in-house package directories into `target`, skipping dot entries.
pub fn copy_packages(packages: &[PathBuf], target: &Path) -> Result<()> {
    for package in packages {
        let Some(name) = package.file_name() else {
            continue;
        };
        let destination = target.join(name);
        info!("Copying package {} to {}", package.display(), destination.display());

        let entries = WalkDir::new(package)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in entries {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            let relative = entry.path().strip_prefix(package).unwrap_or(entry.path());
            let path = destination.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&path)?;
            } else {
                fs::copy(entry.path(), &path)?;
            }
        }
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn quoted(value: &str) -> String {
    if value.starts_with(['\'', '"']) {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}
