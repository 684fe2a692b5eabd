//! Narrative document of one process run.

use std::fs;
use std::path::{Path, PathBuf};

use flowspect_core::python::dedent;
use flowspect_core::{
    ArgumentOverrides, BoundArguments, CommandBinding, Error, OVERRIDES_VARIABLE, PyValue, PythonModule,
};
use lazy_regex::regex;
use tracing::debug;

use crate::error::{CaptureError, CaptureResult};

/// Import lines that would open a plot window or fight the notebook backend.
const MATPLOTLIB_LINES: [&str; 4] = [
    "import matplotlib",
    "matplotlib.use('Agg')",
    "import matplotlib.pyplot as plt",
    "from matplotlib import pyplot as plt",
];

/// What to capture.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Process script, as a path or a name on PATH
    pub script: PathBuf,
    /// Function the script exposes
    pub function: String,
    /// Command line the script ran with
    pub argv: Vec<String>,
    pub title: String,
}

/// A `### ` section of the function body.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    /// Non-empty code lines, plus the echoed variable if any
    pub code: Vec<String>,
}

impl Section {
    /// Parse one piece of the body split on `### `.
    fn parse(piece: &str) -> Option<Self> {
        if piece.trim().is_empty() {
            return None;
        }
        let mut lines = piece.split('\n');
        let title = lines.next().unwrap_or_default().to_string();
        let mut code: Vec<String> = lines
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let last = code.last().map_or(title.as_str(), String::as_str);
        if let Some((target, _)) = last.split_once(" = ") {
            let words: Vec<&str> = target.split_whitespace().collect();
            if words.len() == 1 {
                code.push(words[0].to_string());
            }
        }
        Some(Self { title, code })
    }
}

/// The captured run, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookDocument {
    pub title: String,
    /// Function docstring, line breaks made hard breaks
    pub description: String,
    /// Module level statements, matplotlib ones commented out
    pub imports: Vec<String>,
    /// `name = value` lines of the bound arguments
    pub params: Vec<String>,
    pub sections: Vec<Section>,
}

impl NotebookDocument {
    /// Code of the import cell.
    pub fn import_code(&self) -> String {
        let mut code = String::from("%matplotlib notebook\n\nimport matplotlib.pyplot as plt\n");
        for line in &self.imports {
            code.push_str(line);
            code.push('\n');
        }
        code
    }

    /// Code of the parameter cell.
    pub fn param_code(&self) -> String {
        self.params.iter().map(|line| format!("{line}\n")).collect()
    }

    /// Render as markdown.
    pub fn to_markdown(&self) -> String {
        let mut text = format!("# {}  \n  \n", self.title);
        text.push_str(&self.description);
        text.push_str("\n  ## Imports and parameters  \n  \n");

        text.push_str("```python\n");
        text.push_str(&self.import_code());
        text.push_str("\n```\n");

        text.push_str("```python\n");
        text.push_str(&self.param_code());
        text.push_str("```\n\n  \n");

        text.push_str("\n  ## Body of the process  \n  \n");
        for section in &self.sections {
            text.push_str(&format!("```python\n ### {}\n\n", section.title));
            text.push_str(&section.code.join("\n"));
            text.push_str("\n```\n  \n");
        }
        text
    }
}

/// Find a script by path, then on PATH.
pub fn locate_script(script: &Path) -> CaptureResult<PathBuf> {
    if script.is_file() {
        return Ok(script.to_path_buf());
    }
    which::which(script).map_err(|_| CaptureError::ScriptNotFound(script.display().to_string()))
}

/// Capture a process run.
pub fn capture(request: &CaptureRequest) -> CaptureResult<NotebookDocument> {
    let script = locate_script(&request.script)?;
    let module = PythonModule::parse_file(&script)?;
    let function = module.function(&request.function)?;
    let bound = bind(&module, &request.function, &request.argv)?;

    let description = function
        .docstring
        .as_deref()
        .map(|doc| dedent(&doc.replace('\n', "  \n")))
        .unwrap_or_default();

    Ok(NotebookDocument {
        title: request.title.clone(),
        description,
        imports: import_lines(module.source()),
        params: bound
            .values
            .iter()
            .map(|(name, value)| format!("{} = {}", name, param_literal(value)))
            .collect(),
        sections: body_sections(&function.body),
    })
}

/// Parse the command line with the overrides embedded in the script.
///
/// Scripts without embedded overrides are tried with the default result
/// flags first, then without any.
fn bind(module: &PythonModule, function: &str, argv: &[String]) -> CaptureResult<BoundArguments> {
    if let Some(embedded) = module.constant(OVERRIDES_VARIABLE) {
        let overrides: ArgumentOverrides = serde_json::from_str(embedded)?;
        let binding = CommandBinding::from_module(module, function, &overrides)?;
        return Ok(binding.parse(argv)?);
    }

    let binding = CommandBinding::from_module(module, function, &ArgumentOverrides::default())?;
    match binding.parse(argv) {
        Ok(bound) => Ok(bound),
        Err(Error::Arguments(message)) => {
            debug!("Retrying without result flags: {}", message);
            let binding = CommandBinding::from_module(module, function, &ArgumentOverrides::empty())?;
            Ok(binding.parse(argv)?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Module level statements before the first definition.
pub fn import_lines(source: &str) -> Vec<String> {
    source
        .lines()
        .take_while(|line| {
            !(line.starts_with("def ") || line.starts_with("class ") || line.starts_with('@'))
        })
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !line.starts_with(OVERRIDES_VARIABLE))
        .map(|line| {
            if MATPLOTLIB_LINES.contains(&line) || line.starts_with("plt =") {
                format!("# {line}")
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Python literal of a parameter value; files of a pipeline work directory
/// point to the `tables` directory instead.
fn param_literal(value: &PyValue) -> String {
    let PyValue::Str(text) = value else {
        return value.py_repr();
    };
    let path = Path::new(text);
    if path.is_file()
        && let Ok(real) = fs::canonicalize(path)
        && real.to_string_lossy().find("/pipeline/work/").is_some_and(|i| i > 0)
        && let Some(name) = real.file_name()
    {
        return format!("'../tables/{}'", name.to_string_lossy());
    }
    format!("'{text}'")
}

/// Sections of a function body, up to its final `return`.
pub fn body_sections(body: &str) -> Vec<Section> {
    let body = format!("{body}\n");
    let end = regex!(r"(\sreturn\s|\sdef\s\S+\(\):)")
        .find(&body)
        .map_or(body.len(), |m| m.start());
    dedent(&body[..end])
        .split("### ")
        .skip(1)
        .filter_map(Section::parse)
        .collect()
}
