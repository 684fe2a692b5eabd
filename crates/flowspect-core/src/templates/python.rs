//! Executable Python script of a process.

use std::path::Path;

use super::Template;
use crate::binder::{ArgumentSpec, CommandBinding, OVERRIDES_VARIABLE, ValueKind};
use crate::python::PyValue;
use crate::python::py_str_list;

/// Helpers shared by every generated script.
const SUPPORT: &str = r#"
class _ExtendAction(argparse.Action):
    """Accumulate repeated and comma separated values into one list."""

    def __call__(self, parser, namespace, values, option_string=None):
        items = getattr(namespace, self.dest, None)
        if not isinstance(items, list) or items is self.default:
            items = []
        for v in values:
            items += v
        setattr(namespace, self.dest, items)


def _split(s):
    return s.split(',')


def _int_split(s):
    out = []
    for e in s.split(','):
        try:
            out.append(int(e))
        except ValueError:
            out.append(0)
    return out


def _float_split(s):
    out = []
    for e in s.split(','):
        try:
            out.append(float(e))
        except ValueError:
            out.append(0.0)
    return out


_IMAGE_FORMATS = ('png', 'pdf', 'svg', 'jpg', 'jpeg', 'eps', 'ps', 'pgf', 'tif', 'tiff')


def _encode(value, destination=None):
    try:
        import pandas as pd
        if isinstance(value, pd.DataFrame):
            return {'__table__': {
                'index': [str(i) for i in value.index],
                'columns': [str(c) for c in value.columns],
                'data': json.loads(value.to_json(orient='values')),
            }}
    except ImportError:
        pass
    figure = value if hasattr(value, 'savefig') else getattr(value, 'figure', None)
    if figure is not None and hasattr(figure, 'savefig'):
        import base64, io
        fmt = 'png'
        if destination is not None and destination.split('.')[-1] in _IMAGE_FORMATS:
            fmt = destination.split('.')[-1]
        buffer = io.BytesIO()
        figure.savefig(buffer, format=fmt)
        return {'__plot__': {'format': fmt, 'data': base64.b64encode(buffer.getvalue()).decode('ascii')}}
    if isinstance(value, dict):
        return {str(k): _encode(v) for k, v in value.items()}
    if isinstance(value, (list, tuple, set)):
        return [_encode(v) for v in value]
    if hasattr(value, 'tolist'):
        return _encode(value.tolist())
    if value is None or isinstance(value, (str, int, float, bool)):
        return value
    return str(value)
"#;

/// Script wrapping one Python function behind a generated command line.
#[derive(Debug, Clone)]
pub struct ScriptTemplate<'a> {
    /// Directory appended to `sys.path`
    pub packages_dir: &'a Path,
    /// Module and dependency import statements
    pub imports: &'a [String],
    /// Sources of helper functions defined next to the function
    pub helpers: &'a [String],
    /// Dedented source of the function, without `self`
    pub function_source: &'a str,
    pub binding: &'a CommandBinding,
    /// Argument overrides as JSON, embedded for the capture renderer
    pub overrides: Option<&'a str>,
    /// Command the encoded results are piped to, e.g. `flowspect save`
    pub save_command: &'a [String],
}

impl Template for ScriptTemplate<'_> {
    fn render(&self) -> String {
        let mut script = String::new();

        script.push_str("#!/usr/bin/env python\n");
        script.push_str("# -*- coding: utf-8 -*-\n\n");
        script.push_str("import sys\n");
        script.push_str(&format!(
            "sys.path.append({})\n\n",
            py_str(&self.packages_dir.display().to_string())
        ));
        script.push_str("import argparse, json, subprocess\n");
        for import in self.imports {
            script.push_str(import);
            script.push('\n');
        }
        script.push('\n');

        if let Some(version) = &self.binding.version {
            script.push_str(&format!("__version__ = {}\n\n", py_str(version)));
        }
        if let Some(overrides) = self.overrides {
            script.push_str(&format!("{OVERRIDES_VARIABLE} = {}\n\n", py_str(overrides)));
        }

        for helper in self.helpers {
            script.push('\n');
            script.push_str(helper.trim_end());
            script.push_str("\n\n");
        }
        script.push('\n');
        script.push_str(self.function_source.trim_end());
        script.push_str("\n\n");
        script.push_str(SUPPORT);
        script.push_str("\n\n");
        script.push_str(&self.render_main());
        script
    }
}

impl ScriptTemplate<'_> {
    fn render_main(&self) -> String {
        let binding = self.binding;
        let mut main = String::from("def main():\n");

        main.push_str(&format!(
            "    parser = argparse.ArgumentParser(description={}, formatter_class=argparse.RawTextHelpFormatter)\n",
            py_str(&binding.description)
        ));
        main.push_str("    parser.register('action', 'exappend', _ExtendAction)\n");
        if binding.version.is_some() {
            main.push_str(
                "    parser.add_argument('-version', '--version', action='version', version=__version__, help='Displays script version if supplied')\n",
            );
        }
        main.push_str(&format!(
            "    parser.add_argument('-i', '--inspect', action='version', version={}, help='Shows what functions are defined')\n",
            py_str(&binding.inspect_doc)
        ));
        main.push_str(
            "    parser.add_argument('-p', '--peek', dest='displayMax', help='Peek into the results by printing or saving the first N lines only')\n",
        );
        for spec in &binding.arguments {
            main.push_str(&format!("    parser.add_argument({})\n", add_argument(spec)));
        }

        // Call
        let mut call_args = Vec::new();
        let mut call_kwargs = Vec::new();
        for spec in binding.inputs() {
            let value = format!("args.{}", spec.dest);
            if spec.keyword {
                call_kwargs.push(format!("{}={}", spec.param, value));
            } else {
                call_args.push(value);
            }
        }
        if binding.var_args.is_some() {
            main.push_str("    args, rest = parser.parse_known_args()\n");
            call_args.push("*rest".to_string());
        } else {
            main.push_str("    args = parser.parse_args()\n");
        }
        call_args.extend(call_kwargs);
        main.push_str(&format!(
            "    results = {}({})\n",
            binding.function,
            call_args.join(", ")
        ));
        main.push_str("    if results is None:\n        return\n");

        // Save
        let outputs: Vec<String> = binding
            .outputs
            .iter()
            .map(|o| o.as_deref().map_or_else(|| "None".to_string(), py_str))
            .collect();
        main.push_str(&format!("    outputs = [{}]\n", outputs.join(", ")));
        if binding.outputs.len() > 1 {
            main.push_str("    values = list(results)\n");
        } else {
            main.push_str("    values = [results]\n");
        }
        main.push_str("    payload = []\n");
        main.push_str("    for i, value in enumerate(values):\n");
        main.push_str(
            "        destination = getattr(args, outputs[i]) if i < len(outputs) and outputs[i] else None\n",
        );
        main.push_str(
            "        payload.append({'destination': destination, 'value': _encode(value, destination)})\n",
        );
        main.push_str(&format!("    command = {}\n", py_str_list(self.save_command)));
        main.push_str("    if args.displayMax:\n");
        main.push_str("        command += ['--peek', args.displayMax]\n");
        main.push_str("    subprocess.run(command, input=json.dumps(payload), text=True, check=True)\n");
        main.push_str("    return\n\n\n");
        main.push_str("if __name__ == '__main__':\n    main()\n");
        main
    }
}

/// Arguments of one `parser.add_argument(...)` call.
fn add_argument(spec: &ArgumentSpec) -> String {
    let mut parts: Vec<String> = Vec::new();

    if spec.is_positional() {
        parts.push(py_str(&spec.dest));
    } else {
        parts.extend(spec.flags.iter().map(|f| py_str(f)));
        parts.push(format!("dest={}", py_str(&spec.dest)));
    }

    match spec.kind {
        ValueKind::Str => {}
        ValueKind::Int => parts.push("type=int".to_string()),
        ValueKind::Float => parts.push("type=float".to_string()),
        ValueKind::List | ValueKind::StrList => parts.push("type=_split".to_string()),
        ValueKind::IntList => parts.push("type=_int_split".to_string()),
        ValueKind::FloatList => parts.push("type=_float_split".to_string()),
    }

    if let Some(nargs) = &spec.nargs {
        parts.push(format!("nargs={}", nargs_literal(nargs)));
    } else if spec.kind.is_list() {
        parts.push("nargs='*'".to_string());
    }
    if spec.kind.is_list() {
        parts.push("action='exappend'".to_string());
    }

    if !spec.is_positional()
        && let Some(default) = &spec.default
    {
        parts.push(format!("default={}", default.py_repr()));
    }
    parts.push(format!("help={}", py_str(&spec.help)));
    parts.join(", ")
}

fn nargs_literal(nargs: &str) -> String {
    match nargs.parse::<u32>() {
        Ok(n) => n.to_string(),
        Err(_) => py_str(nargs),
    }
}

fn py_str(s: &str) -> String {
    PyValue::Str(s.to_string()).py_repr()
}
