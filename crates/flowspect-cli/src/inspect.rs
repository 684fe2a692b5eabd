//! Inspect command implementation.
//!
//! Prints the command line a Python function would be exposed with and the
//! flag table the channel compiler routes parameters through.

use std::path::Path;

use flowspect_core::binder::ArgRole;
use flowspect_core::{ArgumentOverrides, CommandBinding, PythonModule};

use crate::colors;

pub fn execute(script: &str, function: &str, doc: bool) -> anyhow::Result<()> {
    let path = Path::new(script);
    if !path.is_file() {
        anyhow::bail!("Script not found: {}", script);
    }

    let module = PythonModule::parse_file(path)?;
    let binding = CommandBinding::from_module(&module, function, &ArgumentOverrides::default())?;

    println!("{}{}{}", colors::BOLD, binding.function, colors::RESET);
    if let Some(version) = &binding.version {
        println!("version {version}");
    }
    if !binding.description.is_empty() {
        println!("\n{}", binding.description.trim_end());
    }

    println!("\n{}Arguments{}", colors::BOLD, colors::RESET);
    for argument in &binding.arguments {
        let name = if argument.is_positional() {
            argument.dest.clone()
        } else {
            argument.flags.join(", ")
        };
        let role = match argument.role {
            ArgRole::Input => "input".to_string(),
            ArgRole::Output(n) => format!("result {n}"),
        };
        let default = argument
            .default
            .as_ref()
            .map(|value| format!(" = {}", value.py_repr()))
            .unwrap_or_default();
        println!(
            "  {:<24} {}{:?}{}{} [{}]",
            name,
            colors::DIM,
            argument.kind,
            default,
            colors::RESET,
            role
        );
        if !argument.help.is_empty() {
            println!("  {:<24} {}", "", argument.help);
        }
    }

    println!("\n{}Flag table{}", colors::BOLD, colors::RESET);
    for (param, spelling) in binding.flag_table.inputs() {
        println!("  {param:<24} '{spelling}'");
    }
    for (param, spelling) in binding.flag_table.outputs() {
        println!("  {param:<24} '{spelling}' (output)");
    }

    if doc {
        println!("\n{}", binding.inspect_doc);
    }
    Ok(())
}
