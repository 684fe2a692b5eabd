//! Nextflow process blocks and `main.nf`.

use super::Template;
use crate::python::dedent;

const DATE_HELPER: &str = "import java.text.SimpleDateFormat\ndef date = new Date()\ndef sdf = new SimpleDateFormat(\"dd/MM/yyyy\")\n";

/// One `process <name> { ... }` block with its leading statements.
#[derive(Debug, Clone, Default)]
pub struct ProcessTemplate<'a> {
    pub name: &'a str,
    /// Description rendered as a comment above the block
    pub doc: &'a str,
    /// Channel statements placed before the block; each chain is joined by `.`
    pub pretreat: &'a [Vec<String>],
    /// `directive value` lines
    pub directives: &'a [(String, String)],
    pub inputs: &'a [String],
    pub outputs: &'a [String],
    pub command: &'a str,
}

impl Template for ProcessTemplate<'_> {
    fn render(&self) -> String {
        let mut block = String::new();

        let doc = dedent(self.doc.trim_end());
        let doc = doc.trim_matches('\n');
        if !doc.is_empty() {
            block.push_str("/*\n");
            for line in doc.lines() {
                if line.is_empty() {
                    block.push_str(" *\n");
                } else {
                    block.push_str(&format!(" * {line}\n"));
                }
            }
            block.push_str(" */\n");
        }

        for chain in self.pretreat {
            block.push_str(&chain.join("\n    ."));
            block.push('\n');
        }
        if !self.pretreat.is_empty() {
            block.push('\n');
        }

        block.push_str(&format!("process {} {{\n", self.name));
        if !self.directives.is_empty() {
            for (directive, value) in self.directives {
                block.push_str(&format!("    {directive} {value}\n"));
            }
            block.push('\n');
        }

        block.push_str("    input:\n");
        for line in self.inputs {
            block.push_str(&format!("    {line}\n"));
        }
        block.push_str("\n    output:\n");
        for line in self.outputs {
            block.push_str(&format!("    {line}\n"));
        }

        block.push_str("\n    \"\"\"\n");
        for line in self.command.lines() {
            block.push_str(&format!("    {line}\n"));
        }
        block.push_str("    \"\"\"\n}\n\n");
        block
    }
}

/// The pipeline script: preamble plus every process block.
#[derive(Debug, Clone, Default)]
pub struct MainTemplate<'a> {
    pub blocks: &'a [String],
}

impl Template for MainTemplate<'_> {
    fn render(&self) -> String {
        let mut main = String::from("#!/usr/bin/env nextflow\n\n");
        main.push_str(DATE_HELPER);
        main.push_str("\n\n");
        for block in self.blocks {
            main.push_str(block);
        }
        main
    }
}
