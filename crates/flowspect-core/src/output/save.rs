//! Writing results to their destinations.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::render::{Peek, render_text};
use super::value::{ResultEntry, ResultValue};
use crate::error::Result;

/// Outcome of saving a batch of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    /// Files written, in result order
    pub written: Vec<PathBuf>,
    /// Indices of results with no way to save them
    pub skipped: Vec<usize>,
}

/// Save every result: files for results with a destination, `out` otherwise.
pub fn save_results<W: Write>(
    entries: &[ResultEntry],
    peek: Option<Peek>,
    out: &mut W,
) -> Result<SaveReport> {
    let mut report = SaveReport::default();

    for (index, entry) in entries.iter().enumerate() {
        let destination = entry.destination.as_deref();

        if let Some(path) = destination.filter(|p| is_json(p)) {
            fs::write(path, serde_json::to_string(&entry.raw)?)?;
            report.written.push(path.to_path_buf());
            continue;
        }

        match &entry.value {
            ResultValue::Plot(plot) => match destination {
                None => writeln!(out, "Figure cannot be displayed")?,
                Some(path) => {
                    let path = plot_path(path, &plot.format);
                    fs::write(&path, &plot.data)?;
                    report.written.push(path);
                }
            },
            ResultValue::Table(table) => {
                let table = match peek.and_then(|p| p.rows) {
                    Some(rows) => table.peek(rows),
                    None => table.clone(),
                };
                emit(&table.to_tsv(), destination, out, &mut report)?;
            }
            value => match render_text(value) {
                Ok(text) => {
                    let text = match peek {
                        Some(peek) => peek.apply(&text),
                        None => text,
                    };
                    emit(&text, destination, out, &mut report)?;
                }
                Err(unsupported) => {
                    warn!(
                        "No built-in method to save result [{}] of type {}",
                        index, unsupported.type_name
                    );
                    report.skipped.push(index);
                }
            },
        }
    }
    Ok(report)
}

fn emit<W: Write>(
    text: &str,
    destination: Option<&Path>,
    out: &mut W,
    report: &mut SaveReport,
) -> Result<()> {
    match destination {
        None => out.write_all(text.as_bytes())?,
        Some(path) => {
            debug!("Writing {}", path.display());
            fs::write(path, text)?;
            report.written.push(path.to_path_buf());
        }
    }
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Figure file: the destination when its extension is the figure format,
/// `<destination>.<format>` otherwise.
pub fn plot_path(destination: &Path, format: &str) -> PathBuf {
    let matches = destination
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(format));
    if matches {
        return destination.to_path_buf();
    }
    let mut name = OsString::from(destination.as_os_str());
    name.push(".");
    name.push(format);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::output::decode_payload;

    fn run(payload: &str, peek: Option<Peek>) -> (SaveReport, String) {
        let entries = decode_payload(payload).unwrap();
        let mut out = Vec::new();
        let report = save_results(&entries, peek, &mut out).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_stdout() {
        let (report, out) = run(
            r#"[{"destination": null, "value": {"a": 1, "b": 2}},
                {"destination": null, "value": {"__plot__": {"format": "png", "data": ""}}}]"#,
            None,
        );
        assert_eq!(out, "a\t1\nb\t2\nFigure cannot be displayed\n");
        assert!(report.written.is_empty());
    }

    #[test]
    fn test_files() {
        let temp = tempfile::tempdir().unwrap();
        let text = temp.path().join("out.txt");
        let raw = temp.path().join("out.json");
        let figure = temp.path().join("fig.pdf");
        let payload = json!([
            {"destination": text, "value": ["x", "y"]},
            {"destination": raw, "value": {"k": [1, 2]}},
            {"destination": figure, "value": {"__plot__": {"format": "png", "data": "aGk="}}}
        ])
        .to_string();

        let (report, out) = run(&payload, None);
        assert!(out.is_empty());
        assert_eq!(fs::read_to_string(&text).unwrap(), "x\ny\n");
        assert_eq!(fs::read_to_string(&raw).unwrap(), r#"{"k":[1,2]}"#);
        assert_eq!(fs::read(temp.path().join("fig.pdf.png")).unwrap(), b"hi");
        assert_eq!(report.written.len(), 3);
    }

    #[test]
    fn test_unsupported_is_skipped() {
        let (report, out) = run(
            r#"[{"destination": null, "value": [{"__plot__": {"format": "png", "data": ""}}]},
                {"destination": null, "value": "after"}]"#,
            None,
        );
        assert_eq!(report.skipped, vec![0]);
        assert_eq!(out, "after\n");
    }

    #[test]
    fn test_peek_table_and_text() {
        let payload = r#"[
            {"destination": null, "value": {"__table__": {"index": [0, 1, 2], "columns": ["v"], "data": [[1], [2], [3]]}}},
            {"destination": null, "value": [1, 2, 3]}
        ]"#;
        let (_, out) = run(payload, Some(Peek { rows: Some(1), chars: None }));
        assert_eq!(out, "\tv\n0\t1\n1\n");
    }

    #[test]
    fn test_plot_path() {
        assert_eq!(plot_path(Path::new("a/fig.PNG"), "png"), PathBuf::from("a/fig.PNG"));
        assert_eq!(plot_path(Path::new("fig"), "svg"), PathBuf::from("fig.svg"));
    }
}
