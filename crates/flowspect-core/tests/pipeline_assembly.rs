//! Integration tests for building whole pipelines.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flowspect_core::{
    Error, ImageBuilder, PipelineAssembler, PipelineManifest, PipelineSettings, PyValue, Result,
};
use tempfile::TempDir;

/// Path of the bundled hello world manifest.
fn hello_manifest() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
        .join("hello")
        .join("pipeline.toml")
}

/// Records builds instead of running singularity.
#[derive(Clone, Default)]
struct RecordingBuilder {
    builds: Rc<RefCell<Vec<String>>>,
}

impl ImageBuilder for RecordingBuilder {
    fn build(&mut self, target: &Path, reference: &str) -> Result<()> {
        fs::write(target, b"image")?;
        self.builds.borrow_mut().push(reference.to_string());
        Ok(())
    }
}

fn write_source(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(name), source).unwrap();
}

#[test]
fn test_hello_world_pipeline() {
    let manifest = PipelineManifest::load(&hello_manifest()).unwrap();
    let temp = TempDir::new().unwrap();
    let location = temp.path().join("pipeline");

    let report = PipelineAssembler::new(&location, manifest.settings.clone())
        .with_params(manifest.params())
        .assemble(&manifest.nodes())
        .unwrap();

    let main = fs::read_to_string(location.join("main.nf")).unwrap();
    assert_eq!(main.matches("process helloWorld {").count(), 1);
    assert!(main.contains("greetings = Channel.from('Bonjour', 'Ciao', 'Hello', 'Hola')"));
    assert!(main.contains("    val greeting from greetings\n"));
    assert!(main.contains("    stdout into result\n"));
    assert!(main.contains("    helloWorld.py $greeting\n"));

    let config = fs::read_to_string(location.join("nextflow.config")).unwrap();
    assert!(!config.contains("params."));
    assert!(report.params.is_empty());
    assert!(report.warnings.is_empty());

    let script = fs::read_to_string(location.join("bin/helloWorld.py")).unwrap();
    assert!(script.contains("def process(greeting: str = 'Hello'):"));
    assert!(script.contains("__version__ = '1.0'"));
}

#[test]
fn test_command_process_needs_inputs() {
    let temp = TempDir::new().unwrap();
    let text = r#"
[pipeline]
name = "shell"

[[process]]
name = "countLines"
command = "wc -l $table"
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let err = PipelineAssembler::new(temp.path().join("pipeline"), PipelineSettings::default())
        .assemble(&manifest.nodes())
        .unwrap_err();
    assert!(matches!(err, Error::MissingInputs(ref name) if name == "countLines"));
    assert!(err.with_hint().contains("hint:"));
}

#[test]
fn test_shared_container_is_built_once() {
    let temp = TempDir::new().unwrap();
    write_source(temp.path(), "a.py", "def process(x):\n    return x\n");
    write_source(temp.path(), "b.py", "def process(y):\n    return y\n");
    let text = r#"
[pipeline]
name = "containers"

[[process]]
name = "first"
source = "a.py"
container = "docker://org/tool:1.0"
arguments = {}

[[process]]
name = "second"
source = "b.py"
arguments = {}

[process.dependencies]
container = "docker://org/tool:1.0"
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let builder = RecordingBuilder::default();
    let report = PipelineAssembler::new(manifest.location(), manifest.settings.clone())
        .with_builder(Box::new(builder.clone()))
        .assemble(&manifest.nodes())
        .unwrap();

    assert_eq!(*builder.builds.borrow(), vec!["docker://org/tool:1.0"]);
    let image = manifest.location().join("org_tool_1.0.sif");
    assert_eq!(report.containers, vec![("docker://org/tool:1.0".to_string(), image.clone())]);

    let config = fs::read_to_string(report.dirs.config()).unwrap();
    let line = format!("        container = '{}'\n", image.display());
    assert_eq!(config.matches(&line).count(), 2);
}

#[test]
fn test_unrouted_parameters_become_pipeline_params() {
    let temp = TempDir::new().unwrap();
    write_source(
        temp.path(),
        "count.py",
        "def process(table, sample, *, minCount: int = 5):\n    return table\n",
    );
    let text = r#"
[pipeline]
name = "counts"

[[process]]
name = "countThings"
source = "count.py"
inchannels = ["tables"]
pretreat = ["tables = Channel.fromPath('*.tsv')"]

[process.params]
sample = "S1"

[[process.channel]]
name = "tables"
kind = "file"
nextflow = "table"
python = "table"
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let report = PipelineAssembler::new(manifest.location(), manifest.settings.clone())
        .assemble(&manifest.nodes())
        .unwrap();

    let names: Vec<&str> = report.params.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["sample", "minCount", "outFile"]);
    assert_eq!(report.params[0].1, PyValue::Str("S1".to_string()));
    assert_eq!(report.params[1].1, PyValue::Int(5));

    let main = fs::read_to_string(report.dirs.main_nf()).unwrap();
    assert!(main.contains("    val sample from params.sample\n"));
    assert!(main.contains("    val minCount from params.minCount\n"));
    assert!(main.contains("    val outFile into outFile\n"));
    assert_eq!(main.matches("$minCount").count(), 1);

    let config = fs::read_to_string(report.dirs.config()).unwrap();
    assert!(config.contains("params.sample = 'S1'\n"));
    assert!(config.contains("params.minCount = 5\n"));
}

#[test]
fn test_unequal_tuple_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_source(temp.path(), "pair.py", "def process(a, b):\n    return a\n");
    let text = r#"
[pipeline]
name = "pairs"

[[process]]
name = "pairs"
source = "pair.py"
inchannels = ["pairs"]

[[process.channel]]
name = "pairs"
kind = "tuple"
nextflow = ["val(a)", "val(b)"]
python = ["a"]
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let err = PipelineAssembler::new(manifest.location(), manifest.settings.clone())
        .assemble(&manifest.nodes())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidChannel { .. }));
}

#[test]
fn test_generated_command_line_parses() {
    let Ok(python) = which::which("python3") else {
        eprintln!("python3 not on PATH, skipping");
        return;
    };
    let temp = TempDir::new().unwrap();
    write_source(
        temp.path(),
        "count.py",
        "def process(table, *, sizes: list = ['a']):\n    with open('seen.txt', 'w') as out:\n        out.write(table + '|' + ','.join(sizes))\n",
    );
    let text = r#"
[pipeline]
name = "counts"

[[process]]
name = "countThings"
source = "count.py"
inchannels = ["tables"]
arguments = {}

[[process.channel]]
name = "tables"
kind = "file"
nextflow = "table"
python = "table"
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let report = PipelineAssembler::new(manifest.location(), manifest.settings.clone())
        .assemble(&manifest.nodes())
        .unwrap();

    let main = fs::read_to_string(report.dirs.main_nf()).unwrap();
    let line = main
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("countThings.py "))
        .unwrap();
    assert_eq!(line, "countThings.py $table --sizes=$sizes");

    let args: Vec<String> = line
        .split_whitespace()
        .skip(1)
        .map(|word| word.replace("$table", "t.tsv").replace("$sizes", "x,y"))
        .collect();
    let status = std::process::Command::new(python)
        .arg(report.dirs.script("countThings"))
        .args(&args)
        .current_dir(temp.path())
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(temp.path().join("seen.txt")).unwrap(), "t.tsv|x,y");
}

#[test]
fn test_later_process_sets_shared_param() {
    let temp = TempDir::new().unwrap();
    write_source(temp.path(), "a.py", "def process(x, *, limit: int = 1):\n    return x\n");
    write_source(temp.path(), "b.py", "def process(y, *, limit: int = 2):\n    return y\n");
    let text = r#"
[pipeline]
name = "shared"

[[process]]
name = "first"
source = "a.py"
arguments = {}

[[process]]
name = "second"
source = "b.py"
arguments = {}
"#;
    let manifest = PipelineManifest::parse(text, temp.path()).unwrap();
    let report = PipelineAssembler::new(manifest.location(), manifest.settings.clone())
        .assemble(&manifest.nodes())
        .unwrap();

    let limits: Vec<&PyValue> = report
        .params
        .iter()
        .filter(|(name, _)| name == "limit")
        .map(|(_, value)| value)
        .collect();
    assert_eq!(limits, vec![&PyValue::Int(2)]);
}
