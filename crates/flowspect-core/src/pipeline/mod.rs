//! Pipeline assembly.
//!
//! Compiles process nodes in order and writes one runnable pipeline:
//! `main.nf`, `nextflow.config`, the per-process scripts in `bin/` and the
//! packages they import.

mod graph;
mod settings;

pub use graph::{ChannelGraph, ChannelWarning, assigned_channels};
pub use settings::{ClusterProfile, ContainerRuntime, ExecutorSettings, PipelineSettings};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::container::{ContainerCache, ImageBuilder, SingularityBuilder, resolve_container};
use crate::error::Result;
use crate::paths::{PipelineDirs, write_executable};
use crate::process::ProcessNode;
use crate::python::PyValue;
use crate::templates::{ConfigTemplate, MainTemplate, Template};

/// What an assembly produced.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub dirs: PipelineDirs,
    /// Process names in pipeline order
    pub processes: Vec<String>,
    /// Generated process scripts
    pub scripts: Vec<PathBuf>,
    /// Every `params.*` entry of the config, in emission order
    pub params: Vec<(String, PyValue)>,
    /// Container reference and local image, per distinct reference
    pub containers: Vec<(String, PathBuf)>,
    pub warnings: Vec<ChannelWarning>,
}

/// Builds a pipeline directory from process nodes.
pub struct PipelineAssembler {
    location: PathBuf,
    settings: PipelineSettings,
    params: Vec<(String, PyValue)>,
    builder: Box<dyn ImageBuilder>,
}

impl PipelineAssembler {
    pub fn new(location: impl Into<PathBuf>, settings: PipelineSettings) -> Self {
        Self {
            location: location.into(),
            settings,
            params: Vec::new(),
            builder: Box::new(SingularityBuilder::new()),
        }
    }

    /// Pipeline parameters set by the caller. They win over process defaults.
    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, PyValue)>) -> Self {
        self.params.extend(params);
        self
    }

    /// Use another image builder than `singularity`.
    pub fn with_builder(mut self, builder: Box<dyn ImageBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Compile every node and write the pipeline.
    pub fn assemble(mut self, nodes: &[ProcessNode]) -> Result<AssemblyReport> {
        let dirs = PipelineDirs::create(&self.location)?;
        self.write_capture_shim(&dirs)?;

        let warnings = ChannelGraph::new(nodes).check();

        let mut cache = ContainerCache::new();
        let mut containers = Vec::new();
        let mut blocks = Vec::with_capacity(nodes.len());
        let mut process_settings = Vec::with_capacity(nodes.len());
        let mut scripts = Vec::new();
        let mut params = self.params.clone();

        for node in nodes {
            info!("Adding process {} to the pipeline", node.name);
            let compiled = node.compile(&dirs, &self.settings)?;

            // Manifest values stand; among processes the later one wins.
            for (name, value) in compiled.pipeline_params {
                match params.iter().position(|(existing, _)| *existing == name) {
                    Some(index) if index < self.params.len() => {
                        debug!("Pipeline parameter '{}' set by the manifest", name);
                    }
                    Some(index) => {
                        debug!("Pipeline parameter '{}' reset by {}", name, node.name);
                        params[index].1 = value;
                    }
                    None => params.push((name, value)),
                }
            }

            let mut settings = compiled.settings;
            if let Some(reference) = &compiled.container {
                let image =
                    resolve_container(reference, &dirs.root, &mut cache, self.builder.as_mut())?;
                if !containers.iter().any(|(r, _)| r == reference) {
                    containers.push((reference.clone(), image.clone()));
                }
                settings.push((
                    "container".to_string(),
                    PyValue::Str(image.display().to_string()),
                ));
            }

            blocks.push(compiled.block);
            process_settings.push((compiled.name, settings));
            scripts.extend(compiled.script);
        }

        let main = MainTemplate { blocks: &blocks }.render();
        std::fs::write(dirs.main_nf(), main)?;

        let config = ConfigTemplate {
            params: &params,
            process_settings: &process_settings,
            settings: &self.settings,
        }
        .render();
        std::fs::write(dirs.config(), config)?;
        info!("Pipeline written to {}", dirs.root.display());

        Ok(AssemblyReport {
            dirs,
            processes: nodes.iter().map(|n| n.name.clone()).collect(),
            scripts,
            params,
            containers,
            warnings,
        })
    }

    /// `bin/<capture program>`: forwards to `<tool> capture`.
    fn write_capture_shim(&self, dirs: &PipelineDirs) -> Result<()> {
        let shim = format!(
            "#!/bin/sh\nexec {} capture \"$@\"\n",
            self.settings.tool
        );
        write_executable(&dirs.bin_dir.join(&self.settings.capture_program), &shim)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::binder::ArgumentOverrides;
    use crate::channel::ChannelSpec;

    #[test]
    fn test_params_merge_manifest_first() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("count.py");
        fs::write(&source, "def process(table, *, minCount: int = 5):\n    return table\n").unwrap();

        let mut node = ProcessNode::new("countThings", &source);
        node.arguments = Some(ArgumentOverrides::empty());
        node.inchannels = vec!["tables".to_string()];
        node.channels = vec![ChannelSpec::new("tables", "file", "table", Some("table"))];

        let report = PipelineAssembler::new(temp.path().join("pipeline"), PipelineSettings::default())
            .with_params([("minCount".to_string(), PyValue::Int(10))])
            .assemble(&[node])
            .unwrap();

        assert_eq!(report.params, vec![("minCount".to_string(), PyValue::Int(10))]);
        let config = fs::read_to_string(report.dirs.config()).unwrap();
        assert!(config.starts_with("params.minCount = 10\n"));
        assert_eq!(report.processes, vec!["countThings"]);
        assert!(report.dirs.bin_dir.join("captureIntoNotebook.py").exists());
    }
}
