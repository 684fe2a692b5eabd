//! Pipeline manifests (`pipeline.toml`).
//!
//! ```toml
//! [pipeline]
//! name = "hello"
//!
//! [[process]]
//! name = "helloWorld"
//! source = "hello.py"
//! inchannels = ["greetings"]
//! pretreat = ["greetings = Channel.from('Bonjour', 'Ciao', 'Hello', 'Hola')"]
//!
//! [[process.channel]]
//! name = "greetings"
//! kind = "val"
//! nextflow = "greeting"
//! python = "greeting"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::channel::ChannelSpec;
use crate::error::{Error, Result};
use crate::pipeline::PipelineSettings;
use crate::process::ProcessNode;
use crate::python::PyValue;

/// The `[pipeline]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    pub name: String,
    /// Output directory; `pipeline/` next to the manifest by default
    #[serde(default)]
    pub location: Option<PathBuf>,
}

/// A parsed pipeline manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineManifest {
    pub pipeline: PipelineSection,
    /// Pipeline parameters, overriding process defaults
    #[serde(default)]
    pub params: BTreeMap<String, PyValue>,
    #[serde(default)]
    pub settings: PipelineSettings,
    #[serde(default)]
    pub process: Vec<ProcessNode>,
    /// Channel specifications shared by every process
    #[serde(default)]
    pub channel: Vec<ChannelSpec>,
    /// Directory of the manifest file
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PipelineManifest {
    /// Load a manifest and resolve its paths against the manifest directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, &base_dir)
    }

    /// Parse manifest text whose relative paths start at `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: Self = toml::from_str(text)?;
        manifest.base_dir = base_dir.to_path_buf();
        manifest.validate()?;

        for node in &mut manifest.process {
            if let Some(source) = &node.source {
                node.source = Some(manifest.base_dir.join(source));
            }
            for package in &mut node.dependencies.inhouse_packages {
                *package = manifest.base_dir.join(&*package);
            }
        }
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for node in &self.process {
            if !seen.insert(node.name.as_str()) {
                return Err(Error::Manifest(format!(
                    "process '{}' is declared twice",
                    node.name
                )));
            }
            if node.source.is_none() && node.command.is_none() {
                return Err(Error::Manifest(format!(
                    "process '{}' needs either `source` or `command`",
                    node.name
                )));
            }
        }
        Ok(())
    }

    /// Where the pipeline is written.
    pub fn location(&self) -> PathBuf {
        match &self.pipeline.location {
            Some(location) => self.base_dir.join(location),
            None => self.base_dir.join("pipeline"),
        }
    }

    /// Process nodes with the shared channels they do not redefine.
    pub fn nodes(&self) -> Vec<ProcessNode> {
        self.process
            .iter()
            .map(|node| {
                let mut node = node.clone();
                for shared in &self.channel {
                    if !node.channels.iter().any(|own| own.name == shared.name) {
                        node.channels.push(shared.clone());
                    }
                }
                node
            })
            .collect()
    }

    /// Manifest parameters in config order.
    pub fn params(&self) -> Vec<(String, PyValue)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
