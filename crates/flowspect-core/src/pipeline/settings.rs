//! Pipeline-wide settings.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::python::PyValue;

/// Settings of a generated pipeline, read from the `[settings]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// `executor { }` overrides
    pub executor: ExecutorSettings,
    /// Executor of the `standard` profile
    pub local_executor: String,
    /// The `cluster` profile
    pub cluster: ClusterProfile,
    /// Container runtime block
    pub containers: ContainerRuntime,
    /// `withLabel:` settings by label
    pub labels: BTreeMap<String, BTreeMap<String, PyValue>>,
    /// Command generated scripts pipe their results to (`<tool> save`)
    pub tool: String,
    /// Capture renderer executable, relative to the pipeline `bin/`
    pub capture_program: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            executor: ExecutorSettings::default(),
            local_executor: "local".to_string(),
            cluster: ClusterProfile::default(),
            containers: ContainerRuntime::default(),
            labels: BTreeMap::new(),
            tool: "flowspect".to_string(),
            capture_program: "captureIntoNotebook.py".to_string(),
        }
    }
}

impl PipelineSettings {
    /// The save command as program and arguments.
    pub fn save_command(&self) -> Vec<String> {
        self.tool
            .split_whitespace()
            .map(str::to_string)
            .chain(std::iter::once("save".to_string()))
            .collect()
    }
}

/// Scheduler polling overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSettings {
    pub queue_size: Option<u32>,
    pub poll_interval: Option<String>,
}

impl ExecutorSettings {
    pub fn is_empty(&self) -> bool {
        self.queue_size.is_none() && self.poll_interval.is_none()
    }
}

/// Settings of the `cluster` execution profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterProfile {
    pub executor: String,
    pub cpus: u32,
    pub penv: String,
    pub error_strategy: String,
    pub cluster_options: String,
}

impl Default for ClusterProfile {
    fn default() -> Self {
        Self {
            executor: "sge".to_string(),
            cpus: 1,
            penv: "smp".to_string(),
            error_strategy: "retry".to_string(),
            cluster_options: "-V -S /bin/bash -q all.q@apollo-*".to_string(),
        }
    }
}

/// Container runtime configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerRuntime {
    /// Runtime scope name in the config (`singularity`, `docker`...)
    pub engine: String,
    pub enabled: bool,
    pub auto_mounts: bool,
    /// Extra raw lines inside the block
    pub extra: Vec<String>,
}

impl Default for ContainerRuntime {
    fn default() -> Self {
        Self {
            engine: "singularity".to_string(),
            enabled: true,
            auto_mounts: true,
            extra: Vec::new(),
        }
    }
}
