//! `nextflow.config`.

use super::Template;
use crate::pipeline::PipelineSettings;
use crate::python::PyValue;

/// Configuration document of a pipeline.
#[derive(Debug, Clone)]
pub struct ConfigTemplate<'a> {
    /// `params.<name> = <value>` assignments
    pub params: &'a [(String, PyValue)],
    /// `withName:` settings per process
    pub process_settings: &'a [(String, Vec<(String, PyValue)>)],
    pub settings: &'a PipelineSettings,
}

impl Template for ConfigTemplate<'_> {
    fn render(&self) -> String {
        let mut config = String::new();

        for (name, value) in self.params {
            config.push_str(&format!("params.{} = {}\n", name, value.groovy_literal()));
        }
        config.push('\n');

        let executor = &self.settings.executor;
        if !executor.is_empty() {
            config.push_str("\nexecutor {\n");
            if let Some(queue_size) = executor.queue_size {
                config.push_str(&format!("    queueSize = {queue_size}\n"));
            }
            if let Some(interval) = &executor.poll_interval {
                config.push_str(&format!("    pollInterval = '{interval}'\n"));
            }
            config.push_str("}\n");
        }

        // Profiles
        let cluster = &self.settings.cluster;
        config.push_str("\nprofiles {\n");
        config.push_str("    standard {\n");
        config.push_str(&format!(
            "        process.executor = '{}'\n",
            self.settings.local_executor
        ));
        config.push_str("    }\n");
        config.push_str("    cluster {\n");
        config.push_str(&format!("        process.executor = '{}'\n", cluster.executor));
        config.push_str(&format!("        process.cpus = {}\n", cluster.cpus));
        config.push_str(&format!("        process.penv = '{}'\n", cluster.penv));
        config.push_str(&format!(
            "        process.errorStrategy = '{}'\n",
            cluster.error_strategy
        ));
        config.push_str(&format!(
            "        process.clusterOptions = {{ '{}' }}\n",
            cluster.cluster_options
        ));
        config.push_str("    }\n");
        config.push_str("}\n");

        // Per-process and per-label settings
        config.push_str("process {\n");
        for (process, values) in self.process_settings {
            if values.is_empty() {
                continue;
            }
            config.push_str(&format!("    withName:{process} {{\n"));
            for (key, value) in values {
                config.push_str(&format!("        {} = {}\n", key, value.groovy_literal()));
            }
            config.push_str("    }\n");
        }
        for (label, values) in &self.settings.labels {
            config.push_str(&format!("    withLabel:{label} {{\n"));
            for (key, value) in values {
                config.push_str(&format!("        {} = {}\n", key, value.groovy_literal()));
            }
            config.push_str("    }\n");
        }
        config.push_str("}\n");

        // Container runtime
        let runtime = &self.settings.containers;
        config.push_str(&format!("{} {{\n", runtime.engine));
        config.push_str(&format!("    enabled = {}\n", runtime.enabled));
        config.push_str(&format!("    autoMounts = {}\n", runtime.auto_mounts));
        for line in &runtime.extra {
            config.push_str(&format!("    {line}\n"));
        }
        config.push_str("}\n");

        config
    }
}
