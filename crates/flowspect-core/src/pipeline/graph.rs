//! Channel flow between processes.

use std::fmt;

use lazy_regex::regex;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::process::ProcessNode;

/// A suspicious channel layout. None of these stop the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelWarning {
    /// A DSL1 channel can only be consumed once.
    MultipleConsumers {
        channel: String,
        processes: Vec<String>,
    },
    /// No process or statement produces the channel.
    NotProduced { channel: String, process: String },
    /// Processes feed each other in a loop.
    Cycle { processes: Vec<String> },
}

impl fmt::Display for ChannelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleConsumers { channel, processes } => write!(
                f,
                "Channel '{}' is consumed by several processes: {}",
                channel,
                processes.join(", ")
            ),
            Self::NotProduced { channel, process } => write!(
                f,
                "Channel '{channel}' consumed by {process} is never produced"
            ),
            Self::Cycle { processes } => write!(
                f,
                "Processes form a cycle: {} → {}",
                processes.join(" → "),
                processes[0]
            ),
        }
    }
}

/// Processes as nodes, channels as producer → consumer edges.
#[derive(Debug, Default)]
pub struct ChannelGraph {
    graph: DiGraph<String, String>,
    /// Channel name to producing processes
    producers: FxHashMap<String, Vec<NodeIndex>>,
    /// Channels created outside any process (pretreat statements, params)
    external: FxHashSet<String>,
    /// Channel name to consuming processes, in first-seen order
    consumers: Vec<(String, Vec<NodeIndex>)>,
}

impl ChannelGraph {
    pub fn new(nodes: &[ProcessNode]) -> Self {
        let mut graph = Self::default();
        let indices: Vec<NodeIndex> = nodes
            .iter()
            .map(|node| graph.graph.add_node(node.name.clone()))
            .collect();

        for (node, &index) in nodes.iter().zip(&indices) {
            for channel in &node.outchannels {
                graph.producers.entry(channel.clone()).or_default().push(index);
            }
            for statement in &node.pretreat {
                graph.external.extend(assigned_channels(&statement.text()));
            }
            for spec in node.channels.iter().filter(|c| c.from_params) {
                graph.external.extend(spec.name.names().into_iter().map(str::to_string));
            }
            for channel in &node.inchannels {
                match graph.consumers.iter_mut().find(|(c, _)| c == channel) {
                    Some((_, consumers)) => consumers.push(index),
                    None => graph.consumers.push((channel.clone(), vec![index])),
                }
            }
        }

        let mut edges = Vec::new();
        for (channel, consumers) in &graph.consumers {
            for producer in graph.producers.get(channel).into_iter().flatten() {
                for consumer in consumers {
                    edges.push((*producer, *consumer, channel.clone()));
                }
            }
        }
        for (producer, consumer, channel) in edges {
            graph.graph.add_edge(producer, consumer, channel);
        }
        graph
    }

    pub fn process_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check the layout and log every finding.
    pub fn check(&self) -> Vec<ChannelWarning> {
        use petgraph::algo::kosaraju_scc;

        let mut warnings = Vec::new();
        for (channel, consumers) in &self.consumers {
            if consumers.len() > 1 {
                warnings.push(ChannelWarning::MultipleConsumers {
                    channel: channel.clone(),
                    processes: consumers.iter().map(|&i| self.graph[i].clone()).collect(),
                });
            }
            if !self.producers.contains_key(channel) && !self.external.contains(channel) {
                for &consumer in consumers {
                    warnings.push(ChannelWarning::NotProduced {
                        channel: channel.clone(),
                        process: self.graph[consumer].clone(),
                    });
                }
            }
        }

        for scc in kosaraju_scc(&self.graph) {
            let looped = scc.len() > 1
                || scc.first().is_some_and(|&n| self.graph.contains_edge(n, n));
            if looped {
                let mut processes: Vec<String> =
                    scc.iter().map(|&i| self.graph[i].clone()).collect();
                processes.sort();
                warnings.push(ChannelWarning::Cycle { processes });
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        warnings
    }
}

/// Channel names a statement creates: `x = ...`, `.into { a; b }`, `.set { x }`.
pub fn assigned_channels(statement: &str) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(caps) = regex!(r"^\s*(?:def\s+)?(\w+)\s*=[^=]").captures(statement) {
        names.push(caps[1].to_string());
    }
    for caps in regex!(r"\.(?:into|set)\s*\{([^}]*)\}").captures_iter(statement) {
        names.extend(
            caps[1]
                .split(';')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        );
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Statement;

    fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> ProcessNode {
        let mut node = ProcessNode::new(name, format!("{name}.py"));
        node.inchannels = inputs.iter().map(|s| s.to_string()).collect();
        node.outchannels = outputs.iter().map(|s| s.to_string()).collect();
        node
    }

    #[test]
    fn test_assigned_channels() {
        assert_eq!(
            assigned_channels("greetings = Channel.from('a', 'b')"),
            vec!["greetings"]
        );
        assert_eq!(
            assigned_channels("Channel.fromPath(params.x).into{ a; b }"),
            vec!["a", "b"]
        );
        assert!(assigned_channels("x == y").is_empty());
    }

    #[test]
    fn test_linear_pipeline_is_clean() {
        let mut first = node("first", &["raw"], &["tables"]);
        first.pretreat = vec![Statement::Line("raw = Channel.fromPath('*.tsv')".to_string())];
        let second = node("second", &["tables"], &["plots"]);

        let graph = ChannelGraph::new(&[first, second]);
        assert_eq!(graph.process_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.check().is_empty());
    }

    #[test]
    fn test_findings() {
        let a = node("a", &["missing"], &["shared"]);
        let b = node("b", &["shared"], &[]);
        let c = node("c", &["shared"], &[]);
        let warnings = ChannelGraph::new(&[a, b, c]).check();

        assert!(warnings.contains(&ChannelWarning::MultipleConsumers {
            channel: "shared".to_string(),
            processes: vec!["b".to_string(), "c".to_string()],
        }));
        assert!(warnings.contains(&ChannelWarning::NotProduced {
            channel: "missing".to_string(),
            process: "a".to_string(),
        }));
    }

    #[test]
    fn test_cycle() {
        let a = node("a", &["y"], &["x"]);
        let b = node("b", &["x"], &["y"]);
        let warnings = ChannelGraph::new(&[a, b]).check();
        assert_eq!(
            warnings,
            vec![ChannelWarning::Cycle {
                processes: vec!["a".to_string(), "b".to_string()]
            }]
        );
    }
}
