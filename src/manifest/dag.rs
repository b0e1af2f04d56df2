// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Pipeline dependency DAG
//!
//! Nodes are pipelines, edges run from a dependency (build root or consumed
//! pipeline) to the pipeline that references it.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::errors::ComposeError;
use crate::pipeline::SerializedPipeline;

/// Dependency graph over the pipelines of one manifest
pub struct ManifestDag {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl ManifestDag {
    /// Create an empty DAG
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from serialized pipelines
    ///
    /// Fails on empty or duplicate names, references to pipelines that are
    /// not part of `pipelines`, and cycles.
    pub fn build(pipelines: &[SerializedPipeline]) -> Result<Self, ComposeError> {
        let mut dag = Self::new();

        for (idx, pipeline) in pipelines.iter().enumerate() {
            if pipeline.name.trim().is_empty() {
                return Err(ComposeError::InvalidPipeline {
                    reason: format!("pipeline #{} has an empty name", idx + 1),
                });
            }
            if dag.name_to_index.contains_key(&pipeline.name) {
                return Err(ComposeError::DuplicatePipeline {
                    name: pipeline.name.clone(),
                });
            }

            let node = dag.graph.add_node(idx);
            dag.name_to_index.insert(pipeline.name.clone(), node);
            dag.index_to_name.insert(node, pipeline.name.clone());
        }

        for pipeline in pipelines {
            let node = dag.name_to_index[&pipeline.name];

            for dep_name in pipeline.dependencies() {
                let dep_node = dag.name_to_index.get(dep_name).ok_or_else(|| {
                    ComposeError::UnknownPipeline {
                        pipeline: pipeline.name.clone(),
                        reference: dep_name.to_string(),
                    }
                })?;

                if !dag.graph.contains_edge(*dep_node, node) {
                    dag.graph.add_edge(*dep_node, node, ());
                }
            }
        }

        dag.validate_acyclic()?;

        Ok(dag)
    }

    fn validate_acyclic(&self) -> Result<(), ComposeError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(_) => Err(ComposeError::CircularDependency {
                pipelines: self.cycle_members(),
            }),
        }
    }

    /// Names of all pipelines that take part in a cycle, in declaration order
    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .flatten()
            .collect();
        members.sort_by_key(|node| self.graph[*node]);

        members
            .into_iter()
            .map(|node| self.index_to_name[&node].clone())
            .collect()
    }

    /// Pipeline indices with every dependency ahead of its dependents
    pub fn topological_order(&self) -> Result<Vec<usize>, ComposeError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|_| ComposeError::CircularDependency {
                pipelines: self.cycle_members(),
            })
    }

    /// Pipeline names in topological order
    pub fn topological_order_names(&self) -> Result<Vec<String>, ComposeError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|_| ComposeError::CircularDependency {
                pipelines: self.cycle_members(),
            })
    }

    /// Topological order restricted to `output` and everything it needs
    pub fn closure_order(&self, output: &str) -> Result<Vec<usize>, ComposeError> {
        let closure = self.closure(output)?;
        Ok(self
            .topological_order()?
            .into_iter()
            .filter(|idx| closure.contains(idx))
            .collect())
    }

    /// `output` and all pipelines it transitively depends on
    pub fn closure(&self, output: &str) -> Result<HashSet<usize>, ComposeError> {
        let start = self
            .name_to_index
            .get(output)
            .ok_or_else(|| ComposeError::UnknownOutput {
                name: output.to_string(),
            })?;

        let mut seen = HashSet::new();
        let mut stack = vec![*start];
        while let Some(node) = stack.pop() {
            if seen.insert(self.graph[node]) {
                stack.extend(self.graph.neighbors_directed(node, Direction::Incoming));
            }
        }

        Ok(seen)
    }

    /// Direct dependencies of a pipeline
    pub fn dependencies(&self, pipeline: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(pipeline)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .collect();
        deps.sort_by_key(|n| self.graph[*n]);
        Some(deps.into_iter().map(|n| self.index_to_name[&n].clone()).collect())
    }

    /// Pipelines that directly depend on a pipeline
    pub fn dependents(&self, pipeline: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(pipeline)?;
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(*node, Direction::Outgoing)
            .collect();
        deps.sort_by_key(|n| self.graph[*n]);
        Some(deps.into_iter().map(|n| self.index_to_name[&n].clone()).collect())
    }

    /// Check if pipeline A depends (directly or transitively) on pipeline B
    pub fn depends_on(&self, pipeline_a: &str, pipeline_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(pipeline_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(pipeline_b) else {
            return false;
        };

        node_a != node_b
            && petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Edges as (dependency, dependent) nodes, in declaration order
    fn edge_nodes(&self) -> Vec<(NodeIndex, NodeIndex)> {
        let mut edges: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .collect();
        edges.sort_by_key(|(from, to)| (self.graph[*to], self.graph[*from]));
        edges
    }

    /// Mermaid ids follow declaration order; names only appear as labels
    fn mermaid_id(&self, node: NodeIndex) -> String {
        format!("p{}", self.graph[node])
    }

    /// Name quoted for use inside a DOT string
    fn dot_id(&self, node: NodeIndex) -> String {
        self.index_to_name[&node]
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.graph.node_indices() {
            out.push_str(&format!(
                "    {}[\"{}\"]\n",
                self.mermaid_id(node),
                self.index_to_name[&node].replace('"', "#quot;")
            ));
        }

        for (from, to) in self.edge_nodes() {
            out.push_str(&format!(
                "    {} --> {}\n",
                self.mermaid_id(from),
                self.mermaid_id(to)
            ));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph manifest {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edge_nodes() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.dot_id(from),
                self.dot_id(to)
            ));
        }

        // Isolated nodes (no edges)
        for node in self.graph.node_indices() {
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", self.dot_id(node)));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of the manifest order
    pub fn to_text(&self, pipelines: &[SerializedPipeline]) -> Result<String, ComposeError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let pipeline = &pipelines[*idx];
            let deps = self.dependencies(&pipeline.name).unwrap_or_default();

            out.push_str(&format!(
                "{}. {} ({} stages)",
                i + 1,
                pipeline.name,
                pipeline.stages.len()
            ));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for ManifestDag {
    fn default() -> Self {
        Self::new()
    }
}
