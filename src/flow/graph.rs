//! Dependency ordering for a set of steps.
use anyhow::{anyhow, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Directed graph of step names, edges running upstream to downstream.
///
/// Upstream names that were never registered are skipped when wiring edges;
/// a step listed in a chain can still name a producer outside that chain and
/// read its manifest from disk instead.
#[derive(Debug)]
pub struct FlowGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl FlowGraph {
    /// Build a graph from `(name, upstream names)` pairs.
    pub fn from_steps<'a, I>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut upstreams: Vec<(String, Vec<String>)> = Vec::new();

        for (name, upstream) in steps {
            if nodes.contains_key(name) {
                return Err(anyhow!("step `{name}` registered twice"));
            }
            let index = graph.add_node(name.to_string());
            nodes.insert(name.to_string(), index);
            upstreams.push((name.to_string(), upstream.to_vec()));
        }
        for (name, upstream) in upstreams {
            let downstream = nodes[&name];
            for producer in upstream {
                if let Some(&source) = nodes.get(&producer) {
                    graph.add_edge(source, downstream, ());
                }
            }
        }
        Ok(FlowGraph { graph, nodes })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Step names in an order that satisfies every registered dependency.
    pub fn order(&self) -> Result<Vec<String>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            anyhow!(
                "step dependencies form a cycle through `{}`",
                self.graph[cycle.node_id()]
            )
        })?;
        Ok(sorted.into_iter().map(|index| self.graph[index].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &FlowGraph) -> Vec<String> {
        graph.order().expect("order")
    }

    #[test]
    fn order_respects_dependencies() {
        let raw_up: Vec<String> = vec![];
        let invert_up = vec!["raw".to_string()];
        let sum_up = vec!["invert".to_string()];
        let graph = FlowGraph::from_steps([
            ("sum", sum_up.as_slice()),
            ("raw", raw_up.as_slice()),
            ("invert", invert_up.as_slice()),
        ])
        .expect("build graph");

        let order = names(&graph);
        let position = |name: &str| order.iter().position(|n| n == name).expect("present");
        assert!(position("raw") < position("invert"));
        assert!(position("invert") < position("sum"));
    }

    #[test]
    fn unknown_upstreams_are_ignored_for_ordering() {
        let upstream = vec!["elsewhere".to_string()];
        let graph =
            FlowGraph::from_steps([("plot", upstream.as_slice())]).expect("build graph");
        assert_eq!(names(&graph), vec!["plot".to_string()]);
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let none: Vec<String> = vec![];
        let err = FlowGraph::from_steps([("raw", none.as_slice()), ("raw", none.as_slice())])
            .expect_err("duplicate");
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn cycles_name_a_step() {
        let a_up = vec!["b".to_string()];
        let b_up = vec!["a".to_string()];
        let graph = FlowGraph::from_steps([("a", a_up.as_slice()), ("b", b_up.as_slice())])
            .expect("build graph");
        let err = graph.order().expect_err("cycle");
        assert!(err.to_string().contains("cycle"));
    }
}
