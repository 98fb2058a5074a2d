//! Directed-graph queries over connection-gene key sets.
//!
//! Genomes store index-based adjacency (node key pairs), so the graph is
//! rebuilt here on demand from plain key iterators; petgraph does the cycle
//! and ordering work.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::NeatError;
use crate::genome::ConnKey;

fn build<I: IntoIterator<Item = ConnKey>>(edges: I) -> DiGraph<i64, ()> {
    let mut graph = DiGraph::new();
    let mut indices: HashMap<i64, NodeIndex> = HashMap::new();
    for (source, target) in edges {
        let s = *indices.entry(source).or_insert_with(|| graph.add_node(source));
        let t = *indices.entry(target).or_insert_with(|| graph.add_node(target));
        graph.add_edge(s, t, ());
    }
    graph
}

/// Whether adding `test` to the given connection set closes a cycle.
/// A self-loop always does.
pub fn creates_cycle<I: IntoIterator<Item = ConnKey>>(edges: I, test: ConnKey) -> bool {
    if test.0 == test.1 {
        return true;
    }
    let graph = build(edges.into_iter().chain(std::iter::once(test)));
    is_cyclic_directed(&graph)
}

/// Whether the connection set already contains a cycle.
pub fn has_cycle<I: IntoIterator<Item = ConnKey>>(edges: I) -> bool {
    let graph = build(edges);
    is_cyclic_directed(&graph)
}

/// The node keys that can influence an output: outputs themselves plus every
/// non-input node on a directed path to an output. Nodes outside this set
/// need not be evaluated by a phenotype.
pub fn required_for_output(inputs: &[i64], outputs: &[i64], edges: &[ConnKey]) -> HashSet<i64> {
    let input_set: HashSet<i64> = inputs.iter().copied().collect();
    let mut required: HashSet<i64> = outputs.iter().copied().collect();
    loop {
        let mut grew = false;
        for &(source, target) in edges {
            if required.contains(&target) && !required.contains(&source) && !input_set.contains(&source)
            {
                required.insert(source);
                grew = true;
            }
        }
        if !grew {
            return required;
        }
    }
}

/// Topological evaluation order of the given connection set, input keys
/// filtered out. Fails with the cycle-rejection condition when the subgraph
/// is cyclic.
pub fn topological_order(inputs: &[i64], edges: &[ConnKey]) -> Result<Vec<i64>, NeatError> {
    let graph = build(edges.iter().copied());
    let input_set: HashSet<i64> = inputs.iter().copied().collect();
    match toposort(&graph, None) {
        Ok(order) => Ok(order
            .into_iter()
            .map(|ix| graph[ix])
            .filter(|key| !input_set.contains(key))
            .collect()),
        Err(_) => Err(NeatError::CycleRejected),
    }
}
