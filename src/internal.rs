use crate::alignment::Alignment;
use crate::augment;
use crate::graph::{Edge, Mapping, NodeId, NodeTraversal, Orientation, VariationGraph};
use crate::sites::Site;

use std::collections::BTreeSet;

//-----------------------------------------------------------------------------

// Graph construction utilities.

// The SNP graph used throughout the tests:
// 1 (ACGT) -> 2 (G) -> 4 (TTAA) and 1 -> 3 (T) -> 4.
pub(crate) fn snp_graph() -> VariationGraph {
    let mut graph = VariationGraph::new();
    graph.add_node(1, b"ACGT".to_vec()).unwrap();
    graph.add_node(2, b"G".to_vec()).unwrap();
    graph.add_node(3, b"T".to_vec()).unwrap();
    graph.add_node(4, b"TTAA".to_vec()).unwrap();
    for (from, to) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
        add_forward_edge(&mut graph, from, to);
    }
    graph
}

// A graph with a deletion allele: 1 (ACGT) -> 2 (G) -> 4 (TTAA) and 1 -> 4.
pub(crate) fn deletion_graph() -> VariationGraph {
    let mut graph = VariationGraph::new();
    graph.add_node(1, b"ACGT".to_vec()).unwrap();
    graph.add_node(2, b"G".to_vec()).unwrap();
    graph.add_node(4, b"TTAA".to_vec()).unwrap();
    for (from, to) in [(1, 2), (2, 4), (1, 4)] {
        add_forward_edge(&mut graph, from, to);
    }
    graph
}

pub(crate) fn add_forward_edge(graph: &mut VariationGraph, from: NodeId, to: NodeId) {
    graph.add_edge(Edge::new(NodeTraversal::forward(from), NodeTraversal::forward(to))).unwrap();
}

pub(crate) fn forward_walk(nodes: &[NodeId]) -> Vec<Mapping> {
    nodes.iter().enumerate().map(
        |(rank, &node)| Mapping::new(node, Orientation::Forward, rank + 1)
    ).collect()
}

pub(crate) fn forward_traversals(nodes: &[NodeId]) -> Vec<NodeTraversal> {
    nodes.iter().map(|&node| NodeTraversal::forward(node)).collect()
}

pub(crate) fn site(start: NodeTraversal, end: NodeTraversal, contents: &[NodeId]) -> Site {
    Site {
        start, end,
        contents: contents.iter().copied().collect::<BTreeSet<NodeId>>(),
    }
}

//-----------------------------------------------------------------------------

// Read construction utilities.

// Creates full-length reads following the given nodes forward, named
// `<prefix>_<ordinal>`.
pub(crate) fn full_match_reads(
    graph: &VariationGraph, prefix: &str, count: usize, nodes: &[NodeId],
    quality: Option<u8>, mapq: Option<usize>
) -> Vec<Alignment> {
    let path = forward_traversals(nodes);
    let path_len: usize = nodes.iter().map(|&node| graph.sequence_len(node).unwrap()).sum();
    (0..count).map(|i| {
        let base_quality = quality.map(|q| vec![q; path_len]);
        Alignment::full_match(&format!("{}_{}", prefix, i), path.clone(), path_len, base_quality, mapq)
    }).collect()
}

// Augments the graph with the reads and rebuilds the walk index.
pub(crate) fn augment_and_index(graph: &mut VariationGraph, alignments: &[Alignment]) {
    let result = augment::augment(graph, alignments);
    assert!(result.is_ok(), "Failed to augment the graph: {}", result.unwrap_err());
    graph.rebuild_walk_index();
}

// The SNP graph with a reference walk and reads supporting both alleles.
// Returns the graph and the reads.
pub(crate) fn snp_pileup(ref_reads: usize, alt_reads: usize) -> (VariationGraph, Vec<Alignment>) {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    let mut reads = full_match_reads(&graph, "over_b", ref_reads, &[1, 2, 4], Some(30), Some(60));
    reads.extend(full_match_reads(&graph, "over_c", alt_reads, &[1, 3, 4], Some(30), Some(60)));
    augment_and_index(&mut graph, &reads);
    (graph, reads)
}

//-----------------------------------------------------------------------------
