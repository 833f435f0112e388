use super::*;

use crate::graph::{Edge, VariationGraph};
use crate::internal::{add_forward_edge, forward_walk, snp_graph, snp_pileup};

//-----------------------------------------------------------------------------

// A chain 1 -> 2 -> 3.
fn chain_graph() -> VariationGraph {
    let mut graph = VariationGraph::new();
    graph.add_node(1, b"A".to_vec()).unwrap();
    graph.add_node(2, b"C".to_vec()).unwrap();
    graph.add_node(3, b"G".to_vec()).unwrap();
    add_forward_edge(&mut graph, 1, 2);
    add_forward_edge(&mut graph, 2, 3);
    graph
}

// Two bubbles in a row: 1 -> {2, 3} -> 4 -> {5, 6} -> 7.
fn two_bubble_graph() -> VariationGraph {
    let mut graph = VariationGraph::new();
    graph.add_node(1, b"AC".to_vec()).unwrap();
    graph.add_node(2, b"G".to_vec()).unwrap();
    graph.add_node(3, b"T".to_vec()).unwrap();
    graph.add_node(4, b"CC".to_vec()).unwrap();
    graph.add_node(5, b"A".to_vec()).unwrap();
    graph.add_node(6, b"G".to_vec()).unwrap();
    graph.add_node(7, b"TT".to_vec()).unwrap();
    for (from, to) in [(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (4, 6), (5, 7), (6, 7)] {
        add_forward_edge(&mut graph, from, to);
    }
    graph
}

fn find_site<'a>(sites: &'a [Site], start: NodeId, end: NodeId) -> Option<&'a Site> {
    sites.iter().find(|site| site.start.node == start && site.end.node == end)
}

//-----------------------------------------------------------------------------

// The unfold transformation.

#[test]
fn unfold_without_inversions() {
    let graph = snp_graph();
    let tg = unfold(&graph, 200);
    // No inversions, so no reverse copies.
    assert_eq!(tg.nodes.len(), 4, "Wrong number of unfolded nodes");
    for node in tg.nodes.values() {
        assert!(!node.flipped, "Unexpected reverse copy");
    }
}

#[test]
fn unfold_with_an_inversion() {
    // 1 -> 2 -> 3 with an inversion edge 1+ -> 3-.
    let mut graph = chain_graph();
    graph.add_edge(Edge::new(
        NodeTraversal::forward(1),
        NodeTraversal::new(3, Orientation::Reverse)
    )).unwrap();

    let tg = unfold(&graph, 200);
    // Forward copies plus the reverse copies reachable from the inversion:
    // 3-, then 2- and 1-.
    assert_eq!(tg.nodes.len(), 6, "Wrong number of unfolded nodes");
    let flipped: Vec<NodeId> = tg.nodes.values().filter(|node| node.flipped).map(
        |node| node.source
    ).collect();
    assert_eq!(flipped.len(), 3, "Wrong number of reverse copies");

    // With a 1 bp budget, only the two inversion targets are duplicated:
    // 3- through the edge and 1- through its mirror image.
    let tg = unfold(&graph, 1);
    let mut flipped: Vec<NodeId> = tg.nodes.values().filter(|node| node.flipped).map(
        |node| node.source
    ).collect();
    flipped.sort_unstable();
    assert_eq!(flipped, vec![1, 3], "Wrong bounded reverse copies");
}

//-----------------------------------------------------------------------------

// The dagify transformation.

#[test]
fn dagify_self_loop() {
    let mut graph = chain_graph();
    graph.add_edge(Edge::new(NodeTraversal::forward(2), NodeTraversal::forward(2))).unwrap();
    let tg = unfold(&graph, 200);
    let dag = dagify(&tg, 1);

    // Node 2 is unrolled into two layers and the loop edge advances a layer.
    assert_eq!(dag.nodes.len(), 4, "Wrong number of unrolled nodes");
    for (&id, _) in dag.nodes.iter() {
        for &succ in dag.successors_of(id).iter() {
            assert_ne!(succ, id, "Self-loop survived unrolling");
        }
    }
    assert!(strongly_connected_components(&dag).iter().all(
        |component| component.len() == 1
    ), "Unrolled graph is not acyclic");
}

#[test]
fn dagify_cycle() {
    // 1 -> 2 -> 3 -> 2.
    let mut graph = chain_graph();
    graph.add_edge(Edge::new(NodeTraversal::forward(3), NodeTraversal::forward(2))).unwrap();
    let tg = unfold(&graph, 200);
    let dag = dagify(&tg, 2);

    // Nodes 2 and 3 get three layers each.
    assert_eq!(dag.nodes.len(), 7, "Wrong number of unrolled nodes");
    assert!(strongly_connected_components(&dag).iter().all(
        |component| component.len() == 1
    ), "Unrolled graph is not acyclic");
}

//-----------------------------------------------------------------------------

// Superbubble detection.

#[test]
fn superbubble_in_snp_graph() {
    let tg = unfold(&snp_graph(), 200);
    let bubbles = superbubbles(&tg);
    assert_eq!(bubbles.len(), 1, "Wrong number of superbubbles");
    let ((source, sink), contents) = bubbles.iter().next().unwrap();
    assert_eq!(tg.translate(*source), NodeTraversal::forward(1), "Wrong source");
    assert_eq!(tg.translate(*sink), NodeTraversal::forward(4), "Wrong sink");
    assert_eq!(contents.len(), 4, "Wrong contents");
}

#[test]
fn superbubbles_in_chain() {
    // Adjacent nodes of a chain form trivial superbubbles.
    let tg = unfold(&chain_graph(), 200);
    let bubbles = superbubbles(&tg);
    assert_eq!(bubbles.len(), 2, "Wrong number of trivial superbubbles");
    for (_, contents) in bubbles.iter() {
        assert_eq!(contents.len(), 2, "Wrong contents for a trivial superbubble");
    }
}

//-----------------------------------------------------------------------------

// The superbubble backend.

#[test]
fn sites_in_snp_graph() {
    let sites = find_sites_with_superbubbles(&snp_graph(), 200, 1);
    assert_eq!(sites.len(), 1, "Wrong number of sites");
    let site = &sites[0];
    assert_eq!(site.start, NodeTraversal::forward(1), "Wrong site start");
    assert_eq!(site.end, NodeTraversal::forward(4), "Wrong site end");
    let contents: Vec<NodeId> = site.contents.iter().copied().collect();
    assert_eq!(contents, vec![1, 2, 3, 4], "Wrong site contents");
}

#[test]
fn sites_in_augmented_graph() {
    // Full-length reads add walks but no nodes, so the site is unchanged.
    let (graph, _) = snp_pileup(10, 10);
    let sites = find_sites_with_superbubbles(&graph, 200, 1);
    assert_eq!(sites.len(), 1, "Wrong number of sites after augmentation");
    assert_eq!(sites[0].start, NodeTraversal::forward(1), "Wrong site start");
    assert_eq!(sites[0].end, NodeTraversal::forward(4), "Wrong site end");
}

#[test]
fn sites_in_two_bubble_graph() {
    let sites = find_sites_with_superbubbles(&two_bubble_graph(), 200, 1);
    let first = find_site(&sites, 1, 4).expect("Missing site 1 - 4");
    assert_eq!(first.contents.iter().copied().collect::<Vec<NodeId>>(), vec![1, 2, 3, 4], "Wrong first bubble");
    let second = find_site(&sites, 4, 7).expect("Missing site 4 - 7");
    assert_eq!(second.contents.iter().copied().collect::<Vec<NodeId>>(), vec![4, 5, 6, 7], "Wrong second bubble");
}

#[test]
fn endpoint_orientation_is_preserved() {
    for site in find_sites_with_superbubbles(&two_bubble_graph(), 200, 1) {
        assert_eq!(site.start.orientation, Orientation::Forward, "Flipped start orientation");
        assert_eq!(site.end.orientation, Orientation::Forward, "Flipped end orientation");
        assert!(site.contents.contains(&site.start.node), "Contents are missing the start");
        assert!(site.contents.contains(&site.end.node), "Contents are missing the end");
    }
}

#[test]
fn cyclic_graph_terminates() {
    let mut graph = two_bubble_graph();
    // A back edge turning the middle of the graph into a cycle.
    graph.add_edge(Edge::new(NodeTraversal::forward(4), NodeTraversal::forward(1))).unwrap();
    let sites = find_sites_with_superbubbles(&graph, 200, 1);
    for site in sites.iter() {
        assert!(site.contents.contains(&site.start.node), "Contents are missing the start");
        assert!(site.contents.contains(&site.end.node), "Contents are missing the end");
    }
}

//-----------------------------------------------------------------------------

// The cactus backend.

#[test]
fn cactus_in_snp_graph() {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    let sites = find_sites_with_cactus(&graph, "ref").unwrap();
    assert_eq!(sites.len(), 1, "Wrong number of cactus sites");
    assert_eq!(sites[0].start, NodeTraversal::forward(1), "Wrong site start");
    assert_eq!(sites[0].end, NodeTraversal::forward(4), "Wrong site end");
    let contents: Vec<NodeId> = sites[0].contents.iter().copied().collect();
    assert_eq!(contents, vec![1, 2, 3, 4], "Wrong site contents");
}

#[test]
fn cactus_nests_bubbles() {
    let mut graph = two_bubble_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4, 5, 7])).unwrap();
    let sites = find_sites_with_cactus(&graph, "ref").unwrap();
    // The cut node 4 splits the graph into two cyclic components.
    assert!(find_site(&sites, 1, 4).is_some(), "Missing site 1 - 4");
    assert!(find_site(&sites, 4, 7).is_some(), "Missing site 4 - 7");
    // The root spanning the whole graph is not emitted as itself.
    for site in sites.iter() {
        assert!(site.contents.len() <= 4, "Wrong nested contents: {:?}", site.contents);
    }
}

#[test]
fn cactus_handles_cycles() {
    // A cycle between nodes 2 and 3, with bridges on both sides. The
    // decomposition works on the cyclic graph directly.
    let mut graph = chain_graph();
    graph.add_node(4, b"T".to_vec()).unwrap();
    add_forward_edge(&mut graph, 3, 4);
    graph.add_edge(Edge::new(NodeTraversal::forward(3), NodeTraversal::forward(2))).unwrap();
    graph.insert_walk("ref", forward_walk(&[1, 2, 3, 4])).unwrap();

    let sites = find_sites_with_cactus(&graph, "ref").unwrap();
    assert_eq!(sites.len(), 3, "Wrong number of cactus sites");
    let cycle = find_site(&sites, 2, 3).expect("Missing cycle site 2 - 3");
    assert_eq!(
        cycle.contents.iter().copied().collect::<Vec<NodeId>>(), vec![2, 3],
        "Wrong cycle contents"
    );
    assert!(find_site(&sites, 1, 2).is_some(), "Missing chain link 1 - 2");
    assert!(find_site(&sites, 3, 4).is_some(), "Missing chain link 3 - 4");
}

#[test]
fn cactus_needs_the_reference() {
    let graph = snp_graph();
    assert!(
        find_sites_with_cactus(&graph, "ref").is_err(),
        "Missing reference walk was accepted"
    );
}

#[test]
fn biconnected_decomposition() {
    // A chain decomposes into its bridges.
    let blocks = biconnected_components(&chain_graph());
    assert_eq!(blocks.len(), 2, "Wrong number of chain components");
    for block in blocks.iter() {
        assert_eq!(block.len(), 2, "Wrong bridge component size");
    }

    // The SNP bubble is a single cyclic component.
    let blocks = biconnected_components(&snp_graph());
    assert_eq!(blocks.len(), 1, "Wrong number of bubble components");
    assert_eq!(blocks[0].len(), 4, "Wrong bubble component size");

    // A self-loop does not separate or extend anything.
    let mut graph = chain_graph();
    graph.add_edge(Edge::new(NodeTraversal::forward(2), NodeTraversal::forward(2))).unwrap();
    let blocks = biconnected_components(&graph);
    assert_eq!(blocks.len(), 2, "Self-loop changed the decomposition");
}

//-----------------------------------------------------------------------------
