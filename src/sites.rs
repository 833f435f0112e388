//! Finding sites of variation in the graph.
//!
//! A site is a maximal bubble subregion bounded by a single entry and a
//! single exit traversal. Walks through the site diverge after the entry and
//! reconverge at the exit, and the alleles of the site are the distinct
//! sequences they spell.
//!
//! Two interchangeable backends produce sites. The superbubble backend
//! first transforms the graph: `unfold` eliminates reverse-strand traversals
//! by duplicating the subgraph reachable through inversions up to a length
//! budget, and `dagify` eliminates cycles by unrolling strongly connected
//! components up to a step budget. Superbubbles are then found on the
//! resulting DAG and translated back through the composed transformations,
//! preserving endpoint orientation.
//!
//! The cactus backend decomposes the untransformed graph instead, with no
//! length or step budgets: every adjacency is an undirected edge, and the
//! biconnected components split the graph into bridges (the links of
//! chains) and cyclic parts, each of which becomes a bubble bounded by its
//! extreme nodes in pseudo-topological rank order. The bubbles are nested
//! into a tree rooted at a reference source and sink chosen by rank,
//! content sets propagate upward, and every bubble except the root is
//! emitted.

use crate::graph::{NodeId, NodeTraversal, Orientation, VariationGraph};

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt::Display;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A site of variation: a bubble with a unique entry and exit.
///
/// Every walk from `start` to `end` that stays within the graph visits only
/// nodes in `contents`. The contents include the endpoint nodes. Sites from
/// both backends share this shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    /// Entry traversal of the site.
    pub start: NodeTraversal,
    /// Exit traversal of the site.
    pub end: NodeTraversal,
    /// Identifiers of the nodes within the site, including the endpoints.
    pub contents: BTreeSet<NodeId>,
}

impl Site {
    /// Swaps the endpoints without flipping their orientations.
    ///
    /// This is used for retrying inside-out sites from the cactus backend.
    pub fn swap_endpoints(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

//-----------------------------------------------------------------------------

// A node of a transformed graph: a copy of an original node in one
// orientation, possibly duplicated by the unrolling.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TransformedNode {
    // Original node identifier.
    source: NodeId,
    // Does the copy represent the reverse orientation of the original?
    flipped: bool,
}

// A directed graph produced by `unfold` or `dagify`, with a translation
// from its nodes back to the original graph.
#[derive(Clone, Debug, Default)]
struct TransformedGraph {
    nodes: BTreeMap<NodeId, TransformedNode>,
    successors: BTreeMap<NodeId, Vec<NodeId>>,
    predecessors: BTreeMap<NodeId, Vec<NodeId>>,
}

impl TransformedGraph {
    fn successors_of(&self, id: NodeId) -> &[NodeId] {
        self.successors.get(&id).map_or(&[], |list| list.as_slice())
    }

    fn predecessors_of(&self, id: NodeId) -> &[NodeId] {
        self.predecessors.get(&id).map_or(&[], |list| list.as_slice())
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.successors.entry(from).or_default().push(to);
        self.predecessors.entry(to).or_default().push(from);
    }

    // Sorts the adjacency lists and removes parallel edges.
    fn finalize(&mut self) {
        for list in self.successors.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        for list in self.predecessors.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
    }

    // Translates a transformed node back to an oriented visit in the
    // original graph.
    fn translate(&self, id: NodeId) -> NodeTraversal {
        let node = &self.nodes[&id];
        let orientation = if node.flipped { Orientation::Reverse } else { Orientation::Forward };
        NodeTraversal::new(node.source, orientation)
    }
}

//-----------------------------------------------------------------------------

// Returns the oriented successor lists of the bidirected graph.
fn oriented_successors(graph: &VariationGraph) -> HashMap<NodeTraversal, Vec<NodeTraversal>> {
    let mut result: HashMap<NodeTraversal, Vec<NodeTraversal>> = HashMap::new();
    for edge in graph.edges() {
        result.entry(edge.from).or_default().push(edge.to);
        result.entry(edge.to.reverse()).or_default().push(edge.from.reverse());
    }
    for list in result.values_mut() {
        list.sort_unstable();
        list.dedup();
    }
    result
}

// Bound-limited expansion that eliminates reverse-strand traversals.
//
// Every node gets a forward copy. Reverse copies are created only for the
// orientations reachable through an inversion edge within `max_length` bp,
// so a graph without inversions stays single-stranded.
fn unfold(graph: &VariationGraph, max_length: usize) -> TransformedGraph {
    let oriented = oriented_successors(graph);

    // Find the reverse orientations reachable from an inversion.
    let mut active: BinaryHeap<Reverse<(usize, NodeTraversal)>> = BinaryHeap::new();
    for (from, successors) in oriented.iter() {
        if from.orientation.is_reverse() {
            continue;
        }
        for succ in successors.iter() {
            if succ.orientation.is_reverse() {
                let distance = graph.sequence_len(succ.node).unwrap_or(0);
                if distance <= max_length {
                    active.push(Reverse((distance, *succ)));
                }
            }
        }
    }
    let mut selected: BTreeSet<NodeTraversal> = BTreeSet::new();
    while let Some(Reverse((distance, vertex))) = active.pop() {
        if selected.contains(&vertex) {
            continue;
        }
        selected.insert(vertex);
        if let Some(successors) = oriented.get(&vertex) {
            for succ in successors.iter() {
                if !succ.orientation.is_reverse() || selected.contains(succ) {
                    continue;
                }
                let next = distance + graph.sequence_len(succ.node).unwrap_or(0);
                if next <= max_length {
                    active.push(Reverse((next, *succ)));
                }
            }
        }
    }

    // Materialize the copies.
    let mut result = TransformedGraph::default();
    let mut vertex_to_id: HashMap<NodeTraversal, NodeId> = HashMap::new();
    let mut next_id: NodeId = 1;
    for node in graph.node_ids() {
        vertex_to_id.insert(NodeTraversal::forward(node), next_id);
        result.nodes.insert(next_id, TransformedNode { source: node, flipped: false });
        next_id += 1;
    }
    for vertex in selected.iter() {
        vertex_to_id.insert(*vertex, next_id);
        result.nodes.insert(next_id, TransformedNode { source: vertex.node, flipped: true });
        next_id += 1;
    }

    // Copy the edges between materialized copies.
    for (from, successors) in oriented.iter() {
        let from_id = match vertex_to_id.get(from) {
            Some(&id) => id,
            None => continue,
        };
        for succ in successors.iter() {
            if let Some(&to_id) = vertex_to_id.get(succ) {
                result.add_edge(from_id, to_id);
            }
        }
    }
    result.finalize();
    result
}

//-----------------------------------------------------------------------------

// Returns the strongly connected components of the transformed graph using
// an iterative Tarjan traversal.
fn strongly_connected_components(tg: &TransformedGraph) -> Vec<Vec<NodeId>> {
    let mut components: Vec<Vec<NodeId>> = Vec::new();
    let mut index_of: HashMap<NodeId, usize> = HashMap::new();
    let mut lowlink: HashMap<NodeId, usize> = HashMap::new();
    let mut on_stack: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut next_index = 0;

    for &root in tg.nodes.keys() {
        if index_of.contains_key(&root) {
            continue;
        }
        let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];
        while !frames.is_empty() {
            let (node, child) = *frames.last().unwrap();
            if child == 0 {
                index_of.insert(node, next_index);
                lowlink.insert(node, next_index);
                next_index += 1;
                stack.push(node);
                on_stack.insert(node);
            }
            let successors = tg.successors_of(node);
            if child < successors.len() {
                frames.last_mut().unwrap().1 += 1;
                let succ = successors[child];
                if !index_of.contains_key(&succ) {
                    frames.push((succ, 0));
                } else if on_stack.contains(&succ) {
                    let low = lowlink[&node].min(index_of[&succ]);
                    lowlink.insert(node, low);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    let low = lowlink[&parent].min(lowlink[&node]);
                    lowlink.insert(parent, low);
                }
                if lowlink[&node] == index_of[&node] {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().unwrap();
                        on_stack.remove(&member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }
    components
}

// Bound-limited unrolling that eliminates cycles.
//
// Each cyclic strongly connected component is copied into `steps + 1`
// layers. Edges within the component advance one layer and are dropped from
// the last layer; edges entering the component go to layer 0, and edges
// leaving it exist from every layer.
fn dagify(tg: &TransformedGraph, steps: usize) -> TransformedGraph {
    let components = strongly_connected_components(tg);
    let mut component_of: HashMap<NodeId, usize> = HashMap::new();
    let mut cyclic: Vec<bool> = vec![false; components.len()];
    for (offset, component) in components.iter().enumerate() {
        for &node in component.iter() {
            component_of.insert(node, offset);
        }
        cyclic[offset] = component.len() > 1 || component.iter().any(
            |&node| tg.successors_of(node).contains(&node)
        );
    }

    let layers = steps + 1;
    let mut copy_id: HashMap<(NodeId, usize), NodeId> = HashMap::new();
    let mut result = TransformedGraph::default();
    let mut next_id: NodeId = 1;
    for (&node, info) in tg.nodes.iter() {
        let count = if cyclic[component_of[&node]] { layers } else { 1 };
        for layer in 0..count {
            copy_id.insert((node, layer), next_id);
            result.nodes.insert(next_id, info.clone());
            next_id += 1;
        }
    }

    for (&from, successors) in tg.successors.iter() {
        let from_cyclic = cyclic[component_of[&from]];
        let from_count = if from_cyclic { layers } else { 1 };
        for &to in successors.iter() {
            if from_cyclic && component_of[&from] == component_of[&to] {
                // An edge within a cyclic component advances one layer.
                for layer in 0..layers - 1 {
                    result.add_edge(copy_id[&(from, layer)], copy_id[&(to, layer + 1)]);
                }
            } else {
                for layer in 0..from_count {
                    result.add_edge(copy_id[&(from, layer)], copy_id[&(to, 0)]);
                }
            }
        }
    }
    result.finalize();
    result
}

//-----------------------------------------------------------------------------

// Searches for the minimal superbubble starting from the given source.
//
// The search collapses the region reachable from the source: a node becomes
// ready when all of its predecessors have been processed. A superbubble is
// found when exactly one unprocessed node remains and it is the only ready
// one. The search fails on tips, on cycles through the source, and when the
// region stops collapsing.
fn superbubble_from(tg: &TransformedGraph, source: NodeId) -> Option<(NodeId, BTreeSet<NodeId>)> {
    if tg.successors_of(source).is_empty() {
        return None;
    }
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    seen.insert(source);
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue: Vec<NodeId> = vec![source];

    while let Some(node) = queue.pop() {
        visited.insert(node);
        let successors = tg.successors_of(node);
        if successors.is_empty() {
            // A tip inside the region.
            return None;
        }
        for &succ in successors.iter() {
            if succ == source {
                // A cycle through the source.
                return None;
            }
            seen.insert(succ);
            if tg.predecessors_of(succ).iter().all(|pred| visited.contains(pred)) {
                queue.push(succ);
            }
        }
        if queue.len() == 1 && seen.len() == visited.len() + 1 {
            let sink = queue[0];
            if tg.successors_of(sink).contains(&source) {
                return None;
            }
            return Some((sink, seen));
        }
    }
    None
}

// Finds all superbubbles of the DAG, keyed by (source, sink).
fn superbubbles(tg: &TransformedGraph) -> BTreeMap<(NodeId, NodeId), BTreeSet<NodeId>> {
    let mut result = BTreeMap::new();
    for &source in tg.nodes.keys() {
        if let Some((sink, contents)) = superbubble_from(tg, source) {
            result.insert((source, sink), contents);
        }
    }
    result
}

//-----------------------------------------------------------------------------

/// Finds sites with the superbubble backend.
///
/// The graph is unfolded and dagified with the given bounds, superbubbles
/// are detected on the resulting DAG, and the results are translated back
/// to the original graph. Endpoint ordering and orientation are preserved.
/// A region discovered on both strands is emitted once.
pub fn find_sites_with_superbubbles(
    graph: &VariationGraph, unfold_max_length: usize, dagify_steps: usize
) -> Vec<Site> {
    let tg = unfold(graph, unfold_max_length);
    let tg = dagify(&tg, dagify_steps);
    let bubbles = superbubbles(&tg);

    let mut sites: BTreeMap<(NodeTraversal, NodeTraversal), Site> = BTreeMap::new();
    for ((source, sink), contents) in bubbles.iter() {
        let start = tg.translate(*source);
        let end = tg.translate(*sink);
        // The mirror image of a known site is the same region.
        if sites.contains_key(&(end.reverse(), start.reverse())) {
            continue;
        }
        let translated: BTreeSet<NodeId> = contents.iter().map(|&id| tg.nodes[&id].source).collect();
        let entry = sites.entry((start, end)).or_insert(Site {
            start, end, contents: BTreeSet::new(),
        });
        entry.contents.extend(translated);
    }
    sites.into_values().collect()
}

//-----------------------------------------------------------------------------

// Assigns pseudo-topological ranks to the nodes by a forward-strand DFS,
// ignoring back edges.
fn pseudo_topological_ranks(graph: &VariationGraph) -> HashMap<NodeId, usize> {
    let mut forward: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (from, successors) in oriented_successors(graph).iter() {
        if from.orientation.is_reverse() {
            continue;
        }
        let list = forward.entry(from.node).or_default();
        for succ in successors.iter() {
            list.push(succ.node);
        }
    }
    for list in forward.values_mut() {
        list.sort_unstable();
        list.dedup();
    }

    let mut postorder: Vec<NodeId> = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    for root in graph.node_ids() {
        if visited.contains(&root) {
            continue;
        }
        visited.insert(root);
        let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];
        while !frames.is_empty() {
            let (node, child) = *frames.last().unwrap();
            let empty: Vec<NodeId> = Vec::new();
            let successors = forward.get(&node).unwrap_or(&empty);
            if child < successors.len() {
                frames.last_mut().unwrap().1 += 1;
                let succ = successors[child];
                if !visited.contains(&succ) {
                    visited.insert(succ);
                    frames.push((succ, 0));
                }
            } else {
                frames.pop();
                postorder.push(node);
            }
        }
    }

    let mut ranks: HashMap<NodeId, usize> = HashMap::with_capacity(postorder.len());
    for (offset, &node) in postorder.iter().rev().enumerate() {
        ranks.insert(node, offset);
    }
    ranks
}

// Returns the biconnected components of the graph, treating every
// adjacency as an undirected edge between node identifiers. Distinct edge
// types between the same pair of nodes stay distinct, so a two-node cycle
// through parallel edges is one component. Single-edge components are
// bridges; larger components are the cyclic parts of the graph. Self-loops
// cannot separate anything and are ignored.
fn biconnected_components(graph: &VariationGraph) -> Vec<BTreeSet<NodeId>> {
    // The undirected multigraph: edge endpoints by offset, and for each
    // node the incident (neighbor, edge offset) pairs.
    let mut endpoints: Vec<(NodeId, NodeId)> = Vec::new();
    let mut adjacency: BTreeMap<NodeId, Vec<(NodeId, usize)>> = BTreeMap::new();
    for edge in graph.edges() {
        if edge.from.node == edge.to.node {
            continue;
        }
        let offset = endpoints.len();
        endpoints.push((edge.from.node, edge.to.node));
        adjacency.entry(edge.from.node).or_default().push((edge.to.node, offset));
        adjacency.entry(edge.to.node).or_default().push((edge.from.node, offset));
    }

    let mut components: Vec<BTreeSet<NodeId>> = Vec::new();
    let mut disc: HashMap<NodeId, usize> = HashMap::new();
    let mut low: HashMap<NodeId, usize> = HashMap::new();
    let mut edge_stack: Vec<usize> = Vec::new();
    let mut timer = 0;

    for root in graph.node_ids() {
        if disc.contains_key(&root) {
            continue;
        }
        // (node, edge the node was discovered through, adjacency offset)
        let mut frames: Vec<(NodeId, Option<usize>, usize)> = vec![(root, None, 0)];
        while !frames.is_empty() {
            let (node, via, child) = *frames.last().unwrap();
            if child == 0 {
                disc.insert(node, timer);
                low.insert(node, timer);
                timer += 1;
            }
            let empty: Vec<(NodeId, usize)> = Vec::new();
            let neighbors = adjacency.get(&node).unwrap_or(&empty);
            if child < neighbors.len() {
                frames.last_mut().unwrap().2 += 1;
                let (neighbor, offset) = neighbors[child];
                if Some(offset) == via {
                    // The edge we arrived through.
                    continue;
                }
                match disc.get(&neighbor) {
                    None => {
                        edge_stack.push(offset);
                        frames.push((neighbor, Some(offset), 0));
                    },
                    Some(&neighbor_disc) if neighbor_disc < disc[&node] => {
                        // A back edge to an ancestor, including a parallel
                        // edge to the parent.
                        edge_stack.push(offset);
                        let updated = low[&node].min(neighbor_disc);
                        low.insert(node, updated);
                    },
                    // The descendant already recorded this edge.
                    Some(_) => {},
                }
            } else {
                frames.pop();
                if let Some(&(parent, _, _)) = frames.last() {
                    let updated = low[&parent].min(low[&node]);
                    low.insert(parent, updated);
                    if low[&node] >= disc[&parent] {
                        // The parent separates this subtree. Everything on
                        // the edge stack above the discovering edge is one
                        // biconnected component.
                        let mut component: BTreeSet<NodeId> = BTreeSet::new();
                        loop {
                            let offset = edge_stack.pop().unwrap();
                            component.insert(endpoints[offset].0);
                            component.insert(endpoints[offset].1);
                            if Some(offset) == via {
                                break;
                            }
                        }
                        components.push(component);
                    }
                }
            }
        }
    }
    components
}

// Picks the orientation in which the component is entered through the
// given boundary node, or left through it for the exit side. Walking
// onward from the entry visit stays inside the component, as does walking
// onward from the reversed exit visit.
fn component_orientation(
    oriented: &HashMap<NodeTraversal, Vec<NodeTraversal>>,
    component: &BTreeSet<NodeId>,
    node: NodeId,
    is_entry: bool
) -> Orientation {
    for orientation in [Orientation::Forward, Orientation::Reverse] {
        let visit = NodeTraversal::new(node, orientation);
        let probe = if is_entry { visit } else { visit.reverse() };
        let inside = oriented.get(&probe).map_or(false, |successors| {
            successors.iter().any(|succ| succ.node != node && component.contains(&succ.node))
        });
        if inside {
            return orientation;
        }
    }
    Orientation::Forward
}

// Builds the bubble tree for the cactus backend. The bubbles are the
// biconnected components of the untransformed graph: each is bounded by
// its lowest- and highest-ranking nodes and nested by containment under
// the root spanning the reference source and sink.
fn cactusbubble_tree(
    graph: &VariationGraph, source_sink: (NodeTraversal, NodeTraversal)
) -> BubbleTree {
    let ranks = pseudo_topological_ranks(graph);
    let oriented = oriented_successors(graph);

    let root = Site {
        start: source_sink.0,
        end: source_sink.1,
        contents: graph.node_ids().collect(),
    };
    let mut tree = BubbleTree::new(root);

    let mut bubbles: Vec<Site> = Vec::new();
    for component in biconnected_components(graph) {
        if component.len() < 2 {
            continue;
        }
        let start_node = *component.iter().min_by_key(|&&node| ranks[&node]).unwrap();
        let end_node = *component.iter().max_by_key(|&&node| ranks[&node]).unwrap();
        let start = NodeTraversal::new(
            start_node, component_orientation(&oriented, &component, start_node, true)
        );
        let end = NodeTraversal::new(
            end_node, component_orientation(&oriented, &component, end_node, false)
        );
        bubbles.push(Site { start, end, contents: component });
    }

    // Nest the bubbles by containment, largest first.
    bubbles.sort_by_key(|site| Reverse(site.contents.len()));
    for bubble in bubbles {
        tree.insert(bubble);
    }
    tree
}

// A bubble tree for the cactus backend, stored in an arena.
struct BubbleTree {
    // The root is at offset 0; children always follow their parents.
    nodes: Vec<(Site, Vec<usize>)>,
}

impl BubbleTree {
    fn new(root: Site) -> Self {
        BubbleTree { nodes: vec![(root, Vec::new())] }
    }

    // Inserts a bubble below the deepest bubble that contains it.
    fn insert(&mut self, site: Site) {
        let mut at = 0;
        loop {
            let child = self.nodes[at].1.iter().copied().find(
                |&child| site.contents.is_subset(&self.nodes[child].0.contents)
            );
            match child {
                Some(child) => { at = child; },
                None => break,
            }
        }
        let offset = self.nodes.len();
        self.nodes.push((site, Vec::new()));
        self.nodes[at].1.push(offset);
    }

    // Propagates content sets upward, so that the contents of each bubble
    // are the union of its subtree.
    fn propagate_contents(&mut self) {
        for offset in (0..self.nodes.len()).rev() {
            let children = self.nodes[offset].1.clone();
            for child in children {
                let contents = self.nodes[child].0.contents.clone();
                self.nodes[offset].0.contents.extend(contents);
            }
        }
    }

    // Returns every bubble except the root in preorder.
    fn into_sites(self) -> Vec<Site> {
        let mut result = Vec::new();
        let mut stack: Vec<usize> = self.nodes[0].1.iter().rev().copied().collect();
        let mut nodes = self.nodes;
        while let Some(offset) = stack.pop() {
            stack.extend(nodes[offset].1.iter().rev());
            let site = std::mem::replace(&mut nodes[offset].0, Site {
                start: NodeTraversal::forward(0),
                end: NodeTraversal::forward(0),
                contents: BTreeSet::new(),
            });
            result.push(site);
        }
        result
    }
}

/// Finds sites with the cactus backend.
///
/// The nodes are sorted pseudo-topologically and the reference source and
/// sink are chosen by rank among the nodes of the reference walk. The
/// untransformed graph is then decomposed into its bridge and cycle
/// components, which are nested by containment into a bubble tree rooted
/// at (source, sink). Content sets propagate upward, and every bubble
/// except the root is emitted. Endpoint ordering and orientation are
/// preserved. Unlike the superbubble backend, this decomposition works on
/// cyclic and reverse-strand regions directly, without length or step
/// budgets.
pub fn find_sites_with_cactus(
    graph: &VariationGraph, ref_path_name: &str
) -> Result<Vec<Site>, String> {
    let ref_walk = graph.walk(ref_path_name).ok_or(
        format!("Cannot find reference walk {}", ref_path_name)
    )?;
    let ranks = pseudo_topological_ranks(graph);

    // Reference source and sink by rank.
    let mut source: Option<(usize, NodeTraversal)> = None;
    let mut sink: Option<(usize, NodeTraversal)> = None;
    for mapping in ref_walk.iter() {
        let rank = *ranks.get(&mapping.node).ok_or(
            format!("Reference walk visits a missing node {}", mapping.node)
        )?;
        if source.is_none() || rank < source.unwrap().0 {
            source = Some((rank, mapping.traversal()));
        }
        if sink.is_none() || rank > sink.unwrap().0 {
            sink = Some((rank, mapping.traversal()));
        }
    }
    let source = source.ok_or(String::from("Empty reference walk"))?.1;
    let sink = sink.unwrap().1;

    let mut tree = cactusbubble_tree(graph, (source, sink));
    tree.propagate_contents();

    Ok(tree.into_sites())
}

//-----------------------------------------------------------------------------
