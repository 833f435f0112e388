//! A sequence variation graph with embedded walks.
//!
//! The graph is a bidirected graph, where the nodes carry DNA sequences and
//! the edges connect oriented node visits. Named walks are stored as lists of
//! [`Mapping`] objects in a walk table. One of the walks is usually
//! designated the reference walk, and augmentation inserts aligned reads as
//! additional walks.
//!
//! Nodes are stored in an arena indexed by identifier. Edges are stored in
//! canonical orientation, so that an edge and its reverse complement are the
//! same edge. Stepping left or right within a walk is index arithmetic into
//! the walk's mapping list.
//!
//! All query operations take `&self` and are safe for concurrent readers.
//! The node-to-walks index must be rebuilt with
//! [`VariationGraph::rebuild_walk_index`] after the walk table has changed.

use crate::utils;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;


//-----------------------------------------------------------------------------

/// Type of node identifiers in the graph.
pub type NodeId = i64;

/// Orientation of a node visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Orientation {
    /// The visit reads the node sequence as stored.
    Forward,
    /// The visit reads the reverse complement of the node sequence.
    Reverse,
}

impl Orientation {
    /// Returns the opposite orientation.
    pub fn flip(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }

    /// Returns `true` if the orientation is reverse.
    pub fn is_reverse(self) -> bool {
        self == Orientation::Reverse
    }

    /// Returns this orientation, flipped if the condition holds.
    pub fn flip_if(self, condition: bool) -> Self {
        if condition { self.flip() } else { self }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Forward => write!(f, "+"),
            Orientation::Reverse => write!(f, "-"),
        }
    }
}

//-----------------------------------------------------------------------------

/// One oriented visit to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeTraversal {
    /// Identifier of the visited node.
    pub node: NodeId,
    /// Orientation of the visit.
    pub orientation: Orientation,
}

impl NodeTraversal {
    /// Creates a new traversal.
    pub fn new(node: NodeId, orientation: Orientation) -> Self {
        NodeTraversal { node, orientation }
    }

    /// Creates a forward traversal.
    pub fn forward(node: NodeId) -> Self {
        NodeTraversal { node, orientation: Orientation::Forward }
    }

    /// Returns the same visit in the opposite direction.
    pub fn reverse(self) -> Self {
        NodeTraversal { node: self.node, orientation: self.orientation.flip() }
    }
}

impl Display for NodeTraversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.node, self.orientation)
    }
}

//-----------------------------------------------------------------------------

/// An edge between two oriented node visits.
///
/// The edge states that a walk visiting `from` may continue to `to`. The
/// same adjacency can be written in two ways; [`Edge::canonical`] picks one
/// of them deterministically, and the graph stores edges in canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    /// Source of the edge.
    pub from: NodeTraversal,
    /// Destination of the edge.
    pub to: NodeTraversal,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(from: NodeTraversal, to: NodeTraversal) -> Self {
        Edge { from, to }
    }

    /// Returns the same adjacency written in the opposite direction.
    pub fn flip(self) -> Self {
        Edge { from: self.to.reverse(), to: self.from.reverse() }
    }

    /// Returns the canonical form of the edge.
    pub fn canonical(self) -> Self {
        let flipped = self.flip();
        if (self.from, self.to) <= (flipped.from, flipped.to) { self } else { flipped }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

//-----------------------------------------------------------------------------

/// One step of an embedded walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mapping {
    /// Identifier of the visited node.
    pub node: NodeId,
    /// Orientation of the visit.
    pub orientation: Orientation,
    /// Rank of this step within the walk. Ranks increase strictly along the walk.
    pub rank: usize,
}

impl Mapping {
    /// Creates a new mapping.
    pub fn new(node: NodeId, orientation: Orientation, rank: usize) -> Self {
        Mapping { node, orientation, rank }
    }

    /// Returns the node visit of this mapping.
    pub fn traversal(&self) -> NodeTraversal {
        NodeTraversal::new(self.node, self.orientation)
    }
}

//-----------------------------------------------------------------------------

// A node in the arena. The identifier is the arena key.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Node {
    sequence: Vec<u8>,
}

/// A sequence variation graph with embedded walks.
#[derive(Clone, Debug, Default)]
pub struct VariationGraph {
    // Node arena indexed by identifier.
    nodes: BTreeMap<NodeId, Node>,

    // Edges in canonical orientation.
    edges: BTreeSet<Edge>,

    // Walk table from walk name to mappings.
    walks: BTreeMap<String, Vec<Mapping>>,

    // Node-to-walks index: (walk name, mapping offset) pairs for each node.
    // Only valid after `rebuild_walk_index`.
    walk_index: HashMap<NodeId, Vec<(String, usize)>>,
}

impl VariationGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        VariationGraph::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of embedded walks.
    pub fn walk_count(&self) -> usize {
        self.walks.len()
    }

    /// Returns `true` if the graph contains a node with the given identifier.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the sequence of the node, or [`None`] if there is no such node.
    pub fn sequence(&self, id: NodeId) -> Option<&[u8]> {
        self.nodes.get(&id).map(|node| node.sequence.as_slice())
    }

    /// Returns the sequence length of the node, or [`None`] if there is no such node.
    pub fn sequence_len(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id).map(|node| node.sequence.len())
    }

    /// Returns an iterator over node identifiers in increasing order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Returns an unused node identifier.
    pub fn fresh_id(&self) -> NodeId {
        self.nodes.keys().next_back().map_or(1, |id| id + 1)
    }

    /// Inserts a node with the given identifier and sequence.
    ///
    /// Returns an error if the identifier is not positive, the sequence is
    /// empty, or the identifier is already in use.
    pub fn add_node(&mut self, id: NodeId, sequence: Vec<u8>) -> Result<(), String> {
        if id <= 0 {
            return Err(format!("Node identifier {} is not positive", id));
        }
        if sequence.is_empty() {
            return Err(format!("Node {} has an empty sequence", id));
        }
        if self.nodes.contains_key(&id) {
            return Err(format!("Duplicate node identifier {}", id));
        }
        self.nodes.insert(id, Node { sequence });
        Ok(())
    }

    /// Removes the node and all edges incident to it.
    ///
    /// Does not touch the walk table; the caller is responsible for
    /// rewriting any walks that visit the node.
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        let incident: Vec<Edge> = self.edges.iter().filter(
            |edge| edge.from.node == id || edge.to.node == id
        ).copied().collect();
        for edge in incident {
            self.edges.remove(&edge);
        }
    }

    /// Inserts an edge. Both endpoints must exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), String> {
        if !self.has_node(edge.from.node) || !self.has_node(edge.to.node) {
            return Err(format!("Edge {} references a missing node", edge));
        }
        self.edges.insert(edge.canonical());
        Ok(())
    }

    /// Returns `true` if a walk visiting `from` may continue directly to `to`.
    pub fn has_edge(&self, from: NodeTraversal, to: NodeTraversal) -> bool {
        self.edges.contains(&Edge::new(from, to).canonical())
    }

    /// Returns an iterator over the edges in canonical orientation.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied()
    }

    /// Returns the edges incident to the given node.
    pub fn edges_of(&self, id: NodeId) -> Vec<Edge> {
        self.edges.iter().filter(
            |edge| edge.from.node == id || edge.to.node == id
        ).copied().collect()
    }

    /// Returns the oriented visits that may directly follow the given visit.
    ///
    /// This iterates over the edge set. Algorithms that need repeated
    /// adjacency queries should build their own adjacency lists from
    /// [`VariationGraph::edges`].
    pub fn successors(&self, from: NodeTraversal) -> Vec<NodeTraversal> {
        let mut result = Vec::new();
        for edge in self.edges.iter() {
            if edge.from == from {
                result.push(edge.to);
            }
            if edge.to == from.reverse() {
                result.push(edge.from.reverse());
            }
        }
        result
    }

    //-----------------------------------------------------------------------------

    /// Returns the mappings of the walk, or [`None`] if there is no such walk.
    pub fn walk(&self, name: &str) -> Option<&[Mapping]> {
        self.walks.get(name).map(|mappings| mappings.as_slice())
    }

    /// Returns an iterator over walk names in lexicographic order.
    pub fn walk_names(&self) -> impl Iterator<Item = &str> {
        self.walks.keys().map(|name| name.as_str())
    }

    /// Returns an iterator over the walks.
    pub fn walks(&self) -> impl Iterator<Item = (&str, &[Mapping])> {
        self.walks.iter().map(|(name, mappings)| (name.as_str(), mappings.as_slice()))
    }

    /// Inserts a walk under the given name.
    ///
    /// Returns an error if the name is empty or already in use, the walk is
    /// empty, a mapping references a missing node, ranks do not strictly
    /// increase, or consecutive mappings are not connected by an edge.
    pub fn insert_walk(&mut self, name: &str, mappings: Vec<Mapping>) -> Result<(), String> {
        if name.is_empty() {
            return Err(String::from("Cannot insert a walk without a name"));
        }
        if self.walks.contains_key(name) {
            return Err(format!("Duplicate walk name {}", name));
        }
        if mappings.is_empty() {
            return Err(format!("Walk {} is empty", name));
        }
        self.validate_mappings(name, &mappings)?;
        self.walks.insert(name.to_string(), mappings);
        Ok(())
    }

    // Checks the walk invariants for the given mappings.
    fn validate_mappings(&self, name: &str, mappings: &[Mapping]) -> Result<(), String> {
        for window in mappings.windows(2) {
            if window[0].rank >= window[1].rank {
                return Err(format!("Ranks do not increase in walk {}", name));
            }
            if !self.has_edge(window[0].traversal(), window[1].traversal()) {
                return Err(format!(
                    "Walk {} steps from {} to {} without an edge",
                    name, window[0].traversal(), window[1].traversal()
                ));
            }
        }
        for mapping in mappings.iter() {
            if !self.has_node(mapping.node) {
                return Err(format!("Walk {} visits a missing node {}", name, mapping.node));
            }
        }
        Ok(())
    }

    /// Gives mutable access to the walk table for augmentation.
    pub(crate) fn walks_mut(&mut self) -> &mut BTreeMap<String, Vec<Mapping>> {
        &mut self.walks
    }

    //-----------------------------------------------------------------------------

    /// Rebuilds the node-to-walks index from the walk table.
    pub fn rebuild_walk_index(&mut self) {
        self.walk_index.clear();
        for (name, mappings) in self.walks.iter() {
            for (offset, mapping) in mappings.iter().enumerate() {
                self.walk_index.entry(mapping.node).or_default().push((name.clone(), offset));
            }
        }
    }

    /// Returns the (walk name, mapping offset) pairs that visit the node.
    ///
    /// The result is empty until [`VariationGraph::rebuild_walk_index`] has
    /// been called after the last change to the walk table.
    pub fn walks_visiting(&self, id: NodeId) -> &[(String, usize)] {
        self.walk_index.get(&id).map_or(&[], |visits| visits.as_slice())
    }

    /// Returns the mapping to the left of the given mapping within its walk.
    pub fn traverse_left(&self, name: &str, offset: usize) -> Option<&Mapping> {
        let mappings = self.walks.get(name)?;
        if offset == 0 || offset >= mappings.len() {
            return None;
        }
        mappings.get(offset - 1)
    }

    /// Returns the mapping to the right of the given mapping within its walk.
    pub fn traverse_right(&self, name: &str, offset: usize) -> Option<&Mapping> {
        let mappings = self.walks.get(name)?;
        mappings.get(offset + 1)
    }

    //-----------------------------------------------------------------------------

    /// Returns the sequence spelled by the visit.
    ///
    /// # Panics
    ///
    /// Will panic if the node does not exist.
    pub fn oriented_sequence(&self, traversal: NodeTraversal) -> Vec<u8> {
        let sequence = self.sequence(traversal.node).unwrap_or_else(
            || panic!("Node {} does not exist", traversal.node)
        );
        if traversal.orientation.is_reverse() {
            utils::reverse_complement(sequence)
        } else {
            sequence.to_vec()
        }
    }

    /// Returns the sequence spelled by the given visits in order.
    pub fn spelled_sequence(&self, traversals: &[NodeTraversal]) -> Vec<u8> {
        let mut result = Vec::new();
        for traversal in traversals.iter() {
            result.extend_from_slice(&self.oriented_sequence(*traversal));
        }
        result
    }

    /// Returns the sequence spelled by the walk.
    pub fn walk_sequence(&self, name: &str) -> Option<Vec<u8>> {
        let mappings = self.walks.get(name)?;
        let traversals: Vec<NodeTraversal> = mappings.iter().map(|m| m.traversal()).collect();
        Some(self.spelled_sequence(&traversals))
    }

    //-----------------------------------------------------------------------------

    /// Checks the graph invariants.
    ///
    /// Every edge must reference existing nodes, and every walk must satisfy
    /// the mapping invariants.
    pub fn validate(&self) -> Result<(), String> {
        for edge in self.edges.iter() {
            if !self.has_node(edge.from.node) || !self.has_node(edge.to.node) {
                return Err(format!("Edge {} references a missing node", edge));
            }
        }
        for (name, mappings) in self.walks.iter() {
            if mappings.is_empty() {
                return Err(format!("Walk {} is empty", name));
            }
            self.validate_mappings(name, mappings)?;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------
