//! Augmenting the graph with aligned reads.
//!
//! Augmentation inserts each read as an embedded walk of the graph. A read
//! that follows existing nodes in full is simply registered in the walk
//! table. Reads that start or end inside a node force the node to be split,
//! and insertion and mismatch edits are materialized as new nodes, so that
//! the spelled sequence of the embedded walk always equals the aligned
//! portion of the read sequence. Deletions become edges that bypass the
//! deleted region.
//!
//! The result is a [`Translation`] that maps each new node back to the
//! interval of the original node it covers. Nodes created for novel
//! sequence (insertions and mismatches) have no source interval.

use crate::alignment::{Alignment, Difference};
use crate::graph::{Edge, Mapping, NodeId, NodeTraversal, Orientation, VariationGraph};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;


//-----------------------------------------------------------------------------

/// The interval of an original node covered by a new node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceInterval {
    /// Identifier of the original node.
    pub id: NodeId,
    /// Covered interval on the forward strand of the original node.
    pub interval: Range<usize>,
    /// Orientation of the new node relative to the original.
    pub orientation: Orientation,
}

/// A mapping from new node identifiers to the original graph.
///
/// Nodes created for novel sequence have no source interval.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translation {
    entries: BTreeMap<NodeId, Option<SourceInterval>>,
}

impl Translation {
    /// Returns the number of new nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if augmentation did not create any nodes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the node was created by augmentation.
    pub fn is_new(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the source interval for the node.
    ///
    /// Returns [`None`] if the node is not new or carries novel sequence.
    pub fn source(&self, id: NodeId) -> Option<&SourceInterval> {
        self.entries.get(&id).and_then(|source| source.as_ref())
    }

    /// Returns an iterator over (new node, source) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<&SourceInterval>)> {
        self.entries.iter().map(|(id, source)| (*id, source.as_ref()))
    }

    fn insert(&mut self, id: NodeId, source: Option<SourceInterval>) {
        self.entries.insert(id, source);
    }
}

//-----------------------------------------------------------------------------

// One piece of an edited walk: either an interval of an existing node or
// novel sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
enum WalkPiece {
    // An interval on the forward strand of an existing node, visited in the
    // given orientation.
    Segment { node: NodeId, orientation: Orientation, range: Range<usize> },
    // Novel sequence from an insertion or mismatch edit.
    Insert { sequence: Vec<u8> },
}

// Cursor over the aligned portion of a target path.
struct PathCursor<'a> {
    graph: &'a VariationGraph,
    path: &'a [NodeTraversal],
    // Offset of the current node in the path.
    node: usize,
    // Oriented offset within the current node.
    offset: usize,
}

impl<'a> PathCursor<'a> {
    fn new(graph: &'a VariationGraph, path: &'a [NodeTraversal]) -> Self {
        PathCursor { graph, path, node: 0, offset: 0 }
    }

    fn node_len(&self) -> Result<usize, String> {
        let traversal = self.path[self.node];
        self.graph.sequence_len(traversal.node).ok_or(
            format!("Target path visits a missing node {}", traversal.node)
        )
    }

    // Consumes the given number of target bases. If `pieces` is given, the
    // consumed intervals are appended to it as segments.
    fn consume(&mut self, len: usize, mut pieces: Option<&mut Vec<WalkPiece>>) -> Result<(), String> {
        let mut remaining = len;
        while remaining > 0 {
            if self.node >= self.path.len() {
                return Err(String::from("Difference string does not fit the target path"));
            }
            let traversal = self.path[self.node];
            let node_len = self.node_len()?;
            let take = remaining.min(node_len - self.offset);
            if take > 0 {
                if let Some(pieces) = pieces.as_mut() {
                    let oriented = self.offset..self.offset + take;
                    let range = match traversal.orientation {
                        Orientation::Forward => oriented,
                        Orientation::Reverse => node_len - oriented.end..node_len - oriented.start,
                    };
                    pieces.push(WalkPiece::Segment {
                        node: traversal.node,
                        orientation: traversal.orientation,
                        range,
                    });
                }
                self.offset += take;
                remaining -= take;
            }
            if self.offset >= node_len {
                self.node += 1;
                self.offset = 0;
            }
        }
        Ok(())
    }
}

// Converts the aligned portion of the read into walk pieces.
fn edited_walk(graph: &VariationGraph, alignment: &Alignment) -> Result<Vec<WalkPiece>, String> {
    for traversal in alignment.path.iter() {
        if !graph.has_node(traversal.node) {
            return Err(format!(
                "Read {} is aligned to a missing node {}", alignment.name, traversal.node
            ));
        }
    }

    let mut cursor = PathCursor::new(graph, &alignment.path);
    let mut pieces: Vec<WalkPiece> = Vec::new();

    // Skip the unaligned prefix of the target path.
    cursor.consume(alignment.path_interval.start, None).map_err(
        |err| format!("Read {}: {}", alignment.name, err)
    )?;

    let full_match = [Difference::Match(alignment.path_interval.len())];
    let ops = alignment.difference.as_deref().unwrap_or(&full_match);
    let mut target_len = 0;
    for op in ops.iter() {
        let result = match op {
            Difference::Match(len) => cursor.consume(*len, Some(&mut pieces)),
            Difference::Mismatch(base) => {
                pieces.push(WalkPiece::Insert { sequence: vec![*base] });
                cursor.consume(1, None)
            },
            Difference::Insertion(sequence) => {
                pieces.push(WalkPiece::Insert { sequence: sequence.clone() });
                Ok(())
            },
            Difference::Deletion(len) => cursor.consume(*len, None),
        };
        result.map_err(|err| format!("Read {}: {}", alignment.name, err))?;
        target_len += op.target_len();
    }

    if target_len != alignment.path_interval.len() {
        return Err(format!(
            "Read {}: difference string covers {} bp of a {} bp target interval",
            alignment.name, target_len, alignment.path_interval.len()
        ));
    }
    if pieces.is_empty() {
        return Err(format!("Read {} has an empty aligned walk", alignment.name));
    }

    Ok(pieces)
}

//-----------------------------------------------------------------------------

// Maps an edge endpoint through the node splits. Entering a node maps to
// the piece on the entry side; leaving maps to the piece on the exit side.
fn map_endpoint(
    splits: &BTreeMap<NodeId, Vec<(NodeId, Range<usize>)>>,
    endpoint: NodeTraversal,
    is_from: bool
) -> NodeTraversal {
    let pieces = match splits.get(&endpoint.node) {
        Some(pieces) => pieces,
        None => return endpoint,
    };
    // A `from` endpoint uses the exit side of the visit; a `to` endpoint the
    // entry side. On the forward strand, the exit side is the last piece.
    let use_last = is_from != endpoint.orientation.is_reverse();
    let piece = if use_last { pieces.last().unwrap() } else { pieces.first().unwrap() };
    NodeTraversal::new(piece.0, endpoint.orientation)
}

// Splits the nodes at the collected breakpoints: creates the piece nodes,
// rewrites edges and existing walks, and removes the original nodes.
fn split_nodes(
    graph: &mut VariationGraph,
    breakpoints: &BTreeMap<NodeId, BTreeSet<usize>>,
    translation: &mut Translation
) -> Result<BTreeMap<NodeId, Vec<(NodeId, Range<usize>)>>, String> {
    let mut splits: BTreeMap<NodeId, Vec<(NodeId, Range<usize>)>> = BTreeMap::new();
    let mut next_id = graph.fresh_id();

    // Create the piece nodes.
    for (&node, offsets) in breakpoints.iter() {
        let node_len = graph.sequence_len(node).ok_or(
            format!("Cannot split a missing node {}", node)
        )?;
        let mut bounds: Vec<usize> = Vec::with_capacity(offsets.len() + 2);
        bounds.push(0);
        bounds.extend(offsets.iter().copied().filter(|&offset| offset > 0 && offset < node_len));
        bounds.push(node_len);
        if bounds.len() <= 2 {
            continue;
        }
        let sequence = graph.sequence(node).unwrap().to_vec();
        let mut pieces: Vec<(NodeId, Range<usize>)> = Vec::with_capacity(bounds.len() - 1);
        for window in bounds.windows(2) {
            let range = window[0]..window[1];
            graph.add_node(next_id, sequence[range.clone()].to_vec())?;
            translation.insert(next_id, Some(SourceInterval {
                id: node,
                interval: range.clone(),
                orientation: Orientation::Forward,
            }));
            pieces.push((next_id, range));
            next_id += 1;
        }
        splits.insert(node, pieces);
    }

    if splits.is_empty() {
        return Ok(splits);
    }

    // Rewrite the edges incident to split nodes.
    let old_edges: Vec<Edge> = graph.edges().collect();
    for edge in old_edges.iter() {
        let from = map_endpoint(&splits, edge.from, true);
        let to = map_endpoint(&splits, edge.to, false);
        if from != edge.from || to != edge.to {
            graph.add_edge(Edge::new(from, to))?;
        }
    }

    // Chain the pieces of each split node together.
    for pieces in splits.values() {
        for window in pieces.windows(2) {
            graph.add_edge(Edge::new(
                NodeTraversal::forward(window[0].0),
                NodeTraversal::forward(window[1].0)
            ))?;
        }
    }

    // Rewrite the existing walks through split nodes.
    let walks = graph.walks_mut();
    for mappings in walks.values_mut() {
        if !mappings.iter().any(|mapping| splits.contains_key(&mapping.node)) {
            continue;
        }
        let mut rewritten: Vec<Mapping> = Vec::with_capacity(mappings.len());
        for mapping in mappings.iter() {
            match splits.get(&mapping.node) {
                Some(pieces) => {
                    let rank = rewritten.len();
                    match mapping.orientation {
                        Orientation::Forward => {
                            for (offset, piece) in pieces.iter().enumerate() {
                                rewritten.push(Mapping::new(piece.0, Orientation::Forward, rank + offset + 1));
                            }
                        },
                        Orientation::Reverse => {
                            for (offset, piece) in pieces.iter().rev().enumerate() {
                                rewritten.push(Mapping::new(piece.0, Orientation::Reverse, rank + offset + 1));
                            }
                        },
                    }
                },
                None => {
                    let rank = rewritten.len() + 1;
                    rewritten.push(Mapping::new(mapping.node, mapping.orientation, rank));
                },
            }
        }
        *mappings = rewritten;
    }

    // The original nodes are no longer needed.
    for &node in splits.keys() {
        graph.remove_node(node);
    }

    Ok(splits)
}

//-----------------------------------------------------------------------------

// Resolves a segment piece to the traversals over the pieces of the split
// node, or to the node itself if it was not split.
fn resolve_segment(
    splits: &BTreeMap<NodeId, Vec<(NodeId, Range<usize>)>>,
    node: NodeId, orientation: Orientation, range: &Range<usize>
) -> Result<Vec<NodeTraversal>, String> {
    let pieces = match splits.get(&node) {
        Some(pieces) => pieces,
        None => return Ok(vec![NodeTraversal::new(node, orientation)]),
    };
    let mut covered: Vec<NodeTraversal> = Vec::new();
    let mut expected = range.start;
    for piece in pieces.iter() {
        if piece.1.start >= range.end || piece.1.end <= range.start {
            continue;
        }
        if piece.1.start != expected {
            return Err(format!("Node {} was not split at offset {}", node, expected));
        }
        covered.push(NodeTraversal::new(piece.0, orientation));
        expected = piece.1.end;
    }
    if expected != range.end {
        return Err(format!("Node {} was not split at offset {}", node, range.end));
    }
    if orientation.is_reverse() {
        covered.reverse();
    }
    Ok(covered)
}

/// Inserts the reads as embedded walks of the graph.
///
/// Every read must have a unique non-empty name that is not already used in
/// the walk table. Unaligned reads are skipped. Returns a [`Translation`]
/// from the nodes created by augmentation back to the original graph.
///
/// After augmentation, the spelled sequence of each read's walk equals the
/// aligned portion of the read sequence, and the node-to-walks index of the
/// graph must be rebuilt.
pub fn augment(graph: &mut VariationGraph, alignments: &[Alignment]) -> Result<Translation, String> {
    let mut translation = Translation::default();

    // Convert the reads into edited walks over the original nodes.
    let mut edited: Vec<(usize, Vec<WalkPiece>)> = Vec::new();
    for (offset, alignment) in alignments.iter().enumerate() {
        if alignment.name.is_empty() {
            return Err(format!("Read {} does not have a name", offset));
        }
        if alignment.is_unaligned() {
            continue;
        }
        let pieces = edited_walk(graph, alignment)?;
        edited.push((offset, pieces));
    }

    // Collect the breakpoints where reads start or end inside a node.
    let mut breakpoints: BTreeMap<NodeId, BTreeSet<usize>> = BTreeMap::new();
    for (_, pieces) in edited.iter() {
        for piece in pieces.iter() {
            if let WalkPiece::Segment { node, range, .. } = piece {
                let node_len = graph.sequence_len(*node).unwrap();
                if range.start > 0 {
                    breakpoints.entry(*node).or_default().insert(range.start);
                }
                if range.end < node_len {
                    breakpoints.entry(*node).or_default().insert(range.end);
                }
            }
        }
    }

    let splits = split_nodes(graph, &breakpoints, &mut translation)?;

    // Embed the reads, creating nodes for novel sequence on the way.
    // Identical inserts at the same anchor share a node.
    let mut inserts: HashMap<(Option<NodeTraversal>, Vec<u8>), NodeId> = HashMap::new();
    for (offset, pieces) in edited.iter() {
        let alignment = &alignments[*offset];
        let mut traversals: Vec<NodeTraversal> = Vec::new();
        for piece in pieces.iter() {
            match piece {
                WalkPiece::Segment { node, orientation, range } => {
                    traversals.extend(resolve_segment(&splits, *node, *orientation, range)?);
                },
                WalkPiece::Insert { sequence } => {
                    let anchor = traversals.last().copied();
                    let key = (anchor, sequence.clone());
                    let node = match inserts.get(&key) {
                        Some(&node) => node,
                        None => {
                            let node = graph.fresh_id();
                            graph.add_node(node, sequence.clone())?;
                            translation.insert(node, None);
                            inserts.insert(key, node);
                            node
                        },
                    };
                    traversals.push(NodeTraversal::forward(node));
                },
            }
        }

        // Novel adjacencies: insertion attachments and deletion bypasses.
        for window in traversals.windows(2) {
            if !graph.has_edge(window[0], window[1]) {
                graph.add_edge(Edge::new(window[0], window[1]))?;
            }
        }

        let mappings: Vec<Mapping> = traversals.iter().enumerate().map(
            |(rank, traversal)| Mapping::new(traversal.node, traversal.orientation, rank + 1)
        ).collect();
        graph.insert_walk(&alignment.name, mappings)?;
    }

    Ok(translation)
}

//-----------------------------------------------------------------------------
