//! Enumerating the allele walks through a site.
//!
//! An allele walk starts at the site entry and ends at the site exit, and
//! its spelled sequence is the allele. Candidate walks come from the walks
//! embedded in the graph: every walk that touches both endpoints is
//! followed from each of its visits to the start node until it reaches the
//! expected exit traversal or runs out of steps. Candidates are keyed by
//! their spelled sequence, which collapses mechanical duplications and
//! folds sequence-identical routes into a single allele, and alleles seen
//! in fewer source walks than the recurrence threshold are dropped.

use crate::graph::{NodeTraversal, VariationGraph};
use crate::sites::Site;

use std::collections::{BTreeMap, BTreeSet};


//-----------------------------------------------------------------------------

// Follows the walk from its visit at the start node of the site and records
// the candidate allele if the walk reaches the exit.
fn trace_walk(
    graph: &VariationGraph, site: &Site, name: &str, start_offset: usize,
    max_steps: usize,
    results: &mut BTreeMap<Vec<u8>, (Vec<NodeTraversal>, usize)>
) {
    let mappings = match graph.walk(name) {
        Some(mappings) => mappings,
        None => return,
    };

    // Do we walk left (true) or right (false) from this visit? If the start
    // is a forward traversal and the visit is forward, we go right. If
    // either is backward we go left, and if both are backward we go right
    // again.
    let first = &mappings[start_offset];
    let traversal_direction = first.orientation != site.start.orientation;

    // In which orientation do we expect to find the end node? When walking
    // left, we expect it in the opposite of its own orientation.
    let expected_end_orientation = site.end.orientation.flip_if(traversal_direction);

    let mut path_traversed: Vec<NodeTraversal> = Vec::new();
    let mut allele_seq: Vec<u8> = Vec::new();
    let mut steps = 0;
    let mut at = Some(start_offset);

    while let Some(offset) = at {
        if steps >= max_steps {
            break;
        }
        let mapping = &mappings[offset];
        let visit = NodeTraversal::new(
            mapping.node, mapping.orientation.flip_if(traversal_direction)
        );
        path_traversed.push(visit);
        allele_seq.extend_from_slice(&graph.oriented_sequence(visit));

        if mapping.node == site.end.node && mapping.orientation == expected_end_orientation {
            // We have reached the exit in the expected orientation.
            match results.get_mut(&allele_seq) {
                Some((_, count)) => { *count += 1; },
                None => { results.insert(allele_seq, (path_traversed, 1)); },
            }
            return;
        }

        at = if traversal_direction {
            // Step to the previous mapping within the walk.
            graph.traverse_left(name, offset).map(|_| offset - 1)
        } else {
            graph.traverse_right(name, offset).map(|_| offset + 1)
        };
        steps += 1;
    }
}

// Collects the candidate alleles from the walks named in `sources`, or from
// all walks if no restriction is given.
fn collect_candidates(
    graph: &VariationGraph, site: &Site, max_steps: usize,
    sources: Option<&str>
) -> BTreeMap<Vec<u8>, (Vec<NodeTraversal>, usize)> {
    let mut results: BTreeMap<Vec<u8>, (Vec<NodeTraversal>, usize)> = BTreeMap::new();

    let start_visits = graph.walks_visiting(site.start.node);
    let end_visits = graph.walks_visiting(site.end.node);
    if start_visits.is_empty() || end_visits.is_empty() {
        return results;
    }

    // Only walks that visit both endpoints can spell a full allele.
    let end_names: BTreeSet<&str> = end_visits.iter().map(|(name, _)| name.as_str()).collect();
    for (name, offset) in start_visits.iter() {
        if let Some(source) = sources {
            if name != source {
                continue;
            }
        }
        if !end_names.contains(name.as_str()) {
            continue;
        }
        trace_walk(graph, site, name, *offset, max_steps, &mut results);
    }
    results
}

/// Returns the allele walks through the site supported by embedded walks.
///
/// Each allele walk begins at `site.start` and ends at `site.end`, and the
/// walks are deduplicated by spelled sequence and ordered by it. Alleles
/// with fewer than `min_recurrence` source walks are dropped. The walk
/// named in `forced_reference` contributes its allele even below the
/// threshold. Returns an empty list if no embedded walk connects the
/// endpoints.
///
/// # Arguments
///
/// * `graph`: The augmented graph with a valid node-to-walks index.
/// * `site`: The site to enumerate.
/// * `max_steps`: Per-walk cap on the number of steps from the entry.
/// * `min_recurrence`: Minimum number of source walks per allele.
/// * `forced_reference`: Name of a walk whose allele is always kept.
pub fn paths_through_site(
    graph: &VariationGraph, site: &Site,
    max_steps: usize, min_recurrence: usize,
    forced_reference: Option<&str>
) -> Vec<Vec<NodeTraversal>> {
    let results = collect_candidates(graph, site, max_steps, None);

    let mut kept: Vec<Vec<NodeTraversal>> = Vec::new();
    let mut kept_sequences: BTreeSet<Vec<u8>> = BTreeSet::new();
    for (sequence, (path, count)) in results.into_iter() {
        if count < min_recurrence {
            // Not enough source walks to justify the allele. Note that the
            // reference walk counts as a single recurrence, so it may be
            // dropped if nothing else covers it.
            continue;
        }
        kept_sequences.insert(sequence);
        kept.push(path);
    }

    if let Some(reference) = forced_reference {
        let reference_candidates = collect_candidates(graph, site, max_steps, Some(reference));
        for (sequence, (path, _)) in reference_candidates.into_iter() {
            if !kept_sequences.contains(&sequence) {
                kept_sequences.insert(sequence);
                kept.push(path);
            }
        }
    }

    kept
}

//-----------------------------------------------------------------------------
