//! Scoring read consistency with candidate alleles.
//!
//! For every informative read and every candidate allele of a site, the
//! scorer produces an [`Affinity`]: whether the read traversed the site on
//! the reverse strand, whether its sequence is consistent with the allele,
//! and a numeric affinity in `[0, 1]`.
//!
//! The fast path extracts the part of the read's walk that lies within the
//! site and compares spelled sequences: a read anchored at both endpoints
//! must match the allele exactly, and a read anchored at one endpoint must
//! spell a prefix or a suffix of the allele. The optional re-alignment path
//! additionally aligns the read sequence against the allele flanked by the
//! read's own out-of-site context and uses the alignment identity as the
//! affinity.

use crate::alignment::Alignment;
use crate::graph::{NodeTraversal, VariationGraph};
use crate::sites::Site;
use crate::utils;

use std::collections::{BTreeMap, BTreeSet};

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Consistency of one read with one candidate allele.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Affinity {
    /// Did the read traverse the site opposite to the start-to-end direction?
    pub is_reverse: bool,
    /// Is the read sequence consistent with the allele?
    pub consistent: bool,
    /// Affinity weight in `[0, 1]`.
    pub affinity: f64,
}

//-----------------------------------------------------------------------------

// Returns the part of the read's walk that lies within the site contents.
fn traversal_of_site(graph: &VariationGraph, site: &Site, name: &str) -> Vec<NodeTraversal> {
    let mut result: Vec<NodeTraversal> = Vec::new();
    if let Some(mappings) = graph.walk(name) {
        for mapping in mappings.iter() {
            if site.contents.contains(&mapping.node) {
                result.push(mapping.traversal());
            }
        }
    }
    result
}

// A read is informative if it visits at least two distinct content nodes or
// an internal content node. A read touching only the start or only the end
// says nothing about the inside of the site.
fn is_informative(site: &Site, sub_walk: &[NodeTraversal]) -> bool {
    let mut touched: BTreeSet<_> = sub_walk.iter().map(|traversal| traversal.node).collect();
    if touched.len() >= 2 {
        return true;
    }
    touched.remove(&site.start.node);
    touched.remove(&site.end.node);
    !touched.is_empty()
}

// Returns the read names that visit the site contents and are present in
// the read table.
fn relevant_reads(
    graph: &VariationGraph, site: &Site, reads: &BTreeMap<String, Alignment>
) -> BTreeSet<String> {
    let mut result: BTreeSet<String> = BTreeSet::new();
    for &id in site.contents.iter() {
        for (name, _) in graph.walks_visiting(id).iter() {
            if reads.contains_key(name) {
                result.insert(name.clone());
            }
        }
    }
    result
}

// Normalizes the sub-walk to the start-to-end direction of the site.
// Returns `true` if the read really traversed the site backward.
fn normalize_direction(site: &Site, sub_walk: &mut Vec<NodeTraversal>) -> bool {
    let front = *sub_walk.first().unwrap();
    let back = *sub_walk.last().unwrap();
    if front == site.end.reverse() || back == site.start.reverse() {
        sub_walk.reverse();
        for traversal in sub_walk.iter_mut() {
            *traversal = traversal.reverse();
        }
        true
    } else {
        false
    }
}

// Decides consistency of the read sequence with each allele sequence based
// on how the sub-walk is anchored to the site endpoints.
fn consistency_by_anchoring(
    site: &Site, name: &str, sub_walk: &[NodeTraversal], seq: &[u8],
    allele_strings: &[Vec<u8>], is_reverse: bool
) -> Vec<Affinity> {
    let front = *sub_walk.first().unwrap();
    let back = *sub_walk.last().unwrap();
    let mut result = Vec::with_capacity(allele_strings.len());
    for allele in allele_strings.iter() {
        let consistent = if front == site.start && back == site.end {
            // Anchored at both ends: need an exact match.
            seq == allele.as_slice()
        } else if front == site.start {
            // Anchored at the start only: need a prefix of the allele.
            allele.starts_with(seq)
        } else if back == site.end {
            // Anchored at the end only: need a suffix of the allele.
            allele.ends_with(seq)
        } else {
            eprintln!("Warning: read {} does not touch either end of its site!", name);
            false
        };
        result.push(Affinity {
            is_reverse,
            consistent,
            affinity: if consistent { 1.0 } else { 0.0 },
        });
    }
    result
}

//-----------------------------------------------------------------------------

/// Scores each informative read against each allele by spelled sequence.
///
/// Returns a mapping from read name to affinities parallel to the allele
/// list. This is the default scoring path.
///
/// # Arguments
///
/// * `graph`: The augmented graph with a valid node-to-walks index.
/// * `site`: The site the alleles belong to.
/// * `reads`: The embedded reads by name.
/// * `allele_paths`: The candidate allele walks from the site entry to exit.
/// * `min_recurrence`: The recurrence threshold, used only for deciding
///   whether a read supporting nothing deserves a warning.
pub fn affinities_fast(
    graph: &VariationGraph, site: &Site, reads: &BTreeMap<String, Alignment>,
    allele_paths: &[Vec<NodeTraversal>], min_recurrence: usize
) -> BTreeMap<String, Vec<Affinity>> {
    let mut result: BTreeMap<String, Vec<Affinity>> = BTreeMap::new();

    // Convert the allele walks back to their sequences.
    let allele_strings: Vec<Vec<u8>> = allele_paths.iter().map(
        |path| graph.spelled_sequence(path)
    ).collect();

    for name in relevant_reads(graph, site, reads).iter() {
        let mut sub_walk = traversal_of_site(graph, site, name);
        if sub_walk.is_empty() || !is_informative(site, &sub_walk) {
            continue;
        }
        let is_reverse = normalize_direction(site, &mut sub_walk);
        let seq = graph.spelled_sequence(&sub_walk);
        let affinities = consistency_by_anchoring(
            site, name, &sub_walk, &seq, &allele_strings, is_reverse
        );

        let total_supported = affinities.iter().filter(|affinity| affinity.consistent).count();
        if total_supported == 0 && min_recurrence <= 1 {
            eprintln!(
                "Warning: read {} with site sequence {} supports no allele!",
                name, String::from_utf8_lossy(&seq)
            );
        }
        result.insert(name.clone(), affinities);
    }

    result
}

//-----------------------------------------------------------------------------

// Returns the fraction of aligned columns that are matches.
fn alignment_identity(operations: &[AlignmentOperation]) -> f64 {
    let mut matches = 0;
    let mut columns = 0;
    for operation in operations.iter() {
        match operation {
            AlignmentOperation::Match => {
                matches += 1;
                columns += 1;
            },
            AlignmentOperation::Subst | AlignmentOperation::Del | AlignmentOperation::Ins => {
                columns += 1;
            },
            _ => {},
        }
    }
    if columns == 0 { 0.0 } else { matches as f64 / columns as f64 }
}

// Aligns the read sequence against the target in both orientations and
// returns (identity of the better orientation, was the reverse better).
fn best_identity(read_seq: &[u8], target: &[u8]) -> (f64, bool) {
    if read_seq.is_empty() || target.is_empty() || read_seq.len() > target.len() {
        return (0.0, false);
    }
    let score = |a: u8, b: u8| if a == b { 1i32 } else { -1i32 };
    let mut aligner = Aligner::with_capacity(read_seq.len(), target.len(), -4, -1, &score);
    let forward = aligner.semiglobal(read_seq, target);
    let reverse_seq = utils::reverse_complement(read_seq);
    let reverse = aligner.semiglobal(&reverse_seq, target);
    if reverse.score > forward.score {
        (alignment_identity(&reverse.operations), true)
    } else {
        (alignment_identity(&forward.operations), false)
    }
}

/// Scores each informative read against each allele by re-alignment.
///
/// The target for each allele is the allele sequence flanked by the spelled
/// sequence of the read's walk outside the site. The read sequence is
/// aligned in both orientations and the affinity is the identity of the
/// better one. Consistency is still decided by the strict anchored match,
/// as the identity threshold does not participate in the genotyping math.
pub fn affinities_with_realignment(
    graph: &VariationGraph, site: &Site, reads: &BTreeMap<String, Alignment>,
    allele_paths: &[Vec<NodeTraversal>], min_recurrence: usize
) -> BTreeMap<String, Vec<Affinity>> {
    let mut result = affinities_fast(graph, site, reads, allele_paths, min_recurrence);
    let allele_strings: Vec<Vec<u8>> = allele_paths.iter().map(
        |path| graph.spelled_sequence(path)
    ).collect();

    for (name, affinities) in result.iter_mut() {
        // The read's surrounding context: its walk before entering and
        // after leaving the site, normalized to the start-to-end direction
        // of the site. The read sequence itself stays in its own
        // orientation, and the alignment decides the strand.
        let mappings = match graph.walk(name) {
            Some(mappings) => mappings,
            None => continue,
        };
        let site_reverse = affinities.first().map_or(false, |affinity| affinity.is_reverse);
        let mut full: Vec<NodeTraversal> = mappings.iter().map(|m| m.traversal()).collect();
        if site_reverse {
            full.reverse();
            for traversal in full.iter_mut() {
                *traversal = traversal.reverse();
            }
        }
        let first_inside = full.iter().position(|t| site.contents.contains(&t.node));
        let last_inside = full.iter().rposition(|t| site.contents.contains(&t.node));
        let (first_inside, last_inside) = match (first_inside, last_inside) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        let prefix = graph.spelled_sequence(&full[..first_inside]);
        let suffix = graph.spelled_sequence(&full[last_inside + 1..]);
        let read_seq = graph.walk_sequence(name).unwrap_or_default();

        for (allele, affinity) in allele_strings.iter().zip(affinities.iter_mut()) {
            let mut target = Vec::with_capacity(prefix.len() + allele.len() + suffix.len());
            target.extend_from_slice(&prefix);
            target.extend_from_slice(allele);
            target.extend_from_slice(&suffix);
            let (identity, is_reverse) = best_identity(&read_seq, &target);
            affinity.affinity = identity;
            affinity.is_reverse = is_reverse;
        }
    }

    result
}

//-----------------------------------------------------------------------------
