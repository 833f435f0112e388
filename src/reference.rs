//! Anchoring loci onto the reference walk.
//!
//! The [`ReferenceIndex`] records, for every node of the reference walk,
//! the byte offset of its first appearance along the reconstructed
//! reference sequence and the orientation of that appearance. A genotyped
//! [`Locus`] whose site endpoints both lie on the reference can then be
//! rendered into a variant-call record: the reference substring between the
//! endpoints becomes the REF allele, and the spelled interiors of the
//! allele walks become the ALT alleles.

use crate::dist;
use crate::formats::VcfRecord;
use crate::genotype::{Locus, Support};
use crate::graph::{NodeId, NodeTraversal, Orientation, VariationGraph};
use crate::utils;

use std::collections::{BTreeMap, HashMap};


//-----------------------------------------------------------------------------

/// A position index for the reference walk.
#[derive(Clone, Debug)]
pub struct ReferenceIndex {
    /// Maps node identifiers to (offset of first appearance, orientation at
    /// that appearance).
    pub by_id: HashMap<NodeId, (usize, Orientation)>,
    /// Maps reference offsets to the node visits starting at them.
    pub by_start: BTreeMap<usize, NodeTraversal>,
    /// The reconstructed reference sequence.
    pub sequence: Vec<u8>,
}

impl ReferenceIndex {
    /// Builds the index for the given reference walk.
    ///
    /// Walks the reference in rank order, recording the first appearance of
    /// each node and appending its oriented sequence to the reconstructed
    /// reference. Leading non-`ACGTN` characters on the first node are
    /// dropped with a warning. Returns an error if the walk does not exist
    /// or its ranks do not increase.
    pub fn new(graph: &VariationGraph, ref_path_name: &str) -> Result<Self, String> {
        let mappings = graph.walk(ref_path_name).ok_or(
            format!("Cannot find reference walk {}", ref_path_name)
        )?;

        let mut by_id: HashMap<NodeId, (usize, Orientation)> = HashMap::new();
        let mut by_start: BTreeMap<usize, NodeTraversal> = BTreeMap::new();
        let mut reference_sequence: Vec<u8> = Vec::new();
        let mut reference_base = 0;
        let mut last_rank: Option<usize> = None;

        for mapping in mappings.iter() {
            if !by_id.contains_key(&mapping.node) {
                // This is the first time the reference visits this node.
                by_id.insert(mapping.node, (reference_base, mapping.orientation));
                if let Some(last) = last_rank {
                    if mapping.rank <= last {
                        return Err(format!(
                            "Ranks do not increase along reference walk {}", ref_path_name
                        ));
                    }
                }
                last_rank = Some(mapping.rank);
            }

            let mut sequence = graph.sequence(mapping.node).ok_or(
                format!("Reference walk {} visits a missing node {}", ref_path_name, mapping.node)
            )?.to_vec();

            // Rare pathological input: the reference may lead with invalid
            // characters, which would break offset arithmetic.
            while reference_base == 0 && !sequence.is_empty() && !utils::is_canonical_base(sequence[0]) {
                eprintln!(
                    "Warning: dropping invalid leading character {} from node {}",
                    sequence[0] as char, mapping.node
                );
                sequence.remove(0);
            }

            if mapping.orientation.is_reverse() {
                reference_sequence.extend_from_slice(&utils::reverse_complement(&sequence));
            } else {
                reference_sequence.extend_from_slice(&sequence);
            }

            by_start.insert(reference_base, mapping.traversal());
            reference_base += sequence.len();
        }

        Ok(ReferenceIndex { by_id, by_start, sequence: reference_sequence })
    }

    /// Returns the length of the reconstructed reference sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` if the reference sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

//-----------------------------------------------------------------------------

// Spells the interior of an allele walk: the endpoints are anchors, not
// content.
fn allele_to_string(graph: &VariationGraph, allele: &[NodeTraversal]) -> Vec<u8> {
    if allele.len() < 2 {
        return Vec::new();
    }
    utils::sanitize_sequence(&graph.spelled_sequence(&allele[1..allele.len() - 1]))
}

// Adds an allele string to the allele list unless it is already there, and
// returns its alt number.
fn add_alt_allele(alleles: &mut Vec<Vec<u8>>, allele: &[u8]) -> usize {
    for (offset, existing) in alleles.iter().enumerate() {
        if existing.as_slice() == allele {
            return offset;
        }
    }
    alleles.push(allele.to_vec());
    alleles.len() - 1
}

/// Renders a genotyped locus into zero or more variant-call records.
///
/// Both site endpoints must lie on the reference walk and the reference
/// interval between them must run forward; otherwise a diagnostic is
/// printed and no record is produced. If the reference allele or any
/// alternate allele is empty, the base preceding the reference interval is
/// prepended to every allele and the position shifts left by one.
///
/// # Arguments
///
/// * `graph`: The augmented graph.
/// * `index`: The reference index.
/// * `locus`: The genotyped locus.
/// * `sequence_name`: The CHROM field of the records.
/// * `variant_offset`: Added to the 1-based position of each record.
pub fn locus_to_variant(
    graph: &VariationGraph, index: &ReferenceIndex, locus: &Locus,
    sequence_name: &str, variant_offset: usize
) -> Vec<VcfRecord> {
    if locus.alleles.is_empty() || locus.genotypes.is_empty() {
        eprintln!("Warning: cannot turn an empty locus at site {} into a variant", locus.site);
        return Vec::new();
    }

    let first_id = locus.site.start.node;
    let last_id = locus.site.end.node;
    if !index.by_id.contains_key(&first_id) || !index.by_id.contains_key(&last_id) {
        // We need to be anchored to the reference to make a variant.
        eprintln!("Warning: site {} endpoints are not on the reference", locus.site);
        return Vec::new();
    }

    // The stored position of the start node is its first appearance, and
    // the site runs forward from the far end of that node. The stored
    // position of the end node is the past-the-end position of the site.
    let start_len = match graph.sequence_len(first_id) {
        Some(len) => len,
        None => {
            eprintln!("Warning: site {} starts at a missing node", locus.site);
            return Vec::new();
        },
    };
    let interval_start = index.by_id[&first_id].0 + start_len;
    let interval_end = index.by_id[&last_id].0;
    if interval_end < interval_start {
        // The reference interval runs backward.
        eprintln!("Warning: site {} runs backward on the reference; skipped", locus.site);
        return Vec::new();
    }

    let mut ref_string = utils::sanitize_sequence(&index.sequence[interval_start..interval_end]);
    let mut allele_strings: Vec<Vec<u8>> = locus.alleles.iter().map(
        |allele| allele_to_string(graph, allele)
    ).collect();

    // An empty REF or ALT is not expressible in VCF. Prepend the preceding
    // reference base to all alleles and shift the position left.
    let mut position = interval_start;
    let empty_alleles = ref_string.is_empty() || allele_strings.iter().any(|allele| allele.is_empty());
    if empty_alleles {
        if position == 0 {
            eprintln!("Warning: site {} has an empty allele at the reference start", locus.site);
            return Vec::new();
        }
        let prefix = index.sequence[position - 1];
        ref_string.insert(0, prefix);
        for allele in allele_strings.iter_mut() {
            allele.insert(0, prefix);
        }
        position -= 1;
    }

    // The allele list by alt number; REF is always alt number 0.
    let mut alleles: Vec<Vec<u8>> = vec![ref_string.clone()];
    let mut allele_to_alt: Vec<usize> = Vec::with_capacity(allele_strings.len());
    let mut max_alt_number = 0;
    let mut support_by_alt: Vec<Support> = Vec::new();
    for (offset, allele) in allele_strings.iter().enumerate() {
        let alt_number = add_alt_allele(&mut alleles, allele);
        max_alt_number = max_alt_number.max(alt_number);
        allele_to_alt.push(alt_number);
        if offset < locus.supports.len() {
            if support_by_alt.len() <= alt_number {
                support_by_alt.resize(alt_number + 1, Support::default());
            }
            support_by_alt[alt_number] = locus.supports[offset];
        }
    }
    if support_by_alt.len() <= max_alt_number {
        support_by_alt.resize(max_alt_number + 1, Support::default());
    }

    // The most likely genotype, translated to alt numbers.
    let best = &locus.genotypes[0];
    let separator = if best.phased { '|' } else { '/' };
    let genotype_field = format!(
        "{}{}{}",
        allele_to_alt[best.alleles[0]], separator, allele_to_alt[best.alleles[1]]
    );

    let depth = locus.overall_support.total().to_string();
    let allele_depths: Vec<String> = support_by_alt.iter().map(
        |support| support.total().to_string()
    ).collect();

    // Genotype likelihoods in the canonical VCF order, with slots for
    // genotypes that were never enumerated left at infinity.
    let slots = (max_alt_number * (max_alt_number + 1)) / 2 + max_alt_number + 1;
    let mut log_likelihoods = vec![f64::INFINITY; slots];
    for genotype in locus.genotypes.iter() {
        let mut low = allele_to_alt[genotype.alleles[0]];
        let mut high = allele_to_alt[genotype.alleles[1]];
        if low > high {
            std::mem::swap(&mut low, &mut high);
        }
        let slot = (high * (high + 1)) / 2 + low;
        log_likelihoods[slot] = genotype.log_likelihood;
    }
    let likelihoods: Vec<String> = log_likelihoods.iter().map(|&ll| {
        if ll == f64::INFINITY {
            String::from("inf")
        } else {
            // Adding zero keeps negative zero out of the output.
            format!("{}", dist::logprob_to_phred(ll - best.log_likelihood) + 0.0)
        }
    }).collect();

    let record = VcfRecord {
        sequence_name: sequence_name.to_string(),
        position: position + 1 + variant_offset,
        id: String::from("."),
        reference: String::from_utf8_lossy(&ref_string).to_string(),
        alternates: alleles[1..].iter().map(
            |allele| String::from_utf8_lossy(allele).to_string()
        ).collect(),
        quality: 0.0,
        filter: String::from("."),
        info: vec![(String::from("DP"), depth.clone())],
        format: vec![
            String::from("GT"), String::from("DP"), String::from("AD"), String::from("PL"),
        ],
        sample: vec![
            genotype_field,
            depth,
            allele_depths.join(","),
            likelihoods.join(","),
        ],
    };

    vec![record]
}

//-----------------------------------------------------------------------------
