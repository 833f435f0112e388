//! The diploid genotype model.
//!
//! Given the candidate alleles of a site and the affinities of the reads,
//! the genotyper enumerates all unordered diploid genotypes and computes an
//! unnormalized posterior for each. The likelihood combines three terms in
//! log space: every read that supports neither allele of the genotype must
//! be mismapped or miscalled, every supporting read was drawn from the
//! alleles it supports, and the supporting reads of each allele fell on the
//! strands they did under an even strand model. The prior prefers
//! homozygous genotypes.
//!
//! Base qualities are trimmed to the part of the read that lies within the
//! site before averaging. A read with a missing or mismatched quality
//! string falls back to a default sequence quality.

use crate::affinity::Affinity;
use crate::alignment::Alignment;
use crate::dist;
use crate::graph::{NodeTraversal, VariationGraph};
use crate::sites::Site;

use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Parameters of the genotype model.
#[derive(Clone, Debug)]
pub struct ModelParams {
    /// Combine base quality with mapping quality for non-supporting reads.
    pub use_mapq: bool,
    /// Phred-scaled sequence quality used when base qualities are missing.
    pub default_sequence_quality: f64,
    /// Log probability of a heterozygous genotype.
    pub het_prior_logprob: f64,
    /// Recurrence threshold of the allele enumerator; reads supporting no
    /// allele only deserve a warning if no alleles could have been dropped.
    pub min_recurrence: usize,
}

impl ModelParams {
    /// Default phred-scaled sequence quality.
    pub const DEFAULT_SEQUENCE_QUALITY: f64 = 15.0;
    /// Default prior probability of a heterozygous genotype.
    pub const DEFAULT_HET_PRIOR: f64 = 0.001;
    /// Default recurrence threshold.
    pub const DEFAULT_MIN_RECURRENCE: usize = 2;
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            use_mapq: false,
            default_sequence_quality: Self::DEFAULT_SEQUENCE_QUALITY,
            het_prior_logprob: Self::DEFAULT_HET_PRIOR.ln(),
            min_recurrence: Self::DEFAULT_MIN_RECURRENCE,
        }
    }
}

//-----------------------------------------------------------------------------

/// Forward and reverse strand counts of reads supporting something.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Support {
    /// Number of supporting reads on the forward strand.
    pub forward: usize,
    /// Number of supporting reads on the reverse strand.
    pub reverse: usize,
}

impl Support {
    /// Returns the total number of supporting reads.
    pub fn total(&self) -> usize {
        self.forward + self.reverse
    }
}

/// An unordered diploid genotype with its log-space scores.
#[derive(Clone, Debug, PartialEq)]
pub struct Genotype {
    /// Allele indices with `alleles[0] <= alleles[1]`.
    pub alleles: [usize; 2],
    /// Log probability of the reads given the genotype.
    pub log_likelihood: f64,
    /// Log prior probability of the genotype.
    pub log_prior: f64,
    /// Unnormalized log posterior.
    pub log_posterior: f64,
    /// Is the genotype phased?
    pub phased: bool,
}

impl Genotype {
    /// Returns `true` if the genotype is heterozygous.
    pub fn is_het(&self) -> bool {
        self.alleles[0] != self.alleles[1]
    }
}

/// The genotyping result for one site.
#[derive(Clone, Debug, PartialEq)]
pub struct Locus {
    /// The site the locus was called at.
    pub site: Site,
    /// Candidate allele walks through the site.
    pub alleles: Vec<Vec<NodeTraversal>>,
    /// Strand support for each allele, parallel to `alleles`.
    pub supports: Vec<Support>,
    /// Strand support over all reads that support any allele.
    pub overall_support: Support,
    /// Genotypes sorted by descending log posterior.
    pub genotypes: Vec<Genotype>,
}

//-----------------------------------------------------------------------------

/// Returns the base qualities of the read over the part of its walk that
/// lies within the site.
///
/// The walk enters the site when it visits the start traversal or the
/// reversed end traversal, and leaves at the matching exit. If the quality
/// string does not cover the read sequence, the result is empty and the
/// caller falls back to the default quality.
pub fn qualities_in_site(graph: &VariationGraph, site: &Site, alignment: &Alignment) -> Vec<u8> {
    let quality = match alignment.base_quality.as_ref() {
        Some(quality) if quality.len() == alignment.seq_len => quality,
        _ => return Vec::new(),
    };
    let mappings = match graph.walk(&alignment.name) {
        Some(mappings) => mappings,
        None => return Vec::new(),
    };

    let mut result: Vec<u8> = Vec::new();
    let mut in_site = false;
    let mut expected: Option<NodeTraversal> = None;
    // The embedded walk covers the aligned interval of the read.
    let mut quality_pos = alignment.seq_interval.start;

    for mapping in mappings.iter() {
        let traversal = mapping.traversal();
        if !in_site {
            if traversal == site.start {
                // We entered through the start and will leave at the end.
                in_site = true;
                expected = Some(site.end);
            } else if traversal == site.end.reverse() {
                // We entered through the end and will leave at the reversed start.
                in_site = true;
                expected = Some(site.start.reverse());
            }
        }

        let len = graph.sequence_len(mapping.node).unwrap_or(0);
        if in_site {
            for _ in 0..len {
                if quality_pos >= quality.len() {
                    // We ran out of quality values, so base qualities are
                    // not really being used.
                    return Vec::new();
                }
                result.push(quality[quality_pos]);
                quality_pos += 1;
            }
        } else {
            quality_pos += len;
        }

        if in_site && Some(traversal) == expected {
            in_site = false;
        }
    }

    result
}

// Returns the rounded mean of the quality values, or the default when there
// are none.
fn mean_quality(quality: &[u8], default_quality: f64) -> f64 {
    if quality.is_empty() {
        return default_quality;
    }
    let total: f64 = quality.iter().map(|&q| q as f64).sum();
    (total / quality.len() as f64).round()
}

//-----------------------------------------------------------------------------

// Consistency information for one read, with the trimmed quality already
// reduced to a score.
#[derive(Clone, Debug)]
struct ReadConsistency {
    qual_score: f64,
    mapq: Option<usize>,
    affinities: Vec<Affinity>,
}

// Log probability of the reads given the genotype.
//
// Non-supporting reads must be wrong: with mapping qualities, the read is
// wrong unless it is both mapped and called right; otherwise only the call
// matters. Supporting reads were drawn from the alleles they support.
// Finally, the strand split of each allele's support follows an even
// multinomial. Reads supporting multiple alleles are binned per allele
// independently, which double-counts their orientations.
fn genotype_log_likelihood(genotype: &[usize; 2], reads: &[ReadConsistency], use_mapq: bool) -> f64 {
    let mut all_non_supporting_wrong = dist::prob_to_logprob(1.0);
    let mut all_supporting_drawn = dist::prob_to_logprob(1.0);
    let mut strand_counts: BTreeMap<usize, (usize, usize)> = BTreeMap::new();

    for read in reads.iter() {
        let mut consistent_alleles = 0;
        for &allele in genotype.iter() {
            let affinity = &read.affinities[allele];
            if affinity.consistent {
                consistent_alleles += 1;
                let entry = strand_counts.entry(allele).or_insert((0, 0));
                if affinity.is_reverse {
                    entry.1 += 1;
                } else {
                    entry.0 += 1;
                }
            }
        }

        if consistent_alleles == 0 {
            // Given the genotype, the read must be sequenced or mapped wrong.
            let logprob_wrong = if use_mapq {
                let mapq = read.mapq.unwrap_or(0) as f64;
                dist::logprob_invert(
                    dist::logprob_invert(dist::phred_to_logprob(mapq)) +
                    dist::logprob_invert(dist::phred_to_logprob(read.qual_score))
                )
            } else {
                dist::phred_to_logprob(read.qual_score)
            };
            all_non_supporting_wrong += logprob_wrong;
        } else {
            // We must have drawn one of the supported alleles.
            all_supporting_drawn += dist::prob_to_logprob(consistent_alleles as f64 / genotype.len() as f64);
        }
    }

    let mut strands_as_specified = dist::prob_to_logprob(1.0);
    for (forward, reverse) in strand_counts.values() {
        strands_as_specified += dist::multinomial_ln(&[0.5, 0.5], &[*forward, *reverse]);
    }

    all_non_supporting_wrong + all_supporting_drawn + strands_as_specified
}

// Log prior of the genotype: a fixed amount for hets, the inverse for homs.
fn genotype_log_prior(genotype: &[usize; 2], het_prior_logprob: f64) -> f64 {
    if genotype[0] != genotype[1] {
        het_prior_logprob
    } else {
        dist::logprob_invert(het_prior_logprob)
    }
}

//-----------------------------------------------------------------------------

/// Genotypes a site.
///
/// Enumerates all unordered diploid genotypes over the candidate alleles,
/// scores each with the likelihood and prior, and returns a [`Locus`] with
/// per-allele and overall strand support and the genotypes in order of
/// descending posterior. Ties are broken by the lexicographic allele pair.
pub fn genotype_site(
    graph: &VariationGraph, site: &Site, allele_paths: &[Vec<NodeTraversal>],
    affinities: &BTreeMap<String, Vec<Affinity>>,
    reads: &BTreeMap<String, Alignment>,
    params: &ModelParams
) -> Locus {
    let mut read_consistency: Vec<ReadConsistency> = Vec::with_capacity(affinities.len());
    let mut strand_support = vec![Support::default(); allele_paths.len()];
    let mut overall_support = Support::default();

    for (name, read_affinities) in affinities.iter() {
        // Clip the base qualities down to the site.
        let trimmed = reads.get(name).map_or(Vec::new(), |read| qualities_in_site(graph, site, read));
        let qual_score = mean_quality(&trimmed, params.default_sequence_quality);
        let mapq = reads.get(name).and_then(|read| read.mapq);

        let mut is_forward = false;
        let mut is_reverse = false;
        for (offset, affinity) in read_affinities.iter().enumerate() {
            if affinity.consistent {
                if affinity.is_reverse {
                    strand_support[offset].reverse += 1;
                    is_reverse = true;
                } else {
                    strand_support[offset].forward += 1;
                    is_forward = true;
                }
            }
        }

        if is_forward {
            if is_reverse {
                eprintln!("Warning: read {} supports alleles on both strands; calling it forward", name);
            }
            overall_support.forward += 1;
        } else if is_reverse {
            overall_support.reverse += 1;
        } else if params.min_recurrence <= 1 {
            // Reads ought to support at least one allele, unless some
            // alleles were dropped by the recurrence threshold.
            eprintln!("Warning: read {} supports no alleles!", name);
        }

        read_consistency.push(ReadConsistency {
            qual_score, mapq, affinities: read_affinities.clone(),
        });
    }

    // Score every unordered genotype.
    let mut genotypes: Vec<Genotype> = Vec::new();
    for allele1 in 0..allele_paths.len() {
        for allele2 in 0..=allele1 {
            let pair = [allele2, allele1];
            let log_likelihood = genotype_log_likelihood(&pair, &read_consistency, params.use_mapq);
            let log_prior = genotype_log_prior(&pair, params.het_prior_logprob);
            genotypes.push(Genotype {
                alleles: pair,
                log_likelihood,
                log_prior,
                log_posterior: log_likelihood + log_prior,
                phased: false,
            });
        }
    }
    genotypes.sort_by(|a, b| {
        b.log_posterior.partial_cmp(&a.log_posterior).unwrap_or(Ordering::Equal)
            .then_with(|| a.alleles.cmp(&b.alleles))
    });

    Locus {
        site: site.clone(),
        alleles: allele_paths.to_vec(),
        supports: strand_support,
        overall_support,
        genotypes,
    }
}

//-----------------------------------------------------------------------------
