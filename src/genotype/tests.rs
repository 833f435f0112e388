use super::*;

use crate::affinity::{self, Affinity};
use crate::alleles;
use crate::graph::Orientation;
use crate::internal::{forward_traversals, full_match_reads, site, snp_pileup};

//-----------------------------------------------------------------------------

fn snp_site() -> Site {
    site(NodeTraversal::forward(1), NodeTraversal::forward(4), &[1, 2, 3, 4])
}

fn read_table(reads: &[Alignment]) -> BTreeMap<String, Alignment> {
    reads.iter().map(|read| (read.name.clone(), read.clone())).collect()
}

// Runs the allele enumeration, affinity, and genotyping stages for the SNP
// pileup with the given read counts.
fn genotype_pileup(ref_reads: usize, alt_reads: usize, min_recurrence: usize) -> Locus {
    let (graph, reads) = snp_pileup(ref_reads, alt_reads);
    let site = snp_site();
    let paths = alleles::paths_through_site(&graph, &site, 100, min_recurrence, None);
    assert!(!paths.is_empty(), "No alleles for the pileup");
    let reads = read_table(&reads);
    let affinities = affinity::affinities_fast(&graph, &site, &reads, &paths, min_recurrence);
    let params = ModelParams { min_recurrence, ..ModelParams::default() };
    genotype_site(&graph, &site, &paths, &affinities, &reads, &params)
}

// A synthetic read consistent with the given alleles on the given strand.
fn consistent_read(alleles: usize, supported: &[usize], is_reverse: bool) -> ReadConsistency {
    let affinities = (0..alleles).map(|allele| {
        let consistent = supported.contains(&allele);
        Affinity {
            is_reverse,
            consistent,
            affinity: if consistent { 1.0 } else { 0.0 },
        }
    }).collect();
    ReadConsistency { qual_score: 30.0, mapq: Some(60), affinities }
}

//-----------------------------------------------------------------------------

#[test]
fn het_site() {
    let locus = genotype_pileup(10, 10, 2);
    assert_eq!(locus.alleles.len(), 2, "Wrong number of alleles");
    assert_eq!(locus.genotypes.len(), 3, "Wrong number of genotypes");

    let best = &locus.genotypes[0];
    assert_eq!(best.alleles, [0, 1], "Best genotype is not the het");
    assert!(best.is_het(), "Best genotype is not flagged as het");
    for window in locus.genotypes.windows(2) {
        assert!(
            window[0].log_posterior >= window[1].log_posterior,
            "Genotypes are not sorted by posterior"
        );
    }

    // Both homozygous likelihoods are much worse than the het.
    for genotype in locus.genotypes[1..].iter() {
        assert!(
            best.log_likelihood - genotype.log_likelihood > 10.0,
            "Homozygous genotype {:?} is too close to the het", genotype.alleles
        );
    }

    // All reads are forward; the reference walk is not a read.
    assert_eq!(locus.supports.len(), 2, "Wrong number of supports");
    assert_eq!(locus.supports[0], Support { forward: 10, reverse: 0 }, "Wrong support for allele 0");
    assert_eq!(locus.supports[1], Support { forward: 10, reverse: 0 }, "Wrong support for allele 1");
    assert_eq!(locus.overall_support.total(), 20, "Wrong overall support");
}

#[test]
fn hom_site() {
    // Only the alt allele passes the default recurrence threshold.
    let locus = genotype_pileup(0, 20, 2);
    assert_eq!(locus.alleles.len(), 1, "Wrong number of alleles");
    let best = &locus.genotypes[0];
    assert_eq!(best.alleles, [0, 0], "Best genotype is not the hom");
    assert_eq!(locus.supports[0], Support { forward: 20, reverse: 0 }, "Wrong allele support");
}

#[test]
fn posterior_monotonicity() {
    // Relative posterior of {0, 0} grows as more reads support allele 0.
    let relative = |locus: &Locus| -> f64 {
        let hom = locus.genotypes.iter().find(|g| g.alleles == [0, 0]).unwrap();
        let best_other = locus.genotypes.iter().filter(|g| g.alleles != [0, 0]).map(
            |g| g.log_posterior
        ).fold(f64::NEG_INFINITY, f64::max);
        hom.log_posterior - best_other
    };
    let balanced = relative(&genotype_pileup(10, 10, 2));
    let skewed = relative(&genotype_pileup(15, 5, 2));
    let one_sided = relative(&genotype_pileup(19, 2, 2));
    assert!(skewed > balanced, "Posterior of the hom did not increase with support");
    assert!(one_sided > skewed, "Posterior of the hom did not keep increasing");
}

#[test]
fn strand_term_response() {
    // Holding total support fixed, an even strand split beats a one-sided one.
    let even: Vec<ReadConsistency> = (0..20).map(
        |i| consistent_read(1, &[0], i % 2 == 0)
    ).collect();
    let one_sided: Vec<ReadConsistency> = (0..20).map(
        |_| consistent_read(1, &[0], false)
    ).collect();
    let genotype = [0, 0];
    let even_ll = genotype_log_likelihood(&genotype, &even, false);
    let one_sided_ll = genotype_log_likelihood(&genotype, &one_sided, false);
    assert!(even_ll > one_sided_ll, "Even strand split is not preferred");
}

#[test]
fn strand_biased_het() {
    // 20 forward reads on one allele: the hom stays above the het, because
    // the het pays both the drawn term and the prior.
    let reads: Vec<ReadConsistency> = (0..20).map(|_| consistent_read(2, &[1], false)).collect();
    let het_ll = genotype_log_likelihood(&[0, 1], &reads, false);
    let hom_ll = genotype_log_likelihood(&[1, 1], &reads, false);
    let params = ModelParams::default();
    let het_posterior = het_ll + genotype_log_prior(&[0, 1], params.het_prior_logprob);
    let hom_posterior = hom_ll + genotype_log_prior(&[1, 1], params.het_prior_logprob);
    assert!(het_ll < 0.0, "Strand term for the het is not negative");
    assert!(hom_posterior > het_posterior, "Strand-biased het beat the hom");
}

#[test]
fn mapq_term() {
    // With use_mapq, a non-supporting read is wrong if it is mismapped or
    // miscalled, which is more likely than miscalled alone.
    let reads = vec![consistent_read(2, &[], false)];
    let without = genotype_log_likelihood(&[0, 0], &reads, false);
    let with = genotype_log_likelihood(&[0, 0], &reads, true);
    assert!(with > without, "Mapping quality did not increase P(wrong)");
}

#[test]
fn genotype_tie_break() {
    // With no reads, homozygous genotypes tie and are ordered by allele pair.
    let (graph, _) = snp_pileup(0, 0);
    let site = snp_site();
    let paths = vec![forward_traversals(&[1, 2, 4]), forward_traversals(&[1, 3, 4])];
    let affinities = BTreeMap::new();
    let reads = BTreeMap::new();
    let locus = genotype_site(&graph, &site, &paths, &affinities, &reads, &ModelParams::default());
    let order: Vec<[usize; 2]> = locus.genotypes.iter().map(|g| g.alleles).collect();
    assert_eq!(order, vec![[0, 0], [1, 1], [0, 1]], "Wrong tie-broken genotype order");
}

//-----------------------------------------------------------------------------

// Quality trimming.

#[test]
fn quality_trimming() {
    let (graph, _) = snp_pileup(1, 0);
    // An inner site between nodes 2 and 4.
    let inner = site(NodeTraversal::forward(2), NodeTraversal::forward(4), &[2, 4]);
    let mut read = full_match_reads(&graph, "ramp", 1, &[1, 2, 4], None, None).remove(0);
    read.name = String::from("over_b_0");
    read.base_quality = Some((0..9).collect());

    let trimmed = qualities_in_site(&graph, &inner, &read);
    assert_eq!(trimmed, vec![4, 5, 6, 7, 8], "Wrong trimmed qualities");

    // The whole walk lies inside the full site.
    let full = snp_site();
    let trimmed = qualities_in_site(&graph, &full, &read);
    assert_eq!(trimmed.len(), 9, "Wrong trimmed length for the full site");
}

#[test]
fn quality_trimming_through_reverse_entry() {
    let mut graph = crate::internal::snp_graph();
    graph.insert_walk("ref", crate::internal::forward_walk(&[1, 2, 4])).unwrap();
    let path = vec![
        NodeTraversal::new(4, Orientation::Reverse),
        NodeTraversal::new(2, Orientation::Reverse),
        NodeTraversal::new(1, Orientation::Reverse),
    ];
    let mut read = Alignment::full_match("backward", path, 9, Some((0..9).collect()), None);
    crate::internal::augment_and_index(&mut graph, std::slice::from_ref(&read));
    read.base_quality = Some((0..9).collect());

    // The read enters the inner site through the reversed end.
    let inner = site(NodeTraversal::forward(2), NodeTraversal::forward(4), &[2, 4]);
    let trimmed = qualities_in_site(&graph, &inner, &read);
    assert_eq!(trimmed, vec![0, 1, 2, 3, 4], "Wrong trimmed qualities through the reverse entry");
}

#[test]
fn quality_length_mismatch() {
    let (graph, reads) = snp_pileup(1, 0);
    let mut read = reads[0].clone();
    read.base_quality = Some(vec![30; 4]);
    let trimmed = qualities_in_site(&graph, &snp_site(), &read);
    assert!(trimmed.is_empty(), "Mismatched quality length was not rejected");

    read.base_quality = None;
    let trimmed = qualities_in_site(&graph, &snp_site(), &read);
    assert!(trimmed.is_empty(), "Missing qualities were not rejected");
}

#[test]
fn mean_quality_defaults() {
    assert_eq!(mean_quality(&[], 15.0), 15.0, "Wrong default quality");
    assert_eq!(mean_quality(&[10, 20, 30], 15.0), 20.0, "Wrong mean quality");
    assert_eq!(mean_quality(&[10, 11], 15.0), 11.0, "Mean quality is not rounded");
}

//-----------------------------------------------------------------------------
