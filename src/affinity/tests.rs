use super::*;

use crate::graph::Orientation;
use crate::internal::{
    augment_and_index, forward_traversals, forward_walk, full_match_reads, site, snp_graph,
    snp_pileup,
};

//-----------------------------------------------------------------------------

fn snp_site() -> Site {
    site(NodeTraversal::forward(1), NodeTraversal::forward(4), &[1, 2, 3, 4])
}

fn snp_alleles() -> Vec<Vec<NodeTraversal>> {
    vec![forward_traversals(&[1, 2, 4]), forward_traversals(&[1, 3, 4])]
}

fn read_table(reads: &[Alignment]) -> BTreeMap<String, Alignment> {
    reads.iter().map(|read| (read.name.clone(), read.clone())).collect()
}

//-----------------------------------------------------------------------------

#[test]
fn anchored_both_ends() {
    let (graph, reads) = snp_pileup(2, 3);
    let affinities = affinities_fast(&graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2);

    assert_eq!(affinities.len(), 5, "Wrong number of scored reads");
    for (name, list) in affinities.iter() {
        assert_eq!(list.len(), 2, "Wrong number of affinities for {}", name);
        let expected_allele = if name.starts_with("over_b") { 0 } else { 1 };
        for (offset, affinity) in list.iter().enumerate() {
            assert_eq!(
                affinity.consistent, offset == expected_allele,
                "Wrong consistency for {} against allele {}", name, offset
            );
            assert_eq!(
                affinity.affinity,
                if affinity.consistent { 1.0 } else { 0.0 },
                "Affinity does not follow consistency for {}", name
            );
            assert!(!affinity.is_reverse, "Forward read {} marked as reverse", name);
        }
    }
}

#[test]
fn reverse_strand_read() {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    let path = vec![
        NodeTraversal::new(4, Orientation::Reverse),
        NodeTraversal::new(2, Orientation::Reverse),
        NodeTraversal::new(1, Orientation::Reverse),
    ];
    let reads = vec![Alignment::full_match("backward", path, 9, None, None)];
    augment_and_index(&mut graph, &reads);

    let affinities = affinities_fast(&graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2);
    let list = &affinities["backward"];
    assert!(list[0].is_reverse, "Reverse read was not detected");
    assert!(list[0].consistent, "Reverse read is not consistent with its allele");
    assert!(!list[1].consistent, "Reverse read is consistent with the wrong allele");
}

#[test]
fn prefix_and_suffix_anchoring() {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    // One read covers the entry and the G allele, another the T allele and the exit.
    let mut reads = full_match_reads(&graph, "start_anchored", 1, &[1, 2], None, None);
    reads.extend(full_match_reads(&graph, "end_anchored", 1, &[3, 4], None, None));
    augment_and_index(&mut graph, &reads);

    let affinities = affinities_fast(&graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2);

    // ACGTG is a prefix of ACGTGTTAA but not of ACGTTTTAA.
    let list = &affinities["start_anchored_0"];
    assert!(list[0].consistent, "Prefix read is not consistent with the G allele");
    assert!(!list[1].consistent, "Prefix read is consistent with the T allele");

    // TTTAA is a suffix of ACGTTTTAA but not of ACGTGTTAA.
    let list = &affinities["end_anchored_0"];
    assert!(!list[0].consistent, "Suffix read is consistent with the G allele");
    assert!(list[1].consistent, "Suffix read is not consistent with the T allele");
}

#[test]
fn uninformative_reads_are_skipped() {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    // A read visiting only the entry node carries no information about the site.
    let reads = full_match_reads(&graph, "entry_only", 1, &[1], None, None);
    augment_and_index(&mut graph, &reads);

    let affinities = affinities_fast(&graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2);
    assert!(affinities.is_empty(), "Uninformative read was scored");
}

#[test]
fn internal_node_read_is_informative() {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    // A read visiting only the internal node 2 is informative but anchored
    // at neither end, so it is not consistent with anything.
    let reads = full_match_reads(&graph, "internal", 1, &[2], None, None);
    augment_and_index(&mut graph, &reads);

    let affinities = affinities_fast(&graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2);
    let list = &affinities["internal_0"];
    assert!(!list[0].consistent && !list[1].consistent, "Unanchored read is consistent");
}

#[test]
fn realignment_identities() {
    let (graph, reads) = snp_pileup(2, 2);
    let affinities = affinities_with_realignment(
        &graph, &snp_site(), &read_table(&reads), &snp_alleles(), 2
    );

    for (name, list) in affinities.iter() {
        let expected_allele = if name.starts_with("over_b") { 0 } else { 1 };
        for (offset, affinity) in list.iter().enumerate() {
            if offset == expected_allele {
                assert_eq!(
                    affinity.affinity, 1.0,
                    "Wrong identity for {} against its own allele", name
                );
                assert!(affinity.consistent, "Read {} is not consistent with its own allele", name);
            } else {
                assert!(
                    affinity.affinity < 1.0,
                    "Perfect identity for {} against the other allele", name
                );
                assert!(!affinity.consistent, "Read {} is consistent with the other allele", name);
            }
        }
    }
}

#[test]
fn alignment_identity_computation() {
    use AlignmentOperation::*;
    assert_eq!(alignment_identity(&[Match, Match, Match, Match]), 1.0, "Wrong identity for a perfect match");
    assert_eq!(alignment_identity(&[Match, Subst, Match, Ins]), 0.5, "Wrong identity with edits");
    assert_eq!(alignment_identity(&[]), 0.0, "Wrong identity for an empty alignment");
}

//-----------------------------------------------------------------------------
