use super::*;

use crate::graph::NodeTraversal;
use crate::internal::{
    add_forward_edge, deletion_graph, forward_walk, full_match_reads, site, snp_graph, snp_pileup,
};

//-----------------------------------------------------------------------------

fn json_params() -> GenotyperParams {
    GenotyperParams {
        output: OutputFormat::Json,
        threads: 2,
        ..GenotyperParams::default()
    }
}

fn vcf_params() -> GenotyperParams {
    GenotyperParams {
        output: OutputFormat::Vcf,
        threads: 2,
        ..GenotyperParams::default()
    }
}

// The SNP graph with a reference walk and unaugmented reads.
fn snp_input(ref_reads: usize, alt_reads: usize) -> (VariationGraph, Vec<Alignment>) {
    let mut graph = snp_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    let mut reads = full_match_reads(&graph, "over_b", ref_reads, &[1, 2, 4], Some(30), Some(60));
    reads.extend(full_match_reads(&graph, "over_c", alt_reads, &[1, 3, 4], Some(30), Some(60)));
    (graph, reads)
}

// Splits the sample column of the first VCF body line into FORMAT values.
fn sample_fields(output: &str) -> Vec<String> {
    let body = output.lines().find(|line| !line.starts_with('#')).expect("No VCF body line");
    let columns: Vec<&str> = body.split('\t').collect();
    columns.last().unwrap().split(':').map(String::from).collect()
}

//-----------------------------------------------------------------------------

#[test]
fn snp_site_as_json() {
    let (mut graph, reads) = snp_input(10, 10);
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &json_params(), &mut output).unwrap();

    assert_eq!(summary.sites, 1, "Wrong number of sites");
    assert_eq!(summary.records, 1, "Wrong number of records");
    // 20 informative reads, 2 alleles each.
    assert_eq!(summary.affinities, 40, "Wrong number of affinities");

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.lines().count(), 1, "Wrong number of output lines");
    assert!(
        text.contains("\"genotypes\": [{\"alleles\": [0, 1]"),
        "Best genotype is not the het: {}", text
    );
    assert!(text.contains("\"overall_support\": {\"forward\": 20, \"reverse\": 0}"), "Wrong overall support");
}

#[test]
fn snp_site_as_vcf() {
    let (mut graph, reads) = snp_input(10, 10);
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &vcf_params(), &mut output).unwrap();
    assert_eq!(summary.records, 1, "Wrong number of records");

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("##fileformat=VCFv4.2\n"), "Missing VCF header");
    assert!(text.contains("\nref\t5\t.\tG\tT\t"), "Wrong variant line: {}", text);

    let fields = sample_fields(&text);
    assert_eq!(fields[0], "0/1", "Wrong genotype");
    assert_eq!(fields[1], "20", "Wrong depth");
    assert_eq!(fields[2], "10,10", "Wrong allelic depths");
    // Both homozygous likelihoods are far above the het.
    let likelihoods: Vec<f64> = fields[3].split(',').map(|x| x.parse().unwrap()).collect();
    assert_eq!(likelihoods[1], 0.0, "Best genotype likelihood is not normalized to 0");
    assert!(likelihoods[0] > 50.0, "Hom ref likelihood is too close: {}", likelihoods[0]);
    assert!(likelihoods[2] > 50.0, "Hom alt likelihood is too close: {}", likelihoods[2]);
}

#[test]
fn homozygous_alt_as_vcf() {
    // Only the alt allele passes the recurrence threshold, so the absent
    // genotypes get infinite likelihoods.
    let (mut graph, reads) = snp_input(0, 20);
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &vcf_params(), &mut output).unwrap();
    assert_eq!(summary.records, 1, "Wrong number of records");

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("\nref\t5\t.\tG\tT\t"), "Wrong variant line: {}", text);
    let fields = sample_fields(&text);
    assert_eq!(fields[0], "1/1", "Wrong genotype");
    assert_eq!(fields[1], "20", "Wrong depth");
    assert_eq!(fields[2], "0,20", "Wrong allelic depths");
    assert_eq!(fields[3], "inf,inf,0", "Wrong genotype likelihoods");
}

#[test]
fn empty_allele_prepends_a_base() {
    // A deletion allele spells the empty string, so the base before the
    // reference interval is prepended and the position shifts left.
    let mut graph = deletion_graph();
    graph.insert_walk("ref", forward_walk(&[1, 2, 4])).unwrap();
    let reads = full_match_reads(&graph, "over_del", 20, &[1, 4], Some(30), Some(60));

    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &vcf_params(), &mut output).unwrap();
    assert_eq!(summary.records, 1, "Wrong number of records");

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("\nref\t4\t.\tTG\tT\t"), "Wrong deletion record: {}", text);
    let fields = sample_fields(&text);
    assert_eq!(fields[0], "1/1", "Wrong genotype");
    assert_eq!(fields[2], "0,20", "Wrong allelic depths");
}

#[test]
fn unanchored_site_is_skipped_in_vcf() {
    // A second component that the reference walk does not touch.
    let (mut graph, mut reads) = snp_input(5, 5);
    graph.add_node(5, b"AC".to_vec()).unwrap();
    graph.add_node(6, b"C".to_vec()).unwrap();
    graph.add_node(7, b"T".to_vec()).unwrap();
    graph.add_node(8, b"GG".to_vec()).unwrap();
    for (from, to) in [(5, 6), (5, 7), (6, 8), (7, 8)] {
        add_forward_edge(&mut graph, from, to);
    }
    reads.extend(full_match_reads(&graph, "off_ref_a", 5, &[5, 6, 8], Some(30), Some(60)));
    reads.extend(full_match_reads(&graph, "off_ref_b", 5, &[5, 7, 8], Some(30), Some(60)));

    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads.clone(), &vcf_params(), &mut output).unwrap();
    assert_eq!(summary.sites, 2, "Wrong number of sites");
    assert_eq!(summary.records, 1, "Unanchored site produced a record");

    // The native form still emits a full locus for the unanchored site.
    let (mut graph, _) = snp_input(5, 5);
    graph.add_node(5, b"AC".to_vec()).unwrap();
    graph.add_node(6, b"C".to_vec()).unwrap();
    graph.add_node(7, b"T".to_vec()).unwrap();
    graph.add_node(8, b"GG".to_vec()).unwrap();
    for (from, to) in [(5, 6), (5, 7), (6, 8), (7, 8)] {
        add_forward_edge(&mut graph, from, to);
    }
    let params = GenotyperParams { output: OutputFormat::Native, ..json_params() };
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &params, &mut output).unwrap();
    assert_eq!(summary.records, 2, "Wrong number of native records");
    let loci = formats::read_loci(&output).unwrap();
    assert_eq!(loci.len(), 2, "Wrong number of decoded loci");
}

#[test]
fn native_output_round_trip() {
    let (mut graph, reads) = snp_input(10, 10);
    let params = GenotyperParams { output: OutputFormat::Native, ..json_params() };
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &params, &mut output).unwrap();
    assert_eq!(summary.records, 1, "Wrong number of records");

    let loci = formats::read_loci(&output).unwrap();
    assert_eq!(loci.len(), 1, "Wrong number of decoded loci");
    let locus = &loci[0];
    assert_eq!(locus.site.start, NodeTraversal::forward(1), "Wrong site start");
    assert_eq!(locus.site.end, NodeTraversal::forward(4), "Wrong site end");
    assert_eq!(locus.alleles.len(), 2, "Wrong number of alleles");
    assert_eq!(locus.genotypes[0].alleles, [0, 1], "Best genotype is not the het");
    for window in locus.genotypes.windows(2) {
        assert!(
            window[0].log_posterior >= window[1].log_posterior,
            "Genotypes are not sorted"
        );
    }
}

#[test]
fn cactus_backend() {
    let (mut graph, reads) = snp_input(10, 10);
    let params = GenotyperParams { use_cactus: true, ..json_params() };
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &params, &mut output).unwrap();
    assert_eq!(summary.sites, 1, "Wrong number of sites from the cactus backend");
    assert_eq!(summary.records, 1, "Wrong number of records from the cactus backend");
    let text = String::from_utf8(output).unwrap();
    assert!(
        text.contains("\"genotypes\": [{\"alleles\": [0, 1]"),
        "Best genotype is not the het: {}", text
    );
}

#[test]
fn inside_out_site_is_corrected() {
    // A site with swapped endpoints but unflipped orientations yields no
    // alleles; the site loop flips it and proceeds.
    let (graph, reads) = snp_pileup(10, 10);
    let reads: BTreeMap<String, Alignment> = reads.into_iter().map(
        |read| (read.name.clone(), read)
    ).collect();
    let params = json_params();
    let mut output: Vec<u8> = Vec::new();
    let site_loop = SiteLoop {
        graph: &graph,
        reads: &reads,
        reference_index: None,
        params: &params,
        model: params.model(),
        ref_path_name: "ref",
        sequence_name: "ref",
        output: Mutex::new(&mut output),
        total_affinities: AtomicUsize::new(0),
        emitted: AtomicUsize::new(0),
    };

    let inside_out = site(NodeTraversal::forward(4), NodeTraversal::forward(1), &[1, 2, 3, 4]);
    let mut buffer = Vec::new();
    site_loop.process_site(&inside_out, &mut buffer).unwrap();
    assert_eq!(site_loop.emitted.load(Ordering::Relaxed), 1, "No record for the corrected site");
    drop(site_loop);

    let text = String::from_utf8(output).unwrap();
    assert!(
        text.contains("\"start\": {\"id\": \"1\", \"is_reverse\": false}"),
        "Site was not flipped: {}", text
    );
}

#[test]
fn contig_override_and_offset() {
    let (mut graph, reads) = snp_input(10, 10);
    let params = GenotyperParams {
        contig_name: Some(String::from("chr1")),
        length_override: Some(1000),
        variant_offset: 100,
        ..vcf_params()
    };
    let mut output: Vec<u8> = Vec::new();
    run(&mut graph, reads, &params, &mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("##contig=<ID=chr1,length=1000>"), "Missing contig line");
    assert!(text.contains("\nchr1\t105\t.\tG\tT\t"), "Wrong contig and position: {}", text);
}

#[test]
fn unnamed_reads_get_names() {
    let (mut graph, mut reads) = snp_input(3, 3);
    for read in reads.iter_mut() {
        read.name = String::new();
    }
    let mut output: Vec<u8> = Vec::new();
    let summary = run(&mut graph, reads, &json_params(), &mut output).unwrap();
    assert_eq!(summary.records, 1, "Unnamed reads were not genotyped");
}

#[test]
fn invalid_parameters() {
    let (mut graph, reads) = snp_input(1, 1);
    let params = GenotyperParams { threads: 0, ..GenotyperParams::default() };
    let mut output: Vec<u8> = Vec::new();
    assert!(run(&mut graph, reads, &params, &mut output).is_err(), "Zero threads were accepted");
}

#[test]
fn missing_reference_is_fatal_for_vcf() {
    let mut graph = snp_graph();
    // Two walks, neither of them named "ref".
    graph.insert_walk("walk_a", forward_walk(&[1, 2, 4])).unwrap();
    graph.insert_walk("walk_b", forward_walk(&[1, 3, 4])).unwrap();
    let reads = full_match_reads(&graph, "read", 2, &[1, 2, 4], None, None);
    let mut output: Vec<u8> = Vec::new();
    assert!(
        run(&mut graph, reads, &vcf_params(), &mut output).is_err(),
        "Missing reference walk was accepted for VCF output"
    );
}

//-----------------------------------------------------------------------------
