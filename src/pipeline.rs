//! The genotyping pipeline.
//!
//! The driver augments the graph with the reads, finds the sites with the
//! selected backend, and genotypes the sites in parallel: one task per
//! site, distributed over a fixed pool of worker threads. The augmented
//! graph, the reference index, and the read table are immutable during the
//! site loop, so the workers share them by reference. All output goes
//! through a single lock; native records are buffered per worker and
//! flushed in batches. Output ordering between sites is not guaranteed.

use crate::affinity;
use crate::alignment::Alignment;
use crate::alleles;
use crate::augment;
use crate::formats;
use crate::genotype::{self, Locus, ModelParams};
use crate::graph::VariationGraph;
use crate::reference::{self, ReferenceIndex};
use crate::sites::{self, Site};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Output format for the genotyped loci.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFormat {
    /// Length-prefixed binary locus records.
    Native,
    /// One JSON object per locus, newline-separated.
    Json,
    /// VCF 4.2 records anchored onto the reference walk.
    Vcf,
}

/// Parameters for the genotyping pipeline.
#[derive(Clone, Debug)]
pub struct GenotyperParams {
    /// Name of the reference walk. If unset, the only walk of the graph is
    /// used, or `ref` if there are several.
    pub ref_path_name: Option<String>,
    /// Contig name override for variant records and the VCF header.
    pub contig_name: Option<String>,
    /// Sample name for the VCF header.
    pub sample_name: String,
    /// Contig length override for the VCF header.
    pub length_override: Option<usize>,
    /// Offset added to variant positions.
    pub variant_offset: usize,
    /// Dump the augmented graph as GFA to this file.
    pub augmented_file: Option<String>,
    /// Use the cactus backend instead of superbubbles.
    pub use_cactus: bool,
    /// Score affinities by re-alignment instead of the fast path.
    pub realign: bool,
    /// Combine base quality with mapping quality for non-supporting reads.
    pub use_mapq: bool,
    /// Keep the reference allele even below the recurrence threshold.
    pub force_reference_allele: bool,
    /// Output format.
    pub output: OutputFormat,
    /// Print progress information to stderr.
    pub show_progress: bool,
    /// Number of worker threads for the site loop.
    pub threads: usize,
    /// Per-walk step cap in the allele enumerator.
    pub max_path_search_steps: usize,
    /// Minimum number of source walks per allele.
    pub min_recurrence: usize,
    /// Length budget for eliminating reverse-strand traversals in the
    /// superbubble backend.
    pub unfold_max_length: usize,
    /// Step budget for eliminating cycles in the superbubble backend.
    pub dagify_steps: usize,
    /// Phred-scaled sequence quality used when base qualities are missing.
    pub default_sequence_quality: f64,
    /// Prior probability of a heterozygous genotype.
    pub het_prior: f64,
}

impl GenotyperParams {
    /// Default sample name.
    pub const DEFAULT_SAMPLE: &'static str = "SAMPLE";
    /// Default for `max_path_search_steps`.
    pub const DEFAULT_MAX_PATH_SEARCH_STEPS: usize = 100;
    /// Default for `min_recurrence`.
    pub const DEFAULT_MIN_RECURRENCE: usize = 2;
    /// Default for `unfold_max_length`.
    pub const DEFAULT_UNFOLD_MAX_LENGTH: usize = 200;
    /// Default for `dagify_steps`.
    pub const DEFAULT_DAGIFY_STEPS: usize = 1;

    /// Validates the parameters and returns an error message if they are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err(String::from("GenotyperParams: threads must be greater than 0"));
        }
        if self.max_path_search_steps == 0 {
            return Err(String::from("GenotyperParams: max_path_search_steps must be greater than 0"));
        }
        if self.min_recurrence == 0 {
            return Err(String::from("GenotyperParams: min_recurrence must be greater than 0"));
        }
        if !(self.het_prior > 0.0 && self.het_prior < 1.0) {
            return Err(String::from("GenotyperParams: het_prior must be in (0, 1)"));
        }
        if !(self.default_sequence_quality >= 0.0) {
            return Err(String::from("GenotyperParams: default_sequence_quality must be non-negative"));
        }
        Ok(())
    }

    // The parameters of the genotype model.
    fn model(&self) -> ModelParams {
        ModelParams {
            use_mapq: self.use_mapq,
            default_sequence_quality: self.default_sequence_quality,
            het_prior_logprob: self.het_prior.ln(),
            min_recurrence: self.min_recurrence,
        }
    }
}

impl Default for GenotyperParams {
    fn default() -> Self {
        GenotyperParams {
            ref_path_name: None,
            contig_name: None,
            sample_name: String::from(Self::DEFAULT_SAMPLE),
            length_override: None,
            variant_offset: 0,
            augmented_file: None,
            use_cactus: false,
            realign: false,
            use_mapq: false,
            force_reference_allele: false,
            output: OutputFormat::Native,
            show_progress: false,
            threads: std::thread::available_parallelism().map_or(1, |threads| threads.get()),
            max_path_search_steps: Self::DEFAULT_MAX_PATH_SEARCH_STEPS,
            min_recurrence: Self::DEFAULT_MIN_RECURRENCE,
            unfold_max_length: Self::DEFAULT_UNFOLD_MAX_LENGTH,
            dagify_steps: Self::DEFAULT_DAGIFY_STEPS,
            default_sequence_quality: ModelParams::DEFAULT_SEQUENCE_QUALITY,
            het_prior: ModelParams::DEFAULT_HET_PRIOR,
        }
    }
}

/// Statistics from a pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of sites found.
    pub sites: usize,
    /// Number of records emitted.
    pub records: usize,
    /// Number of affinities computed.
    pub affinities: usize,
}

//-----------------------------------------------------------------------------

// Shared state of the parallel site loop.
struct SiteLoop<'a, T: Write + Send> {
    graph: &'a VariationGraph,
    reads: &'a BTreeMap<String, Alignment>,
    reference_index: Option<&'a ReferenceIndex>,
    params: &'a GenotyperParams,
    model: ModelParams,
    ref_path_name: &'a str,
    sequence_name: &'a str,
    output: Mutex<&'a mut T>,
    total_affinities: AtomicUsize,
    emitted: AtomicUsize,
}

impl<'a, T: Write + Send> SiteLoop<'a, T> {
    // Native records per worker buffer before flushing under the output lock.
    const BUFFER_SIZE: usize = 100;

    fn process_site(&self, original: &Site, buffer: &mut Vec<Locus>) -> Result<(), String> {
        let forced = if self.params.force_reference_allele {
            Some(self.ref_path_name)
        } else {
            None
        };
        let mut site = original.clone();
        let mut paths = alleles::paths_through_site(
            self.graph, &site,
            self.params.max_path_search_steps, self.params.min_recurrence, forced
        );

        if paths.is_empty() {
            // The cactus backend may hand out inside-out sites. Flip the
            // site around and try again.
            site.swap_endpoints();
            let reverse_paths = alleles::paths_through_site(
                self.graph, &site,
                self.params.max_path_search_steps, self.params.min_recurrence, forced
            );
            if !reverse_paths.is_empty() {
                paths = reverse_paths;
                eprintln!("Warning: corrected an inside-out site {} - {}", site.end, site.start);
            } else {
                // Put the original endpoints back for complaining.
                site.swap_endpoints();
            }
        }

        if let Some(index) = self.reference_index {
            let start_at = index.by_id.get(&site.start.node);
            let end_at = index.by_id.get(&site.end.node);
            if let (Some(start_at), Some(end_at)) = (start_at, end_at) {
                // Do the ends run with the reference or against it?
                let start_against = site.start.orientation != start_at.1;
                let end_against = site.end.orientation != end_at.1;
                if self.params.show_progress {
                    eprintln!("Site {} runs reference {} to {}", site, start_at.0, end_at.0);
                }
                if !start_against && !end_against && end_at.0 < start_at.0 {
                    eprintln!("Warning: site {} runs backward on the reference", site);
                }
            }
        }

        if paths.is_empty() {
            eprintln!("Warning: site {} skipped for having no alleles", site);
            return Ok(());
        }
        if self.params.show_progress {
            eprintln!("Site {} has {} alleles", site, paths.len());
            for path in paths.iter() {
                eprintln!("    {}", String::from_utf8_lossy(&self.graph.spelled_sequence(path)));
            }
        }

        let affinities = if self.params.realign {
            affinity::affinities_with_realignment(
                self.graph, &site, self.reads, &paths, self.params.min_recurrence
            )
        } else {
            affinity::affinities_fast(
                self.graph, &site, self.reads, &paths, self.params.min_recurrence
            )
        };
        let count: usize = affinities.values().map(|list| list.len()).sum();
        self.total_affinities.fetch_add(count, Ordering::Relaxed);

        let locus = genotype::genotype_site(
            self.graph, &site, &paths, &affinities, self.reads, &self.model
        );

        match self.params.output {
            OutputFormat::Json => {
                let line = format!("{}\n", formats::json_locus(&locus));
                let mut output = self.lock_output()?;
                output.write_all(line.as_bytes()).map_err(|x| x.to_string())?;
                self.emitted.fetch_add(1, Ordering::Relaxed);
            },
            OutputFormat::Vcf => {
                let index = self.reference_index.unwrap();
                let records = reference::locus_to_variant(
                    self.graph, index, &locus, self.sequence_name, self.params.variant_offset
                );
                if !records.is_empty() {
                    let mut output = self.lock_output()?;
                    for record in records.iter() {
                        writeln!(output, "{}", record).map_err(|x| x.to_string())?;
                    }
                    self.emitted.fetch_add(records.len(), Ordering::Relaxed);
                }
            },
            OutputFormat::Native => {
                buffer.push(locus);
                if buffer.len() >= Self::BUFFER_SIZE {
                    self.flush(buffer)?;
                }
            },
        }
        Ok(())
    }

    fn flush(&self, buffer: &mut Vec<Locus>) -> Result<(), String> {
        if buffer.is_empty() {
            return Ok(());
        }
        let mut output = self.lock_output()?;
        for locus in buffer.iter() {
            formats::write_locus(locus, &mut *output).map_err(|x| x.to_string())?;
        }
        self.emitted.fetch_add(buffer.len(), Ordering::Relaxed);
        buffer.clear();
        Ok(())
    }

    fn lock_output(&self) -> Result<std::sync::MutexGuard<'_, &'a mut T>, String> {
        self.output.lock().map_err(|_| String::from("Output lock poisoned"))
    }
}

//-----------------------------------------------------------------------------

/// Runs the genotyping pipeline.
///
/// Augments the graph with the reads, finds the sites, genotypes them in
/// parallel, and writes the results to the output in the selected format.
/// Returns summary statistics.
///
/// The graph must contain the reference walk when VCF output is selected.
/// Reads without names are named `_unnamed_alignment_<ordinal>` before
/// augmentation.
pub fn run<T: Write + Send>(
    graph: &mut VariationGraph,
    mut alignments: Vec<Alignment>,
    params: &GenotyperParams,
    output: &mut T
) -> Result<RunSummary, String> {
    params.validate()?;
    graph.validate()?;

    // The reference walk: given, or the only walk, or "ref".
    let ref_path_name = match &params.ref_path_name {
        Some(name) => name.clone(),
        None => {
            if graph.walk_count() == 1 {
                graph.walk_names().next().unwrap().to_string()
            } else {
                String::from("ref")
            }
        },
    };
    if params.output == OutputFormat::Vcf && params.show_progress {
        eprintln!("Calling against walk {}", ref_path_name);
    }

    // Make sure the reads have names. We assume that reads with names have
    // unique ones that do not look like the names we generate.
    for (offset, alignment) in alignments.iter_mut().enumerate() {
        if alignment.name.is_empty() {
            alignment.name = format!("_unnamed_alignment_{}", offset);
        }
    }

    // Embed the reads in the graph.
    let translation = augment::augment(graph, &alignments)?;
    if params.show_progress {
        eprintln!("Augmented the graph; got {} new nodes", translation.len());
    }
    if let Some(filename) = &params.augmented_file {
        let file = File::create(filename).map_err(|x| x.to_string())?;
        let mut writer = BufWriter::new(file);
        formats::write_gfa(graph, &mut writer).map_err(|x| x.to_string())?;
    }
    graph.rebuild_walk_index();

    let reads: BTreeMap<String, Alignment> = alignments.into_iter().filter(
        |alignment| !alignment.is_unaligned()
    ).map(|alignment| (alignment.name.clone(), alignment)).collect();

    // Find the sites.
    let sites = if params.use_cactus {
        sites::find_sites_with_cactus(graph, &ref_path_name)?
    } else {
        sites::find_sites_with_superbubbles(
            graph, params.unfold_max_length, params.dagify_steps
        )
    };
    if params.show_progress {
        eprintln!("Found {} sites", sites.len());
    }

    // VCF output needs the reference index and a header.
    let reference_index = if params.output == OutputFormat::Vcf {
        let index = ReferenceIndex::new(graph, &ref_path_name)?;
        if params.show_progress {
            eprintln!("Traced {} bp of reference walk {}", index.len(), ref_path_name);
        }
        let contig_size = params.length_override.unwrap_or(index.len());
        formats::write_vcf_header(
            output, &params.sample_name, params.contig_name.as_deref(), contig_size
        ).map_err(|x| x.to_string())?;
        Some(index)
    } else {
        None
    };
    let sequence_name = params.contig_name.clone().unwrap_or_else(|| ref_path_name.clone());

    // The site loop: one task per site over a fixed worker pool.
    let graph: &VariationGraph = graph;
    let site_loop = SiteLoop {
        graph,
        reads: &reads,
        reference_index: reference_index.as_ref(),
        params,
        model: params.model(),
        ref_path_name: &ref_path_name,
        sequence_name: &sequence_name,
        output: Mutex::new(output),
        total_affinities: AtomicUsize::new(0),
        emitted: AtomicUsize::new(0),
    };
    let worker_count = params.threads.min(sites.len()).max(1);

    std::thread::scope(|scope| -> Result<(), String> {
        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let site_loop = &site_loop;
            let sites = &sites;
            workers.push(scope.spawn(move || -> Result<(), String> {
                let mut buffer: Vec<Locus> = Vec::new();
                let mut offset = worker;
                while offset < sites.len() {
                    site_loop.process_site(&sites[offset], &mut buffer)?;
                    offset += worker_count;
                }
                site_loop.flush(&mut buffer)?;
                Ok(())
            }));
        }
        for (worker, handle) in workers.into_iter().enumerate() {
            match handle.join() {
                Ok(result) => result.map_err(
                    |err| format!("Worker thread {} failed: {}", worker, err)
                )?,
                Err(_) => return Err(format!("Worker thread {} panicked", worker)),
            }
        }
        Ok(())
    })?;

    let summary = RunSummary {
        sites: sites.len(),
        records: site_loop.emitted.load(Ordering::Relaxed),
        affinities: site_loop.total_affinities.load(Ordering::Relaxed),
    };
    if params.show_progress {
        eprintln!("Computed {} affinities", summary.affinities);
    }
    Ok(summary)
}

//-----------------------------------------------------------------------------
