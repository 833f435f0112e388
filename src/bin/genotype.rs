use bubblecall::formats;
use bubblecall::pipeline::{self, GenotyperParams, OutputFormat};
use bubblecall::utils;

use std::io::{self, Write};
use std::time::Instant;
use std::{env, process};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new()?;
    for filename in [&config.graph_file, &config.gaf_file] {
        if !utils::file_exists(filename) {
            return Err(format!("Input file {} does not exist", filename));
        }
    }

    // Load the graph and the reads.
    let mut graph = formats::read_gfa(&config.graph_file)?;
    let alignments = formats::read_gaf(&config.gaf_file)?;
    if config.params.show_progress {
        eprintln!(
            "Loaded {} nodes, {} walks, and {} alignments",
            graph.node_count(), graph.walk_count(), alignments.len()
        );
    }

    // Genotype the sites.
    let mut output = io::BufWriter::new(io::stdout());
    let summary = pipeline::run(&mut graph, alignments, &config.params, &mut output)?;
    output.flush().map_err(|x| x.to_string())?;

    if config.params.show_progress {
        eprintln!(
            "Genotyped {} sites into {} records",
            summary.sites, summary.records
        );
        let seconds = start_time.elapsed().as_secs_f64();
        eprintln!("Used {:.3} seconds", seconds);
    }

    Ok(())
}

//-----------------------------------------------------------------------------

pub struct Config {
    pub graph_file: String,
    pub gaf_file: String,
    pub params: GenotyperParams,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optflag("c", "use-cactus", "find sites with the cactus backend");
        opts.optflag("v", "vcf", "output VCF records");
        opts.optflag("j", "json", "output one JSON object per locus");
        opts.optopt("r", "ref", "reference walk name", "STR");
        opts.optopt("", "contig", "contig name override for VCF output", "STR");
        opts.optopt("s", "sample", "sample name (default: SAMPLE)", "STR");
        opts.optopt("o", "offset", "add this offset to variant positions", "INT");
        opts.optopt("l", "length", "contig length override for the VCF header", "INT");
        opts.optopt("a", "augmented", "dump the augmented graph as GFA to this file", "FILE");
        opts.optflag("p", "progress", "print progress information to stderr");
        opts.optopt("t", "threads", "number of worker threads", "INT");
        let recurrence_desc = format!(
            "minimum source walks per allele (default: {})", GenotyperParams::DEFAULT_MIN_RECURRENCE
        );
        opts.optopt("", "min-recurrence", &recurrence_desc, "INT");
        let steps_desc = format!(
            "per-walk step cap in allele enumeration (default: {})",
            GenotyperParams::DEFAULT_MAX_PATH_SEARCH_STEPS
        );
        opts.optopt("", "search-steps", &steps_desc, "INT");
        opts.optflag("", "realign", "score affinities by re-alignment");
        opts.optflag("", "use-mapq", "use mapping qualities in the genotype model");
        opts.optopt("", "het-prior", "prior probability of a het genotype", "FLOAT");
        opts.optflag("", "force-ref", "keep the reference allele below the recurrence threshold");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        if matches.opt_present("h") {
            let header = format!("Usage: {} [options] graph.gfa reads.gaf", program);
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        if matches.free.len() != 2 {
            let header = format!("Usage: {} [options] graph.gfa reads.gaf", program);
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }
        let graph_file = matches.free[0].clone();
        let gaf_file = matches.free[1].clone();

        let mut params = GenotyperParams::default();
        if matches.opt_present("v") && matches.opt_present("j") {
            return Err("Only one of --vcf and --json can be selected".to_string());
        }
        if matches.opt_present("v") {
            params.output = OutputFormat::Vcf;
        }
        if matches.opt_present("j") {
            params.output = OutputFormat::Json;
        }
        params.use_cactus = matches.opt_present("c");
        params.realign = matches.opt_present("realign");
        params.use_mapq = matches.opt_present("use-mapq");
        params.force_reference_allele = matches.opt_present("force-ref");
        params.show_progress = matches.opt_present("p");
        params.ref_path_name = matches.opt_str("r");
        params.contig_name = matches.opt_str("contig");
        params.augmented_file = matches.opt_str("a");
        if let Some(sample) = matches.opt_str("s") {
            params.sample_name = sample;
        }
        if let Some(value) = matches.opt_str("o") {
            params.variant_offset = value.parse().map_err(|x| format!("--offset: {}", x))?;
        }
        if let Some(value) = matches.opt_str("l") {
            let length = value.parse().map_err(|x| format!("--length: {}", x))?;
            params.length_override = Some(length);
        }
        if let Some(value) = matches.opt_str("t") {
            params.threads = value.parse().map_err(|x| format!("--threads: {}", x))?;
        }
        if let Some(value) = matches.opt_str("min-recurrence") {
            params.min_recurrence = value.parse().map_err(|x| format!("--min-recurrence: {}", x))?;
        }
        if let Some(value) = matches.opt_str("search-steps") {
            params.max_path_search_steps = value.parse().map_err(|x| format!("--search-steps: {}", x))?;
        }
        if let Some(value) = matches.opt_str("het-prior") {
            params.het_prior = value.parse().map_err(|x| format!("--het-prior: {}", x))?;
        }
        params.validate()?;

        Ok(Config { graph_file, gaf_file, params })
    }
}

//-----------------------------------------------------------------------------
