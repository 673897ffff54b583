/// pausestats - Codon pause scores from P-site tracks
///
/// Rebuilds per-gene density windows from forward/reverse tracks, reads the
/// footprint density at the requested ribosome site for every gene's anchor
/// codon, and summarises observed and predicted pauses per codon and per
/// codon group.
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use ribotrack::annotation::read_annotations;
use ribotrack::codon::{translate_codon, CodonGroups, LEUCINE_CODONS};
use ribotrack::pause::{aggregate, AggregateConfig, Channel, GeneInputs, RibosomeSite, SiteGeometry};
use ribotrack::reference::ReferenceGenome;
use ribotrack::report::write_reports;
use ribotrack::track::read_track;
use ribotrack::vectors::{read_column, read_z_index};

#[derive(Parser, Debug)]
#[clap(
    name = "pausestats",
    version,
    about = "Codon pause-score statistics from ribosome profiling tracks"
)]
struct Args {
    /// Forward-strand fixed-step track
    #[clap(long = "forward")]
    forward: PathBuf,

    /// Reverse-strand fixed-step track
    #[clap(long = "reverse")]
    reverse: PathBuf,

    /// Gene table: chrom, start, end, strand (1-based, inclusive)
    #[clap(short = 'a', long = "annotations")]
    annotations: PathBuf,

    /// Reference FASTA (indexed on first use)
    #[clap(short = 'r', long = "reference")]
    reference: PathBuf,

    /// Per-gene anchor codon indices
    #[clap(short = 'z', long = "z-index")]
    z_index: PathBuf,

    /// Per-gene model predictions
    #[clap(long = "predictions")]
    predictions: PathBuf,

    /// 0-based column of the z-index file (default: last)
    #[clap(long = "z-column")]
    z_column: Option<usize>,

    /// 0-based column of the prediction file (default: last)
    #[clap(long = "prediction-column")]
    prediction_column: Option<usize>,

    /// Ribosome site to score: A, P or E
    #[clap(short = 's', long = "site", default_value = "A")]
    site: RibosomeSite,

    /// A-site offset the density windows are anchored on
    #[clap(long = "a-site-offset", default_value_t = 0, allow_hyphen_values = true)]
    a_site_offset: i64,

    /// Codon groups: label<TAB>codon[,codon...] (default: amino acids)
    #[clap(short = 'g', long = "codon-groups")]
    codon_groups: Option<PathBuf>,

    /// Codons reported individually (default: leucine codons)
    #[clap(long = "highlight", value_delimiter = ',')]
    highlight: Vec<String>,

    /// Output prefix for the report tables
    #[clap(short = 'o', long = "output-prefix")]
    output_prefix: String,

    /// Number of threads
    #[clap(short = 't', long = "threads", default_value = "4")]
    threads: usize,

    /// Quiet mode (warnings and errors only)
    #[clap(long = "quiet")]
    quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ribotrack::logging::init(args.quiet, args.verbose);

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let highlight: Vec<String> = if args.highlight.is_empty() {
        LEUCINE_CODONS.iter().map(|c| c.to_string()).collect()
    } else {
        args.highlight.iter().map(|c| c.trim().to_ascii_uppercase()).collect()
    };
    if let Some(bad) = highlight.iter().find(|c| translate_codon(c.as_bytes()).is_none()) {
        bail!("--highlight: '{bad}' is not a codon");
    }

    let geometry = SiteGeometry {
        site: args.site,
        reference_offset: args.a_site_offset,
        ..Default::default()
    };
    let config = AggregateConfig {
        geometry,
        channels: Channel::ALL.to_vec(),
        highlight,
    };

    // Every input is loaded and validated before any scoring starts
    let groups = match &args.codon_groups {
        Some(path) => CodonGroups::from_path(path)
            .with_context(|| format!("Cannot read codon groups {}", path.display()))?,
        None => CodonGroups::standard_amino_acids(),
    };
    let annotations = read_annotations(&args.annotations)
        .with_context(|| format!("Cannot read annotations {}", args.annotations.display()))?;
    let z_index = read_z_index(&args.z_index, args.z_column)
        .with_context(|| format!("Cannot read z-index {}", args.z_index.display()))?;
    let predictions = read_column(&args.predictions, args.prediction_column)
        .with_context(|| format!("Cannot read predictions {}", args.predictions.display()))?;
    let (forward, reverse) = rayon::join(|| read_track(&args.forward), || read_track(&args.reverse));
    let forward = forward.with_context(|| format!("Cannot read track {}", args.forward.display()))?;
    let reverse = reverse.with_context(|| format!("Cannot read track {}", args.reverse.display()))?;
    let reference = ReferenceGenome::open(&args.reference)
        .with_context(|| format!("Cannot open reference {}", args.reference.display()))?;

    info!(
        "{} genes, {} codon groups, scoring the {} site",
        annotations.len(),
        groups.len(),
        config.geometry.site
    );

    let inputs = GeneInputs::load(
        &annotations,
        &forward,
        &reverse,
        &reference,
        z_index,
        predictions,
        &config.geometry,
    )
    .context("Cannot build per-gene inputs")?;

    let report = aggregate(&inputs, &config, &groups).context("Pause-score aggregation failed")?;
    write_reports(&report, &args.output_prefix).context("Failed to write reports")?;

    Ok(())
}
