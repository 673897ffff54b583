use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use ribotrack::alignment::AlignmentSource;
use ribotrack::chrom::NameRules;
use ribotrack::extract::{extract, ExtractConfig, DEFAULT_P_SITE_OFFSET};
use ribotrack::track::write_tracks_atomic;

/// ribotrack - Strand-specific P-site tracks from ribosome profiling alignments
///
/// Writes <prefix>_f.wig and <prefix>_r.wig: fixed-step tracks with one count
/// per base for every reference in the alignment header, in header order.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Input alignments (BAM, SAM or CRAM)
    #[clap(short = 'i', long = "input")]
    input: PathBuf,

    /// Output prefix for the forward (_f.wig) and reverse (_r.wig) tracks
    #[clap(short = 'o', long = "output-prefix", alias = "output_prefix")]
    output_prefix: String,

    /// P-site offset from the 5' end of each read
    #[clap(
        short = 'p',
        long = "p-site-offset",
        alias = "p_site_offset",
        default_value_t = DEFAULT_P_SITE_OFFSET,
        allow_hyphen_values = true
    )]
    p_site_offset: i64,

    /// Keep reference names exactly as written in the header
    #[clap(long = "raw-names")]
    raw_names: bool,

    /// Number of threads used to write the two tracks
    #[clap(short = 't', long = "threads", default_value = "2")]
    threads: usize,

    /// Quiet mode (warnings and errors only, no progress output)
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

    let config = ExtractConfig {
        p_site_offset: args.p_site_offset,
        name_rules: if args.raw_names {
            NameRules::verbatim()
        } else {
            NameRules::default()
        },
    };

    let mut source = AlignmentSource::open(&args.input, &config.name_rules)
        .with_context(|| format!("Cannot read alignments from {}", args.input.display()))?;
    let chromosomes = source.chromosomes().clone();
    info!(
        "{}: {} chromosomes, {} bases; P-site offset {}",
        args.input.display(),
        chromosomes.len(),
        chromosomes.total_length(),
        config.p_site_offset
    );

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {human_pos} alignments ({per_sec}) {msg}")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let records = source.records().inspect(|_| progress.inc(1));
    let extraction = extract(records, &chromosomes, &config)
        .with_context(|| format!("P-site extraction failed for {}", args.input.display()))?;
    progress.finish_and_clear();

    let forward_path = PathBuf::from(format!("{}_f.wig", args.output_prefix));
    let reverse_path = PathBuf::from(format!("{}_r.wig", args.output_prefix));
    write_tracks_atomic(&[
        (&extraction.forward, forward_path.as_path()),
        (&extraction.reverse, reverse_path.as_path()),
    ])
    .context("Failed to write tracks")?;

    info!(
        "Wrote {} and {}",
        forward_path.display(),
        reverse_path.display()
    );
    Ok(())
}
