use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use motif_scan::analyze::analyze;
use motif_scan::builtin;
use motif_scan::engine::MatchEngine;
use motif_scan::fasta_reader::FastaReader;
use motif_scan::scan_opt::{OverlapStrategy, ScanOpt};
use motif_scan::secondary::SecondaryLimits;

#[derive(Parser)]
#[command(name = "motif-scan")]
#[command(about = "Streaming multi-pattern motif scanner for genomic sequences", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan FASTA sequences for the built-in motif catalog
    Scan {
        /// Input FASTA file (.fa, .fasta, optionally .gz)
        #[arg(value_name = "SEQ.FA")]
        fasta: PathBuf,

        /// Chunk size in bases (windows advance by this amount)
        #[arg(short = 'c', long, value_name = "INT", default_value_t = 1_000_000)]
        chunk_size: usize,

        /// Window overlap in bases; must cover the longest expected motif span
        #[arg(short = 'l', long, value_name = "INT", default_value_t = 500)]
        overlap: usize,

        /// Overlap resolution strategy
        #[arg(short = 's', long, value_enum, default_value = "keep-highest-score")]
        strategy: OverlapStrategy,

        /// Overlap fraction at which two candidates conflict
        #[arg(long, value_name = "FLOAT", default_value_t = 0.5)]
        overlap_threshold: f64,

        /// Disable per-class parallel dispatch
        #[arg(long)]
        serial: bool,

        /// Per-chunk detector timeout in milliseconds
        #[arg(long, value_name = "INT")]
        timeout_ms: Option<u64>,

        /// Output TSV file (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Number of threads (default: all available cores)
        #[arg(short = 't', long, value_name = "INT")]
        threads: Option<usize>,

        /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
        #[arg(short = 'v', long, value_name = "INT", default_value = "3")]
        verbosity: i32,
    },
}

const TSV_HEADER: &str =
    "Sequence_Name\tClass\tSubclass\tStart\tEnd\tLength\tSequence\tScore\tNormalizedScore\tMethod\tPattern_ID\tAttributes";

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            fasta,
            chunk_size,
            overlap,
            strategy,
            overlap_threshold,
            serial,
            timeout_ms,
            output,
            threads,
            verbosity,
        } => {
            let log_level = match verbosity {
                v if v <= 1 => log::LevelFilter::Error,
                2 => log::LevelFilter::Warn,
                3 => log::LevelFilter::Info,
                4 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            };
            env_logger::Builder::from_default_env()
                .filter_level(log_level)
                .format_timestamp(None)
                .format_target(false)
                .init();

            let mut num_threads = threads.unwrap_or_else(num_cpus::get);
            if num_threads < 1 {
                log::warn!("Invalid thread count {}, using 1 thread", num_threads);
                num_threads = 1;
            }
            let max_threads = num_cpus::get() * 2;
            if num_threads > max_threads {
                log::warn!(
                    "Thread count {} exceeds recommended maximum {}, capping at {}",
                    num_threads,
                    max_threads,
                    max_threads
                );
                num_threads = max_threads;
            }
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
            {
                log::warn!(
                    "Failed to configure thread pool: {} (may already be initialized)",
                    e
                );
            }
            log::info!(
                "Using {} {}",
                num_threads,
                if num_threads == 1 { "thread" } else { "threads" }
            );

            let mut opt = ScanOpt::default();
            opt.chunk_size = chunk_size;
            opt.overlap = overlap;
            opt.strategy = strategy;
            opt.overlap_threshold = overlap_threshold;
            opt.parallel = !serial;
            opt.task_timeout_ms = timeout_ms;
            if let Err(e) = opt.validate() {
                log::error!("{}", e);
                std::process::exit(1);
            }

            if let Err(e) = run_scan(&fasta, &opt, output.as_deref()) {
                log::error!("Scan failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_scan(
    fasta: &std::path::Path,
    opt: &ScanOpt,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    use std::time::Instant;

    let limits = SecondaryLimits {
        max_seeds: opt.max_secondary_seeds,
        max_candidates: opt.max_secondary_candidates,
    };
    let dispatcher = builtin::default_dispatcher(limits);
    let mut engine = MatchEngine::new(opt.case_insensitive);

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    writeln!(writer, "{}", TSV_HEADER)?;

    let start_time = Instant::now();
    let mut total_records = 0usize;
    let mut total_bases = 0usize;
    let mut total_motifs = 0usize;

    let reader = FastaReader::new(
        fasta
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 path: {}", fasta.display()))?,
    )?;

    for record in reader {
        let record = record?;
        total_records += 1;
        total_bases += record.sequence.len();

        let report = analyze(&record.sequence, &record.name, opt, &dispatcher, &mut engine)?;
        for w in &report.warnings {
            log::warn!("{}: {}", record.name, w);
        }
        total_motifs += report.motifs.len();
        for motif in &report.motifs {
            writeln!(writer, "{}", motif.to_tsv_row(&record.name))?;
        }
    }

    log::info!(
        "Processed {} sequences ({} bp), {} motifs in {:.2} sec",
        total_records,
        total_bases,
        total_motifs,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
