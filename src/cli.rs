use std::path::PathBuf;

use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
waistcoat version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   split reads by sample barcode and remove PCR duplicates";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// do not report progress or per-sample summaries
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a .fastq into one file per sample, by the barcode at the start of each read
    #[command(arg_required_else_help = true)]
    Demux {
        /// the JSON settings file, giving the barcode format and the sample barcodes
        settings: PathBuf,

        /// the input .fastq file
        input: PathBuf,

        /// the output directory
        #[arg(short, long, default_value = "waistcoat_out")]
        output: PathBuf,

        /// delete the input file once it has been split
        #[arg(long)]
        remove_input: bool,
    },

    /// Remove poly-A tails, barcodes and duplicate reads from demultiplexed .fastq files
    #[command(arg_required_else_help = true)]
    Dedup {
        /// the JSON settings file, giving the barcode format
        settings: PathBuf,

        /// the demultiplexed files, named <SAMPLE>_nonunique.fq or <SAMPLE>.fq
        #[arg(required = true)]
        staging: Vec<PathBuf>,

        /// the output directory
        #[arg(short, long, default_value = "waistcoat_out")]
        output: PathBuf,

        /// delete each input file once it has been deduplicated
        #[arg(long)]
        remove_input: bool,
    },

    /// Demultiplex and then deduplicate a .fastq file
    #[command(arg_required_else_help = true)]
    Run {
        /// the JSON settings file, giving the barcode format and the sample barcodes
        settings: PathBuf,

        /// the input .fastq file
        input: PathBuf,

        /// the output directory
        #[arg(short, long, default_value = "waistcoat_out")]
        output: PathBuf,

        /// delete the input file once it has been split
        #[arg(long)]
        remove_input: bool,

        /// write per-sample read counts of each stage to <STATS>/pipeline.csv
        #[arg(long)]
        stats: Option<PathBuf>,
    },
}
