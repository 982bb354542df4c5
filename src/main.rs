extern crate env_logger;
#[macro_use]
extern crate log;

use anyhow::Result;
use clap::Parser;

mod cli;
mod dedup;
mod demux;
mod dna;
mod errors;
mod fastq;
mod layout;
mod pipeline;
mod record;
mod report;
mod resolve;
mod settings;
mod stats;

use cli::{Cli, Commands};
use dedup::Deduplicator;
use demux::Demultiplexer;
use pipeline::Pipeline;
use settings::Settings;
use stats::PipelineStatistics;

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let verbose = !cli.quiet;

    if verbose {
        info!("waistcoat v{}", cli::VERSION);
    }

    match &cli.command {
        Commands::Demux {
            settings,
            input,
            output,
            remove_input,
        } => {
            let settings = Settings::from_path(settings)?;
            info!("Using barcode format {}", settings.layout);

            let demux = Demultiplexer::new(&settings.samples, &settings.layout, verbose);
            let files = demux.demultiplex(input, output, *remove_input)?;

            info!("Demultiplexed reads:\n{}", report::format_counts(&pipeline::counts(&files)));
            info!("Completed demultiplexing to {}", output.display());
        }
        Commands::Dedup {
            settings,
            staging,
            output,
            remove_input,
        } => {
            let settings = Settings::from_path(settings)?;
            let staged = pipeline::staged_from_paths(staging)?;

            let dedup = Deduplicator::new(&settings.layout, verbose);
            let result = dedup.deduplicate(&staged, output, *remove_input)?;

            info!("Deduplicated reads:\n{}", report::format_counts(&result.counts()));
            if verbose {
                info!("Read length distribution:\n{}", report::format_histogram(&result.lengths));
            }
            info!("Completed deduplication to {}", output.display());
        }
        Commands::Run {
            settings,
            input,
            output,
            remove_input,
            stats,
        } => {
            let settings = Settings::from_path(settings)?;
            info!("Using barcode format {}", settings.layout);

            let mut statistics = PipelineStatistics::new(settings.samples.names());
            Pipeline::new(&settings, output, verbose).run(input, *remove_input, &mut statistics)?;

            info!("Read counts:\n{}", statistics.pretty_string());
            if let Some(dir) = stats {
                statistics.write(dir)?;
                info!("Wrote statistics to {}", dir.display());
            }
            info!("Completed successfully.");
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
