use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use operon_finder_bin::cli::Args;
use operon_finder_bin::pipeline::run;

fn main() {
    let start = std::time::Instant::now();
    let args: Args = Args::parse();

    let level = if args.verbose { Level::Debug } else { Level::Info };
    if let Err(e) = init_with_level(level) {
        eprintln!("Failed to initialise logging: {}", e);
        std::process::exit(1);
    }

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
    {
        error!("Failed to build thread pool: {}", e);
        std::process::exit(1);
    }

    let summary = run(&args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    info!(
        "Total: {} operons, {} genes in operons, largest operon {} genes",
        summary.get_operons(),
        summary.get_genes_in_operons(),
        summary.get_largest_operon()
    );
    info!("Elapsed time: {:.3?}", start.elapsed());
}
