use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use mutflow::{run_mutflow, Args};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    log::trace!("Arguments: {:#?}", args);

    if args.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build_global() {
            log::warn!("Could not configure {} worker threads: {}", args.threads, e);
        }
    }

    run_mutflow(&args).with_context(|| format!("failed to process {}", args.input))?;
    Ok(())
}
