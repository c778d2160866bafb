use clap::Parser;
use std::path::PathBuf;

use rigger::Engine;

#[derive(Parser)]
#[command(name = "rigger")]
#[command(about = "A declarative host-automation engine")]
#[command(version)]
struct Cli {
    /// Show informational output while rules run
    #[arg(short, long)]
    verbose: bool,

    /// Show debug output (implies --verbose)
    #[arg(short, long)]
    debug: bool,

    /// Recipe files to execute, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    // One environment and one included-path set across the whole file list.
    let mut engine = Engine::new();
    for file in &cli.files {
        if let Err(e) = engine.run_file(file) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
