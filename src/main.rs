//! repos-health - run health checks across many repositories
//!
//! Exit codes: 0 clean, 1 warnings, 2 critical findings, 3 when the run
//! could not complete (configuration, I/O or reporting errors).

use clap::Parser;
use repos_health::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = cli::Cli::parse();

    // Logs go to stderr so reports on stdout stay machine-readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let code = match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            3
        }
    };
    std::process::exit(code);
}
