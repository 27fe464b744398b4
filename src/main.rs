mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use gh_release_install::Installer;

use crate::cli::Cli;

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else {
        match verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut installer = Installer::new(&cli.repository, &cli.asset, &cli.destination)
        .version(&cli.version);
    if let Some(member) = &cli.extract {
        installer = installer.extract(member);
    }
    if let Some(pattern) = &cli.version_file {
        installer = installer.version_file(pattern);
    }
    if let Some(spec) = cli.checksum {
        installer = installer.checksum(spec);
    }
    if cli.quiet {
        installer = installer.no_progress();
    }

    // Already-current and fresh installs both exit 0; any fatal error is 1.
    match installer.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
