pub mod handlers;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::presentation::cli::{Cli, Commands};

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let res = match cli.command {
        Commands::Pack {
            archive,
            inputs,
            algo,
            level,
            outdir,
            force,
            exclude,
            weak_password,
            password,
        } => handlers::handle_pack(
            archive,
            inputs,
            algo,
            level,
            outdir,
            force,
            exclude,
            weak_password,
            password,
        ),
        Commands::Extract {
            archive,
            outdir,
            force,
            password,
        } => handlers::handle_extract(archive, outdir, force, password),
        Commands::List { archive, password } => handlers::handle_list(archive, password),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
