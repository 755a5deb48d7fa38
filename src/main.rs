use anyhow::Context;
use clap::Parser;
use nmapi::cli::{Cli, Commands, ServeCommand};
use nmapi::output;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(cli.config.load().context("invalid configuration")?);

    match cli.command {
        Some(Commands::Scan(cmd)) => cmd.execute(&config, cli.quiet).await?,
        Some(Commands::History(cmd)) => cmd.execute(&config, cli.quiet)?,
        Some(Commands::Serve(cmd)) => cmd.execute(config).await?,
        None => ServeCommand::default().execute(config).await?,
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v`/`-q` pick the level.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
