use clap::Parser;
use tracing_subscriber::EnvFilter;

mod aligner;
mod cli;
mod core;
mod matching;
mod output;
mod parsing;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Reports go to stdout, logs to stderr
    let filter = if cli.verbose {
        EnvFilter::new("blast_typer=debug,info")
    } else if cli.silent {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("blast_typer=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Classify(args) => {
            cli::classify::run(args, cli.format)?;
        }
        cli::Commands::Alleles(args) => {
            cli::alleles::run(args, cli.format)?;
        }
        cli::Commands::Regions(args) => {
            cli::regions::run(args, cli.format)?;
        }
        cli::Commands::Thresholds(args) => {
            cli::thresholds::run(args, cli.format)?;
        }
        cli::Commands::Extract(args) => {
            cli::extract::run(args, cli.format)?;
        }
        cli::Commands::Describe(args) => {
            cli::describe::run(args, cli.format)?;
        }
        cli::Commands::Check(args) => {
            cli::check::run(args, cli.format)?;
        }
    }

    Ok(())
}
