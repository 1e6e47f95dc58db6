use clap::Parser;
use policy_crawler::cli::commands::{cmd_collect, cmd_model, cmd_search};
use policy_crawler::cli::config::{Cli, Commands, CrawlOverrides, load_config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let trace = cli.trace.as_deref();

    match cli.command {
        Commands::Search {
            apps,
            delivery,
            algorithm,
            max_expansions,
            fallback,
            seed,
        } => {
            let overrides = CrawlOverrides {
                algorithm,
                max_expansions,
                fallback,
                seed,
            };
            let completed = cmd_search(&config, &apps, &delivery, &overrides, trace)?;
            if !completed {
                std::process::exit(1);
            }
        }
        Commands::Model {
            apps,
            delivery,
            format,
            max_expansions,
        } => {
            let completed = cmd_model(&config, &apps, &delivery, format.into(), max_expansions, trace)?;
            if !completed {
                std::process::exit(1);
            }
        }
        Commands::Collect {
            listen,
            out,
            extension,
        } => {
            cmd_collect(&config, &listen, out.as_deref(), &extension)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins; otherwise -v raises the level from warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
