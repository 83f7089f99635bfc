use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cli;

use cli::{Cli, Commands};
use edgar_index::config::Config;
use edgar_index::{downloader, merge};

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "edgar_index=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "edgar-index.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    cli.command.apply_to(&mut config);

    match &cli.command {
        Commands::Download { .. } => {
            config.validate()?;

            let outcomes = downloader::download_index_files(&config).await?;
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            if failed > 0 {
                info!(
                    "{} of {} downloads failed; merging what was fetched",
                    failed,
                    outcomes.len()
                );
            }

            run_merge(&config)?;
        }

        Commands::Merge { .. } => {
            run_merge(&config)?;
        }

        Commands::Endpoints { json, .. } => {
            let endpoints = downloader::current_endpoints(
                &config.base_url,
                config.start_year,
                config.end_year,
            );
            if *json {
                println!("{}", serde_json::to_string_pretty(&endpoints)?);
            } else {
                for endpoint in endpoints {
                    println!("{}", endpoint.locator);
                }
            }
        }
    }

    Ok(())
}

fn run_merge(config: &Config) -> Result<()> {
    match merge::merge_index_files(&config.save_directory, config.merge_mode) {
        Ok(summary) => {
            info!(
                "Wrote {} records from {} fragments to {}",
                summary.lines,
                summary.fragments,
                summary.output.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("Merge failed: {}", e);
            Err(e.into())
        }
    }
}
