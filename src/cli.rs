use clap::{Parser, Subcommand};
use edgar_index::config::Config;
use edgar_index::models::MergeMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edgar-index")]
#[command(about = "Download SEC EDGAR quarterly full-index files and merge them into one master.tsv")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download every quarterly index in the year range, then merge them
    Download {
        /// First year to download (defaults to the current year)
        #[arg(short, long)]
        start_year: Option<i32>,

        /// Last year to download, inclusive (defaults to the current year)
        #[arg(short, long)]
        end_year: Option<i32>,

        /// Directory the index files are saved to
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Maximum number of simultaneous downloads (0 = unlimited)
        #[arg(short, long)]
        max_concurrent: Option<usize>,

        /// Append to an existing master.tsv instead of rewriting it
        #[arg(long)]
        append: bool,
    },

    /// Merge already downloaded fragment files into master.tsv
    Merge {
        /// Directory holding the fragment files
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Append to an existing master.tsv instead of rewriting it
        #[arg(long)]
        append: bool,
    },

    /// List the archive URLs a download would fetch
    Endpoints {
        /// First year (defaults to the current year)
        #[arg(short, long)]
        start_year: Option<i32>,

        /// Last year, inclusive (defaults to the current year)
        #[arg(short, long)]
        end_year: Option<i32>,

        /// Print the endpoints as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Layer the command line flags over `config`
    pub fn apply_to(&self, config: &mut Config) {
        match self {
            Commands::Download {
                start_year,
                end_year,
                directory,
                max_concurrent,
                append,
            } => {
                apply_years(config, *start_year, *end_year);
                if let Some(directory) = directory {
                    config.save_directory = directory.clone();
                }
                if let Some(max_concurrent) = max_concurrent {
                    config.max_concurrent_downloads = *max_concurrent;
                }
                if *append {
                    config.merge_mode = MergeMode::Append;
                }
            }
            Commands::Merge { directory, append } => {
                if let Some(directory) = directory {
                    config.save_directory = directory.clone();
                }
                if *append {
                    config.merge_mode = MergeMode::Append;
                }
            }
            Commands::Endpoints {
                start_year,
                end_year,
                ..
            } => apply_years(config, *start_year, *end_year),
        }
    }
}

fn apply_years(config: &mut Config, start_year: Option<i32>, end_year: Option<i32>) {
    if let Some(start_year) = start_year {
        config.start_year = start_year;
    }
    if let Some(end_year) = end_year {
        config.end_year = end_year;
    }
}
