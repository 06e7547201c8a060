use anyhow::Result;
use caixa_core::Direction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "caixa", version, about = "Bank statement import and categorization")]
struct Cli {
    /// Config file (default: platform config dir / caixa.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and seed the default catalogue
    Init,

    /// Parse a statement export, classify it and optionally commit it
    Import {
        /// OFX statement file
        file: PathBuf,

        /// Ask the AI classification service after the keyword rules
        #[arg(long)]
        ai: bool,

        /// Staging ids to leave out of the commit
        #[arg(long, value_delimiter = ',')]
        deselect: Vec<u64>,

        /// Category to apply to every selected item
        #[arg(long)]
        category: Option<String>,

        /// Persist the selected items (otherwise a dry run)
        #[arg(long)]
        commit: bool,

        /// Print staging as JSON
        #[arg(long)]
        json: bool,
    },

    /// List committed ledger entries
    Entries {
        /// First date, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,

        /// Last date, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the category catalogue and unit list
    Categories,

    /// Add a category to the catalogue
    AddCategory {
        name: String,

        /// inflow or outflow
        #[arg(long)]
        direction: Direction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Init => commands::init(&config).await?,
        Command::Import {
            file,
            ai,
            deselect,
            category,
            commit,
            json,
        } => {
            commands::import(
                &config,
                commands::ImportOptions {
                    file,
                    ai,
                    deselect,
                    category,
                    commit,
                    json,
                },
            )
            .await?
        }
        Command::Entries { from, to, json } => commands::entries(&config, from, to, json).await?,
        Command::Categories => commands::categories(&config).await?,
        Command::AddCategory { name, direction } => {
            commands::add_category(&config, &name, direction).await?
        }
    }

    Ok(())
}
