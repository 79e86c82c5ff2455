//! CLI module for Quarry.
//!
//! Subcommands:
//! - `models`: List the repositories available in the configured store
//! - `query`: Run JSON criteria through a repository
//! - `compile`: Print the query descriptor compiled from JSON criteria

mod compile;
mod models;
mod query;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::context::Context;

/// Quarry - criteria-driven generic repositories
#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Query fixture-backed repositories with JSON criteria")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the repositories available in the configured store
    Models,

    /// Run JSON criteria through a repository and print the result
    Query {
        /// Repository to query
        #[arg(short, long)]
        model: String,

        /// Criteria as JSON, e.g. '{"where": {"active": true}}'
        #[arg(short, long)]
        criteria: Option<String>,

        /// 1-based page number; returns rows with the total count
        #[arg(long)]
        page: Option<u64>,

        /// Rows per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<u64>,

        /// Return only the first matching record
        #[arg(long, conflicts_with_all = ["page", "page_size"])]
        one: bool,
    },

    /// Print the query descriptor compiled from JSON criteria
    Compile {
        /// Criteria as JSON
        #[arg(short, long)]
        criteria: Option<String>,

        /// 1-based page number to paginate the descriptor
        #[arg(long)]
        page: Option<u64>,

        /// Rows per page
        #[arg(long)]
        page_size: Option<u64>,
    },
}

impl App {
    /// Run the CLI application against the loaded configuration.
    pub async fn run(self, config: Config) -> color_eyre::Result<()> {
        let ctx = Context::from_config(config)?;

        match self.command {
            Command::Models => self.run_models(&ctx),
            Command::Query {
                ref model,
                ref criteria,
                page,
                page_size,
                one,
            } => {
                self.run_query(&ctx, model, criteria.as_deref(), page, page_size, one)
                    .await
            }
            Command::Compile {
                ref criteria,
                page,
                page_size,
            } => self.run_compile(&ctx, criteria.as_deref(), page, page_size),
        }
    }
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
