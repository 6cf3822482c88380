//! Command-line arguments.

use std::str::FromStr;

use catcache_core::{CategoryStatus, StatusFilter, ViewFilter};
use clap::{Parser, Subcommand};

/// catcache - manage a remote category collection.
#[derive(Debug, Parser)]
#[command(name = "catcache")]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Run against a built-in sample collection instead of the server.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Category service URL (overrides the config file).
    #[arg(long, env = "CATCACHE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// API token, sent as a bearer token.
    #[arg(long, env = "CATCACHE_API_TOKEN", global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show categories, filtered locally.
    List {
        /// Case-insensitive name filter.
        #[arg(long, short = 'q', default_value = "")]
        query: String,

        /// active, inactive or all.
        #[arg(long, short = 's', default_value = "all", value_parser = StatusFilter::from_str)]
        status: StatusFilter,
    },
    /// Ask the server to search by name.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Ask the server to filter by status.
    Filter {
        #[arg(value_parser = CategoryStatus::from_str)]
        status: CategoryStatus,
    },
    /// Create a category.
    Add {
        #[arg(required = true)]
        name: Vec<String>,

        #[arg(long, short = 's', value_parser = CategoryStatus::from_str)]
        status: Option<CategoryStatus>,
    },
    /// Rename a category and optionally change its status.
    Edit {
        id: i64,

        #[arg(required = true)]
        name: Vec<String>,

        #[arg(long, short = 's', value_parser = CategoryStatus::from_str)]
        status: Option<CategoryStatus>,
    },
    /// Delete a category.
    #[command(name = "rm", alias = "delete")]
    Remove { id: i64 },
    /// Save the server URL to the config file.
    Config { base_url: String },
}

impl Command {
    /// Local filter for `list`; other commands show everything they fetched.
    pub fn view_filter(&self) -> ViewFilter {
        match self {
            Command::List { query, status } => ViewFilter::new(query.clone(), *status),
            _ => ViewFilter::default(),
        }
    }
}
