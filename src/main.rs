//! Binary entry point for vectorgate.
//!
//! This binary provides the CLI interface for managing k-NN indexes and
//! running filtered vector searches.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vectorgate::cli::{self, CreateIndexArgs};
use vectorgate::config::VectorGateConfig;
use vectorgate::models::{IndexSpec, SearchOptions};
use vectorgate::observability::{self, LogFormat};
use vectorgate::VectorClient;

/// vectorgate - k-NN vector indexes with metadata filters.
#[derive(Parser)]
#[command(name = "vectorgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine URL (overrides configuration).
    #[arg(long, global = true, env = "VECTORGATE_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a k-NN index.
    CreateIndex {
        /// Index name.
        name: String,

        /// Vector dimension.
        #[arg(short, long)]
        dimension: usize,

        /// Matching engine.
        #[arg(long, default_value = IndexSpec::DEFAULT_ENGINE)]
        engine: String,

        /// Matching algorithm.
        #[arg(long, default_value = IndexSpec::DEFAULT_METHOD)]
        method: String,

        /// Space type.
        #[arg(long, default_value = IndexSpec::DEFAULT_SPACE_TYPE)]
        space_type: String,

        /// Delete and recreate the index if it exists.
        #[arg(long)]
        recreate: bool,
    },

    /// Delete an index.
    DeleteIndex {
        /// Index name.
        name: String,
    },

    /// Upsert records from a JSON file.
    Upsert {
        /// Index name.
        index: String,

        /// File holding `[{"id", "embedding", "metadata"}]`.
        file: PathBuf,
    },

    /// Print a stored document.
    Fetch {
        /// Index name.
        index: String,

        /// Document id.
        id: String,
    },

    /// Delete a document.
    Delete {
        /// Index name.
        index: String,

        /// Document id.
        id: String,
    },

    /// Run a filtered nearest-neighbor search.
    Search {
        /// Index name.
        index: String,

        /// Query vector as a JSON array.
        #[arg(long)]
        vector: String,

        /// Metadata filter as JSON.
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Return stored documents with the hits.
        #[arg(long)]
        metadata: bool,
    },

    /// Print the compiled query body of a filter.
    CompileFilter {
        /// Filter as JSON.
        filter: String,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match VectorGateConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(url) = &cli.url {
        config.engine.url.clone_from(url);
    }
    if cli.verbose {
        config.logging.level = "vectorgate=debug".to_string();
        config.logging.format = LogFormat::Pretty;
    }

    if let Err(e) = observability::init_from_settings(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command and returns its JSON output.
fn run_command(
    command: Commands,
    config: &VectorGateConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let client = || VectorClient::from_config(config);
    let output = match command {
        Commands::CreateIndex {
            name,
            dimension,
            engine,
            method,
            space_type,
            recreate,
        } => {
            let spec = IndexSpec::new(name, dimension)
                .with_engine(engine)
                .with_method(method)
                .with_space_type(space_type);
            cli::create_index(&client()?, &CreateIndexArgs { spec, recreate })?
        },
        Commands::DeleteIndex { name } => cli::delete_index(&client()?, &name)?,
        Commands::Upsert { index, file } => cli::upsert_file(&client()?, &index, &file)?,
        Commands::Fetch { index, id } => cli::fetch_document(&client()?, &index, &id)?,
        Commands::Delete { index, id } => cli::delete_document(&client()?, &index, &id)?,
        Commands::Search {
            index,
            vector,
            filter,
            limit,
            metadata,
        } => {
            let options = SearchOptions::new(limit.unwrap_or(config.default_limit))
                .with_metadata(metadata);
            cli::search(&client()?, &index, &vector, filter.as_deref(), options)?
        },
        Commands::CompileFilter { filter } => {
            cli::compile_filter(&config.filter.compiler(), &filter)?
        },
    };

    Ok(serde_json::to_string_pretty(&output)?)
}
