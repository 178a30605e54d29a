//! # Corpus Relay CLI (`crelay`)
//!
//! The `crelay` binary is the primary interface for Corpus Relay. It
//! starts the gateway HTTP server and offers terminal views of the corpus
//! catalog, search, and RAG answers, all against the retrieval backend
//! configured in `corpus-relay.toml`.
//!
//! ## Usage
//!
//! ```bash
//! crelay --config ./corpus-relay.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crelay serve` | Start the gateway HTTP server |
//! | `crelay corpora` | List all corpora with their counts |
//! | `crelay datasets <corpus>` | List the datasets of a corpus |
//! | `crelay search "<query>"` | Search and print one page of hits |
//! | `crelay document <corpus> <id>` | Print a document and its relevant queries |
//! | `crelay query <corpus> <dataset> <id>` | Print a query and its relevant documents |
//! | `crelay answer "<question>"` | Generate a RAG answer over chosen documents |
//!
//! ## Examples
//!
//! ```bash
//! # Start the gateway on the configured bind address
//! crelay serve
//!
//! # Second page of German results from one corpus
//! crelay search "neural retrieval" --language German --corpus wiki-de --page 2
//!
//! # A document with a model-generated summary
//! crelay document msmarco D88 --summarize gpt-4o
//!
//! # Answer a question from two hand-picked documents
//! crelay answer --model gpt-4o "how are qrels scored?" \
//!     --document msmarco:D88 --document msmarco:D112
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use corpus_relay::config::{self, Config};
use corpus_relay::{browse, search, server};

/// Corpus Relay CLI — a validating gateway and terminal client for corpus
/// retrieval backends.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file is not an error; compiled-in defaults are used.
#[derive(Parser)]
#[command(
    name = "crelay",
    about = "Corpus Relay — a validating gateway and CLI for corpus retrieval backends",
    version,
    long_about = "Corpus Relay sits between frontends and a corpus retrieval backend. It \
    validates and bounds request parameters, paginates results with stable navigation links, \
    and exposes browsing, search, and RAG answers as a JSON API and a terminal CLI."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./corpus-relay.toml`. Backend, server, pagination,
    /// RAG, and display settings are read from this file; a missing file
    /// falls back to the defaults documented in `corpus-relay.example.toml`.
    #[arg(long, global = true, default_value = "./corpus-relay.toml")]
    config: PathBuf,

    /// Enable debug logging (RUST_LOG overrides this).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the gateway HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// JSON API for browser frontends until terminated.
    Serve {
        /// Override the bind address from config (e.g. `0.0.0.0:7578`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// List all corpora with their dataset and document counts.
    Corpora,

    /// List the datasets of one corpus.
    Datasets {
        /// Corpus name as reported by `crelay corpora`.
        corpus: String,
    },

    /// Search the corpora and print one page of ranked hits.
    ///
    /// The page size comes from `[pagination].search_results_per_page`.
    /// An unsupported `--language` is dropped with a warning rather than
    /// rejected, matching the gateway's behavior.
    Search {
        /// The search query string.
        query: String,

        /// Restrict results to one query language (e.g. `German`).
        #[arg(long)]
        language: Option<String>,

        /// Restrict results to a corpus; repeat for several.
        #[arg(long = "corpus")]
        corpora: Vec<String>,

        /// Page number, 1-based.
        #[arg(long, default_value_t = 1)]
        page: u64,
    },

    /// Print one document, its metadata, and the queries judged relevant
    /// to it.
    Document {
        /// Corpus the document belongs to.
        corpus: String,

        /// Document identifier.
        document_id: String,

        /// Also print a summary generated by this model.
        #[arg(long = "summarize", value_name = "MODEL")]
        summary_model: Option<String>,
    },

    /// Print one query, its metadata, and the documents judged relevant
    /// to it.
    Query {
        /// Corpus the query belongs to.
        corpus: String,

        /// Dataset the query belongs to.
        dataset: String,

        /// Query identifier.
        query_id: String,
    },

    /// Generate a RAG answer grounded on explicitly chosen documents.
    ///
    /// Documents are given as `corpus:document_id` references. The number
    /// of documents is capped by `[rag].max_documents`.
    Answer {
        /// The question to answer.
        query: String,

        /// Generation model name.
        #[arg(long)]
        model: String,

        /// Document to ground the answer on, as `corpus:document_id`.
        /// Repeat for several documents.
        #[arg(long = "document", value_parser = parse_doc_ref)]
        documents: Vec<(String, String)>,
    },
}

/// Parse a `corpus:document_id` pair for `--document` arguments.
fn parse_doc_ref(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find(':')
        .ok_or_else(|| format!("invalid document reference: no ':' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!("no config file at {}; using defaults", cli.config.display());
        Config::default()
    };

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Corpora => {
            browse::run_corpora(&cfg).await?;
        }
        Commands::Datasets { corpus } => {
            browse::run_datasets(&cfg, &corpus).await?;
        }
        Commands::Search {
            query,
            language,
            corpora,
            page,
        } => {
            search::run_search(&cfg, &query, language.as_deref(), &corpora, page).await?;
        }
        Commands::Document {
            corpus,
            document_id,
            summary_model,
        } => {
            browse::run_document(&cfg, &corpus, &document_id, summary_model.as_deref()).await?;
        }
        Commands::Query {
            corpus,
            dataset,
            query_id,
        } => {
            browse::run_query(&cfg, &corpus, &dataset, &query_id).await?;
        }
        Commands::Answer {
            query,
            model,
            documents,
        } => {
            search::run_answer(&cfg, &model, &query, &documents).await?;
        }
    }

    Ok(())
}
