use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use log::debug;
use serde::Serialize;
use serde_json::{Value, json};

use apix_core::cache::{ensure_dir, write_json_atomic};
use apix_core::config::{self, CONFIG_FILE_NAME};
use apix_core::fetch::unix_now;
use apix_core::tools::{
    DEFAULT_SEARCH_LIMIT, ToolOutput, get_request_schema, get_response_schema, search_operations,
};
use apix_core::{ApixConfig, DerefLimits, OpenApiStore, ToolError};

#[derive(Parser)]
#[command(
    name = "apix",
    about = "Search a service's OpenAPI operations and print inlined request/response schemas",
    version
)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags layered over `.apix.yaml` and `OPENAPI_*` environment variables.
#[derive(Args)]
struct ConfigArgs {
    /// Service base URL (e.g. http://localhost:8000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Cache directory (default: .cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Skip refetching while the cached copy is younger than this (default: 0)
    #[arg(long, global = true)]
    cache_ttl_seconds: Option<u64>,

    /// HTTP timeout in seconds (default: 10)
    #[arg(long, global = true)]
    timeout_seconds: Option<f64>,

    /// Max $ref inlining depth (default: 20)
    #[arg(long, global = true)]
    deref_max_depth: Option<usize>,

    /// Max nodes visited while inlining $refs (default: 20000)
    #[arg(long, global = true)]
    deref_max_nodes: Option<usize>,

    /// Path to the config file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch /openapi.json and print the cache metadata
    Fetch,

    /// Print the operation index, or write it to a file
    Index {
        /// Output file path (e.g. .cache/index.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Search operations by substring
    Search {
        /// Case-insensitive substring; empty matches everything
        #[arg(long, default_value = "")]
        query: String,

        /// HTTP method filter (GET, POST, ...)
        #[arg(long)]
        method: Option<String>,

        /// Max results
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Print the request or response schema of an operation
    Schema {
        #[command(subcommand)]
        kind: SchemaCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Parameters and request body, with local $refs inlined
    Request {
        #[arg(long)]
        operation_id: String,
    },

    /// Response bodies per status code, with local $refs inlined
    Response {
        #[arg(long)]
        operation_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    run(cli, &mut io::stdout())
}

/// Dispatch one command. Only commands that talk to the service resolve config.
fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "apix", out);
            Ok(())
        }

        Commands::Fetch => {
            let (mut store, _) = open_store(&cli.overrides)?;
            emit(ToolOutput::from(
                store.load().map(|loaded| loaded.metadata.clone()),
            ))
        }

        Commands::Index { out: path } => {
            let (mut store, _) = open_store(&cli.overrides)?;
            cmd_index(&mut store, path)
        }

        Commands::Search {
            query,
            method,
            limit,
        } => {
            let (mut store, _) = open_store(&cli.overrides)?;
            emit(search_operations(
                &mut store,
                &query,
                None,
                method.as_deref(),
                limit,
            ))
        }

        Commands::Schema { kind } => {
            let (mut store, limits) = open_store(&cli.overrides)?;
            match kind {
                SchemaCommand::Request { operation_id } => {
                    emit(get_request_schema(&mut store, &operation_id, limits))
                }
                SchemaCommand::Response { operation_id } => {
                    emit(get_response_schema(&mut store, &operation_id, limits))
                }
            }
        }
    }
}

fn open_store(args: &ConfigArgs) -> Result<(OpenApiStore, DerefLimits)> {
    let config = resolve_config(args)?;
    let store = OpenApiStore::from_config(&config)?;
    Ok((store, config.deref_limits()))
}

/// Defaults, then the config file, then the environment, then flags.
fn resolve_config(args: &ConfigArgs) -> Result<ApixConfig> {
    let mut cfg = config::load_config(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?
        .unwrap_or_default();
    cfg.apply_env()?;

    if let Some(base_url) = &args.base_url {
        cfg.base_url = base_url.clone();
    }
    if let Some(cache_dir) = &args.cache_dir {
        cfg.cache_dir = cache_dir.clone();
    }
    if let Some(ttl) = args.cache_ttl_seconds {
        cfg.cache_ttl_seconds = ttl;
    }
    if let Some(timeout) = args.timeout_seconds {
        cfg.timeout_seconds = timeout;
    }
    if let Some(depth) = args.deref_max_depth {
        cfg.deref_max_depth = depth;
    }
    if let Some(nodes) = args.deref_max_nodes {
        cfg.deref_max_nodes = nodes;
    }

    debug!("Resolved config: {cfg:?}");
    Ok(cfg)
}

fn cmd_index(store: &mut OpenApiStore, out: Option<PathBuf>) -> Result<()> {
    match (out, index_payload(store)) {
        (Some(path), Ok(payload)) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            write_json_atomic(&path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;

            let count = payload["operations"].as_array().map_or(0, Vec::len);
            eprintln!("Wrote {count} operations to {}", path.display());
            Ok(())
        }
        (_, payload) => emit(ToolOutput::from(payload)),
    }
}

fn index_payload(store: &mut OpenApiStore) -> Result<Value, ToolError> {
    let base_url = store.base_url().to_string();
    let loaded = store.load()?;
    Ok(json!({
        "generated_at": unix_now(),
        "source": {
            "baseUrl": base_url,
            "url": loaded.metadata.url,
            "sha256": loaded.metadata.sha256,
        },
        "operations": loaded.index.operations(),
    }))
}

/// Print a tool result as pretty JSON. An error envelope also fails the process.
fn emit<T: Serialize>(output: ToolOutput<T>) -> Result<()> {
    let json = serde_json::to_string_pretty(&output)?;
    println!("{}", json);

    match output.error_code() {
        Some(code) => anyhow::bail!("tool call failed with {code}"),
        None => Ok(()),
    }
}
