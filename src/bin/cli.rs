//! treekv CLI
//!
//! Command-line interface for inspecting and editing a treekv store whose
//! values are JSON-encoded.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use treekv::{Config, JsonCodec, Node, Store, TreeError};

/// treekv CLI
#[derive(Parser, Debug)]
#[command(name = "treekv-cli")]
#[command(about = "Inspect and edit a treekv store (JSON values)")]
#[command(version)]
struct Args {
    /// Database file
    #[arg(short, long, default_value = "./treekv_data/store.redb")]
    db: PathBuf,

    /// Engine cache size in MB
    #[arg(long, default_value = "16")]
    cache_mb: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the value stored under a key
    Get {
        /// Bucket path segments
        path: Vec<String>,

        /// The key to get
        #[arg(short, long)]
        key: String,
    },

    /// Store a JSON value under a key
    Set {
        /// Bucket path segments
        path: Vec<String>,

        /// The key to set
        #[arg(short, long)]
        key: String,

        /// The value, as JSON
        #[arg(short, long)]
        value: String,

        /// Leave an existing value untouched
        #[arg(long)]
        if_none: bool,
    },

    /// Delete a key
    Del {
        /// Bucket path segments
        path: Vec<String>,

        /// The key to delete
        #[arg(short, long)]
        key: String,
    },

    /// List the direct children of a bucket
    Ls {
        /// Bucket path segments
        path: Vec<String>,

        /// Only keys starting with this prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
    },

    /// Count the direct children of a bucket
    Len {
        /// Bucket path segments
        path: Vec<String>,

        /// Only keys starting with this prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
    },

    /// Delete a bucket and everything below it
    Drop {
        /// Bucket path segments
        path: Vec<String>,
    },

    /// Keep only the last N children of a bucket, by key order
    Trim {
        /// Bucket path segments
        path: Vec<String>,

        /// How many children to keep
        #[arg(long)]
        keep: usize,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .db_path(&args.db)
        .cache_size(args.cache_mb * 1024 * 1024)
        .build();

    let store = match Store::open_with_codec(config, JsonCodec) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&store, args.command);

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(TreeError::KeyNotFound) => {
            eprintln!("not found");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(store: &Store<JsonCodec>, command: Commands) -> treekv::Result<()> {
    match command {
        Commands::Get { path, key } => {
            let value: serde_json::Value = node_at(store, &path).get(&key)?;
            println!("{}", value);
        }
        Commands::Set {
            path,
            key,
            value,
            if_none,
        } => {
            let value: serde_json::Value = serde_json::from_str(&value)
                .map_err(|e| TreeError::Encode(Box::new(e)))?;
            let node = node_at(store, &path);
            if if_none {
                node.set_if_none(&key, &value)?;
            } else {
                node.set(&key, &value)?;
            }
        }
        Commands::Del { path, key } => {
            node_at(store, &path).delete(&key)?;
        }
        Commands::Ls { path, prefix } => {
            node_at(store, &path).each_key(&prefix, |key, _| {
                println!("{:?}", key);
                Ok(ControlFlow::Continue(()))
            })?;
        }
        Commands::Len { path, prefix } => {
            println!("{}", node_at(store, &path).length(&prefix)?);
        }
        Commands::Drop { path } => {
            node_at(store, &path).drop()?;
        }
        Commands::Trim { path, keep } => {
            node_at(store, &path).drop_except_last(keep)?;
        }
    }
    Ok(())
}

fn node_at<'a>(store: &'a Store<JsonCodec>, path: &[String]) -> Node<'a, JsonCodec> {
    if path.is_empty() {
        store.root()
    } else {
        store.node(path)
    }
}
