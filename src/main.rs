use clap::Parser;
use diamond_registry::application::catalog::ModuleCatalog;
use diamond_registry::application::diamond::Diamond;
use diamond_registry::domain::identity::Identity;
use diamond_registry::domain::ports::StateStoreBox;
use diamond_registry::infrastructure::in_memory::InMemoryStateStore;
#[cfg(feature = "storage-rocksdb")]
use diamond_registry::infrastructure::rocksdb::RocksDBStore;
use diamond_registry::interfaces::csv::route_writer::RouteWriter;
use diamond_registry::interfaces::csv::script_reader::{ScriptReader, ScriptStep};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Cut script CSV file (`batch, action, handler, target`)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Identity submitting every cut. Owns the registry when it is created.
    #[arg(long, default_value = "0x1")]
    owner: Identity,

    /// Identity bound to the bootstrap entry point of a new registry.
    #[arg(long, default_value = "0xb007")]
    bootstrap_handler: Identity,
}

fn open_store(db_path: Option<PathBuf>) -> Result<StateStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStateStore::new()))
        }
        None => Ok(Box::new(InMemoryStateStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store = open_store(cli.db_path)?;
    let mut diamond = Diamond::open(cli.owner, cli.bootstrap_handler, ModuleCatalog::new(), store)
        .await
        .into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = ScriptReader::new(file);
    for step in reader.steps() {
        match step {
            Ok(ScriptStep::Deploy { identity, kind }) => {
                if !diamond.deploy_shared(identity, kind.instantiate()) {
                    eprintln!("Error deploying module: {identity} cannot hold code");
                }
            }
            Ok(ScriptStep::Cut {
                batch,
                cuts,
                initializer,
            }) => {
                if let Err(e) = diamond.cut(cli.owner, cuts, initializer).await {
                    eprintln!("Error applying cut batch {batch}: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading cut script: {e}");
            }
        }
    }

    // Output final routing table
    let stdout = io::stdout();
    let mut writer = RouteWriter::new(stdout.lock());
    writer.write_facets(&diamond.facets()).into_diagnostic()?;

    Ok(())
}
