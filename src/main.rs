use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pedaldex::index::{IndexSpec, IndexStore, TermQuery};
use pedaldex::stores::{EffectSpec, PedalboardSpec};
use pedaldex::utils::paths::IndexLocation;

#[derive(Parser)]
#[command(name = "pedaldex")]
#[command(about = "Searchable metadata index for audio effects and pedalboard presets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base directory holding the source document directories
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base directory holding the persisted indexes
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Effects,
    Pedalboards,
}

impl Kind {
    fn dir_name(self) -> &'static str {
        match self {
            Kind::Effects => "effects",
            Kind::Pedalboards => "pedalboards",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild indexes from their data source directories
    Reindex {
        /// Index to rebuild (default: all)
        kind: Option<Kind>,
    },
    /// Free-text search with optional field constraints
    Search {
        kind: Kind,

        /// Search terms
        terms: Vec<String>,

        /// Field constraint as key=value (repeatable)
        #[arg(short, long)]
        field: Vec<String>,
    },
    /// Exact-match lookup on one or more fields
    Find {
        kind: Kind,

        /// Field constraint as key=value (repeatable)
        #[arg(short, long, required = true)]
        field: Vec<String>,
    },
    /// List every document in an index
    List { kind: Kind },
    /// Upsert a document from a JSON file
    Add { kind: Kind, file: PathBuf },
    /// Delete a document by id
    Delete { kind: Kind, id: String },
}

impl Commands {
    fn kind(&self) -> Option<Kind> {
        match self {
            Commands::Reindex { kind } => *kind,
            Commands::Search { kind, .. }
            | Commands::Find { kind, .. }
            | Commands::List { kind }
            | Commands::Add { kind, .. }
            | Commands::Delete { kind, .. } => Some(*kind),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match cli.command.kind() {
        // `reindex` without a kind rebuilds every index
        None => {
            effect_store(&cli)?.reindex()?;
            pedalboard_store(&cli)?.reindex()?;
            Ok(())
        }
        Some(Kind::Effects) => run_command(&effect_store(&cli)?, &cli.command),
        Some(Kind::Pedalboards) => run_command(&pedalboard_store(&cli)?, &cli.command),
    }
}

fn run_command<S: IndexSpec>(store: &IndexStore<S>, command: &Commands) -> Result<()> {
    match command {
        Commands::Reindex { .. } => {
            store.reindex()?;
        }
        Commands::Search { terms, field, .. } => {
            let query = build_query(terms, field)?;
            for doc in store.term_search(&query)? {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
        Commands::Find { field, .. } => {
            let constraints = single_valued(parse_fields(field)?)?;
            for doc in store.find(&constraints)? {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
        Commands::List { .. } => {
            for doc in store.every() {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
        Commands::Add { file, .. } => {
            let bytes =
                std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let source: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", file.display()))?;
            store.upsert(&source)?;
        }
        Commands::Delete { id, .. } => {
            if store.delete(id)? {
                println!("deleted {id}");
            } else {
                println!("not found: {id}");
            }
        }
    }
    Ok(())
}

fn effect_store(cli: &Cli) -> Result<IndexStore<EffectSpec>> {
    let location = resolve_location(cli, Kind::Effects)?;
    Ok(IndexStore::open(EffectSpec::new(
        location.storage,
        location.data_source,
    ))?)
}

fn pedalboard_store(cli: &Cli) -> Result<IndexStore<PedalboardSpec>> {
    let location = resolve_location(cli, Kind::Pedalboards)?;
    Ok(IndexStore::open(PedalboardSpec::new(
        location.storage,
        location.data_source,
    ))?)
}

fn resolve_location(cli: &Cli, kind: Kind) -> Result<IndexLocation> {
    let mut location = IndexLocation::for_kind(kind.dir_name())?;
    if let Some(data_dir) = &cli.data_dir {
        location.data_source = data_dir.join(kind.dir_name());
    }
    if let Some(index_dir) = &cli.index_dir {
        location.storage = index_dir.join(format!("{}.index", kind.dir_name()));
    }
    Ok(location)
}

/// Build a term query from free-text words plus key=value constraints
fn build_query(terms: &[String], fields: &[String]) -> Result<TermQuery> {
    let mut query: TermQuery = parse_fields(fields)?;
    if !terms.is_empty() {
        query.insert("term".to_string(), vec![terms.join(" ")]);
    }
    if query.is_empty() {
        bail!("give search terms, --field constraints, or both");
    }
    Ok(query)
}

fn parse_fields(fields: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut parsed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for raw in fields {
        let Some((key, value)) = raw.split_once('=') else {
            bail!("field constraint must be key=value, got '{raw}'");
        };
        parsed
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(parsed)
}

fn single_valued(
    fields: BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, String>> {
    let mut constraints = BTreeMap::new();
    for (key, mut values) in fields {
        if values.len() != 1 {
            bail!("find takes one value per field, got {} for '{key}'", values.len());
        }
        constraints.insert(key, values.pop().unwrap_or_default());
    }
    Ok(constraints)
}
