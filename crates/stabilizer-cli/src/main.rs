//! Offline operator tool for stabilization data.
//!
//! Provides the `stabilizer` binary with subcommands that work directly on
//! a persisted snapshot, without a running server:
//!
//! - `convert`: copy a snapshot between the JSON folder and SQLite backends
//! - `leaves`: list the packages a worker could be handed right now
//! - `check`: report whether the persisted graph contains a cycle, and
//!   optionally break it
//!
//! Do not point it at the data of a running server; the server only reads
//! its store at start-up and will overwrite any change on its next save.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use stabilizer_core::{break_cycles, collect_leaves, LeafPolicy, Quorum, StabilizationState};
use stabilizer_storage::{GraphStore, JsonFileStore, SqliteStore, StorageError};

/// Stabilization graph tools.
#[derive(Parser)]
#[command(name = "stabilizer", about = "Stabilization graph tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Snapshot backend on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// Folder of JSON files.
    Json,
    /// SQLite database file.
    Sqlite,
}

/// Leaf policy as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Plain,
    Combination,
}

impl From<PolicyArg> for LeafPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Plain => LeafPolicy::Plain,
            PolicyArg::Combination => LeafPolicy::PerCombination,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Copy a snapshot from one backend to another.
    Convert {
        /// Source path.
        #[arg(long)]
        from: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        from_kind: StoreKind,
        /// Destination path; existing data there is replaced.
        #[arg(long)]
        to: PathBuf,
        #[arg(long, value_enum, default_value = "sqlite")]
        to_kind: StoreKind,
    },
    /// List eligible leaves, one atom per line.
    Leaves {
        #[arg(short, long)]
        store: PathBuf,
        #[arg(short, long, value_enum, default_value = "json")]
        kind: StoreKind,
        #[arg(short, long, value_enum, default_value = "plain")]
        policy: PolicyArg,
    },
    /// Check a snapshot for dependency cycles.
    Check {
        #[arg(short, long)]
        store: PathBuf,
        #[arg(short, long, value_enum, default_value = "json")]
        kind: StoreKind,
        /// Break any cycle found and save the result.
        #[arg(long)]
        fix: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Convert {
            from,
            from_kind,
            to,
            to_kind,
        } => run_convert(&from, from_kind, &to, to_kind),
        Commands::Leaves {
            store,
            kind,
            policy,
        } => run_leaves(&store, kind, policy.into()),
        Commands::Check { store, kind, fix } => run_check(&store, kind, fix),
    };
    process::exit(exit_code);
}

fn open_store(path: &Path, kind: StoreKind) -> Result<Box<dyn GraphStore>, StorageError> {
    Ok(match kind {
        StoreKind::Json => Box::new(JsonFileStore::new(path)),
        StoreKind::Sqlite => Box::new(SqliteStore::open(path)?),
    })
}

/// Opens and loads a store. Reports to stderr and returns the exit code on
/// failure.
fn load(path: &Path, kind: StoreKind) -> Result<(Box<dyn GraphStore>, StabilizationState), i32> {
    let store = open_store(path, kind).map_err(|e| {
        eprintln!("Error: failed to open '{}': {}", path.display(), e);
        3
    })?;
    match store.load_state(Quorum::default()) {
        Ok(Some(state)) => Ok((store, state)),
        Ok(None) => {
            eprintln!("Error: no snapshot found at '{}'", path.display());
            Err(1)
        }
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", path.display(), e);
            Err(3)
        }
    }
}

/// Execute the convert subcommand.
///
/// Returns exit code: 0 = success, 1 = nothing to convert, 3 = storage error.
fn run_convert(from: &Path, from_kind: StoreKind, to: &Path, to_kind: StoreKind) -> i32 {
    let (_, state) = match load(from, from_kind) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let mut dest = match open_store(to, to_kind) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open '{}': {}", to.display(), e);
            return 3;
        }
    };
    if let Err(e) = dest.save_state(&state) {
        eprintln!("Error: failed to save '{}': {}", to.display(), e);
        return 3;
    }
    println!(
        "{}",
        json!({
            "packages": state.graph.live_count(),
            "sentinels": state.graph.sentinel_count(),
            "priority": state.priority.len(),
            "to": to.display().to_string(),
        })
    );
    0
}

/// Execute the leaves subcommand.
fn run_leaves(path: &Path, kind: StoreKind, policy: LeafPolicy) -> i32 {
    let (_, state) = match load(path, kind) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    for line in leaf_lines(&state, policy) {
        println!("{line}");
    }
    0
}

/// Atoms of all leaves, sorted, with flags under the combination policy.
fn leaf_lines(state: &StabilizationState, policy: LeafPolicy) -> Vec<String> {
    let mut lines: Vec<String> = collect_leaves(&state.graph, policy)
        .into_iter()
        .filter_map(|id| state.graph.package(id))
        .map(|pkg| match (policy, pkg.current_combination()) {
            (LeafPolicy::PerCombination, Some(combo)) if !combo.is_empty() => {
                format!("{} {}", pkg.atom, combo)
            }
            _ => pkg.atom.to_string(),
        })
        .collect();
    lines.sort();
    lines
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = acyclic (or fixed), 2 = cycle found, 3 = storage
/// error.
fn run_check(path: &Path, kind: StoreKind, fix: bool) -> i32 {
    let (mut store, mut state) = match load(path, kind) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let acyclic = state.graph.is_acyclic();
    let mut broken = Vec::new();
    if !acyclic && fix {
        broken = break_cycles(&mut state.graph);
        if let Err(e) = store.save_state(&state) {
            eprintln!("Error: failed to save '{}': {}", path.display(), e);
            return 3;
        }
    }

    println!(
        "{}",
        json!({
            "acyclic": acyclic,
            "packages": state.graph.live_count(),
            "sentinels": state.graph.sentinel_count(),
            "dependencies": state.graph.edge_count(),
            "broken": broken
                .iter()
                .map(|b| format!("{} -> {}", b.parent, b.child))
                .collect::<Vec<_>>(),
        })
    );

    if acyclic || fix {
        0
    } else {
        2
    }
}
