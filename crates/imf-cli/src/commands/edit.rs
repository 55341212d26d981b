//! Document editing commands.
//!
//! Each command loads and validates the document, applies one edit through
//! the engine and writes the result back.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use imf_core::document::write_document;
use imf_core::edit::{self, EdgePatch, NodePatch};
use imf_core::graph::model::now_millis;
use imf_core::{Edge, EdgeData, EdgeKind, Graph};

use super::{load_graph, parse_kind, Session};
use crate::output;

/// Attribution used when no user id is configured.
const DEFAULT_AUTHOR: &str = "imf";

#[derive(Args)]
pub struct ConnectArgs {
    pub file: PathBuf,

    /// Source node id
    #[arg(long)]
    pub source: String,

    /// Target node id
    #[arg(long)]
    pub target: String,

    /// Edge type (connected, topology, fulfilled, part, transfer, ...)
    #[arg(long, value_parser = parse_kind)]
    pub kind: EdgeKind,

    #[arg(long, default_value = "out")]
    pub source_handle: String,

    #[arg(long, default_value = "in")]
    pub target_handle: String,

    /// Edge label (defaults to the type name)
    #[arg(long)]
    pub label: Option<String>,

    /// Also persist the change on the configured server
    #[arg(long)]
    pub remote: bool,
}

#[derive(Args)]
pub struct RetypeArgs {
    pub file: PathBuf,
    pub edge: String,
    #[arg(value_parser = parse_kind)]
    pub kind: EdgeKind,
    #[arg(long)]
    pub remote: bool,
}

#[derive(Args)]
pub struct DisconnectArgs {
    pub file: PathBuf,
    pub edge: String,
    #[arg(long)]
    pub remote: bool,
}

#[derive(Args)]
pub struct DeleteNodeArgs {
    pub file: PathBuf,
    pub node: String,
    #[arg(long)]
    pub remote: bool,
}

#[derive(Args)]
pub struct RenameArgs {
    pub file: PathBuf,
    pub node: String,
    pub name: String,

    /// Set the custom name instead of the label
    #[arg(long)]
    pub custom: bool,

    #[arg(long)]
    pub remote: bool,
}

pub async fn connect(args: ConnectArgs, config: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(&args.file)?;
    let session = Session::open(args.remote, config)?;

    let now = now_millis();
    let id = uuid::Uuid::new_v4().to_string();
    let edge = Edge {
        id: id.clone(),
        source: args.source,
        source_handle: args.source_handle,
        target: args.target,
        target_handle: args.target_handle,
        kind: args.kind,
        data: EdgeData {
            id,
            created_at: now,
            updated_at: now,
            lock_connection: false,
            label: args.label.unwrap_or_else(|| args.kind.to_string()),
            created_by: session
                .user_id
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        },
    };

    let change = edit::create_edge(&mut graph, session.store(), edge).await?;
    save(&args.file, &graph)?;
    output::print_edge_change("Connected", &change);
    Ok(())
}

pub async fn retype(args: RetypeArgs, config: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(&args.file)?;
    let session = Session::open(args.remote, config)?;

    let patch = EdgePatch::retype(args.kind);
    let change = edit::update_edge(&mut graph, session.store(), &args.edge, &patch).await?;
    save(&args.file, &graph)?;
    output::print_edge_change("Retyped", &change);
    Ok(())
}

pub async fn disconnect(args: DisconnectArgs, config: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(&args.file)?;
    let session = Session::open(args.remote, config)?;

    let change = edit::delete_edge(&mut graph, session.store(), &args.edge).await?;
    save(&args.file, &graph)?;
    output::print_edge_change("Disconnected", &change);
    Ok(())
}

pub async fn delete_node(args: DeleteNodeArgs, config: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(&args.file)?;
    let session = Session::open(args.remote, config)?;

    let report = imf_core::delete_node(&mut graph, session.store(), &args.node).await?;
    save(&args.file, &graph)?;
    output::print_cascade(&report);
    Ok(())
}

pub async fn rename(args: RenameArgs, config: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(&args.file)?;
    let session = Session::open(args.remote, config)?;

    let patch = if args.custom {
        NodePatch {
            custom_name: Some(args.name),
            ..NodePatch::default()
        }
    } else {
        NodePatch {
            label: Some(args.name),
            ..NodePatch::default()
        }
    };
    let node = edit::update_node(&mut graph, session.store(), &args.node, &patch).await?;
    save(&args.file, &graph)?;
    println!("Renamed {} to {}", node.id, node.meta().display_name());
    Ok(())
}

fn save(path: &Path, graph: &Graph) -> Result<()> {
    write_document(path, graph).with_context(|| format!("Failed to write {}", path.display()))
}
