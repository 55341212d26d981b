//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use imf_core::document::read_document;
use imf_core::validate::validate as validate_document;
use imf_core::{Detached, EdgeKind, Graph, RemoteStore};
use imf_remote::{HttpRemote, RemoteConfig};

pub mod edit;
pub mod inspect;
pub mod remote;
pub mod validate;

/// IMF - diagram integrity tooling
#[derive(Parser)]
#[command(name = "imf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the remote config file
    #[arg(long, global = true, env = "IMF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate diagram documents
    Validate(validate::ValidateArgs),

    /// Show nodes, edges and relation consistency of a document
    Inspect(inspect::InspectArgs),

    /// Connect two nodes with a typed edge
    Connect(edit::ConnectArgs),

    /// Change the type of an edge
    Retype(edit::RetypeArgs),

    /// Delete an edge
    Disconnect(edit::DisconnectArgs),

    /// Delete a node and every edge touching it
    DeleteNode(edit::DeleteNodeArgs),

    /// Rename a node
    Rename(edit::RenameArgs),

    /// Upload a .imf document to the server
    Import(remote::ImportArgs),

    /// Download the server graph into a document
    Pull(remote::PullArgs),

    /// Delete every node and edge on the server
    Reset(remote::ResetArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Commands::Validate(args) => validate::execute(args),
            Commands::Inspect(args) => inspect::execute(args),
            Commands::Connect(args) => edit::connect(args, config).await,
            Commands::Retype(args) => edit::retype(args, config).await,
            Commands::Disconnect(args) => edit::disconnect(args, config).await,
            Commands::DeleteNode(args) => edit::delete_node(args, config).await,
            Commands::Rename(args) => edit::rename(args, config).await,
            Commands::Import(args) => remote::import(args, config).await,
            Commands::Pull(args) => remote::pull(args, config).await,
            Commands::Reset(args) => remote::reset(args, config).await,
        }
    }
}

/// Read and validate a document, returning its graph.
pub(crate) fn load_graph(path: &Path) -> Result<Graph> {
    let document = read_document(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let validated = validate_document(&document)
        .map_err(|violation| anyhow::anyhow!("{}: {}", path.display(), violation))?;
    Ok(validated.graph)
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<RemoteConfig> {
    RemoteConfig::load(path).context("Failed to load remote config")
}

/// The store edits go through, and who they are attributed to.
pub(crate) struct Session {
    pub store: Box<dyn RemoteStore>,
    pub user_id: Option<String>,
}

impl Session {
    /// The configured server when `remote` is set, otherwise a detached store.
    pub fn open(remote: bool, config: Option<&Path>) -> Result<Self> {
        if !remote {
            return Ok(Self {
                store: Box::new(Detached),
                user_id: None,
            });
        }
        let config = load_config(config)?;
        tracing::debug!(base_url = %config.base_url, "Using remote store");
        Ok(Self {
            store: Box::new(HttpRemote::new(&config)),
            user_id: config.user_id.clone(),
        })
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }
}

pub(crate) fn parse_kind(s: &str) -> std::result::Result<EdgeKind, String> {
    EdgeKind::parse(s).ok_or_else(|| {
        let names: Vec<&str> = EdgeKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown edge type '{}' (expected one of: {})", s, names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_connect() {
        let cli = Cli::try_parse_from([
            "imf", "connect", "plant.imf", "--source", "a", "--target", "b", "--kind", "Part",
        ])
        .unwrap();
        match cli.command {
            Commands::Connect(args) => {
                assert_eq!(args.kind, EdgeKind::Part);
                assert_eq!(args.source_handle, "out");
                assert!(!args.remote);
            }
            _ => panic!("expected connect"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(parse_kind("sibling").unwrap_err().contains("connected"));
        assert!(Cli::try_parse_from(["imf", "retype", "plant.imf", "e1", "sibling"]).is_err());
    }
}
