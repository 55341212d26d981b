//! Commands that talk to the diagram server.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use tracing::warn;

use imf_core::document::{check_import_files, read_document, write_document};
use imf_core::{edit, Graph, RemoteStore};

use super::Session;
use crate::output;

#[derive(Args)]
pub struct ImportArgs {
    /// The .imf document to upload
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct PullArgs {
    /// Where to write the fetched graph
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

pub async fn import(args: ImportArgs, config: Option<&Path>) -> Result<()> {
    let path = check_import_files(args.files.as_slice())?;
    let document = read_document(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let session = Session::open(true, config)?;
    let mut graph = Graph::new();
    let report = edit::import_document(&mut graph, session.store(), &document).await?;

    output::print_import(&report);
    Ok(())
}

pub async fn pull(args: PullArgs, config: Option<&Path>) -> Result<()> {
    let session = Session::open(true, config)?;
    let graph = session.store().fetch_graph().await?;

    write_document(&args.file, &graph)
        .with_context(|| format!("Failed to write {}", args.file.display()))?;
    println!(
        "{} {} nodes, {} edges into {}",
        "Pulled".green().bold(),
        graph.nodes.len(),
        graph.edges.len(),
        args.file.display()
    );
    Ok(())
}

pub async fn reset(args: ResetArgs, config: Option<&Path>) -> Result<()> {
    let confirmed = args.yes
        || Confirm::new()
            .with_prompt("Delete every node and edge on the server?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
    if !confirmed {
        println!("{}", "Reset cancelled.".dimmed());
        return Ok(());
    }

    let session = Session::open(true, config)?;
    let store: &dyn RemoteStore = session.store();
    let mut graph = fetch_or_empty(store).await;
    let failures = edit::reset(&mut graph, store).await;

    if failures.is_empty() {
        println!("{}", "Diagram reset.".green().bold());
        return Ok(());
    }
    output::print_failures(&failures);
    anyhow::bail!("Reset incomplete: {} call(s) failed", failures.len())
}

/// The server's current graph, or an empty one when it cannot be fetched.
async fn fetch_or_empty(store: &dyn RemoteStore) -> Graph {
    match store.fetch_graph().await {
        Ok(graph) => graph,
        Err(e) => {
            warn!(error = %e, "Could not fetch diagram before reset, resetting collections only");
            Graph::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imf_core::{Detached, MemoryRemote, Node, NodeKind, Position};

    #[tokio::test]
    async fn test_fetch_or_empty_falls_back_when_fetch_fails() {
        assert!(fetch_or_empty(&Detached).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_or_empty_returns_server_graph() {
        let node = Node::new("a", NodeKind::Block, Position::default());
        let remote = MemoryRemote::with_graph(Graph::from_parts(vec![node], vec![]));
        assert_eq!(fetch_or_empty(&remote).await.nodes.len(), 1);
    }
}
