//! `imf inspect`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use imf_core::audit;

use super::load_graph;
use crate::output;

#[derive(Args)]
pub struct InspectArgs {
    /// Document to inspect
    pub file: PathBuf,

    /// Show a single node in detail
    #[arg(long)]
    pub node: Option<String>,

    /// Print the graph and audit as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let graph = load_graph(&args.file)?;
    let inconsistencies = audit(&graph);

    if args.json {
        let value = match &args.node {
            Some(id) => {
                let node = graph
                    .node(id)
                    .ok_or_else(|| anyhow::anyhow!("Node not found: {}", id))?;
                serde_json::json!({
                    "node": node,
                    "edges": graph.connected_edges(id),
                })
            }
            None => serde_json::json!({
                "nodes": graph.nodes,
                "edges": graph.edges,
                "inconsistencies": inconsistencies,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &args.node {
        Some(id) => {
            let node = graph
                .node(id)
                .ok_or_else(|| anyhow::anyhow!("Node not found: {}", id))?;
            output::print_node(node, &graph);
        }
        None => {
            output::print_graph(&graph);
            println!();
            output::print_inconsistencies(&inconsistencies);
        }
    }
    Ok(())
}
