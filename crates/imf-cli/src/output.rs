//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use imf_core::edit::{EdgeChange, ImportReport};
use imf_core::{
    CascadeReport, DanglingReference, Edge, Graph, Inconsistency, Node, NodeKind, RemoteFailure,
    Validated, Violation,
};
use std::path::Path;
use unicode_width::UnicodeWidthStr;

fn kind_colored(kind: NodeKind) -> ColoredString {
    match kind {
        NodeKind::Block => "block".cyan(),
        NodeKind::Connector => "connector".yellow(),
        NodeKind::Terminal => "terminal".magenta(),
    }
}

/// Print an accepted document.
pub fn print_valid(path: &Path, validated: &Validated) {
    println!(
        "{} {} {}",
        "✓".green(),
        path.display().to_string().bold(),
        format!(
            "({} nodes, {} edges)",
            validated.graph.nodes.len(),
            validated.graph.edges.len()
        )
        .dimmed()
    );
    if validated.defaulted > 0 {
        println!("    {} size value(s) defaulted", validated.defaulted);
    }
    print_dangling(&validated.dangling);
}

/// Print a rejected document and its violations.
pub fn print_rejected(path: &Path, violations: &[Violation]) {
    println!("{} {}", "✗".red(), path.display().to_string().bold());
    for violation in violations {
        println!("    {}", violation.to_string().red());
    }
}

pub fn print_dangling(dangling: &[DanglingReference]) {
    for reference in dangling {
        println!(
            "    {} dangling reference {}",
            "⚠".yellow(),
            reference.to_string().yellow()
        );
    }
}

/// Print node and edge tables.
pub fn print_graph(graph: &Graph) {
    if graph.is_empty() {
        println!("{}", "Empty diagram.".dimmed());
        return;
    }

    println!("{}", "Nodes".bold());
    println!("{} {} {} {}", pad_right("ID", 24), pad_right("Type", 10), pad_right("Name", 28), "Relations");
    println!("{}", "─".repeat(72));
    for node in &graph.nodes {
        let relations: usize = node
            .kind()
            .relation_fields()
            .iter()
            .map(|f| node.related_ids(*f).len())
            .sum();
        println!(
            "{} {} {} {}",
            pad_right(&truncate_visual(&node.id, 24), 24),
            pad_colored(kind_colored(node.kind()), 10),
            pad_right(&truncate_visual(node.meta().display_name(), 28), 28),
            relations
        );
    }

    if !graph.edges.is_empty() {
        println!();
        println!("{}", "Edges".bold());
        println!("{}", "─".repeat(72));
        for edge in &graph.edges {
            print_edge_line(edge);
        }
    }

    println!();
    println!("{} node(s), {} edge(s)", graph.nodes.len(), graph.edges.len());
}

fn print_edge_line(edge: &Edge) {
    println!(
        "  {} {} {} {} {}",
        pad_right(&truncate_visual(&edge.id, 24), 24),
        truncate_visual(&edge.source, 20),
        "→".dimmed(),
        truncate_visual(&edge.target, 20),
        format!("[{}]", edge.kind).cyan()
    );
}

/// Print one node's relation fields and connected edges.
pub fn print_node(node: &Node, graph: &Graph) {
    let name = node.meta().display_name();
    println!("{} {}", node.id.cyan().bold(), format!("({})", node.kind()).dimmed());
    if !name.is_empty() {
        println!("{}: {}", "Name".bold(), name);
    }
    println!(
        "{}: ({}, {})  {}×{}",
        "Position".bold(),
        node.position.x,
        node.position.y,
        node.width,
        node.height
    );

    println!();
    println!("{}", "Relations".bold());
    for field in node.kind().relation_fields() {
        let ids = node.related_ids(*field);
        let shown = if ids.is_empty() {
            "-".dimmed().to_string()
        } else {
            ids.join(", ")
        };
        println!("  {} {}", pad_right(field.wire_name(), 14), shown);
    }

    let connected = graph.connected_edges(&node.id);
    if !connected.is_empty() {
        println!();
        println!("{}", "Edges".bold());
        for edge in &connected {
            print_edge_line(edge);
        }
    }
}

pub fn print_inconsistencies(found: &[Inconsistency]) {
    if found.is_empty() {
        println!("{} relation fields agree with edges", "✓".green());
        return;
    }
    println!("{} {} inconsistenc(ies)", "⚠".yellow(), found.len());
    for inconsistency in found {
        println!("    {}", inconsistency.to_string().yellow());
    }
}

pub fn print_edge_change(verb: &str, change: &EdgeChange) {
    let edge = &change.edge;
    println!(
        "{} {} {} {} {} {}",
        verb.green().bold(),
        edge.id.bold(),
        edge.source,
        "→".dimmed(),
        edge.target,
        format!("[{}]", edge.kind).cyan()
    );
    if !change.outcome.touched.is_empty() {
        println!("    updated relations on {}", change.outcome.touched.join(", "));
    }
    print_dangling(&change.outcome.dangling);
    print_failures(&change.failures);
}

pub fn print_cascade(report: &CascadeReport) {
    println!("{} node {}", "Deleted".green().bold(), report.node_id.bold());
    if report.deleted_edges.is_empty() {
        println!("    {}", "no connected edges".dimmed());
    } else {
        println!(
            "    {} connected edge(s): {}",
            report.deleted_edges.len(),
            report.deleted_edges.join(", ")
        );
    }
    print_dangling(&report.dangling);
    print_failures(&report.failures);
}

pub fn print_import(report: &ImportReport) {
    println!(
        "{} {} nodes, {} edges",
        "Imported".green().bold(),
        report.nodes,
        report.edges
    );
    if report.defaulted > 0 {
        println!("    {} size value(s) defaulted", report.defaulted);
    }
    if !report.refreshed {
        println!("    {}", "server refresh failed, showing local copy".yellow());
    }
    print_dangling(&report.dangling);
}

pub fn print_failures(failures: &[RemoteFailure]) {
    for failure in failures {
        println!("    {} {}", "✗".red(), failure.to_string().red());
    }
}

/// Pad a plain string to a given visual width (right-padded).
fn pad_right(s: &str, width: usize) -> String {
    let visual = UnicodeWidthStr::width(s);
    if visual >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visual))
    }
}

/// Pad a coloured label by the width of its plain text.
fn pad_colored(label: ColoredString, width: usize) -> String {
    let visual = UnicodeWidthStr::width(&*label);
    let padding = width.saturating_sub(visual);
    format!("{}{}", label, " ".repeat(padding))
}

/// Truncate a string respecting visual width.
fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}
