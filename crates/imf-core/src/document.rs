//! Diagram documents on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{ImfError, ImfResult};
use crate::graph::Graph;

/// Extension required of imported diagram files.
pub const DOCUMENT_EXTENSION: &str = "imf";

/// Gate applied before a document reaches the validator: exactly one file,
/// with the `.imf` extension.
pub fn check_import_files<P: AsRef<Path>>(paths: &[P]) -> ImfResult<PathBuf> {
    let [path] = paths else {
        return Err(ImfError::import("Only one .imf file is allowed"));
    };
    let path = path.as_ref();

    let extension = path.extension().and_then(|e| e.to_str());
    if !extension.is_some_and(|e| e.eq_ignore_ascii_case(DOCUMENT_EXTENSION)) {
        return Err(ImfError::import("File must have a .imf extension"));
    }
    Ok(path.to_path_buf())
}

/// Parse a document as untrusted JSON, ready for validation.
pub fn read_document(path: &Path) -> ImfResult<Value> {
    let content = fs::read_to_string(path)?;
    let document = serde_json::from_str(&content)?;
    debug!(path = %path.display(), bytes = content.len(), "Document read");
    Ok(document)
}

/// Write a graph as pretty-printed JSON.
pub fn write_document(path: &Path, graph: &Graph) -> ImfResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(graph)?;
    fs::write(path, content)?;
    debug!(
        path = %path.display(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Document written"
    );
    Ok(())
}
