use crate::error::StoreError;
use crate::store::{DirectoryEntry, EntryKind, RemoteStore};

pub const DEFAULT_CANDIDATES: &[&str] = &["October_2025", "Nav_Oct_2025", "Dashboard", "reports", "2025"];
/// Root entries shown before the listing is abbreviated.
pub const ROOT_PREVIEW: usize = 10;

#[derive(Debug)]
pub struct InspectReport {
    pub root: Result<Vec<DirectoryEntry>, StoreError>,
    /// Candidate path and whether it exists. Empty when the root listing failed.
    pub candidates: Vec<(String, bool)>,
}

impl InspectReport {
    /// Human-readable report lines.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        match &self.root {
            Ok(entries) => {
                out.push("Repository root contains:".to_string());
                for e in entries.iter().take(ROOT_PREVIEW) {
                    let icon = if e.kind == EntryKind::Directory { "📁" } else { "📄" };
                    out.push(format!("  {icon} {}", e.name));
                }
                if entries.len() > ROOT_PREVIEW {
                    out.push(format!("  ... and {} more items", entries.len() - ROOT_PREVIEW));
                }
            }
            Err(e) => {
                out.push(format!("Error accessing repository: {e}"));
                if let Some(h) = e.hint() {
                    out.push(format!("  {h}"));
                }
                return out;
            }
        }
        if !self.candidates.is_empty() {
            out.push("Checking for potential source folders:".to_string());
            for (path, exists) in &self.candidates {
                let status = if *exists { "✓ EXISTS" } else { "✗ NOT FOUND" };
                out.push(format!("  {status}: {path}"));
            }
        }
        out
    }
}

/// Inspect the repository root and check which `candidates` exist.
/// Stops after the root listing if that fails.
pub fn inspect<S: RemoteStore + ?Sized>(store: &S, candidates: &[String]) -> InspectReport {
    let root = store.list_directory("");
    if root.is_err() {
        return InspectReport { root, candidates: Vec::new() };
    }
    let candidates = candidates
        .iter()
        .map(|p| {
            let exists = match store.list_directory(p) {
                Ok(_) | Err(StoreError::NotADirectory(_)) => true,
                Err(e) => {
                    tracing::debug!("check {p}: {e}");
                    false
                }
            };
            (p.clone(), exists)
        })
        .collect();
    InspectReport { root, candidates }
}
