use crate::path_map::{join, PathMapping};
use crate::rewrite::RewriteTable;
use crate::store::{EntryKind, RemoteStore};
use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt;
use tracing::{debug, info, warn};

pub const DEFAULT_MESSAGE: &str = "chore: replicate {source} structure for {target}";
pub const DEFAULT_EXCLUDES: &[&str] = &[".gitignore", "README.md"];

/// Successes and entries seen at one directory level. Nested levels keep
/// their own tally; it is not added to the parent's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelTally {
    pub successes: usize,
    pub total: usize,
}

impl fmt::Display for LevelTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.successes, self.total)
    }
}

/// Whole-run counters, threaded through every level of the walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    /// Create calls rejected by the store, or paths that could not be mapped.
    pub failed: usize,
    pub fetch_failed: usize,
    /// Files whose content came back empty.
    pub empty: usize,
    pub directories: usize,
    pub listing_failed: usize,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.fetch_failed == 0 && self.listing_failed == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Tally of the entry level only.
    pub root: LevelTally,
    pub summary: RunSummary,
}

/// Compile exclusion globs matched against root-level entry names.
pub fn build_excludes<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(Glob::new(p.as_ref())?);
    }
    Ok(b.build()?)
}

/// Mirrors a source subtree into a destination subtree, rewriting file
/// text on the way. Walks depth-first and sequentially.
pub struct Replicator<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    rules: &'a RewriteTable,
    message: String,
}

impl<'a, S: RemoteStore + ?Sized> Replicator<'a, S> {
    pub fn new(store: &'a S, rules: &'a RewriteTable) -> Self {
        Self { store, rules, message: DEFAULT_MESSAGE.to_string() }
    }

    /// Commit message template; `{source}` and `{target}` are substituted.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    pub fn commit_message(&self, source: &str, target: &str) -> String {
        let source = if source.is_empty() { "/" } else { source };
        self.message.replace("{source}", source).replace("{target}", target)
    }

    /// Replicate `source` into `dest`.
    pub fn replicate_tree(&self, source: &str, dest: &str) -> Report {
        let dest = dest.trim_matches('/');
        let mut summary = RunSummary::default();
        let root = self.walk(source.trim_matches('/'), dest, dest, &mut summary);
        Report { root, summary }
    }

    /// Replicate the repository root: root files land directly in `dest`,
    /// root directories are walked as `<name> -> dest/<name>`. Entries whose
    /// name matches `excludes` are left alone.
    pub fn replicate_root(&self, dest: &str, excludes: &GlobSet) -> Report {
        let dest = dest.trim_matches('/');
        let mut summary = RunSummary::default();
        let mut tally = LevelTally::default();
        info!("Starting replication of repository root to {dest}/");

        let entries = match self.store.list_directory("") {
            Ok(v) => v,
            Err(e) => {
                warn!("Error fetching repository root: {e}");
                if let Some(h) = e.hint() {
                    warn!("  {h}");
                }
                summary.listing_failed += 1;
                Vec::new()
            }
        };
        if entries.is_empty() {
            info!("No contents found in repository root");
            return Report { root: tally, summary };
        }
        summary.directories += 1;
        tally.total = entries.len();
        let message = self.commit_message("", dest);

        for entry in &entries {
            if excludes.is_match(&entry.name) {
                debug!("Excluded: {}", entry.path);
                continue;
            }
            match &entry.kind {
                EntryKind::File => {
                    let target = join(dest, &entry.name);
                    info!("Replicating: {} → {}", entry.path, target);
                    if self.copy_file(&entry.path, &target, &message, &mut summary) {
                        tally.successes += 1;
                    }
                }
                EntryKind::Directory => {
                    if entry.path.trim_matches('/') == dest {
                        info!("Skipping destination directory {}", entry.path);
                        continue;
                    }
                    let target = join(dest, &entry.name);
                    info!("Replicating folder: {} → {}", entry.path, target);
                    self.walk(&entry.path, &target, dest, &mut summary);
                }
                EntryKind::Other(kind) => debug!("Skipping {kind} entry {}", entry.path),
            }
        }

        info!("Completed: replicated repository structure to {dest}/");
        Report { root: tally, summary }
    }

    /// One level of the depth-first walk. `guard` is the run's destination
    /// root, which is never descended into.
    fn walk(&self, source: &str, dest: &str, guard: &str, summary: &mut RunSummary) -> LevelTally {
        info!("Starting replication: {source} → {dest}");
        let mut tally = LevelTally::default();

        let entries = match self.store.list_directory(source) {
            Ok(v) => v,
            Err(e) => {
                warn!("Error fetching {source}: {e}");
                if let Some(h) = e.hint() {
                    warn!("  {h}");
                }
                summary.listing_failed += 1;
                Vec::new()
            }
        };
        if entries.is_empty() {
            info!("No contents found in {source}");
            return tally;
        }
        summary.directories += 1;

        let mapping = PathMapping::new(source, dest);
        let message = self.commit_message(source, dest);
        for entry in &entries {
            tally.total += 1;
            match &entry.kind {
                EntryKind::File => {
                    info!("Processing: {}", entry.path);
                    let target = match mapping.map(&entry.path) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("{e}");
                            summary.failed += 1;
                            continue;
                        }
                    };
                    if self.copy_file(&entry.path, &target, &message, summary) {
                        tally.successes += 1;
                    }
                }
                EntryKind::Directory => {
                    if entry.path.trim_matches('/') == guard {
                        info!("Skipping destination directory {}", entry.path);
                        continue;
                    }
                    info!("Processing directory: {}", entry.path);
                    match mapping.map(&entry.path) {
                        Ok(target) => {
                            self.walk(&entry.path, &target, guard, summary);
                        }
                        Err(e) => {
                            warn!("{e}");
                            summary.failed += 1;
                        }
                    }
                }
                EntryKind::Other(kind) => debug!("Skipping {kind} entry {}", entry.path),
            }
        }

        info!("Completed: {tally} files processed successfully");
        tally
    }

    /// Fetch, rewrite and create one file. Returns true when the create
    /// call succeeded.
    fn copy_file(&self, source: &str, target: &str, message: &str, summary: &mut RunSummary) -> bool {
        let content = match self.store.get_file(source) {
            Ok(c) => c,
            Err(e) => {
                warn!("Error fetching file {source}: {e}");
                summary.fetch_failed += 1;
                return false;
            }
        };
        if content.text.is_empty() {
            info!("Empty: {source}; nothing to write");
            summary.empty += 1;
            return false;
        }
        let updated = self.rules.apply(&content.text);
        match self.store.create_file(target, &updated, message) {
            Ok(()) => {
                info!("Created: {target}");
                summary.created += 1;
                true
            }
            Err(e) => {
                warn!("Error creating {target}: {e}");
                summary.failed += 1;
                false
            }
        }
    }
}
