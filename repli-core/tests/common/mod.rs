#![allow(dead_code)]

use repli_core::error::StoreError;
use repli_core::store::{DirectoryEntry, EntryKind, FileContent, RemoteStore};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    List(String),
    Get(String),
    Create { path: String, content: String, message: String },
}

/// In-memory store: directories are implied by file paths, plus any
/// explicitly added empty ones.
#[derive(Default)]
pub struct MemoryStore {
    files: RefCell<BTreeMap<String, String>>,
    dirs: BTreeSet<String>,
    fail_list: HashMap<String, u16>,
    fail_get: HashMap<String, u16>,
    fail_create: HashMap<String, u16>,
    listings: HashMap<String, Vec<DirectoryEntry>>,
    pub calls: RefCell<Vec<Call>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.files.borrow_mut().insert(path.to_string(), text.to_string());
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.insert(path.to_string());
        self
    }

    pub fn failing_list(mut self, path: &str, status: u16) -> Self {
        self.fail_list.insert(path.to_string(), status);
        self
    }

    pub fn failing_get(mut self, path: &str, status: u16) -> Self {
        self.fail_get.insert(path.to_string(), status);
        self
    }

    pub fn failing_create(mut self, path: &str, status: u16) -> Self {
        self.fail_create.insert(path.to_string(), status);
        self
    }

    /// Answer listings of `path` with `entries` verbatim.
    pub fn with_listing(mut self, path: &str, entries: Vec<DirectoryEntry>) -> Self {
        self.listings.insert(path.to_string(), entries);
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn creates(&self) -> Vec<(String, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Create { path, message, .. } => Some((path.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl RemoteStore for MemoryStore {
    fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        self.calls.borrow_mut().push(Call::List(path.to_string()));
        if let Some(&s) = self.fail_list.get(path) {
            return Err(StoreError::from_status(s, path));
        }
        if let Some(entries) = self.listings.get(path) {
            return Ok(entries.clone());
        }
        if self.files.borrow().contains_key(path) {
            return Err(StoreError::NotADirectory(path.to_string()));
        }
        let files = self.files.borrow();
        let keys = files.keys().map(|k| (k, false)).chain(self.dirs.iter().map(|d| (d, true)));
        let mut out: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        let mut found = path.is_empty() || self.dirs.contains(path);
        for (key, is_dir) in keys {
            let rel = if path.is_empty() {
                key.as_str()
            } else {
                match key.strip_prefix(path).and_then(|r| r.strip_prefix('/')) {
                    Some(r) => r,
                    None => continue,
                }
            };
            found = true;
            let (name, nested) = match rel.split_once('/') {
                Some((first, _)) => (first, true),
                None => (rel, is_dir),
            };
            let full = if path.is_empty() { name.to_string() } else { format!("{path}/{name}") };
            let kind = if nested { EntryKind::Directory } else { EntryKind::File };
            out.insert(name.to_string(), DirectoryEntry { name: name.to_string(), path: full, kind });
        }
        if !found {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(out.into_values().collect())
    }

    fn get_file(&self, path: &str) -> Result<FileContent, StoreError> {
        self.calls.borrow_mut().push(Call::Get(path.to_string()));
        if let Some(&s) = self.fail_get.get(path) {
            return Err(StoreError::from_status(s, path));
        }
        match self.files.borrow().get(path) {
            Some(text) => Ok(FileContent { text: text.clone(), sha: format!("sha-{path}") }),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn create_file(&self, path: &str, content: &str, message: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(Call::Create {
            path: path.to_string(),
            content: content.to_string(),
            message: message.to_string(),
        });
        if let Some(&s) = self.fail_create.get(path) {
            return Err(StoreError::from_status(s, path));
        }
        let mut files = self.files.borrow_mut();
        if files.contains_key(path) {
            return Err(StoreError::from_status(422, path));
        }
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }
}
