use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, submodules and anything else the store reports.
    Other(String),
}

impl EntryKind {
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            other => EntryKind::Other(other.to_string()),
        }
    }
}

/// One item of a directory listing. `path` is relative to the repository root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileContent {
    pub text: String,
    /// Version marker; needed for updates, unused for creation.
    pub sha: String,
}

/// Path-addressed remote file store. Implementations block until the remote
/// call completes.
pub trait RemoteStore {
    /// List a directory; `""` is the repository root.
    fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError>;

    /// Fetch a file and decode it as UTF-8 text.
    fn get_file(&self, path: &str) -> Result<FileContent, StoreError>;

    /// Create a new file. Never updates: an existing path is an error.
    fn create_file(&self, path: &str, content: &str, message: &str) -> Result<(), StoreError>;
}
