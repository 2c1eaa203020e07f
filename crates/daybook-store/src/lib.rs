//! File-backed persistence for daybook workspaces.
//!
//! Each workspace lives in one JSON file named `<name>.json` under a root
//! directory the caller supplies; no environment lookups happen here. A
//! read loads the whole file and a write overwrites it wholesale, so
//! concurrent invocations against the same workspace race with
//! last-writer-wins semantics. That is an accepted limitation of the
//! short-lived-process model, not a guarantee.

mod error;

pub use error::StoreError;

use daybook_core::Workspace;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistence collaborator: reads and writes whole workspace files under
/// a fixed root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory this store reads and writes under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing the named workspace.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Read the named workspace. When the file is missing and
    /// `create_if_missing` is set, a fresh in-memory workspace is returned
    /// instead; it is not persisted until the first write.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for a missing file without
    /// `create_if_missing`, and I/O or codec errors unchanged otherwise.
    pub fn read(&self, name: &str, create_if_missing: bool) -> Result<Workspace, StoreError> {
        let path = self.path_for(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if create_if_missing {
                    debug!(name, "workspace file missing, starting fresh");
                    return Ok(Workspace::new(name));
                }
                return Err(StoreError::NotFound(name.to_owned()));
            }
            Err(err) => return Err(err.into()),
        };

        let ws = unmarshal(&bytes)?;
        debug!(name, tasks = ws.tasks.len(), "read workspace");
        Ok(ws)
    }

    /// Overwrite the workspace file, creating the root directory first if
    /// needed.
    ///
    /// # Errors
    /// Returns I/O or codec errors unchanged.
    pub fn write(&self, ws: &Workspace) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(&ws.name);
        fs::write(&path, marshal(ws)?)?;
        info!(name = %ws.name, path = %path.display(), "wrote workspace");
        Ok(())
    }
}

/// Serialise a workspace to pretty-printed JSON.
///
/// # Errors
/// Returns a codec error when encoding fails.
pub fn marshal(ws: &Workspace) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(ws)?)
}

/// Parse a workspace from JSON bytes.
///
/// # Errors
/// Returns a codec error when the bytes are not a valid workspace.
pub fn unmarshal(bytes: &[u8]) -> Result<Workspace, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}
