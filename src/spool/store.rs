use super::batch_id::BatchId;
use super::error::{Result, SpoolError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

const DELETE_ATTEMPTS: usize = 3;
const DELETE_RETRY_PAUSE: Duration = Duration::from_millis(50);

/// One file found by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub id: BatchId,
    pub durable: bool,
    pub path: PathBuf,
}

/// Filesystem-backed batch storage.
///
/// Every batch is one file in the spool root:
///
/// ```text
/// <millis>-<uuid>.tmp   - being written, invisible to readers
/// <millis>-<uuid>.trn   - durable, eligible for load/retry/expiry
/// ```
///
/// Payloads are written to the `.tmp` name, fsynced, then renamed to `.trn`
/// and the directory is fsynced, so a crash can never expose a half-written
/// batch as durable.
#[derive(Debug)]
pub struct BatchStore {
    root: PathBuf,
}

impl BatchStore {
    /// Open (creating if needed) the spool directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| SpoolError::io(&root, e))?;
        if !root.is_dir() {
            return Err(SpoolError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    /// Open an existing spool directory without creating anything.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => Ok(Self { root }),
            Ok(_) => Err(SpoolError::NotADirectory(root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SpoolError::Missing(root)),
            Err(e) => Err(SpoolError::io(root, e)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn durable_path(&self, id: &BatchId) -> PathBuf {
        self.root.join(id.durable_file_name())
    }

    fn temporary_path(&self, id: &BatchId) -> PathBuf {
        self.root.join(id.temporary_file_name())
    }

    /// Persist `payload` and return the id of the new durable batch.
    ///
    /// On `Err` no durable file is left behind: if syncing the directory
    /// fails after the rename, the renamed file is removed again.
    pub fn create(&self, payload: &[u8]) -> Result<BatchId> {
        self.create_with(payload, fsync_dir)
    }

    fn create_with(
        &self,
        payload: &[u8],
        sync_dir: impl FnOnce(&Path) -> io::Result<()>,
    ) -> Result<BatchId> {
        let id = BatchId::generate();
        let temp_path = self.temporary_path(&id);
        let durable_path = self.durable_path(&id);

        if let Err(e) = write_synced(&temp_path, payload) {
            let _ = fs::remove_file(&temp_path);
            return Err(SpoolError::io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &durable_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(SpoolError::io(&durable_path, e));
        }

        if let Err(e) = sync_dir(&self.root) {
            if let Err(cleanup) = remove_with_retries(&durable_path) {
                error!(
                    batch_id = %id,
                    error = %cleanup,
                    "Failed to remove batch after directory sync failure"
                );
            }
            return Err(SpoolError::io(&self.root, e));
        }

        debug!(batch_id = %id, bytes = payload.len(), "Batch persisted");
        Ok(id)
    }

    /// Read a durable batch. `Ok(None)` means the file is already gone.
    pub fn read(&self, id: &BatchId) -> Result<Option<Vec<u8>>> {
        let path = self.durable_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SpoolError::io(path, e)),
        }
    }

    /// Remove a durable batch. Returns `false` if it was already missing.
    pub fn delete(&self, id: &BatchId) -> Result<bool> {
        remove_with_retries(&self.durable_path(id))
    }

    /// Durable batch ids, oldest first.
    pub fn list_durable(&self) -> Result<Vec<BatchId>> {
        let mut ids: Vec<BatchId> = self
            .scan_entries()?
            .into_iter()
            .filter(|entry| entry.durable)
            .map(|entry| entry.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Every spool file in the root, durable or not. Unrelated files are skipped.
    pub fn scan_entries(&self) -> Result<Vec<StoreEntry>> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| SpoolError::io(&self.root, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| SpoolError::io(&self.root, e))?;
            let path = entry.path();
            if let Some((id, durable)) = BatchId::from_path(&path) {
                entries.push(StoreEntry { id, durable, path });
            }
        }
        Ok(entries)
    }
}

/// Remove `path`, retrying transient failures. Missing files are not an error.
pub(crate) fn remove_with_retries(path: &Path) -> Result<bool> {
    let mut attempt = 1;
    loop {
        match fs::remove_file(path) {
            Ok(()) => return Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) if attempt >= DELETE_ATTEMPTS => return Err(SpoolError::io(path, e)),
            Err(e) => {
                debug!(path = %path.display(), attempt, error = %e, "Delete failed, retrying");
                attempt += 1;
                thread::sleep(DELETE_RETRY_PAUSE);
            }
        }
    }
}

fn write_synced(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(payload)?;
    file.sync_all()
}

/// Sync directory entries so a create/rename survives power loss.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
