use super::{KvStore, StoreKey};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File-backed store: one JSON file per key under the data directory.
///
/// Writes go through a temp file in the same directory followed by an atomic
/// rename, so a crash mid-write never leaves a half-written snapshot behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the default store. Honors the `QUADRO_DIR` environment variable,
    /// then falls back to `<data dir>/quadro`.
    pub fn open_default() -> Result<Self> {
        let dir = match std::env::var_os("QUADRO_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .context("could not determine data directory")?
                .join("quadro"),
        };
        Self::open(dir)
    }

    /// Open a store rooted at `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.name()))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read file: {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &StoreKey, value: &str) -> Result<()> {
        atomic_write(&self.path_for(key), value)
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove file: {}", path.display()))?;
        }
        Ok(())
    }
}

/// Atomically write content to a file using temp file + rename
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().context("file path has no parent directory")?;

    let mut temp_file =
        NamedTempFile::new_in(dir).context("failed to create temporary file")?;

    temp_file
        .write_all(content.as_bytes())
        .context("failed to write to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("failed to sync temporary file")?;

    temp_file
        .persist(path)
        .with_context(|| format!("failed to persist file: {}", path.display()))?;

    Ok(())
}
