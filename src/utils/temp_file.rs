use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

/// A uniquely named file that is deleted when the guard is dropped.
///
/// Deletion failures are logged as warnings and never propagated, so a guard
/// can be dropped on any exit path of a request without affecting its outcome.
#[derive(Debug)]
pub struct ScopedTempFile {
    path: PathBuf,
    guard: Option<TempPath>,
}

impl ScopedTempFile {
    /// Allocate an empty placeholder file.
    pub fn empty(dir: Option<&Path>, prefix: &str, suffix: &str) -> io::Result<Self> {
        let named = builder(prefix, suffix, dir)?;
        Ok(Self::from_temp_path(named.into_temp_path()))
    }

    /// Allocate a file and hand back an async handle for writing into it.
    pub fn create(
        dir: Option<&Path>,
        prefix: &str,
        suffix: &str,
    ) -> io::Result<(Self, tokio::fs::File)> {
        let named = builder(prefix, suffix, dir)?;
        let (file, temp_path) = named.into_parts();
        Ok((
            Self::from_temp_path(temp_path),
            tokio::fs::File::from_std(file),
        ))
    }

    fn from_temp_path(temp_path: TempPath) -> Self {
        Self {
            path: temp_path.to_path_buf(),
            guard: Some(temp_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file on disk, `None` if it no longer exists.
    pub async fn size_on_disk(&self) -> Option<u64> {
        tokio::fs::metadata(&self.path).await.ok().map(|m| m.len())
    }

    /// Release the file now instead of at end of scope.
    pub fn remove(mut self) {
        if let Some(guard) = self.guard.take() {
            release(guard);
        }
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            release(guard);
        }
    }
}

fn builder(prefix: &str, suffix: &str, dir: Option<&Path>) -> io::Result<tempfile::NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(prefix).suffix(suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

fn release(guard: TempPath) {
    let path = guard.to_path_buf();
    match guard.close() {
        Ok(()) => debug!("🧹 Removed temp file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
