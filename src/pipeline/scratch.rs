//! Scratch files for intermediate PDFs.
//!
//! Scratch files live next to the final output so the closing rename never
//! crosses a file system: it stays atomic and keeps the timestamps set on the
//! scratch file. Every scratch file is removed when dropped unless it has been
//! persisted.

use crate::error::FlattenError;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// A uniquely named intermediate file, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    inner: Option<TempPath>,
    label: &'static str,
}

impl ScratchFile {
    /// Create an empty scratch file inside `dir`.
    ///
    /// `label` names the stage that owns the file in logs and file names.
    pub fn create_in(dir: &Path, label: &'static str) -> Result<Self, FlattenError> {
        let path = tempfile::Builder::new()
            .prefix(&format!(".flatten-{label}-"))
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(|source| FlattenError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source,
            })?
            .into_temp_path();

        debug!("Created {} scratch file {}", label, path.display());
        Ok(Self {
            inner: Some(path),
            label,
        })
    }

    pub fn path(&self) -> &Path {
        self.inner.as_deref().unwrap_or(Path::new(""))
    }

    /// Atomically move the file to `dest`, replacing anything there.
    ///
    /// On failure the scratch file is still owned and removed on drop.
    pub fn persist(mut self, dest: &Path) -> Result<PathBuf, FlattenError> {
        let Some(temp) = self.inner.take() else {
            return Err(FlattenError::Internal(format!(
                "{} scratch file already persisted",
                self.label
            )));
        };

        match temp.persist(dest) {
            Ok(()) => {
                debug!("Moved {} scratch file to {}", self.label, dest.display());
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                self.inner = Some(e.path);
                Err(FlattenError::OutputWriteFailed {
                    path: dest.to_path_buf(),
                    source: e.error,
                })
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(temp) = self.inner.take() {
            let shown = temp.display().to_string();
            match temp.close() {
                Ok(()) => debug!("Removed {} scratch file {}", self.label, shown),
                Err(e) => warn!("Could not remove scratch file {}: {}", shown, e),
            }
        }
    }
}
