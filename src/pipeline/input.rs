//! Input resolution: check a user-supplied path is a readable PDF.
//!
//! pdfium reports a missing file and a garbled file with the same opaque
//! load error. Checking existence, permissions and the `%PDF` magic up
//! front turns those into [`FlattenError::InputNotFound`],
//! [`FlattenError::PermissionDenied`] and [`FlattenError::CorruptDocument`].

use crate::error::FlattenError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_local(path: &Path) -> Result<PathBuf, FlattenError> {
    if !path.exists() {
        return Err(FlattenError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    if path.is_dir() {
        return Err(FlattenError::CorruptDocument {
            path: path.to_path_buf(),
            detail: "path is a directory".into(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => {
                    return Err(FlattenError::CorruptDocument {
                        path: path.to_path_buf(),
                        detail: format!("first bytes are {magic:?}, expected %PDF"),
                    });
                }
                Err(_) => {
                    return Err(FlattenError::CorruptDocument {
                        path: path.to_path_buf(),
                        detail: "file is shorter than a PDF header".into(),
                    });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FlattenError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(FlattenError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}
