//! Error types for the pdf-flatten library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FlattenError`] — **Fatal**: the run cannot produce an output file
//!   (renderer missing, input missing or corrupt, bad override date).
//!   Returned as `Err(FlattenError)` from the top-level `flatten*` functions.
//!   Nothing is ever written to the requested output path when one of these
//!   is returned.
//!
//! * [`FsTimeError`] — **Non-fatal**: the best-effort creation-time step
//!   failed. The flattened file is complete and in place; the error is logged
//!   and reported in [`crate::output::FlattenReport::warnings`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-flatten library.
#[derive(Debug, Error)]
pub enum FlattenError {
    // ── Renderer ──────────────────────────────────────────────────────────
    /// The PDFium library could not be located or bound.
    #[error("Rendering engine unavailable: {0}")]
    RendererNotFound(#[from] pdfium_locate::LocateError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input exists but is not a parseable PDF.
    #[error("PDF '{path}' is corrupt or not a PDF: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered page could not be JPEG-encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncodingFailed { page: usize, detail: String },

    /// The source document produced no pages to assemble.
    #[error("PDF '{path}' has no pages to flatten")]
    EmptyDocument { path: PathBuf },

    /// lopdf failed to load, rewrite or save an intermediate document.
    #[error("Failed to write PDF '{path}': {detail}")]
    PdfWriteFailed { path: PathBuf, detail: String },

    // ── Metadata errors ───────────────────────────────────────────────────
    /// An override date is not `YYYY-MM-DD`.
    #[error("Invalid {field} date '{value}'. Use YYYY-MM-DD.")]
    InvalidDateFormat { field: &'static str, value: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, stamp or move the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlattenError {
    /// Process exit code the CLI uses for this error.
    ///
    /// Usage errors map to 2, missing or unreadable input to 3, bad documents
    /// to 4, a missing renderer to 5 and everything else to 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            FlattenError::InvalidDateFormat { .. } | FlattenError::InvalidConfig(_) => 2,
            FlattenError::InputNotFound { .. } | FlattenError::PermissionDenied { .. } => 3,
            FlattenError::CorruptDocument { .. }
            | FlattenError::PasswordRequired { .. }
            | FlattenError::WrongPassword { .. }
            | FlattenError::EmptyDocument { .. } => 4,
            FlattenError::RendererNotFound(_) => 5,
            FlattenError::RasterisationFailed { .. }
            | FlattenError::ImageEncodingFailed { .. }
            | FlattenError::PdfWriteFailed { .. }
            | FlattenError::OutputWriteFailed { .. }
            | FlattenError::Internal(_) => 1,
        }
    }
}

/// A non-fatal failure of the file-system creation-time step.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FsTimeError {
    /// The platform utility ran but reported failure.
    #[error("Setting creation time on '{path}' failed: {detail}")]
    CommandFailed { path: PathBuf, detail: String },

    /// The platform has no settable creation time.
    #[error("Creation time cannot be set on {platform}")]
    Unsupported { platform: String },
}
