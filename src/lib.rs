//! # pdf-flatten
//!
//! Flatten PDF documents: every page becomes a single embedded image.
//!
//! ## Why this crate?
//!
//! Forms, annotations, hidden text layers and vector artwork all survive a
//! plain "save as". Flattening rasterises each page and rebuilds the document
//! from those bitmaps, so the result looks the same but carries no selectable
//! text and no editable objects. The original creation and modification dates
//! are preserved (or overridden) both in the document and on the file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Locate   find the platform PDFium library
//!  ├─ 2. Render   rasterise every page at the configured DPI
//!  ├─ 3. Assemble one JPEG image page per rendered page (lopdf)
//!  ├─ 4. Compress prune, renumber and deflate with a full rewrite
//!  ├─ 5. Dates    resolve creation/modification and write them incrementally
//!  ├─ 6. Stamp    file-system access/modification (and creation) time
//!  └─ 7. Move     atomic rename onto the output path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_flatten::{flatten, FlattenConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FlattenConfig::builder()
//!         .creation_date("2024-01-01")
//!         .build()?;
//!     let report = flatten("contract.pdf", "flat-contract.pdf", &config)?;
//!     eprintln!("{} pages, modified {}", report.page_count, report.timestamps.modification());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `flatten-pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-flatten = { version = "0.1", default-features = false }
//! ```
//!
//! ## Rendering engine
//!
//! PDFium is loaded at runtime. Set `PDFIUM_LIB_PATH` to point at a specific
//! library file; otherwise the platform's usual locations are searched (see
//! [`pdfium_locate`]).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod flatten;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FlattenConfig, FlattenConfigBuilder, DEFAULT_DPI, DEFAULT_JPEG_QUALITY};
pub use error::{FlattenError, FsTimeError};
pub use flatten::{default_output_path, flatten, flatten_with, inspect};
pub use output::{FlattenReport, SourceMetadata, StageTimings};
pub use pdfium_locate::{LocateError, Platform};
pub use pipeline::metadata::{OriginalTimes, TimeSource, TimestampPair};
pub use pipeline::Stage;
pub use progress::{FlattenProgressCallback, NoopProgressCallback, ProgressCallback};
