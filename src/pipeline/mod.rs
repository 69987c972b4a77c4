//! Pipeline stages for PDF flattening.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode+assemble ──▶ compress ──▶ metadata ──▶ fs_times
//! (path)    (pdfium)   (JPEG → lopdf)      (lopdf)      (Info dict)  (mtime/birth)
//! ```
//!
//! 1. [`input`]    — validate the user-supplied path points at a readable PDF
//! 2. [`render`]   — rasterise every page at the configured DPI via pdfium
//! 3. [`encode`]   — JPEG-encode each `DynamicImage` at the configured quality
//! 4. [`assemble`] — one full-bleed image page per rendered page
//! 5. [`compress`] — prune dead objects, deflate streams, full rewrite
//! 6. [`metadata`] — resolve creation/modification instants and write them
//!    into the Info dictionary with an incremental update
//! 7. [`fs_times`] — stamp access/modification and (best-effort) creation time
//!
//! [`scratch`] owns the intermediate files and deletes them on every path.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod assemble;
pub mod compress;
pub mod encode;
pub mod fs_times;
pub mod input;
pub mod metadata;
pub mod render;
pub mod scratch;

/// The orchestrator's states, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    LocateRenderer,
    Rasterize,
    Assemble,
    Compress,
    ResolveMetadata,
    WriteMetadata,
    SetFsTimes,
    Move,
    Cleanup,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 9] = [
        Stage::LocateRenderer,
        Stage::Rasterize,
        Stage::Assemble,
        Stage::Compress,
        Stage::ResolveMetadata,
        Stage::WriteMetadata,
        Stage::SetFsTimes,
        Stage::Move,
        Stage::Cleanup,
    ];

    /// Short human label used in logs and the CLI progress bar.
    pub fn label(self) -> &'static str {
        match self {
            Stage::LocateRenderer => "Locating renderer",
            Stage::Rasterize => "Rasterising",
            Stage::Assemble => "Assembling",
            Stage::Compress => "Compressing",
            Stage::ResolveMetadata => "Resolving dates",
            Stage::WriteMetadata => "Writing metadata",
            Stage::SetFsTimes => "Setting file times",
            Stage::Move => "Moving into place",
            Stage::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
