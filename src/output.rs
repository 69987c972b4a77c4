//! Output types returned by the flattening entry points.

use crate::error::FsTimeError;
use crate::pipeline::assemble::PageSize;
use crate::pipeline::compress::CompressStats;
use crate::pipeline::metadata::{OriginalTimes, TimestampPair};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document-level metadata of the source PDF, as pdfium reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    /// Raw Info `CreationDate` string, e.g. `D:20230515103000+02'00'`.
    pub creation_date: Option<String>,
    /// Raw Info `ModDate` string.
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub render_ms: u64,
    pub assemble_ms: u64,
    pub compress_ms: u64,
    pub metadata_ms: u64,
    pub total_ms: u64,
}

/// Result of a successful flattening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub page_count: usize,
    /// Page sizes in points, one per output page.
    pub pages: Vec<PageSize>,
    pub dpi: u32,
    pub jpeg_quality: u8,
    /// Instants before overrides, with where each came from.
    pub original: OriginalTimes,
    /// Instants written into the document and onto the file.
    pub timestamps: TimestampPair,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// What the compression pass removed and saved.
    pub compression: CompressStats,
    pub timings: StageTimings,
    /// Best-effort steps that did not succeed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FsTimeError>,
}

impl FlattenReport {
    /// Output size as a fraction of input size.
    pub fn size_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        self.output_bytes as f64 / self.input_bytes as f64
    }
}
