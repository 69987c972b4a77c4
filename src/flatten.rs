//! Flattening entry points.
//!
//! The pipeline runs strictly in order:
//!
//! ```text
//! LocateRenderer → Rasterize → Assemble (scratch A) → Compress (A → scratch B)
//!   → ResolveMetadata → WriteMetadata (B) → SetFsTimes (B) → Move (B → output)
//!   → Cleanup
//! ```
//!
//! Any failure aborts the rest. Both scratch files sit in the output's
//! directory and are deleted when they go out of scope, so the requested
//! output path either keeps its previous state or holds the finished file.

use crate::config::FlattenConfig;
use crate::error::FlattenError;
use crate::output::{FlattenReport, SourceMetadata, StageTimings};
use crate::pipeline::scratch::ScratchFile;
use crate::pipeline::{assemble, compress, fs_times, input, metadata, render, Stage};
use pdfium_locate::Platform;
use pdfium_render::prelude::Pdfium;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Flatten `input` into `output`.
///
/// Binds the platform PDFium library, then runs [`flatten_with`].
///
/// # Errors
/// Every [`FlattenError`] is fatal. On error nothing is written to `output`.
///
/// # Example
/// ```rust,no_run
/// use pdf_flatten::{flatten, FlattenConfig};
///
/// let config = FlattenConfig::builder().dpi(150).build()?;
/// let report = flatten("scan.pdf", "flat-scan.pdf", &config)?;
/// println!("{} pages → {} bytes", report.page_count, report.output_bytes);
/// # Ok::<(), pdf_flatten::FlattenError>(())
/// ```
pub fn flatten(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FlattenConfig,
) -> Result<FlattenReport, FlattenError> {
    enter(config, Stage::LocateRenderer);
    let pdfium = pdfium_locate::bind_pdfium()?;
    flatten_with(&pdfium, input, output, config)
}

/// Flatten with a PDFium instance the caller already bound.
pub fn flatten_with(
    pdfium: &Pdfium,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FlattenConfig,
) -> Result<FlattenReport, FlattenError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();
    info!("Flattening {} → {}", input.display(), output.display());
    debug!("{:?}", config);

    input::resolve_local(input)?;
    let input_bytes = file_len(input)?;
    let work_dir = prepare_output_dir(output)?;
    let mut timings = StageTimings::default();

    // ── Rasterise ────────────────────────────────────────────────────────
    enter(config, Stage::Rasterize);
    let start = Instant::now();
    let pages = render::render_pages(
        pdfium,
        input,
        config.dpi,
        config.password.as_deref(),
        config.progress_callback.as_ref(),
    )?;
    if pages.is_empty() {
        return Err(FlattenError::EmptyDocument {
            path: input.to_path_buf(),
        });
    }
    let page_count = pages.len();
    timings.render_ms = start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", page_count, timings.render_ms);

    // ── Assemble ─────────────────────────────────────────────────────────
    enter(config, Stage::Assemble);
    let start = Instant::now();
    let assembled = ScratchFile::create_in(&work_dir, "assemble")?;
    let sizes = assemble::assemble(pages, config.jpeg_quality, assembled.path())?;
    timings.assemble_ms = start.elapsed().as_millis() as u64;

    // ── Compress ─────────────────────────────────────────────────────────
    enter(config, Stage::Compress);
    let start = Instant::now();
    let compressed = ScratchFile::create_in(&work_dir, "compress")?;
    let compression = compress::compress(assembled.path(), compressed.path())?;
    drop(assembled);
    timings.compress_ms = start.elapsed().as_millis() as u64;
    debug!(
        "Compression removed {} objects ({} → {} bytes)",
        compression.objects_removed, compression.bytes_in, compression.bytes_out
    );

    // ── Resolve metadata ─────────────────────────────────────────────────
    enter(config, Stage::ResolveMetadata);
    let start = Instant::now();
    let source = render::extract_metadata(pdfium, input, config.password.as_deref())?;
    let fs = metadata::fs_times_of(input)?;
    let original = metadata::original_times(
        source.creation_date.as_deref(),
        source.modification_date.as_deref(),
        &fs,
    );
    let timestamps = metadata::resolve(&original, config.creation_date, config.modification_date);
    info!(
        "Dates: creation {} ({:?}), modification {} ({:?})",
        timestamps.creation(),
        original.creation_source,
        timestamps.modification(),
        original.modification_source
    );

    // ── Write metadata ───────────────────────────────────────────────────
    enter(config, Stage::WriteMetadata);
    metadata::write_document_dates(compressed.path(), &timestamps)?;
    timings.metadata_ms = start.elapsed().as_millis() as u64;

    // ── File-system times ────────────────────────────────────────────────
    enter(config, Stage::SetFsTimes);
    let warnings: Vec<_> = fs_times::apply_times(
        compressed.path(),
        &timestamps,
        Platform::current().ok(),
        config.set_creation_time,
    )?
    .into_iter()
    .collect();

    // ── Move into place ──────────────────────────────────────────────────
    enter(config, Stage::Move);
    let output_bytes = file_len(compressed.path())?;
    let output_path = compressed.persist(output)?;

    enter(config, Stage::Cleanup);
    timings.total_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Flattened {} pages into {} ({} → {} bytes) in {}ms",
        page_count,
        output_path.display(),
        input_bytes,
        output_bytes,
        timings.total_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_flatten_complete(page_count);
    }

    Ok(FlattenReport {
        input_path: input.to_path_buf(),
        output_path,
        page_count,
        pages: sizes,
        dpi: config.dpi,
        jpeg_quality: config.jpeg_quality,
        original,
        timestamps,
        input_bytes,
        output_bytes,
        compression,
        timings,
        warnings,
    })
}

/// Read the source document's metadata without flattening it.
pub fn inspect(
    input: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<SourceMetadata, FlattenError> {
    let pdfium = pdfium_locate::bind_pdfium()?;
    render::extract_metadata(&pdfium, input.as_ref(), password)
}

/// `flat-<file name>` in the current directory.
pub fn default_output_path(input: impl AsRef<Path>) -> PathBuf {
    let mut name = OsString::from("flat-");
    match input.as_ref().file_name() {
        Some(file_name) => name.push(file_name),
        None => name.push("output.pdf"),
    }
    PathBuf::from(name)
}

fn enter(config: &FlattenConfig, stage: Stage) {
    debug!("Stage: {}", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}

/// Directory that receives the output and the scratch files; created if
/// missing.
fn prepare_output_dir(output: &Path) -> Result<PathBuf, FlattenError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| FlattenError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(dir)
}

fn file_len(path: &Path) -> Result<u64, FlattenError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| FlattenError::Internal(format!("stat {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_uses_basename() {
        assert_eq!(
            default_output_path("/some/dir/report.pdf"),
            PathBuf::from("flat-report.pdf")
        );
        assert_eq!(default_output_path("a.pdf"), PathBuf::from("flat-a.pdf"));
        assert_eq!(default_output_path("/"), PathBuf::from("flat-output.pdf"));
    }

    #[test]
    fn output_dir_defaults_to_cwd() {
        assert_eq!(
            prepare_output_dir(Path::new("out.pdf")).unwrap(),
            PathBuf::from(".")
        );
    }

    #[test]
    fn output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("out.pdf");
        let made = prepare_output_dir(&nested).unwrap();
        assert!(made.is_dir());
        assert_eq!(made, dir.path().join("a").join("b"));
    }
}
