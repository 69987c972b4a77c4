//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Pages are rendered sequentially in page order at `dpi / 72` times their
//! size in points, so a US-Letter page at 200 DPI becomes 1700 × 2200 px.
//! This is the most expensive stage of the pipeline: every page is held in
//! memory as a full bitmap until it has been assembled.

use crate::error::FlattenError;
use crate::output::SourceMetadata;
use crate::pipeline::input;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// One rasterised source page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed source page number.
    pub page_num: usize,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn new(page_num: usize, image: DynamicImage) -> Self {
        Self { page_num, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Rasterise every page of a PDF at `dpi`.
///
/// # Returns
/// One [`PageImage`] per page, in page order.
///
/// # Errors
/// [`FlattenError::InputNotFound`] when `pdf_path` does not exist,
/// [`FlattenError::CorruptDocument`] when pdfium cannot parse it.
pub fn render_pages(
    pdfium: &Pdfium,
    pdf_path: &Path,
    dpi: u32,
    password: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PageImage>, FlattenError> {
    input::resolve_local(pdf_path)?;
    let document = load_document(pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering at {} DPI", total_pages, dpi);

    if let Some(cb) = progress {
        cb.on_flatten_start(total_pages);
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page_num = idx + 1;

        let page = pages
            .get(idx as u16)
            .map_err(|e| FlattenError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            FlattenError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        if let Some(cb) = progress {
            cb.on_page_rendered(page_num, total_pages, image.width(), image.height());
        }

        results.push(PageImage::new(page_num, image));
    }

    Ok(results)
}

/// Read page count and Info-dictionary fields without rendering pages.
pub fn extract_metadata(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<SourceMetadata, FlattenError> {
    input::resolve_local(pdf_path)?;
    let document = load_document(pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(SourceMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Open a document, translating pdfium's load error into the taxonomy.
fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, FlattenError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                FlattenError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                FlattenError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            FlattenError::CorruptDocument {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
