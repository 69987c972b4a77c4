//! PDF assembly: one full-bleed JPEG image per page, built with lopdf.
//!
//! Each page's MediaBox is `[0 0 width height]` with the width and height of
//! the rendered bitmap in pixels taken as points, and its content stream
//! paints the image across the whole box:
//!
//! ```text
//! q  W 0 0 H 0 0 cm  /Im0 Do  Q
//! ```
//!
//! No text, fonts or vector paths survive: the page is only the image.

use crate::error::FlattenError;
use crate::pipeline::encode;
use crate::pipeline::render::PageImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::{debug, info};

/// Producer string written into the Info dictionary of every output.
pub const PRODUCER: &str = concat!("pdf-flatten ", env!("CARGO_PKG_VERSION"));

/// Resource name of the page image inside each page's `/XObject` dictionary.
const IMAGE_NAME: &[u8] = b"Im0";

/// Size of one assembled page, in points (= source pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

/// Build a new PDF at `output_path` whose pages are exactly `pages`.
///
/// Images are consumed in order and dropped as soon as they are embedded.
/// Any existing file at `output_path` is overwritten.
pub fn assemble(
    pages: Vec<PageImage>,
    jpeg_quality: u8,
    output_path: &Path,
) -> Result<Vec<PageSize>, FlattenError> {
    if pages.is_empty() {
        return Err(FlattenError::EmptyDocument {
            path: output_path.to_path_buf(),
        });
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    let mut sizes = Vec::with_capacity(pages.len());

    for page in pages {
        let encoded = encode::encode_jpeg(&page.image, jpeg_quality).map_err(|e| {
            FlattenError::ImageEncodingFailed {
                page: page.page_num,
                detail: e.to_string(),
            }
        })?;
        let width = i64::from(encoded.width);
        let height = i64::from(encoded.height);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            encoded.jpeg,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0i64.into(),
                        0i64.into(),
                        height.into(),
                        0i64.into(),
                        0i64.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|e| FlattenError::PdfWriteFailed {
            path: output_path.to_path_buf(),
            detail: format!("content stream for page {}: {}", page.page_num, e),
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let mut xobjects = lopdf::Dictionary::new();
        xobjects.set(IMAGE_NAME.to_vec(), image_id);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => xobjects,
            },
        });

        debug!(
            "Assembled page {} as {}x{} pt",
            page.page_num, encoded.width, encoded.height
        );
        kids.push(page_id.into());
        sizes.push(PageSize {
            width: encoded.width,
            height: encoded.height,
        });
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.save(output_path)
        .map_err(|e| FlattenError::PdfWriteFailed {
            path: output_path.to_path_buf(),
            detail: e.to_string(),
        })?;

    info!(
        "Assembled {} image pages into {}",
        sizes.len(),
        output_path.display()
    );
    Ok(sizes)
}
