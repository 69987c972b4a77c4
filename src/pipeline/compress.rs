//! Compression: garbage-collect and deflate an assembled PDF with a full
//! rewrite.
//!
//! Page images are already `DCTDecode` streams; lopdf's `compress` leaves
//! filtered streams alone, so only content streams and other plain streams are
//! deflated. The savings come mostly from pruning and renumbering.

use crate::error::FlattenError;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Statistics from one compression pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressStats {
    pub pages: usize,
    pub objects_removed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Rewrite `input_path` into `output_path`, dropping empty streams and
/// unreferenced objects and deflating every unfiltered stream.
///
/// `input_path` is only read. `output_path` must differ from it.
pub fn compress(input_path: &Path, output_path: &Path) -> Result<CompressStats, FlattenError> {
    let pdf_err = |path: &Path, e: lopdf::Error| FlattenError::PdfWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let bytes_in = file_len(input_path)?;
    let mut doc = Document::load(input_path).map_err(|e| pdf_err(input_path, e))?;

    let empty = doc.delete_zero_length_streams();
    let pruned = doc.prune_objects();
    debug!(
        "Removed {} zero-length streams and {} unreferenced objects",
        empty.len(),
        pruned.len()
    );

    doc.renumber_objects();
    doc.compress();

    let pages = doc.get_pages().len();
    doc.save(output_path)
        .map_err(|e| FlattenError::PdfWriteFailed {
            path: output_path.to_path_buf(),
            detail: e.to_string(),
        })?;
    let bytes_out = file_len(output_path)?;

    info!(
        "Compressed {} pages: {} → {} bytes",
        pages, bytes_in, bytes_out
    );

    Ok(CompressStats {
        pages,
        objects_removed: empty.len() + pruned.len(),
        bytes_in,
        bytes_out,
    })
}

fn file_len(path: &Path) -> Result<u64, FlattenError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| FlattenError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Two text pages plus an orphaned object and an empty stream.
    fn write_sample(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for i in 0..2 {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24i64.into()]),
                    Operation::new("Td", vec![72i64.into(), 700i64.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {i}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0i64.into(), 0i64.into(), 612i64.into(), 792i64.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        doc.add_object(dictionary! { "Orphan" => true });
        doc.add_object(Stream::new(dictionary! {}, Vec::new()));

        doc.save(path).unwrap();
    }

    #[test]
    fn keeps_pages_and_leaves_input_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        write_sample(&input);
        let before = std::fs::read(&input).unwrap();

        let stats = compress(&input, &output).unwrap();
        assert_eq!(stats.pages, 2);
        assert!(stats.objects_removed >= 2, "{stats:?}");
        assert_eq!(std::fs::read(&input).unwrap(), before);

        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn second_pass_does_not_grow() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let once = dir.path().join("once.pdf");
        let twice = dir.path().join("twice.pdf");
        write_sample(&input);

        let first = compress(&input, &once).unwrap();
        let second = compress(&once, &twice).unwrap();
        assert_eq!(first.pages, second.pages);
        assert!(second.bytes_out <= first.bytes_out);
    }

    fn media_boxes(path: &Path) -> Vec<Vec<i64>> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                doc.get_dictionary(*id)
                    .unwrap()
                    .get(b"MediaBox")
                    .unwrap()
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|o| o.as_i64().unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn image_pages_survive_repeated_passes() {
        use crate::pipeline::assemble::assemble;
        use crate::pipeline::render::PageImage;
        use image::{DynamicImage, Rgb, RgbImage};

        let dir = tempfile::tempdir().unwrap();
        let assembled = dir.path().join("assembled.pdf");
        let once = dir.path().join("once.pdf");
        let twice = dir.path().join("twice.pdf");

        let pages = [(40, 60), (60, 40), (25, 25)]
            .into_iter()
            .enumerate()
            .map(|(i, (w, h))| {
                let img = RgbImage::from_pixel(w, h, Rgb([30, 120, 200]));
                PageImage::new(i + 1, DynamicImage::ImageRgb8(img))
            })
            .collect();
        assemble(pages, 50, &assembled).unwrap();

        let expected = vec![vec![0, 0, 40, 60], vec![0, 0, 60, 40], vec![0, 0, 25, 25]];
        assert_eq!(media_boxes(&assembled), expected);

        let first = compress(&assembled, &once).unwrap();
        let second = compress(&once, &twice).unwrap();
        assert_eq!((first.pages, second.pages), (3, 3));
        assert_eq!(media_boxes(&once), expected);
        assert_eq!(media_boxes(&twice), expected);
    }

    #[test]
    fn garbage_input_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("junk.pdf");
        std::fs::write(&input, b"%PDF-1.5\nnot really a pdf").unwrap();

        let err = compress(&input, &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, FlattenError::PdfWriteFailed { .. }));
    }
}
