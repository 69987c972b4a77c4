//! Image encoding: `DynamicImage` → baseline JPEG bytes.
//!
//! The flattened page is a raster either way, so lossy compression costs
//! nothing structurally. JPEG bytes embed directly in the PDF as a
//! `DCTDecode` stream with no re-encoding. Alpha is dropped: pdfium renders
//! onto an opaque white background.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// A JPEG-encoded page ready to embed as an image XObject.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Encode a rasterised page as an RGB JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<EncodedPage, image::ImageError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;

    debug!("Encoded {}x{} image → {} bytes JPEG", width, height, jpeg.len());

    Ok(EncodedPage {
        width,
        height,
        jpeg,
    })
}
