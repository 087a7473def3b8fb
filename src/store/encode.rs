use std::io;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageResult, RgbImage};

use crate::sensor::types::DepthImage;

/// Encode an RGB image as JPEG at the given quality (1-100).
pub fn encode_color_jpeg(color: &RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    color.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Encode a depth map as lossless 16-bit grayscale PNG.
pub fn encode_depth_png(depth: &DepthImage) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    depth.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Write `bytes` to `path` atomically (write a sibling `.tmp`, then rename).
///
/// Readers either see the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Like [`write_atomic`] but never replaces an existing file.
///
/// The `.tmp` file is hard-linked into place, which fails with
/// `AlreadyExists` when `path` is taken.
pub fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes)?;
    let linked = std::fs::hard_link(&tmp_path, path);
    let _ = std::fs::remove_file(&tmp_path);
    linked
}
