use image::{GrayImage, Luma, RgbImage};
use thiserror::Error;

use crate::sensor::types::DepthImage;
use crate::store::encode::encode_color_jpeg;

/// Preview rendering errors.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("invalid image buffer: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),

    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Largest size with the same aspect ratio that fits in `max_width` x
/// `max_height`. Never upscales; never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width.max(1), height.max(1));
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let fitted_width = (f64::from(width) * scale).round() as u32;
    let fitted_height = (f64::from(height) * scale).round() as u32;
    (fitted_width.max(1), fitted_height.max(1))
}

/// Downscale an RGB image to fit inside the display area.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing. Images that
/// already fit are returned unchanged.
pub fn scale_to_fit(
    image: &RgbImage,
    max_width: u32,
    max_height: u32,
) -> Result<RgbImage, PreviewError> {
    use fast_image_resize as fr;
    use fr::images::Image;

    let (width, height) = image.dimensions();
    let (target_width, target_height) = fit_within(width, height, max_width, max_height);
    if (target_width, target_height) == (width, height) {
        return Ok(image.clone());
    }

    let src_image = Image::from_vec_u8(width, height, image.as_raw().clone(), fr::PixelType::U8x3)?;
    let mut dst_image = Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer.resize(&src_image, &mut dst_image, None)?;

    RgbImage::from_raw(target_width, target_height, dst_image.into_vec()).ok_or(
        PreviewError::Buffer(fast_image_resize::ImageBufferError::InvalidBufferSize),
    )
}

/// Compress an RGB image to JPEG at the given quality (1-100).
pub fn compress_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PreviewError> {
    Ok(encode_color_jpeg(image, quality)?)
}

/// Map a depth image to 8-bit grayscale for display.
///
/// Valid samples are stretched over the observed range so near is bright
/// and far is dark; zero (no reading) stays black.
pub fn depth_to_gray(depth: &DepthImage) -> GrayImage {
    let valid = depth.as_raw().iter().copied().filter(|&d| d > 0);
    let (min, max) = valid.fold((u16::MAX, 0u16), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let span = u32::from(max.saturating_sub(min)).max(1);

    GrayImage::from_fn(depth.width(), depth.height(), |x, y| {
        let d = depth.get_pixel(x, y).0[0];
        if d == 0 {
            return Luma([0]);
        }
        let offset = u32::from(d - min);
        Luma([(255 - offset * 254 / span) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a synthetic RGB test image (gradient pattern).
    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        // Azure Kinect 1280x720 color into a 640x480 label
        assert_eq!(fit_within(1280, 720, 640, 480), (640, 360));
        // NFOV depth-sized 640x576 into 640x480
        assert_eq!(fit_within(640, 576, 640, 480), (533, 480));
    }

    #[test]
    fn fit_within_never_upscales() {
        assert_eq!(fit_within(320, 240, 640, 480), (320, 240));
    }

    #[test]
    fn fit_within_never_returns_zero() {
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
        assert_eq!(fit_within(0, 0, 100, 100), (1, 1));
    }

    #[test]
    fn scale_to_fit_produces_reduced_resolution() {
        let rgb = make_test_rgb(1920, 1080);
        let scaled = scale_to_fit(&rgb, 640, 480).unwrap();
        assert_eq!(scaled.dimensions(), (640, 360));
    }

    #[test]
    fn scale_to_fit_passes_small_images_through() {
        let rgb = make_test_rgb(64, 48);
        let scaled = scale_to_fit(&rgb, 640, 480).unwrap();
        assert_eq!(scaled, rgb);
    }

    #[test]
    fn compress_jpeg_produces_valid_jpeg_bytes() {
        let jpeg = compress_jpeg(&make_test_rgb(640, 480), 85).unwrap();
        // JPEG files start with FF D8
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);
    }

    #[test]
    fn depth_to_gray_maps_near_bright_far_dark() {
        let mut depth = DepthImage::new(3, 1);
        depth.put_pixel(0, 0, Luma([500]));
        depth.put_pixel(1, 0, Luma([4500]));
        depth.put_pixel(2, 0, Luma([0]));

        let gray = depth_to_gray(&depth);
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 1);
        assert_eq!(gray.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn depth_to_gray_handles_flat_depth() {
        let depth = DepthImage::from_pixel(2, 2, Luma([1200]));
        let gray = depth_to_gray(&depth);
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }
}
