//! Raster resampling for preview generation.
//!
//! All functions return new `RasterBuffer` instances without modifying the input.

use super::TransformError;
use crate::decode::{RasterBuffer, CHANNELS};
use image::imageops::FilterType;

/// Resize a raster to exact dimensions.
///
/// # Errors
///
/// Returns `TransformError::ZeroDimensions` for a zero target size and
/// `TransformError::BufferMismatch` if the source pixel buffer does not
/// match its declared dimensions.
pub fn resize(
    image: &RasterBuffer,
    width: u32,
    height: u32,
) -> Result<RasterBuffer, TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::ZeroDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgba_image = image.to_rgba_image().ok_or(TransformError::BufferMismatch {
        expected: image.width as usize * image.height as usize * CHANNELS,
        actual: image.pixels.len(),
    })?;

    let resized = image::imageops::resize(&rgba_image, width, height, FilterType::Triangle);

    Ok(RasterBuffer::from_rgba_image(resized))
}

/// Resize a raster to fit within a maximum edge length while preserving aspect ratio.
///
/// Rasters already within `max_edge` are returned unchanged.
pub fn resize_to_fit(
    image: &RasterBuffer,
    max_edge: u32,
) -> Result<RasterBuffer, TransformError> {
    if max_edge == 0 {
        return Err(TransformError::ZeroDimensions {
            width: 0,
            height: 0,
        });
    }

    let (src_width, src_height) = (image.width, image.height);

    if src_width <= max_edge && src_height <= max_edge {
        return Ok(image.clone());
    }

    let (new_width, new_height) = calculate_fit_dimensions(src_width, src_height, max_edge);

    resize(image, new_width, new_height)
}

/// Calculate dimensions to fit within max_edge while preserving aspect ratio.
fn calculate_fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = width as f64 / height as f64;

    if width >= height {
        let new_height = (max_edge as f64 / ratio).round() as u32;
        (max_edge, new_height.max(1))
    } else {
        let new_width = (max_edge as f64 * ratio).round() as u32;
        (new_width.max(1), max_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> RasterBuffer {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8);
                pixels.push(((y * 255) / height.max(1)) as u8);
                pixels.push(128);
                pixels.push(255);
            }
        }
        RasterBuffer::new(width, height, pixels)
    }

    #[test]
    fn test_resize_basic() {
        let img = create_test_image(100, 50);
        let resized = resize(&img, 50, 25).unwrap();

        assert_eq!(resized.width, 50);
        assert_eq!(resized.height, 25);
        assert_eq!(resized.pixels.len(), 50 * 25 * 4);
    }

    #[test]
    fn test_resize_same_dimensions() {
        let img = create_test_image(100, 50);
        let resized = resize(&img, 100, 50).unwrap();
        assert_eq!(resized, img);
    }

    #[test]
    fn test_resize_upscale() {
        let img = create_test_image(40, 20);
        let resized = resize(&img, 200, 100).unwrap();

        assert_eq!(resized.width, 200);
        assert_eq!(resized.height, 100);
    }

    #[test]
    fn test_resize_zero_dimensions_error() {
        let img = create_test_image(100, 50);

        assert!(resize(&img, 0, 50).is_err());
        assert!(resize(&img, 50, 0).is_err());
    }

    #[test]
    fn test_resize_mismatched_buffer_error() {
        let img = RasterBuffer {
            width: 10,
            height: 10,
            pixels: vec![0u8; 12],
        };
        let result = resize(&img, 5, 5);
        assert!(matches!(
            result,
            Err(TransformError::BufferMismatch {
                expected: 400,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_resize_to_fit_landscape() {
        let img = create_test_image(600, 400);
        let resized = resize_to_fit(&img, 256).unwrap();

        assert_eq!(resized.width, 256);
        assert_eq!(resized.height, 171); // 400 * (256/600) ≈ 171
    }

    #[test]
    fn test_resize_to_fit_already_smaller() {
        let img = create_test_image(100, 50);
        let resized = resize_to_fit(&img, 256).unwrap();

        assert_eq!(resized.width, 100);
        assert_eq!(resized.height, 50);
    }

    #[test]
    fn test_resize_to_fit_zero_max_edge_error() {
        let img = create_test_image(100, 50);
        assert!(resize_to_fit(&img, 0).is_err());
    }

    #[test]
    fn test_calculate_fit_dimensions_portrait() {
        let (w, h) = calculate_fit_dimensions(4000, 6000, 2560);
        assert_eq!(w, 1707);
        assert_eq!(h, 2560);
    }

    #[test]
    fn test_calculate_fit_dimensions_zero_input() {
        assert_eq!(calculate_fit_dimensions(0, 0, 256), (0, 0));
    }
}
