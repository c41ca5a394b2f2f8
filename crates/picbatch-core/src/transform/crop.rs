//! Pixel-margin cropping.

use crate::decode::{RasterBuffer, CHANNELS};
use crate::geometry::Rect;

/// Copy a sub-rectangle into a new raster of exactly `rect.width x rect.height`.
///
/// The rectangle must lie inside the raster; [`crate::geometry::crop_bounds`]
/// guarantees this. An out-of-bounds rectangle is a caller bug and panics.
pub fn crop_one(raster: &RasterBuffer, rect: &Rect) -> RasterBuffer {
    debug_assert!(
        rect.x as u64 + rect.width as u64 <= raster.width as u64
            && rect.y as u64 + rect.height as u64 <= raster.height as u64,
        "crop rect {rect:?} exceeds {}x{} raster",
        raster.width,
        raster.height
    );

    // Fast path: full-size crop returns a clone
    if rect.x == 0 && rect.y == 0 && rect.width == raster.width && rect.height == raster.height {
        return raster.clone();
    }

    let row_bytes = rect.width as usize * CHANNELS;
    let mut output = Vec::with_capacity(row_bytes * rect.height as usize);

    // Copy pixel data row by row
    for y in rect.y..rect.y + rect.height {
        let start = raster.offset(rect.x, y);
        output.extend_from_slice(&raster.pixels[start..start + row_bytes]);
    }

    RasterBuffer::new(rect.width, rect.height, output)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::{crop_bounds, CropParams};
    use proptest::prelude::*;

    fn create_test_image(width: u32, height: u32) -> RasterBuffer {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0, 255]);
            }
        }
        RasterBuffer::new(width, height, pixels)
    }

    proptest! {
        /// Property: output size and pixel data match the computed rect.
        #[test]
        fn prop_output_matches_rect(
            (width, height) in (5u32..=64, 5u32..=64),
            (top, bottom, left, right) in (0u32..=2, 0u32..=2, 0u32..=2, 0u32..=2),
        ) {
            let img = create_test_image(width, height);
            let rect = crop_bounds(width, height, &CropParams::new(top, bottom, left, right)).unwrap();
            let result = crop_one(&img, &rect);

            prop_assert_eq!(result.width, rect.width);
            prop_assert_eq!(result.height, rect.height);
            prop_assert_eq!(result.pixels.len(), (rect.width * rect.height * 4) as usize);
        }

        /// Property: every output pixel comes from the offset source pixel.
        #[test]
        fn prop_pixels_come_from_offset(
            (width, height) in (8u32..=40, 8u32..=40),
            (left, top) in (0u32..=3, 0u32..=3),
        ) {
            let img = create_test_image(width, height);
            let rect = Rect { x: left, y: top, width: width - left - 1, height: height - top - 1 };
            let result = crop_one(&img, &rect);

            for y in 0..result.height {
                for x in 0..result.width {
                    prop_assert_eq!(result.pixel(x, y), img.pixel(x + left, y + top));
                }
            }
        }
    }
}
