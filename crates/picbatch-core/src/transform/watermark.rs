//! Watermark compositing with straight alpha blending.
//!
//! Only the part of the placement that lands on the base is sampled. Each
//! visible base pixel is mapped back into overlay coordinates and read with
//! bilinear interpolation, so memory use follows the output size no matter
//! how far the placement overflows.
//!
//! Per channel:
//!
//! ```text
//! a   = overlay_alpha / 255 * opacity
//! out = overlay * a + base * (1 - a)
//! ```
//!
//! The output alpha follows source-over: `a + base_alpha * (1 - a)`.

use super::TransformError;
use crate::decode::{RasterBuffer, CHANNELS};
use crate::geometry::PixelRect;

/// Blend one color channel with coverage `a` in `0.0..=1.0`.
#[inline]
pub fn blend_channel(overlay: u8, base: u8, a: f32) -> u8 {
    (overlay as f32 * a + base as f32 * (1.0 - a))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Two neighbouring source indices and the weight of the second.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: u32,
    hi: u32,
    t: f32,
}

/// Map destination index `d` of a `dst_len` span onto a `src_len` span,
/// pixel centers aligned.
fn tap(d: i64, dst_len: u32, src_len: u32) -> Tap {
    let scale = src_len as f64 / dst_len as f64;
    let max = (src_len - 1) as f64;
    let s = ((d as f64 + 0.5) * scale - 0.5).clamp(0.0, max);
    let lo = s.floor();
    Tap {
        lo: lo as u32,
        hi: (lo as u32 + 1).min(src_len - 1),
        t: (s - lo) as f32,
    }
}

fn sample(src: &RasterBuffer, tx: Tap, ty: Tap) -> [u8; 4] {
    let p00 = src.pixel(tx.lo, ty.lo);
    let p10 = src.pixel(tx.hi, ty.lo);
    let p01 = src.pixel(tx.lo, ty.hi);
    let p11 = src.pixel(tx.hi, ty.hi);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * tx.t;
        let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * tx.t;
        out[c] = (top + (bottom - top) * ty.t).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Draw `overlay` onto a copy of `base` inside `rect`.
///
/// `rect` may extend past `base` on any side; those parts are never
/// sampled. Pixels outside `rect` are copied from `base` unchanged.
/// Neither input is modified.
///
/// # Errors
///
/// Returns `TransformError::ZeroDimensions` for an empty overlay and
/// `TransformError::BufferMismatch` when the overlay's pixel buffer
/// disagrees with its dimensions.
pub fn watermark_one(
    base: &RasterBuffer,
    overlay: &RasterBuffer,
    rect: &PixelRect,
    opacity_percent: u8,
) -> Result<RasterBuffer, TransformError> {
    let mut output = base.clone();

    // Visible part of the rect in base coordinates
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = (rect.x + rect.width as i64).min(base.width as i64);
    let y1 = (rect.y + rect.height as i64).min(base.height as i64);

    if x0 >= x1 || y0 >= y1 || opacity_percent == 0 {
        return Ok(output);
    }

    if overlay.width == 0 || overlay.height == 0 {
        return Err(TransformError::ZeroDimensions {
            width: overlay.width,
            height: overlay.height,
        });
    }
    let expected = overlay.width as usize * overlay.height as usize * CHANNELS;
    if overlay.pixels.len() != expected {
        return Err(TransformError::BufferMismatch {
            expected,
            actual: overlay.pixels.len(),
        });
    }

    let opacity = opacity_percent.min(100) as f32 / 100.0;
    let columns: Vec<Tap> = (x0..x1)
        .map(|x| tap(x - rect.x, rect.width, overlay.width))
        .collect();

    for y in y0..y1 {
        let ty = tap(y - rect.y, rect.height, overlay.height);
        for (x, &tx) in (x0..x1).zip(&columns) {
            let [r, g, b, src_alpha] = sample(overlay, tx, ty);

            let a = src_alpha as f32 / 255.0 * opacity;
            if a <= 0.0 {
                continue;
            }

            let i = output.offset(x as u32, y as u32);
            let px = &mut output.pixels[i..i + 4];
            px[0] = blend_channel(r, px[0], a);
            px[1] = blend_channel(g, px[1], a);
            px[2] = blend_channel(b, px[2], a);
            px[3] = (a * 255.0 + px[3] as f32 * (1.0 - a))
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }

    Ok(output)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: output always has the base dimensions.
        #[test]
        fn prop_output_matches_base_size(
            (bw, bh) in (1u32..=40, 1u32..=40),
            (x, y) in (-50i64..=50, -50i64..=50),
            (w, h) in (1u32..=60, 1u32..=60),
            opacity in 10u8..=100,
        ) {
            let base = RasterBuffer::filled(bw, bh, [255, 255, 255, 255]);
            let overlay = RasterBuffer::filled(5, 3, [0, 0, 0, 255]);
            let rect = PixelRect { x, y, width: w, height: h };
            let out = watermark_one(&base, &overlay, &rect, opacity).unwrap();

            prop_assert_eq!(out.width, bw);
            prop_assert_eq!(out.height, bh);
            prop_assert_eq!(out.pixels.len(), base.pixels.len());
        }

        /// Property: pixels outside the rect are unchanged.
        #[test]
        fn prop_outside_rect_unchanged(
            (x, y) in (-10i64..=30, -10i64..=30),
            (w, h) in (1u32..=20, 1u32..=20),
        ) {
            let base = RasterBuffer::filled(24, 24, [9, 99, 199, 255]);
            let overlay = RasterBuffer::filled(4, 4, [0, 0, 0, 255]);
            let rect = PixelRect { x, y, width: w, height: h };
            let out = watermark_one(&base, &overlay, &rect, 100).unwrap();

            for py in 0..24u32 {
                for px in 0..24u32 {
                    let inside = (px as i64) >= x && (px as i64) < x + w as i64
                        && (py as i64) >= y && (py as i64) < y + h as i64;
                    if !inside {
                        prop_assert_eq!(out.pixel(px, py), base.pixel(px, py));
                    }
                }
            }
        }
    }
}
