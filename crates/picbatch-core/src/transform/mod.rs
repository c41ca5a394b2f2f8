//! Compositing operations: cropping and watermark blending.
//!
//! Every operation allocates a fresh output raster and leaves its inputs
//! untouched. Rectangles come from [`crate::geometry`]; this module trusts
//! them for bounds and only clips what geometry allows to overflow.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner of the base raster
//! - Watermark rectangles may start at negative coordinates

mod crop;
mod resize;
mod watermark;

use thiserror::Error;

pub use crop::crop_one;
pub use resize::resize_to_fit;
pub use watermark::{blend_channel, watermark_one};

/// Errors from raster transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The requested output size has a zero dimension.
    #[error("Cannot resample to {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    /// The pixel buffer length disagrees with the raster dimensions.
    #[error("Raster buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}
