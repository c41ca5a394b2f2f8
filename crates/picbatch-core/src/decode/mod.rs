//! Image decoding for batch inputs.
//!
//! This module provides functionality for:
//! - Decoding JPEG, PNG, GIF and WebP bytes into an RGBA [`RasterBuffer`]
//! - Applying EXIF orientation the way browsers display images
//!
//! # Architecture
//!
//! Every decode is independent and produces a buffer owned by the caller.
//! All operations are synchronous; the batch processor calls them one item
//! at a time.

mod codec;
mod types;

pub use codec::decode_image;
pub use types::{DecodeError, Orientation, RasterBuffer, CHANNELS};
