//! Fixtures shared by unit tests.

use crate::decode::RasterBuffer;
use crate::encode::encode_png;
use crate::ImageAsset;

/// PNG bytes of a solid-color image.
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(&RasterBuffer::filled(width, height, rgba)).expect("fixture encodes")
}

/// A solid-color PNG asset.
pub fn png_asset(name: &str, width: u32, height: u32, rgba: [u8; 4]) -> ImageAsset {
    ImageAsset::new(name, png_bytes(width, height, rgba))
}

/// An asset whose bytes are not an image.
pub fn corrupt_asset(name: &str) -> ImageAsset {
    ImageAsset::new(name, b"definitely not an image".to_vec())
}
