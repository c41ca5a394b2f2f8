//! Output encoding.
//!
//! Every transformed image is written as lossless RGBA PNG. There is no
//! quality or compression setting to expose.

mod png;

pub use png::{encode_png, encode_png_pixels, EncodeError};
