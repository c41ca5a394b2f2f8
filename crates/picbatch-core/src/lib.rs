//! picbatch Core - Batch image pipeline library
//!
//! This crate provides the core functionality for picbatch: cropping images by
//! pixel margins, stamping a watermark at a computed position, running either
//! transform over a batch with progress reporting, packaging the results into a
//! ZIP archive, and chaining one stage's output into the next.

pub mod archive;
pub mod batch;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod preview;
pub mod session;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use archive::{export_stage, pack, ArchiveEntry, ArchiveError, Export};
pub use batch::{
    BatchError, BatchProcessor, BatchResult, BatchState, ItemError, ItemFailure, Progress,
    ProgressObserver,
};
pub use geometry::{
    crop_bounds, watermark_placement, CropParams, GeometryError, ParamError, Placement, Rect,
    WatermarkParams, WatermarkPosition,
};
pub use preview::{Preview, PreviewError, PreviewSource};
pub use session::{NextStep, PipelineSession, SessionError};

/// A named, encoded image as it enters a stage.
///
/// Immutable once created; cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// File name as supplied by the user (e.g. "holiday.jpg")
    pub name: String,
    /// Encoded image bytes
    pub bytes: Bytes,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// The PNG output of one successfully transformed input.
///
/// Keeps the input's name; the stage suffix is applied only when the
/// asset is written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub name: String,
    pub bytes: Bytes,
}

impl ProcessedAsset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl From<ProcessedAsset> for ImageAsset {
    fn from(asset: ProcessedAsset) -> Self {
        Self {
            name: asset.name,
            bytes: asset.bytes,
        }
    }
}

/// One transform type in the chained pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Crop,
    Watermark,
}

impl Stage {
    /// Suffix inserted before the extension of archived outputs.
    pub fn suffix(self) -> &'static str {
        match self {
            Stage::Crop => "_cropped",
            Stage::Watermark => "_watermarked",
        }
    }

    /// Archive folder and download file prefix.
    pub fn purpose(self) -> &'static str {
        match self {
            Stage::Crop => "cropped_images",
            Stage::Watermark => "watermarked_images",
        }
    }

    /// The other stage.
    pub fn complement(self) -> Stage {
        match self {
            Stage::Crop => Stage::Watermark,
            Stage::Watermark => Stage::Crop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Crop => "crop",
            Stage::Watermark => "watermark",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crop" => Ok(Stage::Crop),
            "watermark" => Ok(Stage::Watermark),
            other => Err(SessionError::UnknownStep(other.to_string())),
        }
    }
}
