//! Sequential batch execution of the crop and watermark stages.
//!
//! A run moves through `Idle -> Running -> Completed | CompletedWithFailures`.
//! Items are processed strictly in input order, one decode/transform/encode
//! cycle at a time. A failing item is recorded and the run continues with
//! the next one; only missing preconditions reject a run up front.
//!
//! # Example
//!
//! ```ignore
//! let mut processor = BatchProcessor::new();
//! let result = processor.run_crop(&inputs, &CropParams::new(10, 10, 5, 5), &mut |p: Progress| {
//!     println!("{}", p.message());
//! })?;
//! println!("{}", processor.state().status_message());
//! ```

use bytes::Bytes;
use thiserror::Error;

use crate::decode::{decode_image, DecodeError, RasterBuffer};
use crate::encode::{encode_png, EncodeError};
use crate::geometry::{
    crop_bounds, watermark_placement, CropParams, GeometryError, ParamError, WatermarkParams,
};
use crate::transform::{crop_one, watermark_one, TransformError};
use crate::{ImageAsset, ProcessedAsset, Stage};

/// Progress of a running batch, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Index of the item about to be processed (1-based)
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn message(&self) -> String {
        format!("Processing image {} of {}...", self.current, self.total)
    }
}

/// Receives one notification as each item starts.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(Progress),
{
    fn on_progress(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Why a single item was skipped.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A skipped input and the reason.
#[derive(Debug)]
pub struct ItemFailure {
    pub name: String,
    pub reason: ItemError,
}

/// Batch-level rejections, raised before any item is processed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No images selected")]
    EmptyBatch,

    #[error("No watermark image loaded")]
    MissingWatermark,

    #[error("Watermark image could not be decoded: {0}")]
    InvalidWatermark(#[source] DecodeError),

    #[error(transparent)]
    InvalidParams(#[from] ParamError),
}

/// Outcome of one run. `succeeded` keeps input order.
#[derive(Debug)]
pub struct BatchResult {
    pub stage: Stage,
    pub succeeded: Vec<ProcessedAsset>,
    pub failed: Vec<ItemFailure>,
}

impl BatchResult {
    /// Number of inputs the run covered.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Lifecycle of the processor's most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Running {
        stage: Stage,
        current: usize,
        total: usize,
    },
    Completed {
        stage: Stage,
        succeeded: usize,
    },
    CompletedWithFailures {
        stage: Stage,
        succeeded: usize,
        failed: usize,
    },
}

impl BatchState {
    /// User-facing status line for this state.
    pub fn status_message(&self) -> String {
        match *self {
            BatchState::Idle => String::new(),
            BatchState::Running { current, total, .. } => Progress { current, total }.message(),
            BatchState::Completed { succeeded, .. } => {
                format!("Successfully processed {succeeded} images!")
            }
            BatchState::CompletedWithFailures {
                succeeded, failed, ..
            } => format!("Successfully processed {succeeded} images! {failed} failed."),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BatchState::Completed { .. } | BatchState::CompletedWithFailures { .. }
        )
    }
}

/// Crop a decoded raster by pixel margins.
pub fn crop_raster(raster: &RasterBuffer, params: &CropParams) -> Result<RasterBuffer, GeometryError> {
    let rect = crop_bounds(raster.width, raster.height, params)?;
    Ok(crop_one(raster, &rect))
}

/// Stamp a decoded watermark onto a decoded raster.
pub fn watermark_raster(
    raster: &RasterBuffer,
    watermark: &RasterBuffer,
    params: &WatermarkParams,
) -> Result<RasterBuffer, TransformError> {
    let placement = watermark_placement(
        raster.width,
        raster.height,
        watermark.width,
        watermark.height,
        params,
    );
    watermark_one(
        raster,
        watermark,
        &placement.to_pixel_rect(),
        params.opacity_percent,
    )
}

/// Drives the transforms over an ordered batch of inputs.
#[derive(Debug, Default)]
pub struct BatchProcessor {
    state: BatchState,
}

impl BatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Crop every input by the same margins.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::EmptyBatch` if `inputs` is empty. Per-image
    /// problems are reported in [`BatchResult::failed`] instead.
    pub fn run_crop(
        &mut self,
        inputs: &[ImageAsset],
        params: &CropParams,
        observer: &mut impl ProgressObserver,
    ) -> Result<BatchResult, BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        tracing::info!(count = inputs.len(), crop = %params, "Starting crop batch");

        Ok(self.run(Stage::Crop, inputs, observer, |raster| {
            Ok(crop_raster(raster, params)?)
        }))
    }

    /// Stamp `watermark` onto every input.
    ///
    /// The watermark is decoded once, before the run starts.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::EmptyBatch` for no inputs,
    /// `BatchError::MissingWatermark` when no watermark is given,
    /// `BatchError::InvalidParams` for out-of-range percentages and
    /// `BatchError::InvalidWatermark` when the watermark does not decode.
    pub fn run_watermark(
        &mut self,
        inputs: &[ImageAsset],
        watermark: Option<&ImageAsset>,
        params: &WatermarkParams,
        observer: &mut impl ProgressObserver,
    ) -> Result<BatchResult, BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let watermark = watermark.ok_or(BatchError::MissingWatermark)?;
        params.validate()?;

        let overlay = decode_image(&watermark.bytes).map_err(BatchError::InvalidWatermark)?;

        tracing::info!(
            count = inputs.len(),
            watermark = %watermark.name,
            size_percent = params.size_percent,
            opacity_percent = params.opacity_percent,
            position = ?params.position,
            "Starting watermark batch"
        );

        Ok(self.run(Stage::Watermark, inputs, observer, |raster| {
            Ok(watermark_raster(raster, &overlay, params)?)
        }))
    }

    fn run<F>(
        &mut self,
        stage: Stage,
        inputs: &[ImageAsset],
        observer: &mut impl ProgressObserver,
        mut transform: F,
    ) -> BatchResult
    where
        F: FnMut(&RasterBuffer) -> Result<RasterBuffer, ItemError>,
    {
        let total = inputs.len();
        let mut succeeded = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let progress = Progress {
                current: index + 1,
                total,
            };
            self.state = BatchState::Running {
                stage,
                current: progress.current,
                total,
            };
            observer.on_progress(progress);

            match process_item(input, &mut transform) {
                Ok(bytes) => {
                    tracing::debug!(stage = %stage, name = %input.name, bytes = bytes.len(), "Processed image");
                    succeeded.push(ProcessedAsset {
                        name: input.name.clone(),
                        bytes,
                    });
                }
                Err(reason) => {
                    tracing::warn!(stage = %stage, name = %input.name, error = %reason, "Skipping image");
                    failed.push(ItemFailure {
                        name: input.name.clone(),
                        reason,
                    });
                }
            }
        }

        self.state = if failed.is_empty() {
            BatchState::Completed {
                stage,
                succeeded: succeeded.len(),
            }
        } else {
            BatchState::CompletedWithFailures {
                stage,
                succeeded: succeeded.len(),
                failed: failed.len(),
            }
        };

        tracing::info!(
            stage = %stage,
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Batch finished"
        );

        BatchResult {
            stage,
            succeeded,
            failed,
        }
    }
}

fn process_item<F>(input: &ImageAsset, transform: &mut F) -> Result<Bytes, ItemError>
where
    F: FnMut(&RasterBuffer) -> Result<RasterBuffer, ItemError>,
{
    let raster = decode_image(&input.bytes)?;
    let output = transform(&raster)?;
    Ok(Bytes::from(encode_png(&output)?))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
