//! The editing session handle exposed to JavaScript.
//!
//! An `EditingSession` owns the current image set, the loaded watermark and
//! the outputs of the most recent batch. Running a stage again before
//! choosing the next step reprocesses the same inputs; the outputs are only
//! carried forward when the user picks a next step.
//!
//! # Example
//!
//! ```typescript
//! import init, { EditingSession } from '@picbatch/wasm';
//!
//! await init();
//! const session = new EditingSession();
//! for (const file of files) {
//!   session.add_image(file.name, new Uint8Array(await file.arrayBuffer()));
//! }
//!
//! const summary = session.run_crop({ top: 10, bottom: 10, left: 0, right: 0 },
//!   (current, total, message) => (status.textContent = message));
//! const archive = session.export_archive();
//! download(archive.file_name, archive.bytes());
//!
//! session.choose_next('watermark');
//! ```

use picbatch_core::archive::DOWNLOAD_COMPLETE_MESSAGE;
use picbatch_core::decode::decode_image;
use picbatch_core::session::available_next_steps;
use picbatch_core::{
    export_stage, ArchiveError, BatchError, BatchProcessor, BatchResult, CropParams, Export,
    ImageAsset, NextStep, PipelineSession, Preview, PreviewError, PreviewSource, Progress,
    ProgressObserver, SessionError, Stage, WatermarkParams,
};
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::types::{BatchSummary, CroppedSize, JsArchive, JsPreview};

/// Longest edge of rendered previews.
pub const PREVIEW_MAX_EDGE: u32 = 1024;

#[derive(Debug, Error)]
pub(crate) enum BindingError {
    #[error("Nothing has been processed yet")]
    NoResults,

    #[error("Invalid parameters: {0}")]
    Params(String),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

impl From<BindingError> for JsValue {
    fn from(err: BindingError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, BindingError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| BindingError::Params(e.to_string()))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Forwards progress to a JS callback as `(current, total, message)`.
struct JsProgress<'a>(&'a js_sys::Function);

impl ProgressObserver for JsProgress<'_> {
    fn on_progress(&mut self, progress: Progress) {
        let result = self.0.call3(
            &JsValue::NULL,
            &JsValue::from(progress.current as u32),
            &JsValue::from(progress.total as u32),
            &JsValue::from_str(&progress.message()),
        );
        if let Err(err) = result {
            tracing::warn!(error = ?err, "Progress callback threw");
        }
    }
}

#[wasm_bindgen]
#[derive(Default)]
pub struct EditingSession {
    pipeline: PipelineSession,
    processor: BatchProcessor,
    watermark: Option<ImageAsset>,
    last_result: Option<BatchResult>,
    preview: Option<PreviewSource>,
    status: String,
}

#[wasm_bindgen]
impl EditingSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a picked or dropped file to the current image set.
    pub fn add_image(&mut self, name: String, bytes: Vec<u8>) -> Result<(), JsValue> {
        self.push_image(ImageAsset::new(name, bytes))?;
        Ok(())
    }

    /// Drop every image in the current set.
    pub fn clear_images(&mut self) -> Result<(), JsValue> {
        self.replace_images(Vec::new())?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn image_count(&self) -> usize {
        self.pipeline.current_images().len()
    }

    /// Names of the current image set, in order.
    pub fn image_names(&self) -> Vec<String> {
        self.pipeline
            .current_images()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Load the watermark applied by `run_watermark`.
    ///
    /// Fails, keeping any previous watermark, when the bytes do not decode.
    pub fn set_watermark(&mut self, name: String, bytes: Vec<u8>) -> Result<(), JsValue> {
        self.load_watermark(ImageAsset::new(name, bytes))?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn has_watermark(&self) -> bool {
        self.watermark.is_some()
    }

    /// Crop the current image set.
    ///
    /// `params` is `{ top, bottom, left, right }`; missing margins are 0.
    /// `on_progress` receives `(current, total, message)` as each image starts.
    pub fn run_crop(
        &mut self,
        params: JsValue,
        on_progress: &js_sys::Function,
    ) -> Result<JsValue, JsValue> {
        let params: CropParams = from_js(params)?;
        let summary = self.crop(&params, &mut JsProgress(on_progress))?;
        to_js(&summary)
    }

    /// Watermark the current image set.
    ///
    /// `params` is `{ sizePercent, opacityPercent, position }` with position
    /// one of `center`, `top-left`, `top-right`, `bottom-left`, `bottom-right`.
    pub fn run_watermark(
        &mut self,
        params: JsValue,
        on_progress: &js_sys::Function,
    ) -> Result<JsValue, JsValue> {
        let params: WatermarkParams = from_js(params)?;
        let summary = self.stamp(&params, &mut JsProgress(on_progress))?;
        to_js(&summary)
    }

    /// Recompute the crop preview for the first image.
    ///
    /// Returns `undefined` when there is no image or the margins are invalid.
    pub fn preview_crop(&mut self, params: JsValue) -> Result<Option<JsPreview>, JsValue> {
        let params: CropParams = from_js(params)?;
        Ok(self.crop_preview(&params)?.map(JsPreview::from))
    }

    /// Recompute the watermark preview for the first image.
    ///
    /// Returns `undefined` until both an image and a watermark are loaded.
    pub fn preview_watermark(&mut self, params: JsValue) -> Result<Option<JsPreview>, JsValue> {
        let params: WatermarkParams = from_js(params)?;
        Ok(self.watermark_preview(&params)?.map(JsPreview::from))
    }

    /// `{ width, height }` the crop would give the first image.
    pub fn cropped_size(&mut self, params: JsValue) -> Result<JsValue, JsValue> {
        let params: CropParams = from_js(params)?;
        match self.crop_size(&params)? {
            Some(size) => to_js(&size),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Package the most recent batch's outputs as a ZIP archive.
    pub fn export_archive(&mut self) -> Result<JsArchive, JsValue> {
        let export = self.export(js_sys::Date::now() as u64)?;
        Ok(JsArchive::from(export))
    }

    /// Steps currently on offer: some of `crop`, `watermark`, `done`.
    pub fn next_steps(&self) -> Vec<String> {
        self.offered_steps()
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    /// Act on the user's choice of next step.
    ///
    /// Returns `true` when a stage was entered and `false` for `done`.
    pub fn choose_next(&mut self, step: &str) -> Result<bool, JsValue> {
        let step: NextStep = step.parse().map_err(BindingError::from)?;
        Ok(self.advance(step)?)
    }

    /// The active tool, if any.
    #[wasm_bindgen(getter)]
    pub fn active_stage(&self) -> Option<String> {
        self.pipeline.active_stage().map(|s| s.to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn is_finished(&self) -> bool {
        self.pipeline.is_finished()
    }

    /// Latest user-facing status line.
    #[wasm_bindgen(getter)]
    pub fn status_message(&self) -> String {
        self.status.clone()
    }
}

impl EditingSession {
    fn push_image(&mut self, asset: ImageAsset) -> Result<(), BindingError> {
        let mut images = self.pipeline.current_images().to_vec();
        images.push(asset);
        self.replace_images(images)
    }

    /// A new image set invalidates the last run; its outputs no longer
    /// describe the images the user is looking at.
    fn replace_images(&mut self, images: Vec<ImageAsset>) -> Result<(), BindingError> {
        self.pipeline.ingest(images)?;
        self.preview = None;
        self.last_result = None;
        self.status.clear();
        Ok(())
    }

    /// Keep `watermark` if it decodes; otherwise leave the previous one in place.
    fn load_watermark(&mut self, watermark: ImageAsset) -> Result<(), BindingError> {
        let raster = decode_image(&watermark.bytes).map_err(BatchError::InvalidWatermark)?;
        tracing::debug!(
            name = %watermark.name,
            width = raster.width,
            height = raster.height,
            "Watermark loaded"
        );
        self.watermark = Some(watermark);
        if let Some(source) = self.preview.as_mut() {
            source.clear_watermark();
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), BindingError> {
        if self.pipeline.is_finished() {
            return Err(SessionError::Finished.into());
        }
        Ok(())
    }

    fn crop(
        &mut self,
        params: &CropParams,
        observer: &mut impl ProgressObserver,
    ) -> Result<BatchSummary, BindingError> {
        self.ensure_open()?;
        let result = self
            .processor
            .run_crop(self.pipeline.current_images(), params, observer)?;
        self.pipeline.select_stage(Stage::Crop)?;
        Ok(self.record(result))
    }

    fn stamp(
        &mut self,
        params: &WatermarkParams,
        observer: &mut impl ProgressObserver,
    ) -> Result<BatchSummary, BindingError> {
        self.ensure_open()?;
        let result = self.processor.run_watermark(
            self.pipeline.current_images(),
            self.watermark.as_ref(),
            params,
            observer,
        )?;
        self.pipeline.select_stage(Stage::Watermark)?;
        Ok(self.record(result))
    }

    fn record(&mut self, result: BatchResult) -> BatchSummary {
        self.status = self.processor.state().status_message();
        let summary = BatchSummary::new(&result, self.status.clone());
        self.last_result = Some(result);
        summary
    }

    /// Decoded first image, built on first use. The watermark is attached
    /// separately so crop previews never depend on it.
    fn preview_source(&mut self) -> Result<Option<&mut PreviewSource>, BindingError> {
        if self.preview.is_none() {
            let Some(first) = self.pipeline.current_images().first() else {
                return Ok(None);
            };
            self.preview = Some(PreviewSource::new(first)?.with_max_edge(PREVIEW_MAX_EDGE));
        }
        Ok(self.preview.as_mut())
    }

    fn crop_preview(&mut self, params: &CropParams) -> Result<Option<Preview>, BindingError> {
        match self.preview_source()? {
            Some(source) => Ok(source.recompute_crop(params)?),
            None => Ok(None),
        }
    }

    fn watermark_preview(
        &mut self,
        params: &WatermarkParams,
    ) -> Result<Option<Preview>, BindingError> {
        let Some(watermark) = self.watermark.clone() else {
            return Ok(None);
        };
        let Some(source) = self.preview_source()? else {
            return Ok(None);
        };
        if !source.has_watermark() {
            source.set_watermark(&watermark)?;
        }
        Ok(source.recompute_watermark(params)?)
    }

    fn crop_size(&mut self, params: &CropParams) -> Result<Option<CroppedSize>, BindingError> {
        Ok(self.preview_source()?.map(|source| {
            let (width, height) = source.cropped_dimensions(params);
            CroppedSize { width, height }
        }))
    }

    fn export(&mut self, timestamp_ms: u64) -> Result<Export, BindingError> {
        let result = self.last_result.as_ref().ok_or(BindingError::NoResults)?;
        let export = export_stage(result.stage, &result.succeeded, timestamp_ms)?;
        self.status = DOWNLOAD_COMPLETE_MESSAGE.to_string();
        Ok(export)
    }

    fn offered_steps(&self) -> Vec<NextStep> {
        if self.pipeline.is_finished() {
            return Vec::new();
        }
        match &self.last_result {
            Some(result) => available_next_steps(Some(result.stage)),
            None => self.pipeline.available_next_steps(),
        }
    }

    fn advance(&mut self, step: NextStep) -> Result<bool, BindingError> {
        if let Some(result) = &self.last_result {
            if !available_next_steps(Some(result.stage)).contains(&step) {
                return Err(SessionError::StepUnavailable {
                    step,
                    last: Some(result.stage),
                }
                .into());
            }
            self.pipeline.complete_stage(result.stage, &result.succeeded)?;
            self.last_result = None;
            self.preview = None;
        }

        let entered = self.pipeline.choose(step)?.is_some();
        self.status.clear();
        Ok(entered)
    }
}
