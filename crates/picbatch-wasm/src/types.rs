//! JavaScript-facing result types.
//!
//! Binary payloads are exposed through `#[wasm_bindgen]` structs so they
//! cross as `Uint8Array`; plain summaries are serialized with
//! `serde-wasm-bindgen` into ordinary objects.

use picbatch_core::{BatchResult, Export, Preview};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// A rendered preview image.
#[wasm_bindgen]
pub struct JsPreview {
    width: u32,
    height: u32,
    png: Vec<u8>,
}

#[wasm_bindgen]
impl JsPreview {
    /// Output width before display scaling
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output height before display scaling
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// PNG bytes for an `<img>` element.
    ///
    /// Note: This creates a copy in JavaScript memory.
    pub fn png(&self) -> Vec<u8> {
        self.png.clone()
    }
}

impl From<Preview> for JsPreview {
    fn from(preview: Preview) -> Self {
        Self {
            width: preview.width,
            height: preview.height,
            png: preview.png,
        }
    }
}

/// A finished ZIP archive ready for download.
#[wasm_bindgen]
pub struct JsArchive {
    file_name: String,
    bytes: Vec<u8>,
    entries: usize,
}

#[wasm_bindgen]
impl JsArchive {
    /// Suggested download name, e.g. `cropped_images_1700000000000.zip`
    #[wasm_bindgen(getter)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    /// Number of images in the archive
    #[wasm_bindgen(getter)]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// The archive bytes. Note: This creates a copy.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl From<Export> for JsArchive {
    fn from(export: Export) -> Self {
        Self {
            file_name: export.file_name,
            bytes: export.bytes,
            entries: export.entries,
        }
    }
}

/// Plain summary of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub stage: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailureSummary>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub name: String,
    pub reason: String,
}

impl BatchSummary {
    pub(crate) fn new(result: &BatchResult, status: String) -> Self {
        Self {
            stage: result.stage.to_string(),
            succeeded: result.succeeded.iter().map(|a| a.name.clone()).collect(),
            failed: result
                .failed
                .iter()
                .map(|f| FailureSummary {
                    name: f.name.clone(),
                    reason: f.reason.to_string(),
                })
                .collect(),
            status,
        }
    }
}

/// Output size a crop would produce; negative when the margins overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CroppedSize {
    pub width: i64,
    pub height: i64,
}
