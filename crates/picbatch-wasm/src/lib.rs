//! picbatch WASM - WebAssembly bindings for picbatch
//!
//! This crate exposes the picbatch-core pipeline to JavaScript/TypeScript
//! through a single [`EditingSession`] handle.
//!
//! # Module Structure
//!
//! - `session` - The editing session: batches, previews, export, next steps
//! - `types` - WASM-compatible result types
//! - `logging` - `tracing` output routed to the browser console
//!
//! # Usage
//!
//! ```typescript
//! import init, { EditingSession, version } from '@picbatch/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//! console.log(`picbatch ${version()}`);
//!
//! const session = new EditingSession();
//! session.add_image(file.name, new Uint8Array(await file.arrayBuffer()));
//! ```

use wasm_bindgen::prelude::*;

mod logging;
mod session;
mod types;

pub use session::{EditingSession, PREVIEW_MAX_EDGE};
pub use types::{BatchSummary, CroppedSize, FailureSummary, JsArchive, JsPreview};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "picbatch ready");
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
