//! Routes `tracing` output to the browser console.
//!
//! Each formatted event is buffered and written with a single console call
//! when the writer is dropped, so one event never spans several console
//! entries. Errors and warnings go to `console.error` / `console.warn`.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

/// Install the console subscriber. Later calls are no-ops.
pub(crate) fn init() {
    let result = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .try_init();

    if result.is_err() {
        tracing::debug!("Console logging already initialized");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(*meta.level())
    }
}

pub(crate) struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
}

impl ConsoleWriter {
    fn new(level: Level) -> Self {
        Self {
            level,
            buffer: Vec::new(),
        }
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let Some(line) = console_line(&self.buffer) else {
            return;
        };
        let line = JsValue::from_str(&line);
        match self.level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            _ => web_sys::console::log_1(&line),
        }
    }
}

/// Text for one console entry, without the formatter's trailing newline.
fn console_line(buffer: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buffer);
    let text = text.trim_end_matches(|c: char| c == '\r' || c == '\n');
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_line_strips_newline() {
        assert_eq!(
            console_line(b" INFO Batch finished\n").as_deref(),
            Some(" INFO Batch finished")
        );
    }

    #[test]
    fn test_console_line_skips_empty() {
        assert_eq!(console_line(b""), None);
        assert_eq!(console_line(b"\n"), None);
    }

    #[test]
    fn test_console_line_keeps_inner_newlines() {
        assert_eq!(console_line(b"a\nb\n").as_deref(), Some("a\nb"));
    }
}
