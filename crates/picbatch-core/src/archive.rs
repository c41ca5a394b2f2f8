//! ZIP packaging of batch outputs.
//!
//! Outputs are renamed with their stage suffix (`photo.jpg` becomes
//! `photo_cropped.jpg`), placed in a folder named after the stage's purpose
//! and written into a single in-memory archive. A failed export leaves the
//! processed assets untouched so it can be retried.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use bytes::Bytes;
use thiserror::Error;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::{ProcessedAsset, Stage};

/// Extension assumed for names that do not carry one.
pub const DEFAULT_EXTENSION: &str = "png";

/// Status line shown once an archive has been handed over.
pub const DOWNLOAD_COMPLETE_MESSAGE: &str = "Download complete!";

/// Status line shown while an archive is being built.
pub const PACKING_MESSAGE: &str = "Creating zip file...";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("There are no processed images to export")]
    NothingToExport,

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("Failed to write ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive data: {0}")]
    Io(#[from] std::io::Error),
}

/// One file to place in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Folder inside the archive; empty for the archive root
    pub folder: String,
    pub name: String,
    pub bytes: Bytes,
}

impl ArchiveEntry {
    /// Path of the entry inside the archive.
    pub fn path(&self) -> String {
        if self.folder.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.folder.trim_end_matches('/'), self.name)
        }
    }
}

/// A finished archive plus the suggested download name.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entries: usize,
}

/// Split a file name at its last dot.
///
/// Names without a usable extension (no dot, a leading dot only, or a
/// trailing dot) return `None` for the extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(i) if i + 1 == name.len() => (&name[..i], None),
        Some(i) => (&name[..i], Some(&name[i + 1..])),
    }
}

/// Name an output after its input and stage: `foo.png` -> `foo_cropped.png`.
///
/// Inputs without an extension get [`DEFAULT_EXTENSION`], matching the PNG payload.
pub fn output_name(name: &str, stage: Stage) -> String {
    let (base, ext) = split_extension(name);
    format!(
        "{base}{}.{}",
        stage.suffix(),
        ext.unwrap_or(DEFAULT_EXTENSION)
    )
}

/// Suggested download name: `<purpose>_<unix-timestamp-ms>.zip`.
pub fn archive_file_name(stage: Stage, timestamp_ms: u64) -> String {
    format!("{}_{timestamp_ms}.zip", stage.purpose())
}

/// Reduce a name to its last path component so entries cannot escape their folder.
fn sanitize_entry_name(name: &str, fallback: &str) -> String {
    name.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Write entries into a ZIP archive, in order.
///
/// # Errors
///
/// Returns `ArchiveError::DuplicateEntry` if two entries resolve to the same
/// path; callers are expected to supply unique names.
pub fn pack(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in entries {
        let path = entry.path();
        if !seen.insert(path.clone()) {
            return Err(ArchiveError::DuplicateEntry(path));
        }

        zip.start_file(path.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
    }

    let buffer = zip.finish()?.into_inner();
    tracing::debug!(entries = entries.len(), bytes = buffer.len(), "Packed archive");
    Ok(buffer)
}

/// Build the download archive for one stage's outputs.
pub fn export_stage(
    stage: Stage,
    outputs: &[ProcessedAsset],
    timestamp_ms: u64,
) -> Result<Export, ArchiveError> {
    if outputs.is_empty() {
        return Err(ArchiveError::NothingToExport);
    }

    let entries: Vec<_> = outputs
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let name = sanitize_entry_name(&asset.name, &format!("image_{}", i + 1));
            ArchiveEntry {
                folder: stage.purpose().to_string(),
                name: output_name(&name, stage),
                bytes: asset.bytes.clone(),
            }
        })
        .collect();

    let bytes = pack(&entries)?;
    let file_name = archive_file_name(stage, timestamp_ms);
    tracing::info!(stage = %stage, file = %file_name, entries = entries.len(), "Archive ready");

    Ok(Export {
        file_name,
        bytes,
        entries: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    fn asset(name: &str, data: &[u8]) -> ProcessedAsset {
        ProcessedAsset::new(name, data.to_vec())
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("foo.png", Stage::Crop), "foo_cropped.png");
        assert_eq!(output_name("foo.jpg", Stage::Watermark), "foo_watermarked.jpg");
        assert_eq!(output_name("my.photo.jpeg", Stage::Crop), "my.photo_cropped.jpeg");
    }

    #[test]
    fn test_output_name_without_extension() {
        assert_eq!(output_name("scan", Stage::Crop), "scan_cropped.png");
        assert_eq!(output_name(".hidden", Stage::Crop), ".hidden_cropped.png");
        assert_eq!(output_name("trailing.", Stage::Watermark), "trailing_watermarked.png");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.b.c"), ("a.b", Some("c")));
        assert_eq!(split_extension("plain"), ("plain", None));
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name(Stage::Crop, 1700000000123),
            "cropped_images_1700000000123.zip"
        );
        assert_eq!(
            archive_file_name(Stage::Watermark, 5),
            "watermarked_images_5.zip"
        );
    }

    #[test]
    fn test_sanitize_entry_name() {
        assert_eq!(sanitize_entry_name("../../etc/passwd", "fallback"), "passwd");
        assert_eq!(sanitize_entry_name("C:\\pics\\cat.png", "fallback"), "cat.png");
        assert_eq!(sanitize_entry_name("image.png", "fallback"), "image.png");
        assert_eq!(sanitize_entry_name("", "fallback"), "fallback");
        assert_eq!(sanitize_entry_name("..", "fallback"), "fallback");
        assert_eq!(sanitize_entry_name("dir/", "fallback"), "fallback");
    }

    #[test]
    fn test_pack_preserves_order_and_content() {
        let entries = vec![
            ArchiveEntry {
                folder: "out".into(),
                name: "b.png".into(),
                bytes: Bytes::from_static(b"second"),
            },
            ArchiveEntry {
                folder: String::new(),
                name: "a.png".into(),
                bytes: Bytes::from_static(b"first"),
            },
        ];
        let zip_bytes = pack(&entries).unwrap();
        let read = read_entries(&zip_bytes);

        assert_eq!(
            read,
            vec![
                ("out/b.png".to_string(), b"second".to_vec()),
                ("a.png".to_string(), b"first".to_vec()),
            ]
        );
    }

    #[test]
    fn test_pack_rejects_duplicates() {
        let entry = ArchiveEntry {
            folder: "x".into(),
            name: "same.png".into(),
            bytes: Bytes::new(),
        };
        let result = pack(&[entry.clone(), entry]);
        assert!(matches!(result, Err(ArchiveError::DuplicateEntry(p)) if p == "x/same.png"));
    }

    #[test]
    fn test_pack_empty_is_valid_archive() {
        let zip_bytes = pack(&[]).unwrap();
        assert!(read_entries(&zip_bytes).is_empty());
    }

    #[test]
    fn test_export_stage_names_and_count() {
        let outputs = vec![asset("a.png", b"1"), asset("b.jpg", b"2"), asset("c", b"3")];
        let export = export_stage(Stage::Watermark, &outputs, 42).unwrap();

        assert_eq!(export.file_name, "watermarked_images_42.zip");
        assert_eq!(export.entries, outputs.len());

        let names: Vec<_> = read_entries(&export.bytes)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "watermarked_images/a_watermarked.png",
                "watermarked_images/b_watermarked.jpg",
                "watermarked_images/c_watermarked.png",
            ]
        );
    }

    #[test]
    fn test_export_same_base_different_extension_do_not_collide() {
        let outputs = vec![asset("x.png", b"1"), asset("x.jpg", b"2")];
        let export = export_stage(Stage::Crop, &outputs, 1).unwrap();
        assert_eq!(export.entries, 2);
    }

    #[test]
    fn test_export_duplicate_names_error_and_retry() {
        let outputs = vec![asset("x.png", b"1"), asset("dir/x.png", b"2")];
        assert!(matches!(
            export_stage(Stage::Crop, &outputs, 1),
            Err(ArchiveError::DuplicateEntry(_))
        ));
        // Outputs are untouched and can be exported again once fixed
        let retry = export_stage(Stage::Crop, &outputs[..1], 2).unwrap();
        assert_eq!(retry.entries, 1);
    }

    #[test]
    fn test_export_nothing() {
        assert!(matches!(
            export_stage(Stage::Crop, &[], 0),
            Err(ArchiveError::NothingToExport)
        ));
    }
}
