//! Input classification by file extension.

use std::path::Path;

use crate::error::{ConvertError, Result};

/// How an input file is turned into a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// `.xls`, `.xlsx`, `.xlsm`: one landscape page per sheet.
    Spreadsheet,
    /// `.doc`, `.docx`, `.ppt`, `.pptx`, `.csv`: generic office conversion.
    Document,
    /// Raster images, converted at a fixed DPI.
    Image,
    /// Copied through unchanged.
    Pdf,
}

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["doc", "docx", "ppt", "pptx", "csv"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

impl InputKind {
    /// Case-insensitive, without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();
        if SPREADSHEET_EXTENSIONS.contains(&ext) {
            Some(InputKind::Spreadsheet)
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Some(InputKind::Document)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(InputKind::Image)
        } else if ext == "pdf" {
            Some(InputKind::Pdf)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Like [`from_path`](Self::from_path), failing with
    /// [`ConvertError::UnsupportedFormat`].
    pub fn detect(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| {
            let suffix = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| "(no extension)".to_string());
            ConvertError::UnsupportedFormat(format!("{suffix} ({})", path.display()))
        })
    }
}

/// `<stem>.pdf` for `input`, or None when it has no file name.
pub fn pdf_name_for(input: &Path) -> Option<String> {
    input
        .file_stem()
        .map(|stem| format!("{}.pdf", stem.to_string_lossy()))
}

/// Whether `path` has an extension this crate converts.
pub fn is_supported(path: &Path) -> bool {
    InputKind::from_path(path).is_some()
}
