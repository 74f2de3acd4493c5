//! Generic office conversion through `soffice --convert-to`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use pagefit_libreoffice::locate_soffice;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::format::InputKind;

/// Flags passed before `--convert-to`.
pub const BATCH_FLAGS: &[&str] = &["--headless", "--norestore", "--nolockcheck"];

/// Converts an office document to PDF without any page fitting.
#[allow(async_fn_in_trait)]
pub trait OfficeConverter {
    /// Writes a PDF for `input` into `outdir` and returns its path.
    async fn convert(&self, input: &Path, outdir: &Path) -> Result<PathBuf>;
}

/// Runs LibreOffice in batch mode, one process per file.
#[derive(Debug, Clone, Default)]
pub struct SofficeConverter {
    soffice_path: Option<PathBuf>,
}

impl SofficeConverter {
    pub fn new(soffice_path: Option<PathBuf>) -> Self {
        Self { soffice_path }
    }

    /// `--convert-to` target: spreadsheets go through the Calc PDF filter.
    pub fn target_format(input: &Path) -> &'static str {
        match InputKind::from_path(input) {
            Some(InputKind::Spreadsheet) => "pdf:calc_pdf_Export",
            _ => "pdf",
        }
    }

    pub fn command_args(input: &Path, outdir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = BATCH_FLAGS.iter().map(OsString::from).collect();
        args.push("--convert-to".into());
        args.push(Self::target_format(input).into());
        args.push("--outdir".into());
        args.push(outdir.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }
}

impl OfficeConverter for SofficeConverter {
    async fn convert(&self, input: &Path, outdir: &Path) -> Result<PathBuf> {
        let program = locate_soffice(self.soffice_path.as_deref())?;
        info!(input = %input.display(), program = %program.display(), "converting with soffice");

        let output = Command::new(&program)
            .args(Self::command_args(input, outdir))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConvertError::ToolNotFound(program.display().to_string())
                } else {
                    ConvertError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::ExportFailed(format!(
                "soffice exited with {} for {}: {}",
                output.status,
                input.display(),
                stderr.trim()
            )));
        }
        find_output(input, outdir).await
    }
}

/// The PDF the converter produced for `input` in `outdir`.
///
/// Looks for `<stem>.pdf`, then any `<stem>*.pdf`. A PDF under some other
/// name is reported as [`ConvertError::ExportFailed`]; no PDF at all as
/// [`ConvertError::OutputNotFound`].
pub async fn find_output(input: &Path, outdir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ConvertError::OutputNotFound(format!("{} has no file name", input.display()))
        })?;

    let expected = outdir.join(format!("{stem}.pdf"));
    if tokio::fs::try_exists(&expected).await? {
        return Ok(expected);
    }

    let mut prefixed = Vec::new();
    let mut unexpected = Vec::new();
    let mut entries = tokio::fs::read_dir(outdir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            continue;
        }
        if name.starts_with(&stem) {
            prefixed.push(entry.path());
        } else {
            unexpected.push(name);
        }
    }

    prefixed.sort();
    if let Some(found) = prefixed.into_iter().next() {
        debug!(expected = %expected.display(), found = %found.display(), "matched output by prefix");
        return Ok(found);
    }

    if !unexpected.is_empty() {
        unexpected.sort();
        return Err(ConvertError::ExportFailed(format!(
            "expected {stem}.pdf in {} but the converter produced {}",
            outdir.display(),
            unexpected.join(", ")
        )));
    }
    Err(ConvertError::OutputNotFound(format!(
        "the converter produced no PDF for {} in {}",
        input.display(),
        outdir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_args_for_spreadsheet() {
        let args = SofficeConverter::command_args(Path::new("/in/Q1.XLSX"), Path::new("/out"));
        assert_eq!(
            args,
            vec![
                OsString::from("--headless"),
                "--norestore".into(),
                "--nolockcheck".into(),
                "--convert-to".into(),
                "pdf:calc_pdf_Export".into(),
                "--outdir".into(),
                "/out".into(),
                "/in/Q1.XLSX".into(),
            ]
        );
    }

    #[test]
    fn test_target_format_for_documents() {
        assert_eq!(SofficeConverter::target_format(Path::new("memo.docx")), "pdf");
        assert_eq!(SofficeConverter::target_format(Path::new("data.csv")), "pdf");
        assert_eq!(SofficeConverter::target_format(Path::new("deck.ppt")), "pdf");
    }

    #[tokio::test]
    async fn test_find_output_exact_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("report-1.pdf"), b"%PDF").unwrap();

        let found = find_output(Path::new("/in/report.xlsx"), dir.path()).await.unwrap();
        assert_eq!(found, dir.path().join("report.pdf"));
    }

    #[tokio::test]
    async fn test_find_output_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report_Sheet1.pdf"), b"%PDF").unwrap();

        let found = find_output(Path::new("report.xlsx"), dir.path()).await.unwrap();
        assert_eq!(found, dir.path().join("report_Sheet1.pdf"));
    }

    #[tokio::test]
    async fn test_find_output_wrong_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("untitled.pdf"), b"%PDF").unwrap();

        match find_output(Path::new("report.xlsx"), dir.path()).await {
            Err(ConvertError::ExportFailed(detail)) => {
                assert!(detail.contains("untitled.pdf"), "{detail}")
            }
            other => panic!("expected ExportFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_output_nothing_produced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.log"), b"warning").unwrap();

        assert!(matches!(
            find_output(Path::new("report.xlsx"), dir.path()).await,
            Err(ConvertError::OutputNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_soffice_override() {
        let dir = tempfile::tempdir().unwrap();
        let converter = SofficeConverter::new(Some(dir.path().join("no-such-soffice")));
        let input = dir.path().join("memo.docx");
        std::fs::write(&input, b"not really a document").unwrap();

        assert!(matches!(
            converter.convert(&input, dir.path()).await,
            Err(ConvertError::ToolNotFound(_))
        ));
    }
}
