//! Raster image to PDF through ImageMagick.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};

/// Converts one raster image to a single-page PDF.
#[allow(async_fn_in_trait)]
pub trait RasterConverter {
    async fn convert(&self, input: &Path, output: &Path, dpi: u32) -> Result<()>;
}

/// ImageMagick, tried as `convert` and then as `magick convert`.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    forms: Vec<Vec<OsString>>,
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self {
            forms: vec![
                vec![OsString::from("convert")],
                vec![OsString::from("magick"), OsString::from("convert")],
            ],
        }
    }
}

impl ImageMagick {
    /// Command prefixes tried in order until one can be spawned.
    pub fn with_forms(forms: Vec<Vec<OsString>>) -> Self {
        Self { forms }
    }

    pub fn command_args(input: &Path, output: &Path, dpi: u32) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-units".into(),
            "PixelsPerInch".into(),
            "-density".into(),
            dpi.to_string().into(),
            output.as_os_str().to_owned(),
        ]
    }

    fn describe_forms(&self) -> String {
        self.forms
            .iter()
            .map(|form| {
                form.iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl RasterConverter for ImageMagick {
    async fn convert(&self, input: &Path, output: &Path, dpi: u32) -> Result<()> {
        for form in &self.forms {
            let Some((program, prefix)) = form.split_first() else {
                continue;
            };
            let run = Command::new(program)
                .args(prefix)
                .args(Self::command_args(input, output, dpi))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await;

            let out = match run {
                Ok(out) => out,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(program = %program.to_string_lossy(), "raster tool not installed");
                    continue;
                }
                Err(e) => return Err(ConvertError::Io(e)),
            };

            if !out.status.success() {
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(ConvertError::ExportFailed(format!(
                    "{} exited with {} for {}: {}",
                    program.to_string_lossy(),
                    out.status,
                    input.display(),
                    stderr.trim()
                )));
            }
            if !tokio::fs::try_exists(output).await? {
                return Err(ConvertError::OutputNotFound(format!(
                    "{} did not write {}",
                    program.to_string_lossy(),
                    output.display()
                )));
            }
            info!(input = %input.display(), dpi, "converted image");
            return Ok(());
        }
        Err(ConvertError::ToolNotFound(format!(
            "ImageMagick (tried {})",
            self.describe_forms()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_args() {
        let args = ImageMagick::command_args(Path::new("in/photo.png"), Path::new("out/photo.pdf"), 200);
        assert_eq!(
            args,
            vec![
                OsString::from("in/photo.png"),
                "-units".into(),
                "PixelsPerInch".into(),
                "-density".into(),
                "200".into(),
                "out/photo.pdf".into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_form_available() {
        let dir = tempfile::tempdir().unwrap();
        let magick = ImageMagick::with_forms(vec![
            vec![dir.path().join("convert").into_os_string()],
            vec![dir.path().join("magick").into_os_string(), "convert".into()],
        ]);
        match magick
            .convert(&dir.path().join("a.png"), &dir.path().join("a.pdf"), 200)
            .await
        {
            Err(ConvertError::ToolNotFound(detail)) => {
                assert!(detail.contains("magick convert"), "{detail}")
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }
}
