//! ImageMagick invocation against stand-in executables.
#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use pagefit::{ConversionRequest, ConvertError, Converter, ImageMagick, RasterConverter};
use pretty_assertions::assert_eq;

/// A script that records its arguments to `args.txt` and writes its last
/// argument as a PDF.
fn fake_convert(dir: &Path, name: &str) -> PathBuf {
    let script = dir.join(name);
    let log = dir.join("args.txt");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\nprintf '%%PDF-1.4' > \"$last\"\n",
            log.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_second_form_used_when_first_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let magick = fake_convert(dir.path(), "magick");
    let tool = ImageMagick::with_forms(vec![
        vec![dir.path().join("convert").into_os_string()],
        vec![magick.into_os_string(), OsString::from("convert")],
    ]);

    let input = dir.path().join("photo.png");
    let output = dir.path().join("photo.pdf");
    tool.convert(&input, &output, 150).await.unwrap();

    assert_eq!(
        recorded_args(dir.path()),
        vec![
            "convert".to_string(),
            input.display().to_string(),
            "-units".to_string(),
            "PixelsPerInch".to_string(),
            "-density".to_string(),
            "150".to_string(),
            output.display().to_string(),
        ]
    );
    assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn test_png_converted_at_200_dpi_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let convert = fake_convert(dir.path(), "convert");
    let input = dir.path().join("photo.png");
    std::fs::write(&input, b"\x89PNG").unwrap();

    let tool = ImageMagick::with_forms(vec![vec![convert.into_os_string()]]);
    let mut converter = Converter::<pagefit::SofficeConverter, _, pagefit::CalcFitter>::from_parts(
        pagefit::SofficeConverter::default(),
        tool,
        None,
        pagefit::DEFAULT_IMAGE_DPI,
    );
    let result = converter.convert(&ConversionRequest::new(&input)).await.unwrap();

    let args = recorded_args(dir.path());
    assert_eq!(args[4], "200");
    assert_eq!(result.path().file_name().unwrap(), "photo.pdf");
}

#[tokio::test]
async fn test_failing_tool_is_export_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("convert");
    std::fs::write(&script, "#!/bin/sh\necho 'no decode delegate' >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let tool = ImageMagick::with_forms(vec![vec![script.into_os_string()]]);
    let err = tool
        .convert(&dir.path().join("a.webp"), &dir.path().join("a.pdf"), 200)
        .await
        .unwrap_err();

    match err {
        ConvertError::ExportFailed(detail) => assert!(detail.contains("no decode delegate"), "{detail}"),
        other => panic!("expected ExportFailed, got {other}"),
    }
}

#[tokio::test]
async fn test_tool_that_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("convert");
    std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let tool = ImageMagick::with_forms(vec![vec![script.into_os_string()]]);
    let err = tool
        .convert(&dir.path().join("a.bmp"), &dir.path().join("a.pdf"), 200)
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::OutputNotFound(_)), "{err}");
}
