//! Routing an input file to the conversion that suits its type.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::fallback::{convert_spreadsheet, CalcFitter, SheetFitter};
use crate::format::{pdf_name_for, InputKind};
use crate::office::{OfficeConverter, SofficeConverter};
use crate::raster::{ImageMagick, RasterConverter};
use crate::request::{ConversionRequest, ConversionResult};

/// Converts one file at a time to PDF.
///
/// | Input | Conversion |
/// |---|---|
/// | `.xls` `.xlsx` `.xlsm` | one page per sheet, generic conversion on failure |
/// | `.doc` `.docx` `.ppt` `.pptx` `.csv` | generic conversion |
/// | `.jpg` `.jpeg` `.png` `.webp` `.tif` `.tiff` `.bmp` | raster tool at the configured DPI |
/// | `.pdf` | copied unchanged |
pub struct Converter<O = SofficeConverter, R = ImageMagick, F = CalcFitter> {
    office: O,
    raster: R,
    fitter: Option<F>,
    image_dpi: u32,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let fitter = config
            .spreadsheet_fitting
            .then(|| CalcFitter::new(config.session.clone(), config.fit_strategy));
        Self {
            office: SofficeConverter::new(config.soffice_path.clone()),
            raster: ImageMagick::default(),
            fitter,
            image_dpi: config.image_dpi,
        }
    }
}

impl<O, R, F> Converter<O, R, F>
where
    O: OfficeConverter,
    R: RasterConverter,
    F: SheetFitter,
{
    /// Assembles a converter from its parts. Without a `fitter`, spreadsheets
    /// get generic conversion.
    pub fn from_parts(office: O, raster: R, fitter: Option<F>, image_dpi: u32) -> Self {
        Self {
            office,
            raster,
            fitter,
            image_dpi,
        }
    }

    /// Converts `request.input` to PDF.
    ///
    /// Without a working directory in the request, the PDF is produced in a
    /// scratch directory owned by the returned [`ConversionResult`]; on error
    /// that directory is removed before returning.
    pub async fn convert(&mut self, request: &ConversionRequest) -> Result<ConversionResult> {
        let kind = InputKind::detect(&request.input)?;
        if !tokio::fs::try_exists(&request.input).await? {
            return Err(ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", request.input.display()),
            )));
        }

        let (workdir, scratch) = match &request.workdir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                (dir.clone(), None)
            }
            None => {
                let scratch = tempfile::Builder::new().prefix("pagefit-").tempdir()?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
        };

        debug!(input = %request.input.display(), ?kind, workdir = %workdir.display(), "dispatching");
        let pdf = self.produce(kind, request, &workdir).await?;
        let result = ConversionResult::verified(pdf, scratch).await?;
        info!(input = %request.input.display(), pdf = %result.path().display(), "converted");
        Ok(result)
    }

    async fn produce(
        &mut self,
        kind: InputKind,
        request: &ConversionRequest,
        workdir: &Path,
    ) -> Result<PathBuf> {
        let input = request.input.as_path();
        match kind {
            InputKind::Pdf => pass_through(input, workdir).await,
            InputKind::Image => {
                let output = workdir.join(output_name(input)?);
                let dpi = request.image_dpi.unwrap_or(self.image_dpi);
                self.raster.convert(input, &output, dpi).await?;
                Ok(output)
            }
            InputKind::Document => self.office.convert(input, workdir).await,
            InputKind::Spreadsheet => match self.fitter.as_mut() {
                Some(fitter) => convert_spreadsheet(fitter, &self.office, input, workdir).await,
                None => self.office.convert(input, workdir).await,
            },
        }
    }
}

fn output_name(input: &Path) -> Result<String> {
    pdf_name_for(input).ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("{} has no file name", input.display()))
    })
}

/// Copies a PDF into `workdir`. When the copy would land on the input itself,
/// the input is returned untouched.
async fn pass_through(input: &Path, workdir: &Path) -> Result<PathBuf> {
    let name = input.file_name().ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("{} has no file name", input.display()))
    })?;
    let dest = workdir.join(name);
    if same_file(input, &dest).await {
        return Ok(input.to_path_buf());
    }
    tokio::fs::copy(input, &dest).await?;
    Ok(dest)
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
