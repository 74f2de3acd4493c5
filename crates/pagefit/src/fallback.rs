//! Spreadsheet conversion: one page per sheet, or generic conversion when
//! that fails.

use std::path::{Path, PathBuf};

use pagefit_libreoffice::{
    export_one_page_per_sheet, FitStrategy, SessionConfig, SessionManager, SessionState,
};
use tracing::{debug, info, warn};

use crate::error::{ConvertError, Result};
use crate::format::pdf_name_for;
use crate::office::OfficeConverter;
use crate::orientation::correct_orientation;

/// Exports a spreadsheet with every sheet fitted onto one landscape page.
#[allow(async_fn_in_trait)]
pub trait SheetFitter {
    async fn fit(&mut self, input: &Path, output: &Path) -> Result<()>;
}

/// [`SheetFitter`] backed by a LibreOffice automation session.
///
/// A session is acquired and released around every file, so an engine this
/// fitter launched is shut down before generic conversion runs.
pub struct CalcFitter {
    manager: SessionManager,
    strategy: FitStrategy,
}

impl CalcFitter {
    pub fn new(session: SessionConfig, strategy: FitStrategy) -> Self {
        Self {
            manager: SessionManager::new(session),
            strategy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.manager.state()
    }
}

impl SheetFitter for CalcFitter {
    async fn fit(&mut self, input: &Path, output: &Path) -> Result<()> {
        let mut session = self.manager.acquire_session().await?;
        let exported = export_one_page_per_sheet(&mut session, input, output, self.strategy).await;
        self.manager.release_session(session).await;

        let report = exported?;
        let unchanged = report.unchanged().count();
        info!(
            input = %input.display(),
            sheets = report.sheets.len(),
            unchanged,
            "one page per sheet"
        );
        correct_orientation(output).await;
        Ok(())
    }
}

/// Runs `fitter`, falling back to `office` on any failure.
///
/// The fitter's error is logged and dropped; the caller sees either the
/// fitted PDF or the outcome of generic conversion.
pub async fn convert_spreadsheet<F, O>(
    fitter: &mut F,
    office: &O,
    input: &Path,
    outdir: &Path,
) -> Result<PathBuf>
where
    F: SheetFitter,
    O: OfficeConverter,
{
    let name = pdf_name_for(input).ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("{} has no file name", input.display()))
    })?;
    let target = outdir.join(name);

    match fitter.fit(input, &target).await {
        Ok(()) => return Ok(target),
        Err(e) => warn!(
            input = %input.display(),
            error = %e,
            "one-page-per-sheet export failed, using generic conversion"
        ),
    }

    match tokio::fs::remove_file(&target).await {
        Ok(()) => debug!(path = %target.display(), "removed partial export"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %target.display(), error = %e, "could not remove partial export"),
    }
    office.convert(input, outdir).await
}
