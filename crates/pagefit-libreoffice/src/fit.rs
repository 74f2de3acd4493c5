//! Load, normalize every sheet, export, close.

use std::path::Path;

use tracing::{info, warn};

use crate::document::CalcDocument;
use crate::error::Result;
use crate::layout::{
    normalize_sheet_for_one_page, FitStrategy, NormalizationSkipped, PageStyleSpec,
    SheetPrintSetup,
};
use crate::session::AutomationSession;

/// Normalization result for one sheet.
#[derive(Debug, Clone)]
pub struct SheetReport {
    pub name: String,
    pub outcome: std::result::Result<PageStyleSpec, NormalizationSkipped>,
}

#[derive(Debug, Clone, Default)]
pub struct FitReport {
    pub sheets: Vec<SheetReport>,
}

impl FitReport {
    /// Sheets whose page style was left untouched.
    pub fn unchanged(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets.iter().filter(|s| s.outcome.is_err())
    }
}

/// Exports `input` to `output` with every sheet forced onto one page.
///
/// The document is closed on every path, discarding the page-setup changes.
pub async fn export_one_page_per_sheet(
    session: &mut AutomationSession,
    input: &Path,
    output: &Path,
    strategy: FitStrategy,
) -> Result<FitReport> {
    let mut doc = session.load_document(input).await?;
    let result = fit_and_export(&mut doc, output, strategy).await;
    if let Err(e) = doc.close().await {
        warn!(input = %input.display(), error = %e, "closing document failed");
    }
    result
}

async fn fit_and_export(
    doc: &mut CalcDocument<'_>,
    output: &Path,
    strategy: FitStrategy,
) -> Result<FitReport> {
    let page_styles = doc.page_styles().await?;
    let sheets = doc.sheet_oids().await?;

    let mut report = FitReport::default();
    for (index, oid) in sheets.into_iter().enumerate() {
        let mut sheet = doc.sheet(oid, index, page_styles.clone()).await?;
        let outcome = normalize_sheet_for_one_page(&mut sheet, strategy).await;
        match &outcome {
            Ok(spec) => info!(
                sheet = sheet.name(),
                scale = ?spec.scale,
                skipped = spec.skipped.len(),
                "sheet fitted to one page"
            ),
            Err(skipped) => warn!(%skipped, "sheet left unchanged"),
        }
        report.sheets.push(SheetReport {
            name: sheet.name().to_string(),
            outcome,
        });
    }

    if let Err(e) = doc.calculate_all().await {
        warn!(error = %e, "recalculation skipped");
    }
    doc.export_pdf(output).await?;
    Ok(report)
}
