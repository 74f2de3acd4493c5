//! Forcing a sheet onto one landscape page.
//!
//! [`normalize_sheet_for_one_page`] drives a [`SheetPrintSetup`] through a fixed
//! sequence of steps. Every step either applies or is skipped with a warning;
//! nothing here aborts a conversion.
//!
//! All lengths are in hundredths of a millimetre, the unit Calc uses for page
//! styles, column widths and row heights.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::uno_types::{props, StyleValue};

pub const DEFAULT_MARGIN: i32 = 500;
pub const A4_LANDSCAPE: PaperSize = PaperSize {
    width: 29_700,
    height: 21_000,
};
/// Floor for the printable width and height used by the manual scale.
pub const MIN_PRINTABLE_EXTENT: i64 = 100;
pub const MIN_SCALE: i16 = 10;
pub const MAX_SCALE: i16 = 100;

// ============================================================================
// Geometry
// ============================================================================

/// Inclusive, zero-based cell bounds of a sheet's printable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetBounds {
    pub start_row: i32,
    pub end_row: i32,
    pub start_col: i32,
    pub end_col: i32,
}

impl SheetBounds {
    pub fn is_empty(&self) -> bool {
        self.start_row > self.end_row || self.start_col > self.end_col
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<i32> {
        self.start_row..=self.end_row
    }

    pub fn columns(&self) -> std::ops::RangeInclusive<i32> {
        self.start_col..=self.end_col
    }
}

impl fmt::Display for SheetBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.start_row + 1,
            self.start_col + 1,
            self.end_row + 1,
            self.end_col + 1
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl Margins {
    pub const fn uniform(m: i32) -> Self {
        Self {
            top: m,
            bottom: m,
            left: m,
            right: m,
        }
    }
}

/// Summed width and height of the visible columns and rows of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: i64,
    pub height: i64,
}

/// Which scaling mechanism the page style ends up using.
///
/// A single enum so that automatic fit and a manual percentage can never be
/// reported as active together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Neither mechanism could be configured.
    Unchanged,
    FitToPages { wide: i16, tall: i16 },
    Percent(i16),
}

/// What normalization applied to one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyleSpec {
    pub print_area: Option<SheetBounds>,
    pub landscape: bool,
    pub paper: Option<PaperSize>,
    pub margins: Option<Margins>,
    pub scale: ScaleMode,
    pub centered: bool,
    pub grid_and_headers_suppressed: bool,
    pub skipped: Vec<SkippedStep>,
}

impl PageStyleSpec {
    fn empty() -> Self {
        Self {
            print_area: None,
            landscape: false,
            paper: None,
            margins: None,
            scale: ScaleMode::Unchanged,
            centered: false,
            grid_and_headers_suppressed: false,
            skipped: Vec::new(),
        }
    }

    fn touched_page_style(&self) -> bool {
        self.landscape
            || self.paper.is_some()
            || self.margins.is_some()
            || self.scale != ScaleMode::Unchanged
            || self.centered
            || self.grid_and_headers_suppressed
    }
}

// ============================================================================
// Strategy and steps
// ============================================================================

/// How the page style is made to fit one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStrategy {
    /// Fit to 1 page wide by 1 page tall, computed by the engine.
    #[default]
    Automatic,
    /// Automatic fit, then overridden by a percentage computed from column
    /// widths and row heights whenever that percentage is below 100.
    ComputedManual,
}

#[derive(Debug, Error)]
#[error("unknown fit strategy {0:?} (expected \"auto\" or \"manual\")")]
pub struct ParseFitStrategyError(String);

impl FromStr for FitStrategy {
    type Err = ParseFitStrategyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Ok(FitStrategy::Automatic),
            "manual" | "computed-manual" => Ok(FitStrategy::ComputedManual),
            _ => Err(ParseFitStrategyError(s.to_string())),
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FitStrategy::Automatic => "auto",
            FitStrategy::ComputedManual => "manual",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResetPageBreaks,
    UsedArea,
    TrimHidden,
    PrintArea,
    PrintTitles,
    Orientation,
    PaperSize,
    Margins,
    AutomaticFit,
    ManualScale,
    Centering,
    Suppression,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::ResetPageBreaks => "reset page breaks",
            Step::UsedArea => "used area",
            Step::TrimHidden => "trim hidden bands",
            Step::PrintArea => "print area",
            Step::PrintTitles => "print titles",
            Step::Orientation => "orientation",
            Step::PaperSize => "paper size",
            Step::Margins => "margins",
            Step::AutomaticFit => "automatic fit",
            Step::ManualScale => "manual scale",
            Step::Centering => "centering",
            Step::Suppression => "grid and header suppression",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(String),
}

impl From<Result<()>> for StepOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => StepOutcome::Applied,
            Err(e) => StepOutcome::Skipped(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStep {
    pub step: Step,
    pub reason: String,
}

/// Returned when not a single page-style change could be applied.
#[derive(Debug, Clone, Error)]
#[error("page setup of sheet {sheet:?} left unchanged ({} steps skipped)", .skipped.len())]
pub struct NormalizationSkipped {
    pub sheet: String,
    pub skipped: Vec<SkippedStep>,
}

// ============================================================================
// The sheet seam
// ============================================================================

/// Print-related operations on one sheet and its page style.
///
/// [`CalcSheet`](crate::sheet::CalcSheet) implements this over URP.
#[allow(async_fn_in_trait)]
pub trait SheetPrintSetup {
    fn name(&self) -> &str;

    async fn remove_manual_page_breaks(&mut self) -> Result<()>;

    /// Minimal range containing every used cell.
    async fn used_area(&mut self) -> Result<SheetBounds>;

    async fn column_visible(&mut self, col: i32) -> Result<bool>;
    async fn row_visible(&mut self, row: i32) -> Result<bool>;
    async fn column_width(&mut self, col: i32) -> Result<i32>;
    async fn row_height(&mut self, row: i32) -> Result<i32>;

    /// Clears every print area and makes `area` the only one.
    async fn replace_print_areas(&mut self, area: SheetBounds) -> Result<()>;

    /// Turns off repeated title rows and columns.
    async fn clear_print_titles(&mut self) -> Result<()>;

    async fn style_has(&mut self, name: &str) -> Result<bool>;
    async fn style_get(&mut self, name: &str) -> Result<StyleValue>;
    async fn style_set(&mut self, name: &str, value: StyleValue) -> Result<()>;
}

// ============================================================================
// Pure pieces
// ============================================================================

/// Percentage that shrinks `content` into the printable part of `paper`.
///
/// Always within `MIN_SCALE..=MAX_SCALE`; 100 when the content already fits or
/// has no extent.
pub fn manual_scale(content: Extent, paper: PaperSize, margins: Margins) -> i16 {
    if content.width <= 0 || content.height <= 0 {
        return MAX_SCALE;
    }
    let paper_w = i64::from(paper.width.max(paper.height));
    let paper_h = i64::from(paper.width.min(paper.height));
    let printable_w =
        (paper_w - i64::from(margins.left) - i64::from(margins.right)).max(MIN_PRINTABLE_EXTENT);
    let printable_h =
        (paper_h - i64::from(margins.top) - i64::from(margins.bottom)).max(MIN_PRINTABLE_EXTENT);

    let scale = (100 * printable_w / content.width).min(100 * printable_h / content.height);
    // Clamped into i16 range by construction.
    scale.clamp(i64::from(MIN_SCALE), i64::from(MAX_SCALE)) as i16
}

/// Moves the edges of `used` inward past hidden rows and columns.
///
/// Hidden rows and columns in the interior stay inside the result. Returns
/// `None` when every row or every column is hidden.
pub async fn trim_hidden_bounds<S: SheetPrintSetup>(
    sheet: &mut S,
    used: SheetBounds,
) -> Result<Option<SheetBounds>> {
    let mut b = used;

    while b.start_col <= b.end_col && !sheet.column_visible(b.start_col).await? {
        b.start_col += 1;
    }
    while b.end_col >= b.start_col && !sheet.column_visible(b.end_col).await? {
        b.end_col -= 1;
    }
    while b.start_row <= b.end_row && !sheet.row_visible(b.start_row).await? {
        b.start_row += 1;
    }
    while b.end_row >= b.start_row && !sheet.row_visible(b.end_row).await? {
        b.end_row -= 1;
    }

    Ok((!b.is_empty()).then_some(b))
}

/// Sums widths of visible columns and heights of visible rows in `bounds`.
///
/// Entries that cannot be queried count as zero.
pub async fn content_extent<S: SheetPrintSetup>(sheet: &mut S, bounds: SheetBounds) -> Extent {
    let mut extent = Extent::default();
    for col in bounds.columns() {
        match visible_length(sheet.column_visible(col).await, sheet, col, Axis::Column).await {
            Ok(w) => extent.width += w,
            Err(e) => debug!(col, error = %e, "column ignored in content width"),
        }
    }
    for row in bounds.rows() {
        match visible_length(sheet.row_visible(row).await, sheet, row, Axis::Row).await {
            Ok(h) => extent.height += h,
            Err(e) => debug!(row, error = %e, "row ignored in content height"),
        }
    }
    extent
}

#[derive(Clone, Copy)]
enum Axis {
    Column,
    Row,
}

async fn visible_length<S: SheetPrintSetup>(
    visible: Result<bool>,
    sheet: &mut S,
    index: i32,
    axis: Axis,
) -> Result<i64> {
    if !visible? {
        return Ok(0);
    }
    let len = match axis {
        Axis::Column => sheet.column_width(index).await?,
        Axis::Row => sheet.row_height(index).await?,
    };
    Ok(i64::from(len.max(0)))
}

// ============================================================================
// Normalizer
// ============================================================================

/// Reconfigures `sheet` so that it prints on exactly one landscape page.
///
/// Steps that fail are skipped and logged. The result is
/// [`NormalizationSkipped`] only when the page style was not changed at all.
pub async fn normalize_sheet_for_one_page<S: SheetPrintSetup>(
    sheet: &mut S,
    strategy: FitStrategy,
) -> std::result::Result<PageStyleSpec, NormalizationSkipped> {
    let mut n = Normalizer {
        sheet,
        spec: PageStyleSpec::empty(),
    };

    let outcome = n.sheet.remove_manual_page_breaks().await.into();
    n.note(Step::ResetPageBreaks, outcome);

    let area = n.print_area().await;
    n.spec.print_area = area;

    let outcome = n.set(props::IS_LANDSCAPE, StyleValue::Bool(true)).await.into();
    n.spec.landscape = n.note(Step::Orientation, outcome);

    match n.landscape_paper().await {
        Ok(paper) => {
            n.spec.paper = Some(paper);
            n.note(Step::PaperSize, StepOutcome::Applied);
        }
        Err(e) => {
            n.note(Step::PaperSize, StepOutcome::Skipped(e.to_string()));
        }
    }

    let margins = Margins::uniform(DEFAULT_MARGIN);
    let outcome = n
        .set_all(&[
            (props::TOP_MARGIN, StyleValue::Long(margins.top)),
            (props::BOTTOM_MARGIN, StyleValue::Long(margins.bottom)),
            (props::LEFT_MARGIN, StyleValue::Long(margins.left)),
            (props::RIGHT_MARGIN, StyleValue::Long(margins.right)),
        ])
        .await;
    if n.note(Step::Margins, outcome) {
        n.spec.margins = Some(margins);
    }

    let auto_fit = match n.apply_automatic_fit().await {
        Ok(()) => {
            n.spec.scale = ScaleMode::FitToPages { wide: 1, tall: 1 };
            n.note(Step::AutomaticFit, StepOutcome::Applied)
        }
        Err(e) => n.note(Step::AutomaticFit, StepOutcome::Skipped(e.to_string())),
    };
    if strategy == FitStrategy::ComputedManual || !auto_fit {
        n.apply_manual_scale(area).await;
    }

    let outcome = n
        .set_all(&[
            (props::CENTER_HORIZONTALLY, StyleValue::Bool(true)),
            (props::CENTER_VERTICALLY, StyleValue::Bool(true)),
        ])
        .await;
    n.spec.centered = n.note(Step::Centering, outcome);

    let outcome = n
        .set_all(&[
            (props::PRINT_GRID, StyleValue::Bool(false)),
            (props::PRINT_HEADERS, StyleValue::Bool(false)),
            (props::HEADER_IS_ON, StyleValue::Bool(false)),
            (props::FOOTER_IS_ON, StyleValue::Bool(false)),
        ])
        .await;
    n.spec.grid_and_headers_suppressed = n.note(Step::Suppression, outcome);

    if n.spec.touched_page_style() {
        Ok(n.spec)
    } else {
        Err(NormalizationSkipped {
            sheet: n.sheet.name().to_string(),
            skipped: n.spec.skipped,
        })
    }
}

struct Normalizer<'s, S> {
    sheet: &'s mut S,
    spec: PageStyleSpec,
}

impl<S: SheetPrintSetup> Normalizer<'_, S> {
    /// Records a step outcome; returns whether it applied.
    fn note(&mut self, step: Step, outcome: StepOutcome) -> bool {
        match outcome {
            StepOutcome::Applied => {
                debug!(sheet = self.sheet.name(), %step, "page setup step applied");
                true
            }
            StepOutcome::Skipped(reason) => {
                warn!(sheet = self.sheet.name(), %step, %reason, "page setup step skipped");
                self.spec.skipped.push(SkippedStep { step, reason });
                false
            }
        }
    }

    /// Used area, trimmed, installed as the only print area.
    async fn print_area(&mut self) -> Option<SheetBounds> {
        let used = match self.sheet.used_area().await {
            Ok(used) => used,
            Err(e) => {
                self.note(Step::UsedArea, StepOutcome::Skipped(e.to_string()));
                return None;
            }
        };

        let area = match trim_hidden_bounds(&mut *self.sheet, used).await {
            Ok(Some(trimmed)) => {
                if trimmed != used {
                    debug!(sheet = self.sheet.name(), %used, %trimmed, "trimmed hidden bands");
                }
                trimmed
            }
            Ok(None) => {
                let reason = format!("every row or column of {used} is hidden");
                self.note(Step::TrimHidden, StepOutcome::Skipped(reason));
                used
            }
            Err(e) => {
                self.note(Step::TrimHidden, StepOutcome::Skipped(e.to_string()));
                used
            }
        };

        let outcome = self.sheet.replace_print_areas(area).await.into();
        self.note(Step::PrintArea, outcome);
        let outcome = self.sheet.clear_print_titles().await.into();
        self.note(Step::PrintTitles, outcome);
        Some(area)
    }

    async fn set(&mut self, name: &'static str, value: StyleValue) -> Result<()> {
        if !self.sheet.style_has(name).await? {
            return Err(SessionError::OperationFailed(format!(
                "page style has no {name} property"
            )));
        }
        self.sheet.style_set(name, value).await
    }

    async fn get_i32(&mut self, name: &'static str) -> Result<i32> {
        if !self.sheet.style_has(name).await? {
            return Err(SessionError::OperationFailed(format!(
                "page style has no {name} property"
            )));
        }
        self.sheet.style_get(name).await?.as_i32().ok_or_else(|| {
            SessionError::OperationFailed(format!("{name} is not an integer"))
        })
    }

    /// Sets every property, continuing past failures.
    async fn set_all(&mut self, values: &[(&'static str, StyleValue)]) -> StepOutcome {
        let mut failures = Vec::new();
        for &(name, value) in values {
            if let Err(e) = self.set(name, value).await {
                failures.push(format!("{name}: {e}"));
            }
        }
        if failures.is_empty() {
            StepOutcome::Applied
        } else {
            StepOutcome::Skipped(failures.join("; "))
        }
    }

    /// Paper dimensions with width greater than height, swapping them if needed.
    async fn landscape_paper(&mut self) -> Result<PaperSize> {
        let width = self.get_i32(props::WIDTH).await?;
        let height = self.get_i32(props::HEIGHT).await?;
        if width >= height {
            return Ok(PaperSize { width, height });
        }
        self.set(props::WIDTH, StyleValue::Long(height)).await?;
        self.set(props::HEIGHT, StyleValue::Long(width)).await?;
        Ok(PaperSize {
            width: height,
            height: width,
        })
    }

    /// Fit to 1×1 pages after neutralising the percentage mechanisms.
    ///
    /// Nothing is enabled unless `PageScale` and `ScaleToPages` were reset first.
    async fn apply_automatic_fit(&mut self) -> Result<()> {
        for name in [props::SCALE_TO_PAGES_X, props::SCALE_TO_PAGES_Y] {
            if !self.sheet.style_has(name).await? {
                return Err(SessionError::OperationFailed(format!(
                    "page style has no {name} property"
                )));
            }
        }
        if self.sheet.style_has(props::PAGE_SCALE).await? {
            self.sheet
                .style_set(props::PAGE_SCALE, StyleValue::Short(MAX_SCALE))
                .await?;
        }
        if self.sheet.style_has(props::SCALE_TO_PAGES).await? {
            self.sheet
                .style_set(props::SCALE_TO_PAGES, StyleValue::Short(0))
                .await?;
        }

        self.sheet
            .style_set(props::SCALE_TO_PAGES_X, StyleValue::Short(1))
            .await?;
        if let Err(e) = self
            .sheet
            .style_set(props::SCALE_TO_PAGES_Y, StyleValue::Short(1))
            .await
        {
            if let Err(undo) = self
                .sheet
                .style_set(props::SCALE_TO_PAGES_X, StyleValue::Short(0))
                .await
            {
                debug!(error = %undo, "could not reset ScaleToPagesX");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Computes a percentage from the content extent and applies it when it
    /// is below 100, zeroing every automatic-fit property first.
    async fn apply_manual_scale(&mut self, area: Option<SheetBounds>) {
        let Some(area) = area else {
            self.note(
                Step::ManualScale,
                StepOutcome::Skipped("used area unknown".into()),
            );
            return;
        };

        let extent = content_extent(&mut *self.sheet, area).await;
        let paper = self.spec.paper.unwrap_or(A4_LANDSCAPE);
        let margins = self.spec.margins.unwrap_or(Margins::uniform(DEFAULT_MARGIN));
        let scale = manual_scale(extent, paper, margins);
        debug!(
            sheet = self.sheet.name(),
            width = extent.width,
            height = extent.height,
            scale,
            "computed manual scale"
        );

        if scale >= MAX_SCALE {
            return;
        }

        let result = self.override_with_percent(scale).await;
        if self.note(Step::ManualScale, result.into()) {
            self.spec.scale = ScaleMode::Percent(scale);
        }
    }

    async fn override_with_percent(&mut self, scale: i16) -> Result<()> {
        for name in [
            props::SCALE_TO_PAGES_X,
            props::SCALE_TO_PAGES_Y,
            props::SCALE_TO_PAGES,
        ] {
            if self.sheet.style_has(name).await? {
                self.sheet.style_set(name, StyleValue::Short(0)).await?;
            }
        }
        self.set(props::PAGE_SCALE, StyleValue::Short(scale)).await
    }
}
