//! LibreOffice sessions and one-page-per-sheet print setup.
//!
//! Everything here talks to LibreOffice through the pure-Rust URP client in
//! `libreoffice-urp`; no Python or UNO SDK is needed.
//!
//! # Architecture
//!
//! ```text
//! SessionManager ── acquire_session ──> AutomationSession
//!                                          └── CalcDocument (load / export / close)
//!                                                └── CalcSheet: SheetPrintSetup
//!                                                      └── normalize_sheet_for_one_page
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pagefit_libreoffice::{export_one_page_per_sheet, FitStrategy, SessionConfig, SessionManager};
//!
//! # async fn example() -> pagefit_libreoffice::Result<()> {
//! let mut manager = SessionManager::new(SessionConfig::default());
//! let mut session = manager.acquire_session().await?;
//! let report = export_one_page_per_sheet(
//!     &mut session,
//!     Path::new("report.xlsx"),
//!     Path::new("report.pdf"),
//!     FitStrategy::Automatic,
//! )
//! .await;
//! manager.release_session(session).await;
//! println!("{} sheets", report?.sheets.len());
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod fit;
pub mod layout;
pub mod session;
pub mod sheet;
pub mod uno_types;

pub use document::{file_url, CalcDocument};
pub use error::{Result, SessionError};
pub use fit::{export_one_page_per_sheet, FitReport, SheetReport};
pub use layout::{
    normalize_sheet_for_one_page, FitStrategy, NormalizationSkipped, PageStyleSpec, ScaleMode,
    SheetBounds, SheetPrintSetup, StepOutcome,
};
pub use session::{
    locate_soffice, AutomationSession, Endpoint, EngineProcess, RetryPolicy, SessionConfig,
    SessionManager, SessionState,
};
pub use sheet::CalcSheet;
pub use uno_types::StyleValue;
