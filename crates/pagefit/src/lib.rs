//! Convert office documents, images and PDFs to PDF, with every spreadsheet
//! sheet printed on exactly one landscape page.
//!
//! # Architecture
//!
//! ```text
//! Converter::convert(request)
//!   ├── .pdf          copy
//!   ├── images        RasterConverter (ImageMagick)
//!   ├── documents     OfficeConverter (soffice --convert-to)
//!   └── spreadsheets  convert_spreadsheet
//!                       ├── SheetFitter (LibreOffice session, then correct_orientation)
//!                       └── on any failure: OfficeConverter
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pagefit::{ConversionRequest, Converter, ConverterConfig};
//!
//! # async fn example() -> pagefit::Result<()> {
//! let mut converter = Converter::new(ConverterConfig::default());
//! let result = converter.convert(&ConversionRequest::new("report.xlsx")).await?;
//! result.persist(Path::new("out/report.pdf")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod format;
pub mod office;
pub mod orientation;
pub mod raster;
pub mod request;

pub use config::{ConverterConfig, DEFAULT_IMAGE_DPI};
pub use dispatch::Converter;
pub use error::{ConvertError, Result};
pub use fallback::{convert_spreadsheet, CalcFitter, SheetFitter};
pub use format::{is_supported, pdf_name_for, InputKind};
pub use office::{find_output, OfficeConverter, SofficeConverter};
pub use orientation::correct_orientation;
pub use raster::{ImageMagick, RasterConverter};
pub use request::{ConversionRequest, ConversionResult};

pub use pagefit_libreoffice::{Endpoint, FitStrategy, RetryPolicy, SessionConfig};
