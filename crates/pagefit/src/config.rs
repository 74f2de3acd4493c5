//! Converter configuration.

use std::path::PathBuf;

use pagefit_libreoffice::{FitStrategy, SessionConfig};

/// Resolution used for raster inputs when the request does not set one.
pub const DEFAULT_IMAGE_DPI: u32 = 200;

/// Configuration for [`Converter`](crate::Converter).
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// LibreOffice session used by the one-page-per-sheet path.
    pub session: SessionConfig,
    pub fit_strategy: FitStrategy,
    /// `soffice` used for generic batch conversion. If None, searches PATH
    /// and the usual install locations.
    pub soffice_path: Option<PathBuf>,
    pub image_dpi: u32,
    /// When false, spreadsheets skip page fitting and go straight to
    /// generic conversion.
    pub spreadsheet_fitting: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            fit_strategy: FitStrategy::default(),
            soffice_path: None,
            image_dpi: DEFAULT_IMAGE_DPI,
            spreadsheet_fitting: true,
        }
    }
}

impl ConverterConfig {
    /// Points both the session and the batch converter at `path`.
    pub fn with_soffice(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.session.soffice_path = Some(path.clone());
        self.soffice_path = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.image_dpi, 200);
        assert!(config.spreadsheet_fitting);
        assert_eq!(config.fit_strategy, FitStrategy::Automatic);
        assert!(config.soffice_path.is_none());
    }

    #[test]
    fn test_with_soffice_sets_both_paths() {
        let config = ConverterConfig::default().with_soffice("/opt/lo/program/soffice");
        assert_eq!(config.soffice_path, Some(PathBuf::from("/opt/lo/program/soffice")));
        assert_eq!(
            config.session.soffice_path,
            Some(PathBuf::from("/opt/lo/program/soffice"))
        );
    }
}
