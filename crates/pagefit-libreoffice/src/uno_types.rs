//! UNO structs and property names used by the print-setup code.
//!
//! These live here rather than in `libreoffice-urp` because they belong to the
//! spreadsheet API, not to the protocol.

use libreoffice_urp::{Type, UnoValue};

use crate::error::{Result, SessionError};
use crate::layout::SheetBounds;

// ============================================================================
// UNO Structs
// ============================================================================

/// `com.sun.star.table.CellRangeAddress`.
///
/// Wire format: Struct(Short, Long, Long, Long, Long)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRangeAddress {
    pub sheet: i16,
    pub start_column: i32,
    pub start_row: i32,
    pub end_column: i32,
    pub end_row: i32,
}

impl CellRangeAddress {
    pub fn from_bounds(sheet: i16, bounds: SheetBounds) -> Self {
        Self {
            sheet,
            start_column: bounds.start_col,
            start_row: bounds.start_row,
            end_column: bounds.end_col,
            end_row: bounds.end_row,
        }
    }

    pub fn bounds(&self) -> SheetBounds {
        SheetBounds {
            start_row: self.start_row,
            end_row: self.end_row,
            start_col: self.start_column,
            end_col: self.end_column,
        }
    }

    /// Convert to the URP wire representation.
    pub fn to_uno(&self) -> UnoValue {
        UnoValue::Struct(vec![
            UnoValue::Short(self.sheet),
            UnoValue::Long(self.start_column),
            UnoValue::Long(self.start_row),
            UnoValue::Long(self.end_column),
            UnoValue::Long(self.end_row),
        ])
    }

    pub fn from_uno(value: &UnoValue) -> Result<Self> {
        let members = match value.unwrap_any() {
            UnoValue::Struct(members) if members.len() == 5 => members,
            other => {
                return Err(SessionError::OperationFailed(format!(
                    "expected CellRangeAddress, got {other:?}"
                )))
            }
        };
        let long = |i: usize| -> Result<i32> {
            members[i]
                .as_integer()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| {
                    SessionError::OperationFailed(format!(
                        "CellRangeAddress member {i} is {:?}",
                        members[i]
                    ))
                })
        };
        let sheet = i16::try_from(long(0)?)
            .map_err(|_| SessionError::OperationFailed("sheet index out of range".into()))?;
        Ok(Self {
            sheet,
            start_column: long(1)?,
            start_row: long(2)?,
            end_column: long(3)?,
            end_row: long(4)?,
        })
    }
}

// ============================================================================
// Page style property values
// ============================================================================

/// A page-style property value of one of the types the normalizer touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleValue {
    Bool(bool),
    Short(i16),
    Long(i32),
}

impl StyleValue {
    /// The `any` passed to `setPropertyValue`.
    pub fn to_any(self) -> UnoValue {
        match self {
            StyleValue::Bool(b) => UnoValue::Bool(b).into_any(Type::boolean()),
            StyleValue::Short(n) => UnoValue::Short(n).into_any(Type::short()),
            StyleValue::Long(n) => UnoValue::Long(n).into_any(Type::long()),
        }
    }

    pub fn from_uno(value: &UnoValue) -> Result<Self> {
        match value.unwrap_any() {
            UnoValue::Bool(b) => Ok(StyleValue::Bool(*b)),
            UnoValue::Short(n) => Ok(StyleValue::Short(*n)),
            UnoValue::Long(n) => Ok(StyleValue::Long(*n)),
            other => Err(SessionError::OperationFailed(format!(
                "unsupported property value {other:?}"
            ))),
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            StyleValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i32(self) -> Option<i32> {
        match self {
            StyleValue::Short(n) => Some(i32::from(n)),
            StyleValue::Long(n) => Some(n),
            StyleValue::Bool(_) => None,
        }
    }
}

/// Property names of `com.sun.star.style.PageStyle` and the sheet objects.
pub mod props {
    pub const PAGE_STYLE: &str = "PageStyle";
    pub const IS_LANDSCAPE: &str = "IsLandscape";
    pub const WIDTH: &str = "Width";
    pub const HEIGHT: &str = "Height";
    pub const TOP_MARGIN: &str = "TopMargin";
    pub const BOTTOM_MARGIN: &str = "BottomMargin";
    pub const LEFT_MARGIN: &str = "LeftMargin";
    pub const RIGHT_MARGIN: &str = "RightMargin";
    pub const PAGE_SCALE: &str = "PageScale";
    pub const SCALE_TO_PAGES: &str = "ScaleToPages";
    pub const SCALE_TO_PAGES_X: &str = "ScaleToPagesX";
    pub const SCALE_TO_PAGES_Y: &str = "ScaleToPagesY";
    pub const CENTER_HORIZONTALLY: &str = "CenterHorizontally";
    pub const CENTER_VERTICALLY: &str = "CenterVertically";
    pub const PRINT_GRID: &str = "PrintGrid";
    pub const PRINT_HEADERS: &str = "PrintHeaders";
    pub const HEADER_IS_ON: &str = "HeaderIsOn";
    pub const FOOTER_IS_ON: &str = "FooterIsOn";
    pub const IS_VISIBLE: &str = "IsVisible";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_range_address_wire_order() {
        let addr = CellRangeAddress {
            sheet: 2,
            start_column: 0,
            start_row: 1,
            end_column: 9,
            end_row: 49,
        };
        assert_eq!(
            addr.to_uno(),
            UnoValue::Struct(vec![
                UnoValue::Short(2),
                UnoValue::Long(0),
                UnoValue::Long(1),
                UnoValue::Long(9),
                UnoValue::Long(49),
            ])
        );
        assert_eq!(CellRangeAddress::from_uno(&addr.to_uno()).unwrap(), addr);
    }

    #[test]
    fn test_cell_range_address_rejects_other_structs() {
        let value = UnoValue::Struct(vec![UnoValue::Short(0), UnoValue::Long(1)]);
        assert!(CellRangeAddress::from_uno(&value).is_err());
    }

    #[test]
    fn test_style_value_reads_through_any() {
        let value = UnoValue::Short(75).into_any(Type::short());
        assert_eq!(StyleValue::from_uno(&value).unwrap(), StyleValue::Short(75));
        assert_eq!(StyleValue::Short(75).as_i32(), Some(75));
        assert_eq!(StyleValue::Bool(true).as_i32(), None);
        assert!(StyleValue::from_uno(&UnoValue::String("A4".into())).is_err());
    }
}
