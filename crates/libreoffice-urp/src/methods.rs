//! Method tables for the UNO interfaces this client calls.
//!
//! Indices are absolute within the interface's inheritance chain:
//! `XInterface` occupies 0..=2 (`queryInterface`, `acquire`, `release`) and
//! each derived interface continues from there.

use crate::types::{names, Type, TypeClass};

/// Wire shape of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Void,
    Bool,
    Short,
    Long,
    String,
    Any,
    TypeDesc,
    Interface(&'static str),
    Struct(&'static str),
    SequenceOf(&'static str),
}

impl Shape {
    pub fn wire_type(self) -> Type {
        match self {
            Shape::Void => Type::void(),
            Shape::Bool => Type::boolean(),
            Shape::Short => Type::short(),
            Shape::Long => Type::long(),
            Shape::String => Type::string(),
            Shape::Any => Type::any(),
            Shape::TypeDesc => Type::type_of_type(),
            Shape::Interface(name) => Type::interface(name),
            Shape::Struct(name) => Type::named(TypeClass::Struct, name),
            Shape::SequenceOf(element) => Type::sequence_of(element),
        }
    }
}

/// A callable UNO method.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    pub interface: &'static str,
    pub name: &'static str,
    pub index: u16,
    pub params: &'static [Shape],
    pub returns: Shape,
    pub one_way: bool,
}

impl Method {
    const fn new(
        interface: &'static str,
        name: &'static str,
        index: u16,
        params: &'static [Shape],
        returns: Shape,
    ) -> Self {
        Self {
            interface,
            name,
            index,
            params,
            returns,
            one_way: false,
        }
    }

    pub fn interface_type(&self) -> Type {
        Type::interface(self.interface)
    }
}

pub mod x_interface {
    use super::*;

    pub const QUERY_INTERFACE: Method = Method::new(
        names::X_INTERFACE,
        "queryInterface",
        0,
        &[Shape::TypeDesc],
        Shape::Any,
    );

    pub const RELEASE: Method = Method {
        one_way: true,
        ..Method::new(names::X_INTERFACE, "release", 2, &[], Shape::Void)
    };
}

/// Bridge-internal interface; index 3 is `getProperties`.
pub mod x_protocol_properties {
    use super::*;

    pub const REQUEST_CHANGE: Method = Method::new(
        names::X_PROTOCOL_PROPERTIES,
        "requestChange",
        4,
        &[Shape::Long],
        Shape::Long,
    );

    pub const COMMIT_CHANGE: Method = Method::new(
        names::X_PROTOCOL_PROPERTIES,
        "commitChange",
        5,
        &[Shape::SequenceOf(names::PROTOCOL_PROPERTY)],
        Shape::Void,
    );
}

pub mod x_component_context {
    use super::*;

    pub const GET_SERVICE_MANAGER: Method = Method::new(
        names::X_COMPONENT_CONTEXT,
        "getServiceManager",
        4,
        &[],
        Shape::Interface(names::X_MULTI_COMPONENT_FACTORY),
    );
}

pub mod x_multi_component_factory {
    use super::*;

    pub const CREATE_INSTANCE_WITH_CONTEXT: Method = Method::new(
        names::X_MULTI_COMPONENT_FACTORY,
        "createInstanceWithContext",
        3,
        &[Shape::String, Shape::Interface(names::X_COMPONENT_CONTEXT)],
        Shape::Interface(names::X_INTERFACE),
    );
}

pub mod x_component_loader {
    use super::*;

    pub const LOAD_COMPONENT_FROM_URL: Method = Method::new(
        names::X_COMPONENT_LOADER,
        "loadComponentFromURL",
        3,
        &[
            Shape::String,
            Shape::String,
            Shape::Long,
            Shape::SequenceOf(names::PROPERTY_VALUE),
        ],
        Shape::Interface("com.sun.star.lang.XComponent"),
    );
}

pub mod x_storable {
    use super::*;

    pub const STORE_TO_URL: Method = Method::new(
        names::X_STORABLE,
        "storeToURL",
        8,
        &[Shape::String, Shape::SequenceOf(names::PROPERTY_VALUE)],
        Shape::Void,
    );
}

/// Extends `XCloseBroadcaster` (3..=4).
pub mod x_closeable {
    use super::*;

    pub const CLOSE: Method = Method::new(names::X_CLOSEABLE, "close", 5, &[Shape::Bool], Shape::Void);
}

pub mod x_spreadsheet_document {
    use super::*;

    pub const GET_SHEETS: Method = Method::new(
        names::X_SPREADSHEET_DOCUMENT,
        "getSheets",
        3,
        &[],
        Shape::Interface("com.sun.star.sheet.XSpreadsheets"),
    );
}

pub mod x_calculatable {
    use super::*;

    pub const CALCULATE_ALL: Method =
        Method::new(names::X_CALCULATABLE, "calculateAll", 4, &[], Shape::Void);
}

/// Extends `XElementAccess` (3..=4).
pub mod x_index_access {
    use super::*;

    pub const GET_COUNT: Method = Method::new(names::X_INDEX_ACCESS, "getCount", 5, &[], Shape::Long);

    pub const GET_BY_INDEX: Method =
        Method::new(names::X_INDEX_ACCESS, "getByIndex", 6, &[Shape::Long], Shape::Any);
}

/// Extends `XElementAccess` (3..=4).
pub mod x_name_access {
    use super::*;

    pub const GET_BY_NAME: Method =
        Method::new(names::X_NAME_ACCESS, "getByName", 5, &[Shape::String], Shape::Any);
}

pub mod x_style_families_supplier {
    use super::*;

    pub const GET_STYLE_FAMILIES: Method = Method::new(
        names::X_STYLE_FAMILIES_SUPPLIER,
        "getStyleFamilies",
        3,
        &[],
        Shape::Interface(names::X_NAME_ACCESS),
    );
}

pub mod x_property_set {
    use super::*;

    pub const GET_PROPERTY_SET_INFO: Method = Method::new(
        names::X_PROPERTY_SET,
        "getPropertySetInfo",
        3,
        &[],
        Shape::Interface(names::X_PROPERTY_SET_INFO),
    );

    pub const SET_PROPERTY_VALUE: Method = Method::new(
        names::X_PROPERTY_SET,
        "setPropertyValue",
        4,
        &[Shape::String, Shape::Any],
        Shape::Void,
    );

    pub const GET_PROPERTY_VALUE: Method = Method::new(
        names::X_PROPERTY_SET,
        "getPropertyValue",
        5,
        &[Shape::String],
        Shape::Any,
    );
}

pub mod x_property_set_info {
    use super::*;

    pub const HAS_PROPERTY_BY_NAME: Method = Method::new(
        names::X_PROPERTY_SET_INFO,
        "hasPropertyByName",
        5,
        &[Shape::String],
        Shape::Bool,
    );
}

pub mod x_sheet_page_break {
    use super::*;

    pub const REMOVE_ALL_MANUAL_PAGE_BREAKS: Method = Method::new(
        names::X_SHEET_PAGE_BREAK,
        "removeAllManualPageBreaks",
        5,
        &[],
        Shape::Void,
    );
}

/// `XSpreadsheet` -> `XSheetCellRange` (6) -> `XCellRange` (3..=5).
pub mod x_spreadsheet {
    use super::*;

    pub const CREATE_CURSOR: Method = Method::new(
        names::X_SPREADSHEET,
        "createCursor",
        7,
        &[],
        Shape::Interface("com.sun.star.sheet.XSheetCellCursor"),
    );
}

pub mod x_used_area_cursor {
    use super::*;

    pub const GOTO_START_OF_USED_AREA: Method = Method::new(
        names::X_USED_AREA_CURSOR,
        "gotoStartOfUsedArea",
        3,
        &[Shape::Bool],
        Shape::Void,
    );

    pub const GOTO_END_OF_USED_AREA: Method = Method::new(
        names::X_USED_AREA_CURSOR,
        "gotoEndOfUsedArea",
        4,
        &[Shape::Bool],
        Shape::Void,
    );
}

pub mod x_cell_range_addressable {
    use super::*;

    pub const GET_RANGE_ADDRESS: Method = Method::new(
        names::X_CELL_RANGE_ADDRESSABLE,
        "getRangeAddress",
        3,
        &[],
        Shape::Struct(names::CELL_RANGE_ADDRESS),
    );
}

pub mod x_print_areas {
    use super::*;

    pub const GET_PRINT_AREAS: Method = Method::new(
        names::X_PRINT_AREAS,
        "getPrintAreas",
        3,
        &[],
        Shape::SequenceOf(names::CELL_RANGE_ADDRESS),
    );

    pub const SET_PRINT_AREAS: Method = Method::new(
        names::X_PRINT_AREAS,
        "setPrintAreas",
        4,
        &[Shape::SequenceOf(names::CELL_RANGE_ADDRESS)],
        Shape::Void,
    );

    pub const SET_PRINT_TITLE_COLUMNS: Method = Method::new(
        names::X_PRINT_AREAS,
        "setPrintTitleColumns",
        6,
        &[Shape::Bool],
        Shape::Void,
    );

    pub const SET_PRINT_TITLE_ROWS: Method = Method::new(
        names::X_PRINT_AREAS,
        "setPrintTitleRows",
        10,
        &[Shape::Bool],
        Shape::Void,
    );
}

pub mod x_column_row_range {
    use super::*;

    pub const GET_COLUMNS: Method = Method::new(
        names::X_COLUMN_ROW_RANGE,
        "getColumns",
        3,
        &[],
        Shape::Interface("com.sun.star.table.XTableColumns"),
    );

    pub const GET_ROWS: Method = Method::new(
        names::X_COLUMN_ROW_RANGE,
        "getRows",
        4,
        &[],
        Shape::Interface("com.sun.star.table.XTableRows"),
    );
}

pub mod x_named {
    use super::*;

    pub const GET_NAME: Method = Method::new(names::X_NAMED, "getName", 3, &[], Shape::String);
}

pub mod x_desktop {
    use super::*;

    pub const TERMINATE: Method = Method::new(names::X_DESKTOP, "terminate", 3, &[], Shape::Bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_the_only_one_way_method() {
        assert!(x_interface::RELEASE.one_way);
        assert!(!x_interface::QUERY_INTERFACE.one_way);
        assert!(!x_print_areas::SET_PRINT_AREAS.one_way);
    }

    #[test]
    fn test_shapes_map_to_wire_types() {
        assert_eq!(Shape::Short.wire_type(), Type::short());
        assert_eq!(
            Shape::SequenceOf(names::PROPERTY_VALUE).wire_type().name,
            "[]com.sun.star.beans.PropertyValue"
        );
        assert_eq!(
            x_print_areas::GET_PRINT_AREAS.interface_type(),
            Type::interface(names::X_PRINT_AREAS)
        );
    }
}
