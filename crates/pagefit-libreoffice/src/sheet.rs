//! One Calc sheet and its page style, driven over URP.

use std::collections::HashMap;

use libreoffice_urp::methods::{
    x_cell_range_addressable, x_column_row_range, x_index_access, x_name_access, x_named,
    x_print_areas, x_property_set, x_property_set_info, x_sheet_page_break, x_spreadsheet,
    x_used_area_cursor,
};
use libreoffice_urp::{names, Connection, UnoValue, UrpError};

use crate::error::{Result, SessionError};
use crate::layout::{SheetBounds, SheetPrintSetup};
use crate::uno_types::{props, CellRangeAddress, StyleValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Axis {
    Column,
    Row,
}

/// `XPropertySet` and `XPropertySetInfo` of the sheet's page style.
#[derive(Debug, Clone)]
struct PageStyleHandle {
    props: String,
    info: String,
}

/// A sheet of a loaded [`CalcDocument`](crate::document::CalcDocument).
///
/// Interface references are resolved on first use and cached for the
/// lifetime of the handle.
pub struct CalcSheet<'a> {
    conn: &'a mut Connection,
    oid: String,
    index: i16,
    name: String,
    page_styles: String,
    interfaces: HashMap<&'static str, String>,
    style: Option<PageStyleHandle>,
    supported: HashMap<String, bool>,
    lines: HashMap<Axis, String>,
    line_props: HashMap<(Axis, i32), String>,
}

fn require_oid(value: &UnoValue, context: &'static str) -> Result<String> {
    value
        .as_oid()
        .map(str::to_string)
        .ok_or(SessionError::Urp(UrpError::NullReference(context)))
}

impl<'a> CalcSheet<'a> {
    /// `page_styles` is the document's `PageStyles` family as `XNameAccess`.
    pub(crate) async fn open(
        conn: &'a mut Connection,
        oid: String,
        index: i16,
        page_styles: String,
    ) -> Result<CalcSheet<'a>> {
        let mut sheet = Self {
            conn,
            oid,
            index,
            name: String::new(),
            page_styles,
            interfaces: HashMap::new(),
            style: None,
            supported: HashMap::new(),
            lines: HashMap::new(),
            line_props: HashMap::new(),
        };
        sheet.name = match sheet.read_name().await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(index, error = %e, "sheet name unavailable");
                format!("Sheet{}", i32::from(index) + 1)
            }
        };
        Ok(sheet)
    }

    async fn read_name(&mut self) -> Result<String> {
        let named = self.sheet_as(names::X_NAMED).await?;
        let value = self.conn.call(&named, &x_named::GET_NAME, &[]).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::OperationFailed("getName returned no string".into()))
    }

    /// The sheet object queried for `interface`.
    async fn sheet_as(&mut self, interface: &'static str) -> Result<String> {
        if let Some(oid) = self.interfaces.get(interface) {
            return Ok(oid.clone());
        }
        let oid = self.conn.require_interface(&self.oid, interface).await?;
        self.interfaces.insert(interface, oid.clone());
        Ok(oid)
    }

    async fn get_property(&mut self, props_oid: &str, name: &str) -> Result<UnoValue> {
        Ok(self
            .conn
            .call(
                props_oid,
                &x_property_set::GET_PROPERTY_VALUE,
                &[UnoValue::String(name.to_string())],
            )
            .await?)
    }

    async fn page_style(&mut self) -> Result<PageStyleHandle> {
        if let Some(handle) = &self.style {
            return Ok(handle.clone());
        }

        let sheet_props = self.sheet_as(names::X_PROPERTY_SET).await?;
        let style_name = self.get_property(&sheet_props, props::PAGE_STYLE).await?;
        let style_name = style_name
            .as_str()
            .ok_or_else(|| SessionError::OperationFailed("PageStyle is not a string".into()))?
            .to_string();

        let page_styles = self.page_styles.clone();
        let style = self
            .conn
            .call(
                &page_styles,
                &x_name_access::GET_BY_NAME,
                &[UnoValue::String(style_name.clone())],
            )
            .await?;
        let style = require_oid(&style, "PageStyles.getByName")?;
        let style_props = self.conn.require_interface(&style, names::X_PROPERTY_SET).await?;
        let info = self
            .conn
            .call(&style_props, &x_property_set::GET_PROPERTY_SET_INFO, &[])
            .await?;
        let info = require_oid(&info, "getPropertySetInfo")?;

        tracing::debug!(sheet = %self.name, style = %style_name, "resolved page style");
        let handle = PageStyleHandle {
            props: style_props,
            info,
        };
        self.style = Some(handle.clone());
        Ok(handle)
    }

    /// Columns or rows of the sheet as `XIndexAccess`.
    async fn lines(&mut self, axis: Axis) -> Result<String> {
        if let Some(oid) = self.lines.get(&axis) {
            return Ok(oid.clone());
        }
        let range = self.sheet_as(names::X_COLUMN_ROW_RANGE).await?;
        let (method, context) = match axis {
            Axis::Column => (&x_column_row_range::GET_COLUMNS, "getColumns"),
            Axis::Row => (&x_column_row_range::GET_ROWS, "getRows"),
        };
        let container = self.conn.call(&range, method, &[]).await?;
        let container = require_oid(&container, context)?;
        let access = self
            .conn
            .require_interface(&container, names::X_INDEX_ACCESS)
            .await?;
        self.lines.insert(axis, access.clone());
        Ok(access)
    }

    /// `XPropertySet` of one column or row.
    async fn line(&mut self, axis: Axis, index: i32) -> Result<String> {
        if let Some(oid) = self.line_props.get(&(axis, index)) {
            return Ok(oid.clone());
        }
        let access = self.lines(axis).await?;
        let item = self
            .conn
            .call(&access, &x_index_access::GET_BY_INDEX, &[UnoValue::Long(index)])
            .await?;
        let item = require_oid(&item, "getByIndex")?;
        let item_props = self.conn.require_interface(&item, names::X_PROPERTY_SET).await?;
        self.line_props.insert((axis, index), item_props.clone());
        Ok(item_props)
    }

    async fn line_visible(&mut self, axis: Axis, index: i32) -> Result<bool> {
        let line = self.line(axis, index).await?;
        self.get_property(&line, props::IS_VISIBLE)
            .await?
            .as_bool()
            .ok_or_else(|| SessionError::OperationFailed("IsVisible is not a boolean".into()))
    }

    async fn line_size(&mut self, axis: Axis, index: i32) -> Result<i32> {
        let line = self.line(axis, index).await?;
        let name = match axis {
            Axis::Column => props::WIDTH,
            Axis::Row => props::HEIGHT,
        };
        self.get_property(&line, name)
            .await?
            .as_integer()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| SessionError::OperationFailed(format!("{name} is not an integer")))
    }
}

impl SheetPrintSetup for CalcSheet<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn remove_manual_page_breaks(&mut self) -> Result<()> {
        let breaks = self.sheet_as(names::X_SHEET_PAGE_BREAK).await?;
        self.conn
            .call(&breaks, &x_sheet_page_break::REMOVE_ALL_MANUAL_PAGE_BREAKS, &[])
            .await?;
        Ok(())
    }

    async fn used_area(&mut self) -> Result<SheetBounds> {
        let spreadsheet = self.sheet_as(names::X_SPREADSHEET).await?;
        let cursor = self
            .conn
            .call(&spreadsheet, &x_spreadsheet::CREATE_CURSOR, &[])
            .await?;
        let cursor = require_oid(&cursor, "createCursor")?;

        let used = self
            .conn
            .require_interface(&cursor, names::X_USED_AREA_CURSOR)
            .await?;
        self.conn
            .call(&used, &x_used_area_cursor::GOTO_START_OF_USED_AREA, &[UnoValue::Bool(false)])
            .await?;
        self.conn
            .call(&used, &x_used_area_cursor::GOTO_END_OF_USED_AREA, &[UnoValue::Bool(true)])
            .await?;

        let addressable = self
            .conn
            .require_interface(&cursor, names::X_CELL_RANGE_ADDRESSABLE)
            .await?;
        let address = self
            .conn
            .call(&addressable, &x_cell_range_addressable::GET_RANGE_ADDRESS, &[])
            .await?;
        let bounds = CellRangeAddress::from_uno(&address)?.bounds();
        tracing::debug!(sheet = %self.name, %bounds, "used area");
        Ok(bounds)
    }

    async fn column_visible(&mut self, col: i32) -> Result<bool> {
        self.line_visible(Axis::Column, col).await
    }

    async fn row_visible(&mut self, row: i32) -> Result<bool> {
        self.line_visible(Axis::Row, row).await
    }

    async fn column_width(&mut self, col: i32) -> Result<i32> {
        self.line_size(Axis::Column, col).await
    }

    async fn row_height(&mut self, row: i32) -> Result<i32> {
        self.line_size(Axis::Row, row).await
    }

    async fn replace_print_areas(&mut self, area: SheetBounds) -> Result<()> {
        let print_areas = self.sheet_as(names::X_PRINT_AREAS).await?;
        if let Err(e) = self
            .conn
            .call(&print_areas, &x_print_areas::SET_PRINT_AREAS, &[UnoValue::Sequence(Vec::new())])
            .await
        {
            tracing::debug!(sheet = %self.name, error = %e, "clearing print areas failed");
        }
        let address = CellRangeAddress::from_bounds(self.index, area);
        self.conn
            .call(
                &print_areas,
                &x_print_areas::SET_PRINT_AREAS,
                &[UnoValue::Sequence(vec![address.to_uno()])],
            )
            .await?;
        Ok(())
    }

    async fn clear_print_titles(&mut self) -> Result<()> {
        let print_areas = self.sheet_as(names::X_PRINT_AREAS).await?;
        self.conn
            .call(&print_areas, &x_print_areas::SET_PRINT_TITLE_ROWS, &[UnoValue::Bool(false)])
            .await?;
        self.conn
            .call(&print_areas, &x_print_areas::SET_PRINT_TITLE_COLUMNS, &[UnoValue::Bool(false)])
            .await?;
        Ok(())
    }

    async fn style_has(&mut self, name: &str) -> Result<bool> {
        if let Some(&known) = self.supported.get(name) {
            return Ok(known);
        }
        let style = self.page_style().await?;
        let answer = self
            .conn
            .call(
                &style.info,
                &x_property_set_info::HAS_PROPERTY_BY_NAME,
                &[UnoValue::String(name.to_string())],
            )
            .await?
            .as_bool()
            .unwrap_or(false);
        self.supported.insert(name.to_string(), answer);
        Ok(answer)
    }

    async fn style_get(&mut self, name: &str) -> Result<StyleValue> {
        let style = self.page_style().await?;
        let value = self.get_property(&style.props, name).await?;
        StyleValue::from_uno(&value)
    }

    async fn style_set(&mut self, name: &str, value: StyleValue) -> Result<()> {
        let style = self.page_style().await?;
        self.conn
            .call(
                &style.props,
                &x_property_set::SET_PROPERTY_VALUE,
                &[UnoValue::String(name.to_string()), value.to_any()],
            )
            .await?;
        tracing::trace!(sheet = %self.name, property = name, ?value, "page style property set");
        Ok(())
    }
}
