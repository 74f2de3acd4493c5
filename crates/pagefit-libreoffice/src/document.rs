//! A spreadsheet document loaded into the engine.

use std::path::{Component, Path};

use libreoffice_urp::methods::{
    x_calculatable, x_closeable, x_component_loader, x_index_access, x_name_access,
    x_spreadsheet_document, x_storable, x_style_families_supplier,
};
use libreoffice_urp::{names, property_value, Connection, Type, UnoValue, UrpError};

use crate::error::{Result, SessionError};
use crate::sheet::CalcSheet;

pub const PDF_EXPORT_FILTER: &str = "calc_pdf_Export";

/// Percent-encoded `file://` URL for `path`, made absolute against the
/// current directory.
pub fn file_url(path: &Path) -> std::io::Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut url = String::from("file://");
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => {
                url.push('/');
                url.push_str(&prefix.as_os_str().to_string_lossy());
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => url.push_str("/.."),
            Component::Normal(segment) => {
                url.push('/');
                url.push_str(&urlencoding::encode(&segment.to_string_lossy()));
            }
        }
    }
    if url.len() == "file://".len() {
        url.push('/');
    }
    Ok(url)
}

/// A loaded Calc document. Call [`close`](Self::close) when done; dropping
/// the handle leaves the document open in the engine.
pub struct CalcDocument<'a> {
    conn: &'a mut Connection,
    oid: String,
    title: String,
}

impl<'a> CalcDocument<'a> {
    /// `loadComponentFromURL` with `Hidden=true`.
    pub(crate) async fn load(
        conn: &'a mut Connection,
        desktop: &str,
        path: &Path,
    ) -> Result<CalcDocument<'a>> {
        let url = file_url(path)?;
        let props = UnoValue::Sequence(vec![property_value(
            "Hidden",
            UnoValue::Bool(true),
            Type::boolean(),
        )]);
        let result = conn
            .call(
                desktop,
                &x_component_loader::LOAD_COMPONENT_FROM_URL,
                &[
                    UnoValue::String(url.clone()),
                    UnoValue::String("_blank".to_string()),
                    UnoValue::Long(0),
                    props,
                ],
            )
            .await?;
        let oid = result.as_oid().map(str::to_string).ok_or_else(|| {
            SessionError::OperationFailed(format!("loadComponentFromURL returned null for {url}"))
        })?;

        tracing::info!(path = %path.display(), "loaded document");
        Ok(Self {
            conn,
            oid,
            title: path.display().to_string(),
        })
    }

    async fn doc_as(&mut self, interface: &'static str) -> Result<String> {
        self.conn
            .query_interface(&self.oid, interface)
            .await?
            .ok_or_else(|| {
                SessionError::OperationFailed(format!(
                    "{} is not a spreadsheet document ({interface} missing)",
                    self.title
                ))
            })
    }

    /// OIDs of every sheet, in document order.
    pub async fn sheet_oids(&mut self) -> Result<Vec<String>> {
        let doc = self.doc_as(names::X_SPREADSHEET_DOCUMENT).await?;
        let sheets = self
            .conn
            .call(&doc, &x_spreadsheet_document::GET_SHEETS, &[])
            .await?;
        let sheets = sheets
            .as_oid()
            .map(str::to_string)
            .ok_or(UrpError::NullReference("getSheets"))?;
        let sheets = self
            .conn
            .require_interface(&sheets, names::X_INDEX_ACCESS)
            .await?;

        let count = self
            .conn
            .call(&sheets, &x_index_access::GET_COUNT, &[])
            .await?
            .as_integer()
            .unwrap_or(0);
        let mut oids = Vec::new();
        for i in 0..count {
            let index = i32::try_from(i)
                .map_err(|_| SessionError::OperationFailed(format!("sheet index {i} out of range")))?;
            let sheet = self
                .conn
                .call(&sheets, &x_index_access::GET_BY_INDEX, &[UnoValue::Long(index)])
                .await?;
            let sheet = sheet
                .as_oid()
                .map(str::to_string)
                .ok_or(UrpError::NullReference("getByIndex"))?;
            oids.push(sheet);
        }
        tracing::debug!(document = %self.title, sheets = oids.len(), "enumerated sheets");
        Ok(oids)
    }

    /// The `PageStyles` style family as `XNameAccess`.
    pub async fn page_styles(&mut self) -> Result<String> {
        let supplier = self.doc_as(names::X_STYLE_FAMILIES_SUPPLIER).await?;
        let families = self
            .conn
            .call(&supplier, &x_style_families_supplier::GET_STYLE_FAMILIES, &[])
            .await?;
        let families = families
            .as_oid()
            .map(str::to_string)
            .ok_or(UrpError::NullReference("getStyleFamilies"))?;
        let page_styles = self
            .conn
            .call(
                &families,
                &x_name_access::GET_BY_NAME,
                &[UnoValue::String("PageStyles".to_string())],
            )
            .await?;
        let page_styles = page_styles
            .as_oid()
            .map(str::to_string)
            .ok_or(UrpError::NullReference("getByName(PageStyles)"))?;
        Ok(self
            .conn
            .require_interface(&page_styles, names::X_NAME_ACCESS)
            .await?)
    }

    /// Handle to the sheet at `index` of [`sheet_oids`](Self::sheet_oids).
    pub async fn sheet(
        &mut self,
        oid: String,
        index: usize,
        page_styles: String,
    ) -> Result<CalcSheet<'_>> {
        let index = i16::try_from(index)
            .map_err(|_| SessionError::OperationFailed(format!("sheet index {index} out of range")))?;
        CalcSheet::open(&mut *self.conn, oid, index, page_styles).await
    }

    /// Recalculates every formula cell.
    pub async fn calculate_all(&mut self) -> Result<()> {
        let calc = self.doc_as(names::X_CALCULATABLE).await?;
        self.conn
            .call(&calc, &x_calculatable::CALCULATE_ALL, &[])
            .await?;
        Ok(())
    }

    /// `storeToURL` through the Calc PDF filter, then checks the file landed.
    pub async fn export_pdf(&mut self, target: &Path) -> Result<()> {
        let url = file_url(target)?;
        let storable = self.doc_as(names::X_STORABLE).await?;
        let props = UnoValue::Sequence(vec![
            property_value(
                "FilterName",
                UnoValue::String(PDF_EXPORT_FILTER.to_string()),
                Type::string(),
            ),
            property_value("Overwrite", UnoValue::Bool(true), Type::boolean()),
        ]);
        self.conn
            .call(&storable, &x_storable::STORE_TO_URL, &[UnoValue::String(url), props])
            .await
            .map_err(|e| SessionError::Export {
                path: target.to_path_buf(),
                reason: e.to_string(),
            })?;

        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.len() > 0 => {
                tracing::info!(document = %self.title, pdf = %target.display(), bytes = meta.len(), "exported");
                Ok(())
            }
            Ok(_) => Err(SessionError::Export {
                path: target.to_path_buf(),
                reason: "engine wrote an empty file".into(),
            }),
            Err(e) => Err(SessionError::Export {
                path: target.to_path_buf(),
                reason: format!("no output file: {e}"),
            }),
        }
    }

    /// Closes the document, discarding any changes.
    pub async fn close(mut self) -> Result<()> {
        let closeable = self.doc_as(names::X_CLOSEABLE).await?;
        self.conn
            .call(&closeable, &x_closeable::CLOSE, &[UnoValue::Bool(true)])
            .await?;
        tracing::debug!(document = %self.title, "closed");
        Ok(())
    }
}
