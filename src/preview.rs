//! Tabular data preview for spreadsheet and CSV uploads.
//!
//! The preview is parsed from the original upload, independently of whatever
//! Markdown the converter produced, and is best-effort: a parse failure
//! becomes a [`PreviewError`] that the UI shows as a warning.
//!
//! The first row is treated as the header; the preview holds at most
//! [`PREVIEW_ROWS`] data rows in their original order.

use crate::error::PreviewError;
use crate::upload::UploadedFile;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Number of data rows shown in the preview.
pub const PREVIEW_ROWS: usize = 10;

/// A header row plus a bounded number of data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// More data rows exist beyond `rows`.
    pub truncated: bool,
}

impl TablePreview {
    /// Render as a GitHub-flavoured Markdown table.
    pub fn to_markdown(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        if width == 0 {
            return String::new();
        }

        let mut out = String::new();
        push_row(&mut out, &self.headers, width);
        out.push('|');
        for _ in 0..width {
            out.push_str(" --- |");
        }
        out.push('\n');
        for row in &self.rows {
            push_row(&mut out, row, width);
        }
        out
    }
}

fn push_row(out: &mut String, cells: &[String], width: usize) {
    out.push('|');
    for i in 0..width {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Build the preview for a tabular upload.
///
/// Returns `Ok(None)` when the upload is not `.xlsx`, `.xls` or `.csv`.
pub fn preview_tabular_data(upload: &UploadedFile) -> Result<Option<TablePreview>, PreviewError> {
    let Some(ext) = upload.extension() else {
        return Ok(None);
    };
    let preview = match ext.as_str() {
        "csv" => read_csv_table(&upload.content, Some(PREVIEW_ROWS))?,
        "xlsx" | "xls" => read_first_sheet(Arc::clone(&upload.content), Some(PREVIEW_ROWS))?,
        _ => return Ok(None),
    };
    debug!(
        "Preview for {}: {} columns, {} rows (truncated: {})",
        upload.name,
        preview.headers.len(),
        preview.rows.len(),
        preview.truncated
    );
    Ok(Some(preview))
}

/// Parse CSV bytes; `limit` caps the number of data rows kept.
pub fn read_csv_table(bytes: &[u8], limit: Option<usize>) -> Result<TablePreview, PreviewError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PreviewError::Csv {
            detail: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut truncated = false;
    for record in reader.records() {
        let record = record.map_err(|e| PreviewError::Csv {
            detail: e.to_string(),
        })?;
        if limit.is_some_and(|n| rows.len() >= n) {
            truncated = true;
            break;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(TablePreview {
        headers,
        rows,
        truncated,
    })
}

/// Parse the first worksheet of an `.xlsx`/`.xls` workbook.
pub fn read_first_sheet(
    bytes: Arc<[u8]>,
    limit: Option<usize>,
) -> Result<TablePreview, PreviewError> {
    let mut sheets = read_workbook(bytes)?;
    if sheets.is_empty() {
        return Err(PreviewError::Spreadsheet {
            detail: "workbook has no worksheets".into(),
        });
    }
    let (_, range) = sheets.swap_remove(0);
    Ok(range_to_table(&range, limit))
}

/// Read every worksheet of a workbook as `(sheet name, cell range)`.
pub fn read_workbook(bytes: Arc<[u8]>) -> Result<Vec<(String, Range<Data>)>, PreviewError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| PreviewError::Spreadsheet {
            detail: e.to_string(),
        })?;

    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PreviewError::Spreadsheet {
                detail: format!("sheet '{name}': {e}"),
            })?;
        sheets.push((name, range));
    }
    Ok(sheets)
}

/// Convert a worksheet range to a table, first row as header.
pub fn range_to_table(range: &Range<Data>, limit: Option<usize>) -> TablePreview {
    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut truncated = false;
    for row in rows_iter {
        if limit.is_some_and(|n| rows.len() >= n) {
            truncated = true;
            break;
        }
        rows.push(row.iter().map(|c| c.to_string()).collect());
    }

    TablePreview {
        headers,
        rows,
        truncated,
    }
}
