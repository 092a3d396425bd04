//! File download responses for `?format=csv|xlsx` export endpoints.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use clinicops_core::export::{ExportFormat, Table};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{AppError, AppResult};

/// Render `table` in the requested format as an attachment named
/// `<filename_stem>.<ext>`.
pub fn respond(format: ExportFormat, filename_stem: &str, table: &Table) -> AppResult<Response> {
    let body = match format {
        ExportFormat::Csv => table.to_csv().into_bytes(),
        ExportFormat::Xlsx => to_xlsx(table)?,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{filename_stem}.{}\"",
                format.extension()
            ),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::InternalError(format!("Failed to build export response: {e}")))
}

/// Write the table to a single-sheet workbook with a bold header row.
pub fn to_xlsx(table: &Table) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, title) in table.headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, title, &bold)
            .map_err(xlsx_error)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet
                .write_string(row_idx as u32 + 1, col as u16, value)
                .map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> AppError {
    AppError::InternalError(format!("XLSX export failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["sku", "name"]);
        table.push(vec!["GL-01".into(), "Gloves, nitrile".into()]);
        table
    }

    #[test]
    fn csv_response_is_an_attachment() {
        let resp = respond(ExportFormat::Csv, "inventory", &sample()).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"inventory.csv\""
        );
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&sample()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
