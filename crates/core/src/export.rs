//! Tabular export helpers shared by the CSV and XLSX writers.

use crate::error::CoreError;

define_text_enum! {
    /// Requested export format (`?format=`).
    ExportFormat("export format") {
        Csv = "csv",
        Xlsx = "xlsx",
    }
}

impl ExportFormat {
    /// Parse an optional `format` query value, defaulting to CSV.
    pub fn from_query(format: Option<&str>) -> Result<Self, CoreError> {
        format.map_or(Ok(Self::Csv), Self::parse)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

/// A header row plus data rows, each already rendered to strings.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as RFC 4180 CSV with `\n` line endings.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, &self.headers);
        for row in &self.rows {
            push_csv_line(&mut out, row);
        }
        out
    }
}

/// Quote a field when it contains a delimiter, quote or newline.
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_csv_line(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Render an optional value as an empty string when absent.
pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(csv_escape("Gauze"), "Gauze");
    }

    #[test]
    fn commas_and_quotes_are_escaped() {
        assert_eq!(csv_escape("Saline, 0.9%"), "\"Saline, 0.9%\"");
        assert_eq!(csv_escape("5\" bandage"), "\"5\"\" bandage\"");
    }

    #[test]
    fn table_renders_header_then_rows() {
        let mut t = Table::new(["sku", "name"]);
        t.push(vec!["A-1".into(), "Gloves, nitrile".into()]);
        assert_eq!(t.to_csv(), "sku,name\nA-1,\"Gloves, nitrile\"\n");
    }

    #[test]
    fn format_defaults_to_csv() {
        assert_eq!(ExportFormat::from_query(None).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_query(Some("xlsx")).unwrap(), ExportFormat::Xlsx);
        assert!(ExportFormat::from_query(Some("pdf")).is_err());
    }
}
