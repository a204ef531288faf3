//! Multi-format extraction into positional records

use calamine::Reader;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::{ContentType, Record, RecordPosition};

/// Converts raw file bytes into a sequence of normalized text records.
/// No semantic processing happens here; records carry only text and a
/// position in the source file.
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    /// Create a new extractor
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract records from a file. Failures are scoped to this file and
    /// carry the offending filename.
    pub fn extract(
        &self,
        filename: &str,
        data: &[u8],
        content_type: &ContentType,
    ) -> Result<Vec<Record>> {
        let records = match content_type {
            ContentType::Csv => Self::extract_csv(filename, data)?,
            ContentType::Spreadsheet => Self::extract_spreadsheet(filename, data)?,
            ContentType::Pdf => Self::extract_pdf(filename, data)?,
            ContentType::Text => self.extract_text(data),
        };

        tracing::debug!(
            "Extracted {} records from '{}' ({})",
            records.len(),
            filename,
            content_type.display_name()
        );

        Ok(records)
    }

    /// CSV: one record per data row, "col: value" cells joined with " | ".
    /// Row indices are 0-based and exclude the header; empty rows are
    /// skipped without shifting the indices of later rows.
    fn extract_csv(filename: &str, data: &[u8]) -> Result<Vec<Record>> {
        let mut reader = csv::Reader::from_reader(data);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::extraction(filename, format!("invalid header row: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row =
                row.map_err(|e| Error::extraction(filename, format!("row {}: {}", index, e)))?;
            let text = render_row(&headers, row.iter().map(|v| v.to_string()));
            if text.is_empty() {
                continue;
            }
            records.push(Record::new(
                RecordPosition::Row {
                    sheet: None,
                    index: index as u32,
                },
                text,
            ));
        }

        Ok(records)
    }

    /// Workbooks (xlsx/xls/ods): same row rendering as CSV, once per
    /// sheet. The first row of each sheet is treated as the header and
    /// the sheet name travels with every row position.
    fn extract_spreadsheet(filename: &str, data: &[u8]) -> Result<Vec<Record>> {
        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut records = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                Error::extraction(filename, format!("sheet '{}': {}", sheet_name, e))
            })?;

            let mut rows = range.rows();
            let headers: Vec<String> = match rows.next() {
                Some(row) => row.iter().map(|c| cell_to_string(c).trim().to_string()).collect(),
                None => continue,
            };

            for (index, row) in rows.enumerate() {
                let text = render_row(&headers, row.iter().map(cell_to_string));
                if text.is_empty() {
                    continue;
                }
                records.push(Record::new(
                    RecordPosition::Row {
                        sheet: Some(sheet_name.clone()),
                        index: index as u32,
                    },
                    text,
                ));
            }
        }

        Ok(records)
    }

    /// PDF: one record per page (1-based), whitespace collapsed.
    /// Pages with no extractable text are skipped, not emitted empty.
    fn extract_pdf(filename: &str, data: &[u8]) -> Result<Vec<Record>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(filename, format!("failed to load PDF: {}", e)))?;

        let mut records = Vec::new();
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        for page in page_numbers {
            let text = match doc.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("'{}' page {}: {}", filename, page, e);
                    continue;
                }
            };
            let text = normalize_whitespace(&text);
            if text.is_empty() {
                continue;
            }
            records.push(Record::new(RecordPosition::Page(page), text));
        }

        // Some PDFs defeat page-wise extraction (unusual encodings, text
        // in form XObjects). Fall back to whole-document extraction
        // before concluding the file has no text.
        if records.is_empty() {
            match pdf_extract::extract_text_from_mem(data) {
                Ok(text) => {
                    let text = normalize_whitespace(&text);
                    if !text.is_empty() {
                        records.push(Record::new(RecordPosition::Page(1), text));
                    }
                }
                Err(e) => {
                    tracing::warn!("'{}': whole-document extraction failed: {}", filename, e);
                }
            }
        }

        Ok(records)
    }

    /// Plain text: one record for small files, fixed line windows for
    /// large ones, each positioned at its 1-based starting line.
    fn extract_text(&self, data: &[u8]) -> Vec<Record> {
        let content = String::from_utf8_lossy(data);

        if data.len() <= self.config.text_split_threshold {
            let text = content.trim();
            if text.is_empty() {
                return Vec::new();
            }
            return vec![Record::new(RecordPosition::Whole, text)];
        }

        let window_lines = self.config.text_window_lines.max(1);
        let lines: Vec<&str> = content.lines().collect();
        let mut records = Vec::new();

        for (window, chunk) in lines.chunks(window_lines).enumerate() {
            let text = chunk.join("\n");
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let start_line = (window * window_lines + 1) as u32;
            records.push(Record::new(RecordPosition::Line(start_line), text));
        }

        records
    }
}

/// Render one table row as "col: value" cells joined with " | ".
/// Cells with no value are omitted, not rendered as "None"; a row with
/// no values at all renders empty and is skipped by the caller.
fn render_row(headers: &[String], values: impl Iterator<Item = String>) -> String {
    let mut cells = Vec::new();
    for (i, value) in values.enumerate() {
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match headers.get(i).filter(|h| !h.is_empty()) {
            Some(header) => cells.push(format!("{}: {}", header, value)),
            None => cells.push(format!("column {}: {}", i + 1, value)),
        }
    }
    cells.join(" | ")
}

/// Convert a spreadsheet cell to text
fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.to_string(),
        _ => String::new(),
    }
}

/// Collapse runs of whitespace into single spaces
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
