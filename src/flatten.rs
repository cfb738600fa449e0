// Result flattening: turns a nested `AnalysisResult` into a flat,
// serializable `FlatRecord`.
//
// The traversal that builds the record is also the one that feeds the
// `ReportSink`, so the printed report and the returned record can never
// disagree.

use crate::model::{AnalysisResult, Page};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output of one analysis run. Built once, then printed, saved or dropped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub file_name: String,
    pub model_used: String,
    pub analysis_date: String,
    pub extracted_fields: Vec<ExtractedField>,
    pub tables: Vec<ExtractedTable>,
    pub full_text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub field_name: String,
    pub value: String,
    pub confidence: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub table_index: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub cells: Vec<ExtractedCell>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedCell {
    pub row: usize,
    pub column: usize,
    pub content: String,
    pub confidence: f64,
}

/// `row_count × column_count` grid of display strings for one table. Slots
/// without a source cell stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMatrix {
    rows: Vec<Vec<String>>,
}

impl CellMatrix {
    pub fn new(row_count: usize, column_count: usize) -> Self {
        CellMatrix {
            rows: vec![vec![String::new(); column_count]; row_count],
        }
    }

    /// Writes `text` at (row, column); out-of-range positions are refused.
    fn set(&mut self, row: usize, column: usize, text: String) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(slot) => {
                *slot = text;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// Report headings, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Fields,
    Tables,
    FullText,
}

/// Receives the trace of a flattening pass. Every method defaults to a
/// no-op so sinks only implement what they show; `()` discards everything.
pub trait ReportSink {
    fn no_result(&mut self) {}
    fn begin(&mut self, _file_name: &str, _model: &str, _analysis_date: &str) {}
    fn section(&mut self, _section: Section) {}
    fn document(&mut self, _index: usize, _doc_type: Option<&str>) {}
    fn field(&mut self, _field: &ExtractedField) {}
    fn no_fields(&mut self) {}
    fn table(&mut self, _table: &ExtractedTable, _matrix: &CellMatrix) {}
    fn no_tables(&mut self) {}
    fn content(&mut self, _text: &str) {}
    fn page(&mut self, _index: usize, _text: Option<&str>) {}
}

impl ReportSink for () {}

/// Confidence as a percentage with `decimals` places, e.g. `0.9 -> "90.0%"`.
pub fn percent(confidence: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, confidence * 100.0)
}

/// Flatten `result`, stamping the record with the current local time.
/// Returns `None` (after telling the sink) when there is no result.
pub fn flatten(
    result: Option<&AnalysisResult>,
    model: &str,
    file_path: &Path,
    sink: &mut dyn ReportSink,
) -> Option<FlatRecord> {
    flatten_at(result, model, file_path, Local::now(), sink)
}

/// Same as [`flatten`] with an explicit analysis timestamp.
pub fn flatten_at(
    result: Option<&AnalysisResult>,
    model: &str,
    file_path: &Path,
    now: DateTime<Local>,
    sink: &mut dyn ReportSink,
) -> Option<FlatRecord> {
    let Some(result) = result else {
        sink.no_result();
        return None;
    };

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string_lossy().into_owned());
    let analysis_date = now.format(ANALYSIS_DATE_FORMAT).to_string();
    sink.begin(&file_name, model, &analysis_date);

    sink.section(Section::Fields);
    let extracted_fields = extract_fields(result, sink);

    sink.section(Section::Tables);
    let tables = extract_tables(result, sink);

    sink.section(Section::FullText);
    let full_text = extract_full_text(result, sink);

    debug!(
        fields = extracted_fields.len(),
        tables = tables.len(),
        text_len = full_text.len(),
        "flattened analysis result"
    );

    Some(FlatRecord {
        file_name,
        model_used: model.to_string(),
        analysis_date,
        extracted_fields,
        tables,
        full_text,
    })
}

fn extract_fields(result: &AnalysisResult, sink: &mut dyn ReportSink) -> Vec<ExtractedField> {
    let mut out = Vec::new();
    let documents = match result.documents.as_deref() {
        Some(docs) if !docs.is_empty() => docs,
        _ => {
            sink.no_fields();
            return out;
        }
    };

    for (index, document) in documents.iter().enumerate() {
        sink.document(index, document.doc_type.as_deref());
        let Some(fields) = &document.fields else {
            continue;
        };
        for (name, field) in fields.iter() {
            let extracted = ExtractedField {
                field_name: name.to_string(),
                value: field.display_value(),
                confidence: field.confidence.unwrap_or(0.0),
            };
            sink.field(&extracted);
            out.push(extracted);
        }
    }
    out
}

fn extract_tables(result: &AnalysisResult, sink: &mut dyn ReportSink) -> Vec<ExtractedTable> {
    let mut out = Vec::new();
    let tables = match result.tables.as_deref() {
        Some(tables) if !tables.is_empty() => tables,
        _ => {
            sink.no_tables();
            return out;
        }
    };

    for (table_index, table) in tables.iter().enumerate() {
        let mut matrix = CellMatrix::new(table.row_count, table.column_count);
        let mut cells = Vec::new();

        for cell in table.cells.iter().flatten() {
            let content = cell.content.clone().unwrap_or_default();
            let confidence = cell.confidence.unwrap_or(0.0);
            let shown = format!("{} ({})", content, percent(confidence, 1));
            if !matrix.set(cell.row_index, cell.column_index, shown) {
                warn!(
                    table = table_index,
                    row = cell.row_index,
                    column = cell.column_index,
                    row_count = table.row_count,
                    column_count = table.column_count,
                    "dropping table cell outside declared dimensions"
                );
                continue;
            }
            cells.push(ExtractedCell {
                row: cell.row_index,
                column: cell.column_index,
                content,
                confidence,
            });
        }

        let extracted = ExtractedTable {
            table_index,
            row_count: table.row_count,
            column_count: table.column_count,
            cells,
        };
        sink.table(&extracted, &matrix);
        out.push(extracted);
    }
    out
}

fn extract_full_text(result: &AnalysisResult, sink: &mut dyn ReportSink) -> String {
    if let Some(content) = &result.content {
        sink.content(content);
        return content.clone();
    }

    let mut full_text = String::new();
    for (index, page) in result.pages.iter().flatten().enumerate() {
        let text = page_text(page);
        sink.page(index, text.as_deref());
        if let Some(text) = text {
            full_text.push_str(&text);
            full_text.push('\n');
        }
    }
    full_text
}

fn page_text(page: &Page) -> Option<String> {
    page.lines.as_ref().map(|lines| {
        lines
            .iter()
            .map(|line| line.content.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    })
}
