// Presenter: prints the flattening trace as a readable console report.
// Headings get a little colour when stdout is a terminal; anything else
// (files, pipes, test buffers) receives plain text.

use crate::flatten::{percent, CellMatrix, ExtractedField, ExtractedTable, ReportSink, Section};
use crossterm::style::{style, Stylize};
use std::io::Write;

const RULE_WIDTH: usize = 40;

pub struct ConsolePresenter<W: Write> {
    out: W,
    styled: bool,
}

impl<W: Write> ConsolePresenter<W> {
    /// Plain-text presenter over any writer.
    pub fn new(out: W) -> Self {
        ConsolePresenter { out, styled: false }
    }

    /// Presenter that colours headings when `styled` is set.
    pub fn with_style(out: W, styled: bool) -> Self {
        ConsolePresenter { out, styled }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn heading(&mut self, title: &str) {
        let rule = "=".repeat(RULE_WIDTH);
        let title = if self.styled {
            style(title).bold().cyan().to_string()
        } else {
            title.to_string()
        };
        self.emit(format_args!("\n{rule}\n{title}\n{rule}\n"));
    }

    // A broken stdout must not take the analysis down with it.
    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args) {
            tracing::warn!(error = %e, "failed to write report output");
        }
    }
}

impl<W: Write> ReportSink for ConsolePresenter<W> {
    fn no_result(&mut self) {
        self.emit(format_args!("No results to display\n"));
    }

    fn begin(&mut self, file_name: &str, model: &str, analysis_date: &str) {
        self.heading("RESULTS");
        self.emit(format_args!(
            "\nDocument: {file_name}\nModel Used: {model}\nAnalysis Date: {analysis_date}\n"
        ));
    }

    fn section(&mut self, section: Section) {
        let title = match section {
            Section::Fields => "EXTRACTED FIELDS",
            Section::Tables => "TABLE DATA",
            Section::FullText => "FULL TEXT CONTENT",
        };
        self.heading(title);
    }

    fn document(&mut self, index: usize, doc_type: Option<&str>) {
        self.emit(format_args!("\nDocument {}:\n", index + 1));
        if let Some(doc_type) = doc_type {
            self.emit(format_args!("Document Type: {doc_type}\n"));
        }
    }

    fn field(&mut self, field: &ExtractedField) {
        self.emit(format_args!(
            "  • {}: {} (Confidence: {})\n",
            field.field_name,
            field.value,
            percent(field.confidence, 2)
        ));
    }

    fn no_fields(&mut self) {
        self.emit(format_args!("No structured fields found\n"));
    }

    fn table(&mut self, table: &ExtractedTable, matrix: &CellMatrix) {
        self.emit(format_args!(
            "\nTable {}:\nDimensions: {} rows × {} columns\n",
            table.table_index + 1,
            table.row_count,
            table.column_count
        ));
        for (row_index, row) in matrix.rows().iter().enumerate() {
            self.emit(format_args!("  Row {}: {}\n", row_index, row.join(" | ")));
        }
    }

    fn no_tables(&mut self) {
        self.emit(format_args!("No tables found in the document\n"));
    }

    fn content(&mut self, text: &str) {
        self.emit(format_args!("\n{text}\n"));
    }

    fn page(&mut self, index: usize, text: Option<&str>) {
        self.emit(format_args!("\n--- Page {} ---\n", index + 1));
        if let Some(text) = text {
            self.emit(format_args!("{text}\n"));
        }
    }
}
