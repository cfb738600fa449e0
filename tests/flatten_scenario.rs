use docintel_cli::flatten::{
    flatten, CellMatrix, ExtractedCell, ExtractedField, ExtractedTable, FlatRecord, ReportSink,
};
use docintel_cli::model::AnalysisResult;
use pretty_assertions::assert_eq;
use std::path::Path;

const INVOICE: &str = include_str!("fixtures/invoice_result.json");

#[derive(Default)]
struct Matrices(Vec<Vec<Vec<String>>>);

impl ReportSink for Matrices {
    fn table(&mut self, _table: &ExtractedTable, matrix: &CellMatrix) {
        self.0.push(matrix.rows().to_vec());
    }
}

fn invoice() -> AnalysisResult {
    serde_json::from_str(INVOICE).expect("fixture parses")
}

fn flat(result: &AnalysisResult, model: &str, file: &str) -> FlatRecord {
    flatten(Some(result), model, Path::new(file), &mut ()).expect("record")
}

#[test]
fn invoice_result_flattens_to_expected_record() {
    let mut sink = Matrices::default();
    let record = flatten(
        Some(&invoice()),
        "prebuilt-invoice",
        Path::new("inbox/invoice-0042.pdf"),
        &mut sink,
    )
    .expect("record");

    assert_eq!(record.file_name, "invoice-0042.pdf");
    assert_eq!(record.model_used, "prebuilt-invoice");
    assert_eq!(
        record.extracted_fields,
        vec![ExtractedField {
            field_name: "Total".into(),
            value: "125.50".into(),
            confidence: 0.98,
        }]
    );
    assert_eq!(
        record.tables,
        vec![ExtractedTable {
            table_index: 0,
            row_count: 2,
            column_count: 2,
            cells: vec![ExtractedCell {
                row: 0,
                column: 0,
                content: "A".into(),
                confidence: 0.9,
            }],
        }]
    );
    assert_eq!(
        sink.0,
        vec![vec![
            vec!["A (90.0%)".to_string(), String::new()],
            vec![String::new(), String::new()],
        ]]
    );
    assert_eq!(record.full_text, "Hello world");
}

#[test]
fn analysis_date_looks_like_a_local_timestamp() {
    let record = flat(&invoice(), "prebuilt-invoice", "a.pdf");
    let date = &record.analysis_date;
    assert!(chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").is_ok(), "{date}");
}

#[test]
fn field_order_follows_the_response() {
    let json = r#"{"documents":[
        {"fields":{"Zeta":{"valueString":"z"},"Alpha":{"valueString":"a"}}},
        {"fields":{"Mid":{"content":"m","confidence":0.4}}}
    ]}"#;
    let result: AnalysisResult = serde_json::from_str(json).unwrap();
    let record = flat(&result, "prebuilt-document", "x.pdf");

    let triples: Vec<(&str, &str, f64)> = record
        .extracted_fields
        .iter()
        .map(|f| (f.field_name.as_str(), f.value.as_str(), f.confidence))
        .collect();
    assert_eq!(triples, vec![("Zeta", "z", 0.0), ("Alpha", "a", 0.0), ("Mid", "m", 0.4)]);
}

#[test]
fn missing_confidence_serializes_as_zero() {
    let json = r#"{
        "documents":[{"fields":{"Name":{"valueString":"Ada"}}}],
        "tables":[{"rowCount":1,"columnCount":1,"cells":[
            {"rowIndex":0,"columnIndex":0,"content":"c"}
        ]}]
    }"#;
    let result: AnalysisResult = serde_json::from_str(json).unwrap();
    let record = flat(&result, "prebuilt-layout", "x.pdf");

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["extracted_fields"][0]["confidence"].as_f64(), Some(0.0));
    assert_eq!(value["tables"][0]["cells"][0]["confidence"].as_f64(), Some(0.0));
}

#[test]
fn record_survives_a_json_round_trip() {
    let record = flat(&invoice(), "prebuilt-invoice", "résumé.pdf");

    let json = serde_json::to_string_pretty(&record).unwrap();
    assert!(json.contains("\n  \"file_name\": \"résumé.pdf\""));

    let back: FlatRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn sparse_result_yields_empty_record() {
    let result: AnalysisResult = serde_json::from_str("{}").unwrap();
    let record = flat(&result, "prebuilt-document", "blank.png");
    assert!(record.extracted_fields.is_empty());
    assert!(record.tables.is_empty());
    assert_eq!(record.full_text, "");
}

#[test]
fn null_entries_do_not_fail_the_analysis() {
    let json = r#"{
        "documents":[{"fields":{"Broken":null,"Total":{"valueString":"9.99"}}}],
        "tables":[{"rowCount":1,"columnCount":1,"cells":[
            {"rowIndex":null,"columnIndex":null,"content":"only"}
        ]}]
    }"#;
    let result: AnalysisResult = serde_json::from_str(json).expect("nulls are tolerated");
    let record = flat(&result, "prebuilt-invoice", "nulls.pdf");

    let names: Vec<&str> = record.extracted_fields.iter().map(|f| f.field_name.as_str()).collect();
    assert_eq!(names, vec!["Total"]);
    assert_eq!(record.tables[0].cells[0].content, "only");
    assert_eq!((record.tables[0].cells[0].row, record.tables[0].cells[0].column), (0, 0));
}
