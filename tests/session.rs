use docintel_cli::api::{AnalysisError, DocumentAnalyzer, ModelId};
use docintel_cli::flatten::FlatRecord;
use docintel_cli::model::AnalysisResult;
use docintel_cli::ui::{Prompter, Session};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Answers prompts from a fixed script; running out behaves like Ctrl-D.
struct Script(VecDeque<&'static str>);

impl Script {
    fn new(answers: &[&'static str]) -> Self {
        Script(answers.iter().copied().collect())
    }

    fn next(&mut self) -> io::Result<String> {
        self.0
            .pop_front()
            .map(str::to_string)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

impl Prompter for Script {
    fn model_choice(&mut self) -> io::Result<String> {
        self.next()
    }
    fn file_path(&mut self) -> io::Result<String> {
        self.next()
    }
    fn save_json(&mut self) -> io::Result<String> {
        self.next()
    }
    fn analyze_another(&mut self) -> io::Result<String> {
        self.next()
    }
}

/// Returns a canned response and remembers which models were requested.
struct Canned {
    response: Result<&'static str, &'static str>,
    calls: RefCell<Vec<(ModelId, usize)>>,
}

impl Canned {
    fn ok(json: &'static str) -> Self {
        Canned { response: Ok(json), calls: RefCell::new(Vec::new()) }
    }

    fn failing(message: &'static str) -> Self {
        Canned { response: Err(message), calls: RefCell::new(Vec::new()) }
    }
}

impl DocumentAnalyzer for &Canned {
    fn analyze(&self, model: ModelId, document: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        self.calls.borrow_mut().push((model, document.len()));
        match self.response {
            Ok(json) => Ok(serde_json::from_str(json)?),
            Err(message) => Err(AnalysisError::Failed {
                code: "InvalidRequest".into(),
                message: message.into(),
            }),
        }
    }
}

fn input_file(dir: &Path) -> &'static str {
    let path = dir.join("scan.pdf");
    fs::write(&path, b"%PDF-1.7 fake").unwrap();
    Box::leak(path.to_string_lossy().into_owned().into_boxed_str())
}

fn outputs(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with(prefix))
        .collect();
    found.sort();
    found
}

fn run(analyzer: &Canned, answers: &[&'static str], out_dir: &Path) -> String {
    let script = Script::new(answers);
    let mut session = Session::new(analyzer, script, Vec::new(), out_dir.to_path_buf());
    session.run().expect("session ends cleanly");
    String::from_utf8(session.into_output()).unwrap()
}

#[test]
fn saves_text_and_json_then_exits() {
    let input_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let path = input_file(input_dir.path());
    let analyzer = Canned::ok(
        r#"{"content":"Total 125.50","documents":[{"fields":{
            "Total":{"valueNumber":125.50,"confidence":0.98}
        }}]}"#,
    );

    let console = run(&analyzer, &["3", path, "y", "n"], out_dir.path());

    assert_eq!(*analyzer.calls.borrow(), vec![(ModelId::Invoice, 13)]);
    assert!(console.contains("  3. prebuilt-invoice"));
    assert!(console.contains("Using model: prebuilt-invoice"));
    assert!(console.contains("  • Total: 125.50 (Confidence: 98.00%)"));
    assert!(console.contains("Text content saved to: "));
    assert!(console.contains("Structured data saved to: "));
    assert!(console.contains("Goodbye!"));

    let texts = outputs(out_dir.path(), "extracted_scan_");
    assert_eq!(texts.len(), 1);
    assert_eq!(fs::read_to_string(&texts[0]).unwrap(), "Total 125.50");

    let jsons = outputs(out_dir.path(), "analysis_scan_");
    assert_eq!(jsons.len(), 1);
    let record: FlatRecord = serde_json::from_str(&fs::read_to_string(&jsons[0]).unwrap()).unwrap();
    assert_eq!(record.file_name, "scan.pdf");
    assert_eq!(record.model_used, "prebuilt-invoice");
    assert_eq!(record.extracted_fields[0].value, "125.50");
}

#[test]
fn empty_result_writes_no_files_unless_asked() {
    let input_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let path = input_file(input_dir.path());
    let analyzer = Canned::ok("{}");

    let console = run(&analyzer, &["", path, "n", "no"], out_dir.path());

    assert_eq!(analyzer.calls.borrow()[0].0, ModelId::Document);
    assert!(console.contains("No structured fields found"));
    assert!(!console.contains("Text content saved to"));
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn missing_file_and_blank_path_skip_analysis() {
    let out_dir = tempfile::tempdir().unwrap();
    let analyzer = Canned::ok("{}");

    let console = run(&analyzer, &["1", "   ", "2", "/definitely/not/here.pdf"], out_dir.path());

    assert!(console.contains("No file path provided"));
    assert!(console.contains("File not found: /definitely/not/here.pdf"));
    assert!(analyzer.calls.borrow().is_empty());
    assert!(console.contains("Process interrupted by user"));
}

#[test]
fn remote_failure_is_reported_and_loop_continues() {
    let input_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let path = input_file(input_dir.path());
    let analyzer = Canned::failing("Unsupported file format.");

    let console = run(&analyzer, &["2", path, "yes", "2", path, "n"], out_dir.path());

    assert_eq!(analyzer.calls.borrow().len(), 2);
    let reported = "Error analyzing document: \
                    analysis failed (InvalidRequest): Unsupported file format.";
    assert_eq!(console.matches(reported).count(), 2);
    assert_eq!(console.matches("Failed to analyze document").count(), 2);
    assert!(console.contains("Thank you for using Azure Document Intelligence Analyzer!"));
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn unwritable_output_directory_does_not_end_the_session() {
    let input_dir = tempfile::tempdir().unwrap();
    let path = input_file(input_dir.path());
    let missing = input_dir.path().join("no-such-dir");
    let analyzer = Canned::ok(r#"{"content":"text"}"#);

    let console = run(&analyzer, &["1", path, "y", "n"], &missing);

    assert!(console.contains("Error saving file: could not write"));
    assert!(console.contains("Error saving JSON: could not write"));
    assert!(console.contains("Goodbye!"));
}
