// Library root
// -----------
// This crate exposes the pieces of the `docintel` CLI as a library so the
// binary (`main.rs`) stays small and the flow can be tested end to end.
//
// Module responsibilities:
// - `config`: endpoint, key and tuning knobs from the environment.
// - `api`: blocking client for the remote analysis service, behind the
//   `DocumentAnalyzer` trait.
// - `model`: optional-field model of the service's analysis result.
// - `flatten`: turns an analysis result into a flat, serializable record
//   while feeding a report sink.
// - `report`: console presenter for that report.
// - `output`: writes extracted text and JSON records to disk.
// - `ui`: the interactive loop tying it all together.
pub mod api;
pub mod config;
pub mod flatten;
pub mod model;
pub mod output;
pub mod report;
pub mod ui;
