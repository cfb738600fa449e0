// API client module: a small blocking HTTP client for the document
// analysis REST service. Submitting a document starts a remote job; the
// client then polls the job until it finishes, so `analyze` simply blocks
// the calling thread until a result (or an error) is available.

use crate::config::Config;
use crate::model::AnalysisResult;
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";

/// The prebuilt models offered in the menu, in menu order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelId {
    /// General documents: contracts, letters, reports; text plus key-value pairs.
    Document,
    /// Layout analysis: tables, columns and structure.
    Layout,
    /// Invoices, receipts and bills: vendor, totals, dates, line items.
    Invoice,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::Document, ModelId::Layout, ModelId::Invoice];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Document => "prebuilt-document",
            ModelId::Layout => "prebuilt-layout",
            ModelId::Invoice => "prebuilt-invoice",
        }
    }

    /// Number shown next to the model in the menu (1-based).
    pub fn menu_key(self) -> usize {
        match self {
            ModelId::Document => 1,
            ModelId::Layout => 2,
            ModelId::Invoice => 3,
        }
    }

    /// Map a menu answer to a model. Blank or unknown answers pick the
    /// general document model.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "2" => ModelId::Layout,
            "3" => ModelId::Invoice,
            _ => ModelId::Document,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("service response is missing the Operation-Location header")]
    MissingOperationLocation,
    #[error("analysis failed ({code}): {message}")]
    Failed { code: String, message: String },
    #[error("unknown analysis status: {0}")]
    UnknownStatus(String),
    #[error("analysis succeeded but returned no result")]
    MissingResult,
    #[error("analysis did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that can turn document bytes into an analysis result. The UI
/// loop only depends on this, which keeps it testable without a network.
pub trait DocumentAnalyzer {
    fn analyze(&self, model: ModelId, document: &[u8]) -> Result<AnalysisResult, AnalysisError>;
}

/// Blocking client for the remote service. Holds the reqwest client, the
/// endpoint and key, and the polling schedule; read-only once built.
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ServiceError>,
    #[serde(default)]
    analyze_result: Option<AnalysisResult>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ServiceError {
    code: String,
    message: String,
}

/// Outcome of one status poll.
#[derive(Debug)]
enum Poll {
    Pending,
    Done(AnalysisResult),
}

impl AnalysisClient {
    /// Create a client for the endpoint and key in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(AnalysisClient {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            poll_interval: config.poll_interval,
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn analyze_url(&self, model: ModelId) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, model, self.api_version
        )
    }

    /// Submit the document and return the job's status URL.
    fn submit(&self, model: ModelId, document: &[u8]) -> Result<String, AnalysisError> {
        let url = self.analyze_url(model);
        let body = serde_json::json!({ "base64Source": STANDARD.encode(document) });
        info!(model = %model, bytes = document.len(), "submitting document for analysis");

        let res = self
            .client
            .post(&url)
            .header(KEY_HEADER, &self.api_key)
            .json(&body)
            .send()?;
        let res = check_status(res)?;

        res.headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(AnalysisError::MissingOperationLocation)
    }

    fn poll(&self, location: &str) -> Result<Poll, AnalysisError> {
        let res = self.client.get(location).header(KEY_HEADER, &self.api_key).send()?;
        let text = check_status(res)?.text()?;
        let op: OperationStatus = serde_json::from_str(&text)?;
        debug!(status = %op.status, "polled analysis status");
        interpret(op)
    }
}

impl DocumentAnalyzer for AnalysisClient {
    fn analyze(&self, model: ModelId, document: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        let location = self.submit(model, document)?;
        let started = Instant::now();
        loop {
            thread::sleep(self.poll_interval);
            if let Poll::Done(result) = self.poll(&location)? {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(model = %model, elapsed_ms, "analysis completed");
                return Ok(result);
            }
            if started.elapsed() >= self.timeout {
                return Err(AnalysisError::TimedOut(self.timeout));
            }
        }
    }
}

fn check_status(res: Response) -> Result<Response, AnalysisError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().unwrap_or_default();
    Err(AnalysisError::Service { status, body })
}

fn interpret(op: OperationStatus) -> Result<Poll, AnalysisError> {
    match op.status.as_str() {
        "succeeded" => op
            .analyze_result
            .map(Poll::Done)
            .ok_or(AnalysisError::MissingResult),
        "failed" => {
            let err = op.error.unwrap_or_default();
            Err(AnalysisError::Failed {
                code: err.code,
                message: err.message,
            })
        }
        "notStarted" | "running" => Ok(Poll::Pending),
        other => Err(AnalysisError::UnknownStatus(other.to_string())),
    }
}
