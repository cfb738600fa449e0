// UI layer: the interactive analysis loop. Prompts go through the
// `Prompter` trait (dialoguer in the real binary, a script in tests) and
// all console text goes to one writer, so a whole session can be replayed
// without a terminal or a network.

use crate::api::{DocumentAnalyzer, ModelId};
use crate::flatten::{flatten, FlatRecord};
use crate::output::{save_json, save_text};
use crate::report::ConsolePresenter;
use anyhow::Result;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const APP_TITLE: &str = "Azure Document Intelligence Analyzer";

/// Source of the user's answers. Each method returns the raw answer; an
/// `Interrupted` or `UnexpectedEof` error means the user wants out.
pub trait Prompter {
    fn model_choice(&mut self) -> io::Result<String>;
    fn file_path(&mut self) -> io::Result<String>;
    fn save_json(&mut self) -> io::Result<String>;
    fn analyze_another(&mut self) -> io::Result<String>;
}

/// `dialoguer`-backed prompts for the terminal.
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn ask(prompt: &str, default: Option<&str>) -> io::Result<String> {
        let mut input = Input::<String>::new();
        input.with_prompt(prompt).allow_empty(true);
        if let Some(d) = default {
            input.default(d.to_string()).show_default(false);
        }
        input.interact_text()
    }
}

impl Prompter for TerminalPrompter {
    fn model_choice(&mut self) -> io::Result<String> {
        Self::ask("Select model (1-3) [default: 1]", Some("1"))
    }

    fn file_path(&mut self) -> io::Result<String> {
        Self::ask("Enter local file path", None)
    }

    fn save_json(&mut self) -> io::Result<String> {
        Self::ask("Save structured data as JSON? (y/n)", None)
    }

    fn analyze_another(&mut self) -> io::Result<String> {
        Self::ask("Analyze another document? (y/n)", None)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// One interactive session: a long-lived analyzer, a prompter and the
/// console writer.
pub struct Session<A, P, W>
where
    A: DocumentAnalyzer,
    P: Prompter,
    W: Write,
{
    analyzer: A,
    prompter: P,
    out: W,
    output_dir: PathBuf,
    styled: bool,
}

impl<A, P, W> Session<A, P, W>
where
    A: DocumentAnalyzer,
    P: Prompter,
    W: Write,
{
    pub fn new(analyzer: A, prompter: P, out: W, output_dir: PathBuf) -> Self {
        Session {
            analyzer,
            prompter,
            out,
            output_dir,
            styled: false,
        }
    }

    /// Colour report headings (only sensible when `out` is a terminal).
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until the user declines to continue or interrupts a prompt.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.run_once() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => {
                    writeln!(self.out, "\nThank you for using {APP_TITLE}!")?;
                    writeln!(self.out, "Goodbye!")?;
                    return Ok(());
                }
                Err(e) if is_interrupt(&e) => {
                    writeln!(self.out, "\n\nProcess interrupted by user")?;
                    writeln!(self.out, "Goodbye!")?;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn run_once(&mut self) -> io::Result<Flow> {
        writeln!(self.out, "\nAvailable Models:")?;
        for model in ModelId::ALL {
            writeln!(self.out, "  {}. {}", model.menu_key(), model)?;
        }
        let model = ModelId::from_choice(&self.prompter.model_choice()?);

        let raw_path = self.prompter.file_path()?;
        let file_path = raw_path.trim();
        if file_path.is_empty() {
            writeln!(self.out, "No file path provided")?;
            return Ok(Flow::Continue);
        }
        let path = Path::new(file_path);
        if !path.exists() {
            writeln!(self.out, "File not found: {file_path}")?;
            return Ok(Flow::Continue);
        }

        if let Some(record) = self.analyze(model, path)? {
            self.persist(&record, path)?;
        } else {
            writeln!(self.out, "Failed to analyze document")?;
        }

        writeln!(self.out, "\n{}", "=".repeat(50))?;
        let answer = self.prompter.analyze_another()?.trim().to_lowercase();
        if answer == "y" || answer == "yes" {
            Ok(Flow::Continue)
        } else {
            Ok(Flow::Quit)
        }
    }

    /// Read, submit, then flatten and print. Remote and read failures are
    /// reported and yield `None`.
    fn analyze(&mut self, model: ModelId, path: &Path) -> io::Result<Option<FlatRecord>> {
        writeln!(self.out, "Analyzing document: {}", path.display())?;
        writeln!(self.out, "Using model: {model}")?;

        let outcome = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                    spinner.set_style(style);
                }
                spinner.set_message("Waiting for analysis...");
                spinner.enable_steady_tick(Duration::from_millis(120));
                let result = self.analyzer.analyze(model, &bytes);
                spinner.finish_and_clear();
                result.map_err(|e| e.to_string())
            });

        let result = match outcome {
            Ok(result) => {
                writeln!(self.out, "Analysis completed successfully")?;
                result
            }
            Err(message) => {
                warn!(path = %path.display(), model = %model, error = %message, "analysis failed");
                writeln!(self.out, "Error analyzing document: {message}")?;
                return Ok(None);
            }
        };

        let mut presenter = ConsolePresenter::with_style(&mut self.out, self.styled);
        Ok(flatten(Some(&result), model.as_str(), path, &mut presenter))
    }

    /// Each write is attempted and reported on its own.
    fn persist(&mut self, record: &FlatRecord, path: &Path) -> io::Result<()> {
        let original = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.file_name.clone());

        if !record.full_text.is_empty() {
            match save_text(&self.output_dir, &record.full_text, &original) {
                Ok(saved) => writeln!(self.out, "\nText content saved to: {}", saved.display())?,
                Err(e) => writeln!(self.out, "Error saving file: {e}")?,
            }
        }

        let answer = self.prompter.save_json()?.trim().to_lowercase();
        if answer == "y" {
            match save_json(&self.output_dir, record, &original) {
                Ok(saved) => writeln!(self.out, "Structured data saved to: {}", saved.display())?,
                Err(e) => writeln!(self.out, "Error saving JSON: {e}")?,
            }
        }
        Ok(())
    }
}

fn is_interrupt(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
    )
}
