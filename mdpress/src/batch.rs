//! File conversion, one document or a whole directory
//!
//! Batch conversion discovers markdown files below a directory, converts
//! them concurrently (feature `parallel`) and mirrors the directory layout in
//! the output directory. A failing document never stops the others; every
//! outcome is collected into a [`BatchReport`].

use crate::pdf::{PdfError, PdfRenderer};
use crate::pipeline::{ConvertError, DocumentPipeline};
use crate::settings::Settings;
use crate::template::{document_title, render_document, TemplateError};
use itertools::Itertools;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Extensions treated as markdown
const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Standalone HTML document
    Html,
    /// PDF printed by a headless browser
    Pdf,
}

impl OutputFormat {
    /// Detect the format from an output file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(OutputFormat::Html),
            "pdf" => Some(OutputFormat::Pdf),
            _ => None,
        }
    }

    /// File extension for the format
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// Errors that can occur when converting files
#[derive(Error, Debug)]
pub enum BatchError {
    /// The markdown file could not be read
    #[error("Failed to read {path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be written
    #[error("Failed to write {path}: {source}", path = .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The batch input is not a directory
    #[error("Not a directory: {path}", path = .0.display())]
    NotADirectory(PathBuf),

    /// The pipeline failed
    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    /// The document template failed
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// PDF rendering failed
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// PDF output without a renderer
    #[error("PDF output requested without a PDF renderer")]
    NoRenderer,

    /// The worker pool could not be created
    #[error("Failed to start worker threads: {0}")]
    ThreadPool(String),
}

/// A document that could not be converted
#[derive(Debug)]
pub struct BatchFailure {
    /// Markdown file
    pub input: PathBuf,
    /// What went wrong
    pub error: BatchError,
}

/// Outcome of a batch conversion
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Output files written, in input order
    pub converted: Vec<PathBuf>,
    /// Documents that failed, in input order
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether every document was converted
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Find markdown files below a directory
///
/// # Parameters
/// * `dir` - Directory to search recursively
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Markdown files, sorted by path
/// * `Err(BatchError)` - `dir` is not a directory
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }

    let files = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .map(|e| e.path().to_path_buf())
        .sorted()
        .collect();

    Ok(files)
}

/// Convert markdown to the bytes of an output file
///
/// # Parameters
/// * `pipeline` - Pipeline doing the conversion
/// * `markdown` - Markdown source
/// * `format` - Output format
/// * `renderer` - PDF renderer, required for [`OutputFormat::Pdf`]
///
/// # Returns
/// * `Ok(Vec<u8>)` - Complete HTML document or PDF
/// * `Err(BatchError)` - Conversion, template or PDF failure
pub fn render_output(
    pipeline: &DocumentPipeline,
    markdown: &str,
    format: OutputFormat,
    renderer: Option<&dyn PdfRenderer>,
) -> Result<Vec<u8>, BatchError> {
    let fragment = pipeline.convert(markdown)?;
    let settings = pipeline.settings();
    let title = document_title(&fragment, settings);
    let html = render_document(&fragment, settings, &title)?;

    match format {
        OutputFormat::Html => Ok(html.into_bytes()),
        OutputFormat::Pdf => {
            let renderer = renderer.ok_or(BatchError::NoRenderer)?;
            Ok(renderer.render(&html)?)
        }
    }
}

/// Convert one markdown file
pub fn convert_file(
    pipeline: &DocumentPipeline,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    renderer: Option<&dyn PdfRenderer>,
) -> Result<(), BatchError> {
    let markdown = fs::read_to_string(input).map_err(|source| BatchError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let bytes = render_output(pipeline, &markdown, format, renderer)?;

    let write_error = |source| BatchError::Write {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(output, bytes).map_err(write_error)?;

    log::info!("Wrote {}", output.display());
    Ok(())
}

/// Convert every markdown file below `input_dir` into `output_dir`
///
/// Relative image paths of each document resolve against the document's own
/// directory, so one pipeline with the built-in plugins is built per source
/// directory and shared by the documents in it.
///
/// # Parameters
/// * `input_dir` - Directory searched for markdown files
/// * `output_dir` - Directory receiving the converted files
/// * `settings` - Settings for every document (`batch.concurrency` bounds the workers)
/// * `format` - Output format
/// * `renderer` - PDF renderer, required for [`OutputFormat::Pdf`]
///
/// # Returns
/// * `Ok(BatchReport)` - Every document was attempted
/// * `Err(BatchError)` - Discovery or worker startup failed
pub fn convert_all(
    input_dir: &Path,
    output_dir: &Path,
    settings: &Settings,
    format: OutputFormat,
    renderer: Option<&dyn PdfRenderer>,
) -> Result<BatchReport, BatchError> {
    let inputs = discover(input_dir)?;
    log::info!("Found {} markdown files in {}", inputs.len(), input_dir.display());

    let pipelines: HashMap<PathBuf, DocumentPipeline> = inputs
        .iter()
        .filter_map(|input| input.parent())
        .unique()
        .map(|dir| {
            (
                dir.to_path_buf(),
                DocumentPipeline::with_builtin_plugins(settings.clone(), dir),
            )
        })
        .collect();

    let jobs: Vec<(PathBuf, PathBuf)> = inputs
        .into_iter()
        .map(|input| {
            let relative = input.strip_prefix(input_dir).unwrap_or(&input);
            let output = output_dir.join(relative).with_extension(format.extension());
            (input, output)
        })
        .collect();

    let run = |(input, output): &(PathBuf, PathBuf)| -> Result<PathBuf, BatchFailure> {
        let pipeline = input
            .parent()
            .and_then(|dir| pipelines.get(dir))
            .ok_or_else(|| BatchFailure {
                input: input.clone(),
                error: BatchError::NotADirectory(input.clone()),
            })?;
        convert_file(pipeline, input, output, format, renderer)
            .map(|()| output.clone())
            .map_err(|error| {
                log::warn!("Failed to convert {}: {}", input.display(), error);
                BatchFailure {
                    input: input.clone(),
                    error,
                }
            })
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Result<PathBuf, BatchFailure>> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.worker_count())
            .build()
            .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
        pool.install(|| jobs.par_iter().map(run).collect())
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<PathBuf, BatchFailure>> = jobs.iter().map(run).collect();

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(output) => report.converted.push(output),
            Err(failure) => report.failed.push(failure),
        }
    }

    log::info!(
        "Converted {} documents, {} failed",
        report.converted.len(),
        report.failed.len()
    );
    Ok(report)
}
