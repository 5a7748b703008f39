//! PDF output through a headless browser
//!
//! The HTML document is written to a temporary directory and printed with a
//! Chromium-family browser (`--headless --print-to-pdf`). Page size and
//! margins come from the `@page` rule of the document's stylesheet.

use crate::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Executables tried, in order, when no browser is configured
const BROWSER_CANDIDATES: [&str; 7] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "microsoft-edge",
    "msedge",
];

/// Turns a complete HTML document into PDF bytes
pub trait PdfRenderer: Send + Sync {
    /// Render an HTML document
    ///
    /// # Parameters
    /// * `html` - Complete HTML document
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - PDF file contents
    /// * `Err(PdfError)` - The renderer could not produce a PDF
    fn render(&self, html: &str) -> Result<Vec<u8>, PdfError>;
}

/// Errors that can occur during PDF rendering
#[derive(Error, Debug)]
pub enum PdfError {
    /// No browser configured and none found on PATH
    #[error("No headless browser found; set pdf.browser in mdpress.toml")]
    BrowserNotFound,

    /// IO error around the temporary files
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The browser could not be started
    #[error("Failed to launch {path}: {source}", path = .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser exited with an error
    #[error("Browser exited with {status}: {stderr}")]
    BrowserFailed { status: String, stderr: String },

    /// The browser exited successfully without writing the PDF
    #[error("Browser did not produce {path}", path = .0.display())]
    MissingOutput(PathBuf),
}

/// Renders PDFs with a headless Chromium-family browser
#[derive(Debug, Clone)]
pub struct BrowserRenderer {
    browser: PathBuf,
}

impl BrowserRenderer {
    /// Use a specific browser executable
    pub fn new(browser: impl Into<PathBuf>) -> Self {
        Self {
            browser: browser.into(),
        }
    }

    /// Use the configured browser, or the first one found on PATH
    pub fn from_settings(settings: &Settings) -> Result<Self, PdfError> {
        if let Some(browser) = &settings.pdf.browser {
            return Ok(Self::new(browser.clone()));
        }

        let browser = find_on_path(&BROWSER_CANDIDATES).ok_or(PdfError::BrowserNotFound)?;
        log::info!("Using browser {}", browser.display());
        Ok(Self::new(browser))
    }

    /// Browser executable
    pub fn browser(&self) -> &Path {
        &self.browser
    }
}

impl PdfRenderer for BrowserRenderer {
    fn render(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("document.html");
        let output = workdir.path().join("document.pdf");
        fs::write(&input, html)?;

        log::debug!("Printing {} with {}", input.display(), self.browser.display());
        let result = Command::new(&self.browser)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(&input)
            .output()
            .map_err(|source| PdfError::Launch {
                path: self.browser.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(PdfError::BrowserFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !output.is_file() {
            return Err(PdfError::MissingOutput(output));
        }
        Ok(fs::read(&output)?)
    }
}

/// First executable among `names` found in a PATH directory
fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();

    names.iter().find_map(|name| {
        dirs.iter()
            .flat_map(|dir| {
                [
                    dir.join(name),
                    dir.join(format!("{}.exe", name)),
                ]
            })
            .find(|candidate| candidate.is_file())
    })
}
