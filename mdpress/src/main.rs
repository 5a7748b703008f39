//! mdpress - Markdown to print-ready HTML and PDF
//!
//! A CLI tool that converts Markdown documents into sanitized HTML, wraps
//! them in a print stylesheet and optionally prints them to PDF.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConvertOptions};
use mdpress::batch::{self, OutputFormat};
use mdpress::pdf::{BrowserRenderer, PdfRenderer};
use mdpress::pipeline::DocumentPipeline;
use mdpress::settings::{Settings, SettingsOverrides};
use std::path::{Path, PathBuf};

/// Main entry point for the mdpress CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            options,
        } => {
            handle_convert_command(input, output, format, &options)?;
        }

        Commands::Batch {
            input,
            output,
            format,
            jobs,
            options,
        } => {
            handle_batch_command(input, output, format, jobs, &options)?;
        }
    }

    Ok(())
}

/// Initialize logging; `--verbose` shows info messages, `RUST_LOG` applies otherwise
fn init_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }
}

/// Directory containing `path`, `.` for bare file names
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load settings from `--config` or the settings file in `dir`, then apply flags
fn load_settings(
    config: Option<&Path>,
    dir: &Path,
    overrides: &SettingsOverrides,
) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::discover(dir)
            .with_context(|| format!("Failed to load settings from {}", dir.display()))?,
    };

    let settings = settings.with_overrides(overrides);
    settings.validate().context("Invalid command line options")?;
    Ok(settings)
}

/// Create the PDF renderer when the format needs one
fn pdf_renderer(format: OutputFormat, settings: &Settings) -> Result<Option<BrowserRenderer>> {
    match format {
        OutputFormat::Html => Ok(None),
        OutputFormat::Pdf => BrowserRenderer::from_settings(settings)
            .map(Some)
            .context("PDF output needs a Chromium-based browser"),
    }
}

/// Pick the output path and format from the arguments
///
/// An explicit format adds its extension to an output without one; otherwise
/// the format is detected from the output extension, defaulting to HTML.
fn resolve_output(
    input: &Path,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<(PathBuf, OutputFormat)> {
    match (output, format) {
        (Some(mut output), Some(format)) => {
            if output.extension().is_none() {
                output.set_extension(format.extension());
            }
            Ok((output, format))
        }
        (None, Some(format)) => Ok((input.with_extension(format.extension()), format)),
        (Some(mut output), None) => match output.extension().and_then(|s| s.to_str()) {
            None => {
                output.set_extension(OutputFormat::Html.extension());
                Ok((output, OutputFormat::Html))
            }
            Some(ext) => {
                let format = OutputFormat::from_path(&output).with_context(|| {
                    format!(
                        "Unknown output format for extension '.{}'. Supported: .html, .pdf\nUse --format to specify explicitly.",
                        ext
                    )
                })?;
                Ok((output, format))
            }
        },
        (None, None) => Ok((
            input.with_extension(OutputFormat::Html.extension()),
            OutputFormat::Html,
        )),
    }
}

/// Handle the convert command
fn handle_convert_command(
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    options: &ConvertOptions,
) -> Result<()> {
    init_logging(options.verbose);

    let (output, format) = resolve_output(&input, output, format)?;
    if output == input {
        anyhow::bail!("Output {} would overwrite the input", output.display());
    }

    let base_dir = parent_dir(&input);
    let settings = load_settings(options.config.as_deref(), &base_dir, &options.overrides(None))?;
    let renderer = pdf_renderer(format, &settings)?;

    println!("Converting {} -> {}", input.display(), output.display());

    let pipeline = DocumentPipeline::with_builtin_plugins(settings, &base_dir);
    batch::convert_file(
        &pipeline,
        &input,
        &output,
        format,
        renderer.as_ref().map(|r| r as &dyn PdfRenderer),
    )
    .with_context(|| format!("Failed to convert {}", input.display()))?;

    println!("✓ Successfully wrote: {}", output.display());
    Ok(())
}

/// Handle the batch command
fn handle_batch_command(
    input: PathBuf,
    output: PathBuf,
    format: OutputFormat,
    jobs: Option<usize>,
    options: &ConvertOptions,
) -> Result<()> {
    init_logging(options.verbose);

    let settings = load_settings(options.config.as_deref(), &input, &options.overrides(jobs))?;
    let renderer = pdf_renderer(format, &settings)?;

    println!("Converting documents in {}", input.display());
    println!("Output: {}", output.display());

    let report = batch::convert_all(
        &input,
        &output,
        &settings,
        format,
        renderer.as_ref().map(|r| r as &dyn PdfRenderer),
    )
    .with_context(|| format!("Failed to convert documents in {}", input.display()))?;

    for failure in &report.failed {
        eprintln!("✗ {}: {}", failure.input.display(), failure.error);
    }
    println!("✓ Converted {} documents", report.converted.len());

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} documents failed",
            report.failed.len(),
            report.failed.len() + report.converted.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_output_defaults_to_html() {
        let (output, format) = resolve_output(Path::new("docs/a.md"), None, None).unwrap();
        assert_eq!(output, PathBuf::from("docs/a.html"));
        assert_eq!(format, OutputFormat::Html);
    }

    #[test]
    fn test_resolve_output_detects_pdf() {
        let (output, format) =
            resolve_output(Path::new("a.md"), Some(PathBuf::from("out/a.pdf")), None).unwrap();
        assert_eq!(output, PathBuf::from("out/a.pdf"));
        assert_eq!(format, OutputFormat::Pdf);
    }

    #[test]
    fn test_resolve_output_adds_extension() {
        let (output, _) = resolve_output(
            Path::new("a.md"),
            Some(PathBuf::from("out/report")),
            Some(OutputFormat::Pdf),
        )
        .unwrap();
        assert_eq!(output, PathBuf::from("out/report.pdf"));
    }

    #[test]
    fn test_resolve_output_unknown_extension() {
        let result = resolve_output(Path::new("a.md"), Some(PathBuf::from("a.docx")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir(Path::new("a.md")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("docs/a.md")), PathBuf::from("docs"));
    }
}
