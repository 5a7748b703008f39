//! Command-line interface definitions for mdpress

use clap::{Args, Parser, Subcommand};
use mdpress::batch::OutputFormat;
use mdpress::settings::SettingsOverrides;
use std::path::PathBuf;

/// CLI structure for the mdpress application
#[derive(Parser)]
#[command(name = "mdpress")]
#[command(version)]
#[command(about = "Markdown to sanitized, print-ready HTML and PDF", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for mdpress
#[derive(Subcommand)]
pub enum Commands {
    /// Convert one markdown file to HTML or PDF
    Convert {
        /// Markdown file to convert
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to the input name with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (detected from the output extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        options: ConvertOptions,
    },

    /// Convert every markdown file below a directory
    Batch {
        /// Directory searched recursively for .md files
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Directory receiving the converted files
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: OutputFormat,

        /// Number of documents converted at once (0 = number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        options: ConvertOptions,
    },
}

/// Options shared by both subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Settings file (defaults to mdpress.toml next to the input)
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Document title when the input has no level 1 heading
    #[arg(long)]
    pub title: Option<String>,

    /// Skip the sanitizer (trusted input only)
    #[arg(long)]
    pub no_sanitize: bool,

    /// Insert a table of contents
    #[arg(long)]
    pub toc: bool,

    /// Highlight fenced code blocks
    #[arg(long)]
    pub highlight: bool,

    /// Keep images loaded over http(s)
    #[arg(long)]
    pub allow_remote_images: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertOptions {
    /// Settings overrides given by these flags
    pub fn overrides(&self, jobs: Option<usize>) -> SettingsOverrides {
        SettingsOverrides {
            no_sanitize: self.no_sanitize,
            toc: self.toc,
            highlight: self.highlight,
            allow_remote_images: self.allow_remote_images,
            jobs,
            title: self.title.clone(),
        }
    }
}
