//! mdpress - Markdown to sanitized, print-ready HTML
//!
//! The conversion core is a [`pipeline::DocumentPipeline`]: preprocess
//! plugins, the line-oriented block parser, the inline span parser,
//! postprocess plugins and finally the whitelist sanitizer. Around it sit
//! settings, the document template, PDF printing and batch conversion.
//!
//! ```
//! use mdpress::pipeline::DocumentPipeline;
//! use mdpress::settings::Settings;
//!
//! let pipeline = DocumentPipeline::new(Settings::default());
//! let html = pipeline.convert("# Hello\n\nSome **bold** text.").unwrap();
//! assert_eq!(html, "<h1 id=\"hello\">Hello</h1>\n<p>Some <strong>bold</strong> text.</p>");
//! ```

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), warn(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod batch;
pub mod markdown;
pub mod pdf;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod sanitizer;
pub mod settings;
pub mod template;
pub mod url;

pub use pipeline::{ConvertError, DocumentPipeline};
pub use plugin::{PluginDescriptor, Stage};
pub use sanitizer::{Sanitizer, SanitizerPolicy};
pub use settings::Settings;
