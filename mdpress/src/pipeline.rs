//! Document conversion pipeline
//!
//! This module sequences the stages of converting one markdown document:
//! 1. **Preprocess**: plugins rewrite the raw markdown
//! 2. **Block parsing**: lines become block-level HTML
//! 3. **Inline parsing**: span markup inside the blocks becomes HTML
//! 4. **Postprocess**: plugins rewrite the HTML fragment
//! 5. **Sanitize**: the fragment is filtered against the whitelist policy
//!
//! Each stage sees exactly the output of the previous one. All state is set
//! at construction, so one pipeline can convert many documents, including
//! from several threads at once.

use crate::markdown::{parse_blocks, parse_inline};
use crate::plugin::{BoxError, PluginDescriptor, PluginError, PluginRegistry, Stage};
use crate::plugins;
use crate::sanitizer::Sanitizer;
use crate::settings::Settings;
use std::path::Path;
use thiserror::Error;

/// Converts markdown to an HTML fragment
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    settings: Settings,
    plugins: PluginRegistry,
    sanitizer: Sanitizer,
}

impl DocumentPipeline {
    /// Create a pipeline without plugins and with the default sanitizer policy
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            plugins: PluginRegistry::new(),
            sanitizer: Sanitizer::default(),
        }
    }

    /// Create a pipeline with the built-in plugins registered
    ///
    /// # Parameters
    /// * `settings` - Settings for every conversion
    /// * `base_dir` - Directory that relative image paths are resolved against
    ///
    /// # Returns
    /// * `DocumentPipeline` - Pipeline with `local-images`, `remote-images`,
    ///   `highlight` and `toc` registered, in that order
    pub fn with_builtin_plugins(settings: Settings, base_dir: &Path) -> Self {
        let mut pipeline = Self::new(settings);
        for descriptor in plugins::builtin(base_dir) {
            pipeline.register(descriptor);
        }
        pipeline
    }

    /// Replace the sanitizer
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Register a plugin after the ones already registered
    pub fn register(&mut self, descriptor: PluginDescriptor) {
        self.plugins.register(descriptor);
    }

    /// Active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registered plugins
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Convert a markdown document to an HTML fragment
    ///
    /// # Parameters
    /// * `markdown` - Markdown source
    ///
    /// # Returns
    /// * `Ok(String)` - HTML fragment, sanitized unless `sanitize` is off
    /// * `Err(ConvertError)` - A plugin failed; no partial output is produced
    pub fn convert(&self, markdown: &str) -> Result<String, ConvertError> {
        let markdown = self
            .plugins
            .run(Stage::Preprocess, markdown, &self.settings)?;

        let blocks = parse_blocks(&markdown);
        log::debug!("Block parsing produced {} bytes", blocks.len());

        let html = parse_inline(&blocks);
        log::debug!("Inline parsing produced {} bytes", html.len());

        let html = self.plugins.run(Stage::Postprocess, &html, &self.settings)?;

        if self.settings.sanitize {
            let clean = self.sanitizer.sanitize(&html);
            log::debug!("Sanitized {} bytes to {}", html.len(), clean.len());
            Ok(clean)
        } else {
            Ok(html)
        }
    }
}

/// Errors that can occur while converting a document
#[derive(Error, Debug)]
pub enum ConvertError {
    /// A plugin transform returned an error
    #[error("plugin '{plugin}' failed during {stage}: {source}")]
    Plugin {
        /// Stage that was running
        stage: Stage,
        /// Name of the failing plugin
        plugin: String,
        /// Error returned by the transform
        #[source]
        source: BoxError,
    },
}

impl From<PluginError> for ConvertError {
    fn from(error: PluginError) -> Self {
        ConvertError::Plugin {
            stage: error.stage,
            plugin: error.plugin,
            source: error.source,
        }
    }
}
