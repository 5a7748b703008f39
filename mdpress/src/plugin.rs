//! Plugin registry
//!
//! Plugins are named text transforms that run either on the raw markdown
//! before block parsing (preprocess) or on the rendered HTML after inline
//! parsing (postprocess). The registry keeps them in registration order and
//! threads the content through every plugin of the requested stage.

use crate::settings::Settings;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error type returned by plugin transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A plugin transform
///
/// The `Send + Sync` bound lets one pipeline be shared by batch workers.
pub type TransformFn = Arc<dyn Fn(&str, &Settings) -> Result<String, BoxError> + Send + Sync>;

/// When a plugin runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// On the raw markdown, before block parsing
    Preprocess,
    /// On the HTML fragment, after inline parsing
    Postprocess,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preprocess => write!(f, "preprocess"),
            Stage::Postprocess => write!(f, "postprocess"),
        }
    }
}

/// A plugin as handed to [`PluginRegistry::register`]
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Name reported in logs and errors
    pub name: String,
    /// Declared stage; `None` runs as postprocess
    pub stage: Option<Stage>,
    /// The transform; descriptors without one are not registered
    pub transform: Option<TransformFn>,
}

impl PluginDescriptor {
    /// Create a descriptor with an explicit stage
    pub fn new<F>(name: impl Into<String>, stage: Stage, transform: F) -> Self
    where
        F: Fn(&str, &Settings) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            stage: Some(stage),
            transform: Some(Arc::new(transform)),
        }
    }

    /// Create a preprocess plugin
    pub fn preprocess<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str, &Settings) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self::new(name, Stage::Preprocess, transform)
    }

    /// Create a postprocess plugin
    pub fn postprocess<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str, &Settings) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self::new(name, Stage::Postprocess, transform)
    }

    /// Stage the plugin runs in
    pub fn effective_stage(&self) -> Stage {
        self.stage.unwrap_or(Stage::Postprocess)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A plugin transform failed
#[derive(Error, Debug)]
#[error("plugin '{plugin}' failed during {stage}: {source}")]
pub struct PluginError {
    /// Stage that was running
    pub stage: Stage,
    /// Name of the failing plugin
    pub plugin: String,
    /// Error returned by the transform
    #[source]
    pub source: BoxError,
}

/// A registered plugin
#[derive(Clone)]
struct Plugin {
    name: String,
    stage: Stage,
    transform: TransformFn,
}

/// Ordered list of plugins
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin
    ///
    /// A descriptor without a transform is ignored.
    pub fn register(&mut self, descriptor: PluginDescriptor) {
        let stage = descriptor.effective_stage();
        let Some(transform) = descriptor.transform else {
            log::debug!("Ignoring plugin '{}' without a transform", descriptor.name);
            return;
        };

        log::debug!("Registered {} plugin '{}'", stage, descriptor.name);
        self.plugins.push(Plugin {
            name: descriptor.name,
            stage,
            transform,
        });
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names of the registered plugins in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name.as_str())
    }

    /// Run every plugin of `stage` in registration order
    ///
    /// # Parameters
    /// * `stage` - Stage to run
    /// * `content` - Markdown (preprocess) or HTML (postprocess)
    /// * `settings` - Active settings passed to each transform
    ///
    /// # Returns
    /// * `Ok(String)` - Content after the last matching plugin
    /// * `Err(PluginError)` - The first transform that failed
    pub fn run(&self, stage: Stage, content: &str, settings: &Settings) -> Result<String, PluginError> {
        let mut current = content.to_string();

        for plugin in self.plugins.iter().filter(|p| p.stage == stage) {
            log::debug!("Running {} plugin '{}'", stage, plugin.name);
            current = (plugin.transform)(&current, settings).map_err(|source| PluginError {
                stage,
                plugin: plugin.name.clone(),
                source,
            })?;
        }

        Ok(current)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
