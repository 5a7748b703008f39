//! Conversion settings from mdpress.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the settings file looked up next to the input
pub const SETTINGS_FILE: &str = "mdpress.toml";

/// Upper bound for `batch.concurrency`
const MAX_CONCURRENCY: usize = 256;

/// Settings shared by every stage of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Run the sanitizer on the final HTML
    pub sanitize: bool,

    /// Enable the syntax highlighting plugin
    pub highlight: bool,

    /// Enable the table of contents plugin
    pub toc: bool,

    /// Security related switches
    pub security: SecuritySettings,

    /// Page layout used by the template and PDF output
    pub page: PageSettings,

    /// Batch conversion options
    pub batch: BatchSettings,

    /// PDF rendering options
    pub pdf: PdfSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sanitize: true,
            highlight: false,
            toc: false,
            security: SecuritySettings::default(),
            page: PageSettings::default(),
            batch: BatchSettings::default(),
            pdf: PdfSettings::default(),
        }
    }
}

/// Security related switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecuritySettings {
    /// Keep `<img>` tags that load from `http(s)://`
    pub allow_remote_images: bool,
}

/// Page layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSettings {
    /// Document title used when the input has no level 1 heading
    pub title: String,

    /// CSS page size (e.g., "A4", "Letter", "210mm 297mm")
    pub format: String,

    /// CSS page margin (e.g., "15mm")
    pub margin: String,

    /// Custom HTML template replacing the built-in one
    pub template: Option<PathBuf>,

    /// Extra stylesheet appended after the built-in CSS
    pub stylesheet: Option<PathBuf>,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            title: "Document".to_string(),
            format: "A4".to_string(),
            margin: "15mm".to_string(),
            template: None,
            stylesheet: None,
        }
    }
}

/// Batch conversion options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Number of documents converted at once (0 = number of CPUs)
    pub concurrency: usize,
}

/// PDF rendering options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfSettings {
    /// Browser executable; searched on PATH when unset
    pub browser: Option<PathBuf>,
}

/// Values given on the command line, applied on top of the file settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    /// `--no-sanitize`
    pub no_sanitize: bool,
    /// `--toc`
    pub toc: bool,
    /// `--highlight`
    pub highlight: bool,
    /// `--allow-remote-images`
    pub allow_remote_images: bool,
    /// `--jobs`
    pub jobs: Option<usize>,
    /// `--title`
    pub title: Option<String>,
}

impl Settings {
    /// Load settings from a mdpress.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// * `Ok(Settings)` - Successfully loaded and validated settings
    /// * `Err(SettingsError)` - Error reading, parsing or validating the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(path.to_path_buf(), e))?;

        let mut settings = Self::from_toml_str(&content)?;
        settings.resolve_paths(path.parent().unwrap_or_else(|| Path::new("")));
        log::debug!("Loaded settings from {}", path.display());

        Ok(settings)
    }

    /// Load settings from `dir/mdpress.toml` if it exists, defaults otherwise
    pub fn discover(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join(SETTINGS_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.page.format.trim().is_empty() {
            return Err(SettingsError::Invalid("page.format must not be empty".to_string()));
        }
        if self.page.margin.trim().is_empty() {
            return Err(SettingsError::Invalid("page.margin must not be empty".to_string()));
        }
        if self.batch.concurrency > MAX_CONCURRENCY {
            return Err(SettingsError::Invalid(format!(
                "batch.concurrency must be at most {}, got {}",
                MAX_CONCURRENCY, self.batch.concurrency
            )));
        }
        Ok(())
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if overrides.no_sanitize {
            log::warn!("Sanitizer disabled; output may contain unsafe HTML");
            self.sanitize = false;
        }
        self.toc |= overrides.toc;
        self.highlight |= overrides.highlight;
        self.security.allow_remote_images |= overrides.allow_remote_images;
        if let Some(jobs) = overrides.jobs {
            self.batch.concurrency = jobs;
        }
        if let Some(title) = &overrides.title {
            self.page.title = title.clone();
        }
        self
    }

    /// Number of worker threads for batch conversion
    pub fn worker_count(&self) -> usize {
        match self.batch.concurrency {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }

    /// Make relative template and stylesheet paths relative to `base`
    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.page.template, &mut self.page.stylesheet]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// IO error when reading the file
    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    /// Error parsing TOML
    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.sanitize);
        assert!(!settings.highlight);
        assert!(!settings.toc);
        assert!(!settings.security.allow_remote_images);
        assert_eq!(settings.page.format, "A4");
        assert_eq!(settings.page.margin, "15mm");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_content = r#"
sanitize = false
highlight = true
toc = true

[security]
allow_remote_images = true

[page]
title = "Handbook"
format = "Letter"
margin = "1in"
stylesheet = "print.css"

[batch]
concurrency = 4

[pdf]
browser = "/usr/bin/chromium"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert!(!settings.sanitize);
        assert!(settings.highlight);
        assert!(settings.toc);
        assert!(settings.security.allow_remote_images);
        assert_eq!(settings.page.title, "Handbook");
        assert_eq!(settings.page.format, "Letter");
        assert_eq!(settings.page.stylesheet, Some(PathBuf::from("print.css")));
        assert_eq!(settings.batch.concurrency, 4);
        assert_eq!(settings.worker_count(), 4);
        assert_eq!(settings.pdf.browser, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Settings::from_toml_str("sanitise = false\n");
        assert!(matches!(result, Err(SettingsError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        let result = Settings::from_toml_str("[page]\nformat = \" \"\n");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));

        let result = Settings::from_toml_str("[batch]\nconcurrency = 100000\n");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_overrides() {
        // Arrange
        let overrides = SettingsOverrides {
            no_sanitize: true,
            toc: true,
            jobs: Some(2),
            title: Some("Manual".to_string()),
            ..SettingsOverrides::default()
        };

        // Act
        let settings = Settings::default().with_overrides(&overrides);

        // Assert
        assert!(!settings.sanitize);
        assert!(settings.toc);
        assert!(!settings.highlight);
        assert_eq!(settings.batch.concurrency, 2);
        assert_eq!(settings.page.title, "Manual");
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "[page]\ntemplate = \"tpl/page.html\"\n").unwrap();

        // Act
        let settings = Settings::load(&path).unwrap();

        // Assert
        assert_eq!(
            settings.page.template,
            Some(dir.path().join("tpl/page.html"))
        );
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::discover(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_worker_count_auto() {
        assert!(Settings::default().worker_count() >= 1);
    }
}
