//! Function source template.
//!
//! The template is plain Rust source with three literal placeholder tokens.
//! Substitution is string replacement, so the tokens must not appear anywhere
//! else in the template.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Placeholder replaced by the generated module name.
pub const PACKAGE_PLACEHOLDER: &str = "$packageName";

/// Placeholder replaced by the generated type name.
pub const UNIT_PLACEHOLDER: &str = "$unitName";

/// Placeholder replaced by the user's expression text.
pub const EXPRESSION_PLACEHOLDER: &str = "$expression";

/// Logical name of the built-in template.
pub const EMBEDDED_TEMPLATE_NAME: &str = "function.rs.tmpl";

const EMBEDDED_TEMPLATE: &str = include_str!("../templates/function.rs.tmpl");

/// Where the template text comes from.
#[derive(Debug, Clone, Default)]
pub enum TemplateSource {
    /// The template shipped with this crate.
    #[default]
    Embedded,
    /// A template file on disk.
    File(PathBuf),
}

impl TemplateSource {
    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> String {
        match self {
            Self::Embedded => EMBEDDED_TEMPLATE_NAME.to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Validated template text.
#[derive(Debug, Clone)]
pub struct Template {
    text: Arc<str>,
}

impl Template {
    /// Wrap template text, checking that every placeholder is present.
    pub fn parse(text: impl Into<Arc<str>>) -> Result<Self> {
        let text = text.into();
        let missing: Vec<&str> = [PACKAGE_PLACEHOLDER, UNIT_PLACEHOLDER, EXPRESSION_PLACEHOLDER]
            .into_iter()
            .filter(|token| !text.contains(token))
            .collect();

        if !missing.is_empty() {
            return Err(Error::TemplateMalformed(format!(
                "missing placeholder(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { text })
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Loads the template once and hands out the cached copy afterwards.
#[derive(Debug)]
pub struct TemplateStore {
    source: TemplateSource,
    cached: Mutex<Option<Template>>,
}

impl TemplateStore {
    /// Create a store for the given source. Nothing is read until [`load`].
    ///
    /// [`load`]: TemplateStore::load
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Store backed by the built-in template.
    pub fn embedded() -> Self {
        Self::new(TemplateSource::Embedded)
    }

    /// The configured source.
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Return the template, reading it on first use.
    ///
    /// Failures are not cached; a later call retries the read.
    pub fn load(&self) -> Result<Template> {
        // A poisoned lock only means another loader panicked mid-read; the
        // cached value is either complete or absent.
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(template) = cached.as_ref() {
            return Ok(template.clone());
        }

        let text = self.read_source()?;
        let template = Template::parse(text)?;
        tracing::debug!(
            "Loaded function template {} ({} bytes)",
            self.source.name(),
            template.text().len()
        );
        *cached = Some(template.clone());
        Ok(template)
    }

    fn read_source(&self) -> Result<String> {
        match &self.source {
            TemplateSource::Embedded => Ok(EMBEDDED_TEMPLATE.to_string()),
            TemplateSource::File(path) => {
                let mut file = File::open(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::TemplateMissing(path.display().to_string())
                    } else {
                        Error::TemplateRead(format!("{}: {}", path.display(), e))
                    }
                })?;

                let expected = file
                    .metadata()
                    .map_err(|e| Error::TemplateRead(format!("{}: {}", path.display(), e)))?
                    .len() as usize;

                let mut bytes = Vec::with_capacity(expected);
                let read = file
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::TemplateRead(format!("{}: {}", path.display(), e)))?;

                if read < expected {
                    return Err(Error::TemplateRead(format!(
                        "{}: expected {} bytes, read {}",
                        path.display(),
                        expected,
                        read
                    )));
                }

                String::from_utf8(bytes).map_err(|e| {
                    Error::TemplateRead(format!("{}: not valid UTF-8: {}", path.display(), e))
                })
            }
        }
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::embedded()
    }
}
