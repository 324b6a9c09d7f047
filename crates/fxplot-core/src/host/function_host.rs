//! The function host: expression text in, callable handle out.

use std::sync::Arc;

use crate::compile::{
    CompilationUnit, CompiledUnit, CompilerConfig, Diagnostic, ExpressionRequest, UnitCompiler,
    render_text, synthesize,
};
use crate::error::{Error, Result};
use crate::naming::{DEFAULT_PACKAGE_BASE, NameAllocator};
use crate::template::{TemplateSource, TemplateStore};

use super::handle::{CompiledFunction, FunctionHandle};

/// Configuration for a [`FunctionHost`].
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Compiler settings
    pub compiler: CompilerConfig,

    /// Where the function template comes from
    pub template: TemplateSource,

    /// Base for generated module names
    pub package_base: String,

    /// How often a loader failure is retried with fresh names
    pub loader_retries: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig::default(),
            template: TemplateSource::Embedded,
            package_base: DEFAULT_PACKAGE_BASE.to_string(),
            loader_retries: 1,
        }
    }
}

/// Result of one request.
#[derive(Debug)]
pub struct Evaluation {
    /// The submitted expression
    pub expression: String,

    /// Always callable; [`FunctionHandle::Null`] on failure
    pub handle: FunctionHandle,

    /// Why the request failed, in emission order; empty on success
    pub diagnostics: Vec<Diagnostic>,

    /// Warnings from a successful compilation
    pub warnings: Vec<Diagnostic>,

    /// The failure, if any
    pub error: Option<Error>,

    /// Compilation time in milliseconds, if compilation succeeded
    pub compile_time_ms: Option<u64>,
}

impl Evaluation {
    /// A failed request: null handle plus the error's diagnostics.
    ///
    /// Compiler failures keep rustc's diagnostics verbatim; any other error
    /// becomes a single diagnostic carrying its message.
    pub fn failed(expression: impl Into<String>, error: Error) -> Self {
        let diagnostics = match &error {
            Error::Compilation { diagnostics, .. } => diagnostics.clone(),
            other => vec![Diagnostic::error(other.to_string())],
        };

        Self {
            expression: expression.into(),
            handle: FunctionHandle::Null,
            diagnostics,
            warnings: Vec::new(),
            error: Some(error),
            compile_time_ms: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Diagnostics one per line; empty on success.
    pub fn diagnostic_text(&self) -> String {
        render_text(&self.diagnostics)
    }
}

/// Drives template → names → unit → compile → load → instance.
///
/// Never returns an error for a request: every failure becomes an
/// [`Evaluation`] with the null handle and diagnostics.
pub struct FunctionHost {
    templates: TemplateStore,
    names: Arc<NameAllocator>,
    compiler: UnitCompiler,
    loader_retries: u32,
}

impl FunctionHost {
    /// Create a host. Loads the template immediately so that setup problems
    /// surface here rather than on the first request.
    pub fn new(config: HostConfig) -> Result<Self> {
        let names = Arc::new(NameAllocator::with_package_base(&config.package_base)?);
        let compiler = UnitCompiler::new(config.compiler)?;
        Self::with_parts(
            TemplateStore::new(config.template),
            names,
            compiler,
            config.loader_retries,
        )
    }

    /// Assemble a host from existing parts, e.g. to share one
    /// [`NameAllocator`] between several hosts.
    pub fn with_parts(
        templates: TemplateStore,
        names: Arc<NameAllocator>,
        compiler: UnitCompiler,
        loader_retries: u32,
    ) -> Result<Self> {
        templates.load()?;
        Ok(Self {
            templates,
            names,
            compiler,
            loader_retries,
        })
    }

    /// The name allocator in use.
    pub fn names(&self) -> &Arc<NameAllocator> {
        &self.names
    }

    /// The unit compiler in use.
    pub fn compiler(&self) -> &UnitCompiler {
        &self.compiler
    }

    /// Compile `expression` into a fresh handle, blocking until done.
    pub fn evaluate(&self, expression: impl Into<ExpressionRequest>) -> Evaluation {
        let request = expression.into();
        let mut attempt = 0;

        loop {
            let result = self
                .prepare(&request)
                .and_then(|unit| self.compiler.compile(&unit))
                .and_then(|compiled| self.instantiate(&request, compiled));

            match result {
                Ok(evaluation) => return evaluation,
                Err(e) if self.should_retry(&e, attempt) => attempt += 1,
                Err(e) => return self.failed(&request, e),
            }
        }
    }

    /// Compile `expression` into a fresh handle on the tokio runtime.
    ///
    /// Dropping the future cancels the request and kills rustc.
    pub async fn evaluate_async(&self, expression: impl Into<ExpressionRequest>) -> Evaluation {
        let request = expression.into();
        let mut attempt = 0;

        loop {
            let result = match self.prepare(&request) {
                Ok(unit) => self.compiler.compile_async(&unit).await,
                Err(e) => Err(e),
            }
            .and_then(|compiled| self.instantiate(&request, compiled));

            match result {
                Ok(evaluation) => return evaluation,
                Err(e) if self.should_retry(&e, attempt) => attempt += 1,
                Err(e) => return self.failed(&request, e),
            }
        }
    }

    /// Synthesize a unit with freshly allocated names.
    fn prepare(&self, request: &ExpressionRequest) -> Result<CompilationUnit> {
        let template = self.templates.load()?;
        let names = self.names.next_names();
        tracing::debug!("Synthesizing {} for `{}`", names, request.text());
        Ok(synthesize(&template, &names, request))
    }

    fn instantiate(&self, request: &ExpressionRequest, compiled: CompiledUnit) -> Result<Evaluation> {
        let instance = compiled.loaded.instantiate()?;
        let function = CompiledFunction::new(instance);
        tracing::debug!("Instantiated {}", function.unit_name());

        Ok(Evaluation {
            expression: request.text().to_string(),
            handle: FunctionHandle::Compiled(function),
            diagnostics: Vec::new(),
            warnings: compiled.warnings,
            error: None,
            compile_time_ms: Some(compiled.compile_time_ms),
        })
    }

    fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        let retry = matches!(error, Error::Loader(_)) && attempt < self.loader_retries;
        if retry {
            tracing::warn!("{}; retrying with fresh names", error);
        }
        retry
    }

    fn failed(&self, request: &ExpressionRequest, error: Error) -> Evaluation {
        match &error {
            Error::CapabilityMismatch { .. } => {
                tracing::error!("Generated unit violates the function capability: {}", error);
            }
            Error::Compilation { .. } => tracing::debug!("{}", error),
            other => tracing::warn!("Evaluation of `{}` failed: {}", request.text(), other),
        }
        Evaluation::failed(request.text(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_evaluation_from_compiler_error() {
        let diagnostics = vec![
            Diagnostic::error("expected expression, found `}`"),
            Diagnostic::error("aborting due to 1 previous error"),
        ];
        let evaluation = Evaluation::failed(
            "x +",
            Error::Compilation {
                unit: "p.Fx_0".to_string(),
                kind: crate::error::CompileFailureKind::Syntax,
                diagnostics: diagnostics.clone(),
            },
        );

        assert!(!evaluation.is_success());
        assert!(evaluation.handle.is_null());
        assert_eq!(evaluation.diagnostics, diagnostics);
        assert_eq!(
            evaluation.diagnostic_text(),
            "error: expected expression, found `}`\nerror: aborting due to 1 previous error\n"
        );
    }

    #[test]
    fn test_failed_evaluation_from_other_error() {
        let evaluation = Evaluation::failed(
            "x",
            Error::Instantiation {
                unit: "p.Fx_1".to_string(),
                reason: "constructor returned null".to_string(),
            },
        );

        assert_eq!(evaluation.diagnostics.len(), 1);
        assert!(evaluation.diagnostic_text().contains("constructor returned null"));
        assert_eq!(evaluation.handle.f(2.0), 0.0);
    }

    #[test]
    fn test_host_rejects_bad_package_base() {
        let config = HostConfig {
            package_base: "not valid".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            FunctionHost::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_host_fails_fast_on_missing_template() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = HostConfig {
            template: TemplateSource::File(temp.path().join("missing.tmpl")),
            ..Default::default()
        };
        assert!(matches!(
            FunctionHost::new(config),
            Err(Error::TemplateMissing(_))
        ));
    }

    fn host_with_retries(loader_retries: u32) -> FunctionHost {
        FunctionHost::new(HostConfig {
            loader_retries,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_loader_failure_retried_with_fresh_names() {
        let host = host_with_retries(1);
        host.compiler().corrupt_next_loads(1);

        let evaluation = host.evaluate("x + 1.0");

        assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());
        assert_eq!(evaluation.handle.f(1.0), 2.0);
        assert_eq!(host.names().allocated(), 2);
    }

    #[test]
    fn test_loader_failure_without_retries() {
        let host = host_with_retries(0);
        host.compiler().corrupt_next_loads(1);

        let evaluation = host.evaluate("x + 1.0");

        assert!(matches!(evaluation.error, Some(Error::Loader(_))));
        assert!(evaluation.handle.is_null());
        assert_eq!(evaluation.handle.f(1.0), 0.0);
        assert_eq!(evaluation.diagnostics.len(), 1);
        assert!(evaluation.diagnostic_text().contains("failed to load library"));
        assert_eq!(host.names().allocated(), 1);

        // Loader failures are recoverable: the next request goes through.
        let retry = host.evaluate("x + 1.0");
        assert!(retry.is_success(), "{}", retry.diagnostic_text());
        assert_eq!(host.names().allocated(), 2);
    }

    #[tokio::test]
    async fn test_loader_failure_retried_async() {
        let host = host_with_retries(2);
        host.compiler().corrupt_next_loads(2);

        let evaluation = host.evaluate_async("x * 3.0").await;

        assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());
        assert_eq!(evaluation.handle.f(2.0), 6.0);
        assert_eq!(host.names().allocated(), 3);
    }

    #[test]
    fn test_host_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FunctionHost>();
    }
}
