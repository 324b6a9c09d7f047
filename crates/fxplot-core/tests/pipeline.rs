//! End-to-end tests for the expression pipeline.
//!
//! These compile real units with the rustc found on PATH.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use fxplot_core::{
    CompileFailureKind, Error, FunctionHost, HostConfig, SampleDomain, Severity, TemplateSource,
    sample,
};
use tempfile::TempDir;

const EMBEDDED_TEMPLATE: &str = include_str!("../templates/function.rs.tmpl");

fn host() -> FunctionHost {
    FunctionHost::new(HostConfig::default()).expect("Failed to create host")
}

/// Host using a modified copy of the built-in template.
fn host_with_template(temp: &TempDir, from: &str, to: &str) -> FunctionHost {
    assert!(EMBEDDED_TEMPLATE.contains(from), "template edit does not apply");
    let path = temp.path().join("function.rs.tmpl");
    fs::write(&path, EMBEDDED_TEMPLATE.replace(from, to)).unwrap();

    FunctionHost::new(HostConfig {
        template: TemplateSource::File(path),
        ..Default::default()
    })
    .expect("Failed to create host")
}

fn library_count(dir: &Path) -> usize {
    let extension = fxplot_core::compile::dylib_extension();
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
                .count()
        })
        .unwrap_or(0)
}

/// Log output captured from the current thread.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_round_trip_simple_expressions() {
    let host = host();

    let identity = host.evaluate("x");
    assert!(identity.is_success(), "{}", identity.diagnostic_text());
    assert_eq!(identity.handle.f(3.0), 3.0);
    assert!(identity.diagnostic_text().is_empty());

    let square = host.evaluate("x*x");
    assert!(square.is_success(), "{}", square.diagnostic_text());
    assert_eq!(square.handle.f(4.0), 16.0);

    let sine = host.evaluate("sin(x)");
    assert!(sine.is_success(), "{}", sine.diagnostic_text());
    assert!(sine.handle.f(0.0).abs() < 1e-12);
}

#[test]
fn test_math_prelude() {
    let host = host();
    let evaluation = host.evaluate("x * (sin(x) + cos(x)) + pow(x, 2.0) - sqrt(abs(x)) * PI");
    assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());

    let x: f64 = 1.5;
    let expected = x * (x.sin() + x.cos()) + x.powf(2.0) - x.abs().sqrt() * std::f64::consts::PI;
    assert!((evaluation.handle.f(x) - expected).abs() < 1e-12);
}

#[test]
fn test_failures_yield_callable_null_handle() {
    let host = host();

    for expression in ["x +", "(x", "banana(x)"] {
        let evaluation = host.evaluate(expression);

        assert!(!evaluation.is_success(), "`{}` should not compile", expression);
        assert!(evaluation.handle.is_null());
        assert!(!evaluation.diagnostic_text().is_empty());

        for point in sample(&evaluation.handle, &SampleDomain::default()) {
            assert!(point.y.is_finite());
        }
        assert!(evaluation.handle.f(1e308).is_finite());
    }
}

#[test]
fn test_failure_classification() {
    let host = host();

    let syntax = host.evaluate("x +");
    match syntax.error {
        Some(Error::Compilation { kind, .. }) => assert_eq!(kind, CompileFailureKind::Syntax),
        other => panic!("expected compilation error, got {:?}", other),
    }

    let unresolved = host.evaluate("banana(x)");
    match &unresolved.error {
        Some(Error::Compilation { kind, .. }) => assert_eq!(*kind, CompileFailureKind::Type),
        other => panic!("expected compilation error, got {:?}", other),
    }
    let first = &unresolved.diagnostics[0];
    assert_eq!(first.code.as_deref(), Some("E0425"));
    assert_eq!(first.expression_column, Some(1));
    assert!(unresolved.error.as_ref().is_some_and(Error::is_recoverable));
}

#[test]
fn test_diagnostic_order_is_preserved() {
    let host = host();
    let evaluation = host.evaluate("banana(x) + apple(x)");

    let messages: Vec<&str> = evaluation
        .diagnostics
        .iter()
        .filter(|d| d.level == Severity::Error)
        .map(|d| d.message.as_str())
        .collect();

    let banana = messages.iter().position(|m| m.contains("banana")).unwrap();
    let apple = messages.iter().position(|m| m.contains("apple")).unwrap();
    assert!(banana < apple, "diagnostics reordered: {:?}", messages);
    assert!(messages.last().unwrap().contains("aborting"));

    let text = evaluation.diagnostic_text();
    assert!(text.find("banana").unwrap() < text.find("apple").unwrap());
}

#[test]
fn test_repeated_evaluation_is_independent() {
    let host = host();
    let first = host.evaluate("x * 2.0 + 1.0");
    let second = host.evaluate("x * 2.0 + 1.0");

    assert!(first.is_success() && second.is_success());
    assert_ne!(first.handle.unit_name(), second.handle.unit_name());
    assert!(!first.handle.same_instance(&second.handle));
    assert!(first.handle.same_instance(&first.handle.clone()));

    for x in [-3.0, 0.0, 0.5, 7.25] {
        assert_eq!(first.handle.f(x), second.handle.f(x));
    }

    // Dropping one leaves the other usable.
    drop(first);
    assert_eq!(second.handle.f(2.0), 5.0);
}

#[test]
fn test_success_keeps_warnings_separate() {
    let host = host();
    let evaluation = host.evaluate("(x)");

    assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());
    assert!(evaluation.diagnostics.is_empty());
    assert!(
        evaluation
            .warnings
            .iter()
            .any(|w| w.level == Severity::Warning && w.message.contains("unnecessary parentheses"))
    );
}

#[test]
fn test_panicking_expression_yields_nan() {
    let host = host();
    let evaluation = host.evaluate("if x > 0.0 { panic!(\"positive\") } else { x }");

    assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());
    assert_eq!(evaluation.handle.f(-1.0), -1.0);
    assert!(evaluation.handle.f(1.0).is_nan());
}

#[test]
fn test_units_are_unloaded_when_handles_drop() {
    let host = host();
    let scratch = host.compiler().scratch_dir().to_path_buf();

    let evaluation = host.evaluate("x + 1.0");
    assert!(evaluation.is_success(), "{}", evaluation.diagnostic_text());
    assert_eq!(library_count(&scratch), 1);

    let handle = evaluation.handle.clone();
    drop(evaluation);
    assert_eq!(library_count(&scratch), 1, "clone keeps the unit loaded");

    drop(handle);
    assert_eq!(library_count(&scratch), 0);
}

#[test]
fn test_capability_mismatch() {
    let temp = TempDir::new().unwrap();
    let host = host_with_template(
        &temp,
        "pub extern \"C\" fn fxplot_abi_version() -> u32 {\n    1\n}",
        "pub extern \"C\" fn fxplot_abi_version() -> u32 {\n    99\n}",
    );

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let evaluation = tracing::subscriber::with_default(subscriber, || host.evaluate("x"));

    assert!(evaluation.handle.is_null());
    assert!(matches!(evaluation.error, Some(Error::CapabilityMismatch { .. })));
    assert!(evaluation.diagnostic_text().contains("ABI version 99"));

    let logged = logs.contents();
    assert_eq!(logged.matches("ABI version 99").count(), 1, "{}", logged);
    assert!(logged.contains("ERROR"));
}

#[test]
fn test_instantiation_failure() {
    let temp = TempDir::new().unwrap();
    let host = host_with_template(
        &temp,
        "Ok(instance) => Box::into_raw(instance).cast(),",
        "Ok(_instance) => std::ptr::null_mut(),",
    );

    let evaluation = host.evaluate("x");
    assert!(evaluation.handle.is_null());
    assert!(matches!(evaluation.error, Some(Error::Instantiation { .. })));
    assert!(evaluation.diagnostic_text().contains("constructor returned null"));
    assert_eq!(evaluation.handle.f(5.0), 0.0);
}

#[test]
fn test_missing_rustc_is_reported_at_startup() {
    let config = HostConfig {
        compiler: fxplot_core::CompilerConfig {
            rustc_path: Some("/nonexistent/rustc".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(FunctionHost::new(config), Err(Error::Toolchain(_))));
}
