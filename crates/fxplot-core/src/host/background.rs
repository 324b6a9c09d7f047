//! Background evaluation with cancel-on-supersede.
//!
//! Compilation latency is unbounded, so interactive consumers hand requests
//! to a [`BackgroundHost`] instead of blocking. At most one request is in
//! flight: submitting a new expression aborts the previous one, which drops
//! its compile future and kills its rustc process.

use std::sync::{Arc, Mutex};

use tokio::task::{AbortHandle, JoinHandle};

use crate::compile::ExpressionRequest;
use crate::error::Error;

use super::function_host::{Evaluation, FunctionHost};

/// What became of a submitted request.
#[derive(Debug)]
pub enum Outcome {
    /// The request ran to completion (successfully or not).
    Ready(Evaluation),
    /// A newer request, or [`BackgroundHost::cancel`], aborted it first.
    Superseded,
}

impl Outcome {
    /// The evaluation, if the request was not superseded.
    pub fn into_evaluation(self) -> Option<Evaluation> {
        match self {
            Self::Ready(evaluation) => Some(evaluation),
            Self::Superseded => None,
        }
    }
}

/// A request running in the background.
#[derive(Debug)]
pub struct PendingEvaluation {
    expression: String,
    task: JoinHandle<Evaluation>,
}

impl PendingEvaluation {
    /// The submitted expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the request has finished or been aborted.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the request.
    ///
    /// A request aborted after it already completed still reports `Ready`.
    pub async fn outcome(self) -> Outcome {
        match self.task.await {
            Ok(evaluation) => Outcome::Ready(evaluation),
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Request `{}` superseded", self.expression);
                Outcome::Superseded
            }
            Err(e) => Outcome::Ready(Evaluation::failed(
                self.expression,
                Error::TaskFailed(e.to_string()),
            )),
        }
    }
}

/// Runs requests for one [`FunctionHost`] on the tokio runtime, one at a time.
pub struct BackgroundHost {
    host: Arc<FunctionHost>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl BackgroundHost {
    pub fn new(host: Arc<FunctionHost>) -> Self {
        Self {
            host,
            in_flight: Mutex::new(None),
        }
    }

    /// The wrapped host.
    pub fn host(&self) -> &Arc<FunctionHost> {
        &self.host
    }

    /// Start compiling `expression`, aborting any request still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, expression: impl Into<ExpressionRequest>) -> PendingEvaluation {
        let request = expression.into();
        let expression = request.text().to_string();
        let host = Arc::clone(&self.host);

        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        let task = tokio::spawn(async move { host.evaluate_async(request).await });
        *in_flight = Some(task.abort_handle());

        PendingEvaluation { expression, task }
    }

    /// Abort the in-flight request, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match previous {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }
}
