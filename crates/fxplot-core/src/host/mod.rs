//! Function hosting: drives the pipeline and hands out callable handles.
//!
//! - `FunctionHost` - blocking and async evaluation of one expression
//! - `BackgroundHost` - single-flight background evaluation; a new request
//!   aborts the previous one
//! - `FunctionHandle` - `Compiled` or `Null`, both always callable

mod background;
mod function_host;
mod handle;

pub use background::{BackgroundHost, Outcome, PendingEvaluation};
pub use function_host::{Evaluation, FunctionHost, HostConfig};
pub use handle::{CompiledFunction, FunctionHandle, NULL_VALUE};
