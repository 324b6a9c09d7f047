//! FFI definitions for the function capability.
//!
//! Every generated unit exports four C ABI symbols. Together they form the
//! capability `f(x: f64) -> f64`:
//!
//! | symbol | signature |
//! |---|---|
//! | `fxplot_abi_version` | `() -> u32` |
//! | `fxplot_construct` | `() -> *mut c_void` (null on failure) |
//! | `fxplot_eval` | `(*const c_void, f64) -> f64` |
//! | `fxplot_destroy` | `(*mut c_void)` |
//!
//! `fxplot_eval` must be callable concurrently on one instance.

use std::ffi::c_void;

/// ABI tag a unit must report to be accepted.
pub const CAPABILITY_ABI_VERSION: u32 = 1;

pub const ABI_VERSION_SYMBOL: &str = "fxplot_abi_version";
pub const CONSTRUCT_SYMBOL: &str = "fxplot_construct";
pub const EVAL_SYMBOL: &str = "fxplot_eval";
pub const DESTROY_SYMBOL: &str = "fxplot_destroy";

pub type AbiVersionFn = unsafe extern "C" fn() -> u32;
pub type ConstructFn = unsafe extern "C" fn() -> *mut c_void;
pub type EvalFn = unsafe extern "C" fn(*const c_void, f64) -> f64;
pub type DestroyFn = unsafe extern "C" fn(*mut c_void);
