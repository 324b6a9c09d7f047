//! Loading compiled units and invoking them.
//!
//! # Architecture
//!
//! ```text
//! lib<unit>.so
//!     │
//!     └── LoadedUnit (libloading, capability symbols resolved)
//!             │
//!             └── UnitInstance (fxplot_construct / fxplot_destroy)
//!                     │
//!                     └── eval(x) → fxplot_eval
//! ```

mod ffi;
mod loaded_unit;

pub use ffi::{
    ABI_VERSION_SYMBOL, CAPABILITY_ABI_VERSION, CONSTRUCT_SYMBOL, DESTROY_SYMBOL, EVAL_SYMBOL,
};
pub use loaded_unit::{LoadedUnit, UnitInstance};
