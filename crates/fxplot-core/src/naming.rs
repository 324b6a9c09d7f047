//! Unique names for generated units.
//!
//! Every request gets a fresh module and type name. The counter rules out
//! collisions within one allocator; the random suffixes keep names distinct
//! across allocators and make a stale library that was never unloaded
//! impossible to confuse with a new one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::error::{Error, Result};

/// Default base for generated module names.
pub const DEFAULT_PACKAGE_BASE: &str = "fxplot_runtime";

/// Prefix of every generated type name.
pub const UNIT_PREFIX: &str = "Fx_";

/// Names for one generated unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitNames {
    /// Module name, e.g. `fxplot_runtime_3f2a...`.
    pub package: String,
    /// Type name, e.g. `Fx_7_91c0...`.
    pub unit: String,
}

impl UnitNames {
    /// `package.unit`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.package, self.unit)
    }
}

impl fmt::Display for UnitNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.unit)
    }
}

/// Hands out never-repeating unit names.
///
/// Safe to share between threads and hosts; the counter is atomic and the
/// entropy source is the OS generator behind `uuid`.
#[derive(Debug)]
pub struct NameAllocator {
    package_base: String,
    counter: AtomicU64,
}

impl NameAllocator {
    /// Create an allocator with the default package base.
    pub fn new() -> Self {
        Self {
            package_base: DEFAULT_PACKAGE_BASE.to_string(),
            counter: AtomicU64::new(0),
        }
    }

    /// Create an allocator with a custom package base.
    ///
    /// The base must be usable as the start of a Rust identifier.
    pub fn with_package_base(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        validate_identifier(&base)?;
        Ok(Self {
            package_base: base,
            counter: AtomicU64::new(0),
        })
    }

    /// Allocate the next pair of names.
    pub fn next_names(&self) -> UnitNames {
        let serial = self.counter.fetch_add(1, Ordering::Relaxed);
        UnitNames {
            package: format!("{}{}", self.package_base, random_digits()),
            unit: format!("{}{}{}", UNIT_PREFIX, serial, random_digits()),
        }
    }

    /// Number of names handed out so far.
    pub fn allocated(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// `_` followed by 16 lowercase hex digits of fresh entropy.
fn random_digits() -> String {
    let (high, _) = Uuid::new_v4().as_u64_pair();
    format!("_{:016x}", high)
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "package base `{}` is not a valid identifier",
            name
        )))
    }
}
