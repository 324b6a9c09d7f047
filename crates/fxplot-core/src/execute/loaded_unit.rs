//! Loaded unit libraries and the instances constructed from them.

use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use libloading::{Library, Symbol};
use tempfile::TempDir;

use crate::error::{Error, Result};

use super::ffi::{
    ABI_VERSION_SYMBOL, AbiVersionFn, CAPABILITY_ABI_VERSION, CONSTRUCT_SYMBOL, ConstructFn,
    DESTROY_SYMBOL, DestroyFn, EVAL_SYMBOL, EvalFn,
};

/// A compiled unit library, loaded and checked against the capability.
///
/// Dropping the last reference closes the library and deletes its file.
pub struct LoadedUnit {
    /// `package.unit`
    qualified_name: String,

    construct: ConstructFn,
    eval: EvalFn,
    destroy: DestroyFn,

    /// Always `Some` until drop; closed before the file is removed.
    library: Option<Library>,

    dylib_path: PathBuf,

    /// Keeps the scratch directory alive while the library is in use.
    _scratch: Arc<TempDir>,
}

impl LoadedUnit {
    /// Load a compiled library and resolve the capability symbols.
    pub fn load(
        qualified_name: &str,
        dylib_path: PathBuf,
        scratch: Arc<TempDir>,
    ) -> Result<Self> {
        // SAFETY: the library was just produced from a template we control;
        // its initializers are the Rust runtime's own.
        let library = match unsafe { Library::new(&dylib_path) } {
            Ok(library) => library,
            Err(e) => {
                remove_artifact(&dylib_path);
                return Err(Error::Loader(e));
            }
        };

        // Mismatches are reported by the host.
        let resolved = Self::resolve(&library, qualified_name);
        let (construct, eval, destroy) = match resolved {
            Ok(symbols) => symbols,
            Err(e) => {
                drop(library);
                remove_artifact(&dylib_path);
                return Err(e);
            }
        };

        tracing::debug!("Loaded {} from {}", qualified_name, dylib_path.display());

        Ok(Self {
            qualified_name: qualified_name.to_string(),
            construct,
            eval,
            destroy,
            library: Some(library),
            dylib_path,
            _scratch: scratch,
        })
    }

    /// Resolve all capability symbols and check the ABI tag.
    fn resolve(library: &Library, qualified_name: &str) -> Result<(ConstructFn, EvalFn, DestroyFn)> {
        let version_fn: AbiVersionFn = symbol(library, ABI_VERSION_SYMBOL, qualified_name)?;
        // SAFETY: symbol type matches the capability table in `ffi`.
        let version = unsafe { version_fn() };
        if version != CAPABILITY_ABI_VERSION {
            return Err(Error::CapabilityMismatch {
                unit: qualified_name.to_string(),
                reason: format!(
                    "unit reports ABI version {}, expected {}",
                    version, CAPABILITY_ABI_VERSION
                ),
            });
        }

        Ok((
            symbol(library, CONSTRUCT_SYMBOL, qualified_name)?,
            symbol(library, EVAL_SYMBOL, qualified_name)?,
            symbol(library, DESTROY_SYMBOL, qualified_name)?,
        ))
    }

    /// `package.unit`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Path of the loaded library.
    pub fn dylib_path(&self) -> &Path {
        &self.dylib_path
    }

    /// Construct a fresh instance of the unit's type.
    pub fn instantiate(self: &Arc<Self>) -> Result<UnitInstance> {
        // SAFETY: `construct` was resolved from our library and takes no input.
        let raw = unsafe { (self.construct)() };
        let ptr = NonNull::new(raw).ok_or_else(|| Error::Instantiation {
            unit: self.qualified_name.clone(),
            reason: "constructor returned null".to_string(),
        })?;

        Ok(UnitInstance {
            ptr,
            unit: Arc::clone(self),
        })
    }
}

impl Drop for LoadedUnit {
    fn drop(&mut self) {
        if let Some(library) = self.library.take()
            && let Err(e) = library.close()
        {
            tracing::warn!("Failed to close {}: {}", self.qualified_name, e);
        }
        remove_artifact(&self.dylib_path);
        tracing::debug!("Unloaded {}", self.qualified_name);
    }
}

impl std::fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("qualified_name", &self.qualified_name)
            .field("dylib_path", &self.dylib_path)
            .finish()
    }
}

/// One constructed instance of a loaded unit.
pub struct UnitInstance {
    ptr: NonNull<c_void>,
    unit: Arc<LoadedUnit>,
}

// SAFETY: the capability requires `fxplot_eval` to be callable concurrently
// and the instance is only destroyed from `Drop`, which has exclusive access.
unsafe impl Send for UnitInstance {}
unsafe impl Sync for UnitInstance {}

impl UnitInstance {
    /// Evaluate `f(x)`.
    pub fn eval(&self, x: f64) -> f64 {
        // SAFETY: `ptr` came from this unit's constructor and is live until drop.
        unsafe { (self.unit.eval)(self.ptr.as_ptr(), x) }
    }

    /// The unit this instance belongs to.
    pub fn unit(&self) -> &LoadedUnit {
        &self.unit
    }
}

impl Drop for UnitInstance {
    fn drop(&mut self) {
        // SAFETY: constructed by this unit and never destroyed before.
        unsafe { (self.unit.destroy)(self.ptr.as_ptr()) }
    }
}

impl std::fmt::Debug for UnitInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitInstance")
            .field("unit", &self.unit.qualified_name)
            .finish()
    }
}

fn symbol<T: Copy>(library: &Library, name: &str, qualified_name: &str) -> Result<T> {
    // SAFETY: callers pick `T` from the capability table in `ffi`.
    let symbol: Symbol<T> = unsafe { library.get(name.as_bytes()) }.map_err(|e| {
        Error::CapabilityMismatch {
            unit: qualified_name.to_string(),
            reason: format!("missing symbol `{}`: {}", name, e),
        }
    })?;
    Ok(*symbol)
}

fn remove_artifact(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}
