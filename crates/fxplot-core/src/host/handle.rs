//! Callable function handles.

use std::sync::Arc;

use crate::execute::UnitInstance;

/// Value returned by the null handle for every input.
pub const NULL_VALUE: f64 = 0.0;

/// A callable `f(x) -> y`.
///
/// Both variants are always callable, so consumers never branch on failure:
/// a failed request yields [`FunctionHandle::Null`], which maps every input
/// to [`NULL_VALUE`].
#[derive(Debug, Clone, Default)]
pub enum FunctionHandle {
    /// Backed by a freshly compiled and loaded unit.
    Compiled(CompiledFunction),
    /// Fallback used when compilation or instantiation failed.
    #[default]
    Null,
}

impl FunctionHandle {
    /// Evaluate `f(x)`.
    pub fn f(&self, x: f64) -> f64 {
        match self {
            Self::Compiled(function) => function.f(x),
            Self::Null => NULL_VALUE,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `package.unit` of the backing unit, if compiled.
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            Self::Compiled(function) => Some(function.unit_name()),
            Self::Null => None,
        }
    }

    /// Whether two handles share the same compiled instance.
    ///
    /// Clones of one handle do; handles from separate requests never do.
    pub fn same_instance(&self, other: &FunctionHandle) -> bool {
        match (self, other) {
            (Self::Compiled(a), Self::Compiled(b)) => Arc::ptr_eq(&a.instance, &b.instance),
            _ => false,
        }
    }
}

/// A handle onto one constructed instance of a loaded unit.
///
/// Cheap to clone; the unit stays loaded until the last clone drops.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    instance: Arc<UnitInstance>,
}

impl CompiledFunction {
    pub(crate) fn new(instance: UnitInstance) -> Self {
        Self {
            instance: Arc::new(instance),
        }
    }

    /// Evaluate `f(x)`.
    pub fn f(&self, x: f64) -> f64 {
        self.instance.eval(x)
    }

    /// `package.unit`
    pub fn unit_name(&self) -> &str {
        self.instance.unit().qualified_name()
    }
}
