//! Sampling handles over a domain.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::host::FunctionHandle;

/// Largest number of points a domain may hold.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Slack for `(end - start) / step` landing just below an integer.
const STEP_EPSILON: f64 = 1e-9;

/// One `(x, f(x))` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Spacing {
    /// `x = (start_index + i) / divisor`
    Decimal { start_index: i64, divisor: f64 },
    /// `x = start + i * step`
    Step { start: f64, step: f64 },
}

/// Evenly spaced sample points, computed from their index so that no
/// rounding error accumulates across the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleDomain {
    spacing: Spacing,
    count: usize,
}

impl Default for SampleDomain {
    /// `i / 10.0` for `i` in `-100..=100`: -10.0 to 10.0 in steps of 0.1.
    fn default() -> Self {
        Self {
            spacing: Spacing::Decimal {
                start_index: -100,
                divisor: 10.0,
            },
            count: 201,
        }
    }
}

impl SampleDomain {
    /// Points `start + i * step` up to and including `end` (within rounding).
    ///
    /// The last point never passes `end`; a step that does not divide the
    /// range stops short of it.
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample step must be positive, got {}",
                step
            )));
        }
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(Error::InvalidConfig(format!(
                "invalid sample range {}..{}",
                start, end
            )));
        }

        let intervals = ((end - start) / step + STEP_EPSILON).floor();
        if !intervals.is_finite() || intervals >= MAX_SAMPLES as f64 {
            return Err(Error::InvalidConfig(format!(
                "sample step {} over {}..{} exceeds {} points",
                step, start, end, MAX_SAMPLES
            )));
        }

        Ok(Self {
            spacing: Spacing::Step { start, step },
            count: intervals as usize + 1,
        })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The sample abscissae, in increasing order.
    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |i| match self.spacing {
            Spacing::Decimal {
                start_index,
                divisor,
            } => (start_index + i as i64) as f64 / divisor,
            Spacing::Step { start, step } => start + i as f64 * step,
        })
    }
}

/// Evaluate `handle` at every point of `domain`.
pub fn sample(handle: &FunctionHandle, domain: &SampleDomain) -> Vec<Sample> {
    domain
        .points()
        .map(|x| Sample { x, y: handle.f(x) })
        .collect()
}
