//! limits.rs
//! Output bounds for the controller.
//!
//! A bound pair is only ever constructed through `OutputLimits::new`, so any value of this type
//! satisfies `min <= max` and contains no NaN. Infinite bounds are allowed and act as a
//! one-sided limit.

use thiserror::Error;

/// Rejected output bounds.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum LimitsError {
    /// `min > max`, or one of the bounds is NaN.
    #[error("invalid output limits: min ({min}) must not exceed max ({max})")]
    Inverted { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLimits {
    min: f64,
    max: f64,
}

impl OutputLimits {
    pub fn new(min: f64, max: f64) -> Result<Self, LimitsError> {
        // also catches NaN on either side
        if !(min <= max) {
            return Err(LimitsError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamp `value` into `[min, max]`.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
