//! Ranges the control surface clamps to before calling a setter.
//!
//! The store itself accepts any value; these bounds describe what the
//! interactive controls are allowed to produce.

use std::ops::RangeInclusive;

/// Slider-style bounds with a fixed increment.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRange {
    pub range: RangeInclusive<f32>,
    pub step: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self {
            range: min..=max,
            step,
        }
    }

    pub fn min(&self) -> f32 {
        *self.range.start()
    }

    pub fn max(&self) -> f32 {
        *self.range.end()
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min(), self.max())
    }

    /// Moves `value` by `steps` increments and clamps the result.
    pub fn nudge(&self, value: f32, steps: i32) -> f32 {
        let moved = value + self.step * steps as f32;
        // Results stay on the step grid.
        let snapped = ((moved - self.min()) / self.step).round() * self.step + self.min();
        self.clamp(snapped)
    }
}

pub const SPACING: ParamRange = ParamRange::new(0.1, 2.0, 0.1);
pub const ECCENTRICITY: ParamRange = ParamRange::new(0.3, 1.0, 0.05);
pub const FOCAL_OFFSET: ParamRange = ParamRange::new(-1.0, 1.0, 0.05);
pub const FIELD_OF_VIEW: ParamRange = ParamRange::new(20.0, 100.0, 1.0);
