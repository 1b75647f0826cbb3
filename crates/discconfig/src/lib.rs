//! Tunable disc parameters shared by the scene and the control surface.
//!
//! [`DiscConfig`] is the immutable snapshot every consumer reads once per
//! frame. [`ConfigStore`] owns the live value, exposes one setter per field
//! and notifies subscribers synchronously whenever a setter changes it.
//! [`document`] maps the snapshot to and from the JSON exchange format.

pub mod document;
pub mod limits;
mod store;

use serde::{Deserialize, Serialize};

pub use document::{ConfigError, ImportReport};
pub use store::{ConfigStore, SubscriptionId};

pub const DEFAULT_SIZES: [f32; 3] = [1.0, 1.5, 2.0];
pub const DEFAULT_SPACING: f32 = 0.5;
/// 1.0 renders a circle; lower values squash the disc into an ellipse.
pub const DEFAULT_ECCENTRICITY: f32 = 1.0;
pub const DEFAULT_FOCAL_OFFSET: [f32; 2] = [0.0, 0.0];
/// Vertical camera field of view in degrees.
pub const DEFAULT_FIELD_OF_VIEW: f32 = 50.0;

/// Identifies one of the three discs along the shared axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscSlot {
    /// Offset by `-spacing`.
    Back,
    Center,
    /// Offset by `+spacing`.
    Front,
}

impl DiscSlot {
    pub const ALL: [DiscSlot; 3] = [DiscSlot::Back, DiscSlot::Center, DiscSlot::Front];

    pub fn index(self) -> usize {
        match self {
            DiscSlot::Back => 0,
            DiscSlot::Center => 1,
            DiscSlot::Front => 2,
        }
    }

    /// Multiplier applied to `spacing` to place the disc on the axis.
    pub fn axis_sign(self) -> f32 {
        match self {
            DiscSlot::Back => -1.0,
            DiscSlot::Center => 0.0,
            DiscSlot::Front => 1.0,
        }
    }
}

/// Snapshot of every tunable visual parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscConfig {
    pub sizes: [f32; 3],
    pub spacing: f32,
    pub eccentricity: f32,
    pub focal_offset: [f32; 2],
    pub field_of_view: f32,
}

impl Default for DiscConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES,
            spacing: DEFAULT_SPACING,
            eccentricity: DEFAULT_ECCENTRICITY,
            focal_offset: DEFAULT_FOCAL_OFFSET,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
        }
    }
}

impl DiscConfig {
    pub fn size(&self, slot: DiscSlot) -> f32 {
        self.sizes[slot.index()]
    }

    /// Returns true when every field is finite, so the renderer output is defined.
    pub fn is_finite(&self) -> bool {
        self.sizes.iter().all(|size| size.is_finite())
            && self.spacing.is_finite()
            && self.eccentricity.is_finite()
            && self.focal_offset.iter().all(|offset| offset.is_finite())
            && self.field_of_view.is_finite()
    }
}
