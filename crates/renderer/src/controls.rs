//! Keyboard control surface for the preview window.
//!
//! | keys          | action                              |
//! |---------------|-------------------------------------|
//! | `[` / `]`     | spacing down / up                   |
//! | `-` / `=`     | eccentricity down / up              |
//! | arrows        | move the focal point                |
//! | `,` / `.`     | field of view down / up             |
//! | `r`           | reset every parameter               |
//! | `p`           | capture a PNG                       |
//! | `c`           | export the configuration as JSON    |
//! | `i`           | re-import the `--config` file       |
//!
//! Adjustments are clamped through [`discconfig::limits`] before reaching the
//! store, so the store only ever sees values the controls allow.

use discconfig::limits::{self, ParamRange};
use discconfig::{ConfigStore, DiscConfig};
use winit::keyboard::{Key, NamedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Spacing,
    Eccentricity,
    FocalOffsetX,
    FocalOffsetY,
    FieldOfView,
}

impl Parameter {
    pub fn range(self) -> ParamRange {
        match self {
            Parameter::Spacing => limits::SPACING,
            Parameter::Eccentricity => limits::ECCENTRICITY,
            Parameter::FocalOffsetX | Parameter::FocalOffsetY => limits::FOCAL_OFFSET,
            Parameter::FieldOfView => limits::FIELD_OF_VIEW,
        }
    }

    pub fn read(self, config: &DiscConfig) -> f32 {
        match self {
            Parameter::Spacing => config.spacing,
            Parameter::Eccentricity => config.eccentricity,
            Parameter::FocalOffsetX => config.focal_offset[0],
            Parameter::FocalOffsetY => config.focal_offset[1],
            Parameter::FieldOfView => config.field_of_view,
        }
    }

    fn write(self, store: &mut ConfigStore, value: f32) {
        match self {
            Parameter::Spacing => store.set_spacing(value),
            Parameter::Eccentricity => store.set_eccentricity(value),
            Parameter::FocalOffsetX => store.set_focal_offset_x(value),
            Parameter::FocalOffsetY => store.set_focal_offset_y(value),
            Parameter::FieldOfView => store.set_field_of_view(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Adjust(Parameter, i32),
    Reset,
    Capture,
    ExportConfig,
    ReloadConfig,
}

impl Control {
    pub fn from_key(key: &Key) -> Option<Self> {
        let control = match key {
            Key::Named(NamedKey::ArrowLeft) => Control::Adjust(Parameter::FocalOffsetX, -1),
            Key::Named(NamedKey::ArrowRight) => Control::Adjust(Parameter::FocalOffsetX, 1),
            Key::Named(NamedKey::ArrowDown) => Control::Adjust(Parameter::FocalOffsetY, -1),
            Key::Named(NamedKey::ArrowUp) => Control::Adjust(Parameter::FocalOffsetY, 1),
            Key::Character(value) => match value.to_ascii_lowercase().as_str() {
                "[" => Control::Adjust(Parameter::Spacing, -1),
                "]" => Control::Adjust(Parameter::Spacing, 1),
                "-" => Control::Adjust(Parameter::Eccentricity, -1),
                "=" | "+" => Control::Adjust(Parameter::Eccentricity, 1),
                "," => Control::Adjust(Parameter::FieldOfView, -1),
                "." => Control::Adjust(Parameter::FieldOfView, 1),
                "r" => Control::Reset,
                "p" => Control::Capture,
                "c" => Control::ExportConfig,
                "i" => Control::ReloadConfig,
                _ => return None,
            },
            _ => return None,
        };
        Some(control)
    }
}

/// Moves `parameter` by `steps` increments and returns the value written.
pub fn adjust(store: &mut ConfigStore, parameter: Parameter, steps: i32) -> f32 {
    let current = parameter.read(&store.snapshot());
    let next = parameter.range().nudge(current, steps);
    parameter.write(store, next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(value: &str) -> Key {
        Key::Character(value.into())
    }

    #[test]
    fn maps_bindings_to_controls() {
        assert_eq!(
            Control::from_key(&character("]")),
            Some(Control::Adjust(Parameter::Spacing, 1))
        );
        assert_eq!(Control::from_key(&character("P")), Some(Control::Capture));
        assert_eq!(
            Control::from_key(&Key::Named(NamedKey::ArrowUp)),
            Some(Control::Adjust(Parameter::FocalOffsetY, 1))
        );
        assert_eq!(Control::from_key(&character("z")), None);
        assert_eq!(Control::from_key(&Key::Named(NamedKey::Escape)), None);
    }

    #[test]
    fn adjustments_stay_within_limits() {
        let mut store = ConfigStore::new();
        for _ in 0..50 {
            adjust(&mut store, Parameter::Spacing, 1);
        }
        assert_eq!(store.spacing(), limits::SPACING.max());

        let value = adjust(&mut store, Parameter::Eccentricity, 1);
        assert_eq!(value, 1.0);
        assert_eq!(store.eccentricity(), 1.0);

        for _ in 0..100 {
            adjust(&mut store, Parameter::FieldOfView, -1);
        }
        assert_eq!(store.field_of_view(), 20.0);
    }

    #[test]
    fn focal_steps_move_one_axis() {
        let mut store = ConfigStore::new();
        adjust(&mut store, Parameter::FocalOffsetX, -2);
        let [x, y] = store.focal_offset();
        assert!((x + 0.1).abs() < 1e-5);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn unchanged_value_does_not_bump_revision() {
        let mut store = ConfigStore::new();
        adjust(&mut store, Parameter::Eccentricity, 1);
        assert_eq!(store.revision(), 0);
    }
}
