//! JSON exchange format for disc configurations.
//!
//! ```json
//! { "discs": { "distance": 0.5, "ellipsisProportion": 1.0,
//!              "centerOffsetX": 0.0, "centerOffsetY": 0.0 } }
//! ```
//!
//! Import is lenient per field: anything present, numeric and finite is
//! applied through the matching store setter, everything else is skipped.
//! Only a payload without a `discs` object is rejected as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConfigStore, DiscConfig};

pub const DISCS_KEY: &str = "discs";
pub const DISTANCE_KEY: &str = "distance";
pub const ELLIPSIS_PROPORTION_KEY: &str = "ellipsisProportion";
pub const CENTER_OFFSET_X_KEY: &str = "centerOffsetX";
pub const CENTER_OFFSET_Y_KEY: &str = "centerOffsetY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration format")]
    InvalidFormat,
}

/// Serialized shape of an exported configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub discs: DiscsSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscsSection {
    pub distance: f32,
    pub ellipsis_proportion: f32,
    pub center_offset_x: f32,
    pub center_offset_y: f32,
}

impl From<&DiscConfig> for ConfigDocument {
    fn from(config: &DiscConfig) -> Self {
        Self {
            discs: DiscsSection {
                distance: config.spacing,
                ellipsis_proportion: config.eccentricity,
                center_offset_x: config.focal_offset[0],
                center_offset_y: config.focal_offset[1],
            },
        }
    }
}

/// Which fields an import applied and which it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

pub fn export_json(config: &DiscConfig) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(&ConfigDocument::from(config))?)
}

impl ConfigStore {
    /// Serializes the current snapshot in the exchange format.
    pub fn export_json(&self) -> Result<String, ConfigError> {
        export_json(&self.snapshot())
    }

    /// Applies a JSON document through the field setters.
    ///
    /// Nothing is mutated when the payload fails to parse or lacks a `discs`
    /// object.
    pub fn import_json(&mut self, input: &str) -> Result<ImportReport, ConfigError> {
        let document: Value = serde_json::from_str(input)?;
        let discs = document
            .get(DISCS_KEY)
            .and_then(Value::as_object)
            .ok_or(ConfigError::InvalidFormat)?;

        let mut report = ImportReport::default();
        let fields: [(&'static str, fn(&mut ConfigStore, f32)); 4] = [
            (DISTANCE_KEY, ConfigStore::set_spacing),
            (ELLIPSIS_PROPORTION_KEY, ConfigStore::set_eccentricity),
            (CENTER_OFFSET_X_KEY, ConfigStore::set_focal_offset_x),
            (CENTER_OFFSET_Y_KEY, ConfigStore::set_focal_offset_y),
        ];
        for (key, setter) in fields {
            match discs.get(key).and_then(finite_number) {
                Some(value) => {
                    setter(self, value);
                    report.applied.push(key);
                }
                None => {
                    if discs.contains_key(key) {
                        tracing::warn!(field = key, "ignoring non-numeric or non-finite configuration value");
                    }
                    report.skipped.push(key);
                }
            }
        }
        tracing::info!(applied = ?report.applied, skipped = ?report.skipped, "imported disc configuration");
        Ok(report)
    }
}

fn finite_number(value: &Value) -> Option<f32> {
    let value = value.as_f64()? as f32;
    value.is_finite().then_some(value)
}
