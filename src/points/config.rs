//! Export and import options.
//!
//! Both structs read from JSON with every field optional, so a config file
//! only names what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::{Error, Result};

/// How imported positions move between the bracketing samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    /// `position + velocity * alpha`.
    #[default]
    Alpha,
    /// `position + velocity * alpha * (t[ceil] - t[floor])`.
    TimeOffset,
}

/// Options for [`super::PointsExporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Bake the object's world transform into positions and velocities.
    pub global_space: bool,
    /// Write frames without elements as a single sentinel id.
    pub legacy_empty_sentinel: bool,
    pub export_generic_properties: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            global_space: false,
            legacy_empty_sentinel: false,
            export_generic_properties: true,
        }
    }
}

/// Options for [`super::PointsImporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub import_generic_properties: bool,
    pub extrapolation: Extrapolation,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_generic_properties: true,
            extrapolation: Extrapolation::Alpha,
        }
    }
}

macro_rules! impl_json_options {
    ($($t:ty),*) => {
        $(
            impl $t {
                /// Parse from a JSON document.
                pub fn from_json_str(json: &str) -> Result<Self> {
                    Ok(serde_json::from_str(json)?)
                }

                /// Load from a JSON file.
                pub fn load(path: impl AsRef<Path>) -> Result<Self> {
                    let path = path.as_ref();
                    let text = std::fs::read_to_string(path)?;
                    serde_json::from_str(&text).map_err(|source| Error::Config {
                        path: path.to_path_buf(),
                        source,
                    })
                }

                /// Serialize as pretty JSON.
                pub fn to_json(&self) -> Result<String> {
                    Ok(serde_json::to_string_pretty(self)?)
                }
            }
        )*
    };
}

impl_json_options!(ExportOptions, ImportOptions);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = ExportOptions::from_json_str(r#"{ "global_space": true }"#).unwrap();
        assert!(opts.global_space);
        assert!(opts.export_generic_properties);
        assert!(!opts.legacy_empty_sentinel);

        let opts = ImportOptions::from_json_str(r#"{ "extrapolation": "time_offset" }"#).unwrap();
        assert_eq!(opts.extrapolation, Extrapolation::TimeOffset);
        assert!(opts.import_generic_properties);
    }

    #[test]
    fn test_json_round_trip() {
        let opts = ImportOptions {
            import_generic_properties: false,
            extrapolation: Extrapolation::TimeOffset,
        };
        let json = opts.to_json().unwrap();
        assert_eq!(ImportOptions::from_json_str(&json).unwrap(), opts);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ExportOptions::from_json_str("{ \"global_space\": 3 }"),
            Err(Error::Json(_))
        ));
    }
}
