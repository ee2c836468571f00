// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Editor settings loaded from TOML.
//!
//! ```toml
//! placement_step = 0.1
//! finalize_grace_ms = 150
//! three_d = true
//!
//! [hybrid]
//! reference_class = "Reference"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Freehand placements are rounded to multiples of this step on every axis.
    pub placement_step: f64,
    /// Delay before a finished relation stops being the active line.
    pub finalize_grace_ms: u64,
    /// Enables rotation with the auxiliary button.
    pub three_d: bool,
    pub hybrid: HybridConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            placement_step: 0.1,
            finalize_grace_ms: 150,
            three_d: true,
            hybrid: HybridConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn finalize_grace(&self) -> Duration {
        Duration::from_millis(self.finalize_grace_ms)
    }
}

/// Meta names the built-in hybrid algorithms look for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HybridConfig {
    pub reference_class: String,
    pub reference: String,
    pub track_transform: String,
    pub position: String,
    pub rotation: String,
    pub set_position: [String; 3],
    pub set_rotation: [String; 3],
}

impl Default for HybridConfig {
    fn default() -> Self {
        let axes = |prefix: &str| ["X", "Y", "Z"].map(|axis| format!("{prefix} {axis}"));
        Self {
            reference_class: "Reference".to_owned(),
            reference: "Reference".to_owned(),
            track_transform: "Track Transform".to_owned(),
            position: "Position".to_owned(),
            rotation: "Rotation".to_owned(),
            set_position: axes("Set Position"),
            set_rotation: axes("Set Rotation"),
        }
    }
}

/// Loads the configuration at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, StoreError> {
    let Some(path) = path else {
        debug!("no configuration file given, using defaults");
        return Ok(EditorConfig::default());
    };
    info!(path:% = path.display(); "loading configuration");
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|source| StoreError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_config(content: &str) -> Result<EditorConfig, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::{parse_config, EditorConfig};

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").expect("parse");
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.hybrid.set_rotation[2], "Set Rotation Z");
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = parse_config(
            "placement_step = 0.25\nthree_d = false\n[hybrid]\nreference_class = \"Ref\"\n",
        )
        .expect("parse");
        assert_eq!(config.placement_step, 0.25);
        assert!(!config.three_d);
        assert_eq!(config.finalize_grace_ms, 150);
        assert_eq!(config.hybrid.reference_class, "Ref");
        assert_eq!(config.hybrid.position, "Position");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("placement = 1").is_err());
    }
}
