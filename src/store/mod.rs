// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for scenes and meta models on disk.
//!
//! Scenes are stored as JSON with every cross-reference kept by id, so a loaded scene is the
//! same graph that was saved.

use std::io;
use std::path::PathBuf;

pub mod scene_file;

pub use scene_file::{
    load_meta_model, load_scene, save_scene, scene_from_json, scene_to_json, SceneFile,
    WriteDurability, SCENE_FORMAT,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported scene file format {found} (expected {SCENE_FORMAT})")]
    UnsupportedFormat { found: u32 },
    #[error("invalid configuration at {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
