// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scene files: `{ "format": 1, "scene": { … } }`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::model::{MetaModel, MetaModelRegistry, SceneInstance};

pub const SCENE_FORMAT: u32 = 1;

const INLINE_PATH: &str = "<inline>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    pub format: u32,
    pub scene: SceneInstance,
}

#[derive(Serialize)]
struct SceneFileRef<'a> {
    format: u32,
    scene: &'a SceneInstance,
}

#[derive(Deserialize)]
struct Header {
    format: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Temp file plus rename, without fsync.
    #[default]
    BestEffort,
    /// Also syncs the file and its directory where the platform allows it.
    Durable,
}

pub fn scene_to_json(scene: &SceneInstance) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&SceneFileRef {
        format: SCENE_FORMAT,
        scene,
    })
}

pub fn scene_from_json(content: &str) -> Result<SceneInstance, StoreError> {
    decode_scene(content, Path::new(INLINE_PATH))
}

fn decode_scene(content: &str, path: &Path) -> Result<SceneInstance, StoreError> {
    let json_error = |source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    };
    let header: Header = serde_json::from_str(content).map_err(json_error)?;
    if header.format != SCENE_FORMAT {
        return Err(StoreError::UnsupportedFormat {
            found: header.format,
        });
    }
    let file: SceneFile = serde_json::from_str(content).map_err(json_error)?;
    Ok(file.scene)
}

pub fn load_scene(path: &Path) -> Result<SceneInstance, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scene = decode_scene(&content, path)?;
    info!(
        path:% = path.display(),
        scene:% = scene.uuid,
        classes = scene.class_instances.len(),
        relations = scene.relationclasses_instances.len();
        "scene loaded"
    );
    Ok(scene)
}

pub fn save_scene(
    path: &Path,
    scene: &SceneInstance,
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let json = scene_to_json(scene).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes(), durability)?;
    info!(path:% = path.display(), scene:% = scene.uuid; "scene saved");
    Ok(())
}

/// Loads a meta model and authors the dependency sets of formulas stored without one.
///
/// The first scene type becomes the active one.
pub fn load_meta_model(path: &Path) -> Result<MetaModel, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut meta: MetaModel = serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    meta.author_formulas();
    let first = meta.scene_types().first().map(|st| st.uuid);
    meta.set_active_scene_type(first);
    debug!(path:% = path.display(), scene_types = meta.scene_types().len(); "meta model loaded");
    Ok(meta)
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let io_error = |path: &Path, source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(file_name) = path.file_name() else {
        return Err(io_error(path, io::Error::other("path has no file name")));
    };
    fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".metascene.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| io_error(&tmp_path, source))?;
    file.write_all(contents)
        .map_err(|source| io_error(&tmp_path, source))?;
    if durability == WriteDurability::Durable {
        file.sync_all()
            .map_err(|source| io_error(&tmp_path, source))?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(path, source));
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| io_error(parent, source))?;
            dir.sync_all().map_err(|source| io_error(parent, source))?;
        }
    }
    Ok(())
}
