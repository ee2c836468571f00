// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Collaborators supplied by the embedding application.
//!
//! The core never touches rendering primitives or widgets; it asks the host through these
//! traits. [`ChannelBus`] and the recording implementations in [`recording`] serve headless
//! use and tests.

mod bus;
pub mod recording;

use uuid::Uuid;

use crate::model::{AttributeInstanceId, SceneInstanceId, SceneTypeId, Transform, Vec3, Visual};

pub use bus::ChannelBus;

/// What a transform handle attached to a rendered object manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformMode {
    Translate,
    Rotate,
    Scale,
}

/// The renderer's view of one materialized instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedObject {
    pub instance: Uuid,
    pub transform: Transform,
}

pub trait SceneRenderer {
    fn find_object(&self, instance: &Uuid) -> Option<RenderedObject>;
    fn attach_transform(&self, instance: &Uuid, mode: TransformMode);
    fn detach_transform(&self);
    fn remove_object(&self, instance: &Uuid);
    /// Materializes `instance` at `point` with its current visual.
    fn draw_at(&self, point: Vec3, instance: &Uuid, visual: &Visual);
}

/// Topics published by the core or delivered to it by the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionChanged {
        instance: Option<Uuid>,
    },
    AttributePanelRefresh {
        update: bool,
    },
    SceneListChanged,
    OpenReferenceDialog {
        scene_type: SceneTypeId,
        attribute_instance: AttributeInstanceId,
    },
    SceneImported {
        scene: SceneInstanceId,
    },
    /// Something the user should see, e.g. a rejected connection.
    UserNotice {
        message: String,
    },
}

pub trait EventBus {
    fn publish(&self, event: EditorEvent);
}

/// Runs a simulation formula attached to a button object.
pub trait SimulationUtility {
    fn run(&self, formula: &str, context: &Uuid) -> Result<(), String>;
}
