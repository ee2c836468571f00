// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use super::ids::SceneInstanceId;
use super::instance::SceneInstance;

/// The live instance graph: every open scene plus the one shown in the active tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceGraph {
    scenes: BTreeMap<SceneInstanceId, SceneInstance>,
    active_scene: Option<SceneInstanceId>,
}

impl InstanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `scene` and makes it active. A scene with the same id is replaced.
    pub fn open_scene(&mut self, scene: SceneInstance) -> SceneInstanceId {
        let id = scene.uuid;
        self.scenes.insert(id, scene);
        self.active_scene = Some(id);
        id
    }

    /// Removes a scene. Closing the active scene activates the next remaining one.
    pub fn close_scene(&mut self, id: &SceneInstanceId) -> Option<SceneInstance> {
        let removed = self.scenes.remove(id)?;
        if self.active_scene.as_ref() == Some(id) {
            self.active_scene = self.scenes.keys().next().copied();
        }
        Some(removed)
    }

    pub fn set_active(&mut self, id: &SceneInstanceId) -> bool {
        if !self.scenes.contains_key(id) {
            return false;
        }
        self.active_scene = Some(*id);
        true
    }

    pub fn active_scene_id(&self) -> Option<SceneInstanceId> {
        self.active_scene
    }

    pub fn active_scene(&self) -> Option<&SceneInstance> {
        self.scenes.get(self.active_scene.as_ref()?)
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut SceneInstance> {
        self.scenes.get_mut(self.active_scene.as_ref()?)
    }

    pub fn scene(&self, id: &SceneInstanceId) -> Option<&SceneInstance> {
        self.scenes.get(id)
    }

    pub fn scene_mut(&mut self, id: &SceneInstanceId) -> Option<&mut SceneInstance> {
        self.scenes.get_mut(id)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &SceneInstance> {
        self.scenes.values()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::InstanceGraph;
    use crate::model::{Id, SceneInstance};

    #[test]
    fn closing_the_active_scene_activates_another() {
        let mut graph = InstanceGraph::new();
        let a = graph.open_scene(SceneInstance::new(Id::fresh(), "a", Id::fresh()));
        let b = graph.open_scene(SceneInstance::new(Id::fresh(), "b", Id::fresh()));
        assert_eq!(graph.active_scene_id(), Some(b));

        assert!(graph.close_scene(&b).is_some());
        assert_eq!(graph.active_scene_id(), Some(a));
        assert!(graph.close_scene(&b).is_none());

        graph.close_scene(&a);
        assert!(graph.active_scene().is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn set_active_requires_an_open_scene() {
        let mut graph = InstanceGraph::new();
        let a = graph.open_scene(SceneInstance::new(Id::fresh(), "a", Id::fresh()));
        assert!(!graph.set_active(&Id::fresh()));
        assert_eq!(graph.active_scene_id(), Some(a));
    }
}
