// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! In-memory hosts that remember every call.

use std::cell::RefCell;
use std::collections::BTreeMap;

use uuid::Uuid;

use super::{EditorEvent, EventBus, RenderedObject, SceneRenderer, SimulationUtility, TransformMode};
use crate::model::{Transform, Vec3, Visual};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Attach { instance: Uuid, mode: TransformMode },
    Detach,
    Remove { instance: Uuid },
    DrawAt { instance: Uuid, point: Vec3 },
}

/// A renderer without pixels: drawn objects are kept with their transform and visual.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    objects: RefCell<BTreeMap<Uuid, (Transform, Visual)>>,
    calls: RefCell<Vec<RenderCall>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the user dragging a rendered object.
    pub fn move_object(&self, instance: &Uuid, transform: Transform) -> bool {
        match self.objects.borrow_mut().get_mut(instance) {
            Some((current, _)) => {
                *current = transform;
                true
            }
            None => false,
        }
    }

    pub fn visual_of(&self, instance: &Uuid) -> Option<Visual> {
        self.objects
            .borrow()
            .get(instance)
            .map(|(_, visual)| visual.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<RenderCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl SceneRenderer for RecordingRenderer {
    fn find_object(&self, instance: &Uuid) -> Option<RenderedObject> {
        self.objects
            .borrow()
            .get(instance)
            .map(|(transform, _)| RenderedObject {
                instance: *instance,
                transform: *transform,
            })
    }

    fn attach_transform(&self, instance: &Uuid, mode: TransformMode) {
        self.calls.borrow_mut().push(RenderCall::Attach {
            instance: *instance,
            mode,
        });
    }

    fn detach_transform(&self) {
        self.calls.borrow_mut().push(RenderCall::Detach);
    }

    fn remove_object(&self, instance: &Uuid) {
        self.objects.borrow_mut().remove(instance);
        self.calls.borrow_mut().push(RenderCall::Remove {
            instance: *instance,
        });
    }

    fn draw_at(&self, point: Vec3, instance: &Uuid, visual: &Visual) {
        self.objects
            .borrow_mut()
            .insert(*instance, (Transform::at(point), visual.clone()));
        self.calls.borrow_mut().push(RenderCall::DrawAt {
            instance: *instance,
            point,
        });
    }
}

#[derive(Debug, Default)]
pub struct RecordingBus {
    events: RefCell<Vec<EditorEvent>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, event: EditorEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Records simulation requests; formulas listed in `failing` report an error.
#[derive(Debug, Default)]
pub struct RecordingSimulation {
    runs: RefCell<Vec<(String, Uuid)>>,
    failing: Vec<String>,
}

impl RecordingSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(formulas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            runs: RefCell::default(),
            failing: formulas.into_iter().map(Into::into).collect(),
        }
    }

    pub fn runs(&self) -> Vec<(String, Uuid)> {
        self.runs.borrow().clone()
    }
}

impl SimulationUtility for RecordingSimulation {
    fn run(&self, formula: &str, context: &Uuid) -> Result<(), String> {
        self.runs.borrow_mut().push((formula.to_owned(), *context));
        if self.failing.iter().any(|f| f == formula) {
            return Err(format!("simulation {formula:?} failed"));
        }
        Ok(())
    }
}
