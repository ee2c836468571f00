// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pointer-driven editing modes.
//!
//! The host intersects the pointer ray with the scene and hands the ordered hits to
//! [`InteractionMachine::handle`]. The machine owns the selection and the relation being drawn;
//! nothing else reads or writes them.

mod machine;

use std::time::Instant;

use smallvec::SmallVec;
use smol_str::SmolStr;
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::formula::FormulaEvaluator;
use crate::host::{EventBus, SceneRenderer, SimulationUtility};
use crate::model::{
    ClassId, ClassInstanceId, MetaModelRegistry, PortInstanceId, RelationclassId,
    RelationclassInstanceId, SceneInstance, Vec3,
};
use crate::ops::OpsError;
use crate::reactive::VizError;

pub use machine::InteractionMachine;
pub(crate) use machine::forget_rendered;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    View,
    Select,
    DrawClass(ClassId),
    DrawRelation(RelationclassId),
    Simulate,
}

/// Pointer buttons by their fixed ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    /// Translate.
    Primary = 0,
    /// Rotate, 3D only.
    Auxiliary = 1,
    /// Scale.
    Secondary = 2,
}

impl Button {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Primary),
            1 => Some(Self::Auxiliary),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Class(ClassInstanceId),
    Port(PortInstanceId),
    Relationclass(RelationclassInstanceId),
    /// A clickable part of an instance carrying a simulation formula.
    Button { owner: Uuid, formula: SmolStr },
    Plane,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub target: HitTarget,
    pub point: Vec3,
}

impl Hit {
    pub fn new(target: HitTarget, point: Vec3) -> Self {
        Self { target, point }
    }
}

/// A pointer-down with its intersections, nearest first.
#[derive(Debug, Clone)]
pub struct PointerEvent {
    pub button: Button,
    pub hits: SmallVec<[Hit; 4]>,
    pub at: Instant,
}

impl PointerEvent {
    pub fn new(button: Button, hits: impl IntoIterator<Item = Hit>, at: Instant) -> Self {
        Self {
            button,
            hits: hits.into_iter().collect(),
            at,
        }
    }
}

/// The instance the attribute panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentInstance {
    Class(ClassInstanceId),
    Relationclass(RelationclassInstanceId),
    Port(PortInstanceId),
}

impl CurrentInstance {
    pub fn uuid(&self) -> &Uuid {
        match self {
            Self::Class(id) => id.as_uuid(),
            Self::Relationclass(id) => id.as_uuid(),
            Self::Port(id) => id.as_uuid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Drawing,
    /// Finished; retired once the grace delay has passed.
    Finalizing { retire_at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLine {
    pub relation: RelationclassInstanceId,
    pub state: LineState,
}

/// Interaction state of one scene tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSession {
    pub current: Option<CurrentInstance>,
    pub active_line: Option<ActiveLine>,
}

/// Collaborators a pointer event may touch.
pub struct Services<'a> {
    pub scene: &'a mut SceneInstance,
    pub meta: &'a dyn MetaModelRegistry,
    pub evaluator: &'a dyn FormulaEvaluator,
    pub renderer: &'a dyn SceneRenderer,
    pub bus: &'a dyn EventBus,
    pub simulation: &'a dyn SimulationUtility,
    pub config: &'a EditorConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ignored,
    ModeChanged(Mode),
    Selected(CurrentInstance),
    Deselected,
    ClassPlaced(ClassInstanceId),
    RelationStarted(RelationclassInstanceId),
    BendpointAdded(ClassInstanceId),
    RelationFinished(RelationclassInstanceId),
    RelationDiscarded(RelationclassInstanceId),
    /// The endpoint was not admitted; nothing changed.
    Rejected(OpsError),
    Simulated { context: Uuid },
    /// The event failed and the machine fell back to [`Mode::View`].
    Failed(InteractionError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractionError {
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error(transparent)]
    Viz(#[from] VizError),
}
