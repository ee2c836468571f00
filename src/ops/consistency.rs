// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Which instances a relation (or a reference attribute) may point at.
//!
//! The checks are pure: the result depends only on the role's declared target sets and the
//! meta id of the candidate.

use crate::model::{
    ClassInstance, PortInstance, ReferenceTargets, Relationclass, RelationclassInstance, Role,
    RoleTarget, SceneInstance,
};
use crate::query::lookup::port_instance;

/// A prospective relation endpoint or reference target.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    /// Empty space; never admissible.
    None,
    Class(&'a ClassInstance),
    Port(&'a PortInstance),
    Relationclass(&'a RelationclassInstance),
    /// The scene itself, e.g. a click on the ground plane.
    Scene(&'a SceneInstance),
}

impl Candidate<'_> {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl ReferenceTargets {
    pub fn admits(&self, candidate: &Candidate<'_>) -> bool {
        match candidate {
            Candidate::None => false,
            Candidate::Class(c) => self.classes.contains(&c.uuid_class),
            Candidate::Port(p) => self.ports.contains(&p.uuid_port),
            Candidate::Relationclass(r) => self.relationclasses.contains(&r.uuid_relationclass),
            Candidate::Scene(s) => self.scene_types.contains(&s.uuid_scene_type),
        }
    }
}

impl Role {
    pub fn admits(&self, candidate: &Candidate<'_>) -> bool {
        self.targets.admits(candidate)
    }
}

pub fn check_start_point(relationclass: &Relationclass, candidate: Candidate<'_>) -> bool {
    relationclass.role_from.admits(&candidate)
}

pub fn check_end_point(relationclass: &Relationclass, candidate: Candidate<'_>) -> bool {
    relationclass.role_to.admits(&candidate)
}

/// Resolves a role target to a candidate. An unbound target is [`Candidate::None`]; a target
/// that does not resolve in `scene` yields `None`.
pub fn candidate_for<'a>(scene: &'a SceneInstance, target: &RoleTarget) -> Option<Candidate<'a>> {
    match target {
        RoleTarget::Unbound => Some(Candidate::None),
        RoleTarget::ClassInstance(id) => scene.class_instances.get(id).map(Candidate::Class),
        RoleTarget::RelationclassInstance(id) => scene
            .relationclasses_instances
            .get(id)
            .map(Candidate::Relationclass),
        RoleTarget::PortInstance(id) => port_instance(scene, id).map(Candidate::Port),
        RoleTarget::SceneInstance(id) => (&scene.uuid == id).then_some(Candidate::Scene(scene)),
    }
}
