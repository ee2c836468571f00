// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations on scene instances.
//!
//! Operations mutate a [`SceneInstance`](crate::model::SceneInstance) in place and report a
//! coarse [`Delta`] that the host can use to refresh rendered objects.

pub mod consistency;
pub mod copy;
pub mod create;
pub mod delete;
pub mod edit;

use std::collections::BTreeSet;
use std::fmt;

use uuid::Uuid;

use crate::model::{AttributeInstanceId, RelationclassId, RelationclassInstanceId, RoleDirection};

pub use consistency::{check_end_point, check_start_point, Candidate};
pub use copy::{copy_scene, IdRemap};
pub use create::{
    add_bendpoint, create_attribute_instance, create_class_instance, create_relation_instance,
    create_role_instance, create_scene_instance, finish_relation, fresh_id,
};
pub use delete::{
    delete_class_instance, delete_port_instance, delete_relationclass_instance, BendPoints,
};
pub use edit::{
    add_table_row, set_attribute_value, set_custom_variable, set_reference, set_transform,
    unlock_custom_variable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Scene,
    Class,
    Relationclass,
    Port,
    Attribute,
    Role,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scene => "scene instance",
            Self::Class => "class instance",
            Self::Relationclass => "relationclass instance",
            Self::Port => "port instance",
            Self::Attribute => "attribute instance",
            Self::Role => "role instance",
        })
    }
}

impl From<crate::model::InstanceKind> for ObjectKind {
    fn from(kind: crate::model::InstanceKind) -> Self {
        use crate::model::InstanceKind;
        match kind {
            InstanceKind::Scene => Self::Scene,
            InstanceKind::Class => Self::Class,
            InstanceKind::Relationclass => Self::Relationclass,
            InstanceKind::Port => Self::Port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    SceneType,
    Class,
    Relationclass,
    Port,
    Attribute,
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SceneType => "scene type",
            Self::Class => "class",
            Self::Relationclass => "relationclass",
            Self::Port => "port",
            Self::Attribute => "attribute",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpsError {
    #[error("{kind} not found (id={id})")]
    NotFound { kind: ObjectKind, id: Uuid },
    #[error("meta {kind} not found (id={id})")]
    MetaNotFound { kind: MetaKind, id: Uuid },
    #[error("endpoint rejected for {role:?} role of relationclass {relationclass}")]
    InvalidEndpoint {
        role: RoleDirection,
        relationclass: RelationclassId,
    },
    #[error("target not admitted by the role of reference attribute {attribute}")]
    InvalidReference { attribute: AttributeInstanceId },
    #[error("relation {relation} is not in progress")]
    NotInProgress { relation: RelationclassInstanceId },
    #[error("relation {relation} is already finished")]
    AlreadyFinished { relation: RelationclassInstanceId },
    #[error("relationclass {relationclass} declares no bend point class")]
    MissingBendpointClass { relationclass: RelationclassId },
    #[error("{kind} {id} cannot be moved")]
    NotTransformable { kind: ObjectKind, id: Uuid },
    #[error("attribute instance {id} is not of a {expected} type")]
    WrongAttributeKind { id: Uuid, expected: &'static str },
}

impl OpsError {
    pub(crate) fn not_found(kind: impl Into<ObjectKind>, id: impl AsRef<Uuid>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: *id.as_ref(),
        }
    }

    pub(crate) fn meta_not_found(kind: MetaKind, id: impl AsRef<Uuid>) -> Self {
        Self::MetaNotFound {
            kind,
            id: *id.as_ref(),
        }
    }
}

/// An instance touched by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub kind: ObjectKind,
    pub id: Uuid,
}

impl InstanceKey {
    pub fn new(kind: ObjectKind, id: impl AsRef<Uuid>) -> Self {
        Self {
            kind,
            id: *id.as_ref(),
        }
    }
}

/// Minimal delta describing which instances changed as the result of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delta {
    pub removed: Vec<InstanceKey>,
    pub updated: Vec<InstanceKey>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.updated.is_empty()
    }

    pub fn removed_of(&self, kind: ObjectKind) -> impl Iterator<Item = &Uuid> {
        self.removed
            .iter()
            .filter(move |key| key.kind == kind)
            .map(|key| &key.id)
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeltaBuilder {
    removed: BTreeSet<InstanceKey>,
    updated: BTreeSet<InstanceKey>,
}

impl DeltaBuilder {
    /// A removed instance is no longer reported as updated.
    pub(crate) fn record_removed(&mut self, kind: ObjectKind, id: impl AsRef<Uuid>) {
        let key = InstanceKey::new(kind, id);
        self.updated.remove(&key);
        self.removed.insert(key);
    }

    pub(crate) fn record_updated(&mut self, kind: ObjectKind, id: impl AsRef<Uuid>) {
        let key = InstanceKey::new(kind, id);
        if self.removed.contains(&key) {
            return;
        }
        self.updated.insert(key);
    }

    pub(crate) fn finish(self) -> Delta {
        Delta {
            removed: self.removed.into_iter().collect(),
            updated: self.updated.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests;
