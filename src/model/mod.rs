// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! The meta model is the immutable schema; instances are the live, mutable graph typed by it.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod graph;
pub mod ids;
pub mod instance;
pub mod meta;
pub mod value;
pub mod visual;

pub use geometry::{Axis, Transform, Vec3};
pub use graph::InstanceGraph;
pub use ids::{
    AttributeId, AttributeInstanceId, AttributeTypeId, ClassId, ClassInstanceId, Id, IdError,
    PortId, PortInstanceId, RelationclassId, RelationclassInstanceId, RoleId, RoleInstanceId,
    SceneInstanceId, SceneTypeId, TableRowId,
};
pub use instance::{
    AttributeInstance, AttributeOwner, ClassInstance, ClassInstanceKind, Endpoint, InstanceKind,
    LinePoint, PortInstance, PortOwner, RelationclassInstance, RoleDirection, RoleInstance,
    RoleOwner, RoleTarget, SceneInstance, TableRow,
};
pub use meta::{
    Attribute, AttributeKind, AttributeType, Class, MetaModel, MetaModelRegistry, Port,
    ReferenceTargets, Relationclass, Role, SceneType,
};
pub use value::AttributeValue;
pub use visual::{CustomVariable, DrawCommand, Visual, VisualState};
