// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Cascading deletion.
//!
//! A cascade only fails on its initial lookup; once it starts mutating it runs to completion,
//! so the scene is either untouched or consistent again. Deleting an id that is already gone
//! returns `NotFound`.

use std::collections::BTreeSet;

use log::{debug, info};
use uuid::Uuid;

use super::{Delta, DeltaBuilder, ObjectKind, OpsError};
use crate::model::{
    AttributeInstance, AttributeInstanceId, AttributeValue, ClassInstanceId, ClassInstanceKind,
    LinePoint, PortInstance, PortInstanceId, PortOwner, RelationclassInstanceId, RoleDirection,
    RoleOwner, RoleTarget, SceneInstance,
};
use crate::query::lookup::{
    attribute_instance_mut, bendpoint_relation, incoming_relations, outgoing_relations,
    port_instance, relations_touching_class,
};

/// What happens to the bend points of a deleted relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BendPoints {
    /// Delete each bend point as a class instance.
    #[default]
    Delete,
    /// Relations only: keep the bend point instances and turn them into regular class
    /// instances.
    Keep,
}

pub fn delete_class_instance(
    scene: &mut SceneInstance,
    id: &ClassInstanceId,
) -> Result<Delta, OpsError> {
    let mut delta = DeltaBuilder::default();
    delete_class(scene, id, &mut delta)?;
    Ok(delta.finish())
}

pub fn delete_relationclass_instance(
    scene: &mut SceneInstance,
    id: &RelationclassInstanceId,
    bendpoints: BendPoints,
) -> Result<Delta, OpsError> {
    let mut delta = DeltaBuilder::default();
    delete_relation(scene, id, bendpoints, &mut delta)?;
    Ok(delta.finish())
}

/// Deletes one port instance and every relation attached to it.
pub fn delete_port_instance(
    scene: &mut SceneInstance,
    id: &PortInstanceId,
) -> Result<Delta, OpsError> {
    let owner = port_instance(scene, id)
        .map(|p| p.owner)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Port, id))?;
    let mut delta = DeltaBuilder::default();

    let attached = relations_at(scene, id.as_uuid());
    for relation in attached {
        delete_relation_if_present(scene, &relation, &mut delta);
    }

    let ports = match owner {
        PortOwner::Class(owner) => {
            delta.record_updated(ObjectKind::Class, owner);
            scene
                .class_instances
                .get_mut(&owner)
                .map(|c| &mut c.port_instances)
        }
        PortOwner::Relationclass(owner) => {
            delta.record_updated(ObjectKind::Relationclass, owner);
            scene
                .relationclasses_instances
                .get_mut(&owner)
                .map(|r| &mut r.port_instances)
        }
    };
    let removed = match ports {
        Some(ports) => {
            let at = ports.iter().position(|p| &p.uuid == id);
            at.map(|at| ports.remove(at))
        }
        None => None,
    };
    if let Some(port) = removed {
        forget_port(scene, &port, &mut delta);
    }

    info!(port_instance:% = id; "port instance deleted");
    Ok(delta.finish())
}

fn relations_at(scene: &SceneInstance, endpoint: &Uuid) -> Vec<RelationclassInstanceId> {
    outgoing_relations(scene, endpoint, None)
        .into_iter()
        .chain(incoming_relations(scene, endpoint, None))
        .map(|r| r.uuid)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn delete_class(
    scene: &mut SceneInstance,
    id: &ClassInstanceId,
    delta: &mut DeltaBuilder,
) -> Result<(), OpsError> {
    let class = scene
        .class_instances
        .get(id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Class, id))?;

    let attached = relations_touching_class(scene, class);
    let bend_of = bendpoint_relation(scene, id).map(|r| r.uuid);

    // A bend point is detached from its line; the relation itself survives.
    if let Some(relation) = bend_of.and_then(|r| scene.relationclasses_instances.get_mut(&r)) {
        relation
            .line_points
            .retain(|point| point.bendpoint().as_ref() != Some(id));
        delta.record_updated(ObjectKind::Relationclass, relation.uuid);
        debug!(relation:% = relation.uuid, bendpoint:% = id; "bend point detached");
    }

    for relation in attached {
        delete_relation_if_present(scene, &relation, delta);
    }

    let Some(class) = scene.class_instances.remove(id) else {
        return Ok(());
    };
    let mut targets = vec![*class.uuid.as_uuid()];
    targets.extend(class.port_instances.iter().map(|p| *p.uuid.as_uuid()));
    unbind_references(scene, &targets, delta);
    forget_attributes(scene, &class.attribute_instances, delta);
    for port in &class.port_instances {
        forget_port(scene, port, delta);
    }
    delta.record_removed(ObjectKind::Class, class.uuid);

    info!(class_instance:% = id, name = class.name.as_str(); "class instance deleted");
    Ok(())
}

fn delete_relation_if_present(
    scene: &mut SceneInstance,
    id: &RelationclassInstanceId,
    delta: &mut DeltaBuilder,
) {
    // An earlier step of the same cascade may already have removed it.
    if scene.relationclasses_instances.contains_key(id) {
        let _ = delete_relation(scene, id, BendPoints::Delete, delta);
    }
}

fn delete_relation(
    scene: &mut SceneInstance,
    id: &RelationclassInstanceId,
    bendpoints: BendPoints,
    delta: &mut DeltaBuilder,
) -> Result<(), OpsError> {
    // Removed first so bend point cascades below cannot find it again.
    let relation = scene
        .relationclasses_instances
        .remove(id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Relationclass, id))?;

    for role in std::iter::once(relation.role_instance_from).chain(relation.role_instance_to) {
        if scene.role_instances.remove(&role).is_some() {
            delta.record_removed(ObjectKind::Role, role);
        }
    }

    for bendpoint in relation.line_points.iter().filter_map(LinePoint::bendpoint) {
        match bendpoints {
            BendPoints::Delete => {
                if delete_class(scene, &bendpoint, delta).is_err() {
                    debug!(bendpoint:% = bendpoint; "bend point already gone");
                }
            }
            BendPoints::Keep => {
                if let Some(class) = scene.class_instances.get_mut(&bendpoint) {
                    class.kind = ClassInstanceKind::Regular;
                    delta.record_updated(ObjectKind::Class, bendpoint);
                }
            }
        }
    }

    for port in &relation.port_instances {
        for attached in relations_at(scene, port.uuid.as_uuid()) {
            delete_relation_if_present(scene, &attached, delta);
        }
    }

    let mut targets = vec![*relation.uuid.as_uuid()];
    targets.extend(relation.port_instances.iter().map(|p| *p.uuid.as_uuid()));
    unbind_references(scene, &targets, delta);
    forget_attributes(scene, &relation.attribute_instances, delta);
    for port in &relation.port_instances {
        forget_port(scene, port, delta);
    }
    delta.record_removed(ObjectKind::Relationclass, relation.uuid);

    info!(relation:% = id, name = relation.name.as_str(); "relation deleted");
    Ok(())
}

fn forget_port(scene: &mut SceneInstance, port: &PortInstance, delta: &mut DeltaBuilder) {
    forget_attributes(scene, &port.attribute_instances, delta);
    delta.record_removed(ObjectKind::Port, port.uuid);
}

/// Drops the role instances owned by removed reference attributes.
fn forget_attributes(
    scene: &mut SceneInstance,
    attributes: &[AttributeInstance],
    delta: &mut DeltaBuilder,
) {
    let removed = attributes
        .iter()
        .flat_map(AttributeInstance::with_cells)
        .map(|attr| attr.uuid)
        .collect::<BTreeSet<AttributeInstanceId>>();
    scene.role_instances.retain(|id, role| {
        let owned = matches!(role.owner, RoleOwner::Attribute(attr) if removed.contains(&attr));
        if owned {
            delta.record_removed(ObjectKind::Role, id);
        }
        !owned
    });
    for attr in removed {
        delta.record_removed(ObjectKind::Attribute, attr);
    }
}

/// Unbinds reference roles that point at removed instances and clears the attribute value.
fn unbind_references(scene: &mut SceneInstance, targets: &[Uuid], delta: &mut DeltaBuilder) {
    let mut cleared = Vec::new();
    for role in scene.role_instances.values_mut() {
        if role.direction != RoleDirection::Reference {
            continue;
        }
        let Some(target) = role.target.uuid() else {
            continue;
        };
        if targets.contains(target) {
            role.target = RoleTarget::Unbound;
            delta.record_updated(ObjectKind::Role, role.uuid);
            if let RoleOwner::Attribute(attr) = role.owner {
                cleared.push(attr);
            }
        }
    }
    for attr in cleared {
        if let Some(instance) = attribute_instance_mut(scene, &attr) {
            instance.value = AttributeValue::Null;
            delta.record_updated(ObjectKind::Attribute, attr);
        }
    }
}
