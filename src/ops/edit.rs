// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Attribute, transform and visual-variable edits.

use log::debug;
use smol_str::SmolStr;
use uuid::Uuid;

use super::consistency::candidate_for;
use super::create::{create_role_instance, create_table_row};
use super::{Delta, DeltaBuilder, MetaKind, ObjectKind, OpsError};
use crate::model::{
    AttributeInstanceId, AttributeKind, AttributeValue, ClassInstanceId, CustomVariable, Endpoint,
    InstanceKind, LinePoint, MetaModelRegistry, RoleDirection, RoleInstanceId, RoleOwner,
    RoleTarget, SceneInstance, TableRowId, Transform,
};
use crate::query::lookup::{
    attribute_instance, attribute_instance_mut, endpoint_position, find_in_scene,
    find_in_scene_mut, InstanceMut,
};

/// Replaces an attribute value and returns the previous one.
pub fn set_attribute_value(
    scene: &mut SceneInstance,
    id: &AttributeInstanceId,
    value: AttributeValue,
) -> Result<AttributeValue, OpsError> {
    let attr = attribute_instance_mut(scene, id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, id))?;
    debug!(attribute:% = id, value:% = value; "attribute value set");
    Ok(std::mem::replace(&mut attr.value, value))
}

/// Moves a class or relation instance.
///
/// Relation anchors attached to a moved class (or to one of its ports) follow it.
pub fn set_transform(
    scene: &mut SceneInstance,
    id: &Uuid,
    transform: Transform,
) -> Result<Delta, OpsError> {
    let mut delta = DeltaBuilder::default();
    let kind = find_in_scene(scene, id, None)
        .map(|found| found.kind())
        .ok_or_else(|| OpsError::NotFound {
            kind: ObjectKind::Class,
            id: *id,
        })?;

    match find_in_scene_mut(scene, id, Some(kind)) {
        Some(InstanceMut::Class(class)) => {
            class.transform = transform;
            delta.record_updated(ObjectKind::Class, class.uuid);
        }
        Some(InstanceMut::Relationclass(relation)) => {
            relation.transform = transform;
            delta.record_updated(ObjectKind::Relationclass, relation.uuid);
        }
        _ => {
            return Err(OpsError::NotTransformable {
                kind: kind.into(),
                id: *id,
            })
        }
    }

    if kind == InstanceKind::Class {
        follow_anchors(scene, id, &mut delta);
    }
    Ok(delta.finish())
}

fn follow_anchors(scene: &mut SceneInstance, class: &Uuid, delta: &mut DeltaBuilder) {
    let Some(moved) = scene.class_instances.get(&ClassInstanceId::from(*class)) else {
        return;
    };
    let endpoints = std::iter::once(Endpoint::Class(moved.uuid))
        .chain(moved.port_instances.iter().map(|p| Endpoint::Port(p.uuid)))
        .filter_map(|endpoint| Some((endpoint, endpoint_position(scene, &endpoint)?)))
        .collect::<Vec<_>>();

    for relation in scene.relationclasses_instances.values_mut() {
        let mut touched = false;
        for point in &mut relation.line_points {
            if let LinePoint::Anchor {
                position,
                endpoint: Some(endpoint),
            } = point
            {
                if let Some((_, at)) = endpoints.iter().find(|(e, _)| *e == *endpoint) {
                    *position = *at;
                    touched = true;
                }
            }
        }
        if touched {
            delta.record_updated(ObjectKind::Relationclass, relation.uuid);
        }
    }
}

/// Sets a custom visual variable on any instance. `lock` marks it as a manual override.
pub fn set_custom_variable(
    scene: &mut SceneInstance,
    instance: &Uuid,
    name: impl Into<SmolStr>,
    value: AttributeValue,
    lock: bool,
) -> Result<(), OpsError> {
    let mut found = find_in_scene_mut(scene, instance, None).ok_or(OpsError::NotFound {
        kind: ObjectKind::Class,
        id: *instance,
    })?;
    found.visual_mut().custom_variables.insert(
        name.into(),
        CustomVariable {
            value,
            user_locked: lock,
        },
    );
    Ok(())
}

/// Clears the lock of a custom variable so the next recomputation may overwrite it.
///
/// Returns whether a locked variable was found.
pub fn unlock_custom_variable(
    scene: &mut SceneInstance,
    instance: &Uuid,
    name: &str,
) -> Result<bool, OpsError> {
    let mut found = find_in_scene_mut(scene, instance, None).ok_or(OpsError::NotFound {
        kind: ObjectKind::Class,
        id: *instance,
    })?;
    match found.visual_mut().custom_variables.get_mut(name) {
        Some(var) if var.user_locked => {
            var.user_locked = false;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Binds a reference attribute to `target`, or clears it with [`RoleTarget::Unbound`].
///
/// The target must be admitted by the attribute type's role. The attribute keeps one role
/// instance for its lifetime; rebinding changes that role's target.
pub fn set_reference(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    id: &AttributeInstanceId,
    target: RoleTarget,
) -> Result<RoleInstanceId, OpsError> {
    let attr = attribute_instance(scene, id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, id))?;
    let meta_attr = meta
        .meta_attribute(&attr.uuid_attribute)
        .ok_or_else(|| OpsError::meta_not_found(MetaKind::Attribute, attr.uuid_attribute))?;
    let role = meta_attr.role().ok_or(OpsError::WrongAttributeKind {
        id: *id.as_uuid(),
        expected: "reference",
    })?;

    let candidate = candidate_for(scene, &target).ok_or_else(|| OpsError::NotFound {
        kind: ObjectKind::Class,
        id: target.uuid().copied().unwrap_or(Uuid::nil()),
    })?;
    if !candidate.is_none() && !role.admits(&candidate) {
        return Err(OpsError::InvalidReference { attribute: *id });
    }

    let existing = attr
        .role_instance_from
        .filter(|role_id| scene.role_instances.contains_key(role_id));
    let role_id = match existing {
        Some(role_id) => {
            if let Some(instance) = scene.role_instances.get_mut(&role_id) {
                instance.target = target;
            }
            role_id
        }
        None => create_role_instance(
            scene,
            role,
            target,
            RoleDirection::Reference,
            RoleOwner::Attribute(*id),
            None,
            meta_attr.name.as_str(),
        ),
    };

    if let Some(attr) = attribute_instance_mut(scene, id) {
        attr.role_instance_from = Some(role_id);
        attr.value = match target.uuid() {
            Some(uuid) => AttributeValue::Text(uuid.to_string()),
            None => AttributeValue::Null,
        };
    }
    debug!(attribute:% = id, role:% = role_id; "reference bound");
    Ok(role_id)
}

/// Appends a row of default cells to a table attribute.
pub fn add_table_row(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    id: &AttributeInstanceId,
) -> Result<TableRowId, OpsError> {
    let attr = attribute_instance(scene, id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, id))?;
    let meta_attr = meta
        .meta_attribute(&attr.uuid_attribute)
        .ok_or_else(|| OpsError::meta_not_found(MetaKind::Attribute, attr.uuid_attribute))?;
    if !matches!(meta_attr.attribute_type.kind, AttributeKind::Table { .. }) {
        return Err(OpsError::WrongAttributeKind {
            id: *id.as_uuid(),
            expected: "table",
        });
    }

    let row = create_table_row(scene, meta_attr, attr.owner);
    let row_id = row.uuid;
    let attr = attribute_instance_mut(scene, id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, id))?;
    attr.table_attributes.push(row);
    Ok(row_id)
}
