// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Instance factories.
//!
//! Every factory allocates a fresh id that is not yet used anywhere in the target scene and
//! materializes one attribute instance per meta attribute of the concept.

use log::{debug, info};

use super::{MetaKind, ObjectKind, OpsError};
use crate::model::{
    Attribute, AttributeInstance, AttributeOwner, ClassId, ClassInstance, ClassInstanceId,
    ClassInstanceKind, Endpoint, Id, LinePoint, MetaModelRegistry, PortId, PortInstance,
    PortInstanceId, PortOwner, RelationclassId, RelationclassInstance, RelationclassInstanceId,
    Role, RoleDirection, RoleInstance, RoleInstanceId, RoleOwner, RoleTarget, SceneInstance,
    SceneType, TableRow, Transform, Vec3, VisualState,
};

/// Allocates an id that no instance, attribute, role or table row of `scene` uses yet.
pub fn fresh_id<T>(scene: &SceneInstance) -> Id<T> {
    loop {
        let id = Id::<T>::fresh();
        if !scene.contains_id(id.as_uuid()) {
            return id;
        }
    }
}

/// "Station 3" for the third station of a scene.
fn display_name(base: &str, ordinal: usize) -> String {
    let mut buffer = itoa::Buffer::new();
    let mut name = String::with_capacity(base.len() + 4);
    name.push_str(base);
    name.push(' ');
    name.push_str(buffer.format(ordinal));
    name
}

/// A fresh scene of `scene_type`, with its scene-level attribute instances.
pub fn create_scene_instance(scene_type: &SceneType, name: impl Into<String>) -> SceneInstance {
    let mut scene = SceneInstance::new(Id::fresh(), name, scene_type.uuid);
    let owner = AttributeOwner::SceneInstance(scene.uuid);
    let attributes = sorted(&scene_type.attributes)
        .map(|attr| create_attribute_instance(&scene, attr, owner))
        .collect::<Vec<_>>();
    scene.attribute_instances = attributes;
    info!(scene:% = scene.uuid, scene_type:% = scene_type.name; "scene instance created");
    scene
}

fn sorted(attributes: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    let mut ordered = attributes.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|attr| attr.sequence);
    ordered.into_iter()
}

/// A detached attribute instance for `attribute`, carrying its initial value.
///
/// The caller inserts it into the owner; the id is unique within `scene`.
pub fn create_attribute_instance(
    scene: &SceneInstance,
    attribute: &Attribute,
    owner: AttributeOwner,
) -> AttributeInstance {
    AttributeInstance {
        uuid: fresh_id(scene),
        uuid_attribute: attribute.uuid,
        value: attribute.initial_value(),
        owner,
        table_attributes: Vec::new(),
        role_instance_from: None,
    }
}

fn attribute_instances_for(
    scene: &SceneInstance,
    attributes: &[Attribute],
    owner: AttributeOwner,
) -> Vec<AttributeInstance> {
    let mut out: Vec<AttributeInstance> = Vec::with_capacity(attributes.len());
    for attr in sorted(attributes) {
        let mut instance = create_attribute_instance(scene, attr, owner);
        // Ids allocated in this batch are not in the scene yet.
        while out.iter().any(|a| a.uuid == instance.uuid) {
            instance.uuid = fresh_id(scene);
        }
        out.push(instance);
    }
    out
}

/// One cell per column for a new row of a table attribute.
pub(crate) fn create_table_row(
    scene: &SceneInstance,
    table: &Attribute,
    owner: AttributeOwner,
) -> TableRow {
    TableRow {
        uuid: fresh_id(scene),
        cells: attribute_instances_for(scene, table.table_columns(), owner),
    }
}

fn create_port_instances(
    scene: &SceneInstance,
    meta: &dyn MetaModelRegistry,
    ports: &[PortId],
    owner: PortOwner,
) -> Result<Vec<PortInstance>, OpsError> {
    let mut out = Vec::with_capacity(ports.len());
    for (index, port_id) in ports.iter().enumerate() {
        let port = meta
            .meta_port(port_id)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Port, port_id))?;
        let uuid: PortInstanceId = fresh_id(scene);
        out.push(PortInstance {
            uuid,
            name: display_name(&port.name, index + 1),
            uuid_port: port.uuid,
            owner,
            offset: port.offset,
            attribute_instances: attribute_instances_for(
                scene,
                &port.attributes,
                AttributeOwner::PortInstance(uuid),
            ),
            visual: VisualState::default(),
        });
    }
    Ok(out)
}

/// Creates a class instance at `position` together with its ports and attribute instances.
pub fn create_class_instance(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    class_id: &ClassId,
    position: Vec3,
    kind: ClassInstanceKind,
) -> Result<ClassInstanceId, OpsError> {
    let class = meta
        .meta_class(class_id)
        .ok_or_else(|| OpsError::meta_not_found(MetaKind::Class, class_id))?;

    let uuid: ClassInstanceId = fresh_id(scene);
    let ordinal = scene
        .class_instances
        .values()
        .filter(|c| &c.uuid_class == class_id)
        .count()
        + 1;
    let instance = ClassInstance {
        uuid,
        name: display_name(&class.name, ordinal),
        uuid_class: class.uuid,
        kind,
        transform: Transform::at(position),
        attribute_instances: attribute_instances_for(
            scene,
            &class.attributes,
            AttributeOwner::ClassInstance(uuid),
        ),
        port_instances: create_port_instances(
            scene,
            meta,
            &class.ports,
            PortOwner::Class(uuid),
        )?,
        visual: VisualState::default(),
    };

    info!(
        class_instance:% = uuid,
        class:% = class.name,
        ports = instance.port_instances.len();
        "class instance created"
    );
    scene.class_instances.insert(uuid, instance);
    Ok(uuid)
}

/// Registers a role instance in the scene's role collection.
#[allow(clippy::too_many_arguments)]
pub fn create_role_instance(
    scene: &mut SceneInstance,
    role: &Role,
    target: RoleTarget,
    direction: RoleDirection,
    owner: RoleOwner,
    relationclass: Option<RelationclassId>,
    name: impl Into<String>,
) -> RoleInstanceId {
    let uuid: RoleInstanceId = fresh_id(scene);
    scene.role_instances.insert(
        uuid,
        RoleInstance {
            uuid,
            name: name.into(),
            uuid_role: role.uuid,
            uuid_relationclass: relationclass,
            direction,
            owner,
            target,
        },
    );
    uuid
}

/// Starts a relation at `start`.
///
/// The relation gets its `from` role (bound to `from`, or unbound for a ground-plane start)
/// and a line of one anchor plus a trailing cursor point. The consistency check is the
/// caller's responsibility.
pub fn create_relation_instance(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    relationclass_id: &RelationclassId,
    start: Vec3,
    from: Option<Endpoint>,
) -> Result<RelationclassInstanceId, OpsError> {
    let rc = meta
        .meta_relationclass(relationclass_id)
        .ok_or_else(|| OpsError::meta_not_found(MetaKind::Relationclass, relationclass_id))?;

    let uuid: RelationclassInstanceId = fresh_id(scene);
    let ordinal = scene
        .relationclasses_instances
        .values()
        .filter(|r| &r.uuid_relationclass == relationclass_id)
        .count()
        + 1;
    let attribute_instances = attribute_instances_for(
        scene,
        &rc.attributes,
        AttributeOwner::RelationclassInstance(uuid),
    );
    let port_instances =
        create_port_instances(scene, meta, &rc.ports, PortOwner::Relationclass(uuid))?;
    let role_from = create_role_instance(
        scene,
        &rc.role_from,
        from.map(RoleTarget::from).unwrap_or_default(),
        RoleDirection::From,
        RoleOwner::Relationclass(uuid),
        Some(rc.uuid),
        rc.role_from.name.as_str(),
    );

    let instance = RelationclassInstance {
        uuid,
        name: display_name(&rc.name, ordinal),
        uuid_relationclass: rc.uuid,
        transform: Transform::at(start),
        attribute_instances,
        port_instances,
        line_points: vec![
            LinePoint::Anchor {
                position: start,
                endpoint: from,
            },
            LinePoint::Cursor { position: start },
        ],
        role_instance_from: role_from,
        role_instance_to: None,
        visual: VisualState::default(),
    };

    info!(relation:% = uuid, relationclass:% = rc.name; "relation started");
    scene.relationclasses_instances.insert(uuid, instance);
    Ok(uuid)
}

/// Inserts a bend point before the trailing cursor of an in-progress relation.
pub fn add_bendpoint(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    relation: &RelationclassInstanceId,
    position: Vec3,
) -> Result<ClassInstanceId, OpsError> {
    let instance = scene
        .relationclasses_instances
        .get(relation)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Relationclass, relation))?;
    if !instance.is_in_progress() {
        return Err(OpsError::AlreadyFinished {
            relation: *relation,
        });
    }
    let rc = meta
        .meta_relationclass(&instance.uuid_relationclass)
        .ok_or_else(|| {
            OpsError::meta_not_found(MetaKind::Relationclass, instance.uuid_relationclass)
        })?;
    let bend_class = rc
        .bendpoint_class
        .ok_or(OpsError::MissingBendpointClass {
            relationclass: rc.uuid,
        })?;

    let bendpoint = create_class_instance(
        scene,
        meta,
        &bend_class,
        position,
        ClassInstanceKind::Bendpoint {
            relation: *relation,
        },
    )?;

    let Some(instance) = scene.relationclasses_instances.get_mut(relation) else {
        return Err(OpsError::not_found(ObjectKind::Relationclass, relation));
    };
    let at = instance
        .line_points
        .iter()
        .position(LinePoint::is_cursor)
        .unwrap_or(instance.line_points.len());
    instance.line_points.insert(
        at,
        LinePoint::Bend {
            class_instance: bendpoint,
        },
    );
    debug!(relation:% = relation, bendpoint:% = bendpoint; "bend point added");
    Ok(bendpoint)
}

/// Completes an in-progress relation at `end`, creating its `to` role.
pub fn finish_relation(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    relation: &RelationclassInstanceId,
    end: Vec3,
    to: Option<Endpoint>,
) -> Result<RoleInstanceId, OpsError> {
    let instance = scene
        .relationclasses_instances
        .get(relation)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Relationclass, relation))?;
    if !instance.is_in_progress() {
        return Err(OpsError::AlreadyFinished {
            relation: *relation,
        });
    }
    let rc = meta
        .meta_relationclass(&instance.uuid_relationclass)
        .ok_or_else(|| {
            OpsError::meta_not_found(MetaKind::Relationclass, instance.uuid_relationclass)
        })?;

    let role_to = create_role_instance(
        scene,
        &rc.role_to,
        to.map(RoleTarget::from).unwrap_or_default(),
        RoleDirection::To,
        RoleOwner::Relationclass(*relation),
        Some(rc.uuid),
        rc.role_to.name.as_str(),
    );

    let Some(instance) = scene.relationclasses_instances.get_mut(relation) else {
        return Err(OpsError::not_found(ObjectKind::Relationclass, relation));
    };
    let anchor = LinePoint::Anchor {
        position: end,
        endpoint: to,
    };
    match instance.line_points.last_mut() {
        Some(last) if last.is_cursor() => *last = anchor,
        _ => instance.line_points.push(anchor),
    }
    instance.role_instance_to = Some(role_to);
    info!(relation:% = relation, points = instance.line_points.len(); "relation finished");
    Ok(role_to)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{create_class_instance, create_scene_instance, fresh_id};
    use crate::model::fixtures::{station_meta, StationIds};
    use crate::model::{
        AttributeOwner, ClassInstanceId, ClassInstanceKind, MetaModel, MetaModelRegistry,
        PortOwner, SceneInstance, Vec3,
    };

    fn empty_scene() -> (MetaModel, StationIds, SceneInstance) {
        let (meta, ids) = station_meta();
        let scene_type = meta.scene_type(&ids.scene_type).expect("scene type");
        let scene = create_scene_instance(scene_type, "Line 1");
        (meta, ids, scene)
    }

    #[test]
    fn class_instance_gets_ports_with_default_attributes() {
        let (meta, ids, mut scene) = empty_scene();
        let id = create_class_instance(
            &mut scene,
            &meta,
            &ids.station,
            Vec3::new(1.0, 0.0, 2.0),
            ClassInstanceKind::Regular,
        )
        .expect("create");

        let station = &scene.class_instances[&id];
        assert_eq!(station.name, "Station 1");
        assert_eq!(station.attribute_instances.len(), 4);
        assert_eq!(
            station.attribute(&ids.station_capacity).map(|a| a.value.clone()),
            Some(4_i64.into())
        );
        assert_eq!(station.port_instances.len(), 1);
        let plug = &station.port_instances[0];
        assert_eq!(plug.owner, PortOwner::Class(id));
        assert_eq!(plug.offset, Vec3::new(0.25, 0.0, 0.0));
        assert_eq!(plug.attribute_instances.len(), 1);
        assert_eq!(plug.attribute_instances[0].value, 230.0.into());
        assert_eq!(
            plug.attribute_instances[0].owner,
            AttributeOwner::PortInstance(plug.uuid)
        );
    }

    #[test]
    fn scene_instance_carries_scene_attributes() {
        let (_, ids, scene) = empty_scene();
        assert_eq!(scene.uuid_scene_type, ids.scene_type);
        assert_eq!(scene.attribute_instances.len(), 1);
        assert_eq!(scene.attribute_instances[0].value, "Transit".into());
    }

    #[test]
    fn unknown_class_is_a_meta_error() {
        let (meta, _, mut scene) = empty_scene();
        let err = create_class_instance(
            &mut scene,
            &meta,
            &crate::model::Id::fresh(),
            Vec3::ZERO,
            ClassInstanceKind::Regular,
        )
        .expect_err("unknown class");
        assert!(matches!(err, super::OpsError::MetaNotFound { .. }));
        assert!(scene.class_instances.is_empty());
    }

    proptest! {
        #[test]
        fn created_ids_are_never_reused(count in 1usize..24) {
            let (meta, ids, mut scene) = empty_scene();
            let mut seen = std::collections::BTreeSet::new();
            for i in 0..count {
                let class = if i % 2 == 0 { ids.station } else { ids.sensor };
                let id = create_class_instance(
                    &mut scene,
                    &meta,
                    &class,
                    Vec3::new(i as f64, 0.0, 0.0),
                    ClassInstanceKind::Regular,
                )
                .expect("create");
                prop_assert!(seen.insert(*id.as_uuid()));
                let station = &scene.class_instances[&id];
                for attr in &station.attribute_instances {
                    prop_assert!(seen.insert(*attr.uuid.as_uuid()));
                }
                for port in &station.port_instances {
                    prop_assert!(seen.insert(*port.uuid.as_uuid()));
                    for attr in &port.attribute_instances {
                        prop_assert!(seen.insert(*attr.uuid.as_uuid()));
                    }
                }
            }
            let next: ClassInstanceId = fresh_id(&scene);
            prop_assert!(!seen.contains(next.as_uuid()));
        }
    }
}
