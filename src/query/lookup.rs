// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::model::{
    AttributeInstance, AttributeInstanceId, AttributeOwner, ClassInstance, ClassInstanceId,
    ClassInstanceKind, Endpoint, InstanceGraph, InstanceKind, PortInstance, PortInstanceId,
    PortOwner, RelationclassId, RelationclassInstance, RelationclassInstanceId, RoleInstance,
    RoleInstanceId, RoleTarget, SceneInstance, SceneInstanceId, Transform, Vec3, VisualState,
};

/// A borrowed instance of any kind.
#[derive(Debug, Clone, Copy)]
pub enum InstanceRef<'a> {
    Scene(&'a SceneInstance),
    Class(&'a ClassInstance),
    Relationclass(&'a RelationclassInstance),
    Port(&'a PortInstance),
}

impl<'a> InstanceRef<'a> {
    pub fn kind(&self) -> InstanceKind {
        match self {
            Self::Scene(_) => InstanceKind::Scene,
            Self::Class(_) => InstanceKind::Class,
            Self::Relationclass(_) => InstanceKind::Relationclass,
            Self::Port(_) => InstanceKind::Port,
        }
    }

    pub fn uuid(&self) -> &'a Uuid {
        match *self {
            Self::Scene(s) => s.uuid.as_uuid(),
            Self::Class(c) => c.uuid.as_uuid(),
            Self::Relationclass(r) => r.uuid.as_uuid(),
            Self::Port(p) => p.uuid.as_uuid(),
        }
    }

    /// Id of the meta concept this instance is typed by.
    pub fn meta_id(&self) -> &'a Uuid {
        match *self {
            Self::Scene(s) => s.uuid_scene_type.as_uuid(),
            Self::Class(c) => c.uuid_class.as_uuid(),
            Self::Relationclass(r) => r.uuid_relationclass.as_uuid(),
            Self::Port(p) => p.uuid_port.as_uuid(),
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            Self::Scene(s) => &s.name,
            Self::Class(c) => &c.name,
            Self::Relationclass(r) => &r.name,
            Self::Port(p) => &p.name,
        }
    }

    /// Attribute instances owned directly by this instance.
    pub fn attributes(&self) -> &'a [AttributeInstance] {
        match *self {
            Self::Scene(s) => &s.attribute_instances,
            Self::Class(c) => &c.attribute_instances,
            Self::Relationclass(r) => &r.attribute_instances,
            Self::Port(p) => &p.attribute_instances,
        }
    }

    pub fn visual(&self) -> &'a VisualState {
        match *self {
            Self::Scene(s) => &s.visual,
            Self::Class(c) => &c.visual,
            Self::Relationclass(r) => &r.visual,
            Self::Port(p) => &p.visual,
        }
    }

    pub fn transform(&self) -> Transform {
        match self {
            Self::Scene(_) => Transform::default(),
            Self::Class(c) => c.transform,
            Self::Relationclass(r) => r.transform,
            Self::Port(p) => Transform::at(p.offset),
        }
    }
}

/// A mutably borrowed instance of any kind.
#[derive(Debug)]
pub enum InstanceMut<'a> {
    Scene(&'a mut SceneInstance),
    Class(&'a mut ClassInstance),
    Relationclass(&'a mut RelationclassInstance),
    Port(&'a mut PortInstance),
}

impl InstanceMut<'_> {
    pub fn attributes_mut(&mut self) -> &mut Vec<AttributeInstance> {
        match self {
            Self::Scene(s) => &mut s.attribute_instances,
            Self::Class(c) => &mut c.attribute_instances,
            Self::Relationclass(r) => &mut r.attribute_instances,
            Self::Port(p) => &mut p.attribute_instances,
        }
    }

    pub fn visual_mut(&mut self) -> &mut VisualState {
        match self {
            Self::Scene(s) => &mut s.visual,
            Self::Class(c) => &mut c.visual,
            Self::Relationclass(r) => &mut r.visual,
            Self::Port(p) => &mut p.visual,
        }
    }
}

/// Finds an instance in one scene.
///
/// With `kind == None` the kinds are tried in [`InstanceKind::SEARCH_ORDER`].
pub fn find_in_scene<'a>(
    scene: &'a SceneInstance,
    id: &Uuid,
    kind: Option<InstanceKind>,
) -> Option<InstanceRef<'a>> {
    match kind {
        Some(kind) => find_kind(scene, id, kind),
        None => InstanceKind::SEARCH_ORDER
            .into_iter()
            .find_map(|kind| find_kind(scene, id, kind)),
    }
}

fn find_kind<'a>(
    scene: &'a SceneInstance,
    id: &Uuid,
    kind: InstanceKind,
) -> Option<InstanceRef<'a>> {
    match kind {
        InstanceKind::Scene => (scene.uuid.as_uuid() == id).then_some(InstanceRef::Scene(scene)),
        InstanceKind::Class => scene
            .class_instances
            .get(&ClassInstanceId::from(*id))
            .map(InstanceRef::Class),
        InstanceKind::Relationclass => scene
            .relationclasses_instances
            .get(&RelationclassInstanceId::from(*id))
            .map(InstanceRef::Relationclass),
        InstanceKind::Port => {
            port_instance(scene, &PortInstanceId::from(*id)).map(InstanceRef::Port)
        }
    }
}

/// Finds an instance in any open scene.
///
/// Kinds are searched in priority order across all scenes (every scene instance before any
/// class instance, and so on); within one kind the active scene is searched first.
pub fn find_instance<'a>(
    graph: &'a InstanceGraph,
    id: &Uuid,
    kind: Option<InstanceKind>,
) -> Option<(SceneInstanceId, InstanceRef<'a>)> {
    let active = graph.active_scene_id();
    let ordered = move || {
        graph
            .active_scene()
            .into_iter()
            .chain(graph.scenes().filter(move |s| Some(s.uuid) != active))
    };
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => InstanceKind::SEARCH_ORDER.to_vec(),
    };
    kinds.into_iter().find_map(|kind| {
        ordered().find_map(|scene| find_kind(scene, id, kind).map(|found| (scene.uuid, found)))
    })
}

pub fn find_in_scene_mut<'a>(
    scene: &'a mut SceneInstance,
    id: &Uuid,
    kind: Option<InstanceKind>,
) -> Option<InstanceMut<'a>> {
    let kind = match kind {
        Some(kind) => kind,
        None => find_in_scene(scene, id, None)?.kind(),
    };
    match kind {
        InstanceKind::Scene => {
            if scene.uuid.as_uuid() == id {
                Some(InstanceMut::Scene(scene))
            } else {
                None
            }
        }
        InstanceKind::Class => scene
            .class_instances
            .get_mut(&ClassInstanceId::from(*id))
            .map(InstanceMut::Class),
        InstanceKind::Relationclass => scene
            .relationclasses_instances
            .get_mut(&RelationclassInstanceId::from(*id))
            .map(InstanceMut::Relationclass),
        InstanceKind::Port => {
            port_instance_mut(scene, &PortInstanceId::from(*id)).map(InstanceMut::Port)
        }
    }
}

/// Every port instance of the scene, class-owned ports first.
pub fn port_instances(scene: &SceneInstance) -> impl Iterator<Item = &PortInstance> {
    scene
        .class_instances
        .values()
        .flat_map(|c| c.port_instances.iter())
        .chain(
            scene
                .relationclasses_instances
                .values()
                .flat_map(|r| r.port_instances.iter()),
        )
}

pub fn port_instance<'a>(
    scene: &'a SceneInstance,
    id: &PortInstanceId,
) -> Option<&'a PortInstance> {
    port_instances(scene).find(|p| &p.uuid == id)
}

pub fn port_instance_mut<'a>(
    scene: &'a mut SceneInstance,
    id: &PortInstanceId,
) -> Option<&'a mut PortInstance> {
    let SceneInstance {
        class_instances,
        relationclasses_instances,
        ..
    } = scene;
    class_instances
        .values_mut()
        .flat_map(|c| c.port_instances.iter_mut())
        .chain(
            relationclasses_instances
                .values_mut()
                .flat_map(|r| r.port_instances.iter_mut()),
        )
        .find(|p| &p.uuid == id)
}

/// All instances typed by the meta concept `meta_id`.
pub fn instances_of<'a>(scene: &'a SceneInstance, meta_id: &Uuid) -> Vec<InstanceRef<'a>> {
    let mut out = Vec::new();
    if scene.uuid_scene_type.as_uuid() == meta_id {
        out.push(InstanceRef::Scene(scene));
    }
    out.extend(
        scene
            .class_instances
            .values()
            .filter(|c| c.uuid_class.as_uuid() == meta_id)
            .map(InstanceRef::Class),
    );
    out.extend(
        scene
            .relationclasses_instances
            .values()
            .filter(|r| r.uuid_relationclass.as_uuid() == meta_id)
            .map(InstanceRef::Relationclass),
    );
    out.extend(
        port_instances(scene)
            .filter(|p| p.uuid_port.as_uuid() == meta_id)
            .map(InstanceRef::Port),
    );
    out
}

/// Every attribute instance structurally below `instance`, table cells and nested
/// instances included.
pub fn attribute_instances<'a>(instance: InstanceRef<'a>) -> Vec<&'a AttributeInstance> {
    let mut out = Vec::new();
    collect_attributes(instance, &mut out);
    out
}

fn collect_attributes<'a>(instance: InstanceRef<'a>, out: &mut Vec<&'a AttributeInstance>) {
    for attr in instance.attributes() {
        out.extend(attr.with_cells());
    }
    match instance {
        InstanceRef::Scene(scene) => {
            for class in scene.class_instances.values() {
                collect_attributes(InstanceRef::Class(class), out);
            }
            for relation in scene.relationclasses_instances.values() {
                collect_attributes(InstanceRef::Relationclass(relation), out);
            }
        }
        InstanceRef::Class(class) => {
            for port in &class.port_instances {
                collect_attributes(InstanceRef::Port(port), out);
            }
        }
        InstanceRef::Relationclass(relation) => {
            for port in &relation.port_instances {
                collect_attributes(InstanceRef::Port(port), out);
            }
        }
        InstanceRef::Port(_) => {}
    }
}

pub fn attribute_instance<'a>(
    scene: &'a SceneInstance,
    id: &AttributeInstanceId,
) -> Option<&'a AttributeInstance> {
    attribute_instances(InstanceRef::Scene(scene))
        .into_iter()
        .find(|a| &a.uuid == id)
}

pub fn attribute_instance_mut<'a>(
    scene: &'a mut SceneInstance,
    id: &AttributeInstanceId,
) -> Option<&'a mut AttributeInstance> {
    let SceneInstance {
        attribute_instances,
        class_instances,
        relationclasses_instances,
        ..
    } = scene;
    if let Some(found) = find_attribute_mut(attribute_instances, id) {
        return Some(found);
    }
    if let Some(found) = class_instances
        .values_mut()
        .find_map(|c| find_in_owner_mut(&mut c.attribute_instances, &mut c.port_instances, id))
    {
        return Some(found);
    }
    relationclasses_instances
        .values_mut()
        .find_map(|r| find_in_owner_mut(&mut r.attribute_instances, &mut r.port_instances, id))
}

fn find_in_owner_mut<'a>(
    attributes: &'a mut [AttributeInstance],
    ports: &'a mut [PortInstance],
    id: &AttributeInstanceId,
) -> Option<&'a mut AttributeInstance> {
    if let Some(found) = find_attribute_mut(attributes, id) {
        return Some(found);
    }
    ports
        .iter_mut()
        .find_map(|p| find_attribute_mut(&mut p.attribute_instances, id))
}

fn find_attribute_mut<'a>(
    attributes: &'a mut [AttributeInstance],
    id: &AttributeInstanceId,
) -> Option<&'a mut AttributeInstance> {
    attributes.iter_mut().find_map(|attr| {
        if &attr.uuid == id {
            return Some(attr);
        }
        attr.table_attributes
            .iter_mut()
            .find_map(|row| find_attribute_mut(&mut row.cells, id))
    })
}

/// The instance an attribute belongs to.
pub fn attribute_owner<'a>(
    scene: &'a SceneInstance,
    owner: &AttributeOwner,
) -> Option<InstanceRef<'a>> {
    find_in_scene(scene, owner.uuid(), Some(owner.kind()))
}

pub fn role_instance<'a>(
    scene: &'a SceneInstance,
    id: &RoleInstanceId,
) -> Option<&'a RoleInstance> {
    scene.role_instances.get(id)
}

fn role_target(scene: &SceneInstance, id: &RoleInstanceId) -> RoleTarget {
    scene
        .role_instances
        .get(id)
        .map(|role| role.target)
        .unwrap_or_default()
}

/// Relations whose `from` role points at `endpoint`.
pub fn outgoing_relations<'a>(
    scene: &'a SceneInstance,
    endpoint: &Uuid,
    relationclass: Option<&RelationclassId>,
) -> Vec<&'a RelationclassInstance> {
    scene
        .relationclasses_instances
        .values()
        .filter(|r| relationclass.map_or(true, |meta| &r.uuid_relationclass == meta))
        .filter(|r| role_target(scene, &r.role_instance_from).uuid() == Some(endpoint))
        .collect()
}

/// Relations whose `to` role points at `endpoint`.
pub fn incoming_relations<'a>(
    scene: &'a SceneInstance,
    endpoint: &Uuid,
    relationclass: Option<&RelationclassId>,
) -> Vec<&'a RelationclassInstance> {
    scene
        .relationclasses_instances
        .values()
        .filter(|r| relationclass.map_or(true, |meta| &r.uuid_relationclass == meta))
        .filter(|r| {
            r.role_instance_to
                .is_some_and(|to| role_target(scene, &to).uuid() == Some(endpoint))
        })
        .collect()
}

/// Ids of relations attached to a class instance or to any of its ports.
pub fn relations_touching_class(
    scene: &SceneInstance,
    class: &ClassInstance,
) -> BTreeSet<RelationclassInstanceId> {
    let endpoints = std::iter::once(*class.uuid.as_uuid())
        .chain(class.port_instances.iter().map(|p| *p.uuid.as_uuid()))
        .collect::<Vec<_>>();
    endpoints
        .iter()
        .flat_map(|endpoint| {
            outgoing_relations(scene, endpoint, None)
                .into_iter()
                .chain(incoming_relations(scene, endpoint, None))
        })
        .map(|r| r.uuid)
        .collect()
}

/// The relation a bend point belongs to, if any.
pub fn bendpoint_relation<'a>(
    scene: &'a SceneInstance,
    class: &ClassInstanceId,
) -> Option<&'a RelationclassInstance> {
    if let Some(ClassInstance {
        kind: ClassInstanceKind::Bendpoint { relation },
        ..
    }) = scene.class_instances.get(class)
    {
        if let Some(found) = scene.relationclasses_instances.get(relation) {
            return Some(found);
        }
    }
    scene
        .relationclasses_instances
        .values()
        .find(|r| r.bendpoints().any(|b| &b == class))
}

/// World position of a relation endpoint.
pub fn endpoint_position(scene: &SceneInstance, endpoint: &Endpoint) -> Option<Vec3> {
    match endpoint {
        Endpoint::Class(id) => scene.class_instances.get(id).map(ClassInstance::position),
        Endpoint::Port(id) => {
            let port = port_instance(scene, id)?;
            let origin = match port.owner {
                PortOwner::Class(owner) => scene.class_instances.get(&owner)?.position(),
                PortOwner::Relationclass(owner) => {
                    scene.relationclasses_instances.get(&owner)?.transform.position
                }
            };
            Some(origin + port.offset)
        }
    }
}
