// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structured scene copy.
//!
//! One traversal assigns a fresh id to every instance-level id of the source scene; the copy
//! is then built field by field through that table. Meta ids and free text are never touched.

use std::collections::HashMap;

use log::info;
use uuid::Uuid;

use crate::model::{
    AttributeInstance, AttributeOwner, AttributeValue, ClassInstance, ClassInstanceKind, Endpoint,
    Id, LinePoint, PortInstance, PortOwner, RelationclassInstance, RoleInstance, RoleOwner,
    RoleTarget, SceneInstance, TableRow,
};

#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    map: HashMap<Uuid, Uuid>,
}

impl IdRemap {
    /// Maps every instance, attribute, role and table row id of `scene` to a fresh id.
    pub fn for_scene(scene: &SceneInstance) -> Self {
        let mut remap = Self::default();
        remap.assign(scene.uuid.as_uuid());
        remap.assign_attributes(&scene.attribute_instances);
        for role in scene.role_instances.keys() {
            remap.assign(role.as_uuid());
        }
        for class in scene.class_instances.values() {
            remap.assign(class.uuid.as_uuid());
            remap.assign_attributes(&class.attribute_instances);
            remap.assign_ports(&class.port_instances);
        }
        for relation in scene.relationclasses_instances.values() {
            remap.assign(relation.uuid.as_uuid());
            remap.assign_attributes(&relation.attribute_instances);
            remap.assign_ports(&relation.port_instances);
        }
        remap
    }

    fn assign(&mut self, id: &Uuid) {
        let fresh = loop {
            let candidate = Uuid::now_v7();
            if !self.map.contains_key(&candidate) && &candidate != id {
                break candidate;
            }
        };
        self.map.insert(*id, fresh);
    }

    fn assign_attributes(&mut self, attributes: &[AttributeInstance]) {
        for attr in attributes {
            self.assign(attr.uuid.as_uuid());
            for row in &attr.table_attributes {
                self.assign(row.uuid.as_uuid());
                self.assign_attributes(&row.cells);
            }
        }
    }

    fn assign_ports(&mut self, ports: &[PortInstance]) {
        for port in ports {
            self.assign(port.uuid.as_uuid());
            self.assign_attributes(&port.attribute_instances);
        }
    }

    /// The new id for `id`; ids outside the copied scene map to themselves.
    pub fn get<T>(&self, id: Id<T>) -> Id<T> {
        match self.map.get(id.as_uuid()) {
            Some(mapped) => Id::from_uuid(*mapped),
            None => id,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn attribute(&self, attr: &AttributeInstance) -> AttributeInstance {
        let value = match (&attr.value, attr.role_instance_from) {
            // Reference attributes display their target id.
            (AttributeValue::Text(text), Some(_)) => match Uuid::parse_str(text) {
                Ok(target) => {
                    let mapped = self.map.get(&target).copied().unwrap_or(target);
                    AttributeValue::Text(mapped.to_string())
                }
                Err(_) => attr.value.clone(),
            },
            _ => attr.value.clone(),
        };
        AttributeInstance {
            uuid: self.get(attr.uuid),
            uuid_attribute: attr.uuid_attribute,
            value,
            owner: self.attribute_owner(attr.owner),
            table_attributes: attr
                .table_attributes
                .iter()
                .map(|row| TableRow {
                    uuid: self.get(row.uuid),
                    cells: self.attributes(&row.cells),
                })
                .collect(),
            role_instance_from: attr.role_instance_from.map(|role| self.get(role)),
        }
    }

    fn attributes(&self, attributes: &[AttributeInstance]) -> Vec<AttributeInstance> {
        attributes.iter().map(|attr| self.attribute(attr)).collect()
    }

    fn attribute_owner(&self, owner: AttributeOwner) -> AttributeOwner {
        match owner {
            AttributeOwner::ClassInstance(id) => AttributeOwner::ClassInstance(self.get(id)),
            AttributeOwner::RelationclassInstance(id) => {
                AttributeOwner::RelationclassInstance(self.get(id))
            }
            AttributeOwner::PortInstance(id) => AttributeOwner::PortInstance(self.get(id)),
            AttributeOwner::SceneInstance(id) => AttributeOwner::SceneInstance(self.get(id)),
        }
    }

    fn port(&self, port: &PortInstance) -> PortInstance {
        PortInstance {
            uuid: self.get(port.uuid),
            name: port.name.clone(),
            uuid_port: port.uuid_port,
            owner: match port.owner {
                PortOwner::Class(id) => PortOwner::Class(self.get(id)),
                PortOwner::Relationclass(id) => PortOwner::Relationclass(self.get(id)),
            },
            offset: port.offset,
            attribute_instances: self.attributes(&port.attribute_instances),
            visual: port.visual.clone(),
        }
    }

    fn endpoint(&self, endpoint: Endpoint) -> Endpoint {
        match endpoint {
            Endpoint::Class(id) => Endpoint::Class(self.get(id)),
            Endpoint::Port(id) => Endpoint::Port(self.get(id)),
        }
    }

    fn class(&self, class: &ClassInstance) -> ClassInstance {
        ClassInstance {
            uuid: self.get(class.uuid),
            name: class.name.clone(),
            uuid_class: class.uuid_class,
            kind: match class.kind {
                ClassInstanceKind::Regular => ClassInstanceKind::Regular,
                ClassInstanceKind::Bendpoint { relation } => ClassInstanceKind::Bendpoint {
                    relation: self.get(relation),
                },
            },
            transform: class.transform,
            attribute_instances: self.attributes(&class.attribute_instances),
            port_instances: class.port_instances.iter().map(|p| self.port(p)).collect(),
            visual: class.visual.clone(),
        }
    }

    fn relation(&self, relation: &RelationclassInstance) -> RelationclassInstance {
        RelationclassInstance {
            uuid: self.get(relation.uuid),
            name: relation.name.clone(),
            uuid_relationclass: relation.uuid_relationclass,
            transform: relation.transform,
            attribute_instances: self.attributes(&relation.attribute_instances),
            port_instances: relation.port_instances.iter().map(|p| self.port(p)).collect(),
            line_points: relation
                .line_points
                .iter()
                .map(|point| match *point {
                    LinePoint::Anchor { position, endpoint } => LinePoint::Anchor {
                        position,
                        endpoint: endpoint.map(|e| self.endpoint(e)),
                    },
                    LinePoint::Bend { class_instance } => LinePoint::Bend {
                        class_instance: self.get(class_instance),
                    },
                    LinePoint::Cursor { position } => LinePoint::Cursor { position },
                })
                .collect(),
            role_instance_from: self.get(relation.role_instance_from),
            role_instance_to: relation.role_instance_to.map(|role| self.get(role)),
            visual: relation.visual.clone(),
        }
    }

    fn role(&self, role: &RoleInstance) -> RoleInstance {
        RoleInstance {
            uuid: self.get(role.uuid),
            name: role.name.clone(),
            uuid_role: role.uuid_role,
            uuid_relationclass: role.uuid_relationclass,
            direction: role.direction,
            owner: match role.owner {
                RoleOwner::Relationclass(id) => RoleOwner::Relationclass(self.get(id)),
                RoleOwner::Attribute(id) => RoleOwner::Attribute(self.get(id)),
            },
            target: match role.target {
                RoleTarget::Unbound => RoleTarget::Unbound,
                RoleTarget::ClassInstance(id) => RoleTarget::ClassInstance(self.get(id)),
                RoleTarget::RelationclassInstance(id) => {
                    RoleTarget::RelationclassInstance(self.get(id))
                }
                RoleTarget::PortInstance(id) => RoleTarget::PortInstance(self.get(id)),
                RoleTarget::SceneInstance(id) => RoleTarget::SceneInstance(self.get(id)),
            },
        }
    }
}

/// Copies `scene` under `name` with fresh ids throughout.
///
/// Cross references inside the scene point into the copy; references to other scenes are
/// kept as they are.
pub fn copy_scene(scene: &SceneInstance, name: impl Into<String>) -> (SceneInstance, IdRemap) {
    let remap = IdRemap::for_scene(scene);
    let copy = SceneInstance {
        uuid: remap.get(scene.uuid),
        name: name.into(),
        uuid_scene_type: scene.uuid_scene_type,
        class_instances: scene
            .class_instances
            .values()
            .map(|c| {
                let class = remap.class(c);
                (class.uuid, class)
            })
            .collect(),
        relationclasses_instances: scene
            .relationclasses_instances
            .values()
            .map(|r| {
                let relation = remap.relation(r);
                (relation.uuid, relation)
            })
            .collect(),
        attribute_instances: remap.attributes(&scene.attribute_instances),
        role_instances: scene
            .role_instances
            .values()
            .map(|r| {
                let role = remap.role(r);
                (role.uuid, role)
            })
            .collect(),
        visual: scene.visual.clone(),
    };
    info!(source:% = scene.uuid, copy:% = copy.uuid, ids = remap.len(); "scene copied");
    (copy, remap)
}
