// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live instances of meta concepts.
//!
//! Containment is structural (a class instance owns its ports and attributes); every other
//! relationship is by id so that scene files can round-trip cross references.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{Transform, Vec3};
use super::ids::{
    AttributeId, AttributeInstanceId, ClassId, ClassInstanceId, PortId, PortInstanceId,
    RelationclassId, RelationclassInstanceId, RoleId, RoleInstanceId, SceneInstanceId,
    SceneTypeId, TableRowId,
};
use super::value::AttributeValue;
use super::visual::VisualState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    Scene,
    Class,
    Relationclass,
    Port,
}

impl InstanceKind {
    /// Search order used when the kind of an id is unknown.
    pub const SEARCH_ORDER: [InstanceKind; 4] = [
        InstanceKind::Scene,
        InstanceKind::Class,
        InstanceKind::Relationclass,
        InstanceKind::Port,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Class => "class",
            Self::Relationclass => "relationclass",
            Self::Port => "port",
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root of one open diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInstance {
    pub uuid: SceneInstanceId,
    pub name: String,
    pub uuid_scene_type: SceneTypeId,
    #[serde(default)]
    pub class_instances: BTreeMap<ClassInstanceId, ClassInstance>,
    #[serde(default)]
    pub relationclasses_instances: BTreeMap<RelationclassInstanceId, RelationclassInstance>,
    #[serde(default)]
    pub attribute_instances: Vec<AttributeInstance>,
    /// Endpoint bindings of every relation and reference attribute in this scene.
    #[serde(default)]
    pub role_instances: BTreeMap<RoleInstanceId, RoleInstance>,
    #[serde(default)]
    pub visual: VisualState,
}

impl SceneInstance {
    pub fn new(uuid: SceneInstanceId, name: impl Into<String>, scene_type: SceneTypeId) -> Self {
        Self {
            uuid,
            name: name.into(),
            uuid_scene_type: scene_type,
            class_instances: BTreeMap::new(),
            relationclasses_instances: BTreeMap::new(),
            attribute_instances: Vec::new(),
            role_instances: BTreeMap::new(),
            visual: VisualState::default(),
        }
    }

    /// Whether any instance, attribute, role or table row in this scene already uses `id`.
    pub fn contains_id(&self, id: &Uuid) -> bool {
        if self.uuid.as_uuid() == id {
            return true;
        }
        if self.role_instances.contains_key(&(*id).into()) {
            return true;
        }
        if self.attribute_instances.iter().any(|a| a.uses_id(id)) {
            return true;
        }
        let class_hit = self.class_instances.values().any(|c| {
            c.uuid.as_uuid() == id
                || c.attribute_instances.iter().any(|a| a.uses_id(id))
                || c.port_instances.iter().any(|p| p.uses_id(id))
        });
        class_hit
            || self.relationclasses_instances.values().any(|r| {
                r.uuid.as_uuid() == id
                    || r.attribute_instances.iter().any(|a| a.uses_id(id))
                    || r.port_instances.iter().any(|p| p.uses_id(id))
            })
    }
}

/// Marks whether a class instance is a user-visible node or a relation's bend point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassInstanceKind {
    #[default]
    Regular,
    Bendpoint {
        relation: RelationclassInstanceId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInstance {
    pub uuid: ClassInstanceId,
    pub name: String,
    pub uuid_class: ClassId,
    #[serde(default)]
    pub kind: ClassInstanceKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub attribute_instances: Vec<AttributeInstance>,
    #[serde(default)]
    pub port_instances: Vec<PortInstance>,
    #[serde(default)]
    pub visual: VisualState,
}

impl ClassInstance {
    pub fn is_bendpoint(&self) -> bool {
        matches!(self.kind, ClassInstanceKind::Bendpoint { .. })
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn port(&self, id: &PortInstanceId) -> Option<&PortInstance> {
        self.port_instances.iter().find(|p| &p.uuid == id)
    }

    pub fn attribute(&self, meta: &AttributeId) -> Option<&AttributeInstance> {
        self.attribute_instances
            .iter()
            .find(|a| &a.uuid_attribute == meta)
    }

    pub fn attribute_mut(&mut self, meta: &AttributeId) -> Option<&mut AttributeInstance> {
        self.attribute_instances
            .iter_mut()
            .find(|a| &a.uuid_attribute == meta)
    }
}

/// Where a relation touches the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Endpoint {
    Class(ClassInstanceId),
    Port(PortInstanceId),
}

impl Endpoint {
    pub fn uuid(&self) -> &Uuid {
        match self {
            Self::Class(id) => id.as_uuid(),
            Self::Port(id) => id.as_uuid(),
        }
    }
}

/// One point of a relation's path.
///
/// The first and last points are anchors; interior points are bend points. While a relation
/// is being drawn its last point is a `Cursor` that follows the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinePoint {
    Anchor {
        position: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<Endpoint>,
    },
    Bend {
        class_instance: ClassInstanceId,
    },
    Cursor {
        position: Vec3,
    },
}

impl LinePoint {
    pub fn bendpoint(&self) -> Option<ClassInstanceId> {
        match self {
            Self::Bend { class_instance } => Some(*class_instance),
            _ => None,
        }
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::Cursor { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationclassInstance {
    pub uuid: RelationclassInstanceId,
    pub name: String,
    pub uuid_relationclass: RelationclassId,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub attribute_instances: Vec<AttributeInstance>,
    #[serde(default)]
    pub port_instances: Vec<PortInstance>,
    pub line_points: Vec<LinePoint>,
    pub role_instance_from: RoleInstanceId,
    #[serde(default)]
    pub role_instance_to: Option<RoleInstanceId>,
    #[serde(default)]
    pub visual: VisualState,
}

impl RelationclassInstance {
    pub fn is_in_progress(&self) -> bool {
        self.role_instance_to.is_none()
    }

    pub fn bendpoints(&self) -> impl Iterator<Item = ClassInstanceId> + '_ {
        self.line_points.iter().filter_map(LinePoint::bendpoint)
    }

    pub fn port(&self, id: &PortInstanceId) -> Option<&PortInstance> {
        self.port_instances.iter().find(|p| &p.uuid == id)
    }

    pub fn attribute(&self, meta: &AttributeId) -> Option<&AttributeInstance> {
        self.attribute_instances
            .iter()
            .find(|a| &a.uuid_attribute == meta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PortOwner {
    Class(ClassInstanceId),
    Relationclass(RelationclassInstanceId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInstance {
    pub uuid: PortInstanceId,
    pub name: String,
    pub uuid_port: PortId,
    pub owner: PortOwner,
    /// Position relative to the owner's local origin.
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub attribute_instances: Vec<AttributeInstance>,
    #[serde(default)]
    pub visual: VisualState,
}

impl PortInstance {
    fn uses_id(&self, id: &Uuid) -> bool {
        self.uuid.as_uuid() == id || self.attribute_instances.iter().any(|a| a.uses_id(id))
    }
}

/// The instance an attribute instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOwner {
    #[serde(rename = "assigned_uuid_class_instance")]
    ClassInstance(ClassInstanceId),
    #[serde(rename = "assigned_uuid_relationclass_instance")]
    RelationclassInstance(RelationclassInstanceId),
    #[serde(rename = "assigned_uuid_port_instance")]
    PortInstance(PortInstanceId),
    #[serde(rename = "assigned_uuid_scene_instance")]
    SceneInstance(SceneInstanceId),
}

impl AttributeOwner {
    pub fn uuid(&self) -> &Uuid {
        match self {
            Self::ClassInstance(id) => id.as_uuid(),
            Self::RelationclassInstance(id) => id.as_uuid(),
            Self::PortInstance(id) => id.as_uuid(),
            Self::SceneInstance(id) => id.as_uuid(),
        }
    }

    pub fn kind(&self) -> InstanceKind {
        match self {
            Self::ClassInstance(_) => InstanceKind::Class,
            Self::RelationclassInstance(_) => InstanceKind::Relationclass,
            Self::PortInstance(_) => InstanceKind::Port,
            Self::SceneInstance(_) => InstanceKind::Scene,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub uuid: TableRowId,
    pub cells: Vec<AttributeInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInstance {
    pub uuid: AttributeInstanceId,
    pub uuid_attribute: AttributeId,
    #[serde(default)]
    pub value: AttributeValue,
    pub owner: AttributeOwner,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_attributes: Vec<TableRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_instance_from: Option<RoleInstanceId>,
}

impl AttributeInstance {
    fn uses_id(&self, id: &Uuid) -> bool {
        self.uuid.as_uuid() == id
            || self.table_attributes.iter().any(|row| {
                row.uuid.as_uuid() == id || row.cells.iter().any(|cell| cell.uses_id(id))
            })
    }

    /// This attribute followed by every table cell below it, depth first.
    pub fn with_cells(&self) -> Vec<&AttributeInstance> {
        let mut out = vec![self];
        for row in &self.table_attributes {
            for cell in &row.cells {
                out.extend(cell.with_cells());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDirection {
    From,
    To,
    Reference,
}

/// What a role instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoleOwner {
    Relationclass(RelationclassInstanceId),
    Attribute(AttributeInstanceId),
}

/// The instance a role points at. At most one kind can be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTarget {
    #[default]
    Unbound,
    #[serde(rename = "uuid_has_reference_class_instance")]
    ClassInstance(ClassInstanceId),
    #[serde(rename = "uuid_has_reference_relationclass_instance")]
    RelationclassInstance(RelationclassInstanceId),
    #[serde(rename = "uuid_has_reference_port_instance")]
    PortInstance(PortInstanceId),
    #[serde(rename = "uuid_has_reference_scene_instance")]
    SceneInstance(SceneInstanceId),
}

impl RoleTarget {
    pub fn uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Unbound => None,
            Self::ClassInstance(id) => Some(id.as_uuid()),
            Self::RelationclassInstance(id) => Some(id.as_uuid()),
            Self::PortInstance(id) => Some(id.as_uuid()),
            Self::SceneInstance(id) => Some(id.as_uuid()),
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }
}

impl From<Endpoint> for RoleTarget {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Class(id) => Self::ClassInstance(id),
            Endpoint::Port(id) => Self::PortInstance(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleInstance {
    pub uuid: RoleInstanceId,
    pub name: String,
    pub uuid_role: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid_relationclass: Option<RelationclassId>,
    pub direction: RoleDirection,
    pub owner: RoleOwner,
    #[serde(default)]
    pub target: RoleTarget,
}

impl RoleInstance {
    pub fn has_reference_class_instance(&self) -> Option<ClassInstanceId> {
        match self.target {
            RoleTarget::ClassInstance(id) => Some(id),
            _ => None,
        }
    }

    pub fn has_reference_port_instance(&self) -> Option<PortInstanceId> {
        match self.target {
            RoleTarget::PortInstance(id) => Some(id),
            _ => None,
        }
    }

    pub fn references(&self, id: &Uuid) -> bool {
        self.target.uuid() == Some(id)
    }
}
