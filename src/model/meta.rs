// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Meta-model schema: scene types and the concepts instances are typed by.
//!
//! The schema is immutable during a session. [`MetaModelRegistry`] is the read-only seam the
//! core consumes; [`MetaModel`] is the in-memory implementation loaded from JSON.

use std::cell::Cell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::geometry::Vec3;
use super::ids::{
    AttributeId, AttributeTypeId, ClassId, PortId, RelationclassId, RoleId, SceneTypeId,
};
use super::value::AttributeValue;
use crate::formula::Formula;

/// Read-only access to the meta model of the running session.
pub trait MetaModelRegistry {
    fn scene_type(&self, id: &SceneTypeId) -> Option<&SceneType>;
    fn active_scene_type(&self) -> Option<&SceneType>;
    fn meta_class(&self, id: &ClassId) -> Option<&Class>;
    fn meta_relationclass(&self, id: &RelationclassId) -> Option<&Relationclass>;
    fn meta_port(&self, id: &PortId) -> Option<&Port>;
    fn meta_attribute(&self, id: &AttributeId) -> Option<&Attribute>;

    /// Switches the scene type searched first. Registries without a notion of an active
    /// scene type ignore this.
    fn set_active_scene_type(&self, _id: Option<SceneTypeId>) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneType {
    pub uuid: SceneTypeId,
    pub name: SmolStr,
    #[serde(default)]
    pub geometry: Formula,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub relationclasses: Vec<Relationclass>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl SceneType {
    pub fn class(&self, id: &ClassId) -> Option<&Class> {
        self.classes.iter().find(|c| &c.uuid == id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn relationclass(&self, id: &RelationclassId) -> Option<&Relationclass> {
        self.relationclasses.iter().find(|r| &r.uuid == id)
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.ports.iter().find(|p| &p.uuid == id)
    }

    /// Every attribute declared anywhere in this scene type, table columns included.
    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.attributes.iter()))
            .chain(self.relationclasses.iter().flat_map(|r| r.attributes.iter()))
            .chain(self.ports.iter().flat_map(|p| p.attributes.iter()))
            .flat_map(Attribute::with_columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub uuid: ClassId,
    pub name: SmolStr,
    #[serde(default)]
    pub geometry: Formula,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub ports: Vec<PortId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationclass {
    pub uuid: RelationclassId,
    pub name: SmolStr,
    #[serde(default)]
    pub geometry: Formula,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub ports: Vec<PortId>,
    pub role_from: Role,
    pub role_to: Role,
    /// Class instantiated for every bend point of a relation of this type.
    #[serde(default)]
    pub bendpoint_class: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub uuid: PortId,
    pub name: SmolStr,
    #[serde(default)]
    pub geometry: Formula,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Placement relative to the owning instance's local origin.
    #[serde(default)]
    pub offset: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub uuid: AttributeId,
    pub name: SmolStr,
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub default_value: Option<AttributeValue>,
    #[serde(default)]
    pub geometry: Option<Formula>,
}

impl Attribute {
    /// The initial value for a fresh instance of this attribute.
    pub fn initial_value(&self) -> AttributeValue {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.attribute_type.kind.empty_value())
    }

    pub fn role(&self) -> Option<&Role> {
        self.attribute_type.role.as_ref()
    }

    pub fn table_columns(&self) -> &[Attribute] {
        match &self.attribute_type.kind {
            AttributeKind::Table { columns } => columns,
            _ => &[],
        }
    }

    fn with_columns(&self) -> Box<dyn Iterator<Item = &Attribute> + '_> {
        let columns = self.table_columns().iter().flat_map(Attribute::with_columns);
        Box::new(std::iter::once(self).chain(columns))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeType {
    pub uuid: AttributeTypeId,
    pub name: SmolStr,
    pub kind: AttributeKind,
    /// Allowed targets when the attribute is a reference.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    Text,
    Integer,
    Float,
    Boolean,
    Vector,
    Enumeration { values: Vec<SmolStr> },
    Table { columns: Vec<Attribute> },
    Reference,
}

impl AttributeKind {
    pub fn empty_value(&self) -> AttributeValue {
        match self {
            Self::Text => AttributeValue::Text(String::new()),
            Self::Integer => AttributeValue::Integer(0),
            Self::Float => AttributeValue::Float(0.0),
            Self::Boolean => AttributeValue::Bool(false),
            Self::Vector => AttributeValue::Vector(Vec3::ZERO),
            Self::Enumeration { values } => values
                .first()
                .map(|v| AttributeValue::Text(v.to_string()))
                .unwrap_or_default(),
            Self::Table { .. } | Self::Reference => AttributeValue::Null,
        }
    }
}

/// Declares which concepts may sit at one end of a relation or be referenced by an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub uuid: RoleId,
    pub name: SmolStr,
    #[serde(default)]
    pub targets: ReferenceTargets,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferenceTargets {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub scene_types: BTreeSet<SceneTypeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub classes: BTreeSet<ClassId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub relationclasses: BTreeSet<RelationclassId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ports: BTreeSet<PortId>,
}

/// All scene types of a library plus the scene type of the active tab.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MetaModel {
    scene_types: Vec<SceneType>,
    #[serde(skip)]
    active: Cell<Option<SceneTypeId>>,
}

impl MetaModel {
    pub fn new(scene_types: Vec<SceneType>) -> Self {
        let active = Cell::new(scene_types.first().map(|st| st.uuid));
        Self {
            scene_types,
            active,
        }
    }

    pub fn scene_types(&self) -> &[SceneType] {
        &self.scene_types
    }

    /// Computes the declared dependency set of every formula that has none yet.
    ///
    /// A concept's formula may read the attributes declared on that concept.
    pub fn author_formulas(&mut self) {
        for scene_type in &mut self.scene_types {
            scene_type
                .geometry
                .author_if_undeclared(&scene_type.attributes);
            for class in &mut scene_type.classes {
                class.geometry.author_if_undeclared(&class.attributes);
            }
            for rc in &mut scene_type.relationclasses {
                rc.geometry.author_if_undeclared(&rc.attributes);
            }
            for port in &mut scene_type.ports {
                port.geometry.author_if_undeclared(&port.attributes);
            }
        }
    }

    fn search_active_first<'a, T>(
        &'a self,
        find: impl Fn(&'a SceneType) -> Option<&'a T>,
    ) -> Option<&'a T> {
        if let Some(found) = self.active_scene_type().and_then(&find) {
            return Some(found);
        }
        self.scene_types.iter().find_map(find)
    }
}

impl MetaModelRegistry for MetaModel {
    fn scene_type(&self, id: &SceneTypeId) -> Option<&SceneType> {
        self.scene_types.iter().find(|st| &st.uuid == id)
    }

    fn active_scene_type(&self) -> Option<&SceneType> {
        let id = self.active.get()?;
        self.scene_type(&id)
    }

    fn meta_class(&self, id: &ClassId) -> Option<&Class> {
        self.search_active_first(|st| st.class(id))
    }

    fn meta_relationclass(&self, id: &RelationclassId) -> Option<&Relationclass> {
        self.search_active_first(|st| st.relationclass(id))
    }

    fn meta_port(&self, id: &PortId) -> Option<&Port> {
        self.search_active_first(|st| st.port(id))
    }

    fn meta_attribute(&self, id: &AttributeId) -> Option<&Attribute> {
        self.search_active_first(|st| st.all_attributes().find(|a| &a.uuid == id))
    }

    fn set_active_scene_type(&self, id: Option<SceneTypeId>) {
        self.active.set(id);
    }
}
