// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::geometry::Vec3;
use super::ids::{AttributeId, ClassId, Id, PortId, RelationclassId, SceneTypeId};
use super::meta::{
    Attribute, AttributeKind, AttributeType, Class, MetaModel, Port, ReferenceTargets,
    Relationclass, Role, SceneType,
};
use super::value::AttributeValue;
use crate::formula::Formula;

fn id<T>(n: u128) -> Id<T> {
    Id::from_uuid(Uuid::from_u128(n))
}

/// Ids of the "transit" meta model used across unit tests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StationIds {
    pub scene_type: SceneTypeId,
    pub scene_title: AttributeId,
    pub station: ClassId,
    pub station_name: AttributeId,
    pub station_color: AttributeId,
    pub station_capacity: AttributeId,
    pub station_schedule: AttributeId,
    pub schedule_time: AttributeId,
    pub sensor: ClassId,
    pub sensor_name: AttributeId,
    pub bend: ClassId,
    pub reference: ClassId,
    pub reference_target: AttributeId,
    pub track_transform: AttributeId,
    pub position: AttributeId,
    pub rotation: AttributeId,
    pub set_position: [AttributeId; 3],
    pub set_rotation: [AttributeId; 3],
    pub plug: PortId,
    pub plug_voltage: AttributeId,
    /// Station/plug to station/plug, with bend points.
    pub connects: RelationclassId,
    pub connects_label: AttributeId,
    /// Sensor to station only.
    pub feeds: RelationclassId,
    /// Ground plane to station.
    pub annotates: RelationclassId,
}

fn attr(uuid: AttributeId, name: &str, kind: AttributeKind, sequence: i32) -> Attribute {
    Attribute {
        uuid,
        name: name.into(),
        attribute_type: AttributeType {
            uuid: id(0x9000 + uuid.as_uuid().as_u128()),
            name: name.into(),
            kind,
            role: None,
        },
        sequence,
        default_value: None,
        geometry: None,
    }
}

fn with_default(mut attribute: Attribute, value: impl Into<AttributeValue>) -> Attribute {
    attribute.default_value = Some(value.into());
    attribute
}

fn role(uuid: u128, name: &str, targets: ReferenceTargets) -> Role {
    Role {
        uuid: id(uuid),
        name: name.into(),
        targets,
    }
}

fn classes(ids: &[ClassId]) -> ReferenceTargets {
    ReferenceTargets {
        classes: ids.iter().copied().collect(),
        ..ReferenceTargets::default()
    }
}

pub(crate) fn station_meta() -> (MetaModel, StationIds) {
    let ids = StationIds {
        scene_type: id(1),
        scene_title: id(2),
        station: id(10),
        station_name: id(11),
        station_color: id(12),
        station_capacity: id(13),
        station_schedule: id(14),
        schedule_time: id(15),
        sensor: id(20),
        sensor_name: id(21),
        bend: id(30),
        reference: id(40),
        reference_target: id(41),
        track_transform: id(42),
        position: id(43),
        rotation: id(44),
        set_position: [id(45), id(46), id(47)],
        set_rotation: [id(48), id(49), id(50)],
        plug: id(60),
        plug_voltage: id(61),
        connects: id(70),
        connects_label: id(71),
        feeds: id(80),
        annotates: id(90),
    };

    let schedule = attr(
        ids.station_schedule,
        "Schedule",
        AttributeKind::Table {
            columns: vec![attr(ids.schedule_time, "Time", AttributeKind::Text, 0)],
        },
        3,
    );
    let station_attributes = vec![
        with_default(attr(ids.station_name, "Name", AttributeKind::Text, 0), "Station"),
        with_default(attr(ids.station_color, "Color", AttributeKind::Text, 1), "#3366ff"),
        with_default(attr(ids.station_capacity, "Capacity", AttributeKind::Integer, 2), 4_i64),
        schedule,
    ];
    let station = Class {
        uuid: ids.station,
        name: "Station".into(),
        geometry: Formula::author(
            "box size=0.5,0.5,0.5 color={Color}\ntext content={Name}",
            &station_attributes,
        ),
        attributes: station_attributes,
        ports: vec![ids.plug],
    };

    let sensor_attributes = vec![attr(ids.sensor_name, "Name", AttributeKind::Text, 0)];
    let sensor = Class {
        uuid: ids.sensor,
        name: "Sensor".into(),
        geometry: Formula::author("sphere radius=0.2\ntext content={Name}", &sensor_attributes),
        attributes: sensor_attributes,
        ports: Vec::new(),
    };

    let bend = Class {
        uuid: ids.bend,
        name: "Bendpoint".into(),
        geometry: Formula::author("sphere radius=0.05", &[]),
        attributes: Vec::new(),
        ports: Vec::new(),
    };

    let mut target = attr(ids.reference_target, "Reference", AttributeKind::Reference, 0);
    target.attribute_type.role = Some(role(
        400,
        "references",
        ReferenceTargets {
            scene_types: BTreeSet::from([ids.scene_type]),
            classes: BTreeSet::from([ids.station, ids.sensor]),
            ..ReferenceTargets::default()
        },
    ));
    let axis = ["X", "Y", "Z"];
    let mut reference_attributes = vec![
        target,
        attr(ids.track_transform, "Track Transform", AttributeKind::Boolean, 1),
        attr(ids.position, "Position", AttributeKind::Vector, 2),
        attr(ids.rotation, "Rotation", AttributeKind::Vector, 3),
    ];
    for (i, name) in axis.iter().enumerate() {
        reference_attributes.push(attr(
            ids.set_position[i],
            &format!("Set Position {name}"),
            AttributeKind::Boolean,
            4 + i as i32,
        ));
    }
    for (i, name) in axis.iter().enumerate() {
        reference_attributes.push(attr(
            ids.set_rotation[i],
            &format!("Set Rotation {name}"),
            AttributeKind::Boolean,
            7 + i as i32,
        ));
    }
    let reference = Class {
        uuid: ids.reference,
        name: "Reference".into(),
        geometry: Formula::author("box size=0.1,0.1,0.1", &reference_attributes),
        attributes: reference_attributes,
        ports: Vec::new(),
    };

    let plug_attributes = vec![with_default(
        attr(ids.plug_voltage, "Voltage", AttributeKind::Float, 0),
        230.0,
    )];
    let plug = Port {
        uuid: ids.plug,
        name: "Plug".into(),
        geometry: Formula::author("cylinder radius=0.05 label={Voltage}", &plug_attributes),
        attributes: plug_attributes,
        offset: Vec3::new(0.25, 0.0, 0.0),
    };

    let endpoints = ReferenceTargets {
        classes: BTreeSet::from([ids.station]),
        ports: BTreeSet::from([ids.plug]),
        ..ReferenceTargets::default()
    };
    let connects_attributes = vec![attr(ids.connects_label, "Label", AttributeKind::Text, 0)];
    let connects = Relationclass {
        uuid: ids.connects,
        name: "Connects".into(),
        geometry: Formula::author("line width=2 label={Label}", &connects_attributes),
        attributes: connects_attributes,
        ports: Vec::new(),
        role_from: role(700, "from", endpoints.clone()),
        role_to: role(701, "to", endpoints),
        bendpoint_class: Some(ids.bend),
    };

    let feeds = Relationclass {
        uuid: ids.feeds,
        name: "Feeds".into(),
        geometry: Formula::author("line width=1", &[]),
        attributes: Vec::new(),
        ports: Vec::new(),
        role_from: role(800, "from", classes(&[ids.sensor])),
        role_to: role(801, "to", classes(&[ids.station])),
        bendpoint_class: Some(ids.bend),
    };

    let annotates = Relationclass {
        uuid: ids.annotates,
        name: "Annotates".into(),
        geometry: Formula::author("line width=1", &[]),
        attributes: Vec::new(),
        ports: Vec::new(),
        role_from: role(
            900,
            "from",
            ReferenceTargets {
                scene_types: BTreeSet::from([ids.scene_type]),
                ..ReferenceTargets::default()
            },
        ),
        role_to: role(901, "to", classes(&[ids.station])),
        bendpoint_class: None,
    };

    let scene_attributes = vec![with_default(
        attr(ids.scene_title, "Title", AttributeKind::Text, 0),
        "Transit",
    )];
    let scene_type = SceneType {
        uuid: ids.scene_type,
        name: "Transit".into(),
        geometry: Formula::author("plane size=10,10,0 title={Title}", &scene_attributes),
        attributes: scene_attributes,
        classes: vec![station, sensor, bend, reference],
        relationclasses: vec![connects, feeds, annotates],
        ports: vec![plug],
    };

    (MetaModel::new(vec![scene_type]), ids)
}
