// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use proptest::prelude::*;
use rstest::rstest;

use crate::model::fixtures::{station_meta, StationIds};
use crate::model::{
    AttributeValue, ClassId, ClassInstanceId, ClassInstanceKind, Endpoint, LinePoint, MetaModel,
    MetaModelRegistry, RelationclassId, RelationclassInstanceId, RoleTarget, SceneInstance,
    Transform, Vec3,
};

use super::{
    add_bendpoint, copy_scene, create_class_instance, create_relation_instance,
    create_scene_instance, delete_class_instance, delete_port_instance,
    delete_relationclass_instance, finish_relation, set_reference, set_transform, BendPoints,
    ObjectKind, OpsError,
};

fn empty_scene() -> (MetaModel, StationIds, SceneInstance) {
    let (meta, ids) = station_meta();
    let scene_type = meta.scene_type(&ids.scene_type).expect("scene type");
    let scene = create_scene_instance(scene_type, "Line 1");
    (meta, ids, scene)
}

fn place(scene: &mut SceneInstance, meta: &MetaModel, class: ClassId, x: f64) -> ClassInstanceId {
    create_class_instance(
        scene,
        meta,
        &class,
        Vec3::new(x, 0.0, 0.0),
        ClassInstanceKind::Regular,
    )
    .expect("class instance")
}

fn connect(
    scene: &mut SceneInstance,
    meta: &MetaModel,
    relationclass: RelationclassId,
    from: Endpoint,
    to: Endpoint,
    bends: &[Vec3],
) -> RelationclassInstanceId {
    let relation =
        create_relation_instance(scene, meta, &relationclass, Vec3::ZERO, Some(from))
            .expect("start");
    for at in bends {
        add_bendpoint(scene, meta, &relation, *at).expect("bend");
    }
    finish_relation(scene, meta, &relation, Vec3::ONE, Some(to)).expect("finish");
    relation
}

fn plug_of(scene: &SceneInstance, class: &ClassInstanceId) -> Endpoint {
    Endpoint::Port(scene.class_instances[class].port_instances[0].uuid)
}

/// Every role target still resolves and no relation points at `gone`.
fn assert_no_reference_to(scene: &SceneInstance, gone: &[uuid::Uuid]) {
    for relation in scene.relationclasses_instances.values() {
        let roles = std::iter::once(relation.role_instance_from).chain(relation.role_instance_to);
        for role in roles {
            let role = scene.role_instances.get(&role).expect("relation role exists");
            if let Some(target) = role.target.uuid() {
                assert!(
                    !gone.contains(target),
                    "relation {} still targets {target}",
                    relation.uuid
                );
                assert!(scene.contains_id(target), "dangling role target {target}");
            }
        }
        for bend in relation.bendpoints() {
            assert!(scene.class_instances.contains_key(&bend));
        }
    }
}

#[test]
fn relation_with_one_bend_point_has_two_anchors_and_the_bend() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 4.0);

    let relation = connect(
        &mut scene,
        &meta,
        ids.connects,
        Endpoint::Class(a),
        Endpoint::Class(b),
        &[Vec3::new(1.0, 2.0, 0.0)],
    );

    let instance = &scene.relationclasses_instances[&relation];
    assert_eq!(instance.line_points.len(), 3);
    assert!(matches!(
        instance.line_points[0],
        LinePoint::Anchor { endpoint: Some(Endpoint::Class(start)), .. } if start == a
    ));
    let bend = instance.line_points[1].bendpoint().expect("bend point");
    assert_eq!(scene.class_instances[&bend].position(), Vec3::new(1.0, 2.0, 0.0));
    assert_eq!(
        scene.class_instances[&bend].kind,
        ClassInstanceKind::Bendpoint { relation }
    );
    let from = &scene.role_instances[&instance.role_instance_from];
    let to = &scene.role_instances[&instance.role_instance_to.expect("finished")];
    assert_eq!(from.has_reference_class_instance(), Some(a));
    assert_eq!(to.has_reference_class_instance(), Some(b));
}

#[test]
fn finished_relation_takes_no_more_bend_points() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 1.0);
    let (from, to) = (Endpoint::Class(a), Endpoint::Class(b));
    let relation = connect(&mut scene, &meta, ids.connects, from, to, &[]);

    assert_eq!(
        add_bendpoint(&mut scene, &meta, &relation, Vec3::ZERO),
        Err(OpsError::AlreadyFinished { relation })
    );
    assert!(matches!(
        finish_relation(&mut scene, &meta, &relation, Vec3::ZERO, None),
        Err(OpsError::AlreadyFinished { .. })
    ));
}

#[test]
fn relation_without_bendpoint_class_rejects_bends() {
    let (meta, ids, mut scene) = empty_scene();
    let relation =
        create_relation_instance(&mut scene, &meta, &ids.annotates, Vec3::ZERO, None)
            .expect("start on the plane");
    assert_eq!(
        add_bendpoint(&mut scene, &meta, &relation, Vec3::ONE),
        Err(OpsError::MissingBendpointClass {
            relationclass: ids.annotates
        })
    );
    assert_eq!(scene.class_instances.len(), 0);
}

#[test]
fn deleting_a_class_removes_relations_at_the_class_and_its_ports() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let c = place(&mut scene, &meta, ids.station, 4.0);
    let a_plug = plug_of(&scene, &a);
    let c_plug = plug_of(&scene, &c);

    let (ea, eb, ec) = (Endpoint::Class(a), Endpoint::Class(b), Endpoint::Class(c));
    let direct = connect(&mut scene, &meta, ids.connects, ea, eb, &[Vec3::ONE]);
    let via_port = connect(&mut scene, &meta, ids.connects, c_plug, a_plug, &[]);
    let unrelated = connect(&mut scene, &meta, ids.connects, eb, ec, &[]);

    let delta = delete_class_instance(&mut scene, &a).expect("delete");

    assert!(!scene.class_instances.contains_key(&a));
    assert!(!scene.relationclasses_instances.contains_key(&direct));
    assert!(!scene.relationclasses_instances.contains_key(&via_port));
    assert!(scene.relationclasses_instances.contains_key(&unrelated));
    // The bend point of the direct relation went with it.
    assert_eq!(scene.class_instances.len(), 2);
    assert_eq!(delta.removed_of(ObjectKind::Relationclass).count(), 2);
    assert_eq!(delta.removed_of(ObjectKind::Port).count(), 1);
    assert_eq!(scene.role_instances.len(), 2);
    assert_no_reference_to(&scene, &[*a.as_uuid(), *a_plug.uuid()]);
}

#[test]
fn deleting_a_bend_point_only_detaches_it() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let relation = connect(
        &mut scene,
        &meta,
        ids.connects,
        Endpoint::Class(a),
        Endpoint::Class(b),
        &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)],
    );
    let first = scene.relationclasses_instances[&relation]
        .bendpoints()
        .next()
        .expect("bend");

    let delta = delete_class_instance(&mut scene, &first).expect("delete bend point");

    let instance = &scene.relationclasses_instances[&relation];
    assert_eq!(instance.line_points.len(), 3);
    assert_eq!(instance.bendpoints().count(), 1);
    assert!(delta.removed_of(ObjectKind::Relationclass).next().is_none());
    assert!(delta
        .updated
        .iter()
        .any(|key| key.kind == ObjectKind::Relationclass && key.id == *relation.as_uuid()));
}

#[rstest]
#[case::delete_bend_points(BendPoints::Delete, 2)]
#[case::keep_bend_points(BendPoints::Keep, 4)]
fn deleting_a_relation_handles_bend_points(#[case] mode: BendPoints, #[case] remaining: usize) {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let relation = connect(
        &mut scene,
        &meta,
        ids.connects,
        Endpoint::Class(a),
        Endpoint::Class(b),
        &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)],
    );

    delete_relationclass_instance(&mut scene, &relation, mode).expect("delete");

    assert!(scene.relationclasses_instances.is_empty());
    assert!(scene.role_instances.is_empty());
    assert_eq!(scene.class_instances.len(), remaining);
    assert!(scene.class_instances.values().all(|c| !c.is_bendpoint()));
}

#[test]
fn deleting_twice_reports_not_found() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    delete_class_instance(&mut scene, &a).expect("first delete");
    assert_eq!(
        delete_class_instance(&mut scene, &a),
        Err(OpsError::NotFound {
            kind: ObjectKind::Class,
            id: *a.as_uuid()
        })
    );
}

#[test]
fn deleting_a_port_removes_its_relations_but_keeps_the_owner() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let a_plug = plug_of(&scene, &a);
    let relation = connect(&mut scene, &meta, ids.connects, a_plug, Endpoint::Class(b), &[]);
    let Endpoint::Port(port) = a_plug else {
        unreachable!("plug_of returns a port")
    };

    let delta = delete_port_instance(&mut scene, &port).expect("delete port");

    assert!(!scene.relationclasses_instances.contains_key(&relation));
    assert!(scene.class_instances[&a].port_instances.is_empty());
    assert_eq!(delta.removed_of(ObjectKind::Port).collect::<Vec<_>>(), vec![port.as_uuid()]);
    assert_no_reference_to(&scene, &[*port.as_uuid()]);
}

#[test]
fn deleting_a_referenced_class_unbinds_the_reference() {
    let (meta, ids, mut scene) = empty_scene();
    let station = place(&mut scene, &meta, ids.station, 0.0);
    let reference = place(&mut scene, &meta, ids.reference, 3.0);
    let attr = scene.class_instances[&reference]
        .attribute(&ids.reference_target)
        .map(|a| a.uuid)
        .expect("reference attribute");
    let role = set_reference(&mut scene, &meta, &attr, RoleTarget::ClassInstance(station))
        .expect("bind");

    delete_class_instance(&mut scene, &station).expect("delete");

    assert!(!scene.role_instances[&role].target.is_bound());
    let value = &scene.class_instances[&reference]
        .attribute(&ids.reference_target)
        .expect("attribute")
        .value;
    assert_eq!(value, &AttributeValue::Null);

    // Deleting the reference itself drops the role it owns.
    delete_class_instance(&mut scene, &reference).expect("delete reference");
    assert!(scene.role_instances.is_empty());
}

#[test]
fn moving_a_class_drags_attached_anchors() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let a_plug = plug_of(&scene, &a);
    let relation = connect(&mut scene, &meta, ids.connects, a_plug, Endpoint::Class(b), &[]);

    let delta = set_transform(
        &mut scene,
        a.as_uuid(),
        Transform::at(Vec3::new(5.0, 0.0, 1.0)),
    )
    .expect("move");

    let first = scene.relationclasses_instances[&relation].line_points[0];
    let LinePoint::Anchor { position, .. } = first else {
        panic!("first point is an anchor");
    };
    assert_eq!(position, Vec3::new(5.25, 0.0, 1.0));
    assert_eq!(delta.updated.len(), 2);
}

#[test]
fn copy_gets_fresh_ids_and_internal_references() {
    let (meta, ids, mut scene) = empty_scene();
    let a = place(&mut scene, &meta, ids.station, 0.0);
    let b = place(&mut scene, &meta, ids.station, 2.0);
    let (from, to) = (Endpoint::Class(a), Endpoint::Class(b));
    let relation = connect(&mut scene, &meta, ids.connects, from, to, &[Vec3::ONE]);
    let reference = place(&mut scene, &meta, ids.reference, 3.0);
    let attr = scene.class_instances[&reference]
        .attribute(&ids.reference_target)
        .map(|a| a.uuid)
        .expect("reference attribute");
    set_reference(&mut scene, &meta, &attr, RoleTarget::ClassInstance(b)).expect("bind");
    // Free text that happens to contain an id is not rewritten.
    let name_attr = scene.class_instances[&a]
        .attribute(&ids.station_name)
        .map(|a| a.uuid)
        .expect("name");
    super::set_attribute_value(&mut scene, &name_attr, AttributeValue::Text(b.to_string()))
        .expect("set name");

    let (copy, remap) = copy_scene(&scene, "Line 1 (copy)");

    assert_eq!(copy.name, "Line 1 (copy)");
    assert_ne!(copy.uuid, scene.uuid);
    assert_eq!(copy.class_instances.len(), scene.class_instances.len());
    for id in copy.class_instances.keys() {
        assert!(!scene.class_instances.contains_key(id));
    }
    let copied = &copy.relationclasses_instances[&remap.get(relation)];
    let to = &copy.role_instances[&copied.role_instance_to.expect("finished")];
    assert_eq!(to.has_reference_class_instance(), Some(remap.get(b)));
    let bend = copied.bendpoints().next().expect("bend");
    assert_eq!(
        copy.class_instances[&bend].kind,
        ClassInstanceKind::Bendpoint {
            relation: copied.uuid
        }
    );

    let copied_ref = &copy.class_instances[&remap.get(reference)];
    let copied_attr = copied_ref.attribute(&ids.reference_target).expect("attribute");
    assert_eq!(copied_attr.value, AttributeValue::Text(remap.get(b).to_string()));
    let copied_name = copy.class_instances[&remap.get(a)]
        .attribute(&ids.station_name)
        .expect("name");
    assert_eq!(copied_name.value, AttributeValue::Text(b.to_string()));
}

#[derive(Debug, Clone)]
enum Link {
    Classes(usize, usize),
    Ports(usize, usize),
    ClassToPort(usize, usize),
}

fn link_strategy(classes: usize) -> impl Strategy<Value = Link> {
    let index = 0..classes;
    prop_oneof![
        (index.clone(), index.clone()).prop_map(|(a, b)| Link::Classes(a, b)),
        (index.clone(), index.clone()).prop_map(|(a, b)| Link::Ports(a, b)),
        (index.clone(), index).prop_map(|(a, b)| Link::ClassToPort(a, b)),
    ]
}

proptest! {
    #[test]
    fn deleting_any_class_leaves_no_relation_pointing_at_it(
        links in proptest::collection::vec(link_strategy(5), 0..12),
        victim in 0usize..5,
        bends in 0usize..3,
    ) {
        let (meta, ids, mut scene) = empty_scene();
        let stations = (0..5)
            .map(|i| place(&mut scene, &meta, ids.station, i as f64))
            .collect::<Vec<_>>();
        let bend_points = (0..bends).map(|i| Vec3::new(i as f64, 1.0, 0.0)).collect::<Vec<_>>();
        for link in &links {
            let (from, to) = match *link {
                Link::Classes(a, b) => (Endpoint::Class(stations[a]), Endpoint::Class(stations[b])),
                Link::Ports(a, b) => (plug_of(&scene, &stations[a]), plug_of(&scene, &stations[b])),
                Link::ClassToPort(a, b) => {
                    (Endpoint::Class(stations[a]), plug_of(&scene, &stations[b]))
                }
            };
            connect(&mut scene, &meta, ids.connects, from, to, &bend_points);
        }

        let victim = stations[victim];
        let port = plug_of(&scene, &victim);
        delete_class_instance(&mut scene, &victim).expect("delete");

        prop_assert!(!scene.class_instances.contains_key(&victim));
        assert_no_reference_to(&scene, &[*victim.as_uuid(), *port.uuid()]);
        let expected_bends = scene.relationclasses_instances.len() * bends;
        let bend_instances = scene.class_instances.values().filter(|c| c.is_bendpoint()).count();
        prop_assert_eq!(bend_instances, expected_bends);
    }
}
