// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural checks over one scene.
//!
//! Nothing here mutates; the result is a list of findings in a stable order.

use std::collections::BTreeSet;
use std::fmt;

use uuid::Uuid;

use super::lookup::{attribute_instances, port_instances, InstanceRef};
use crate::model::{
    ClassInstanceId, ClassInstanceKind, InstanceKind, LinePoint, MetaModelRegistry,
    RelationclassInstanceId, RoleInstanceId, SceneInstance,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    UnknownMeta {
        kind: InstanceKind,
        instance: Uuid,
        meta: Uuid,
    },
    UnknownAttributeMeta {
        attribute: Uuid,
        meta: Uuid,
    },
    DuplicateId {
        id: Uuid,
    },
    MissingRole {
        owner: Uuid,
        role: RoleInstanceId,
    },
    ShortLine {
        relation: RelationclassInstanceId,
        points: usize,
    },
    MisplacedCursor {
        relation: RelationclassInstanceId,
    },
    BendpointMismatch {
        relation: RelationclassInstanceId,
        class: ClassInstanceId,
    },
    OrphanBendpoint {
        class: ClassInstanceId,
    },
    DanglingReference {
        role: RoleInstanceId,
        target: Uuid,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMeta {
                kind,
                instance,
                meta,
            } => write!(f, "{kind} instance {instance} is typed by unknown concept {meta}"),
            Self::UnknownAttributeMeta { attribute, meta } => {
                write!(f, "attribute instance {attribute} is typed by unknown attribute {meta}")
            }
            Self::DuplicateId { id } => write!(f, "id {id} is used more than once"),
            Self::MissingRole { owner, role } => {
                write!(f, "{owner} refers to missing role instance {role}")
            }
            Self::ShortLine { relation, points } => {
                write!(f, "relation {relation} has {points} line points, expected at least 2")
            }
            Self::MisplacedCursor { relation } => {
                write!(f, "relation {relation} has a cursor point outside of drawing")
            }
            Self::BendpointMismatch { relation, class } => {
                write!(f, "bend point {class} does not belong to relation {relation}")
            }
            Self::OrphanBendpoint { class } => {
                write!(f, "bend point instance {class} belongs to no relation")
            }
            Self::DanglingReference { role, target } => {
                write!(f, "role instance {role} points at missing instance {target}")
            }
        }
    }
}

/// Checks the scene's structural invariants against `meta`.
pub fn validate_scene(scene: &SceneInstance, meta: &dyn MetaModelRegistry) -> Vec<Issue> {
    let mut issues = Vec::new();
    check_meta_links(scene, meta, &mut issues);
    check_unique_ids(scene, &mut issues);
    check_relations(scene, &mut issues);
    check_roles(scene, &mut issues);
    issues
}

fn check_meta_links(scene: &SceneInstance, meta: &dyn MetaModelRegistry, issues: &mut Vec<Issue>) {
    let mut unknown = |kind, instance: &Uuid, meta: &Uuid| {
        issues.push(Issue::UnknownMeta {
            kind,
            instance: *instance,
            meta: *meta,
        })
    };
    if meta.scene_type(&scene.uuid_scene_type).is_none() {
        unknown(
            InstanceKind::Scene,
            scene.uuid.as_uuid(),
            scene.uuid_scene_type.as_uuid(),
        );
    }
    for class in scene.class_instances.values() {
        if meta.meta_class(&class.uuid_class).is_none() {
            unknown(InstanceKind::Class, class.uuid.as_uuid(), class.uuid_class.as_uuid());
        }
    }
    for relation in scene.relationclasses_instances.values() {
        if meta.meta_relationclass(&relation.uuid_relationclass).is_none() {
            unknown(
                InstanceKind::Relationclass,
                relation.uuid.as_uuid(),
                relation.uuid_relationclass.as_uuid(),
            );
        }
    }
    for port in port_instances(scene) {
        if meta.meta_port(&port.uuid_port).is_none() {
            unknown(InstanceKind::Port, port.uuid.as_uuid(), port.uuid_port.as_uuid());
        }
    }
    for attr in attribute_instances(InstanceRef::Scene(scene)) {
        if meta.meta_attribute(&attr.uuid_attribute).is_none() {
            issues.push(Issue::UnknownAttributeMeta {
                attribute: *attr.uuid.as_uuid(),
                meta: *attr.uuid_attribute.as_uuid(),
            });
        }
    }
}

fn check_unique_ids(scene: &SceneInstance, issues: &mut Vec<Issue>) {
    let ids = std::iter::once(*scene.uuid.as_uuid())
        .chain(scene.class_instances.keys().map(|id| *id.as_uuid()))
        .chain(scene.relationclasses_instances.keys().map(|id| *id.as_uuid()))
        .chain(port_instances(scene).map(|p| *p.uuid.as_uuid()))
        .chain(scene.role_instances.keys().map(|id| *id.as_uuid()))
        .chain(attribute_instances(InstanceRef::Scene(scene)).into_iter().flat_map(|attr| {
            std::iter::once(*attr.uuid.as_uuid())
                .chain(attr.table_attributes.iter().map(|row| *row.uuid.as_uuid()))
        }));

    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            issues.push(Issue::DuplicateId { id });
        }
    }
}

fn check_relations(scene: &SceneInstance, issues: &mut Vec<Issue>) {
    let mut listed = BTreeSet::new();
    for relation in scene.relationclasses_instances.values() {
        let points = relation.line_points.len();
        if points < 2 {
            issues.push(Issue::ShortLine {
                relation: relation.uuid,
                points,
            });
        }
        let cursor_ok = relation
            .line_points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_cursor())
            .all(|(at, _)| relation.is_in_progress() && at + 1 == points);
        if !cursor_ok {
            issues.push(Issue::MisplacedCursor {
                relation: relation.uuid,
            });
        }

        let interior = points.saturating_sub(1);
        for (at, point) in relation.line_points.iter().enumerate() {
            let LinePoint::Bend { class_instance } = *point else {
                continue;
            };
            listed.insert(class_instance);
            let owned = scene.class_instances.get(&class_instance).is_some_and(|c| {
                c.kind
                    == ClassInstanceKind::Bendpoint {
                        relation: relation.uuid,
                    }
            });
            if !owned || at == 0 || at >= interior {
                issues.push(Issue::BendpointMismatch {
                    relation: relation.uuid,
                    class: class_instance,
                });
            }
        }

        let roles = std::iter::once(relation.role_instance_from).chain(relation.role_instance_to);
        for role in roles {
            if !scene.role_instances.contains_key(&role) {
                issues.push(Issue::MissingRole {
                    owner: *relation.uuid.as_uuid(),
                    role,
                });
            }
        }
    }

    for class in scene.class_instances.values() {
        if class.is_bendpoint() && !listed.contains(&class.uuid) {
            issues.push(Issue::OrphanBendpoint { class: class.uuid });
        }
    }
}

fn check_roles(scene: &SceneInstance, issues: &mut Vec<Issue>) {
    for attr in attribute_instances(InstanceRef::Scene(scene)) {
        if let Some(role) = attr.role_instance_from {
            if !scene.role_instances.contains_key(&role) {
                issues.push(Issue::MissingRole {
                    owner: *attr.uuid.as_uuid(),
                    role,
                });
            }
        }
    }
    for role in scene.role_instances.values() {
        if let Some(target) = role.target.uuid() {
            if !scene.contains_id(target) {
                issues.push(Issue::DanglingReference {
                    role: role.uuid,
                    target: *target,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_scene, Issue};
    use crate::model::fixtures::station_meta;
    use crate::model::{
        ClassInstanceKind, Endpoint, Id, MetaModelRegistry, RoleTarget, SceneInstance, Vec3,
    };
    use crate::ops::{
        add_bendpoint, create_class_instance, create_relation_instance, create_scene_instance,
        finish_relation,
    };

    fn connected() -> (crate::model::MetaModel, SceneInstance) {
        let (meta, ids) = station_meta();
        let scene_type = meta.scene_type(&ids.scene_type).expect("type");
        let mut scene = create_scene_instance(scene_type, "s");
        let regular = ClassInstanceKind::Regular;
        let a = create_class_instance(&mut scene, &meta, &ids.station, Vec3::ZERO, regular)
            .expect("a");
        let b = create_class_instance(&mut scene, &meta, &ids.station, Vec3::ONE, regular)
            .expect("b");
        let start = Some(Endpoint::Class(a));
        let rel = create_relation_instance(&mut scene, &meta, &ids.connects, Vec3::ZERO, start)
            .expect("start");
        add_bendpoint(&mut scene, &meta, &rel, Vec3::new(0.5, 0.5, 0.0)).expect("bend");
        finish_relation(&mut scene, &meta, &rel, Vec3::ONE, Some(Endpoint::Class(b)))
            .expect("finish");
        (meta, scene)
    }

    #[test]
    fn freshly_built_scene_is_clean() {
        let (meta, scene) = connected();
        assert_eq!(validate_scene(&scene, &meta), Vec::new());
    }

    #[test]
    fn dangling_role_target_is_reported() {
        let (meta, mut scene) = connected();
        let ghost = Id::fresh();
        let role = scene.role_instances.values_mut().next().expect("role");
        role.target = RoleTarget::ClassInstance(ghost);
        let role = role.uuid;

        let issues = validate_scene(&scene, &meta);
        assert_eq!(
            issues,
            vec![Issue::DanglingReference {
                role,
                target: *ghost.as_uuid()
            }]
        );
    }

    #[test]
    fn stray_bend_point_and_short_line_are_reported() {
        let (meta, mut scene) = connected();
        let relation = scene.relationclasses_instances.values_mut().next().expect("relation");
        let bend = relation.bendpoints().next().expect("bend");
        relation.line_points.truncate(1);
        let relation = relation.uuid;

        let issues = validate_scene(&scene, &meta);
        assert!(issues.contains(&Issue::ShortLine { relation, points: 1 }));
        assert!(issues.contains(&Issue::OrphanBendpoint { class: bend }));
    }

    #[test]
    fn unknown_meta_concepts_are_reported() {
        let (meta, mut scene) = connected();
        let class = scene.class_instances.values_mut().next().expect("class");
        class.uuid_class = Id::fresh();
        let issues = validate_scene(&scene, &meta);
        assert!(matches!(issues.as_slice(), [Issue::UnknownMeta { .. }]));
        assert!(issues[0].to_string().contains("unknown concept"));
    }
}
