// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Visual re-evaluation after attribute changes.
//!
//! An instance's visual is recomputed only when its concept's formula reads the changed
//! attribute. Derived custom variables are rebuilt from scratch on every evaluation; locked
//! ones are handed to the formula and written back verbatim. A failed evaluation leaves the
//! instance's visual state untouched.

use std::collections::BTreeMap;

use log::{debug, error};
use smol_str::SmolStr;
use uuid::Uuid;

use super::VizError;
use crate::formula::{EvalScope, Formula, FormulaEvaluator};
use crate::model::{
    AttributeInstanceId, CustomVariable, InstanceKind, MetaModelRegistry, SceneInstance,
};
use crate::ops::{MetaKind, ObjectKind, OpsError};
use crate::query::lookup::{
    attribute_instance, attribute_instances, attribute_owner, find_in_scene, find_in_scene_mut,
    InstanceRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizOutcome {
    /// The owner's formula does not read the attribute.
    Skipped,
    Updated,
}

/// Result of a batch pass; failures of single instances do not stop the pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: Vec<(Uuid, VizError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, id: Uuid, result: Result<VizOutcome, VizError>) {
        match result {
            Ok(VizOutcome::Updated) => self.updated += 1,
            Ok(VizOutcome::Skipped) => self.skipped += 1,
            Err(err) => {
                error!(instance:% = id, error:% = err; "visual update failed");
                self.failed.push((id, err));
            }
        }
    }
}

/// The visual formula of the concept `instance` is typed by.
pub fn formula_of<'m>(
    meta: &'m dyn MetaModelRegistry,
    instance: InstanceRef<'_>,
) -> Result<&'m Formula, OpsError> {
    match instance {
        InstanceRef::Scene(scene) => meta
            .scene_type(&scene.uuid_scene_type)
            .map(|st| &st.geometry)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::SceneType, scene.uuid_scene_type)),
        InstanceRef::Class(class) => meta
            .meta_class(&class.uuid_class)
            .map(|c| &c.geometry)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Class, class.uuid_class)),
        InstanceRef::Relationclass(relation) => meta
            .meta_relationclass(&relation.uuid_relationclass)
            .map(|r| &r.geometry)
            .ok_or_else(|| {
                OpsError::meta_not_found(MetaKind::Relationclass, relation.uuid_relationclass)
            }),
        InstanceRef::Port(port) => meta
            .meta_port(&port.uuid_port)
            .map(|p| &p.geometry)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Port, port.uuid_port)),
    }
}

/// Re-evaluates the owner of `attribute` if its formula depends on that attribute.
pub fn check_for_viz_rep_update(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    evaluator: &dyn FormulaEvaluator,
    attribute: &AttributeInstanceId,
) -> Result<VizOutcome, VizError> {
    let attr = attribute_instance(scene, attribute)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, attribute))?;
    let owner = attr.owner;
    let instance = attribute_owner(scene, &owner).ok_or(OpsError::NotFound {
        kind: owner.kind().into(),
        id: *owner.uuid(),
    })?;
    let meta_attr = meta
        .meta_attribute(&attr.uuid_attribute)
        .ok_or_else(|| OpsError::meta_not_found(MetaKind::Attribute, attr.uuid_attribute))?;

    if !formula_of(meta, instance)?.reads(meta_attr) {
        debug!(attribute:% = attribute, name = meta_attr.name.as_str(); "visual not affected");
        return Ok(VizOutcome::Skipped);
    }
    refresh_visual(scene, meta, evaluator, owner.uuid())?;
    Ok(VizOutcome::Updated)
}

/// Evaluates the formula of `instance` unconditionally.
pub fn refresh_visual(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    evaluator: &dyn FormulaEvaluator,
    instance: &Uuid,
) -> Result<(), VizError> {
    let found = find_in_scene(scene, instance, None).ok_or(OpsError::NotFound {
        kind: ObjectKind::Class,
        id: *instance,
    })?;
    let kind = found.kind();
    let formula = formula_of(meta, found)?;
    let mut scope = scope_for(meta, found);

    let visual = evaluator
        .evaluate(formula, &mut scope)
        .map_err(|source| VizError::Formula {
            instance: *instance,
            source,
        })?;

    let mut target = find_in_scene_mut(scene, instance, Some(kind)).ok_or(OpsError::NotFound {
        kind: kind.into(),
        id: *instance,
    })?;
    let state = target.visual_mut();
    state.custom_variables = scope.into_variables();
    state.representation = Some(visual);
    debug!(instance:% = instance, kind:% = kind; "visual refreshed");
    Ok(())
}

/// Attribute values by meta name and by meta id, plus the locked variables only.
fn scope_for(meta: &dyn MetaModelRegistry, instance: InstanceRef<'_>) -> EvalScope {
    let locked = instance
        .visual()
        .locked_variables()
        .map(|(name, var)| (name.clone(), var.clone()))
        .collect::<BTreeMap<SmolStr, CustomVariable>>();
    let mut scope = EvalScope::new(*instance.uuid(), instance.name(), instance.transform())
        .with_variables(locked);
    for attr in instance.attributes() {
        if let Some(meta_attr) = meta.meta_attribute(&attr.uuid_attribute) {
            scope = scope.with_attribute(meta_attr.name.clone(), attr.value.clone());
        }
        scope = scope.with_attribute(attr.uuid_attribute.to_string(), attr.value.clone());
    }
    scope
}

/// Runs [`check_for_viz_rep_update`] for every attribute owned by a class or port instance.
///
/// Relation and scene attributes are left out of this pass.
pub fn update_scene_visuals(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    evaluator: &dyn FormulaEvaluator,
) -> BatchReport {
    let candidates = attribute_instances(InstanceRef::Scene(scene))
        .into_iter()
        .filter(|attr| {
            matches!(
                attr.owner.kind(),
                InstanceKind::Class | InstanceKind::Port
            )
        })
        .map(|attr| attr.uuid)
        .collect::<Vec<_>>();

    let mut report = BatchReport::default();
    for attr in candidates {
        let result = check_for_viz_rep_update(scene, meta, evaluator, &attr);
        report.record(*attr.as_uuid(), result);
    }
    report
}

/// Evaluates the visual of every instance in the scene, the scene itself included.
pub fn refresh_all(
    scene: &mut SceneInstance,
    meta: &dyn MetaModelRegistry,
    evaluator: &dyn FormulaEvaluator,
) -> BatchReport {
    let mut ids = vec![*scene.uuid.as_uuid()];
    ids.extend(scene.class_instances.keys().map(|id| *id.as_uuid()));
    ids.extend(scene.relationclasses_instances.keys().map(|id| *id.as_uuid()));
    ids.extend(crate::query::lookup::port_instances(scene).map(|p| *p.uuid.as_uuid()));

    let mut report = BatchReport::default();
    for id in ids {
        let result = refresh_visual(scene, meta, evaluator, &id).map(|()| VizOutcome::Updated);
        report.record(id, result);
    }
    report
}
