// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Side-effect algorithms bound to meta-model behaviors.
//!
//! An algorithm may be limited to scenes of certain scene types and to changes of one specific
//! meta attribute. Matching is by exact id.

use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use uuid::Uuid;

use super::viz::{check_for_viz_rep_update, VizOutcome};
use crate::config::HybridConfig;
use crate::formula::FormulaEvaluator;
use crate::host::SceneRenderer;
use crate::model::{
    Attribute, AttributeId, AttributeInstanceId, AttributeValue, Axis, Class, ClassInstanceId,
    MetaModelRegistry, PortInstanceId, PortOwner, SceneInstance, SceneTypeId, Vec3,
};
use crate::ops::OpsError;
use crate::query::lookup::{attribute_instance, find_in_scene, port_instance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Always,
    /// Only when the changed attribute instance is typed by this meta attribute.
    Attribute(AttributeId),
}

/// What an algorithm sees of the current change.
pub struct HybridContext<'a> {
    pub scene: &'a mut SceneInstance,
    pub meta: &'a dyn MetaModelRegistry,
    pub evaluator: &'a dyn FormulaEvaluator,
    pub renderer: &'a dyn SceneRenderer,
    pub changed: Option<AttributeInstanceId>,
    /// Instances the change concerns. With `ports` also empty the whole scene is concerned.
    pub classes: &'a [ClassInstanceId],
    /// Ports the change concerns; each stands in for the class instance owning it.
    pub ports: &'a [PortInstanceId],
    /// Attribute instances whose value an algorithm rewrote during this pass.
    pub written: Vec<AttributeInstanceId>,
}

impl<'a> HybridContext<'a> {
    pub fn new(
        scene: &'a mut SceneInstance,
        meta: &'a dyn MetaModelRegistry,
        evaluator: &'a dyn FormulaEvaluator,
        renderer: &'a dyn SceneRenderer,
    ) -> Self {
        Self {
            scene,
            meta,
            evaluator,
            renderer,
            changed: None,
            classes: &[],
            ports: &[],
            written: Vec::new(),
        }
    }

    pub fn with_changed(mut self, changed: Option<AttributeInstanceId>) -> Self {
        self.changed = changed;
        self
    }

    pub fn with_classes(mut self, classes: &'a [ClassInstanceId]) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_ports(mut self, ports: &'a [PortInstanceId]) -> Self {
        self.ports = ports;
        self
    }

    /// The class instances in scope, or `None` when the whole scene is.
    ///
    /// Ports of relation instances have no class owner and add nothing.
    pub fn scope(&self) -> Option<Vec<ClassInstanceId>> {
        if self.classes.is_empty() && self.ports.is_empty() {
            return None;
        }
        let mut scope = self.classes.to_vec();
        for port in self.ports {
            let owner = port_instance(self.scene, port).map(|p| p.owner);
            if let Some(PortOwner::Class(owner)) = owner {
                if !scope.contains(&owner) {
                    scope.push(owner);
                }
            }
        }
        Some(scope)
    }
}

pub trait HybridAlgorithm {
    fn name(&self) -> &str;

    /// Scene types the algorithm applies to; `None` means every scene type.
    fn scene_types(&self) -> Option<&BTreeSet<SceneTypeId>> {
        None
    }

    fn trigger(&self) -> Trigger {
        Trigger::Always
    }

    /// Returns the instances whose state was modified.
    fn run(&self, cx: &mut HybridContext<'_>) -> Result<Vec<Uuid>, OpsError>;
}

#[derive(Debug, Default)]
pub struct HybridReport {
    pub ran: Vec<String>,
    pub touched: Vec<Uuid>,
    /// Instances whose visual was re-evaluated because an algorithm rewrote an attribute
    /// their formula reads. Each is also listed in `touched`.
    pub refreshed: Vec<Uuid>,
    pub failed: Vec<(String, OpsError)>,
}

#[derive(Default)]
pub struct HybridDispatcher {
    algorithms: Vec<Box<dyn HybridAlgorithm>>,
}

impl HybridDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with reference resolution and state-change sync registered.
    pub fn with_builtins(config: &HybridConfig) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(ReferenceResolution::new(config.clone()));
        dispatcher.register(StateChangeSync::new(config.clone()));
        dispatcher
    }

    pub fn register(&mut self, algorithm: impl HybridAlgorithm + 'static) {
        self.algorithms.push(Box::new(algorithm));
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Runs every algorithm that applies to the scene type and the change.
    ///
    /// An algorithm failure is recorded and the remaining algorithms still run. Afterwards every
    /// attribute written by an algorithm goes through the same visual check as a user edit.
    pub fn check_hybrid_algorithms(&self, cx: &mut HybridContext<'_>) -> HybridReport {
        let scene_type = cx.scene.uuid_scene_type;
        let changed_meta = cx
            .changed
            .and_then(|id| attribute_instance(cx.scene, &id))
            .map(|attr| attr.uuid_attribute);

        let mut report = HybridReport::default();
        let mut touched = HashSet::new();
        for algorithm in &self.algorithms {
            if !algorithm
                .scene_types()
                .map_or(true, |types| types.contains(&scene_type))
            {
                continue;
            }
            if let Trigger::Attribute(expected) = algorithm.trigger() {
                if changed_meta != Some(expected) {
                    continue;
                }
            }

            let name = algorithm.name().to_owned();
            match algorithm.run(cx) {
                Ok(ids) => {
                    debug!(algorithm = name.as_str(), touched = ids.len(); "hybrid algorithm ran");
                    for id in ids {
                        if touched.insert(id) {
                            report.touched.push(id);
                        }
                    }
                    report.ran.push(name);
                }
                Err(err) => {
                    warn!(algorithm = name.as_str(), error:% = err; "hybrid algorithm failed");
                    report.failed.push((name, err));
                }
            }
        }

        let written = std::mem::take(&mut cx.written);
        let mut checked = HashSet::new();
        for attribute in written {
            if !checked.insert(attribute) {
                continue;
            }
            match check_for_viz_rep_update(cx.scene, cx.meta, cx.evaluator, &attribute) {
                Ok(VizOutcome::Updated) => {
                    let Some(owner) =
                        attribute_instance(cx.scene, &attribute).map(|a| *a.owner.uuid())
                    else {
                        continue;
                    };
                    if !report.refreshed.contains(&owner) {
                        report.refreshed.push(owner);
                    }
                    if touched.insert(owner) {
                        report.touched.push(owner);
                    }
                }
                Ok(VizOutcome::Skipped) => {}
                Err(err) => warn!(
                    attribute:% = attribute,
                    error:% = err;
                    "visual update after hybrid write failed"
                ),
            }
        }
        report
    }
}

/// The reference class of the scene's type and the ids of its attributes.
struct ReferenceShape<'m> {
    class: &'m Class,
}

impl<'m> ReferenceShape<'m> {
    fn resolve(
        meta: &'m dyn MetaModelRegistry,
        scene: &SceneInstance,
        config: &HybridConfig,
    ) -> Option<Self> {
        let class = meta
            .scene_type(&scene.uuid_scene_type)?
            .class_by_name(&config.reference_class)?;
        Some(Self { class })
    }

    fn attribute(&self, name: &str) -> Option<&'m Attribute> {
        self.class.attributes.iter().find(|a| a.name == name)
    }

    fn attribute_id(&self, name: &str) -> Option<AttributeId> {
        self.attribute(name).map(|a| a.uuid)
    }

    fn instances(
        &self,
        scene: &SceneInstance,
        only: Option<&[ClassInstanceId]>,
    ) -> Vec<ClassInstanceId> {
        scene
            .class_instances
            .values()
            .filter(|c| c.uuid_class == self.class.uuid)
            .filter(|c| only.map_or(true, |only| only.contains(&c.uuid)))
            .map(|c| c.uuid)
            .collect()
    }
}

/// Gives every bound reference instance the appearance of the instance it points at.
#[derive(Debug, Clone)]
pub struct ReferenceResolution {
    config: HybridConfig,
}

impl ReferenceResolution {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }
}

impl HybridAlgorithm for ReferenceResolution {
    fn name(&self) -> &str {
        "reference-resolution"
    }

    fn run(&self, cx: &mut HybridContext<'_>) -> Result<Vec<Uuid>, OpsError> {
        let Some(shape) = ReferenceShape::resolve(cx.meta, cx.scene, &self.config) else {
            return Ok(Vec::new());
        };
        let Some(reference_attr) = shape.attribute_id(&self.config.reference) else {
            return Ok(Vec::new());
        };

        let mut touched = Vec::new();
        let scope = cx.scope();
        for reference in shape.instances(cx.scene, scope.as_deref()) {
            let target = cx
                .scene
                .class_instances
                .get(&reference)
                .and_then(|c| c.attribute(&reference_attr))
                .and_then(|attr| attr.role_instance_from)
                .and_then(|role| cx.scene.role_instances.get(&role))
                .and_then(|role| role.target.uuid().copied());
            let Some(target) = target else {
                continue;
            };
            let Some(representation) = find_in_scene(cx.scene, &target, None)
                .and_then(|found| found.visual().representation.clone())
            else {
                continue;
            };
            if let Some(instance) = cx.scene.class_instances.get_mut(&reference) {
                if instance.visual.representation.as_ref() != Some(&representation) {
                    instance.visual.representation = Some(representation);
                    touched.push(*reference.as_uuid());
                }
            }
        }
        Ok(touched)
    }
}

/// Copies the rendered transform of tracking reference instances into their position and
/// rotation attributes, axis by axis.
#[derive(Debug, Clone)]
pub struct StateChangeSync {
    config: HybridConfig,
}

impl StateChangeSync {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }
}

struct SyncTarget {
    attribute: AttributeId,
    gates: [Option<AttributeId>; 3],
}

impl StateChangeSync {
    fn targets(&self, shape: &ReferenceShape<'_>) -> Vec<(SyncTarget, bool)> {
        let gates = |names: &[String; 3]| {
            [0, 1, 2].map(|axis| shape.attribute_id(&names[axis]))
        };
        let mut out = Vec::new();
        if let Some(attribute) = shape.attribute_id(&self.config.position) {
            let gates = gates(&self.config.set_position);
            out.push((SyncTarget { attribute, gates }, true));
        }
        if let Some(attribute) = shape.attribute_id(&self.config.rotation) {
            let gates = gates(&self.config.set_rotation);
            out.push((SyncTarget { attribute, gates }, false));
        }
        out
    }
}

impl HybridAlgorithm for StateChangeSync {
    fn name(&self) -> &str {
        "state-change-sync"
    }

    fn run(&self, cx: &mut HybridContext<'_>) -> Result<Vec<Uuid>, OpsError> {
        let Some(shape) = ReferenceShape::resolve(cx.meta, cx.scene, &self.config) else {
            return Ok(Vec::new());
        };
        let Some(tracking) = shape.attribute_id(&self.config.track_transform) else {
            return Ok(Vec::new());
        };
        let targets = self.targets(&shape);

        let mut touched = Vec::new();
        let scope = cx.scope();
        for reference in shape.instances(cx.scene, scope.as_deref()) {
            let Some(instance) = cx.scene.class_instances.get_mut(&reference) else {
                continue;
            };
            let tracks = instance
                .attribute(&tracking)
                .and_then(|a| a.value.as_bool())
                .unwrap_or(false);
            if !tracks {
                continue;
            }
            let Some(rendered) = cx.renderer.find_object(reference.as_uuid()) else {
                debug!(instance:% = reference; "tracking reference is not rendered");
                continue;
            };

            let mut changed = false;
            for (target, is_position) in &targets {
                let live = if *is_position {
                    rendered.transform.position
                } else {
                    rendered.transform.rotation
                };
                let enabled = target.gates.map(|gate| {
                    gate.and_then(|g| instance.attribute(&g))
                        .and_then(|a| a.value.as_bool())
                        .unwrap_or(false)
                });
                let Some(attr) = instance.attribute_mut(&target.attribute) else {
                    continue;
                };
                let mut value = attr.value.as_vec3().unwrap_or(Vec3::ZERO);
                for (axis, on) in Axis::ALL.into_iter().zip(enabled) {
                    if on {
                        value.set_axis(axis, live.axis(axis));
                    }
                }
                let value = AttributeValue::Vector(value);
                if attr.value != value {
                    attr.value = value;
                    cx.written.push(attr.uuid);
                    changed = true;
                }
            }
            if changed {
                touched.push(*reference.as_uuid());
            }
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeSet;

    use uuid::Uuid;

    use super::{HybridAlgorithm, HybridContext, HybridDispatcher, Trigger};
    use crate::config::HybridConfig;
    use crate::formula::{Formula, TemplateEvaluator};
    use crate::host::recording::RecordingRenderer;
    use crate::host::SceneRenderer;
    use crate::model::fixtures::{station_meta, StationIds};
    use crate::model::{
        AttributeId, AttributeInstanceId, AttributeValue, ClassInstanceId, ClassInstanceKind,
        MetaModel, MetaModelRegistry, RoleTarget, SceneInstance, SceneTypeId, Transform, Vec3,
        Visual,
    };
    use crate::ops::{create_class_instance, create_scene_instance, set_reference, OpsError};

    struct Counting {
        trigger: Trigger,
        runs: Cell<usize>,
    }

    impl HybridAlgorithm for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn trigger(&self) -> Trigger {
            self.trigger
        }

        fn run(&self, _cx: &mut HybridContext<'_>) -> Result<Vec<Uuid>, OpsError> {
            self.runs.set(self.runs.get() + 1);
            Ok(Vec::new())
        }
    }

    fn setup() -> (MetaModel, StationIds, SceneInstance, ClassInstanceId, ClassInstanceId) {
        let (meta, ids) = station_meta();
        let mut scene = create_scene_instance(meta.scene_type(&ids.scene_type).expect("type"), "s");
        let station = create_class_instance(
            &mut scene,
            &meta,
            &ids.station,
            Vec3::ZERO,
            ClassInstanceKind::Regular,
        )
        .expect("station");
        let reference = create_class_instance(
            &mut scene,
            &meta,
            &ids.reference,
            Vec3::ONE,
            ClassInstanceKind::Regular,
        )
        .expect("reference");
        (meta, ids, scene, station, reference)
    }

    fn attr(
        scene: &SceneInstance,
        class: &ClassInstanceId,
        meta: &AttributeId,
    ) -> AttributeInstanceId {
        scene.class_instances[class]
            .attribute(meta)
            .map(|a| a.uuid)
            .expect("attribute")
    }

    fn context<'a>(
        scene: &'a mut SceneInstance,
        meta: &'a MetaModel,
        renderer: &'a dyn SceneRenderer,
        changed: Option<AttributeInstanceId>,
    ) -> HybridContext<'a> {
        HybridContext::new(scene, meta, &TemplateEvaluator, renderer).with_changed(changed)
    }

    /// Tracks every position axis of `reference` and renders it moved to `live`.
    fn track_position(
        scene: &mut SceneInstance,
        ids: &StationIds,
        reference: &ClassInstanceId,
        renderer: &RecordingRenderer,
        live: Vec3,
    ) {
        let gates = [
            ids.track_transform,
            ids.set_position[0],
            ids.set_position[1],
            ids.set_position[2],
        ];
        for gate in gates {
            let id = attr(scene, reference, &gate);
            crate::ops::set_attribute_value(scene, &id, true.into()).expect("gate");
        }
        renderer.draw_at(Vec3::ONE, reference.as_uuid(), &Visual::default());
        renderer.move_object(reference.as_uuid(), Transform::at(live));
    }

    #[test]
    fn attribute_trigger_requires_exact_meta_id() {
        let (meta, ids, mut scene, station, _) = setup();
        let renderer = RecordingRenderer::new();
        let mut dispatcher = HybridDispatcher::new();
        dispatcher.register(Counting {
            trigger: Trigger::Attribute(ids.station_color),
            runs: Cell::new(0),
        });
        let color = attr(&scene, &station, &ids.station_color);
        let name = attr(&scene, &station, &ids.station_name);

        let report = dispatcher
            .check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, Some(name)));
        assert!(report.ran.is_empty());
        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert!(report.ran.is_empty());
        let report = dispatcher
            .check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, Some(color)));
        assert_eq!(report.ran, vec!["counting".to_owned()]);
    }

    #[test]
    fn reference_takes_the_targets_appearance() {
        let (meta, ids, mut scene, station, reference) = setup();
        let look = Visual {
            commands: vec![crate::model::DrawCommand::new("box").with_param("color", "#3366ff")],
        };
        scene.class_instances.get_mut(&station).expect("station").visual.representation =
            Some(look.clone());
        let target = attr(&scene, &reference, &ids.reference_target);
        set_reference(&mut scene, &meta, &target, RoleTarget::ClassInstance(station))
            .expect("bind");

        let renderer = RecordingRenderer::new();
        let dispatcher = HybridDispatcher::with_builtins(&HybridConfig::default());
        let report = dispatcher
            .check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, Some(target)));

        assert_eq!(report.touched, vec![*reference.as_uuid()]);
        assert_eq!(scene.class_instances[&reference].visual.representation, Some(look));
    }

    #[test]
    fn tracking_copies_live_transform_per_enabled_axis() {
        let (meta, ids, mut scene, _, reference) = setup();
        let set = |scene: &mut SceneInstance, meta_id: &AttributeId, value: AttributeValue| {
            let id = attr(scene, &reference, meta_id);
            crate::ops::set_attribute_value(scene, &id, value).expect("set");
        };
        set(&mut scene, &ids.track_transform, true.into());
        set(&mut scene, &ids.set_position[0], true.into());
        set(&mut scene, &ids.set_position[2], true.into());
        set(&mut scene, &ids.set_rotation[1], true.into());

        let renderer = RecordingRenderer::new();
        renderer.draw_at(Vec3::ONE, reference.as_uuid(), &Visual::default());
        let mut live = Transform::at(Vec3::new(3.0, 4.0, 5.0));
        live.rotation = Vec3::new(0.1, 0.2, 0.3);
        renderer.move_object(reference.as_uuid(), live);

        let dispatcher = HybridDispatcher::with_builtins(&HybridConfig::default());
        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert_eq!(report.touched, vec![*reference.as_uuid()]);

        let instance = &scene.class_instances[&reference];
        let position = instance.attribute(&ids.position).expect("position").value.as_vec3();
        assert_eq!(position, Some(Vec3::new(3.0, 0.0, 5.0)));
        let rotation = instance.attribute(&ids.rotation).expect("rotation").value.as_vec3();
        assert_eq!(rotation, Some(Vec3::new(0.0, 0.2, 0.0)));

        // Nothing moved, nothing to report.
        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert!(report.touched.is_empty());
    }

    #[test]
    fn synced_position_refreshes_a_visual_that_reads_it() {
        let (meta, ids) = station_meta();
        let mut scene_types = meta.scene_types().to_vec();
        let reference_class = scene_types
            .iter_mut()
            .flat_map(|st| st.classes.iter_mut())
            .find(|class| class.uuid == ids.reference)
            .expect("reference class");
        let source = "box size=0.1,0.1,0.1 offset={Position}";
        reference_class.geometry = Formula::author(source, &reference_class.attributes);
        let meta = MetaModel::new(scene_types);

        let mut scene = create_scene_instance(meta.scene_type(&ids.scene_type).expect("type"), "s");
        let reference = create_class_instance(
            &mut scene,
            &meta,
            &ids.reference,
            Vec3::ZERO,
            ClassInstanceKind::Regular,
        )
        .expect("reference");
        let renderer = RecordingRenderer::new();
        track_position(&mut scene, &ids, &reference, &renderer, Vec3::new(2.0, 1.0, 3.0));

        let dispatcher = HybridDispatcher::with_builtins(&HybridConfig::default());
        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert_eq!(report.refreshed, vec![*reference.as_uuid()]);
        assert_eq!(report.touched, vec![*reference.as_uuid()]);

        let visual = scene.class_instances[&reference]
            .visual
            .representation
            .clone()
            .expect("visual");
        assert_eq!(
            visual.commands[0].param("offset"),
            Some(&AttributeValue::Vector(Vec3::new(2.0, 1.0, 3.0)))
        );
    }

    #[test]
    fn synced_position_leaves_a_visual_that_ignores_it() {
        let (meta, ids, mut scene, _, reference) = setup();
        let renderer = RecordingRenderer::new();
        track_position(&mut scene, &ids, &reference, &renderer, Vec3::new(2.0, 1.0, 3.0));
        let before = scene.class_instances[&reference].visual.representation.clone();

        let dispatcher = HybridDispatcher::with_builtins(&HybridConfig::default());
        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert_eq!(report.touched, vec![*reference.as_uuid()]);
        assert!(report.refreshed.is_empty());
        assert_eq!(scene.class_instances[&reference].visual.representation, before);
    }

    #[test]
    fn ports_scope_their_owning_instance() {
        let (meta, ids, mut scene, station, reference) = setup();
        let plug = scene.class_instances[&station].port_instances[0].uuid;
        let renderer = RecordingRenderer::new();
        track_position(&mut scene, &ids, &reference, &renderer, Vec3::new(2.0, 1.0, 3.0));

        let ports = [plug];
        let cx = context(&mut scene, &meta, &renderer, None).with_ports(&ports);
        assert_eq!(cx.scope(), Some(vec![station]));
        assert_eq!(context(&mut scene, &meta, &renderer, None).scope(), None);

        // The station's port keeps the tracking reference out of the pass.
        let dispatcher = HybridDispatcher::with_builtins(&HybridConfig::default());
        let mut cx = context(&mut scene, &meta, &renderer, None).with_ports(&ports);
        assert!(dispatcher.check_hybrid_algorithms(&mut cx).touched.is_empty());

        let classes = [reference];
        let mut cx = context(&mut scene, &meta, &renderer, None)
            .with_ports(&ports)
            .with_classes(&classes);
        let report = dispatcher.check_hybrid_algorithms(&mut cx);
        assert_eq!(report.touched, vec![*reference.as_uuid()]);
    }

    #[test]
    fn scene_type_gate_is_exact() {
        let (meta, ids, mut scene, _, _) = setup();
        struct Gated(BTreeSet<SceneTypeId>);
        impl HybridAlgorithm for Gated {
            fn name(&self) -> &str {
                "gated"
            }
            fn scene_types(&self) -> Option<&BTreeSet<SceneTypeId>> {
                Some(&self.0)
            }
            fn run(&self, _cx: &mut HybridContext<'_>) -> Result<Vec<Uuid>, OpsError> {
                Ok(Vec::new())
            }
        }
        let renderer = RecordingRenderer::new();
        let mut dispatcher = HybridDispatcher::new();
        dispatcher.register(Gated([crate::model::Id::fresh()].into()));
        dispatcher.register(Gated([ids.scene_type].into()));

        let report =
            dispatcher.check_hybrid_algorithms(&mut context(&mut scene, &meta, &renderer, None));
        assert_eq!(report.ran.len(), 1);
    }
}
