// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editor core assembled from its collaborators.
//!
//! [`Editor`] owns the instance graph and one interaction machine per open scene. Every change
//! runs the same sequence synchronously: mutate the graph, re-evaluate affected visuals, run
//! hybrid algorithms, then notify the host.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, error, info};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::formula::{FormulaEvaluator, TemplateEvaluator};
use crate::host::{EditorEvent, EventBus, SceneRenderer, SimulationUtility};
use crate::interaction::{
    forget_rendered, InteractionMachine, Mode, Outcome, PointerEvent, Services,
};
use crate::model::{
    AttributeInstanceId, AttributeValue, ClassInstanceId, Endpoint, InstanceGraph, InstanceKind,
    MetaModelRegistry, PortInstanceId, RelationclassInstanceId, RoleTarget, SceneInstance,
    SceneInstanceId, SceneTypeId, Transform, Vec3,
};
use crate::ops::{self, BendPoints, Delta, MetaKind, ObjectKind, OpsError};
use crate::query::lookup::{attribute_instance, endpoint_position, find_in_scene, port_instances};
use crate::query::{validate_scene, InstanceRef, Issue};
use crate::reactive::{
    check_for_viz_rep_update, refresh_all, BatchReport, HybridAlgorithm, HybridContext,
    HybridDispatcher, HybridReport, VizError, VizOutcome,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("no scene is open")]
    NoActiveScene,
    #[error("scene type {0} is not part of the meta model")]
    UnknownSceneType(SceneTypeId),
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error(transparent)]
    Viz(#[from] VizError),
}

/// The host services the editor core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub meta: Rc<dyn MetaModelRegistry>,
    pub renderer: Rc<dyn SceneRenderer>,
    pub bus: Rc<dyn EventBus>,
    pub simulation: Rc<dyn SimulationUtility>,
    pub evaluator: Rc<dyn FormulaEvaluator>,
}

impl Collaborators {
    /// Collaborators evaluating formulas with [`TemplateEvaluator`].
    pub fn new(
        meta: Rc<dyn MetaModelRegistry>,
        renderer: Rc<dyn SceneRenderer>,
        bus: Rc<dyn EventBus>,
        simulation: Rc<dyn SimulationUtility>,
    ) -> Self {
        Self {
            meta,
            renderer,
            bus,
            simulation,
            evaluator: Rc::new(TemplateEvaluator),
        }
    }
}

/// What an attribute edit caused.
#[derive(Debug)]
pub struct AttributeChange {
    pub previous: AttributeValue,
    pub visual: Result<VizOutcome, VizError>,
    pub hybrid: HybridReport,
}

pub struct Editor {
    config: EditorConfig,
    services: Collaborators,
    graph: InstanceGraph,
    machines: HashMap<SceneInstanceId, InteractionMachine>,
    dispatcher: HybridDispatcher,
}

impl Editor {
    pub fn new(config: EditorConfig, services: Collaborators) -> Self {
        let dispatcher = HybridDispatcher::with_builtins(&config.hybrid);
        Self {
            config,
            services,
            graph: InstanceGraph::new(),
            machines: HashMap::new(),
            dispatcher,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &InstanceGraph {
        &self.graph
    }

    pub fn active_scene(&self) -> Option<&SceneInstance> {
        self.graph.active_scene()
    }

    pub fn register_algorithm(&mut self, algorithm: impl HybridAlgorithm + 'static) {
        self.dispatcher.register(algorithm);
    }

    /// Mode of the active scene's interaction; [`Mode::View`] without an open scene.
    pub fn mode(&self) -> Mode {
        self.active_machine().map_or(Mode::View, InteractionMachine::mode)
    }

    pub fn machine(&self) -> Option<&InteractionMachine> {
        self.active_machine()
    }

    fn active_machine(&self) -> Option<&InteractionMachine> {
        self.machines.get(&self.graph.active_scene_id()?)
    }

    fn active_id(&self) -> Result<SceneInstanceId, EditorError> {
        self.graph
            .active_scene_id()
            .ok_or(EditorError::NoActiveScene)
    }

    /// Creates an empty scene of `scene_type` and opens it in a new tab.
    pub fn new_scene(
        &mut self,
        scene_type: &SceneTypeId,
        name: impl Into<String>,
    ) -> Result<SceneInstanceId, EditorError> {
        let meta = self
            .services
            .meta
            .scene_type(scene_type)
            .ok_or(EditorError::UnknownSceneType(*scene_type))?;
        let scene = ops::create_scene_instance(meta, name);
        Ok(self.import_scene(scene).0)
    }

    /// Opens `scene` as the active tab, re-evaluates every visual and draws the scene.
    pub fn import_scene(&mut self, scene: SceneInstance) -> (SceneInstanceId, BatchReport) {
        let id = self.open(scene);
        let mut report = BatchReport::default();
        if let Some(scene) = self.graph.scene_mut(&id) {
            report = refresh_all(
                scene,
                self.services.meta.as_ref(),
                self.services.evaluator.as_ref(),
            );
            let hybrid = run_hybrid(&self.dispatcher, scene, &self.services, None, &[], &[]);
            debug!(scene:% = id, algorithms = hybrid.ran.len(); "hybrid pass after import");
            draw_scene(self.services.renderer.as_ref(), scene);
        }
        info!(
            scene:% = id,
            updated = report.updated,
            failed = report.failed.len();
            "scene imported"
        );
        self.services
            .bus
            .publish(EditorEvent::SceneImported { scene: id });
        (id, report)
    }

    fn open(&mut self, scene: SceneInstance) -> SceneInstanceId {
        let scene_type = scene.uuid_scene_type;
        let id = self.graph.open_scene(scene);
        self.machines.insert(id, InteractionMachine::new());
        self.services.meta.set_active_scene_type(Some(scene_type));
        self.services.bus.publish(EditorEvent::SceneListChanged);
        id
    }

    /// Closes a tab and removes its rendered objects.
    pub fn close_scene(&mut self, id: &SceneInstanceId) -> Option<SceneInstance> {
        let scene = self.graph.close_scene(id)?;
        self.machines.remove(id);
        for uuid in rendered_ids(&scene) {
            self.services.renderer.remove_object(&uuid);
        }
        self.sync_active_scene_type();
        self.services.bus.publish(EditorEvent::SceneListChanged);
        info!(scene:% = id; "scene closed");
        Some(scene)
    }

    pub fn set_active_scene(&mut self, id: &SceneInstanceId) -> bool {
        if !self.graph.set_active(id) {
            return false;
        }
        self.sync_active_scene_type();
        true
    }

    fn sync_active_scene_type(&self) {
        let scene_type = self.graph.active_scene().map(|s| s.uuid_scene_type);
        self.services.meta.set_active_scene_type(scene_type);
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), EditorError> {
        let id = self.active_id()?;
        let (Some(scene), Some(machine)) = (self.graph.scene_mut(&id), self.machines.get_mut(&id))
        else {
            return Err(EditorError::NoActiveScene);
        };
        let mut services = interaction_services(&self.services, &self.config, scene);
        machine.set_mode(&mut services, mode);
        Ok(())
    }

    /// Feeds a pointer-down to the active scene's interaction.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Result<Outcome, EditorError> {
        let id = self.active_id()?;
        let (Some(scene), Some(machine)) = (self.graph.scene_mut(&id), self.machines.get_mut(&id))
        else {
            return Err(EditorError::NoActiveScene);
        };
        let outcome = {
            let mut services = interaction_services(&self.services, &self.config, scene);
            machine.handle(&mut services, event)
        };

        let touched = match &outcome {
            Outcome::ClassPlaced(class) => Some((vec![*class], Vec::new())),
            Outcome::RelationFinished(relation) => Some(relation_ends(scene, relation)),
            _ => None,
        };
        if let Some((classes, ports)) = touched {
            let report =
                run_hybrid(&self.dispatcher, scene, &self.services, None, &classes, &ports);
            redraw(self.services.renderer.as_ref(), scene, &report.touched);
        }
        Ok(outcome)
    }

    pub fn pointer_moved(&mut self, point: Vec3) -> bool {
        let Some(id) = self.graph.active_scene_id() else {
            return false;
        };
        match (self.graph.scene_mut(&id), self.machines.get_mut(&id)) {
            (Some(scene), Some(machine)) => machine.pointer_moved(scene, point),
            _ => false,
        }
    }

    /// Retires finished lines in every open scene whose grace delay has passed.
    pub fn poll(&mut self, now: Instant) -> Vec<RelationclassInstanceId> {
        self.machines
            .values_mut()
            .filter_map(|machine| machine.poll(now))
            .collect()
    }

    /// Edits an attribute value of the active scene and lets the change ripple.
    pub fn set_attribute(
        &mut self,
        id: &AttributeInstanceId,
        value: AttributeValue,
    ) -> Result<AttributeChange, EditorError> {
        let scene_id = self.active_id()?;
        let scene = self
            .graph
            .scene_mut(&scene_id)
            .ok_or(EditorError::NoActiveScene)?;
        let previous = ops::set_attribute_value(scene, id, value)?;

        let meta = self.services.meta.as_ref();
        let visual = check_for_viz_rep_update(scene, meta, self.services.evaluator.as_ref(), id);
        match &visual {
            Ok(VizOutcome::Updated) => {
                if let Some(owner) = attribute_instance(scene, id).map(|a| *a.owner.uuid()) {
                    redraw(self.services.renderer.as_ref(), scene, &[owner]);
                }
            }
            Ok(VizOutcome::Skipped) => {}
            Err(err) => error!(attribute:% = id, error:% = err; "visual update failed"),
        }

        let hybrid = run_hybrid(&self.dispatcher, scene, &self.services, Some(*id), &[], &[]);
        redraw(self.services.renderer.as_ref(), scene, &hybrid.touched);
        self.services
            .bus
            .publish(EditorEvent::AttributePanelRefresh { update: false });
        Ok(AttributeChange {
            previous,
            visual,
            hybrid,
        })
    }

    /// Moves a class or relation of the active scene.
    pub fn set_transform(&mut self, id: &Uuid, transform: Transform) -> Result<Delta, EditorError> {
        let scene_id = self.active_id()?;
        let scene = self
            .graph
            .scene_mut(&scene_id)
            .ok_or(EditorError::NoActiveScene)?;
        let delta = ops::set_transform(scene, id, transform)?;
        let classes: Vec<ClassInstanceId> = delta
            .updated
            .iter()
            .filter(|key| key.kind == ObjectKind::Class)
            .map(|key| ClassInstanceId::from(key.id))
            .collect();
        let report = run_hybrid(&self.dispatcher, scene, &self.services, None, &classes, &[]);
        redraw(self.services.renderer.as_ref(), scene, &report.touched);
        Ok(delta)
    }

    /// Deletes a class, relation or port instance of the active scene with its cascade.
    pub fn delete_instance(&mut self, id: &Uuid) -> Result<Delta, EditorError> {
        let scene_id = self.active_id()?;
        let scene = self
            .graph
            .scene_mut(&scene_id)
            .ok_or(EditorError::NoActiveScene)?;
        let kind = find_in_scene(scene, id, None)
            .map(|found| found.kind())
            .ok_or(OpsError::NotFound {
                kind: ObjectKind::Class,
                id: *id,
            })?;
        let delta = match kind {
            InstanceKind::Class => ops::delete_class_instance(scene, &ClassInstanceId::from(*id))?,
            InstanceKind::Relationclass => ops::delete_relationclass_instance(
                scene,
                &RelationclassInstanceId::from(*id),
                BendPoints::Delete,
            )?,
            InstanceKind::Port => ops::delete_port_instance(scene, &PortInstanceId::from(*id))?,
            InstanceKind::Scene => {
                return Err(OpsError::NotFound {
                    kind: ObjectKind::Class,
                    id: *id,
                }
                .into())
            }
        };

        let renderer = self.services.renderer.as_ref();
        forget_rendered(renderer, &delta);
        let updated: Vec<Uuid> = delta.updated.iter().map(|key| key.id).collect();
        redraw(renderer, scene, &updated);
        let deselected = self
            .machines
            .get_mut(&scene_id)
            .is_some_and(|machine| machine.forget_removed(renderer, &delta));
        if deselected {
            self.services
                .bus
                .publish(EditorEvent::SelectionChanged { instance: None });
        }
        self.services.bus.publish(EditorEvent::SceneListChanged);
        Ok(delta)
    }

    /// Asks the host to show the reference picker for a reference attribute.
    pub fn request_reference_edit(&self, id: &AttributeInstanceId) -> Result<(), EditorError> {
        let scene = self.active_scene().ok_or(EditorError::NoActiveScene)?;
        let attr = attribute_instance(scene, id)
            .ok_or_else(|| OpsError::not_found(ObjectKind::Attribute, id))?;
        let meta_attr = self
            .services
            .meta
            .meta_attribute(&attr.uuid_attribute)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Attribute, attr.uuid_attribute))?;
        if meta_attr.role().is_none() {
            return Err(OpsError::WrongAttributeKind {
                id: *id.as_uuid(),
                expected: "reference",
            }
            .into());
        }
        self.services.bus.publish(EditorEvent::OpenReferenceDialog {
            scene_type: scene.uuid_scene_type,
            attribute_instance: *id,
        });
        Ok(())
    }

    /// Binds a reference attribute and runs the algorithms watching it.
    pub fn set_reference(
        &mut self,
        id: &AttributeInstanceId,
        target: RoleTarget,
    ) -> Result<HybridReport, EditorError> {
        let scene_id = self.active_id()?;
        let scene = self
            .graph
            .scene_mut(&scene_id)
            .ok_or(EditorError::NoActiveScene)?;
        ops::set_reference(scene, self.services.meta.as_ref(), id, target)?;
        let report = run_hybrid(&self.dispatcher, scene, &self.services, Some(*id), &[], &[]);
        redraw(self.services.renderer.as_ref(), scene, &report.touched);
        self.services
            .bus
            .publish(EditorEvent::AttributePanelRefresh { update: true });
        Ok(report)
    }

    /// Pulls live transforms of tracking references from the renderer.
    pub fn sync_transforms(&mut self) -> Result<HybridReport, EditorError> {
        let scene_id = self.active_id()?;
        let scene = self
            .graph
            .scene_mut(&scene_id)
            .ok_or(EditorError::NoActiveScene)?;
        let report = run_hybrid(&self.dispatcher, scene, &self.services, None, &[], &[]);
        redraw_in_place(self.services.renderer.as_ref(), scene, &report.refreshed);
        if !report.touched.is_empty() {
            self.services
                .bus
                .publish(EditorEvent::AttributePanelRefresh { update: true });
        }
        Ok(report)
    }

    /// Clones the active scene with fresh ids and opens the copy.
    pub fn copy_active_scene(
        &mut self,
        name: impl Into<String>,
    ) -> Result<SceneInstanceId, EditorError> {
        let scene = self.active_scene().ok_or(EditorError::NoActiveScene)?;
        let (copy, _) = ops::copy_scene(scene, name);
        Ok(self.import_scene(copy).0)
    }

    pub fn validate_active(&self) -> Result<Vec<Issue>, EditorError> {
        let scene = self.active_scene().ok_or(EditorError::NoActiveScene)?;
        Ok(validate_scene(scene, self.services.meta.as_ref()))
    }
}

fn interaction_services<'a>(
    services: &'a Collaborators,
    config: &'a EditorConfig,
    scene: &'a mut SceneInstance,
) -> Services<'a> {
    Services {
        scene,
        meta: services.meta.as_ref(),
        evaluator: services.evaluator.as_ref(),
        renderer: services.renderer.as_ref(),
        bus: services.bus.as_ref(),
        simulation: services.simulation.as_ref(),
        config,
    }
}

fn run_hybrid(
    dispatcher: &HybridDispatcher,
    scene: &mut SceneInstance,
    services: &Collaborators,
    changed: Option<AttributeInstanceId>,
    classes: &[ClassInstanceId],
    ports: &[PortInstanceId],
) -> HybridReport {
    let mut cx = HybridContext::new(
        scene,
        services.meta.as_ref(),
        services.evaluator.as_ref(),
        services.renderer.as_ref(),
    )
    .with_changed(changed)
    .with_classes(classes)
    .with_ports(ports);
    dispatcher.check_hybrid_algorithms(&mut cx)
}

/// The class instances and ports a relation connects.
fn relation_ends(
    scene: &SceneInstance,
    relation: &RelationclassInstanceId,
) -> (Vec<ClassInstanceId>, Vec<PortInstanceId>) {
    let mut classes = Vec::new();
    let mut ports = Vec::new();
    let Some(instance) = scene.relationclasses_instances.get(relation) else {
        return (classes, ports);
    };
    let roles = std::iter::once(instance.role_instance_from).chain(instance.role_instance_to);
    for role in roles.filter_map(|id| scene.role_instances.get(&id)) {
        match role.target {
            RoleTarget::ClassInstance(id) => classes.push(id),
            RoleTarget::PortInstance(id) => ports.push(id),
            _ => {}
        }
    }
    (classes, ports)
}

fn world_position(scene: &SceneInstance, id: &Uuid) -> Option<Vec3> {
    match find_in_scene(scene, id, None)? {
        InstanceRef::Port(port) => endpoint_position(scene, &Endpoint::Port(port.uuid)),
        found => Some(found.transform().position),
    }
}

/// Draws the current representation of each instance at its world position.
fn redraw(renderer: &dyn SceneRenderer, scene: &SceneInstance, ids: &[Uuid]) {
    for id in ids {
        if let Some(at) = world_position(scene, id) {
            draw_representation(renderer, scene, id, at);
        }
    }
}

/// Swaps in the current representation without moving the rendered object.
fn redraw_in_place(renderer: &dyn SceneRenderer, scene: &SceneInstance, ids: &[Uuid]) {
    for id in ids {
        let Some(at) = renderer
            .find_object(id)
            .map(|object| object.transform.position)
            .or_else(|| world_position(scene, id))
        else {
            continue;
        };
        draw_representation(renderer, scene, id, at);
    }
}

fn draw_representation(renderer: &dyn SceneRenderer, scene: &SceneInstance, id: &Uuid, at: Vec3) {
    let visual = find_in_scene(scene, id, None)
        .and_then(|found| found.visual().representation.clone())
        .unwrap_or_default();
    renderer.draw_at(at, id, &visual);
}

fn rendered_ids(scene: &SceneInstance) -> Vec<Uuid> {
    let mut ids = vec![*scene.uuid.as_uuid()];
    ids.extend(scene.class_instances.keys().map(|id| *id.as_uuid()));
    ids.extend(
        scene
            .relationclasses_instances
            .keys()
            .map(|id| *id.as_uuid()),
    );
    ids.extend(port_instances(scene).map(|p| *p.uuid.as_uuid()));
    ids
}

fn draw_scene(renderer: &dyn SceneRenderer, scene: &SceneInstance) {
    redraw(renderer, scene, &rendered_ids(scene));
}
