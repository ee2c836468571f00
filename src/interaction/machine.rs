// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Instant;

use log::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    ActiveLine, Button, CurrentInstance, Hit, HitTarget, InteractionError, InteractionSession,
    LineState, Mode, Outcome, PointerEvent, Services,
};
use crate::host::{EditorEvent, SceneRenderer, TransformMode};
use crate::model::{
    ClassId, ClassInstanceId, ClassInstanceKind, Endpoint, LinePoint, PortInstanceId,
    RelationclassId, RelationclassInstanceId, RoleDirection, SceneInstance, Vec3,
};
use crate::ops::{
    self, check_end_point, check_start_point, BendPoints, Candidate, Delta, MetaKind, ObjectKind,
    OpsError,
};
use crate::query::lookup::{endpoint_position, find_in_scene, port_instance};
use crate::reactive::{refresh_visual, VizError};

#[derive(Debug, Default)]
pub struct InteractionMachine {
    mode: Mode,
    session: InteractionSession,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    pub fn current(&self) -> Option<CurrentInstance> {
        self.session.current
    }

    pub fn active_line(&self) -> Option<ActiveLine> {
        self.session.active_line
    }

    /// Switches modes. A relation still being drawn is discarded and the selection cleared.
    pub fn set_mode(&mut self, services: &mut Services<'_>, mode: Mode) {
        self.abandon(services);
        debug!(from:? = self.mode, to:? = mode; "mode changed");
        self.mode = mode;
    }

    /// Drops the selection and the active line if a deletion removed them.
    ///
    /// Returns `true` when the selection was cleared.
    pub fn forget_removed(&mut self, renderer: &dyn SceneRenderer, delta: &Delta) -> bool {
        let removed = |id: &Uuid| delta.removed.iter().any(|key| &key.id == id);
        if self
            .session
            .active_line
            .is_some_and(|line| removed(line.relation.as_uuid()))
        {
            self.session.active_line = None;
        }
        match self.session.current {
            Some(current) if removed(current.uuid()) => {
                self.session.current = None;
                renderer.detach_transform();
                true
            }
            _ => false,
        }
    }

    /// Retires a finished line whose grace delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<RelationclassInstanceId> {
        match self.session.active_line {
            Some(ActiveLine {
                relation,
                state: LineState::Finalizing { retire_at },
            }) if now >= retire_at => {
                self.session.active_line = None;
                debug!(relation:% = relation; "active line retired");
                Some(relation)
            }
            _ => None,
        }
    }

    /// Moves the trailing cursor point of the line being drawn.
    pub fn pointer_moved(&mut self, scene: &mut SceneInstance, point: Vec3) -> bool {
        let Some(ActiveLine {
            relation,
            state: LineState::Drawing,
        }) = self.session.active_line
        else {
            return false;
        };
        let Some(instance) = scene.relationclasses_instances.get_mut(&relation) else {
            return false;
        };
        match instance.line_points.last_mut() {
            Some(LinePoint::Cursor { position }) => {
                *position = point;
                true
            }
            _ => false,
        }
    }

    /// Handles one pointer-down.
    ///
    /// Failures never escape: they are logged, reported on the bus, and the machine falls back
    /// to [`Mode::View`].
    pub fn handle(&mut self, services: &mut Services<'_>, event: &PointerEvent) -> Outcome {
        self.poll(event.at);
        let result = match self.mode {
            Mode::View => self.on_view(services, event),
            Mode::Select => self.on_select(services, event),
            Mode::DrawClass(class) => self.on_draw_class(services, event, &class),
            Mode::DrawRelation(relationclass) => {
                self.on_draw_relation(services, event, &relationclass)
            }
            Mode::Simulate => self.on_simulate(services, event),
        };
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(mode:? = self.mode, error:% = err; "pointer event failed");
                services.bus.publish(EditorEvent::UserNotice {
                    message: err.to_string(),
                });
                self.abandon(services);
                self.mode = Mode::View;
                Outcome::Failed(err)
            }
        }
    }

    fn abandon(&mut self, services: &mut Services<'_>) {
        if let Some(line) = self.session.active_line.take() {
            if line.state == LineState::Drawing {
                if let Err(err) = discard_relation(services, &line.relation) {
                    warn!(relation:% = line.relation, error:% = err; "could not discard line");
                }
            }
        }
        self.deselect(services);
    }

    fn on_view(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
    ) -> Result<Outcome, InteractionError> {
        if event.button != Button::Primary {
            return Ok(Outcome::Ignored);
        }
        match event.hits.first().and_then(|hit| selectable(&hit.target)) {
            Some(current) => {
                let outcome = self.select(services, current, event.button)?;
                self.mode = Mode::Select;
                Ok(outcome)
            }
            None => Ok(Outcome::Ignored),
        }
    }

    fn on_select(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
    ) -> Result<Outcome, InteractionError> {
        match event.hits.first().and_then(|hit| selectable(&hit.target)) {
            Some(current) => self.select(services, current, event.button),
            None => {
                self.deselect(services);
                self.mode = Mode::View;
                Ok(Outcome::Deselected)
            }
        }
    }

    fn select(
        &mut self,
        services: &mut Services<'_>,
        current: CurrentInstance,
        button: Button,
    ) -> Result<Outcome, InteractionError> {
        let transform = match button {
            Button::Primary => TransformMode::Translate,
            Button::Auxiliary if services.config.three_d => TransformMode::Rotate,
            Button::Auxiliary => return Ok(Outcome::Ignored),
            Button::Secondary => TransformMode::Scale,
        };
        let id = *current.uuid();
        if find_in_scene(services.scene, &id, None).is_none() {
            return Err(OpsError::NotFound {
                kind: current_kind(&current),
                id,
            }
            .into());
        }

        if self.session.current.is_some() {
            services.renderer.detach_transform();
        }
        services.renderer.attach_transform(&id, transform);
        self.session.current = Some(current);
        services.bus.publish(EditorEvent::SelectionChanged { instance: Some(id) });
        services
            .bus
            .publish(EditorEvent::AttributePanelRefresh { update: true });
        debug!(instance:% = id, transform:? = transform; "instance selected");
        Ok(Outcome::Selected(current))
    }

    fn deselect(&mut self, services: &mut Services<'_>) {
        if self.session.current.take().is_some() {
            services.renderer.detach_transform();
            services
                .bus
                .publish(EditorEvent::SelectionChanged { instance: None });
        }
    }

    fn on_draw_class(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
        class: &ClassId,
    ) -> Result<Outcome, InteractionError> {
        if event.button != Button::Primary {
            return Ok(Outcome::Ignored);
        }
        let Some(Hit {
            target: HitTarget::Plane,
            point,
        }) = event.hits.first()
        else {
            return Ok(Outcome::Ignored);
        };
        let position = point.rounded(services.config.placement_step);
        let id = ops::create_class_instance(
            services.scene,
            services.meta,
            class,
            position,
            ClassInstanceKind::Regular,
        )?;
        materialize_class(services, &id)?;
        services.bus.publish(EditorEvent::SceneListChanged);
        Ok(Outcome::ClassPlaced(id))
    }

    fn on_draw_relation(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
        relationclass: &RelationclassId,
    ) -> Result<Outcome, InteractionError> {
        match (event.button, self.session.active_line) {
            (
                _,
                Some(ActiveLine {
                    state: LineState::Finalizing { .. },
                    ..
                }),
            ) => Ok(Outcome::Ignored),
            (Button::Secondary, Some(line)) => {
                self.session.active_line = None;
                discard_relation(services, &line.relation)?;
                Ok(Outcome::RelationDiscarded(line.relation))
            }
            (Button::Secondary, None) => {
                self.mode = Mode::View;
                Ok(Outcome::ModeChanged(Mode::View))
            }
            (Button::Auxiliary, _) => Ok(Outcome::Ignored),
            (Button::Primary, None) => self.start_line(services, event, relationclass),
            (Button::Primary, Some(line)) => {
                self.extend_line(services, event, relationclass, line.relation)
            }
        }
    }

    fn start_line(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
        relationclass: &RelationclassId,
    ) -> Result<Outcome, InteractionError> {
        let Some(hit) = endpoint_hit(&event.hits) else {
            return Ok(Outcome::Ignored);
        };
        let meta = services.meta;
        let rc = meta
            .meta_relationclass(relationclass)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Relationclass, relationclass))?;

        let picked = pick(services.scene, &hit.target)?;
        let endpoint = picked.endpoint;
        if !check_start_point(rc, picked.candidate) {
            return Ok(reject(services, RoleDirection::From, *relationclass));
        }

        let start = anchor_position(
            services.scene,
            endpoint.as_ref(),
            hit.point,
            services.config.placement_step,
        );
        let relation =
            ops::create_relation_instance(services.scene, meta, relationclass, start, endpoint)?;
        self.session.active_line = Some(ActiveLine {
            relation,
            state: LineState::Drawing,
        });
        materialize(services, relation.as_uuid(), start)?;
        Ok(Outcome::RelationStarted(relation))
    }

    fn extend_line(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
        relationclass: &RelationclassId,
        relation: RelationclassInstanceId,
    ) -> Result<Outcome, InteractionError> {
        let Some(hit) = endpoint_hit(&event.hits) else {
            return Ok(Outcome::Ignored);
        };
        let meta = services.meta;
        let step = services.config.placement_step;

        if hit.target == HitTarget::Plane {
            let at = hit.point.rounded(step);
            let bend = match ops::add_bendpoint(services.scene, meta, &relation, at) {
                Ok(bend) => bend,
                Err(OpsError::MissingBendpointClass { relationclass }) => {
                    warn!(relationclass:% = relationclass; "relationclass takes no bend points");
                    return Ok(Outcome::Ignored);
                }
                Err(err) => return Err(err.into()),
            };
            materialize(services, bend.as_uuid(), at)?;
            return Ok(Outcome::BendpointAdded(bend));
        }

        let rc = meta
            .meta_relationclass(relationclass)
            .ok_or_else(|| OpsError::meta_not_found(MetaKind::Relationclass, relationclass))?;
        let picked = pick(services.scene, &hit.target)?;
        let endpoint = picked.endpoint;
        if !check_end_point(rc, picked.candidate) {
            return Ok(reject(services, RoleDirection::To, *relationclass));
        }

        let end = anchor_position(services.scene, endpoint.as_ref(), hit.point, step);
        ops::finish_relation(services.scene, meta, &relation, end, endpoint)?;
        let origin = services
            .scene
            .relationclasses_instances
            .get(&relation)
            .map(|r| r.transform.position)
            .unwrap_or(end);
        materialize(services, relation.as_uuid(), origin)?;
        let retire_at = event
            .at
            .checked_add(services.config.finalize_grace())
            .unwrap_or_else(|| {
                warn!(
                    grace_ms = services.config.finalize_grace_ms;
                    "finalize grace out of range, retiring the line at once"
                );
                event.at
            });
        self.session.active_line = Some(ActiveLine {
            relation,
            state: LineState::Finalizing { retire_at },
        });
        Ok(Outcome::RelationFinished(relation))
    }

    fn on_simulate(
        &mut self,
        services: &mut Services<'_>,
        event: &PointerEvent,
    ) -> Result<Outcome, InteractionError> {
        if event.button != Button::Primary {
            return Ok(Outcome::Ignored);
        }
        let Some(Hit {
            target: HitTarget::Button { owner, formula },
            ..
        }) = event.hits.first()
        else {
            return Ok(Outcome::Ignored);
        };
        let context = find_in_scene(services.scene, owner, None)
            .map(|found| *found.uuid())
            .ok_or(OpsError::NotFound {
                kind: ObjectKind::Class,
                id: *owner,
            })?;

        match services.simulation.run(formula, &context) {
            Ok(()) => info!(context:% = context; "simulation dispatched"),
            Err(message) => {
                warn!(context:% = context, message = message.as_str(); "simulation failed");
                services.bus.publish(EditorEvent::UserNotice { message });
            }
        }
        Ok(Outcome::Simulated { context })
    }
}

fn selectable(target: &HitTarget) -> Option<CurrentInstance> {
    match target {
        HitTarget::Class(id) => Some(CurrentInstance::Class(*id)),
        HitTarget::Port(id) => Some(CurrentInstance::Port(*id)),
        HitTarget::Relationclass(id) => Some(CurrentInstance::Relationclass(*id)),
        HitTarget::Button { .. } | HitTarget::Plane => None,
    }
}

fn current_kind(current: &CurrentInstance) -> ObjectKind {
    match current {
        CurrentInstance::Class(_) => ObjectKind::Class,
        CurrentInstance::Relationclass(_) => ObjectKind::Relationclass,
        CurrentInstance::Port(_) => ObjectKind::Port,
    }
}

/// The first hit, looking past one leading relation (usually the line under the cursor).
fn endpoint_hit(hits: &[Hit]) -> Option<&Hit> {
    match hits {
        [Hit {
            target: HitTarget::Relationclass(_),
            ..
        }, rest @ ..] => rest.first(),
        _ => hits.first(),
    }
}

struct Pick<'s> {
    candidate: Candidate<'s>,
    endpoint: Option<Endpoint>,
}

fn pick<'s>(scene: &'s SceneInstance, target: &HitTarget) -> Result<Pick<'s>, OpsError> {
    Ok(match target {
        HitTarget::Class(id) => {
            let class = scene
                .class_instances
                .get(id)
                .ok_or_else(|| OpsError::not_found(ObjectKind::Class, id))?;
            Pick {
                candidate: Candidate::Class(class),
                endpoint: Some(Endpoint::Class(*id)),
            }
        }
        HitTarget::Port(id) => {
            let port =
                port_instance(scene, id).ok_or_else(|| OpsError::not_found(ObjectKind::Port, id))?;
            Pick {
                candidate: Candidate::Port(port),
                endpoint: Some(Endpoint::Port(*id)),
            }
        }
        HitTarget::Plane => Pick {
            candidate: Candidate::Scene(scene),
            endpoint: None,
        },
        HitTarget::Relationclass(_) | HitTarget::Button { .. } => Pick {
            candidate: Candidate::None,
            endpoint: None,
        },
    })
}

fn anchor_position(
    scene: &SceneInstance,
    endpoint: Option<&Endpoint>,
    point: Vec3,
    step: f64,
) -> Vec3 {
    endpoint
        .and_then(|endpoint| endpoint_position(scene, endpoint))
        .unwrap_or_else(|| point.rounded(step))
}

fn reject(services: &Services<'_>, role: RoleDirection, relationclass: RelationclassId) -> Outcome {
    let err = OpsError::InvalidEndpoint {
        role,
        relationclass,
    };
    warn!(relationclass:% = relationclass, role:? = role; "endpoint rejected");
    services.bus.publish(EditorEvent::UserNotice {
        message: err.to_string(),
    });
    Outcome::Rejected(err)
}

/// Evaluates the visual of `id` and asks the renderer to draw it at `point`.
///
/// A broken formula only costs this instance its representation.
fn materialize(
    services: &mut Services<'_>,
    id: &Uuid,
    point: Vec3,
) -> Result<(), InteractionError> {
    match refresh_visual(services.scene, services.meta, services.evaluator, id) {
        Ok(()) => {}
        Err(VizError::Formula { instance, source }) => {
            error!(instance:% = instance, error:% = source; "visual formula failed");
        }
        Err(err) => return Err(err.into()),
    }
    let visual = find_in_scene(services.scene, id, None)
        .and_then(|found| found.visual().representation.clone())
        .unwrap_or_default();
    services.renderer.draw_at(point, id, &visual);
    Ok(())
}

fn materialize_class(
    services: &mut Services<'_>,
    id: &ClassInstanceId,
) -> Result<(), InteractionError> {
    let class = services
        .scene
        .class_instances
        .get(id)
        .ok_or_else(|| OpsError::not_found(ObjectKind::Class, id))?;
    let position = class.position();
    let ports: Vec<(PortInstanceId, Vec3)> = class
        .port_instances
        .iter()
        .map(|port| (port.uuid, position + port.offset))
        .collect();

    materialize(services, id.as_uuid(), position)?;
    for (port, at) in ports {
        materialize(services, port.as_uuid(), at)?;
    }
    Ok(())
}

fn discard_relation(
    services: &mut Services<'_>,
    relation: &RelationclassInstanceId,
) -> Result<(), OpsError> {
    let delta = ops::delete_relationclass_instance(services.scene, relation, BendPoints::Delete)?;
    forget_rendered(services.renderer, &delta);
    info!(relation:% = relation, removed = delta.removed.len(); "line discarded");
    Ok(())
}

/// Removes the rendered objects of every instance a deletion removed.
pub(crate) fn forget_rendered(renderer: &dyn SceneRenderer, delta: &Delta) {
    for kind in [ObjectKind::Class, ObjectKind::Relationclass, ObjectKind::Port] {
        for id in delta.removed_of(kind) {
            renderer.remove_object(id);
        }
    }
}
