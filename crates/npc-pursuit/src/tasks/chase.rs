use std::sync::Arc;

use npc_core::geo::planar_distance;
use npc_core::{AgentId, TravelMode, VehicleId};
use npc_task::{Task, TaskCore, TaskCx, TaskResult};
use npc_world::{native, MoveStyle, Speech, World};

use crate::tasks::{both_positions, FOOT_CHASE, VEHICLE_CHASE};
use crate::{Blackboard, Role, RoleGuard, TargetResources};

// ── On foot ───────────────────────────────────────────────────────────────────

/// Run after the suspect: follow while somebody sees them, otherwise head
/// for the last known position.  Asks for surrender once, when close.
pub struct FootChaseTask {
    core:      TaskCore,
    suspect:   AgentId,
    resources: Arc<TargetResources>,
    on_foot:   Option<RoleGuard>,
}

impl FootChaseTask {
    pub fn new(suspect: AgentId, resources: Arc<TargetResources>) -> Self {
        Self {
            core: TaskCore::new(FOOT_CHASE, "foot_chase"),
            suspect,
            resources,
            on_foot: None,
        }
    }
}

impl<W: World> Task<Blackboard<W>> for FootChaseTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.on_foot = Some(self.resources.counters().acquire(Role::ChasingOnFoot, cx.agent));
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let (me, them) = both_positions(&cx.env.world, agent, self.suspect)?;
        if cx.env.world.vehicle_of(agent).is_some() {
            // The decision engine gets the officer out first.
            return Ok(());
        }

        let Some(status) = cx.env.chaser(agent).cloned() else { return Ok(()) };
        if status.spotted {
            if !cx.is_internal_task_active(native::FOLLOW) {
                cx.env.world.follow(agent, self.suspect, MoveStyle::Sprint);
            }
        } else if planar_distance(me, status.last_known) > cx.env.config.last_known_reached_radius
            && !cx.is_internal_task_active(native::GO_TO)
        {
            cx.env.world.go_to(agent, status.last_known, MoveStyle::Run);
        }

        let close = planar_distance(me, them) < cx.env.config.surrender_ask_distance;
        let suspect = cx.env.world.suspect_status(self.suspect);
        if status.spotted && close && !status.asked_to_surrender && !suspect.surrendering {
            cx.env.world.say(agent, Speech::Surrender);
            if let Some(s) = cx.env.chaser_mut(agent) {
                s.asked_to_surrender = true;
            }
        }
        Ok(())
    }

    fn on_abort(&mut self, _cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.on_foot = None;
    }
}

// ── In a vehicle ──────────────────────────────────────────────────────────────

/// Drive (or fly) after the suspect with the siren on.
pub struct VehicleChaseTask {
    core:    TaskCore,
    suspect: AgentId,
    siren:   Option<VehicleId>,
}

impl VehicleChaseTask {
    pub fn new(suspect: AgentId) -> Self {
        Self { core: TaskCore::new(VEHICLE_CHASE, "vehicle_chase"), suspect, siren: None }
    }
}

impl<W: World> Task<Blackboard<W>> for VehicleChaseTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let (me, _) = both_positions(&cx.env.world, agent, self.suspect)?;
        let Some(vehicle) = cx.env.world.vehicle_of(agent) else { return Ok(()) };

        if self.siren != Some(vehicle) {
            cx.env.world.set_siren(vehicle, true);
            self.siren = Some(vehicle);
        }
        let style = match cx.env.world.vehicle_kind(vehicle) {
            Some(TravelMode::Helicopter) => MoveStyle::Fly,
            _ => MoveStyle::DriveAggressive,
        };

        let Some(status) = cx.env.chaser(agent).cloned() else { return Ok(()) };
        if status.spotted {
            if !cx.is_internal_task_active(native::FOLLOW) {
                cx.env.world.follow(agent, self.suspect, style);
            }
        } else if planar_distance(me, status.last_known) > cx.env.config.last_known_reached_radius
            && !cx.is_internal_task_active(native::GO_TO)
        {
            cx.env.world.go_to(agent, status.last_known, style);
        }
        Ok(())
    }

    fn on_abort(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        if let Some(v) = self.siren.take() {
            cx.env.world.set_siren(v, false);
        }
    }
}
