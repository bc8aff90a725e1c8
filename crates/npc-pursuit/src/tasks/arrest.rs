//! Close-quarters tasks: taser, cuffs, talking a weapon down, pulling the
//! suspect out of a car.

use std::sync::Arc;

use tracing::{debug, info};

use npc_core::geo::planar_distance;
use npc_core::{AgentId, Vec3};
use npc_task::{Task, TaskCore, TaskCx, TaskResult, TimeoutSupervisor};
use npc_world::{native, MoveStyle, PursuitEvent, Speech, World};

use crate::tasks::{both_positions, ARREST, DRAG_OUT, NEGOTIATE, TASE};
use crate::{Blackboard, Role, RoleGuard, TargetResources};

// ── Tase ──────────────────────────────────────────────────────────────────────

/// Close to taser range and fire.  Done once the suspect gives up.
pub struct TaseTask {
    core:      TaskCore,
    suspect:   AgentId,
    resources: Arc<TargetResources>,
    tasing:    Option<RoleGuard>,
    fired:     bool,
}

impl TaseTask {
    pub fn new(suspect: AgentId, resources: Arc<TargetResources>, timeout_ticks: u64) -> Self {
        Self {
            core: TaskCore::new(TASE, "tase").with_timeout(TimeoutSupervisor::new(timeout_ticks)),
            suspect,
            resources,
            tasing: None,
            fired: false,
        }
    }
}

impl<W: World> Task<Blackboard<W>> for TaseTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.tasing = Some(self.resources.counters().acquire(Role::Tasing, cx.agent));
        cx.env.world.say(cx.agent, Speech::TaserWarning);
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let (me, them) = both_positions(&cx.env.world, agent, self.suspect)?;

        if self.fired {
            if cx.is_internal_task_active(native::TASER) {
                return Ok(());
            }
            if cx.env.world.suspect_status(self.suspect).surrendering {
                cx.env.publish(PursuitEvent::PedSurrendered { suspect: self.suspect });
                self.make_abortable(cx);
                return Ok(());
            }
            // Missed or shrugged it off.
            self.fired = false;
        }

        if planar_distance(me, them) > cx.env.config.taser_range {
            if !cx.is_internal_task_active(native::FOLLOW) {
                cx.env.world.follow(agent, self.suspect, MoveStyle::Run);
            }
            return Ok(());
        }
        cx.env.world.fire_taser(agent, self.suspect);
        self.fired = true;
        Ok(())
    }

    fn on_abort(&mut self, _cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.tasing = None;
    }
}

// ── Arrest ────────────────────────────────────────────────────────────────────

/// Walk up to a compliant suspect and cuff them.  On timeout the officer is
/// put next to the suspect so the next attempt can start cuffing at once.
pub struct ArrestTask {
    core:     TaskCore,
    suspect:  AgentId,
    cuffing:  bool,
    reported: bool,
}

impl ArrestTask {
    pub fn new(suspect: AgentId, timeout_ticks: u64) -> Self {
        Self {
            core: TaskCore::new(ARREST, "arrest").with_timeout(TimeoutSupervisor::new(timeout_ticks)),
            suspect,
            cuffing: false,
            reported: false,
        }
    }
}

impl<W: World> Task<Blackboard<W>> for ArrestTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let (me, them) = both_positions(&cx.env.world, agent, self.suspect)?;
        let status = cx.env.world.suspect_status(self.suspect);

        if status.arrested {
            if !self.reported && status.being_arrested.is_some_and(|c| c.officer == agent) {
                info!(officer = %agent, suspect = %self.suspect, "suspect arrested");
                cx.env.publish(PursuitEvent::PedArrested { suspect: self.suspect, officer: agent });
                self.reported = true;
            }
            self.make_abortable(cx);
            return Ok(());
        }
        if self.cuffing {
            if cx.is_internal_task_active(native::CUFF) {
                return Ok(());
            }
            // Interrupted before the cuffs closed.
            self.cuffing = false;
        }

        if planar_distance(me, them) > cx.env.config.cuff_contact_distance {
            if !cx.is_internal_task_active(native::FOLLOW) {
                cx.env.world.follow(agent, self.suspect, MoveStyle::Walk);
            }
            return Ok(());
        }
        cx.env.world.say(agent, Speech::Cuffing);
        cx.env.world.cuff(agent, self.suspect);
        cx.env.publish(PursuitEvent::PedBeingArrested { suspect: self.suspect, officer: agent });
        self.cuffing = true;
        Ok(())
    }

    fn on_timeout(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let Some(there) = cx.env.world.position(self.suspect) else { return };
        let beside = there + Vec3::new(cx.env.config.cuff_contact_distance * 0.5, 0.0, 0.0);
        debug!(officer = %cx.agent, suspect = %self.suspect, "arrest stalled; teleporting next to suspect");
        cx.env.world.teleport(cx.agent, beside);
    }
}

// ── Negotiate ─────────────────────────────────────────────────────────────────

/// Hold the suspect at gunpoint and repeat the drop-weapon line.
pub struct NegotiateTask {
    core:    TaskCore,
    suspect: AgentId,
    speech:  TimeoutSupervisor,
}

impl NegotiateTask {
    pub fn new(suspect: AgentId, speech_interval_ticks: u64) -> Self {
        Self {
            core: TaskCore::new(NEGOTIATE, "negotiate"),
            suspect,
            speech: TimeoutSupervisor::new(speech_interval_ticks),
        }
    }
}

impl<W: World> Task<Blackboard<W>> for NegotiateTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        self.speech.reset(cx.now());
        self.speech.expire_now();
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        both_positions(&cx.env.world, agent, self.suspect)?;

        if !cx.is_internal_task_active(native::AIM) {
            cx.env.world.aim_at(agent, self.suspect);
        }
        if !self.speech.ready(cx.now()) {
            return Ok(());
        }
        let asked = cx.env.chaser(agent).is_some_and(|s| s.asked_to_drop_weapon);
        let line = if asked { Speech::NegotiateWeapon } else { Speech::DropWeapon };
        cx.env.world.say(agent, line);
        if let Some(s) = cx.env.chaser_mut(agent) {
            s.asked_to_drop_weapon = true;
        }
        Ok(())
    }
}

// ── Drag out ──────────────────────────────────────────────────────────────────

/// Get to the suspect's stopped vehicle and pull them out.
pub struct DragOutTask {
    core:    TaskCore,
    suspect: AgentId,
}

impl DragOutTask {
    pub fn new(suspect: AgentId, timeout_ticks: u64) -> Self {
        Self {
            core: TaskCore::new(DRAG_OUT, "drag_out").with_timeout(TimeoutSupervisor::new(timeout_ticks)),
            suspect,
        }
    }
}

impl<W: World> Task<Blackboard<W>> for DragOutTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        let (me, them) = both_positions(&cx.env.world, agent, self.suspect)?;

        if cx.env.world.vehicle_of(self.suspect).is_none() {
            self.make_abortable(cx);
            return Ok(());
        }
        if cx.is_internal_task_active(native::DRAG_OUT) {
            return Ok(());
        }
        if planar_distance(me, them) > cx.env.config.cuff_contact_distance * 2.0 {
            if !cx.is_internal_task_active(native::GO_TO) {
                cx.env.world.go_to(agent, them, MoveStyle::Run);
            }
            return Ok(());
        }
        cx.env.world.drag_out(agent, self.suspect);
        Ok(())
    }
}
