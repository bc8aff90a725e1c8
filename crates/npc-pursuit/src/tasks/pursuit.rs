//! `PursuitTask` — the per-officer decision engine.
//!
//! # Per tick
//!
//! ```text
//! drain bus events about the suspect (some force an early decision)
//! every combat_scan_interval:  nearby_combat = hostile_within(..)
//! every decision_interval:
//!     sense  → DecisionInput
//!     decide → Decision { action, hint }
//!     same action as last time and its task still running?  → nothing
//!     otherwise translate the action into scheduler calls / world orders
//! ```
//!
//! The task lives in the main list; the action tasks it spawns go in the sub
//! list, so they run in the same tick right after it.  Whatever ends the
//! pursuit task (its own `NoLongerNeeded`, a stale suspect, an eviction)
//! clears the sub tasks and queues the officer's release.

use std::sync::Arc;

use tracing::{debug, trace};

use npc_core::geo::planar_distance;
use npc_core::{ActionPriority, AgentId, ControllerId, TravelMode};
use npc_task::{Task, TaskClass, TaskCore, TaskCx, TaskError, TaskResult, TimeoutSupervisor};
use npc_world::{native, PursuitEvent, Speech, Subscription, Topic, World};

use crate::tasks::{
    both_positions, ArrestTask, DragOutTask, EnterVehicleTask, FootChaseTask, NegotiateTask, SearchTask,
    TaseTask, VehicleChaseTask, ARREST, DRAG_OUT, ENTER_VEHICLE, FOOT_CHASE, NEGOTIATE, PURSUIT, SEARCH,
    TASE, VEHICLE_CHASE,
};
use crate::{
    decide, Action, Blackboard, ChaserStatus, Decision, DecisionInput, Release, Role, RoleGuard, SearchMode,
    TargetResources,
};

pub struct PursuitTask {
    core:       TaskCore,
    suspect:    AgentId,
    controller: ControllerId,
    priority:   ActionPriority,

    resources: Option<Arc<TargetResources>>,
    chasing:   Option<RoleGuard>,
    visual:    Option<RoleGuard>,
    events:    Option<Subscription>,

    decision:      TimeoutSupervisor,
    combat_scan:   TimeoutSupervisor,
    nearby_combat: bool,
    previous:      Action,
    released:      bool,
}

impl PursuitTask {
    /// Chase `suspect` on behalf of `controller`, which owns the officer at
    /// `priority`.
    pub fn new(suspect: AgentId, controller: ControllerId, priority: ActionPriority) -> Self {
        Self {
            core: TaskCore::new(PURSUIT, "pursuit"),
            suspect,
            controller,
            priority,
            resources: None,
            chasing: None,
            visual: None,
            events: None,
            decision: TimeoutSupervisor::disabled(),
            combat_scan: TimeoutSupervisor::disabled(),
            nearby_combat: false,
            previous: Action::Unknown,
            released: false,
        }
    }

    #[inline]
    pub fn suspect(&self) -> AgentId {
        self.suspect
    }

    #[inline]
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Action currently being carried out.
    #[inline]
    pub fn current_action(&self) -> Action {
        self.previous
    }

    // ── Events ────────────────────────────────────────────────────────────

    fn drain_events<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let Some(events) = &self.events else { return };
        for event in events.drain() {
            trace!(officer = %cx.agent, ?event, "pursuit event");
            match event {
                PursuitEvent::PedBeingArrested { .. }
                | PursuitEvent::PedArrested { .. }
                | PursuitEvent::PedSurrendered { .. } => self.decision.expire_now(),
                PursuitEvent::CriminalFleeing { position, .. } => {
                    if let Some(s) = cx.env.chaser_mut(cx.agent) {
                        s.last_known = position;
                    }
                    self.decision.expire_now();
                }
                PursuitEvent::VisualLost { .. } | PursuitEvent::VehicleRequested { .. } => {}
            }
        }
    }

    // ── Sensing ───────────────────────────────────────────────────────────

    fn sense<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<DecisionInput> {
        let agent = cx.agent;
        let suspect = self.suspect;
        let res = self.resources.clone().ok_or(TaskError::StaleReference("target resources"))?;
        let now = cx.now();
        let env = &mut *cx.env;
        let (me, there) = both_positions(&env.world, agent, suspect)?;
        let config = &env.config;

        let can_see = env.world.can_see(agent, suspect, config.vision_fov_deg, config.vision_range);
        match (can_see, self.visual.is_some()) {
            (true, false) => self.visual = Some(res.counters().acquire(Role::Visual, agent)),
            (false, true) => self.visual = None,
            _ => {}
        }
        let counts = res.counters().counts();
        let spotted = counts.visual > 0;

        let grace = env.ticks_for_ms(config.visual_lost_grace_ms);
        let mut status = env
            .chaser(agent)
            .cloned()
            .unwrap_or_else(|| ChaserStatus::new(suspect, self.controller, now, there));
        status.spotted = spotted;
        if spotted {
            status.last_seen = now;
            status.last_known = there;
        }
        let visual_lost = !spotted && now.since(status.last_seen) >= grace;
        let distance = planar_distance(me, status.last_known);

        let searching = res.counters().contains(Role::SearchingOnFoot, agent)
            || res.counters().contains(Role::SearchingInVehicle, agent);
        let is_last_tracker = !searching && counts.tracking() <= 1;

        let chasers_near_target = res
            .counters()
            .members(Role::Chasing)
            .into_iter()
            .filter(|&a| a != agent)
            .filter(|&a| env.world.position(a).is_some_and(|p| planar_distance(p, there) <= config.crowd_thin_radius))
            .count();
        let closest_taser_distance = res
            .counters()
            .members(Role::Tasing)
            .into_iter()
            .filter(|&a| a != agent)
            .filter_map(|a| env.world.position(a))
            .map(|p| planar_distance(p, there))
            .min_by(f32::total_cmp);

        let other_target_available = env.resources.pursued().any(|t| {
            t != suspect && env.world.is_alive(t) && !env.world.suspect_status(t).arrested
        });

        let agent_mode = env.world.travel_mode(agent);
        let vehicle_available = match agent_mode {
            TravelMode::OnFoot => env.free_vehicle_near(agent, &res),
            _ => None,
        };

        let input = DecisionInput {
            agent,
            agent_mode,
            own_priority: self.priority,

            target_mode:  env.world.travel_mode(suspect),
            target:       env.world.suspect_status(suspect),
            distance,
            target_speed: env.world.agent_vehicle_speed(suspect),

            other_target_available,
            damaged_by_target: env.world.damaged_by(agent, suspect),
            nearby_combat:     self.nearby_combat,

            sees_target: can_see,
            visual_lost,
            is_last_tracker,
            reached_last_known: distance <= config.last_known_reached_radius,

            at_roadblock: env.at_roadblock(agent),
            vehicle_available,

            asked_to_drop_weapon: status.asked_to_drop_weapon,

            counts,
            chasers_near_target,
            is_tasing: res.counters().contains(Role::Tasing, agent),
            closest_taser_distance,
        };
        env.set_chaser(agent, status);
        Ok(input)
    }

    // ── Acting ────────────────────────────────────────────────────────────

    /// Is the task or native behavior behind `action` still going?
    fn still_running<W: World>(action: Action, cx: &TaskCx<'_, Blackboard<W>>) -> bool {
        match action {
            Action::ChaseOnFoot | Action::RequestVehicle => cx.is_task_active(FOOT_CHASE),
            Action::ChaseInVehicle | Action::ChaseInHelicopter => cx.is_task_active(VEHICLE_CHASE),
            Action::Tase => cx.is_task_active(TASE),
            Action::Bust => cx.is_task_active(ARREST),
            Action::AskToDropWeapon | Action::NegotiateToDropWeapon => cx.is_task_active(NEGOTIATE),
            Action::DragOutOfVehicle => cx.is_task_active(DRAG_OUT),
            Action::GetIntoNewVehicle => cx.is_task_active(ENTER_VEHICLE),
            Action::LookForCriminal => cx.is_task_active(SEARCH),
            Action::Kill => cx.is_internal_task_active(native::COMBAT),
            Action::LeaveVehicle => cx.is_internal_task_active(native::LEAVE_VEHICLE),
            Action::WaitAtRoadblock => cx.is_internal_task_active(native::HOLD_POSITION),
            Action::NoLongerNeeded | Action::Unknown => true,
        }
    }

    fn replace_sub<W: World>(cx: &mut TaskCx<'_, Blackboard<W>>, task: Box<dyn Task<Blackboard<W>>>) {
        cx.clear_sub_tasks();
        cx.assign(task, TaskClass::Sub);
    }

    fn apply<W: World>(&mut self, decision: Decision, input: &DecisionInput, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let action = decision.action;
        if action == self.previous && Self::still_running(action, cx) {
            return;
        }
        debug!(
            officer = %cx.agent,
            suspect = %self.suspect,
            %action,
            previous = %self.previous,
            rule = decision.rule,
            "pursuit action"
        );
        self.previous = action;
        if let Some(s) = cx.env.chaser_mut(cx.agent) {
            s.action = action;
        }

        let Some(res) = self.resources.clone() else { return };
        let suspect = self.suspect;
        let agent = cx.agent;
        let config = cx.env.config.clone();
        let ticks = |ms: u64| cx.env.ticks_for_ms(ms);
        let (arrest_t, tase_t, drag_t, enter_t, place_t, speech_t) = (
            ticks(config.arrest_timeout_ms),
            ticks(config.tase_timeout_ms),
            ticks(config.drag_out_timeout_ms),
            ticks(config.enter_vehicle_timeout_ms),
            ticks(config.search_place_timeout_ms),
            ticks(config.negotiate_speech_interval_ms),
        );

        match action {
            Action::ChaseOnFoot => Self::replace_sub(cx, Box::new(FootChaseTask::new(suspect, res))),
            Action::ChaseInVehicle | Action::ChaseInHelicopter => {
                Self::replace_sub(cx, Box::new(VehicleChaseTask::new(suspect)))
            }
            Action::Tase => Self::replace_sub(cx, Box::new(TaseTask::new(suspect, res, tase_t))),
            Action::Bust => Self::replace_sub(cx, Box::new(ArrestTask::new(suspect, arrest_t))),
            Action::AskToDropWeapon | Action::NegotiateToDropWeapon => {
                Self::replace_sub(cx, Box::new(NegotiateTask::new(suspect, speech_t)))
            }
            Action::DragOutOfVehicle => Self::replace_sub(cx, Box::new(DragOutTask::new(suspect, drag_t))),
            Action::GetIntoNewVehicle => match decision.hint.vehicle {
                Some(v) => Self::replace_sub(cx, Box::new(EnterVehicleTask::new(v, res, enter_t))),
                None => Self::replace_sub(cx, Box::new(FootChaseTask::new(suspect, res))),
            },
            Action::LookForCriminal => {
                let mode = decision.hint.search_mode.unwrap_or(SearchMode::OnFoot);
                if input.is_last_tracker {
                    let last_known = cx.env.chaser(agent).map(|s| s.last_known);
                    if let Some(last_known) = last_known {
                        cx.env.world.say(agent, Speech::SuspectLost);
                        cx.env.publish(PursuitEvent::VisualLost { suspect, last_known });
                    }
                }
                let task = SearchTask::new(suspect, res, mode, decision.hint.vehicle, place_t);
                Self::replace_sub(cx, Box::new(task));
            }
            Action::Kill => {
                cx.clear_sub_tasks();
                cx.env.world.fight(agent, suspect);
            }
            Action::LeaveVehicle => {
                cx.clear_sub_tasks();
                cx.env.world.leave_vehicle(agent);
            }
            Action::WaitAtRoadblock => {
                cx.clear_sub_tasks();
                cx.env.world.hold_position(agent);
            }
            Action::RequestVehicle => {
                self.request_vehicle(cx);
                Self::replace_sub(cx, Box::new(FootChaseTask::new(suspect, res)));
            }
            Action::NoLongerNeeded => self.finish(cx, config.release_cooldown_ms),
            Action::Unknown => {}
        }
    }

    /// Radio for a car, at most once per cooldown.
    fn request_vehicle<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let agent = cx.agent;
        let now = cx.now();
        let cooldown = cx.env.ticks_for_ms(cx.env.config.request_vehicle_cooldown_ms);
        let Some(position) = cx.env.world.position(agent) else { return };
        let Some(status) = cx.env.chaser_mut(agent) else { return };
        if status.vehicle_requested_at.is_some_and(|t| now.since(t) < cooldown) {
            return;
        }
        status.vehicle_requested_at = Some(now);
        cx.env.world.say(agent, Speech::RequestVehicle);
        cx.env.publish(PursuitEvent::VehicleRequested { officer: agent, suspect: self.suspect, position });
    }

    /// Leave the pursuit: queue the release with a re-recruit cooldown, then
    /// retire this task (which clears the sub tasks).
    fn finish<W: World>(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>, cooldown_ms: u64) {
        let cooldown = if cooldown_ms == 0 { 0 } else { cx.env.ticks_for_ms(cooldown_ms) };
        cx.env.queue_release(Release { agent: cx.agent, controller: self.controller, cooldown });
        self.released = true;
        self.make_abortable(cx);
    }
}

impl<W: World> Task<Blackboard<W>> for PursuitTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_initialize(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let agent = cx.agent;
        let now = cx.now();
        let res = cx.env.resources.for_target(self.suspect);
        self.chasing = Some(res.counters().acquire(Role::Chasing, agent));
        self.resources = Some(res);
        self.events = Some(cx.env.bus.subscribe(Topic::Suspect(self.suspect)));

        let decision = cx.env.ticks_for_ms(cx.env.config.decision_interval_ms);
        let scan = cx.env.ticks_for_ms(cx.env.config.combat_scan_interval_ms);
        self.decision = TimeoutSupervisor::new(decision);
        self.decision.reset(now);
        self.decision.expire_now();
        self.combat_scan = TimeoutSupervisor::new(scan);
        self.combat_scan.reset(now);
        self.combat_scan.expire_now();

        let last_known = cx.env.world.position(self.suspect).unwrap_or_default();
        cx.env.set_chaser(agent, ChaserStatus::new(self.suspect, self.controller, now, last_known));
        debug!(officer = %agent, suspect = %self.suspect, controller = %self.controller, "pursuit joined");
    }

    fn on_process(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) -> TaskResult<()> {
        let agent = cx.agent;
        both_positions(&cx.env.world, agent, self.suspect)?;
        if !cx.env.world.is_alive(self.suspect) {
            self.finish(cx, 0);
            return Ok(());
        }
        self.drain_events(cx);

        let now = cx.now();
        if self.combat_scan.ready(now) {
            self.nearby_combat = cx.env.world.hostile_within(agent, cx.env.config.combat_scan_radius);
        }
        if !self.decision.ready(now) {
            return Ok(());
        }

        let input = self.sense(cx)?;
        let decision = decide(&input, &cx.env.config);
        self.apply(decision, &input, cx);
        Ok(())
    }

    fn on_abort(&mut self, cx: &mut TaskCx<'_, Blackboard<W>>) {
        let agent = cx.agent;
        cx.clear_sub_tasks();
        self.visual = None;
        self.chasing = None;
        self.events = None;
        cx.env.forget_chaser(agent);
        if !self.released {
            self.released = true;
            cx.env.queue_release(Release { agent, controller: self.controller, cooldown: 0 });
        }
        debug!(officer = %agent, suspect = %self.suspect, "pursuit left");
    }
}
