//! Headless in-memory host.
//!
//! `SandboxWorld` implements every capability trait against plain hash maps.
//! It is the test double for the pursuit crates and the host for the demo
//! binary.  Every order is appended to a command log so tests can assert on
//! exactly what the core asked for.
//!
//! # Effects
//!
//! Entering, leaving and being dragged out of vehicles, teleports and taser
//! hits take effect immediately.  Movement orders (`go_to`, `follow`) and
//! cuffing progress only when the owner calls [`SandboxWorld::step`].  Field
//! of view is ignored: agents have no heading, so `can_see` is a range check
//! plus an explicit line-of-sight block list.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use npc_core::geo::distance;
use npc_core::{ActionPriority, AgentId, NativeTaskId, TravelMode, Vec3, VehicleId};

use crate::capability::{
    EntityQuery, MoveStyle, NativeTasks, Navigation, Perception, Presentation, Seat, Speech,
};
use crate::native;
use crate::{ArrestClaim, SuspectStatus, WorldError, WorldResult};

/// Distance at which a movement order counts as arrived.
const ARRIVAL_RADIUS: f32 = 1.0;

/// Everything the core asked the host to do, in call order.
#[derive(Clone, PartialEq, Debug)]
pub enum WorldCommand {
    GoTo { agent: AgentId, point: Vec3, style: MoveStyle },
    Follow { agent: AgentId, target: AgentId, style: MoveStyle },
    LeaveVehicle { agent: AgentId },
    EnterVehicle { agent: AgentId, vehicle: VehicleId, seat: Seat },
    Teleport { agent: AgentId, point: Vec3 },
    Wander { agent: AgentId },
    HoldPosition { agent: AgentId },
    AimAt { agent: AgentId, target: AgentId },
    Fight { agent: AgentId, target: AgentId },
    FireTaser { agent: AgentId, target: AgentId },
    Cuff { agent: AgentId, target: AgentId },
    DragOut { agent: AgentId, target: AgentId },
    Say { agent: AgentId, line: Speech },
    DrawText { agent: AgentId, text: String },
    Siren { vehicle: VehicleId, on: bool },
}

impl WorldCommand {
    /// The agent the command was issued for (`None` for vehicle effects).
    pub fn agent(&self) -> Option<AgentId> {
        match *self {
            WorldCommand::GoTo { agent, .. }
            | WorldCommand::Follow { agent, .. }
            | WorldCommand::LeaveVehicle { agent }
            | WorldCommand::EnterVehicle { agent, .. }
            | WorldCommand::Teleport { agent, .. }
            | WorldCommand::Wander { agent }
            | WorldCommand::HoldPosition { agent }
            | WorldCommand::AimAt { agent, .. }
            | WorldCommand::Fight { agent, .. }
            | WorldCommand::FireTaser { agent, .. }
            | WorldCommand::Cuff { agent, .. }
            | WorldCommand::DragOut { agent, .. }
            | WorldCommand::Say { agent, .. }
            | WorldCommand::DrawText { agent, .. } => Some(agent),
            WorldCommand::Siren { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Goal {
    Point(Vec3),
    Agent(AgentId),
}

#[derive(Clone, Debug)]
struct SandboxAgent {
    position: Vec3,
    alive:    bool,
    vehicle:  Option<VehicleId>,
    native:   Option<NativeTaskId>,
    goal:     Option<(Goal, MoveStyle)>,
    stuck:    bool,
    status:   SuspectStatus,
}

#[derive(Clone, Debug)]
struct SandboxVehicle {
    position:  Vec3,
    kind:      TravelMode,
    speed:     f32,
    occupants: Vec<AgentId>,
    siren:     bool,
}

/// In-memory implementation of [`World`](crate::World).
#[derive(Default)]
pub struct SandboxWorld {
    agents:       FxHashMap<AgentId, SandboxAgent>,
    vehicles:     FxHashMap<VehicleId, SandboxVehicle>,
    blocked_los:  FxHashSet<(AgentId, AgentId)>,
    damage:       FxHashSet<(AgentId, AgentId)>,
    blocked_area: Vec<(Vec3, f32)>,
    /// Priority recorded in the arrest claim when an officer starts cuffing.
    arrest_priority: ActionPriority,
    log:          Vec<WorldCommand>,
}

/// Metres per second for each movement style.
fn speed_of(style: MoveStyle) -> f32 {
    match style {
        MoveStyle::Walk            => 1.5,
        MoveStyle::Run             => 4.0,
        MoveStyle::Sprint          => 6.0,
        MoveStyle::Drive           => 14.0,
        MoveStyle::DriveAggressive => 22.0,
        MoveStyle::Fly             => 30.0,
    }
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            arrest_priority: ActionPriority::RequiredByScript,
            ..Self::default()
        }
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    pub fn add_agent(&mut self, id: AgentId, position: Vec3) -> WorldResult<()> {
        if self.agents.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        self.agents.insert(id, SandboxAgent {
            position,
            alive:   true,
            vehicle: None,
            native:  None,
            goal:    None,
            stuck:   false,
            status:  SuspectStatus::default(),
        });
        Ok(())
    }

    pub fn add_vehicle(&mut self, id: VehicleId, kind: TravelMode, position: Vec3) -> WorldResult<()> {
        if self.vehicles.contains_key(&id) {
            return Err(WorldError::DuplicateVehicle(id));
        }
        self.vehicles.insert(id, SandboxVehicle {
            position,
            kind,
            speed:     0.0,
            occupants: Vec::new(),
            siren:     false,
        });
        Ok(())
    }

    /// Seat `agent` in `vehicle` without logging a command.
    pub fn seat(&mut self, agent: AgentId, vehicle: VehicleId) -> WorldResult<()> {
        if !self.vehicles.contains_key(&vehicle) {
            return Err(WorldError::UnknownVehicle(vehicle));
        }
        if !self.agents.contains_key(&agent) {
            return Err(WorldError::UnknownAgent(agent));
        }
        self.board(agent, vehicle);
        Ok(())
    }

    /// Despawn an agent.  Later queries report it as non-existent.
    pub fn remove_agent(&mut self, id: AgentId) -> WorldResult<()> {
        self.unseat(id);
        self.agents.remove(&id).map(|_| ()).ok_or(WorldError::UnknownAgent(id))
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) -> WorldResult<()> {
        let vehicle = self.vehicles.remove(&id).ok_or(WorldError::UnknownVehicle(id))?;
        for occupant in vehicle.occupants {
            if let Some(a) = self.agents.get_mut(&occupant) {
                a.vehicle = None;
                a.position = vehicle.position;
            }
        }
        Ok(())
    }

    pub fn set_position(&mut self, id: AgentId, position: Vec3) -> WorldResult<()> {
        match self.agents.get(&id).and_then(|a| a.vehicle) {
            Some(v) => self.set_vehicle_position(v, position),
            None => {
                self.agent_mut(id)?.position = position;
                Ok(())
            }
        }
    }

    pub fn set_vehicle_position(&mut self, id: VehicleId, position: Vec3) -> WorldResult<()> {
        let vehicle = self.vehicles.get_mut(&id).ok_or(WorldError::UnknownVehicle(id))?;
        vehicle.position = position;
        for occupant in vehicle.occupants.clone() {
            if let Some(a) = self.agents.get_mut(&occupant) {
                a.position = position;
            }
        }
        Ok(())
    }

    pub fn set_vehicle_speed(&mut self, id: VehicleId, speed: f32) -> WorldResult<()> {
        self.vehicles.get_mut(&id).ok_or(WorldError::UnknownVehicle(id))?.speed = speed;
        Ok(())
    }

    pub fn set_alive(&mut self, id: AgentId, alive: bool) -> WorldResult<()> {
        self.agent_mut(id)?.alive = alive;
        Ok(())
    }

    pub fn set_stuck(&mut self, id: AgentId, stuck: bool) -> WorldResult<()> {
        self.agent_mut(id)?.stuck = stuck;
        Ok(())
    }

    pub fn set_status(&mut self, id: AgentId, status: SuspectStatus) -> WorldResult<()> {
        self.agent_mut(id)?.status = status;
        Ok(())
    }

    pub fn status_mut(&mut self, id: AgentId) -> WorldResult<&mut SuspectStatus> {
        Ok(&mut self.agent_mut(id)?.status)
    }

    /// Priority the sandbox records in arrest claims from now on.
    pub fn set_arrest_priority(&mut self, priority: ActionPriority) {
        self.arrest_priority = priority;
    }

    /// Pretend the host started a native behavior on its own.
    pub fn set_native_task(&mut self, id: AgentId, task: Option<NativeTaskId>) -> WorldResult<()> {
        self.agent_mut(id)?.native = task;
        Ok(())
    }

    /// Block `viewer`'s line of sight to `target` (one direction only).
    pub fn block_line_of_sight(&mut self, viewer: AgentId, target: AgentId) {
        self.blocked_los.insert((viewer, target));
    }

    pub fn restore_line_of_sight(&mut self, viewer: AgentId, target: AgentId) {
        self.blocked_los.remove(&(viewer, target));
    }

    pub fn record_damage(&mut self, victim: AgentId, attacker: AgentId) {
        self.damage.insert((victim, attacker));
    }

    pub fn clear_damage(&mut self) {
        self.damage.clear();
    }

    /// Mark a disc as non-navigable for every travel mode.
    pub fn block_area(&mut self, center: Vec3, radius: f32) {
        self.blocked_area.push((center, radius));
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn commands(&self) -> &[WorldCommand] {
        &self.log
    }

    /// Drain the command log.
    pub fn take_commands(&mut self) -> Vec<WorldCommand> {
        std::mem::take(&mut self.log)
    }

    /// Commands issued for `agent`, in order.
    pub fn commands_for(&self, agent: AgentId) -> impl Iterator<Item = &WorldCommand> {
        self.log.iter().filter(move |c| c.agent() == Some(agent))
    }

    pub fn native_task(&self, id: AgentId) -> Option<NativeTaskId> {
        self.agents.get(&id).and_then(|a| a.native)
    }

    pub fn siren(&self, id: VehicleId) -> bool {
        self.vehicles.get(&id).is_some_and(|v| v.siren)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance movement and cuffing by `dt_secs` of simulated time.
    pub fn step(&mut self, dt_secs: f32) {
        let mut ids: Vec<AgentId> = self.agents.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let Some(agent) = self.agents.get(&id) else { continue };
            if !agent.alive {
                continue;
            }
            let (running, goal, stuck, vehicle) = (agent.native, agent.goal, agent.stuck, agent.vehicle);

            // Cuffing, taser shots and drag-outs finish one step after they start.
            match running {
                Some(task) if task == native::CUFF => {
                    if let Some(suspect) = self.cuff_target(id) {
                        if let Some(s) = self.agents.get_mut(&suspect) {
                            s.status.arrested = true;
                            s.status.surrendering = false;
                        }
                    }
                    self.clear_native(id);
                    continue;
                }
                Some(task) if task == native::TASER || task == native::DRAG_OUT => {
                    self.clear_native(id);
                    continue;
                }
                _ => {}
            }

            let Some((goal, style)) = goal else { continue };
            if stuck {
                continue;
            }
            let dest = match goal {
                Goal::Point(p) => p,
                Goal::Agent(t) => match self.position(t) {
                    Some(p) => p,
                    None => {
                        self.clear_goal(id);
                        continue;
                    }
                },
            };
            let Some(from) = self.position(id) else { continue };
            let to_go = distance(from, dest);
            let step = speed_of(style) * dt_secs;

            let next = if to_go <= step.max(ARRIVAL_RADIUS) {
                dest
            } else {
                from + (dest - from) * (step / to_go)
            };
            let arrived = distance(next, dest) <= ARRIVAL_RADIUS;

            match vehicle {
                Some(v) => {
                    let _ = self.set_vehicle_position(v, next);
                    if let Some(veh) = self.vehicles.get_mut(&v) {
                        veh.speed = if dt_secs > 0.0 { distance(from, next) / dt_secs } else { 0.0 };
                    }
                }
                None => {
                    if let Some(a) = self.agents.get_mut(&id) {
                        a.position = next;
                    }
                }
            }

            if arrived && matches!(goal, Goal::Point(_)) {
                self.clear_goal(id);
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn agent_mut(&mut self, id: AgentId) -> WorldResult<&mut SandboxAgent> {
        self.agents.get_mut(&id).ok_or(WorldError::UnknownAgent(id))
    }

    fn record(&mut self, cmd: WorldCommand) {
        trace!(?cmd, "sandbox command");
        self.log.push(cmd);
    }

    /// Start a native behavior and (re)set the movement goal.  Returns
    /// `false` if the agent does not exist.
    fn order(&mut self, id: AgentId, task: NativeTaskId, goal: Option<(Goal, MoveStyle)>) -> bool {
        match self.agents.get_mut(&id) {
            Some(a) => {
                a.native = Some(task);
                a.goal = goal;
                true
            }
            None => false,
        }
    }

    fn clear_native(&mut self, id: AgentId) {
        if let Some(a) = self.agents.get_mut(&id) {
            a.native = None;
        }
    }

    fn clear_goal(&mut self, id: AgentId) {
        if let Some(a) = self.agents.get_mut(&id) {
            a.goal = None;
            if a.native == Some(native::GO_TO) || a.native == Some(native::FOLLOW) {
                a.native = None;
            }
        }
    }

    /// Suspect whose arrest claim names `officer`.
    fn cuff_target(&self, officer: AgentId) -> Option<AgentId> {
        let mut hits: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(_, a)| a.status.being_arrested.is_some_and(|c| c.officer == officer))
            .map(|(&id, _)| id)
            .collect();
        hits.sort_unstable();
        hits.first().copied()
    }

    fn board(&mut self, agent: AgentId, vehicle: VehicleId) {
        self.unseat(agent);
        let Some(v) = self.vehicles.get_mut(&vehicle) else { return };
        v.occupants.push(agent);
        let pos = v.position;
        if let Some(a) = self.agents.get_mut(&agent) {
            a.vehicle = Some(vehicle);
            a.position = pos;
        }
    }

    fn unseat(&mut self, agent: AgentId) {
        let Some(vehicle) = self.agents.get(&agent).and_then(|a| a.vehicle) else { return };
        let mut exit = None;
        if let Some(v) = self.vehicles.get_mut(&vehicle) {
            v.occupants.retain(|&o| o != agent);
            // Step out beside the door.
            exit = Some(v.position + Vec3::new(1.5, 0.0, 0.0));
        }
        if let Some(a) = self.agents.get_mut(&agent) {
            a.vehicle = None;
            if let Some(p) = exit {
                a.position = p;
            }
        }
    }
}

// ── Capability impls ──────────────────────────────────────────────────────────

impl EntityQuery for SandboxWorld {
    fn agent_exists(&self, agent: AgentId) -> bool {
        self.agents.contains_key(&agent)
    }

    fn is_alive(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).is_some_and(|a| a.alive)
    }

    fn position(&self, agent: AgentId) -> Option<Vec3> {
        let a = self.agents.get(&agent)?;
        match a.vehicle.and_then(|v| self.vehicles.get(&v)) {
            Some(v) => Some(v.position),
            None => Some(a.position),
        }
    }

    fn vehicle_of(&self, agent: AgentId) -> Option<VehicleId> {
        self.agents.get(&agent).and_then(|a| a.vehicle)
    }

    fn vehicle_exists(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains_key(&vehicle)
    }

    fn vehicle_position(&self, vehicle: VehicleId) -> Option<Vec3> {
        self.vehicles.get(&vehicle).map(|v| v.position)
    }

    fn vehicle_kind(&self, vehicle: VehicleId) -> Option<TravelMode> {
        self.vehicles.get(&vehicle).map(|v| v.kind)
    }

    fn vehicle_speed(&self, vehicle: VehicleId) -> f32 {
        self.vehicles.get(&vehicle).map_or(0.0, |v| v.speed)
    }

    fn suspect_status(&self, agent: AgentId) -> SuspectStatus {
        self.agents.get(&agent).map(|a| a.status).unwrap_or_default()
    }
}

impl Navigation for SandboxWorld {
    fn go_to(&mut self, agent: AgentId, point: Vec3, style: MoveStyle) {
        self.record(WorldCommand::GoTo { agent, point, style });
        self.order(agent, native::GO_TO, Some((Goal::Point(point), style)));
    }

    fn follow(&mut self, agent: AgentId, target: AgentId, style: MoveStyle) {
        self.record(WorldCommand::Follow { agent, target, style });
        self.order(agent, native::FOLLOW, Some((Goal::Agent(target), style)));
    }

    fn is_stuck(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).is_some_and(|a| a.stuck)
    }

    fn leave_vehicle(&mut self, agent: AgentId) {
        self.record(WorldCommand::LeaveVehicle { agent });
        if self.order(agent, native::LEAVE_VEHICLE, None) {
            self.unseat(agent);
            self.clear_native(agent);
        }
    }

    fn enter_vehicle(&mut self, agent: AgentId, vehicle: VehicleId, seat: Seat) {
        self.record(WorldCommand::EnterVehicle { agent, vehicle, seat });
        if self.order(agent, native::ENTER_VEHICLE, None) && self.vehicles.contains_key(&vehicle) {
            self.board(agent, vehicle);
            self.clear_native(agent);
        }
    }

    fn find_free_vehicles(&self, near: Vec3, radius: f32) -> Vec<VehicleId> {
        let mut found: Vec<(f32, VehicleId)> = self
            .vehicles
            .iter()
            .filter(|(_, v)| v.occupants.is_empty())
            .map(|(&id, v)| (distance(near, v.position), id))
            .filter(|&(d, _)| d <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, id)| id).collect()
    }

    fn nearest_navigable(&self, point: Vec3, _mode: TravelMode) -> Option<Vec3> {
        let blocked = self
            .blocked_area
            .iter()
            .any(|&(center, radius)| distance(center, point) < radius);
        (!blocked).then_some(point)
    }

    fn teleport(&mut self, agent: AgentId, point: Vec3) {
        self.record(WorldCommand::Teleport { agent, point });
        let _ = self.set_position(agent, point);
    }

    fn wander(&mut self, agent: AgentId) {
        self.record(WorldCommand::Wander { agent });
        self.order(agent, native::WANDER, None);
    }

    fn hold_position(&mut self, agent: AgentId) {
        self.record(WorldCommand::HoldPosition { agent });
        self.order(agent, native::HOLD_POSITION, None);
    }

    fn aim_at(&mut self, agent: AgentId, target: AgentId) {
        self.record(WorldCommand::AimAt { agent, target });
        self.order(agent, native::AIM, None);
    }

    fn fight(&mut self, agent: AgentId, target: AgentId) {
        self.record(WorldCommand::Fight { agent, target });
        self.order(agent, native::COMBAT, None);
    }

    fn fire_taser(&mut self, agent: AgentId, target: AgentId) {
        self.record(WorldCommand::FireTaser { agent, target });
        if self.order(agent, native::TASER, None) {
            if let Some(t) = self.agents.get_mut(&target) {
                t.status.surrendering = true;
                t.status.undecided = false;
                t.status.hostile = false;
                t.goal = None;
            }
        }
    }

    fn cuff(&mut self, agent: AgentId, target: AgentId) {
        self.record(WorldCommand::Cuff { agent, target });
        let priority = self.arrest_priority;
        if self.order(agent, native::CUFF, None) {
            if let Some(t) = self.agents.get_mut(&target) {
                t.status.being_arrested = Some(ArrestClaim { officer: agent, priority });
            }
        }
    }

    fn drag_out(&mut self, agent: AgentId, target: AgentId) {
        self.record(WorldCommand::DragOut { agent, target });
        if self.order(agent, native::DRAG_OUT, None) {
            self.unseat(target);
        }
    }
}

impl Perception for SandboxWorld {
    fn can_see(&self, agent: AgentId, target: AgentId, _fov_deg: f32, range: f32) -> bool {
        if !self.is_alive(agent) || self.blocked_los.contains(&(agent, target)) {
            return false;
        }
        match (self.position(agent), self.position(target)) {
            (Some(a), Some(t)) => distance(a, t) <= range,
            _ => false,
        }
    }

    fn damaged_by(&self, agent: AgentId, attacker: AgentId) -> bool {
        self.damage.contains(&(agent, attacker))
    }

    fn hostile_within(&self, agent: AgentId, radius: f32) -> bool {
        let Some(origin) = self.position(agent) else { return false };
        self.agents.iter().any(|(&id, a)| {
            id != agent
                && a.alive
                && a.status.hostile
                && self.position(id).is_some_and(|p| distance(origin, p) <= radius)
        })
    }
}

impl NativeTasks for SandboxWorld {
    fn is_native_task_running(&self, agent: AgentId, task: NativeTaskId) -> bool {
        self.native_task(agent) == Some(task)
    }
}

impl Presentation for SandboxWorld {
    fn say(&mut self, agent: AgentId, line: Speech) {
        self.record(WorldCommand::Say { agent, line });
    }

    fn draw_text(&mut self, agent: AgentId, text: &str) {
        self.record(WorldCommand::DrawText { agent, text: text.to_owned() });
    }

    fn set_siren(&mut self, vehicle: VehicleId, on: bool) {
        self.record(WorldCommand::Siren { vehicle, on });
        if let Some(v) = self.vehicles.get_mut(&vehicle) {
            v.siren = on;
        }
    }
}
