//! Capabilities the host simulation provides to the pursuit core.
//!
//! Each trait is a narrow slice of the host: tasks that only need to look at
//! the world take `&impl EntityQuery`, tasks that issue orders take
//! `&mut impl Navigation`, and so on.  [`World`] is the blanket union the
//! scheduler environment carries.
//!
//! Commands are fire-and-forget.  A command for an entity that no longer
//! exists is dropped by the host; callers learn about it through the
//! existence queries on their next tick.

use npc_core::{AgentId, NativeTaskId, TravelMode, Vec3, VehicleId};

use crate::SuspectStatus;

// ── Value types ───────────────────────────────────────────────────────────────

/// How fast and how carefully an agent should move.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveStyle {
    Walk,
    Run,
    Sprint,
    /// Normal driving, obeying traffic where possible.
    Drive,
    /// Pursuit driving: sirens, ignores lights, rams if needed.
    DriveAggressive,
    Fly,
}

/// Seat to take when entering a vehicle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Seat {
    Driver,
    Passenger(u8),
}

/// Canned speech lines the core can ask the host to play.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Speech {
    DropWeapon,
    NegotiateWeapon,
    Surrender,
    TaserWarning,
    Cuffing,
    RequestVehicle,
    SuspectLost,
}

// ── Queries ───────────────────────────────────────────────────────────────────

/// Read-only facts about agents and vehicles.
pub trait EntityQuery {
    /// `true` while the agent handle refers to a live entity in the host.
    fn agent_exists(&self, agent: AgentId) -> bool;

    /// `true` if the agent exists and is not dead or incapacitated.
    fn is_alive(&self, agent: AgentId) -> bool;

    fn position(&self, agent: AgentId) -> Option<Vec3>;

    /// Vehicle the agent is sitting in, if any.
    fn vehicle_of(&self, agent: AgentId) -> Option<VehicleId>;

    fn vehicle_exists(&self, vehicle: VehicleId) -> bool;

    fn vehicle_position(&self, vehicle: VehicleId) -> Option<Vec3>;

    /// `Car` or `Helicopter`; `None` if the vehicle does not exist.
    fn vehicle_kind(&self, vehicle: VehicleId) -> Option<TravelMode>;

    /// Current speed in metres per second (0 if unknown).
    fn vehicle_speed(&self, vehicle: VehicleId) -> f32;

    /// Pursuit-relevant status of a (potential) suspect.
    fn suspect_status(&self, agent: AgentId) -> SuspectStatus;

    /// How the agent is currently getting around.
    fn travel_mode(&self, agent: AgentId) -> TravelMode {
        self.vehicle_of(agent)
            .and_then(|v| self.vehicle_kind(v))
            .unwrap_or(TravelMode::OnFoot)
    }

    /// Speed of the vehicle the agent sits in, 0 on foot.
    fn agent_vehicle_speed(&self, agent: AgentId) -> f32 {
        self.vehicle_of(agent).map_or(0.0, |v| self.vehicle_speed(v))
    }
}

// ── Orders ────────────────────────────────────────────────────────────────────

/// Movement and physical actions.  Every order replaces whatever native
/// behavior the agent was running.
pub trait Navigation {
    fn go_to(&mut self, agent: AgentId, point: Vec3, style: MoveStyle);

    fn follow(&mut self, agent: AgentId, target: AgentId, style: MoveStyle);

    /// `true` if the host thinks the agent has not made progress recently.
    fn is_stuck(&self, agent: AgentId) -> bool;

    fn leave_vehicle(&mut self, agent: AgentId);

    fn enter_vehicle(&mut self, agent: AgentId, vehicle: VehicleId, seat: Seat);

    /// Unoccupied vehicles within `radius` of `near`, nearest first.
    fn find_free_vehicles(&self, near: Vec3, radius: f32) -> Vec<VehicleId>;

    /// Closest point the given mode can actually reach (sidewalk for
    /// `OnFoot`, road for `Car`), or `None` if there is nothing nearby.
    fn nearest_navigable(&self, point: Vec3, mode: TravelMode) -> Option<Vec3>;

    /// Instant relocation.  Last-resort correction only.
    fn teleport(&mut self, agent: AgentId, point: Vec3);

    /// Generic idle wander around the current position.
    fn wander(&mut self, agent: AgentId);

    fn hold_position(&mut self, agent: AgentId);

    fn aim_at(&mut self, agent: AgentId, target: AgentId);

    /// Lethal engagement.
    fn fight(&mut self, agent: AgentId, target: AgentId);

    fn fire_taser(&mut self, agent: AgentId, target: AgentId);

    /// Start cuffing `target`.  The host updates the target's
    /// [`SuspectStatus`] as the arrest progresses.
    fn cuff(&mut self, agent: AgentId, target: AgentId);

    /// Pull `target` out of the vehicle they are sitting in.
    fn drag_out(&mut self, agent: AgentId, target: AgentId);
}

/// Senses.
pub trait Perception {
    /// Line-of-sight check limited to a field of view (degrees) and range.
    fn can_see(&self, agent: AgentId, target: AgentId, fov_deg: f32, range: f32) -> bool;

    /// `true` if `attacker` has hurt `agent` since the host last cleared it.
    fn damaged_by(&self, agent: AgentId, attacker: AgentId) -> bool;

    /// `true` if any hostile entity is within `radius` of the agent.
    fn hostile_within(&self, agent: AgentId, radius: f32) -> bool;
}

/// Introspection into behaviors the host runs natively.
pub trait NativeTasks {
    fn is_native_task_running(&self, agent: AgentId, task: NativeTaskId) -> bool;
}

/// Speech, text and effects.  No return values are consumed.
pub trait Presentation {
    fn say(&mut self, agent: AgentId, line: Speech);

    fn draw_text(&mut self, agent: AgentId, text: &str);

    fn set_siren(&mut self, vehicle: VehicleId, on: bool);
}

/// Everything the core needs from the host.
pub trait World: EntityQuery + Navigation + Perception + NativeTasks + Presentation + 'static {}

impl<T> World for T where T: EntityQuery + Navigation + Perception + NativeTasks + Presentation + 'static {}
