//! Per-target shared state: role counters, the vehicle blacklist and the
//! search-place pool.
//!
//! # Design
//!
//! Every officer chasing the same suspect shares one [`TargetResources`],
//! handed out as an `Arc` by [`PursuitResources::for_target`].  Nothing here
//! is global: two pursuits of two suspects never see each other's counters.
//!
//! Counters are membership sets, not bare integers.  An officer joins a role
//! by taking a [`RoleGuard`] and leaves it when the guard drops, so a task
//! that holds its guards in `Option` fields cannot leave a count behind on
//! any exit path (abort, timeout, failure, agent despawn).
//!
//! The interior is behind `parking_lot::Mutex` so guards can release from
//! `Drop` without a borrow of the owner.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use npc_agent::Blacklist;
use npc_core::{AgentId, Tick, VehicleId};

use crate::SearchPlacePool;

// ── Roles ─────────────────────────────────────────────────────────────────────

/// What an officer is doing about a target, as far as the others care.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Taking part in the pursuit at all.
    Chasing,
    ChasingOnFoot,
    Tasing,
    SearchingOnFoot,
    SearchingInVehicle,
    /// Currently has eyes on the target.
    Visual,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Chasing,
        Role::ChasingOnFoot,
        Role::Tasing,
        Role::SearchingOnFoot,
        Role::SearchingInVehicle,
        Role::Visual,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Chasing            => "chasing",
            Role::ChasingOnFoot      => "chasing_on_foot",
            Role::Tasing             => "tasing",
            Role::SearchingOnFoot    => "searching_on_foot",
            Role::SearchingInVehicle => "searching_in_vehicle",
            Role::Visual             => "visual",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every role count for one target.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleCounts {
    pub chasing:              usize,
    pub chasing_on_foot:      usize,
    pub tasing:               usize,
    pub searching_on_foot:    usize,
    pub searching_in_vehicle: usize,
    pub visual:               usize,
}

impl RoleCounts {
    /// Officers in the pursuit that are not searching.
    pub fn tracking(&self) -> usize {
        self.chasing
            .saturating_sub(self.searching_on_foot + self.searching_in_vehicle)
    }
}

// ── Counter board ─────────────────────────────────────────────────────────────

/// Agent → number of live guards, per role.
type Members = [BTreeMap<AgentId, u32>; Role::ALL.len()];

/// Role membership for one target.  Cloning shares the same board.
#[derive(Clone, Default)]
pub struct CounterBoard {
    inner: Arc<Mutex<Members>>,
}

impl CounterBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `role`.  The agent counts once however many guards it holds.
    pub fn acquire(&self, role: Role, agent: AgentId) -> RoleGuard {
        *self.inner.lock()[role.index()].entry(agent).or_insert(0) += 1;
        trace!(agent = %agent, %role, "role acquired");
        RoleGuard { board: Arc::clone(&self.inner), role, agent }
    }

    /// Distinct agents in `role`.
    pub fn count(&self, role: Role) -> usize {
        self.inner.lock()[role.index()].len()
    }

    pub fn contains(&self, role: Role, agent: AgentId) -> bool {
        self.inner.lock()[role.index()].contains_key(&agent)
    }

    /// Agents in `role`, ascending.
    pub fn members(&self, role: Role) -> Vec<AgentId> {
        self.inner.lock()[role.index()].keys().copied().collect()
    }

    pub fn counts(&self) -> RoleCounts {
        let m = self.inner.lock();
        RoleCounts {
            chasing:              m[Role::Chasing.index()].len(),
            chasing_on_foot:      m[Role::ChasingOnFoot.index()].len(),
            tasing:               m[Role::Tasing.index()].len(),
            searching_on_foot:    m[Role::SearchingOnFoot.index()].len(),
            searching_in_vehicle: m[Role::SearchingInVehicle.index()].len(),
            visual:               m[Role::Visual.index()].len(),
        }
    }

    /// `true` when no role has any member.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().iter().all(BTreeMap::is_empty)
    }
}

/// Membership of one agent in one role.  Dropping it leaves the role.
#[must_use = "dropping a RoleGuard immediately leaves the role"]
pub struct RoleGuard {
    board: Arc<Mutex<Members>>,
    role:  Role,
    agent: AgentId,
}

impl RoleGuard {
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn agent(&self) -> AgentId {
        self.agent
    }
}

impl Drop for RoleGuard {
    fn drop(&mut self) {
        let mut members = self.board.lock();
        let set = &mut members[self.role.index()];
        if let Some(n) = set.get_mut(&self.agent) {
            *n -= 1;
            if *n == 0 {
                set.remove(&self.agent);
            }
        }
        trace!(agent = %self.agent, role = %self.role, "role released");
    }
}

impl fmt::Debug for RoleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleGuard").field("role", &self.role).field("agent", &self.agent).finish()
    }
}

// ── Per target ────────────────────────────────────────────────────────────────

/// Everything officers chasing one suspect share.
pub struct TargetResources {
    target:   AgentId,
    counters: CounterBoard,
    vehicles: Mutex<Blacklist<VehicleId>>,
    /// Who is on the way to each claimed vehicle.
    claims:   Mutex<FxHashMap<VehicleId, AgentId>>,
    search:   SearchPlacePool,
}

impl TargetResources {
    pub fn new(target: AgentId) -> Self {
        Self {
            target,
            counters: CounterBoard::new(),
            vehicles: Mutex::new(Blacklist::new()),
            claims:   Mutex::new(FxHashMap::default()),
            search:   SearchPlacePool::new(),
        }
    }

    #[inline]
    pub fn target(&self) -> AgentId {
        self.target
    }

    pub fn counters(&self) -> &CounterBoard {
        &self.counters
    }

    pub fn search_pool(&self) -> &SearchPlacePool {
        &self.search
    }

    /// Keep officers of this pursuit away from `vehicle` for `ticks`.
    pub fn blacklist_vehicle(&self, vehicle: VehicleId, now: Tick, ticks: u64) {
        debug!(target = %self.target, vehicle = %vehicle, ticks, "vehicle blacklisted");
        self.vehicles.lock().add(vehicle, now, ticks);
    }

    pub fn unblacklist_vehicle(&self, vehicle: VehicleId) {
        self.vehicles.lock().remove(vehicle);
    }

    pub fn is_vehicle_blacklisted(&self, vehicle: VehicleId, now: Tick) -> bool {
        self.vehicles.lock().contains(vehicle, now)
    }

    /// Blacklist `vehicle` for everyone but `claimant` for `ticks`.
    pub fn claim_vehicle(&self, vehicle: VehicleId, claimant: AgentId, now: Tick, ticks: u64) {
        self.blacklist_vehicle(vehicle, now, ticks);
        self.claims.lock().insert(vehicle, claimant);
    }

    /// Drop `claimant`'s claim on `vehicle`, if it still holds it.
    pub fn release_vehicle(&self, vehicle: VehicleId, claimant: AgentId) {
        let mut claims = self.claims.lock();
        if claims.get(&vehicle) == Some(&claimant) {
            claims.remove(&vehicle);
            self.unblacklist_vehicle(vehicle);
        }
    }

    /// Not blacklisted, or blacklisted by `agent`'s own claim.
    pub fn is_vehicle_usable_by(&self, vehicle: VehicleId, agent: AgentId, now: Tick) -> bool {
        !self.is_vehicle_blacklisted(vehicle, now) || self.claims.lock().get(&vehicle) == Some(&agent)
    }

    /// Blacklist `vehicle` for `ticks` for everyone, its claimant included.
    pub fn give_up_vehicle(&self, vehicle: VehicleId, now: Tick, ticks: u64) {
        self.claims.lock().remove(&vehicle);
        self.blacklist_vehicle(vehicle, now, ticks);
    }
}

/// All per-target resources of the simulation, created on first use.
#[derive(Default)]
pub struct PursuitResources {
    targets: FxHashMap<AgentId, Arc<TargetResources>>,
    /// Suspects some pursuit is actively after.
    pursued: BTreeSet<AgentId>,
}

impl PursuitResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared resources for `target`, created empty on first request.
    pub fn for_target(&mut self, target: AgentId) -> Arc<TargetResources> {
        Arc::clone(
            self.targets
                .entry(target)
                .or_insert_with(|| Arc::new(TargetResources::new(target))),
        )
    }

    pub fn get(&self, target: AgentId) -> Option<&Arc<TargetResources>> {
        self.targets.get(&target)
    }

    pub fn mark_pursued(&mut self, target: AgentId) {
        self.pursued.insert(target);
    }

    pub fn unmark_pursued(&mut self, target: AgentId) {
        self.pursued.remove(&target);
    }

    pub fn is_pursued(&self, target: AgentId) -> bool {
        self.pursued.contains(&target)
    }

    /// Pursued suspects, ascending.
    pub fn pursued(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.pursued.iter().copied()
    }

    /// Drop resources of targets nobody pursues and nobody holds a handle
    /// to.  Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.targets.len();
        let pursued = &self.pursued;
        self.targets
            .retain(|t, res| pursued.contains(t) || Arc::strong_count(res) > 1);
        before - self.targets.len()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
