//! `Blackboard` — the task environment every pursuit task runs against.
//!
//! It bundles the host [`World`], the clock, tuning, the per-target
//! resources, the event bus and the small per-officer records the decision
//! engine caches between decisions.  It is the `E` of
//! `TaskScheduler<E>` for the whole simulation.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use npc_core::{AgentId, AgentRng, ControllerId, NativeTaskId, SimClock, Tick, Vec3, VehicleId};
use npc_task::{TaskEnv, TaskError, TaskResult};
use npc_world::{EventBus, PursuitEvent, World};

use crate::{Action, PursuitConfig, PursuitResources, SearchMode, SearchPlaceLease, TargetResources};

/// What one officer remembers about the suspect it is chasing.
#[derive(Clone, Debug, PartialEq)]
pub struct ChaserStatus {
    pub target:               AgentId,
    /// The pursuit that assigned the chase.
    pub controller:           ControllerId,
    /// Last decided action.
    pub action:               Action,
    /// Some officer had eyes on the target at the last decision.
    pub spotted:              bool,
    pub last_seen:            Tick,
    pub last_known:           Vec3,
    pub asked_to_surrender:   bool,
    pub asked_to_drop_weapon: bool,
    pub vehicle_requested_at: Option<Tick>,
}

impl ChaserStatus {
    pub fn new(target: AgentId, controller: ControllerId, now: Tick, last_known: Vec3) -> Self {
        Self {
            target,
            controller,
            action: Action::Unknown,
            spotted: true,
            last_seen: now,
            last_known,
            asked_to_surrender: false,
            asked_to_drop_weapon: false,
            vehicle_requested_at: None,
        }
    }
}

/// Request to hand an officer back to idle, applied between ticks.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Release {
    pub agent:      AgentId,
    pub controller: ControllerId,
    /// Ticks during which `controller` may not recruit `agent` again.
    pub cooldown:   u64,
}

pub struct Blackboard<W: World> {
    pub world:     W,
    pub clock:     SimClock,
    pub config:    PursuitConfig,
    pub resources: PursuitResources,
    pub bus:       EventBus,
    seed:       u64,
    chasers:    FxHashMap<AgentId, ChaserStatus>,
    roadblocks: FxHashSet<AgentId>,
    rngs:       FxHashMap<AgentId, AgentRng>,
    releases:   Vec<Release>,
}

impl<W: World> Blackboard<W> {
    pub fn new(world: W, clock: SimClock, config: PursuitConfig, seed: u64) -> Self {
        Self {
            world,
            clock,
            config,
            resources:  PursuitResources::new(),
            bus:        EventBus::new(),
            seed,
            chasers:    FxHashMap::default(),
            roadblocks: FxHashSet::default(),
            rngs:       FxHashMap::default(),
            releases:   Vec::new(),
        }
    }

    #[inline]
    pub fn ticks_for_ms(&self, ms: u64) -> u64 {
        self.clock.ticks_for_ms(ms)
    }

    // ── Officer records ───────────────────────────────────────────────────

    pub fn chaser(&self, agent: AgentId) -> Option<&ChaserStatus> {
        self.chasers.get(&agent)
    }

    pub fn chaser_mut(&mut self, agent: AgentId) -> Option<&mut ChaserStatus> {
        self.chasers.get_mut(&agent)
    }

    pub fn set_chaser(&mut self, agent: AgentId, status: ChaserStatus) {
        self.chasers.insert(agent, status);
    }

    pub fn forget_chaser(&mut self, agent: AgentId) {
        self.chasers.remove(&agent);
    }

    /// Every officer currently running a pursuit task, with the controller
    /// it was assigned by.
    pub fn chaser_owners(&self) -> Vec<(AgentId, ControllerId)> {
        let mut owners: Vec<_> = self.chasers.iter().map(|(&a, s)| (a, s.controller)).collect();
        owners.sort_unstable();
        owners
    }

    /// Pin `agent` to its current spot until the target comes close.
    pub fn set_roadblock(&mut self, agent: AgentId, on: bool) {
        if on {
            self.roadblocks.insert(agent);
        } else {
            self.roadblocks.remove(&agent);
        }
    }

    pub fn at_roadblock(&self, agent: AgentId) -> bool {
        self.roadblocks.contains(&agent)
    }

    /// The agent's own deterministic RNG, created on first use.
    pub fn rng(&mut self, agent: AgentId) -> &mut AgentRng {
        let seed = self.seed;
        self.rngs.entry(agent).or_insert_with(|| AgentRng::new(seed, agent))
    }

    // ── Shared resources ──────────────────────────────────────────────────

    /// Claim a search place around `center` for `agent`.
    ///
    /// # Errors
    /// [`TaskError::AllocationExhausted`] when no place is free for reuse and
    /// every generated candidate was rejected.
    pub fn allocate_search_place(
        &mut self,
        target: &TargetResources,
        agent:  AgentId,
        mode:   SearchMode,
        center: Vec3,
    ) -> TaskResult<SearchPlaceLease> {
        let seed = self.seed;
        let rng = self.rngs.entry(agent).or_insert_with(|| AgentRng::new(seed, agent));
        let world = &self.world;
        target
            .search_pool()
            .allocate(mode, center, &self.config.search, rng, |p, m| world.nearest_navigable(p, m))
            .ok_or(TaskError::AllocationExhausted("search place"))
    }

    /// Nearest unoccupied vehicle around `agent` nobody in this pursuit has
    /// given up on or claimed.  The agent's own claim still counts as free.
    pub fn free_vehicle_near(&self, agent: AgentId, target: &TargetResources) -> Option<VehicleId> {
        let here = self.world.position(agent)?;
        let now = self.now();
        self.world
            .find_free_vehicles(here, self.config.free_vehicle_radius)
            .into_iter()
            .find(|&v| target.is_vehicle_usable_by(v, agent, now))
    }

    pub fn publish(&mut self, event: PursuitEvent) {
        self.bus.publish(event);
    }

    // ── Releases ──────────────────────────────────────────────────────────

    pub fn queue_release(&mut self, release: Release) {
        debug!(agent = %release.agent, controller = %release.controller, "release queued");
        self.releases.push(release);
    }

    pub fn take_releases(&mut self) -> Vec<Release> {
        std::mem::take(&mut self.releases)
    }

    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }
}

impl<W: World> TaskEnv for Blackboard<W> {
    #[inline]
    fn now(&self) -> Tick {
        self.clock.current_tick
    }

    fn native_task_running(&self, agent: AgentId, task: NativeTaskId) -> bool {
        self.world.is_native_task_running(agent, task)
    }
}
