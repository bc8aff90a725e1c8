//! The `Sim` struct and its tick loop.

use tracing::{debug, info};

use npc_agent::{AgentRegistry, ControllerRegistry};
use npc_core::geo::distance;
use npc_core::{ActionPriority, AgentId, ControllerId, SimConfig, Tick};
use npc_pursuit::{apply_releases, AmbientPatrol, Blackboard, Pursuit, PursuitError};
use npc_task::TaskEnv;
use npc_world::World;

use crate::{SimError, SimObserver, SimResult, TickSummary};

/// Host hook that advances the world by `dt` seconds once agents have
/// issued their orders for the tick.
pub type HostStep<W> = Box<dyn FnMut(&mut W, f32)>;

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// `Sim<W>` owns the shared [`Blackboard`], every agent's `Intelligence` and
/// every controller, and drives the tick loop:
///
/// 1. **Despawn**: agents the host no longer knows are torn down; their owners
///    are told they left.
/// 2. **Process**: each `Intelligence` runs its modules then its scheduler,
///    in ascending `AgentId` order.
/// 3. **Release**: officers queued for release during the tick go back to
///    idle, cooldowns are recorded.
/// 4. **Host step**: the optional [`HostStep`] advances the world.
/// 5. **Close**: pursuits whose suspect is dead, gone or in custody and that
///    have no officers left are ended; unused per-target resources are pruned.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<W: World + 'static> {
    /// Global configuration (tick length, total ticks, seed).
    pub config: SimConfig,

    /// World, clock, counters and the event bus.
    pub env: Blackboard<W>,

    pub agents: AgentRegistry<Blackboard<W>>,

    pub controllers: ControllerRegistry,

    pub(crate) patrol:            bool,
    pub(crate) snapshot_interval: u64,
    pub(crate) host_step:         Option<HostStep<W>>,
}

impl<W: World + 'static> Sim<W> {
    // ── Public API ────────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> Tick {
        self.env.now()
    }

    /// Run the simulation from the current tick to `config.end_tick()`.
    ///
    /// Use [`NoopObserver`][crate::NoopObserver] if you don't need callbacks.
    pub fn run<O: SimObserver<W>>(&mut self, observer: &mut O) -> SimResult<()> {
        while self.now() < self.config.end_tick() {
            self.step(observer)?;
        }
        observer.on_sim_end(self.now());
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    pub fn run_ticks<O: SimObserver<W>>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Run one tick and advance the clock.
    pub fn step<O: SimObserver<W>>(&mut self, observer: &mut O) -> SimResult<TickSummary> {
        let now = self.now();
        observer.on_tick_start(now);
        let summary = self.process_tick(now, observer)?;
        observer.on_tick_end(now, &summary);
        if self.snapshot_interval > 0 && now.0.is_multiple_of(self.snapshot_interval) {
            observer.on_snapshot(now, &self.env);
        }
        self.env.clock.advance();
        Ok(summary)
    }

    // ── Agents ────────────────────────────────────────────────────────────

    /// Give a world agent an `Intelligence`.  With patrol enabled the agent
    /// also gets an [`AmbientPatrol`] module.
    pub fn spawn(&mut self, agent: AgentId) -> SimResult<()> {
        if !self.env.world.agent_exists(agent) {
            return Err(SimError::UnknownAgent(agent));
        }
        let intel = self.agents.spawn(agent)?;
        if self.patrol {
            intel.register_module(Box::new(AmbientPatrol::default()));
        }
        Ok(())
    }

    pub fn despawn(&mut self, agent: AgentId) -> SimResult<()> {
        self.agents.despawn(agent, &mut self.env, &mut self.controllers)?;
        Ok(())
    }

    // ── Pursuits ──────────────────────────────────────────────────────────

    pub fn start_pursuit(&mut self, suspect: AgentId, priority: ActionPriority) -> SimResult<ControllerId> {
        Ok(Pursuit::start(&mut self.controllers, &mut self.env, suspect, priority)?)
    }

    /// Recruit one spawned officer.  See [`Pursuit::recruit`].
    pub fn recruit(&mut self, pursuit: ControllerId, officer: AgentId) -> SimResult<bool> {
        let intel = self.agents.try_get_mut(officer)?;
        Ok(Pursuit::recruit(&mut self.controllers, pursuit, intel, &mut self.env)?)
    }

    /// Recruit up to `max` spawned officers within `radius` metres of the
    /// suspect, nearest first.  Officers already on the pursuit are skipped.
    /// Returns the officers that joined.
    pub fn dispatch(&mut self, pursuit: ControllerId, radius: f32, max: usize) -> SimResult<Vec<AgentId>> {
        let suspect = self
            .controllers
            .get::<Pursuit>(pursuit)
            .map(Pursuit::suspect)
            .ok_or(PursuitError::NotAPursuit(pursuit))?;
        let origin = self.env.world.position(suspect).ok_or(SimError::UnknownAgent(suspect))?;

        let mut nearby: Vec<(AgentId, f32)> = self
            .agents
            .ids()
            .into_iter()
            .filter(|&id| id != suspect && self.env.world.is_alive(id))
            .filter(|&id| self.agents.get(id).is_some_and(|intel| !intel.is_owned_by(pursuit)))
            .filter_map(|id| self.env.world.position(id).map(|p| (id, distance(origin, p))))
            .filter(|&(_, d)| d <= radius)
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut joined = Vec::new();
        for (officer, _) in nearby {
            if joined.len() >= max {
                break;
            }
            if self.recruit(pursuit, officer)? {
                joined.push(officer);
            }
        }
        info!(pursuit = %pursuit, suspect = %suspect, joined = joined.len(), "backup dispatched");
        Ok(joined)
    }

    pub fn end_pursuit(&mut self, pursuit: ControllerId) -> SimResult<()> {
        Pursuit::end(&mut self.controllers, &mut self.agents, &mut self.env, pursuit)?;
        Ok(())
    }

    /// Every registered pursuit, ascending id.
    pub fn pursuits(&self) -> Vec<ControllerId> {
        self.controllers
            .ids()
            .into_iter()
            .filter(|&id| self.controllers.get::<Pursuit>(id).is_some())
            .collect()
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn process_tick<O: SimObserver<W>>(&mut self, now: Tick, observer: &mut O) -> SimResult<TickSummary> {
        let mut summary = TickSummary::default();

        // ── Phase 1: drop agents the host forgot ──────────────────────────
        for agent in self.agents.ids() {
            if !self.env.world.agent_exists(agent) {
                self.agents.despawn(agent, &mut self.env, &mut self.controllers)?;
                summary.despawned += 1;
            }
        }

        // ── Phase 2: process every agent ──────────────────────────────────
        for agent in self.agents.ids() {
            if let Some(intel) = self.agents.get_mut(agent) {
                intel.process(&mut self.env);
                summary.processed += 1;
            }
        }

        // ── Phase 3: releases queued this tick ────────────────────────────
        summary.released = apply_releases(&mut self.env, &mut self.agents, &mut self.controllers);

        // ── Phase 4: host step ────────────────────────────────────────────
        if let Some(step) = self.host_step.as_mut() {
            step(&mut self.env.world, self.config.tick_duration_ms as f32 / 1000.0);
        }

        // ── Phase 5: close finished pursuits ──────────────────────────────
        for pursuit in self.pursuits() {
            let Some(p) = self.controllers.get::<Pursuit>(pursuit) else { continue };
            let suspect = p.suspect();
            if p.officer_count() > 0 || !self.suspect_done(suspect) {
                continue;
            }
            self.end_pursuit(pursuit)?;
            observer.on_pursuit_ended(now, pursuit, suspect);
            summary.ended += 1;
        }
        let pruned = self.env.resources.prune();

        if summary.despawned + summary.released + summary.ended + pruned > 0 {
            debug!(
                tick      = %now,
                processed = summary.processed,
                despawned = summary.despawned,
                released  = summary.released,
                ended     = summary.ended,
                pruned,
                "tick"
            );
        }
        Ok(summary)
    }

    fn suspect_done(&self, suspect: AgentId) -> bool {
        let world = &self.env.world;
        !world.agent_exists(suspect) || !world.is_alive(suspect) || world.suspect_status(suspect).arrested
    }
}
