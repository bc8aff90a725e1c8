//! Observer hooks called by the tick loop.

use npc_core::{AgentId, ControllerId, Tick};
use npc_pursuit::Blackboard;
use npc_world::World;

/// What happened during one tick.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct TickSummary {
    /// Agents whose `Intelligence` ran.
    pub processed: usize,
    /// Agents dropped because the host no longer knows them.
    pub despawned: usize,
    /// Officers handed back to idle by `apply_releases`.
    pub released:  usize,
    /// Pursuits closed because their suspect was done with and nobody was left.
    pub ended:     usize,
}

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at tick boundaries.
///
/// All methods have default no-op implementations so observers only need to
/// override the hooks they care about.
pub trait SimObserver<W: World> {
    /// Called at the start of each tick, before any agent is processed.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after releases are applied and finished pursuits are closed.
    fn on_tick_end(&mut self, _tick: Tick, _summary: &TickSummary) {}

    /// Called once per pursuit the loop closes on its own.
    fn on_pursuit_ended(&mut self, _tick: Tick, _pursuit: ControllerId, _suspect: AgentId) {}

    /// Called every `snapshot_interval` ticks with the whole shared state.
    fn on_snapshot(&mut self, _tick: Tick, _env: &Blackboard<W>) {}

    /// Called once after the final tick.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A do-nothing observer.
pub struct NoopObserver;

impl<W: World> SimObserver<W> for NoopObserver {}
