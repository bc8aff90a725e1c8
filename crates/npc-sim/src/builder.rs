//! `SimBuilder` — validates configuration and assembles a `Sim`.

use tracing::info;

use npc_agent::{AgentRegistry, ControllerRegistry};
use npc_core::{AgentId, SimConfig};
use npc_pursuit::{Blackboard, PursuitConfig};
use npc_world::World;

use crate::sim::HostStep;
use crate::{Sim, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - `config`: tick length, total ticks and seed
/// - `world`: the host the agents live in
///
/// # Optional inputs
///
/// | Method                | Default                          |
/// |-----------------------|----------------------------------|
/// | `pursuit_config`      | `PursuitConfig::default()`       |
/// | `officers`            | none spawned                     |
/// | `with_patrol`         | idle officers stand still        |
/// | `snapshot_interval`   | 0 (no snapshots)                 |
/// | `host_step`           | the world is never stepped       |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(SimConfig::default(), world)
///     .officers([AgentId(1), AgentId(2)])
///     .with_patrol()
///     .host_step(|w: &mut SandboxWorld, dt| w.step(dt))
///     .build()?;
/// ```
pub struct SimBuilder<W: World + 'static> {
    config:            SimConfig,
    world:             W,
    pursuit:           PursuitConfig,
    officers:          Vec<AgentId>,
    patrol:            bool,
    snapshot_interval: u64,
    host_step:         Option<HostStep<W>>,
}

impl<W: World + 'static> SimBuilder<W> {
    pub fn new(config: SimConfig, world: W) -> Self {
        Self {
            config,
            world,
            pursuit:           PursuitConfig::default(),
            officers:          Vec::new(),
            patrol:            false,
            snapshot_interval: 0,
            host_step:         None,
        }
    }

    pub fn pursuit_config(mut self, config: PursuitConfig) -> Self {
        self.pursuit = config;
        self
    }

    /// Agents to spawn an `Intelligence` for.  Each must exist in the world.
    pub fn officers(mut self, officers: impl IntoIterator<Item = AgentId>) -> Self {
        self.officers.extend(officers);
        self
    }

    /// Give every spawned agent an `AmbientPatrol` module.
    pub fn with_patrol(mut self) -> Self {
        self.patrol = true;
        self
    }

    /// Call `SimObserver::on_snapshot` every `ticks` ticks (0 disables).
    pub fn snapshot_interval(mut self, ticks: u64) -> Self {
        self.snapshot_interval = ticks;
        self
    }

    pub fn host_step(mut self, step: impl FnMut(&mut W, f32) + 'static) -> Self {
        self.host_step = Some(Box::new(step));
        self
    }

    pub fn build(self) -> SimResult<Sim<W>> {
        self.config.validate()?;
        self.pursuit.validate()?;

        let env = Blackboard::new(self.world, self.config.make_clock(), self.pursuit, self.config.seed);
        let mut sim = Sim {
            config:            self.config,
            env,
            agents:            AgentRegistry::new(),
            controllers:       ControllerRegistry::new(),
            patrol:            self.patrol,
            snapshot_interval: self.snapshot_interval,
            host_step:         self.host_step,
        };
        for officer in self.officers {
            sim.spawn(officer)?;
        }
        info!(
            agents   = sim.agents.len(),
            tick_ms  = sim.config.tick_duration_ms,
            ticks    = sim.config.total_ticks,
            seed     = sim.config.seed,
            patrol   = sim.patrol,
            "simulation built"
        );
        Ok(sim)
    }
}
