//! `npc-sim` — tick loop orchestrator for the npc pursuit framework.
//!
//! # Tick loop
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Despawn  — agents missing from the world are torn down; their
//!                controllers hear ped_has_left.
//!   ② Process  — Intelligence::process for each agent, ascending AgentId:
//!                  modules (AmbientPatrol …) → scheduler (PursuitTask → action task)
//!   ③ Release  — apply_releases: queued officers go idle, cooldowns recorded
//!   ④ Host     — optional HostStep advances the world by one tick
//!   ⑤ Close    — pursuits with a finished suspect and no officers end;
//!                idle per-target resources are pruned
//! ```
//!
//! Everything runs on one thread in a fixed order, so a given seed and
//! world always replay identically.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use npc_core::{ActionPriority, AgentId, SimConfig};
//! use npc_sim::{NoopObserver, SimBuilder};
//! use npc_world::SandboxWorld;
//!
//! let mut sim = SimBuilder::new(SimConfig::default(), world)
//!     .officers([AgentId(1), AgentId(2)])
//!     .host_step(|w: &mut SandboxWorld, dt| w.step(dt))
//!     .build()?;
//! let pursuit = sim.start_pursuit(AgentId(10), ActionPriority::RequiredByScript)?;
//! sim.dispatch(pursuit, 200.0, 4)?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver, TickSummary};
pub use sim::{HostStep, Sim};
