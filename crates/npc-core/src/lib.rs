//! `npc-core` — foundational types for the npc pursuit framework.
//!
//! This crate is a dependency of every other `npc-*` crate.  It has no `npc-*`
//! dependencies and only a handful of external ones (`glam`, `rand`,
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `VehicleId`, `ControllerId`, `TaskId`, `NativeTaskId` |
//! | [`priority`]    | `ActionPriority` (totally ordered arbitration levels)      |
//! | [`geo`]         | `Vec3` re-export, planar/3-D distance helpers              |
//! | [`time`]        | `Tick`, `SimClock`, `SimConfig`                            |
//! | [`rng`]         | `AgentRng` (per-agent, seeded from the run seed)           |
//! | [`transport`]   | `TravelMode` enum (on foot / car / helicopter)             |
//! | [`error`]       | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod priority;
pub mod rng;
pub mod time;
pub mod transport;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Vec3;
pub use ids::{AgentId, ControllerId, NativeTaskId, TaskId, VehicleId};
pub use priority::ActionPriority;
pub use rng::AgentRng;
pub use time::{SimClock, SimConfig, Tick};
pub use transport::TravelMode;
