//! `npc-pursuit` — deciding, per officer and per tick, how to chase a
//! suspect, and sharing the chase between officers.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                        |
//! |----------------|-----------------------------------------------------------------|
//! | [`config`]     | `PursuitConfig`, `SearchPlaceConfig`, named threshold constants |
//! | [`action`]     | `Action`, `SearchMode`, `Hint`, `Decision`                      |
//! | [`decision`]   | `DecisionInput`, the ordered `RULES`, `decide`                  |
//! | [`resources`]  | `Role`, `CounterBoard`/`RoleGuard`, `TargetResources`, `PursuitResources` |
//! | [`search`]     | `SearchPlacePool`, `SearchPlaceLease` (R-tree backed)           |
//! | [`blackboard`] | `Blackboard<W>` task environment, `ChaserStatus`, `Release`     |
//! | [`tasks`]      | `PursuitTask` and one task per action, `AmbientPatrol` module   |
//! | [`controller`] | `Pursuit` controller, `apply_releases`                          |
//! | [`error`]      | `PursuitError`, `PursuitResult<T>`                              |
//!
//! # Data flow
//!
//! ```text
//! Pursuit::recruit ──► Intelligence::request_for_action ──► PursuitTask (main)
//!                                                             │ every 250 ms
//!                      Blackboard (world, counters) ──► DecisionInput ──► decide
//!                                                             │ action changed?
//!                                                             ▼
//!                                          FootChaseTask / TaseTask / SearchTask … (sub)
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                            |
//! |---------|-------------------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on value types, `PursuitConfig` included. |

pub mod action;
pub mod blackboard;
pub mod config;
pub mod controller;
pub mod decision;
pub mod error;
pub mod resources;
pub mod search;
pub mod tasks;


pub use action::{Action, Decision, Hint, SearchMode};
pub use blackboard::{Blackboard, ChaserStatus, Release};
pub use config::{PursuitConfig, SearchPlaceConfig};
pub use controller::{apply_releases, Pursuit};
pub use decision::{decide, DecisionInput, RULES};
pub use error::{PursuitError, PursuitResult};
pub use resources::{CounterBoard, PursuitResources, Role, RoleCounts, RoleGuard, TargetResources};
pub use search::{SearchPlace, SearchPlaceLease, SearchPlacePool, SearchState};
pub use tasks::{AmbientPatrol, PursuitTask};
