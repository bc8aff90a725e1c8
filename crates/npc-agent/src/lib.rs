//! `npc-agent` — per-agent controller ("intelligence") for the npc pursuit
//! framework.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                  |
//! |------------------|-----------------------------------------------------------|
//! | [`intelligence`] | `Intelligence` (priority arbitration, owner, scheduler)   |
//! | [`controller`]   | `ActionController` trait, `ControllerRegistry`            |
//! | [`blacklist`]    | `Blacklist<K>` (expiring deny list)                       |
//! | [`module`]       | `IntelligenceModule` trait, `ModuleMap`, `OwnerStatus`    |
//! | [`registry`]     | `AgentRegistry` (`BTreeMap<AgentId, Intelligence>`)       |
//! | [`error`]        | `AgentError`, `AgentResult<T>`                            |
//!
//! # Arbitration (summary)
//!
//! ```text
//! request_for_action(p, X):  p > current ?  evict(owner) ; owner = X ; current = p
//!                                       :  no change, returns false
//! reset_action(X, force):    owner == X || force ?  evict(owner) ; owner = None ; current = Idle
//! ```
//!
//! The eviction callback always runs before the new owner is recorded.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                 |
//! |---------|--------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types. |

pub mod blacklist;
pub mod controller;
pub mod error;
pub mod intelligence;
pub mod module;
pub mod registry;


pub use blacklist::Blacklist;
pub use controller::{ActionController, ControllerRegistry};
pub use error::{AgentError, AgentResult};
pub use intelligence::Intelligence;
pub use module::{IntelligenceModule, ModuleMap, OwnerStatus};
pub use registry::AgentRegistry;
