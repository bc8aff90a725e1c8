//! `npc-world` — the contract between the pursuit core and the host simulation.
//!
//! The core never moves, animates, ray-casts or plays audio itself.  It asks
//! the host through the narrow traits in this crate and otherwise only reads
//! and writes its own state.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                      |
//! |----------------|---------------------------------------------------------------|
//! | [`capability`] | `EntityQuery`, `Navigation`, `Perception`, `NativeTasks`, `Presentation`, `World` |
//! | [`native`]     | Well-known `NativeTaskId`s issued by navigation commands      |
//! | [`suspect`]    | `SuspectStatus`, `ArrestClaim`                                |
//! | [`events`]     | `EventBus`, `PursuitEvent`, `Subscription`, `Topic`           |
//! | [`sandbox`]    | `SandboxWorld` — headless in-memory host with a command log   |
//! | [`error`]      | `WorldError`, `WorldResult<T>`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types.     |

pub mod capability;
pub mod error;
pub mod events;
pub mod native;
pub mod sandbox;
pub mod suspect;

#[cfg(test)]
mod tests;

pub use capability::{
    EntityQuery, MoveStyle, NativeTasks, Navigation, Perception, Presentation, Seat, Speech, World,
};
pub use error::{WorldError, WorldResult};
pub use events::{EventBus, PursuitEvent, Subscription, Topic};
pub use sandbox::{SandboxWorld, WorldCommand};
pub use suspect::{ArrestClaim, SuspectStatus};
