//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Agent and vehicle ids are handed out
//! by the host simulation and are not dense, so unlike a SoA index they are
//! only ever used as keys.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// `false` for the `INVALID` sentinel.
            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Handle of a simulated character (officer, suspect, bystander).
    pub struct AgentId(u32);
}

typed_id! {
    /// Handle of a vehicle in the host simulation.
    pub struct VehicleId(u32);
}

typed_id! {
    /// Opaque identity of an external subsystem that can own an agent's
    /// behavior (a pursuit, a scripted scene, the player's interaction menu…).
    pub struct ControllerId(u32);
}

typed_id! {
    /// Identity of a task type inside a `TaskScheduler`.  Several instances may
    /// share an id; lookups return the first active one.
    pub struct TaskId(u16);
}

typed_id! {
    /// Identity of a behavior the host simulation runs natively on an agent
    /// (follow, enter vehicle, fight…).  Used to ask "is this still running?".
    pub struct NativeTaskId(u16);
}
