//! Pursuit-relevant status of a suspect, as reported by the host.

use npc_core::{ActionPriority, AgentId};

/// Who is currently cuffing a suspect and at what priority they act.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrestClaim {
    pub officer:  AgentId,
    pub priority: ActionPriority,
}

/// Flags the decision engine reads every decision tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuspectStatus {
    /// Carries a weapon.
    pub armed: bool,
    /// Actively attacking officers.
    pub hostile: bool,
    /// Scripted: lethal force authorised regardless of behavior.
    pub force_kill: bool,
    /// Hands up, waiting to be cuffed.
    pub surrendering: bool,
    /// Has not decided yet whether to flee, fight or give up.
    pub undecided: bool,
    /// Set while somebody is cuffing the suspect.
    pub being_arrested: Option<ArrestClaim>,
    /// In custody; the pursuit is over.
    pub arrested: bool,
}

impl SuspectStatus {
    /// States in which lethal force is withheld even if a hostility flag is set.
    #[inline]
    pub fn suppresses_lethal_force(&self) -> bool {
        self.surrendering || self.undecided || self.being_arrested.is_some()
    }

    /// The suspect will let an officer walk up and cuff them.
    #[inline]
    pub fn is_compliant(&self) -> bool {
        self.surrendering && !self.hostile
    }
}
