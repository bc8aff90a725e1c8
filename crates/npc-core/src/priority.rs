//! Action priorities used for ownership arbitration.

use std::fmt;

/// Totally ordered level at which a controller claims an agent.
///
/// A request only displaces the current owner when its priority is *strictly*
/// greater than the priority in effect.  The declaration order below is the
/// ordering; do not reorder variants.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionPriority {
    /// Nobody owns the agent.
    #[default]
    Idle,
    AmbientTask,
    AmbientTaskImportant,
    ShockingEventWatch,
    ShockingEventFlee,
    RequiredByScript,
    RequiredByScriptCritical,
    RequiredForUserInteraction,
}

impl ActionPriority {
    /// Every level in ascending order.
    pub const ALL: [ActionPriority; 8] = [
        ActionPriority::Idle,
        ActionPriority::AmbientTask,
        ActionPriority::AmbientTaskImportant,
        ActionPriority::ShockingEventWatch,
        ActionPriority::ShockingEventFlee,
        ActionPriority::RequiredByScript,
        ActionPriority::RequiredByScriptCritical,
        ActionPriority::RequiredForUserInteraction,
    ];

    /// `true` if a request at `self` would displace an owner at `current`.
    #[inline]
    pub fn outranks(self, current: ActionPriority) -> bool {
        self > current
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionPriority::Idle                       => "idle",
            ActionPriority::AmbientTask                => "ambient",
            ActionPriority::AmbientTaskImportant       => "ambient_important",
            ActionPriority::ShockingEventWatch         => "shocking_watch",
            ActionPriority::ShockingEventFlee          => "shocking_flee",
            ActionPriority::RequiredByScript           => "script",
            ActionPriority::RequiredByScriptCritical   => "script_critical",
            ActionPriority::RequiredForUserInteraction => "user_interaction",
        }
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
