use thiserror::Error;

use npc_core::{AgentId, ControllerId};

/// Errors from agent and controller bookkeeping.
///
/// Arbitration outcomes are not errors: a denied request is a plain `false`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent {0} is not registered")]
    NotFound(AgentId),

    #[error("agent {0} is already registered")]
    AlreadySpawned(AgentId),

    #[error("controller {0} is not registered")]
    UnknownController(ControllerId),

    #[error("controller {0} is already registered")]
    DuplicateController(ControllerId),
}

pub type AgentResult<T> = Result<T, AgentError>;
