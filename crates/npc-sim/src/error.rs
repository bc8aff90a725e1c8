use thiserror::Error;

use npc_agent::AgentError;
use npc_core::{AgentId, CoreError};
use npc_pursuit::PursuitError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Pursuit(#[from] PursuitError),

    #[error("agent {0} does not exist in the world")]
    UnknownAgent(AgentId),
}

pub type SimResult<T> = Result<T, SimError>;
