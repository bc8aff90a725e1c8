use thiserror::Error;

use npc_agent::AgentError;
use npc_core::{AgentId, ControllerId};

#[derive(Debug, Error)]
pub enum PursuitError {
    #[error("pursuit configuration error: {0}")]
    Config(String),

    #[error("suspect {0} does not exist")]
    UnknownSuspect(AgentId),

    #[error("controller {0} is not a pursuit")]
    NotAPursuit(ControllerId),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type PursuitResult<T> = Result<T, PursuitError>;
