//! World-contract error type.

use thiserror::Error;

use npc_core::{AgentId, VehicleId};

/// Errors produced by `npc-world` (sandbox setup, bus misuse).
///
/// The capability traits themselves are infallible: a command aimed at an
/// entity that no longer exists is silently dropped by the host, and the
/// issuing task notices on its next existence check.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("agent {0} is not known to the world")]
    UnknownAgent(AgentId),

    #[error("vehicle {0} is not known to the world")]
    UnknownVehicle(VehicleId),

    #[error("agent {0} already exists")]
    DuplicateAgent(AgentId),

    #[error("vehicle {0} already exists")]
    DuplicateVehicle(VehicleId),
}

pub type WorldResult<T> = Result<T, WorldError>;
