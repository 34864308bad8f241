use thiserror::Error;

use crate::types::{ChipId, GateId};
use crate::wires::PinAddr;

/// Everything a mutating operation can refuse with. All of these are
/// recoverable; the graph stays usable after any of them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0} already has a driver")]
    AlreadyDriven(PinAddr),

    #[error("{0} cannot drive {1}")]
    TypeMismatch(PinAddr, PinAddr),

    #[error("expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("chip {placed} would end up nested inside itself in chip {host}")]
    StructuralRecursion { host: ChipId, placed: ChipId },

    #[error("circuit did not settle within {iterations} iterations")]
    NonConvergent { iterations: usize },

    #[error("no chip with id {0}")]
    UnknownChip(ChipId),

    #[error("no gate with id {0}")]
    UnknownGate(GateId),

    #[error("no pin at {0}")]
    UnknownPin(PinAddr),

    #[error("chip {0} is still placed as {1} gate(s)")]
    InUse(ChipId, usize),

    #[error("the main chip cannot be deleted")]
    ProtectedChip,

    #[error("chip {0} is primitive and has no editable body")]
    NotComposite(ChipId),
}
