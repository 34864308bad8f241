use crate::pin::Pin;
use crate::types::{ChipId, GateId, Position};

/// A placed instance of a chip definition inside another chip's body.
/// Owns private copies of the definition's interface pins; everything the
/// gate "is" at runtime lives in those pin values.
#[derive(Clone, Debug)]
pub struct Gate {
    pub id: GateId,
    /// Definition this gate instantiates. Non-owning; many gates may
    /// reference one definition.
    pub chip: ChipId,
    pub position: Position,
    pub(crate) inputs: Vec<Pin>,
    pub(crate) outputs: Vec<Pin>,
}

impl Gate {
    pub fn input(&self, i: usize) -> Option<&Pin> {
        self.inputs.get(i)
    }

    pub fn output(&self, i: usize) -> Option<&Pin> {
        self.outputs.get(i)
    }

    /// Snapshot of all input pin values, in interface order. Evaluation
    /// rules are total functions of the whole vector, not of deltas.
    pub(crate) fn input_values(&self) -> Vec<bool> {
        self.inputs.iter().map(Pin::read).collect()
    }
}
