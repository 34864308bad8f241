use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::EngineError;
use crate::gate::Gate;
use crate::pin::Pin;
use crate::types::{ChipId, GateId, LogicRule, Position};
use crate::wires::{PinAddr, Wire};

/// Arena of chip definitions, addressed by stable id. The cells let a
/// settle pass walk into a referenced definition while its host body is
/// held mutably; the placement check keeps those borrows disjoint.
pub(crate) type DefTable = HashMap<ChipId, RefCell<ChipDef>>;

/// What a chip *is*: a builtin evaluation rule, or a circuit of placed
/// gates and wires. Exactly one of the two.
#[derive(Debug)]
pub enum ChipBody {
    Primitive(LogicRule),
    Composite(Body),
}

/// Gates and wires of a composite chip.
#[derive(Debug, Default)]
pub struct Body {
    pub(crate) gates: Vec<Gate>,
    pub(crate) wires: Vec<Wire>,
    last_gate_id: GateId,
}

impl Body {
    pub(crate) fn gate(&self, id: GateId) -> Result<&Gate, EngineError> {
        self.gates
            .iter()
            .find(|g| g.id == id)
            .ok_or(EngineError::UnknownGate(id))
    }

    pub(crate) fn gate_mut(&mut self, id: GateId) -> Result<&mut Gate, EngineError> {
        self.gates
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(EngineError::UnknownGate(id))
    }

    pub(crate) fn new_gate_id(&mut self) -> GateId {
        self.last_gate_id += 1;
        self.last_gate_id
    }
}

/// A named, reusable circuit definition. For a composite chip the
/// `inputs`/`outputs` pins are both the interface templates cloned into
/// instances and the live pins its body settles around.
#[derive(Debug)]
pub struct ChipDef {
    pub id: ChipId,
    pub name: String,
    /// Display color, e.g. "#3498db". Cosmetic.
    pub color: String,
    pub(crate) inputs: Vec<Pin>,
    pub(crate) outputs: Vec<Pin>,
    pub(crate) body: ChipBody,
}

impl ChipDef {
    pub(crate) fn primitive(
        id: ChipId,
        name: &str,
        color: &str,
        inputs: &[&str],
        outputs: &[&str],
        rule: LogicRule,
    ) -> Result<ChipDef, EngineError> {
        // rules are pure, so probing one on an all-low vector is the
        // cheapest way to pin down its arity at definition time
        let probe = rule(&vec![false; inputs.len()]);
        if probe.len() != outputs.len() {
            return Err(EngineError::ArityMismatch {
                expected: outputs.len(),
                got: probe.len(),
            });
        }
        Ok(ChipDef {
            id,
            name: name.to_string(),
            color: color.to_string(),
            inputs: make_pins(inputs),
            outputs: make_pins(outputs),
            body: ChipBody::Primitive(rule),
        })
    }

    pub(crate) fn composite(
        id: ChipId,
        name: &str,
        color: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> ChipDef {
        ChipDef {
            id,
            name: name.to_string(),
            color: color.to_string(),
            inputs: make_pins(inputs),
            outputs: make_pins(outputs),
            body: ChipBody::Composite(Body::default()),
        }
    }

    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.body, ChipBody::Primitive(_))
    }

    pub(crate) fn body(&self) -> Result<&Body, EngineError> {
        match &self.body {
            ChipBody::Composite(b) => Ok(b),
            ChipBody::Primitive(_) => Err(EngineError::NotComposite(self.id)),
        }
    }

    pub(crate) fn body_mut(&mut self) -> Result<&mut Body, EngineError> {
        let id = self.id;
        match &mut self.body {
            ChipBody::Composite(b) => Ok(b),
            ChipBody::Primitive(_) => Err(EngineError::NotComposite(id)),
        }
    }

    /// Clones the interface pin templates into a fresh instance: all pins
    /// low, no subscribers, no wires. Wiring it up is a separate step.
    pub(crate) fn instantiate(&self, id: GateId, position: Position) -> Gate {
        Gate {
            id,
            chip: self.id,
            position,
            inputs: self.inputs.iter().map(Pin::clone_template).collect(),
            outputs: self.outputs.iter().map(Pin::clone_template).collect(),
        }
    }

    pub(crate) fn pin(&self, addr: PinAddr) -> Result<&Pin, EngineError> {
        let pin = match addr {
            PinAddr::ChipInput(i) => self.inputs.get(i),
            PinAddr::ChipOutput(i) => self.outputs.get(i),
            PinAddr::GateInput(g, i) => self.body()?.gate(g)?.inputs.get(i),
            PinAddr::GateOutput(g, i) => self.body()?.gate(g)?.outputs.get(i),
        };
        pin.ok_or(EngineError::UnknownPin(addr))
    }

    pub(crate) fn pin_mut(&mut self, addr: PinAddr) -> Result<&mut Pin, EngineError> {
        let pin = match addr {
            PinAddr::ChipInput(i) => self.inputs.get_mut(i),
            PinAddr::ChipOutput(i) => self.outputs.get_mut(i),
            PinAddr::GateInput(g, i) => self.body_mut()?.gate_mut(g)?.inputs.get_mut(i),
            PinAddr::GateOutput(g, i) => self.body_mut()?.gate_mut(g)?.outputs.get_mut(i),
        };
        pin.ok_or(EngineError::UnknownPin(addr))
    }
}

fn make_pins(names: &[&str]) -> Vec<Pin> {
    names.iter().map(|n| Pin::new(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_arity_is_probed_at_definition() {
        let bad = ChipDef::primitive(1, "BROKEN", "#000000", &["A", "B"], &["Q"], |v| {
            vec![v[0], v[1]]
        });
        assert_eq!(
            bad.unwrap_err(),
            EngineError::ArityMismatch { expected: 1, got: 2 }
        );
    }

    #[test]
    fn instances_start_cold() {
        let def = ChipDef::primitive(1, "NOT", "#000000", &["A"], &["OUT"], |v| vec![!v[0]])
            .unwrap();
        let g = def.instantiate(4, Position::default());
        assert_eq!(g.chip, 1);
        assert_eq!(g.inputs.len(), 1);
        assert_eq!(g.outputs.len(), 1);
        assert!(!g.output(0).unwrap().read());
    }

    #[test]
    fn gate_pins_need_a_body() {
        let def = ChipDef::primitive(1, "NOT", "#000000", &["A"], &["OUT"], |v| vec![!v[0]])
            .unwrap();
        assert_eq!(
            def.pin(PinAddr::GateInput(1, 0)).unwrap_err(),
            EngineError::NotComposite(1)
        );
    }
}
