use std::cell::RefCell;
use std::collections::HashSet;

use log::{debug, warn};

use crate::bootstrap::bootstrap_chips;
use crate::chip::{ChipDef, DefTable};
use crate::error::EngineError;
use crate::pin::Pin;
use crate::propagate::{evaluate_chip, settle, SettleReport};
use crate::truth_table::{bitwise_counter, TruthTable};
use crate::types::{
    default_color, ChipId, GateId, LogicRule, Position, MAIN_CHIP_COLOR, MAIN_CHIP_NAME,
};
use crate::wires::{PinAddr, Wire};

/// Listing entry for one chip definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ChipInfo {
    pub id: ChipId,
    pub name: String,
    pub color: String,
    pub n_inputs: usize,
    pub n_outputs: usize,
    pub primitive: bool,
}

/// Listing entry for one placed gate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateInfo {
    pub id: GateId,
    pub chip: ChipId,
    pub position: Position,
}

/// The one owning context for a whole editing session: the arena of chip
/// definitions, the chip currently open in the editor, and the outcome of
/// the latest settle pass.
///
/// Every mutating operation runs its settle pass to completion before
/// returning, so callers always observe the circuit in a converged (or
/// diagnosed non-convergent) state. Single-threaded by construction; a
/// multi-threaded host must treat the whole bench as one guarded unit.
pub struct Workbench {
    chips: DefTable,
    last_chip_id: ChipId,
    main: ChipId,
    current: ChipId,
    last_settle: SettleReport,
}

impl Workbench {
    /// A bench pre-loaded with the builtin primitive chips and an empty
    /// `MAIN` composite, which starts open.
    pub fn new() -> Workbench {
        let mut w = Workbench {
            chips: DefTable::new(),
            last_chip_id: 0,
            main: 0,
            current: 0,
            last_settle: SettleReport::quiet(),
        };
        bootstrap_chips(&mut w);
        let main = w.define_composite(MAIN_CHIP_NAME, &[], &[]);
        if let Some(cell) = w.chips.get(&main) {
            cell.borrow_mut().color = MAIN_CHIP_COLOR.to_string();
        }
        w.main = main;
        w.current = main;
        w
    }

    fn new_chip_id(&mut self) -> ChipId {
        self.last_chip_id += 1;
        self.last_chip_id
    }

    fn def(&self, id: ChipId) -> Result<&RefCell<ChipDef>, EngineError> {
        self.chips.get(&id).ok_or(EngineError::UnknownChip(id))
    }

    /// Stores the pass outcome for later queries and turns a
    /// non-convergent pass into the matching error.
    fn finish(&mut self, report: SettleReport) -> Result<SettleReport, EngineError> {
        self.last_settle = report.clone();
        if !report.converged {
            return Err(EngineError::NonConvergent {
                iterations: report.iterations,
            });
        }
        Ok(report)
    }

    // ---- definitions ----

    /// Defines a primitive chip. The rule is probed once against its
    /// declared arity; a rule producing the wrong number of outputs is
    /// rejected here rather than mid-settle.
    pub fn define_primitive(
        &mut self,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        rule: LogicRule,
    ) -> Result<ChipId, EngineError> {
        let id = self.new_chip_id();
        let def = ChipDef::primitive(id, name, default_color(id), inputs, outputs, rule)?;
        self.chips.insert(id, RefCell::new(def));
        debug!("defined primitive chip {} ({})", id, name);
        Ok(id)
    }

    /// Defines an empty composite chip for the editor to populate with
    /// gates and wires.
    pub fn define_composite(&mut self, name: &str, inputs: &[&str], outputs: &[&str]) -> ChipId {
        let id = self.new_chip_id();
        let def = ChipDef::composite(id, name, default_color(id), inputs, outputs);
        self.chips.insert(id, RefCell::new(def));
        debug!("defined composite chip {} ({})", id, name);
        id
    }

    pub fn rename_chip(&mut self, id: ChipId, name: &str) -> Result<(), EngineError> {
        self.def(id)?.borrow_mut().name = name.to_string();
        Ok(())
    }

    pub fn set_chip_color(&mut self, id: ChipId, color: &str) -> Result<(), EngineError> {
        self.def(id)?.borrow_mut().color = color.to_string();
        Ok(())
    }

    /// Appends an input pin to a composite definition's interface.
    /// Instances placed before the change keep their old shape and report
    /// `ArityMismatch` when next evaluated; re-place them to pick up the
    /// new interface.
    pub fn add_input(&mut self, id: ChipId, name: &str) -> Result<usize, EngineError> {
        let mut def = self.def(id)?.borrow_mut();
        def.body()?;
        def.inputs.push(Pin::new(name));
        Ok(def.inputs.len() - 1)
    }

    pub fn add_output(&mut self, id: ChipId, name: &str) -> Result<usize, EngineError> {
        let mut def = self.def(id)?.borrow_mut();
        def.body()?;
        def.outputs.push(Pin::new(name));
        Ok(def.outputs.len() - 1)
    }

    /// Removes a definition. Refused while any gate anywhere still
    /// instantiates it; `MAIN` is never deletable. Deleting the chip that
    /// is currently open falls back to `MAIN`.
    pub fn delete_chip(&mut self, id: ChipId) -> Result<(), EngineError> {
        if id == self.main {
            return Err(EngineError::ProtectedChip);
        }
        self.def(id)?;
        let mut placed = 0;
        for cell in self.chips.values() {
            let def = cell.borrow();
            if let Ok(body) = def.body() {
                placed += body.gates.iter().filter(|g| g.chip == id).count();
            }
        }
        if placed > 0 {
            warn!("refusing to delete chip {}: {} live gate(s)", id, placed);
            return Err(EngineError::InUse(id, placed));
        }
        self.chips.remove(&id);
        if self.current == id {
            self.current = self.main;
        }
        Ok(())
    }

    // ---- gates ----

    /// Places an instance of `chip` inside `host`'s body. Rejected when
    /// the placement would let `chip` reach `host` through definition
    /// references: with no conditional base case in the model, any such
    /// cycle nests forever.
    ///
    /// The new gate gets one initial evaluation as part of the settle
    /// pass, so its outputs are consistent with its (all-low) inputs by
    /// the time this returns.
    pub fn place_gate(
        &mut self,
        host: ChipId,
        chip: ChipId,
        position: Position,
    ) -> Result<GateId, EngineError> {
        self.def(chip)?;
        if self.reaches(chip, host) {
            return Err(EngineError::StructuralRecursion { host, placed: chip });
        }
        let host_cell = self.def(host)?;
        let gid;
        let report;
        {
            let mut host_def = host_cell.borrow_mut();
            gid = host_def.body_mut()?.new_gate_id();
            let gate = self.chips[&chip].borrow().instantiate(gid, position);
            host_def.body_mut()?.gates.push(gate);
            report = settle(&self.chips, &mut host_def, Vec::new(), vec![gid])?;
        }
        self.finish(report)?;
        Ok(gid)
    }

    /// Cosmetic move; no signal can change, so no settle pass runs.
    pub fn move_gate(
        &mut self,
        host: ChipId,
        gate: GateId,
        position: Position,
    ) -> Result<(), EngineError> {
        let mut def = self.def(host)?.borrow_mut();
        def.body_mut()?.gate_mut(gate)?.position = position;
        Ok(())
    }

    /// Removes a gate, every wire touching its pins, and its fan-out
    /// subscriptions. Pins that were driven by the gate keep their last
    /// value.
    pub fn remove_gate(&mut self, host: ChipId, gate: GateId) -> Result<SettleReport, EngineError> {
        {
            let mut def = self.def(host)?.borrow_mut();
            {
                let body = def.body_mut()?;
                body.gate(gate)?;
                body.wires.retain(|w| {
                    w.upstream.gate() != Some(gate) && w.downstream.gate() != Some(gate)
                });
                body.gates.retain(|g| g.id != gate);
                for g in &mut body.gates {
                    for p in &mut g.outputs {
                        p.unsubscribe(gate);
                    }
                }
            }
            for p in &mut def.inputs {
                p.unsubscribe(gate);
            }
        }
        self.finish(SettleReport::quiet())
    }

    // ---- wires ----

    /// Wires `upstream` to `downstream` inside one chip body, carries the
    /// upstream's current level across, and settles. The downstream pin
    /// must not already have a driver.
    pub fn connect(
        &mut self,
        chip: ChipId,
        upstream: PinAddr,
        downstream: PinAddr,
    ) -> Result<SettleReport, EngineError> {
        if !upstream.can_drive() || !downstream.can_be_driven() {
            return Err(EngineError::TypeMismatch(upstream, downstream));
        }
        let report;
        {
            let mut def = self.def(chip)?.borrow_mut();
            def.pin(upstream)?;
            def.pin(downstream)?;
            if def.body()?.wires.iter().any(|w| w.downstream == downstream) {
                return Err(EngineError::AlreadyDriven(downstream));
            }
            def.body_mut()?.wires.push(Wire {
                upstream,
                downstream,
            });
            if let Some(g) = downstream.gate() {
                def.pin_mut(upstream)?.subscribe(g);
            }
            let value = def.pin(upstream)?.read();
            let changed = def.pin_mut(downstream)?.set_value(value);
            let (seed_pins, seed_gates) = if changed {
                (vec![downstream], downstream.gate().into_iter().collect())
            } else {
                (Vec::new(), Vec::new())
            };
            report = settle(&self.chips, &mut def, seed_pins, seed_gates)?;
        }
        self.finish(report)
    }

    /// Removes the wire driving `downstream`, if any. The pin keeps its
    /// last driven value until something drives it again. Disconnecting
    /// an undriven pin is a no-op.
    pub fn disconnect(
        &mut self,
        chip: ChipId,
        downstream: PinAddr,
    ) -> Result<SettleReport, EngineError> {
        {
            let mut def = self.def(chip)?.borrow_mut();
            def.pin(downstream)?;
            let idx = def
                .body()?
                .wires
                .iter()
                .position(|w| w.downstream == downstream);
            if let Some(idx) = idx {
                let wire = def.body_mut()?.wires.remove(idx);
                if let Some(g) = downstream.gate() {
                    // the subscription stays while another wire from the
                    // same source still feeds this gate
                    let still_fed = def
                        .body()?
                        .wires
                        .iter()
                        .any(|w| w.upstream == wire.upstream && w.downstream.gate() == Some(g));
                    if !still_fed {
                        def.pin_mut(wire.upstream)?.unsubscribe(g);
                    }
                }
            }
        }
        self.finish(SettleReport::quiet())
    }

    // ---- signals ----

    /// Drives one of a composite chip's own input pins; the one way a
    /// user feeds the circuit. Re-setting the current value runs no
    /// settle pass at all.
    pub fn set_input(
        &mut self,
        chip: ChipId,
        index: usize,
        value: bool,
    ) -> Result<SettleReport, EngineError> {
        let report = {
            let mut def = self.def(chip)?.borrow_mut();
            def.body()?;
            let addr = PinAddr::ChipInput(index);
            if def.pin_mut(addr)?.set_value(value) {
                settle(&self.chips, &mut def, vec![addr], Vec::new())?
            } else {
                SettleReport::quiet()
            }
        };
        self.finish(report)
    }

    /// Evaluates a chip definition on an explicit input vector, as a gate
    /// instantiating it would.
    pub fn evaluate(&mut self, chip: ChipId, inputs: &[bool]) -> Result<Vec<bool>, EngineError> {
        evaluate_chip(&self.chips, chip, inputs)
    }

    /// Exhaustive behavior of a chip over every input combination.
    pub fn truth_table(&mut self, chip: ChipId) -> Result<TruthTable, EngineError> {
        let (inputs, outputs) = {
            let def = self.def(chip)?.borrow();
            (
                def.inputs.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
                def.outputs.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            )
        };
        let mut rows = Vec::new();
        for combo in bitwise_counter(inputs.len()) {
            let outs = evaluate_chip(&self.chips, chip, &combo)?;
            rows.push((combo, outs));
        }
        Ok(TruthTable {
            inputs,
            outputs,
            rows,
        })
    }

    // ---- queries ----

    pub fn chips(&self) -> Vec<ChipInfo> {
        let mut all: Vec<ChipInfo> = self.chips.values().map(|c| info_of(&c.borrow())).collect();
        all.sort_by_key(|c| c.id);
        all
    }

    pub fn chip_info(&self, id: ChipId) -> Result<ChipInfo, EngineError> {
        Ok(info_of(&self.def(id)?.borrow()))
    }

    /// Lowest-id chip with the given display name, if any. Names are not
    /// required to be unique.
    pub fn find_chip(&self, name: &str) -> Option<ChipId> {
        self.chips
            .iter()
            .filter(|(_, c)| c.borrow().name == name)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn gates(&self, chip: ChipId) -> Result<Vec<GateInfo>, EngineError> {
        let def = self.def(chip)?.borrow();
        let mut all: Vec<GateInfo> = def
            .body()?
            .gates
            .iter()
            .map(|g| GateInfo {
                id: g.id,
                chip: g.chip,
                position: g.position,
            })
            .collect();
        all.sort_by_key(|g| g.id);
        Ok(all)
    }

    pub fn wires(&self, chip: ChipId) -> Result<Vec<Wire>, EngineError> {
        Ok(self.def(chip)?.borrow().body()?.wires.clone())
    }

    pub fn pin_value(&self, chip: ChipId, addr: PinAddr) -> Result<bool, EngineError> {
        Ok(self.def(chip)?.borrow().pin(addr)?.read())
    }

    pub fn pin_name(&self, chip: ChipId, addr: PinAddr) -> Result<String, EngineError> {
        Ok(self.def(chip)?.borrow().pin(addr)?.name.clone())
    }

    pub fn main_chip(&self) -> ChipId {
        self.main
    }

    pub fn current_chip(&self) -> ChipId {
        self.current
    }

    pub fn open_chip(&mut self, id: ChipId) -> Result<(), EngineError> {
        self.def(id)?;
        self.current = id;
        Ok(())
    }

    /// Outcome of the latest settle pass: what to redraw, and whether to
    /// surface an oscillation warning.
    pub fn last_settle(&self) -> &SettleReport {
        &self.last_settle
    }

    /// Can `from`'s definition reach `target` through composite bodies?
    fn reaches(&self, from: ChipId, target: ChipId) -> bool {
        let mut visited: HashSet<ChipId> = HashSet::new();
        let mut stack = vec![from];
        while let Some(c) = stack.pop() {
            if c == target {
                return true;
            }
            if !visited.insert(c) {
                continue;
            }
            if let Some(cell) = self.chips.get(&c) {
                let def = cell.borrow();
                if let Ok(body) = def.body() {
                    stack.extend(body.gates.iter().map(|g| g.chip));
                }
            }
        }
        false
    }
}

impl Default for Workbench {
    fn default() -> Workbench {
        Workbench::new()
    }
}

fn info_of(def: &ChipDef) -> ChipInfo {
    ChipInfo {
        id: def.id,
        name: def.name.clone(),
        color: def.color.clone(),
        n_inputs: def.n_inputs(),
        n_outputs: def.n_outputs(),
        primitive: def.is_primitive(),
    }
}
