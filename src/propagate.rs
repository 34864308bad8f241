use std::collections::{HashSet, VecDeque};

use log::{debug, trace, warn};

use crate::chip::{ChipBody, ChipDef, DefTable};
use crate::error::EngineError;
use crate::pin::Pin;
use crate::types::{ChipId, GateId};
use crate::wires::PinAddr;

/// What one settle pass did: which pins of the settled body changed, how
/// many gate evaluations it took, and whether a fixed point was reached.
#[derive(Clone, Debug)]
pub struct SettleReport {
    pub changed: Vec<PinAddr>,
    pub iterations: usize,
    pub converged: bool,
}

impl SettleReport {
    /// Report of a mutation that could not have moved any signal.
    pub(crate) fn quiet() -> SettleReport {
        SettleReport {
            changed: Vec::new(),
            iterations: 0,
            converged: true,
        }
    }
}

/// Gate evaluations allowed in one settle pass over a body. An acyclic
/// body re-evaluates each gate at most once per dependency level, so an
/// honest circuit stays well under this quadratic bound; a body that
/// exceeds it is oscillating.
pub(crate) fn iteration_budget(gate_count: usize) -> usize {
    64 + 4 * (gate_count + 1) * (gate_count + 1)
}

/// Evaluates a chip definition on the given input vector.
///
/// Primitives call their rule directly. Composites write the inputs onto
/// the body's interface pins and run a nested settle pass restricted to
/// that body, with its own budget, so recursion depth is the chip-nesting
/// depth rather than the circuit size.
pub(crate) fn evaluate_chip(
    defs: &DefTable,
    chip: ChipId,
    inputs: &[bool],
) -> Result<Vec<bool>, EngineError> {
    let cell = defs.get(&chip).ok_or(EngineError::UnknownChip(chip))?;
    let mut def = cell.borrow_mut();
    if inputs.len() != def.n_inputs() {
        return Err(EngineError::ArityMismatch {
            expected: def.n_inputs(),
            got: inputs.len(),
        });
    }

    if let ChipBody::Primitive(rule) = &def.body {
        let out = rule(inputs);
        if out.len() != def.n_outputs() {
            return Err(EngineError::ArityMismatch {
                expected: def.n_outputs(),
                got: out.len(),
            });
        }
        return Ok(out);
    }

    let mut seeds = Vec::new();
    for (i, v) in inputs.iter().enumerate() {
        if def.inputs[i].set_value(*v) {
            seeds.push(PinAddr::ChipInput(i));
        }
    }
    let report = settle(defs, &mut def, seeds, Vec::new())?;
    if !report.converged {
        return Err(EngineError::NonConvergent {
            iterations: report.iterations,
        });
    }
    Ok(def.outputs.iter().map(Pin::read).collect())
}

/// Runs one body to a fixed point, breadth first.
///
/// `seed_pins` are pins whose values have already been changed by the
/// caller; their new values are fanned out along the body's wires and
/// their subscribers queued. `seed_gates` are queued directly (a freshly
/// placed gate has no changed pin yet but still owes its first
/// evaluation).
///
/// Budget exhaustion, at this level or inside a nested composite, ends
/// the pass with `converged: false` and pins left at their last computed
/// values. Structural defects (unknown references, shape mismatches) are
/// returned as errors instead.
pub(crate) fn settle(
    defs: &DefTable,
    def: &mut ChipDef,
    seed_pins: Vec<PinAddr>,
    seed_gates: Vec<GateId>,
) -> Result<SettleReport, EngineError> {
    let mut changed: Vec<PinAddr> = Vec::new();
    let mut seen: HashSet<PinAddr> = HashSet::new();
    let mut queue: VecDeque<GateId> = VecDeque::new();
    let mut pending: HashSet<GateId> = HashSet::new();

    let budget = iteration_budget(def.body()?.gates.len());

    for addr in seed_pins {
        mark_changed(&mut changed, &mut seen, addr);
        ripple(def, addr, &mut queue, &mut pending, &mut changed, &mut seen)?;
    }
    for g in seed_gates {
        enqueue(&mut queue, &mut pending, g);
    }

    let mut iterations = 0;
    while let Some(gid) = queue.pop_front() {
        pending.remove(&gid);
        if iterations >= budget {
            warn!(
                "chip {} ({}) still unsettled after {} iterations",
                def.id, def.name, iterations
            );
            return Ok(SettleReport {
                changed,
                iterations,
                converged: false,
            });
        }
        iterations += 1;

        let (chip_ref, input_vals) = {
            let g = def.body()?.gate(gid)?;
            (g.chip, g.input_values())
        };
        trace!("step gate {} of chip {} (-> chip {})", gid, def.id, chip_ref);
        let outs = match evaluate_chip(defs, chip_ref, &input_vals) {
            Ok(o) => o,
            Err(EngineError::NonConvergent { iterations: nested }) => {
                warn!(
                    "gate {} of chip {}: nested chip {} unsettled after {} iterations",
                    gid, def.id, chip_ref, nested
                );
                return Ok(SettleReport {
                    changed,
                    iterations,
                    converged: false,
                });
            }
            Err(e) => return Err(e),
        };

        let changed_outs: Vec<usize> = {
            let g = def.body_mut()?.gate_mut(gid)?;
            if outs.len() != g.outputs.len() {
                return Err(EngineError::ArityMismatch {
                    expected: g.outputs.len(),
                    got: outs.len(),
                });
            }
            (0..outs.len())
                .filter(|&k| g.outputs[k].set_value(outs[k]))
                .collect()
        };
        for k in changed_outs {
            let addr = PinAddr::GateOutput(gid, k);
            mark_changed(&mut changed, &mut seen, addr);
            ripple(def, addr, &mut queue, &mut pending, &mut changed, &mut seen)?;
        }
    }

    debug!(
        "chip {} settled in {} iterations, {} pin(s) changed",
        def.id,
        iterations,
        changed.len()
    );
    Ok(SettleReport {
        changed,
        iterations,
        converged: true,
    })
}

/// Copies a changed pin's value along every wire it drives, then queues
/// the pin's subscriber gates for re-evaluation.
fn ripple(
    def: &mut ChipDef,
    from: PinAddr,
    queue: &mut VecDeque<GateId>,
    pending: &mut HashSet<GateId>,
    changed: &mut Vec<PinAddr>,
    seen: &mut HashSet<PinAddr>,
) -> Result<(), EngineError> {
    let value = def.pin(from)?.read();
    let targets: Vec<PinAddr> = def
        .body()?
        .wires
        .iter()
        .filter(|w| w.upstream == from)
        .map(|w| w.downstream)
        .collect();
    for t in targets {
        if def.pin_mut(t)?.set_value(value) {
            mark_changed(changed, seen, t);
        }
    }
    let subs: Vec<GateId> = def.pin(from)?.subscribers().collect();
    for g in subs {
        enqueue(queue, pending, g);
    }
    Ok(())
}

// a gate already waiting in the queue is not queued again; one that gets
// re-triggered after its turn is
fn enqueue(queue: &mut VecDeque<GateId>, pending: &mut HashSet<GateId>, gate: GateId) {
    if pending.insert(gate) {
        queue.push_back(gate);
    }
}

fn mark_changed(changed: &mut Vec<PinAddr>, seen: &mut HashSet<PinAddr>, addr: PinAddr) {
    if seen.insert(addr) {
        changed.push(addr);
    }
}
