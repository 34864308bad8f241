//! Signal propagation and chip composition for a live logic editor:
//! pins, wires, chip definitions, placed gates, and the bounded worklist
//! settle pass that keeps their values consistent.

pub mod chip;
pub mod error;
pub mod gate;
pub mod pin;
pub mod propagate;
pub mod truth_table;
pub mod types;
pub mod wires;
pub mod workbench;
mod bootstrap;

#[cfg(test)]
mod tests {
    use crate::error::EngineError;
    use crate::types::{ChipId, Position, MAIN_CHIP_NAME};
    use crate::wires::PinAddr::{ChipInput, ChipOutput, GateInput, GateOutput};
    use crate::workbench::Workbench;

    fn pos() -> Position {
        Position::default()
    }

    fn builtin(w: &Workbench, name: &str) -> ChipId {
        w.find_chip(name).unwrap()
    }

    /// AND built from OR and three NOTs, the De Morgan way.
    fn de_morgan_and(w: &mut Workbench) -> ChipId {
        let not = builtin(w, "NOT");
        let or = builtin(w, "OR");
        let c = w.define_composite("AND2", &["A", "B"], &["Q"]);
        let na = w.place_gate(c, not, pos()).unwrap();
        let nb = w.place_gate(c, not, pos()).unwrap();
        let o = w.place_gate(c, or, pos()).unwrap();
        let nq = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(na, 0)).unwrap();
        w.connect(c, ChipInput(1), GateInput(nb, 0)).unwrap();
        w.connect(c, GateOutput(na, 0), GateInput(o, 0)).unwrap();
        w.connect(c, GateOutput(nb, 0), GateInput(o, 1)).unwrap();
        w.connect(c, GateOutput(o, 0), GateInput(nq, 0)).unwrap();
        w.connect(c, GateOutput(nq, 0), ChipOutput(0)).unwrap();
        c
    }

    #[test]
    fn bench_starts_with_builtins_and_main() {
        let mut w = Workbench::new();
        for name in ["NOT", "BFR", "AND", "OR", "NAND", "XOR"] {
            assert!(w.find_chip(name).is_some(), "missing builtin {}", name);
        }
        let main = w.main_chip();
        assert_eq!(w.current_chip(), main);
        let info = w.chip_info(main).unwrap();
        assert_eq!(info.name, MAIN_CHIP_NAME);
        assert_eq!(info.color, "#e81f10");
        assert!(!info.primitive);
        assert_eq!((info.n_inputs, info.n_outputs), (0, 0));
        assert_eq!(w.delete_chip(main).unwrap_err(), EngineError::ProtectedChip);
    }

    #[test]
    fn not_gate_inverts() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("T", &["A"], &["Q"]);
        let g = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
        w.connect(c, GateOutput(g, 0), ChipOutput(0)).unwrap();

        // input low from the start
        assert!(w.pin_value(c, ChipOutput(0)).unwrap());
        w.set_input(c, 0, true).unwrap();
        assert!(!w.pin_value(c, ChipOutput(0)).unwrap());
        w.set_input(c, 0, false).unwrap();
        assert!(w.pin_value(c, ChipOutput(0)).unwrap());
    }

    #[test]
    fn or_matches_truth_table() {
        let mut w = Workbench::new();
        let or = builtin(&w, "OR");
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            assert_eq!(w.evaluate(or, &[a, b]).unwrap(), vec![a || b]);
        }
    }

    #[test]
    fn de_morgan_composite_behaves_like_and() {
        let mut w = Workbench::new();
        let c = de_morgan_and(&mut w);
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            assert_eq!(w.evaluate(c, &[a, b]).unwrap(), vec![a && b], "{} {}", a, b);
        }
    }

    #[test]
    fn nested_composite_drives_outer_output() {
        let mut w = Workbench::new();
        let and2 = de_morgan_and(&mut w);
        let m = w.main_chip();
        w.add_input(m, "X").unwrap();
        w.add_input(m, "Y").unwrap();
        w.add_output(m, "Z").unwrap();
        let g = w.place_gate(m, and2, pos()).unwrap();
        w.connect(m, ChipInput(0), GateInput(g, 0)).unwrap();
        w.connect(m, ChipInput(1), GateInput(g, 1)).unwrap();
        w.connect(m, GateOutput(g, 0), ChipOutput(0)).unwrap();

        w.set_input(m, 0, true).unwrap();
        assert!(!w.pin_value(m, ChipOutput(0)).unwrap());
        let report = w.set_input(m, 1, true).unwrap();
        assert!(w.pin_value(m, ChipOutput(0)).unwrap());
        assert!(report.converged);
        assert!(report.changed.contains(&ChipOutput(0)));
    }

    #[test]
    fn fan_out_evaluates_each_gate_once() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("FAN", &["A"], &["P", "Q", "R"]);
        for k in 0..3 {
            let g = w.place_gate(c, not, pos()).unwrap();
            w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
            w.connect(c, GateOutput(g, 0), ChipOutput(k)).unwrap();
        }
        let report = w.set_input(c, 0, true).unwrap();
        assert_eq!(report.iterations, 3);
        for k in 0..3 {
            assert!(!w.pin_value(c, ChipOutput(k)).unwrap());
        }
    }

    #[test]
    fn chain_settles_within_its_depth() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("CHAIN", &["A"], &["Q"]);
        let mut prev = ChipInput(0);
        for _ in 0..8 {
            let g = w.place_gate(c, not, pos()).unwrap();
            w.connect(c, prev, GateInput(g, 0)).unwrap();
            prev = GateOutput(g, 0);
        }
        w.connect(c, prev, ChipOutput(0)).unwrap();

        let report = w.set_input(c, 0, true).unwrap();
        assert_eq!(report.iterations, 8);
        // even number of inversions
        assert!(w.pin_value(c, ChipOutput(0)).unwrap());
    }

    #[test]
    fn redundant_set_runs_no_pass() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("T", &["A"], &["Q"]);
        let g = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
        let report = w.set_input(c, 0, false).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.changed.is_empty());
        assert!(report.converged);
    }

    #[test]
    fn not_loop_is_reported_non_convergent() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("OSC", &[], &[]);
        let g = w.place_gate(c, not, pos()).unwrap();
        let err = w.connect(c, GateOutput(g, 0), GateInput(g, 0)).unwrap_err();
        assert!(matches!(err, EngineError::NonConvergent { .. }));
        assert!(!w.last_settle().converged);
        // the wire stays; the pins hold their last computed values
        assert_eq!(w.wires(c).unwrap().len(), 1);

        // the bench is still usable afterwards
        w.disconnect(c, GateInput(g, 0)).unwrap();
        assert!(w.last_settle().converged);
    }

    #[test]
    fn second_driver_is_rejected() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("T", &["A", "B"], &[]);
        let g = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
        let err = w.connect(c, ChipInput(1), GateInput(g, 0)).unwrap_err();
        assert_eq!(err, EngineError::AlreadyDriven(GateInput(g, 0)));
        let wires = w.wires(c).unwrap();
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].upstream, ChipInput(0));
    }

    #[test]
    fn wrong_roles_are_rejected() {
        let mut w = Workbench::new();
        let c = w.define_composite("T", &["A"], &["Q"]);
        assert!(matches!(
            w.connect(c, ChipOutput(0), ChipInput(0)).unwrap_err(),
            EngineError::TypeMismatch(..)
        ));
        assert!(matches!(
            w.connect(c, ChipInput(0), ChipInput(0)).unwrap_err(),
            EngineError::TypeMismatch(..)
        ));
    }

    #[test]
    fn self_placement_is_rejected() {
        let mut w = Workbench::new();
        let c = w.define_composite("SELF", &["A"], &["Q"]);
        assert_eq!(
            w.place_gate(c, c, pos()).unwrap_err(),
            EngineError::StructuralRecursion { host: c, placed: c }
        );
    }

    #[test]
    fn mutual_placement_is_rejected() {
        let mut w = Workbench::new();
        let a = w.define_composite("A", &[], &[]);
        let b = w.define_composite("B", &[], &[]);
        w.place_gate(a, b, pos()).unwrap();
        assert_eq!(
            w.place_gate(b, a, pos()).unwrap_err(),
            EngineError::StructuralRecursion { host: b, placed: a }
        );
    }

    #[test]
    fn placing_into_a_primitive_is_rejected() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let or = builtin(&w, "OR");
        assert_eq!(
            w.place_gate(not, or, pos()).unwrap_err(),
            EngineError::NotComposite(not)
        );
    }

    #[test]
    fn delete_refuses_while_instantiated() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("C", &[], &[]);
        let g = w.place_gate(c, not, pos()).unwrap();
        assert_eq!(w.delete_chip(not).unwrap_err(), EngineError::InUse(not, 1));

        w.remove_gate(c, g).unwrap();
        w.delete_chip(not).unwrap();
        assert!(w.find_chip("NOT").is_none());
    }

    #[test]
    fn deleting_the_open_chip_falls_back_to_main() {
        let mut w = Workbench::new();
        let c = w.define_composite("C", &[], &[]);
        w.open_chip(c).unwrap();
        w.delete_chip(c).unwrap();
        assert_eq!(w.current_chip(), w.main_chip());
        assert_eq!(w.chip_info(c).unwrap_err(), EngineError::UnknownChip(c));
    }

    #[test]
    fn floating_pin_keeps_last_value() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("T", &["A"], &["Q"]);
        let g = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
        w.connect(c, GateOutput(g, 0), ChipOutput(0)).unwrap();
        w.set_input(c, 0, true).unwrap();
        assert!(w.pin_value(c, GateInput(g, 0)).unwrap());

        w.disconnect(c, GateInput(g, 0)).unwrap();
        let report = w.set_input(c, 0, false).unwrap();
        // nothing listens to the chip input anymore
        assert_eq!(report.iterations, 0);
        assert!(w.pin_value(c, GateInput(g, 0)).unwrap());
        assert!(!w.pin_value(c, ChipOutput(0)).unwrap());
    }

    #[test]
    fn interface_growth_stales_old_instances() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("INV", &["A"], &["Q"]);
        let g = w.place_gate(c, not, pos()).unwrap();
        w.connect(c, ChipInput(0), GateInput(g, 0)).unwrap();
        w.connect(c, GateOutput(g, 0), ChipOutput(0)).unwrap();

        let h = w.define_composite("H", &["X"], &["Z"]);
        let gh = w.place_gate(h, c, pos()).unwrap();
        w.connect(h, ChipInput(0), GateInput(gh, 0)).unwrap();
        w.connect(h, GateOutput(gh, 0), ChipOutput(0)).unwrap();

        w.add_input(c, "B").unwrap();
        assert_eq!(
            w.set_input(h, 0, true).unwrap_err(),
            EngineError::ArityMismatch { expected: 2, got: 1 }
        );
    }

    #[test]
    fn evaluate_checks_input_arity() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        assert_eq!(
            w.evaluate(not, &[true, false]).unwrap_err(),
            EngineError::ArityMismatch { expected: 1, got: 2 }
        );
    }

    #[test]
    fn truth_table_of_builtin_xor() {
        let mut w = Workbench::new();
        let xor = builtin(&w, "XOR");
        let t = w.truth_table(xor).unwrap();
        assert_eq!(t.inputs, ["A", "B"]);
        assert_eq!(t.outputs, ["OUT"]);
        let outs: Vec<bool> = t.rows.iter().map(|(_, o)| o[0]).collect();
        assert_eq!(outs, vec![false, true, true, false]);
    }

    #[test]
    fn connect_reports_the_pins_it_moved() {
        let mut w = Workbench::new();
        let not = builtin(&w, "NOT");
        let c = w.define_composite("T", &[], &["Q"]);
        let g = w.place_gate(c, not, pos()).unwrap();
        // unwired NOT already holds its output high
        let report = w.connect(c, GateOutput(g, 0), ChipOutput(0)).unwrap();
        assert_eq!(report.changed, vec![ChipOutput(0)]);
        assert!(w.pin_value(c, ChipOutput(0)).unwrap());
    }
}
