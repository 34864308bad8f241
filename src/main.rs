use csim_engine::types::Position;
use csim_engine::wires::PinAddr::{ChipInput, ChipOutput, GateInput, GateOutput};
use csim_engine::workbench::Workbench;

fn main() {
    let mut bench = Workbench::new();
    let not = bench.find_chip("NOT").unwrap();
    let or = bench.find_chip("OR").unwrap();

    // AND out of OR and three NOTs
    let and2 = bench.define_composite("AND2", &["A", "B"], &["Q"]);
    let na = bench.place_gate(and2, not, Position::new(1.0, 0.0)).unwrap();
    let nb = bench.place_gate(and2, not, Position::new(1.0, 2.0)).unwrap();
    let o = bench.place_gate(and2, or, Position::new(2.0, 1.0)).unwrap();
    let nq = bench.place_gate(and2, not, Position::new(3.0, 1.0)).unwrap();

    bench.connect(and2, ChipInput(0), GateInput(na, 0)).unwrap();
    bench.connect(and2, ChipInput(1), GateInput(nb, 0)).unwrap();
    bench.connect(and2, GateOutput(na, 0), GateInput(o, 0)).unwrap();
    bench.connect(and2, GateOutput(nb, 0), GateInput(o, 1)).unwrap();
    bench.connect(and2, GateOutput(o, 0), GateInput(nq, 0)).unwrap();
    bench.connect(and2, GateOutput(nq, 0), ChipOutput(0)).unwrap();

    println!("{}", bench.truth_table(and2).unwrap());

    // drive it the way the editor would
    for (a, b) in [(true, false), (true, true)] {
        bench.set_input(and2, 0, a).unwrap();
        let report = bench.set_input(and2, 1, b).unwrap();
        println!(
            "A={} B={} -> Q={}  ({} pin(s) changed, {} iterations)",
            a as u8,
            b as u8,
            bench.pin_value(and2, ChipOutput(0)).unwrap() as u8,
            report.changed.len(),
            report.iterations,
        );
    }
}
