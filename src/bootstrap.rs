use crate::types::LogicRule;
use crate::workbench::Workbench;

/// Builtin primitive chips every workbench starts with.
pub(crate) fn bootstrap_chips(w: &mut Workbench) {
    builtin(w, "NOT", &["A"], &["OUT"], |v| vec![!v[0]]);
    // buffer
    builtin(w, "BFR", &["A"], &["OUT"], |v| vec![v[0]]);
    builtin(w, "AND", &["A", "B"], &["OUT"], |v| vec![v[0] && v[1]]);
    builtin(w, "OR", &["A", "B"], &["OUT"], |v| vec![v[0] || v[1]]);
    builtin(w, "NAND", &["A", "B"], &["OUT"], |v| vec![!(v[0] && v[1])]);
    builtin(w, "XOR", &["A", "B"], &["OUT"], |v| vec![v[0] != v[1]]);
}

fn builtin(w: &mut Workbench, name: &str, inputs: &[&str], outputs: &[&str], rule: LogicRule) {
    w.define_primitive(name, inputs, outputs, rule)
        .expect("builtin chip definition");
}
