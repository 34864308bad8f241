use std::fmt;

/// Exhaustive behavior of one chip: every input combination and the
/// output vector it settles to, in counter order.
pub struct TruthTable {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub rows: Vec<(Vec<bool>, Vec<bool>)>,
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<&str> = self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .map(String::as_str)
            .collect();
        // each cell is "  label  |", values centered under the label
        let total: usize = cols.iter().map(|c| c.len() + 5).sum();

        writeln!(f, "|{}|", "¯".repeat(total.saturating_sub(1)))?;
        write!(f, "|")?;
        for c in &cols {
            write!(f, "  \x1b[33m{}\x1b[0m  |", c)?;
        }
        writeln!(f)?;
        writeln!(f, "|{}|", "-".repeat(total.saturating_sub(1)))?;
        for (ins, outs) in &self.rows {
            write!(f, "|")?;
            for (c, v) in cols.iter().zip(ins.iter().chain(outs.iter())) {
                let width = c.len() + 4;
                let left = width / 2;
                write!(
                    f,
                    "{}{}{}|",
                    " ".repeat(left),
                    if *v { '1' } else { '0' },
                    " ".repeat(width - left - 1)
                )?;
            }
            writeln!(f)?;
        }
        writeln!(f, "|{}|", "_".repeat(total.saturating_sub(1)))?;
        Ok(())
    }
}

/// Counts through all combinations of `bits` booleans, first column most
/// significant: 00, 01, 10, 11.
pub fn bitwise_counter(bits: usize) -> impl Iterator<Item = Vec<bool>> {
    let total = 1usize << bits;
    (0..total).map(move |n| {
        (0..bits)
            .map(|i| (n >> (bits - 1 - i)) & 1 == 1)
            .collect::<Vec<bool>>()
    })
}
