/// Stable identifier of a chip definition. Monotonic per workbench,
/// never reused after a deletion.
pub type ChipId = u32;

/// Stable identifier of a gate within one chip body. Monotonic per body.
pub type GateId = u32;

/// Evaluation rule of a primitive chip: a pure function from the full
/// input vector to the full output vector.
pub type LogicRule = fn(&[bool]) -> Vec<bool>;

/// Name of the root chip every workbench starts with.
pub const MAIN_CHIP_NAME: &str = "MAIN";

pub(crate) const MAIN_CHIP_COLOR: &str = "#e81f10";

pub(crate) const CHIP_PALETTE: [&str; 8] = [
    "#e74c3c", "#e67e22", "#f1c40f", "#2ecc71", "#1abc9c", "#3498db",
    "#9b59b6", "#7f8c8d",
];

pub(crate) fn default_color(id: ChipId) -> &'static str {
    CHIP_PALETTE[id as usize % CHIP_PALETTE.len()]
}

/// Where a gate sits on the canvas. Carried for the renderer, ignored by
/// the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Position {
        Position { x, y }
    }
}
