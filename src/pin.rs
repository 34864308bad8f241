use std::collections::HashSet;

use crate::types::GateId;

/// A single boolean signal line. Pins only hold state; deciding who must
/// re-evaluate after a change is the settle pass's job.
#[derive(Clone, Debug)]
pub struct Pin {
    pub name: String,
    value: bool,
    subscribers: HashSet<GateId>,
}

impl Pin {
    pub fn new(name: &str) -> Pin {
        Pin {
            name: name.to_string(),
            value: false,
            subscribers: HashSet::new(),
        }
    }

    /// Fresh copy of a template pin: same name, low, nobody listening.
    pub(crate) fn clone_template(&self) -> Pin {
        Pin::new(&self.name)
    }

    pub fn read(&self) -> bool {
        self.value
    }

    /// Stores the new value and says whether anything changed. Does not
    /// schedule any re-evaluation.
    pub fn set_value(&mut self, value: bool) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    pub fn subscribe(&mut self, gate: GateId) {
        self.subscribers.insert(gate);
    }

    pub fn unsubscribe(&mut self, gate: GateId) {
        self.subscribers.remove(&gate);
    }

    pub fn subscribers(&self) -> impl Iterator<Item = GateId> + '_ {
        self.subscribers.iter().copied()
    }
}
