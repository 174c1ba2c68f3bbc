use serde::{Deserialize, Serialize};

use crate::circuit::GateKind;

/// Per-gate garbled material, shaped by the active scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GarbledTable {
    /// Ciphertext rows. Classical and point-and-permute ship 4 (2 for
    /// NOT), row reduction ships 3 (1 for NOT), half-gates ships 2.
    Rows(Vec<Vec<u8>>),
    /// Offset-translation ciphertexts for a FleXOR XOR gate, one per
    /// input wire whose offset disagrees with the output wire's.
    Translate {
        /// Rekey ciphertext for the left input, if translated.
        left: Option<Vec<u8>>,
        /// Rekey ciphertext for the right input, if translated.
        right: Option<Vec<u8>>,
    },
    /// No ciphertexts at all (free gates).
    Free,
}

impl GarbledTable {
    /// Total number of ciphertexts this table carries.
    pub fn ciphertext_count(&self) -> usize {
        match self {
            GarbledTable::Rows(rows) => rows.len(),
            GarbledTable::Translate { left, right } => {
                left.is_some() as usize + right.is_some() as usize
            }
            GarbledTable::Free => 0,
        }
    }
}

/// A garbled gate input: an input-wire identifier leaf or a nested gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GarbledInput {
    /// Leaf referencing an input wire. Input leaves are the only wire
    /// identifiers a cleaned circuit retains; they position the label
    /// transfers and the OT rounds.
    Wire(String),
    /// Nested garbled sub-gate.
    Gate(Box<GarbledGate>),
}

/// One gate of the cleaned circuit: structure and garbled table only,
/// labels and offsets stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarbledGate {
    /// Post-order gate index, shared by both parties so per-gate key
    /// tweaks agree.
    pub id: u32,
    /// Boolean operation.
    pub kind: GateKind,
    /// Left input.
    pub left: GarbledInput,
    /// Right input; absent for NOT.
    pub right: Option<GarbledInput>,
    /// Garbled material for this gate.
    pub table: GarbledTable,
}

/// The cleaned circuit the garbler transmits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarbledCircuit {
    /// The output gate.
    pub root: GarbledGate,
}

impl GarbledCircuit {
    /// Number of gates in the tree.
    pub fn gate_count(&self) -> u64 {
        count_gates(&self.root)
    }

    /// Total ciphertexts across every garbled table.
    pub fn ciphertext_count(&self) -> usize {
        sum_ciphertexts(&self.root)
    }
}

fn count_gates(gate: &GarbledGate) -> u64 {
    let mut count = 1;
    for input in [Some(&gate.left), gate.right.as_ref()].into_iter().flatten() {
        if let GarbledInput::Gate(sub) = input {
            count += count_gates(sub);
        }
    }
    count
}

fn sum_ciphertexts(gate: &GarbledGate) -> usize {
    let mut total = gate.table.ciphertext_count();
    for input in [Some(&gate.left), gate.right.as_ref()].into_iter().flatten() {
        if let GarbledInput::Gate(sub) = input {
            total += sum_ciphertexts(sub);
        }
    }
    total
}
