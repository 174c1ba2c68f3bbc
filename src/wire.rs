use rand::RngCore;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::label::{self, Label, VALUE_LEN};

/// A circuit wire as the garbler sees it: both labels, and the offset R
/// when an offset scheme is active.
///
/// The evaluator never holds a `Wire`; it only ever owns one [`Label`]
/// per wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    false_label: Label,
    true_label: Label,
    offset: Option<[u8; VALUE_LEN]>,
}

impl Wire {
    /// Draw a fresh wire with two independent labels and opposite,
    /// randomly assigned select bits.
    pub fn fresh(rng: &mut ChaCha12Rng) -> Self {
        let false_label = Label::random(rng);
        let mut true_value = [0u8; VALUE_LEN];
        rng.fill_bytes(&mut true_value);

        Wire {
            false_label,
            true_label: Label::new(true_value, !false_label.select()),
            offset: None,
        }
    }

    /// Draw a wire whose true label is `false.value XOR offset`.
    ///
    /// The offset's low bit must be 1 (see [`random_offset`]), which
    /// makes the low-bit-derived select bits of the pair opposite.
    pub fn with_offset(rng: &mut ChaCha12Rng, offset: [u8; VALUE_LEN]) -> Self {
        let mut false_value = [0u8; VALUE_LEN];
        rng.fill_bytes(&mut false_value);
        Wire::from_false_label(Label::derived(false_value), offset)
    }

    /// Build an offset wire from a known false label.
    pub fn from_false_label(false_label: Label, offset: [u8; VALUE_LEN]) -> Self {
        let true_label = Label::derived(label::xor(false_label.value(), &offset));
        Wire {
            false_label,
            true_label,
            offset: Some(offset),
        }
    }

    /// Build an offset wire from a known true label.
    pub fn from_true_label(true_label: Label, offset: [u8; VALUE_LEN]) -> Self {
        let false_label = Label::derived(label::xor(true_label.value(), &offset));
        Wire {
            false_label,
            true_label,
            offset: Some(offset),
        }
    }

    /// Build a wire from an explicit label pair (no offset).
    pub fn from_labels(false_label: Label, true_label: Label) -> Self {
        Wire {
            false_label,
            true_label,
            offset: None,
        }
    }

    /// The label carrying the given semantic bit.
    pub fn label(&self, bit: bool) -> &Label {
        if bit { &self.true_label } else { &self.false_label }
    }

    /// Label representing logical 0.
    pub fn false_label(&self) -> &Label {
        &self.false_label
    }

    /// Label representing logical 1.
    pub fn true_label(&self) -> &Label {
        &self.true_label
    }

    /// The wire offset, when one was used.
    pub fn offset(&self) -> Option<&[u8; VALUE_LEN]> {
        self.offset.as_ref()
    }

    /// The semantic bit of the label whose select bit is 0.
    ///
    /// Row-reduction needs this to know which truth-table row the
    /// untransmitted (0, 0) ciphertext stands for.
    pub fn bit_with_clear_select(&self) -> bool {
        self.false_label.select()
    }
}

/// Draw a random 128-bit offset with its low bit forced to 1.
pub fn random_offset(rng: &mut ChaCha12Rng) -> [u8; VALUE_LEN] {
    let mut offset = [0u8; VALUE_LEN];
    rng.fill_bytes(&mut offset);
    offset[VALUE_LEN - 1] |= 1;
    offset
}
