//! FleXOR: per-wire offsets, XOR gates pay only for disagreement.

use crate::circuit::GateKind;
use crate::crypto;
use crate::error::{GabesError, Result};
use crate::garbled::GarbledTable;
use crate::label::{self, Label};
use crate::wire::{self, Wire};

use super::{GarbleContext, Scheme, expect_right, grr3};

/// FleXOR garbling.
///
/// Every wire carries its own random offset. An XOR gate adopts the left
/// child's offset; an input wire whose offset disagrees is translated
/// with a single rekey ciphertext `Enc(w_true, aligned_true)`. An
/// evaluator holding the true label decrypts the aligned label, one
/// holding the false label keeps what it has. Non-XOR gates use row
/// reduction with a fresh per-wire offset.
#[derive(Debug)]
pub struct Flexor;

impl Scheme for Flexor {
    fn input_wire(&self, ctx: &mut GarbleContext<'_>) -> Wire {
        let offset = wire::random_offset(ctx.rng);
        Wire::with_offset(ctx.rng, offset)
    }

    fn garble_gate(
        &self,
        ctx: &mut GarbleContext<'_>,
        kind: GateKind,
        _gid: u32,
        left: &Wire,
        right: Option<&Wire>,
    ) -> Result<(Wire, GarbledTable)> {
        if kind != GateKind::Xor {
            let offset = wire::random_offset(ctx.rng);
            return grr3::garble_gate(ctx, kind, left, right, Some(offset));
        }

        let right = expect_right(right, kind)?;
        let target = *left.offset().ok_or_else(|| {
            GabesError::Protocol("FleXOR wire is missing its offset".to_string())
        })?;

        // Re-balance the right wire against the left wire's offset.
        let (aligned_right, translation) = if right.offset() == Some(&target) {
            (right.clone(), None)
        } else {
            let aligned = Wire::from_false_label(*right.false_label(), target);
            let ciphertext = crypto::encrypt(
                ctx.rng,
                right.true_label().value(),
                &aligned.true_label().to_bytes(),
            )?;
            (aligned, Some(ciphertext))
        };

        let false_value = label::xor(
            left.false_label().value(),
            aligned_right.false_label().value(),
        );
        let out = Wire::from_false_label(Label::derived(false_value), target);
        let table = GarbledTable::Translate {
            left: None,
            right: translation,
        };
        Ok((out, table))
    }

    fn evaluate_gate(
        &self,
        kind: GateKind,
        _gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label> {
        if kind != GateKind::Xor {
            return grr3::evaluate_gate(kind, table, left, right, true);
        }

        let right = expect_right(right, kind)?;
        let (left_translation, right_translation) = match table {
            GarbledTable::Translate { left, right } => (left.as_ref(), right.as_ref()),
            _ => {
                return Err(GabesError::Decryption(
                    "XOR gate table shape does not match FleXOR".to_string(),
                ));
            }
        };

        let left = translate(left, left_translation)?;
        let right = translate(right, right_translation)?;
        Ok(super::free_xor::xor_labels(&left, &right))
    }
}

/// Apply a rekey ciphertext to a held label.
///
/// Only the wire's true label opens the ciphertext; an authentication
/// failure means the held label is the false one, which the alignment
/// left untouched.
fn translate(held: &Label, translation: Option<&Vec<u8>>) -> Result<Label> {
    let Some(ciphertext) = translation else {
        return Ok(*held);
    };

    match crypto::decrypt(held.value(), ciphertext) {
        Ok(plaintext) => Label::from_bytes(&plaintext),
        Err(_) => Ok(*held),
    }
}
