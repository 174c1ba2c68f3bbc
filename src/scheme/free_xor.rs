//! Free-XOR: one global offset, XOR gates cost nothing.

use crate::circuit::GateKind;
use crate::error::{GabesError, Result};
use crate::garbled::GarbledTable;
use crate::label::{self, Label};
use crate::wire::Wire;

use super::{GarbleContext, Scheme, expect_right, grr3};

/// Free-XOR garbling.
///
/// Every wire carries the same circuit-global offset R (low bit 1), so
/// an XOR gate is just `out_0 = left_0 XOR right_0` with no ciphertexts.
/// Every other gate kind falls back to row reduction built around the
/// same offset.
#[derive(Debug)]
pub struct FreeXor;

impl Scheme for FreeXor {
    fn input_wire(&self, ctx: &mut GarbleContext<'_>) -> Wire {
        let offset = ctx
            .global_offset
            .expect("free-XOR garbling context carries a global offset");
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
        let offset = ctx
            .global_offset
            .expect("free-XOR garbling context carries a global offset");

        if kind == GateKind::Xor {
            let right = expect_right(right, kind)?;
            let false_value = label::xor(left.false_label().value(), right.false_label().value());
            let out = Wire::from_false_label(Label::derived(false_value), offset);
            return Ok((out, GarbledTable::Free));
        }

        grr3::garble_gate(ctx, kind, left, right, Some(offset))
    }

    fn evaluate_gate(
        &self,
        kind: GateKind,
        _gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label> {
        if kind == GateKind::Xor {
            let right = expect_right(right, kind)?;
            if *table != GarbledTable::Free {
                return Err(GabesError::Decryption(
                    "XOR gate carries ciphertexts the scheme does not expect".to_string(),
                ));
            }
            return Ok(xor_labels(left, right));
        }

        grr3::evaluate_gate(kind, table, left, right, true)
    }
}

/// XOR two labels into a low-bit-derived output label.
pub(crate) fn xor_labels(left: &Label, right: &Label) -> Label {
    Label::derived(label::xor(left.value(), right.value()))
}
