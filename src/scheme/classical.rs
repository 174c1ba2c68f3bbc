//! Classical Yao garbling: four shuffled rows, trial decryption.

use rand::seq::SliceRandom;

use crate::circuit::GateKind;
use crate::error::{GabesError, Result};
use crate::garbled::GarbledTable;
use crate::label::Label;
use crate::wire::Wire;

use super::{
    BINARY_COMBOS, GarbleContext, Scheme, expect_right, expect_rows, nested_decrypt,
    nested_encrypt, row_index, single_decrypt, single_encrypt,
};

/// The original construction: every row is a nested AEAD encryption of
/// the output label, the rows are uniformly shuffled, and the evaluator
/// finds the right one by letting the authentication tag speak.
#[derive(Debug)]
pub struct Classical;

impl Scheme for Classical {
    fn input_wire(&self, ctx: &mut GarbleContext<'_>) -> Wire {
        Wire::fresh(ctx.rng)
    }

    fn garble_gate(
        &self,
        ctx: &mut GarbleContext<'_>,
        kind: GateKind,
        _gid: u32,
        left: &Wire,
        right: Option<&Wire>,
    ) -> Result<(Wire, GarbledTable)> {
        let out = Wire::fresh(ctx.rng);
        let mut rows = Vec::new();

        if kind.is_unary() {
            for a in [false, true] {
                rows.push(single_encrypt(ctx.rng, left.label(a), out.label(!a))?);
            }
        } else {
            let right = expect_right(right, kind)?;
            let table = kind.truth_table();
            for (a, b) in BINARY_COMBOS {
                let out_bit = table[row_index(a, b)];
                rows.push(nested_encrypt(
                    ctx.rng,
                    left.label(a),
                    right.label(b),
                    out.label(out_bit),
                )?);
            }
        }

        rows.shuffle(ctx.rng);
        Ok((out, GarbledTable::Rows(rows)))
    }

    fn evaluate_gate(
        &self,
        kind: GateKind,
        _gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label> {
        if kind.is_unary() {
            let rows = expect_rows(table, 2)?;
            for row in rows {
                if let Ok(label) = single_decrypt(left, row) {
                    return Ok(label);
                }
            }
        } else {
            let right = expect_right(right, kind)?;
            let rows = expect_rows(table, 4)?;
            for row in rows {
                // Wrong rows fail authentication; exactly one survives.
                if let Ok(label) = nested_decrypt(left, right, row) {
                    return Ok(label);
                }
            }
        }

        Err(GabesError::Decryption(
            "no garbled row authenticated under the held labels".to_string(),
        ))
    }
}
