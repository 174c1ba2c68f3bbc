//! Point-and-permute: rows sorted by select bits, one decryption.

use crate::circuit::GateKind;
use crate::error::Result;
use crate::garbled::GarbledTable;
use crate::label::Label;
use crate::wire::Wire;

use super::{
    BINARY_COMBOS, GarbleContext, Scheme, expect_right, expect_rows, nested_decrypt,
    nested_encrypt, row_index, single_decrypt, single_encrypt,
};

/// Same ciphertext layout as classical, but each row sits at the
/// position named by the select bits of the input labels that open it,
/// so the evaluator decrypts exactly one row.
#[derive(Debug)]
pub struct PointAndPermute;

impl Scheme for PointAndPermute {
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

        if kind.is_unary() {
            let mut rows = vec![Vec::new(); 2];
            for a in [false, true] {
                let position = left.label(a).select() as usize;
                rows[position] = single_encrypt(ctx.rng, left.label(a), out.label(!a))?;
            }
            return Ok((out, GarbledTable::Rows(rows)));
        }

        let right = expect_right(right, kind)?;
        let table = kind.truth_table();
        let mut rows = vec![Vec::new(); 4];
        for (a, b) in BINARY_COMBOS {
            let out_bit = table[row_index(a, b)];
            let position = row_index(left.label(a).select(), right.label(b).select());
            rows[position] = nested_encrypt(ctx.rng, left.label(a), right.label(b), out.label(out_bit))?;
        }

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
            return single_decrypt(left, &rows[left.select() as usize]);
        }

        let right = expect_right(right, kind)?;
        let rows = expect_rows(table, 4)?;
        let position = row_index(left.select(), right.select());
        // The select bits name the row; a failure here is fatal.
        nested_decrypt(left, right, &rows[position])
    }
}
