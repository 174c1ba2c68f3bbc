//! Garbled row reduction: the (0, 0)-select row is derived, not sent.

use rand::RngCore;

use crate::circuit::GateKind;
use crate::crypto;
use crate::error::Result;
use crate::garbled::GarbledTable;
use crate::label::{Label, SERIALIZED_LEN, VALUE_LEN};
use crate::wire::Wire;

use super::{BINARY_COMBOS, GarbleContext, Scheme, expect_right, expect_rows, row_index};

/// Row reduction over point-and-permute tables.
///
/// Rows are keyed by the composite key of the two input labels (one AEAD
/// layer). The row both input select bits index as (0, 0) is never
/// transmitted: its output label is fixed to the zero-ciphertext body
/// under those two labels, which the evaluator can recompute on its own.
#[derive(Debug)]
pub struct Grr3;

impl Scheme for Grr3 {
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
        garble_gate(ctx, kind, left, right, None)
    }

    fn evaluate_gate(
        &self,
        kind: GateKind,
        _gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label> {
        evaluate_gate(kind, table, left, right, false)
    }
}

/// Garble one gate with row reduction.
///
/// With `offset` set (Free-XOR, FleXOR, Half-Gates fallback), the output
/// wire is an offset wire built around the derived row-zero label, so
/// the caller's offset invariant survives the reduction.
pub(crate) fn garble_gate(
    ctx: &mut GarbleContext<'_>,
    kind: GateKind,
    left: &Wire,
    right: Option<&Wire>,
    offset: Option<[u8; VALUE_LEN]>,
) -> Result<(Wire, GarbledTable)> {
    if kind.is_unary() {
        return garble_not(ctx, left, offset);
    }

    let right = expect_right(right, kind)?;
    let table = kind.truth_table();

    // Semantic bits of the two select-0 labels pick the derived row.
    let a0 = left.bit_with_clear_select();
    let b0 = right.bit_with_clear_select();
    let v0 = table[row_index(a0, b0)];
    let constructed = row_zero_label(left.label(a0), right.label(b0), offset.is_some())?;
    let out = output_wire(ctx, constructed, v0, offset);

    let mut rows = vec![Vec::new(); 3];
    for (a, b) in BINARY_COMBOS {
        if (a, b) == (a0, b0) {
            continue;
        }
        let l = left.label(a);
        let r = right.label(b);
        let position = row_index(l.select(), r.select());
        let key = crypto::derive_key(l.value(), r.value());
        let out_bit = table[row_index(a, b)];
        rows[position - 1] = crypto::encrypt(ctx.rng, &key, &out.label(out_bit).to_bytes())?;
    }

    Ok((out, GarbledTable::Rows(rows)))
}

/// Evaluate one row-reduced gate.
///
/// `derived_select` tells how the row-zero label's select bit is read:
/// from the low bit of its value (offset schemes) or from the trailing
/// serialization byte (plain GRR3).
pub(crate) fn evaluate_gate(
    kind: GateKind,
    table: &GarbledTable,
    left: &Label,
    right: Option<&Label>,
    derived_select: bool,
) -> Result<Label> {
    if kind.is_unary() {
        let rows = expect_rows(table, 1)?;
        return if left.select() {
            let key = crypto::derive_key(left.value(), left.value());
            Label::from_bytes(&crypto::decrypt(&key, &rows[0])?)
        } else {
            row_zero_label(left, left, derived_select)
        };
    }

    let right = expect_right(right, kind)?;
    let rows = expect_rows(table, 3)?;
    let position = row_index(left.select(), right.select());
    if position == 0 {
        row_zero_label(left, right, derived_select)
    } else {
        let key = crypto::derive_key(left.value(), right.value());
        Label::from_bytes(&crypto::decrypt(&key, &rows[position - 1])?)
    }
}

fn garble_not(
    ctx: &mut GarbleContext<'_>,
    left: &Wire,
    offset: Option<[u8; VALUE_LEN]>,
) -> Result<(Wire, GarbledTable)> {
    let a0 = left.bit_with_clear_select();
    let v0 = !a0;
    let select_zero = left.label(a0);
    let constructed = row_zero_label(select_zero, select_zero, offset.is_some())?;
    let out = output_wire(ctx, constructed, v0, offset);

    // One transmitted row, opened by the select-1 input label.
    let l1 = left.label(!a0);
    let key = crypto::derive_key(l1.value(), l1.value());
    let row = crypto::encrypt(ctx.rng, &key, &out.label(a0).to_bytes())?;
    Ok((out, GarbledTable::Rows(vec![row])))
}

/// The output label of the untransmitted row, computed identically by
/// both parties from the zero ciphertext of the two select-0 labels.
fn row_zero_label(left: &Label, right: &Label, derived_select: bool) -> Result<Label> {
    let ciphertext = crypto::zero_ciphertext(left.value(), right.value(), SERIALIZED_LEN);
    let body = crypto::zero_ciphertext_body(&ciphertext, SERIALIZED_LEN);

    if derived_select {
        let mut value = [0u8; VALUE_LEN];
        value.copy_from_slice(&body[..VALUE_LEN]);
        Ok(Label::derived(value))
    } else {
        Label::from_bytes(body)
    }
}

fn output_wire(
    ctx: &mut GarbleContext<'_>,
    constructed: Label,
    constructed_bit: bool,
    offset: Option<[u8; VALUE_LEN]>,
) -> Wire {
    match offset {
        Some(r) => {
            if constructed_bit {
                Wire::from_true_label(constructed, r)
            } else {
                Wire::from_false_label(constructed, r)
            }
        }
        None => {
            let mut other_value = [0u8; VALUE_LEN];
            ctx.rng.fill_bytes(&mut other_value);
            let other = Label::new(other_value, !constructed.select());
            if constructed_bit {
                Wire::from_labels(other, constructed)
            } else {
                Wire::from_labels(constructed, other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::SchemeKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_row_zero_label_matches_on_both_sides() {
        let mut rng = ChaCha12Rng::seed_from_u64(41);
        let mut ctx = GarbleContext::new(SchemeKind::Grr3, &mut rng);

        let left = Grr3.input_wire(&mut ctx);
        let right = Grr3.input_wire(&mut ctx);
        let (out, table) = Grr3
            .garble_gate(&mut ctx, GateKind::And, 0, &left, Some(&right))
            .unwrap();

        // The input assignment whose labels both carry select bit 0.
        let a0 = left.bit_with_clear_select();
        let b0 = right.bit_with_clear_select();
        let evaluated = Grr3
            .evaluate_gate(GateKind::And, 0, &table, left.label(a0), Some(right.label(b0)))
            .unwrap();
        assert_eq!(&evaluated, out.label(a0 && b0));
    }

    #[test]
    fn test_transmitted_rows_sit_at_select_positions() {
        let mut rng = ChaCha12Rng::seed_from_u64(43);
        let mut ctx = GarbleContext::new(SchemeKind::Grr3, &mut rng);

        let left = Grr3.input_wire(&mut ctx);
        let right = Grr3.input_wire(&mut ctx);
        let (out, table) = Grr3
            .garble_gate(&mut ctx, GateKind::Xor, 0, &left, Some(&right))
            .unwrap();
        let rows = match &table {
            GarbledTable::Rows(rows) => rows,
            other => panic!("expected rows, got {other:?}"),
        };
        assert_eq!(rows.len(), 3);

        for (a, b) in BINARY_COMBOS {
            let l = left.label(a);
            let r = right.label(b);
            let position = row_index(l.select(), r.select());
            if position == 0 {
                continue;
            }
            let key = crypto::derive_key(l.value(), r.value());
            let plaintext = crypto::decrypt(&key, &rows[position - 1]).unwrap();
            let label = Label::from_bytes(&plaintext).unwrap();
            assert_eq!(&label, out.label(a ^ b));
        }
    }
}
