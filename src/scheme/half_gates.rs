//! Half-gates: two ciphertexts per AND-family gate, free XOR.

use sha2::{Digest, Sha256};

use crate::circuit::GateKind;
use crate::error::{GabesError, Result};
use crate::garbled::GarbledTable;
use crate::label::{self, Label, VALUE_LEN};
use crate::wire::Wire;

use super::{GarbleContext, Scheme, expect_right, expect_rows};

/// Half-gates garbling.
///
/// Wires share a global offset R and select bits are the low bits of
/// label values. An AND gate is split into a generator half and an
/// evaluator half, one ciphertext each. OR and NAND are the same
/// construction with the `(a XOR alpha) AND (b XOR beta) XOR gamma`
/// parametrization (input-label swaps plus an output swap), XOR and XNOR
/// are free, and NOT is a free label swap.
#[derive(Debug)]
pub struct HalfGates;

/// `(alpha, beta, gamma)` such that
/// `g(a, b) = ((a ^ alpha) & (b ^ beta)) ^ gamma`.
fn and_family_params(kind: GateKind) -> Option<(bool, bool, bool)> {
    match kind {
        GateKind::And => Some((false, false, false)),
        GateKind::Or => Some((true, true, true)),
        GateKind::Nand => Some((false, false, true)),
        _ => None,
    }
}

impl Scheme for HalfGates {
    fn input_wire(&self, ctx: &mut GarbleContext<'_>) -> Wire {
        let offset = ctx
            .global_offset
            .expect("half-gates garbling context carries a global offset");
        Wire::with_offset(ctx.rng, offset)
    }

    fn garble_gate(
        &self,
        ctx: &mut GarbleContext<'_>,
        kind: GateKind,
        gid: u32,
        left: &Wire,
        right: Option<&Wire>,
    ) -> Result<(Wire, GarbledTable)> {
        let offset = ctx
            .global_offset
            .expect("half-gates garbling context carries a global offset");

        match kind {
            GateKind::Xor => {
                let right = expect_right(right, kind)?;
                let value = label::xor(left.false_label().value(), right.false_label().value());
                let out = Wire::from_false_label(Label::derived(value), offset);
                Ok((out, GarbledTable::Free))
            }
            GateKind::Xnor => {
                let right = expect_right(right, kind)?;
                let value = label::xor(left.false_label().value(), right.false_label().value());
                let out = Wire::from_true_label(Label::derived(value), offset);
                Ok((out, GarbledTable::Free))
            }
            GateKind::Not => {
                // XOR with constant true: the label pair swaps meaning.
                let out = Wire::from_true_label(*left.false_label(), offset);
                Ok((out, GarbledTable::Free))
            }
            _ => {
                let right = expect_right(right, kind)?;
                let (alpha, beta, gamma) = and_family_params(kind)
                    .expect("every binary non-linear gate kind has AND-family parameters");
                Ok(garble_and_family(
                    offset, gid, left, right, alpha, beta, gamma,
                ))
            }
        }
    }

    fn evaluate_gate(
        &self,
        kind: GateKind,
        gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label> {
        match kind {
            GateKind::Xor | GateKind::Xnor => {
                let right = expect_right(right, kind)?;
                if *table != GarbledTable::Free {
                    return Err(GabesError::Decryption(
                        "linear gate carries ciphertexts the scheme does not expect".to_string(),
                    ));
                }
                Ok(super::free_xor::xor_labels(left, right))
            }
            GateKind::Not => {
                if *table != GarbledTable::Free {
                    return Err(GabesError::Decryption(
                        "NOT gate carries ciphertexts the scheme does not expect".to_string(),
                    ));
                }
                Ok(*left)
            }
            _ => {
                let right = expect_right(right, kind)?;
                evaluate_and_family(gid, table, left, right)
            }
        }
    }
}

fn garble_and_family(
    offset: [u8; VALUE_LEN],
    gid: u32,
    left: &Wire,
    right: &Wire,
    alpha: bool,
    beta: bool,
    gamma: bool,
) -> (Wire, GarbledTable) {
    // Input swaps: the label pair is re-based so the half-gate AND sees
    // (a ^ alpha, b ^ beta) as its inputs.
    let x0 = *left.label(alpha).value();
    let x1 = label::xor(&x0, &offset);
    let y0 = *right.label(beta).value();
    let y1 = label::xor(&y0, &offset);

    let p_a = x0[VALUE_LEN - 1] & 1 == 1;
    let p_b = y0[VALUE_LEN - 1] & 1 == 1;

    let (j, k) = tweaks(gid);
    let hx0 = hash(&x0, j);
    let hx1 = hash(&x1, j);
    let hy0 = hash(&y0, k);
    let hy1 = hash(&y1, k);

    // Generator half.
    let mut t_g = label::xor(&hx0, &hx1);
    if p_b {
        t_g = label::xor(&t_g, &offset);
    }
    let mut w_g = hx0;
    if p_a {
        w_g = label::xor(&w_g, &t_g);
    }

    // Evaluator half.
    let t_e = label::xor(&label::xor(&hy0, &hy1), &x0);
    let mut w_e = hy0;
    if p_b {
        w_e = label::xor(&w_e, &label::xor(&t_e, &x0));
    }

    let z0 = label::xor(&w_g, &w_e);
    let out = if gamma {
        Wire::from_true_label(Label::derived(z0), offset)
    } else {
        Wire::from_false_label(Label::derived(z0), offset)
    };

    let table = GarbledTable::Rows(vec![t_g.to_vec(), t_e.to_vec()]);
    (out, table)
}

fn evaluate_and_family(
    gid: u32,
    table: &GarbledTable,
    left: &Label,
    right: &Label,
) -> Result<Label> {
    let rows = expect_rows(table, 2)?;
    let t_g = row_block(&rows[0])?;
    let t_e = row_block(&rows[1])?;

    let s_a = left.select();
    let s_b = right.select();
    let (j, k) = tweaks(gid);

    let mut w_g = hash(left.value(), j);
    if s_a {
        w_g = label::xor(&w_g, &t_g);
    }

    let mut w_e = hash(right.value(), k);
    if s_b {
        w_e = label::xor(&w_e, &label::xor(&t_e, left.value()));
    }

    Ok(Label::derived(label::xor(&w_g, &w_e)))
}

/// Per-gate hash tweaks: one for each half.
fn tweaks(gid: u32) -> (u64, u64) {
    let base = 2 * gid as u64;
    (base, base + 1)
}

/// Hash a label value with a tweak: `SHA-256(value || tweak)[..16]`.
fn hash(value: &[u8; VALUE_LEN], tweak: u64) -> [u8; VALUE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(value);
    hasher.update(tweak.to_le_bytes());
    let digest = hasher.finalize();

    let mut out = [0u8; VALUE_LEN];
    out.copy_from_slice(&digest[..VALUE_LEN]);
    out
}

fn row_block(row: &[u8]) -> Result<[u8; VALUE_LEN]> {
    row.try_into().map_err(|_| {
        GabesError::Decryption(format!(
            "half-gate row must be {VALUE_LEN} bytes, got {}",
            row.len()
        ))
    })
}
