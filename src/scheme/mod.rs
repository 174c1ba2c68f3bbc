//! The six garbling schemes behind one capability trait.
//!
//! Every scheme answers the same three questions: how input wires are
//! drawn, how a gate turns child wires into an output wire plus a
//! garbled table, and how the evaluator turns child labels plus that
//! table back into an output label.

use clap::ValueEnum;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::circuit::GateKind;
use crate::crypto;
use crate::error::{GabesError, Result};
use crate::garbled::GarbledTable;
use crate::label::{Label, VALUE_LEN};
use crate::wire::{self, Wire};

pub mod classical;
pub mod flexor;
pub mod free_xor;
pub mod grr3;
pub mod half_gates;
pub mod point_permute;

/// Which garbling scheme is active.
///
/// Both parties select the scheme out of band; a mismatch surfaces as a
/// decryption failure at the first gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SchemeKind {
    /// Four shuffled rows, trial decryption.
    Classical,
    /// Four rows indexed by select bits.
    PointAndPermute,
    /// Three rows; the first is derived instead of transmitted.
    Grr3,
    /// Global offset, XOR gates cost nothing, GRR3 elsewhere.
    FreeXor,
    /// Per-wire offsets with translation ciphertexts for XOR gates.
    Flexor,
    /// Two ciphertexts per AND-family gate, free XOR.
    HalfGates,
}

impl SchemeKind {
    /// Human-readable scheme name.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemeKind::Classical => "classical",
            SchemeKind::PointAndPermute => "point-and-permute",
            SchemeKind::Grr3 => "grr3",
            SchemeKind::FreeXor => "free-xor",
            SchemeKind::Flexor => "flexor",
            SchemeKind::HalfGates => "half-gates",
        }
    }
}

/// Mutable state threaded through one garbling traversal.
///
/// The global offset is explicit here rather than ambient: it exists for
/// exactly one garbling run and dies with it.
#[derive(Debug)]
pub struct GarbleContext<'a> {
    /// The run's CSPRNG.
    pub rng: &'a mut ChaCha12Rng,
    /// Circuit-global offset R; present under Free-XOR and Half-Gates.
    pub global_offset: Option<[u8; VALUE_LEN]>,
}

impl<'a> GarbleContext<'a> {
    /// Set up garbling state for the given scheme, drawing the global
    /// offset when the scheme requires one.
    pub fn new(kind: SchemeKind, rng: &'a mut ChaCha12Rng) -> Self {
        let global_offset = match kind {
            SchemeKind::FreeXor | SchemeKind::HalfGates => Some(wire::random_offset(rng)),
            _ => None,
        };
        GarbleContext { rng, global_offset }
    }
}

/// A garbling scheme: gate construction and gate decryption.
pub trait Scheme {
    /// Draw a fresh input wire the way this scheme requires.
    fn input_wire(&self, ctx: &mut GarbleContext<'_>) -> Wire;

    /// Garble one gate given its child wires, producing the output wire
    /// and the garbled table to transmit.
    fn garble_gate(
        &self,
        ctx: &mut GarbleContext<'_>,
        kind: GateKind,
        gid: u32,
        left: &Wire,
        right: Option<&Wire>,
    ) -> Result<(Wire, GarbledTable)>;

    /// Compute a gate's output label from one label per input wire.
    fn evaluate_gate(
        &self,
        kind: GateKind,
        gid: u32,
        table: &GarbledTable,
        left: &Label,
        right: Option<&Label>,
    ) -> Result<Label>;
}

/// Look up the implementation for a scheme selection.
pub fn scheme(kind: SchemeKind) -> Box<dyn Scheme> {
    match kind {
        SchemeKind::Classical => Box::new(classical::Classical),
        SchemeKind::PointAndPermute => Box::new(point_permute::PointAndPermute),
        SchemeKind::Grr3 => Box::new(grr3::Grr3),
        SchemeKind::FreeXor => Box::new(free_xor::FreeXor),
        SchemeKind::Flexor => Box::new(flexor::Flexor),
        SchemeKind::HalfGates => Box::new(half_gates::HalfGates),
    }
}

/// The four binary input combinations, in truth-table order.
pub(crate) const BINARY_COMBOS: [(bool, bool); 4] =
    [(false, false), (false, true), (true, false), (true, true)];

/// Row index for a pair of bits: `(a << 1) | b`.
pub(crate) fn row_index(a: bool, b: bool) -> usize {
    ((a as usize) << 1) | b as usize
}

/// Nested double encryption of an output label: the outer layer is keyed
/// by the left input label, the inner by the right.
pub(crate) fn nested_encrypt(
    rng: &mut ChaCha12Rng,
    left: &Label,
    right: &Label,
    output: &Label,
) -> Result<Vec<u8>> {
    let inner = crypto::encrypt(rng, right.value(), &output.to_bytes())?;
    crypto::encrypt(rng, left.value(), &inner)
}

/// Undo [`nested_encrypt`]. Fails if either AEAD layer rejects.
pub(crate) fn nested_decrypt(left: &Label, right: &Label, row: &[u8]) -> Result<Label> {
    let inner = crypto::decrypt(left.value(), row)?;
    let plaintext = crypto::decrypt(right.value(), &inner)?;
    Label::from_bytes(&plaintext)
}

/// Single-layer encryption of an output label under one input label.
/// Used for NOT rows, which have only one key.
pub(crate) fn single_encrypt(
    rng: &mut ChaCha12Rng,
    input: &Label,
    output: &Label,
) -> Result<Vec<u8>> {
    crypto::encrypt(rng, input.value(), &output.to_bytes())
}

/// Undo [`single_encrypt`].
pub(crate) fn single_decrypt(input: &Label, row: &[u8]) -> Result<Label> {
    let plaintext = crypto::decrypt(input.value(), row)?;
    Label::from_bytes(&plaintext)
}

/// Extract ciphertext rows, or fail as a scheme mismatch.
pub(crate) fn expect_rows(table: &GarbledTable, expected: usize) -> Result<&[Vec<u8>]> {
    match table {
        GarbledTable::Rows(rows) if rows.len() == expected => Ok(rows),
        GarbledTable::Rows(rows) => Err(GabesError::Decryption(format!(
            "garbled table has {} rows, scheme expects {expected}",
            rows.len()
        ))),
        _ => Err(GabesError::Decryption(
            "garbled table shape does not match scheme".to_string(),
        )),
    }
}

/// The right wire of a binary gate, or a protocol failure if the circuit
/// is malformed enough to miss one.
pub(crate) fn expect_right<T>(right: Option<T>, kind: GateKind) -> Result<T> {
    right.ok_or_else(|| {
        GabesError::Protocol(format!("{} gate is missing its right input", kind.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const ALL_SCHEMES: [SchemeKind; 6] = [
        SchemeKind::Classical,
        SchemeKind::PointAndPermute,
        SchemeKind::Grr3,
        SchemeKind::FreeXor,
        SchemeKind::Flexor,
        SchemeKind::HalfGates,
    ];

    const ALL_KINDS: [GateKind; 6] = [
        GateKind::And,
        GateKind::Or,
        GateKind::Xor,
        GateKind::Nand,
        GateKind::Xnor,
        GateKind::Not,
    ];

    /// For every scheme and gate kind, the label the evaluator computes
    /// must be the garbler's label for the true output bit, on every
    /// input assignment.
    #[test]
    fn test_every_scheme_garbles_every_gate_correctly() {
        for scheme_kind in ALL_SCHEMES {
            let implementation = scheme(scheme_kind);
            let mut rng = ChaCha12Rng::seed_from_u64(99);
            let mut ctx = GarbleContext::new(scheme_kind, &mut rng);

            for gate_kind in ALL_KINDS {
                let left = implementation.input_wire(&mut ctx);
                let right = implementation.input_wire(&mut ctx);
                let right_ref = (!gate_kind.is_unary()).then_some(&right);

                let (out, table) = implementation
                    .garble_gate(&mut ctx, gate_kind, 0, &left, right_ref)
                    .unwrap();

                if gate_kind.is_unary() {
                    for a in [false, true] {
                        let result = implementation
                            .evaluate_gate(gate_kind, 0, &table, left.label(a), None)
                            .unwrap();
                        assert_eq!(
                            &result,
                            out.label(!a),
                            "{} NOT({a}) under {}",
                            gate_kind.as_str(),
                            scheme_kind.as_str()
                        );
                    }
                } else {
                    for (a, b) in BINARY_COMBOS {
                        let expected = gate_kind.apply(a, Some(b));
                        let result = implementation
                            .evaluate_gate(
                                gate_kind,
                                0,
                                &table,
                                left.label(a),
                                Some(right.label(b)),
                            )
                            .unwrap();
                        assert_eq!(
                            &result,
                            out.label(expected),
                            "{}({a}, {b}) under {}",
                            gate_kind.as_str(),
                            scheme_kind.as_str()
                        );
                    }
                }
            }
        }
    }

    /// Table sizes: classical/PP 4 rows (2 for NOT), GRR3 3 rows
    /// (1 for NOT), Half-Gates 2 per AND-family gate and 0 per XOR.
    #[test]
    fn test_table_sizes_per_scheme() {
        let cases: [(SchemeKind, GateKind, usize); 10] = [
            (SchemeKind::Classical, GateKind::And, 4),
            (SchemeKind::Classical, GateKind::Not, 2),
            (SchemeKind::PointAndPermute, GateKind::Or, 4),
            (SchemeKind::PointAndPermute, GateKind::Not, 2),
            (SchemeKind::Grr3, GateKind::Nand, 3),
            (SchemeKind::Grr3, GateKind::Not, 1),
            (SchemeKind::FreeXor, GateKind::Xor, 0),
            (SchemeKind::FreeXor, GateKind::And, 3),
            (SchemeKind::HalfGates, GateKind::Xor, 0),
            (SchemeKind::HalfGates, GateKind::And, 2),
        ];

        for (scheme_kind, gate_kind, expected) in cases {
            let implementation = scheme(scheme_kind);
            let mut rng = ChaCha12Rng::seed_from_u64(5);
            let mut ctx = GarbleContext::new(scheme_kind, &mut rng);

            let left = implementation.input_wire(&mut ctx);
            let right = implementation.input_wire(&mut ctx);
            let right_ref = (!gate_kind.is_unary()).then_some(&right);

            let (_, table) = implementation
                .garble_gate(&mut ctx, gate_kind, 0, &left, right_ref)
                .unwrap();
            assert_eq!(
                table.ciphertext_count(),
                expected,
                "{} under {}",
                gate_kind.as_str(),
                scheme_kind.as_str()
            );
        }
    }

    /// Offset schemes must keep `true.value XOR false.value == R` on
    /// every wire they produce, including gate outputs.
    #[test]
    fn test_offset_invariant_on_gate_outputs() {
        for scheme_kind in [SchemeKind::FreeXor, SchemeKind::HalfGates] {
            let implementation = scheme(scheme_kind);
            let mut rng = ChaCha12Rng::seed_from_u64(13);
            let mut ctx = GarbleContext::new(scheme_kind, &mut rng);
            let offset = ctx.global_offset.unwrap();

            let left = implementation.input_wire(&mut ctx);
            let right = implementation.input_wire(&mut ctx);
            assert_eq!(left.true_label().xor_value(left.false_label()), offset);

            for gate_kind in ALL_KINDS {
                let right_ref = (!gate_kind.is_unary()).then_some(&right);
                let (out, _) = implementation
                    .garble_gate(&mut ctx, gate_kind, 0, &left, right_ref)
                    .unwrap();
                assert_eq!(
                    out.true_label().xor_value(out.false_label()),
                    offset,
                    "{} under {}",
                    gate_kind.as_str(),
                    scheme_kind.as_str()
                );
            }
        }
    }

    /// Select bits on any wire are always opposite.
    #[test]
    fn test_select_bits_opposite_everywhere() {
        for scheme_kind in ALL_SCHEMES {
            let implementation = scheme(scheme_kind);
            let mut rng = ChaCha12Rng::seed_from_u64(17);
            let mut ctx = GarbleContext::new(scheme_kind, &mut rng);

            let left = implementation.input_wire(&mut ctx);
            let right = implementation.input_wire(&mut ctx);
            assert_ne!(left.false_label().select(), left.true_label().select());

            let (out, _) = implementation
                .garble_gate(&mut ctx, GateKind::And, 0, &left, Some(&right))
                .unwrap();
            assert_ne!(
                out.false_label().select(),
                out.true_label().select(),
                "AND output under {}",
                scheme_kind.as_str()
            );
        }
    }
}
