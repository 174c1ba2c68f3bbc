//! End-to-end two-party runs over a loopback TCP connection.

use std::collections::HashMap;
use std::net::TcpListener;
use std::thread;

use anyhow::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

use gabes::circuit::Circuit;
use gabes::error::GabesError;
use gabes::scheme::SchemeKind;
use gabes::transport::Channel;
use gabes::{evaluator, garbler};

const ALL_SCHEMES: [SchemeKind; 6] = [
    SchemeKind::Classical,
    SchemeKind::PointAndPermute,
    SchemeKind::Grr3,
    SchemeKind::FreeXor,
    SchemeKind::Flexor,
    SchemeKind::HalfGates,
];

/// 4-bit millionaire comparator: out = (x > y), MSB first.
const MILLIONAIRE: &str = "
GATE(OR, out,
  GATE(AND, g3, x3, GATE(NOT, n3, y3)),
  GATE(AND, a3, GATE(XNOR, e3, x3, y3),
    GATE(OR, o2,
      GATE(AND, g2, x2, GATE(NOT, n2, y2)),
      GATE(AND, a2, GATE(XNOR, e2, x2, y2),
        GATE(OR, o1,
          GATE(AND, g1, x1, GATE(NOT, n1, y1)),
          GATE(AND, a1, GATE(XNOR, e1, x1, y1),
            GATE(AND, g0, x0, GATE(NOT, n0, y0))))))))
";

struct Party<'a> {
    scheme: SchemeKind,
    ids: &'a [&'a str],
    bits: &'a [bool],
}

/// Run the full protocol between two threads over loopback.
///
/// Returns what each side reported: the output bit or the error that
/// ended its run.
fn run_protocol(
    circuit_text: &str,
    garbler_party: Party<'_>,
    evaluator_party: Party<'_>,
) -> (gabes::Result<bool>, gabes::Result<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let address = listener.local_addr().expect("listener address");

    let evaluator_scheme = evaluator_party.scheme;
    let evaluator_ids: Vec<String> = evaluator_party.ids.iter().map(|s| s.to_string()).collect();
    let evaluator_bits = evaluator_party.bits.to_vec();
    let evaluator_thread = thread::spawn(move || {
        let (stream, _) = listener.accept().map_err(GabesError::from)?;
        let mut channel = Channel::new(stream);
        let mut rng = ChaCha12Rng::seed_from_u64(2024);
        evaluator::run(
            &mut channel,
            &mut rng,
            evaluator_scheme,
            &evaluator_ids,
            &evaluator_bits,
        )
    });

    let garbler_result = (|| {
        let circuit = Circuit::parse(circuit_text)?;
        let mut channel = Channel::connect(&address.to_string())?;
        let mut rng = ChaCha12Rng::seed_from_u64(4096);
        let garbler_ids: Vec<String> = garbler_party.ids.iter().map(|s| s.to_string()).collect();
        garbler::run(
            &mut channel,
            &mut rng,
            garbler_party.scheme,
            &circuit,
            &garbler_ids,
            garbler_party.bits,
        )
    })();

    let evaluator_result = evaluator_thread.join().expect("evaluator thread panicked");
    (garbler_result, evaluator_result)
}

fn bits(pattern: &str) -> Vec<bool> {
    pattern.chars().map(|c| c == '1').collect()
}

#[test]
fn test_circuit_survives_a_file_round_trip() -> Result<()> {
    use std::io::Write;

    let circuit = Circuit::parse(MILLIONAIRE)?;

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(circuit.emit().as_bytes())?;
    file.flush()?;

    let text = std::fs::read_to_string(file.path())?;
    assert_eq!(Circuit::parse(&text)?, circuit);
    Ok(())
}

#[test]
fn test_millionaire_under_every_scheme() -> Result<()> {
    // x = 1010 (10), y = 0101 (5), so x > y.
    let x = bits("1010");
    let y = bits("0101");

    // Cross-check the circuit against plaintext evaluation first.
    let circuit = Circuit::parse(MILLIONAIRE)?;
    let mut plain = HashMap::new();
    for (id, bit) in ["x3", "x2", "x1", "x0"].iter().zip(&x) {
        plain.insert(id.to_string(), *bit);
    }
    for (id, bit) in ["y3", "y2", "y1", "y0"].iter().zip(&y) {
        plain.insert(id.to_string(), *bit);
    }
    assert!(circuit.evaluate_plain(&plain)?);

    for scheme in ALL_SCHEMES {
        let (garbler_result, evaluator_result) = run_protocol(
            MILLIONAIRE,
            Party {
                scheme,
                ids: &["x3", "x2", "x1", "x0"],
                bits: &x,
            },
            Party {
                scheme,
                ids: &["y3", "y2", "y1", "y0"],
                bits: &y,
            },
        );

        assert!(
            garbler_result.as_ref().is_ok_and(|bit| *bit),
            "garbler under {}: {garbler_result:?}",
            scheme.as_str()
        );
        assert!(
            evaluator_result.as_ref().is_ok_and(|bit| *bit),
            "evaluator under {}: {evaluator_result:?}",
            scheme.as_str()
        );
    }

    Ok(())
}

#[test]
fn test_millionaire_false_case() {
    // x = 0101 (5), y = 1010 (10), so x > y is false.
    let (garbler_result, evaluator_result) = run_protocol(
        MILLIONAIRE,
        Party {
            scheme: SchemeKind::Classical,
            ids: &["x3", "x2", "x1", "x0"],
            bits: &bits("0101"),
        },
        Party {
            scheme: SchemeKind::Classical,
            ids: &["y3", "y2", "y1", "y0"],
            bits: &bits("1010"),
        },
    );

    assert_eq!(garbler_result.unwrap(), false);
    assert_eq!(evaluator_result.unwrap(), false);
}

#[test]
fn test_and_of_singletons() {
    for (a, b, expected) in [(true, true, true), (true, false, false)] {
        let (garbler_result, evaluator_result) = run_protocol(
            "GATE(AND, out, A, B)",
            Party {
                scheme: SchemeKind::PointAndPermute,
                ids: &["A"],
                bits: &[a],
            },
            Party {
                scheme: SchemeKind::PointAndPermute,
                ids: &["B"],
                bits: &[b],
            },
        );

        assert_eq!(garbler_result.unwrap(), expected, "AND({a}, {b})");
        assert_eq!(evaluator_result.unwrap(), expected, "AND({a}, {b})");
    }
}

#[test]
fn test_xor_chain_is_free_under_free_xor() {
    let chain = "GATE(XOR, out, GATE(XOR, ab, A, B), GATE(XOR, cd, C, D))";

    // The whole chain garbles to zero ciphertexts.
    let circuit = Circuit::parse(chain).unwrap();
    let mut rng = ChaCha12Rng::seed_from_u64(77);
    let garbling = garbler::garble(&mut rng, SchemeKind::FreeXor, &circuit).unwrap();
    assert_eq!(garbling.circuit.ciphertext_count(), 0);

    // A=1, B=0, C=1, D=1 -> 1 ^ 0 ^ 1 ^ 1 = 1.
    let (garbler_result, evaluator_result) = run_protocol(
        chain,
        Party {
            scheme: SchemeKind::FreeXor,
            ids: &["A", "B"],
            bits: &[true, false],
        },
        Party {
            scheme: SchemeKind::FreeXor,
            ids: &["C", "D"],
            bits: &[true, true],
        },
    );

    assert_eq!(garbler_result.unwrap(), true);
    assert_eq!(evaluator_result.unwrap(), true);
}

#[test]
fn test_not_of_nand() {
    // NOT(NAND(A, B)) with A = B = 1 is 1.
    let (garbler_result, evaluator_result) = run_protocol(
        "GATE(NOT, out, GATE(NAND, mid, A, B))",
        Party {
            scheme: SchemeKind::Grr3,
            ids: &["A"],
            bits: &[true],
        },
        Party {
            scheme: SchemeKind::Grr3,
            ids: &["B"],
            bits: &[true],
        },
    );

    assert_eq!(garbler_result.unwrap(), true);
    assert_eq!(evaluator_result.unwrap(), true);
}

#[test]
fn test_scheme_mismatch_fails_decryption() {
    let (garbler_result, evaluator_result) = run_protocol(
        "GATE(AND, out, A, B)",
        Party {
            scheme: SchemeKind::Grr3,
            ids: &["A"],
            bits: &[true],
        },
        Party {
            scheme: SchemeKind::Classical,
            ids: &["B"],
            bits: &[true],
        },
    );

    assert!(
        matches!(evaluator_result, Err(GabesError::Decryption(_))),
        "evaluator: {evaluator_result:?}"
    );
    // The evaluator aborts before sending its output label, so the
    // garbler sees the connection die.
    assert!(garbler_result.is_err(), "garbler: {garbler_result:?}");
}

#[test]
fn test_overlapping_wire_ownership_is_protocol_error() {
    let (garbler_result, evaluator_result) = run_protocol(
        "GATE(AND, out, A, B)",
        Party {
            scheme: SchemeKind::Classical,
            ids: &["A", "B"],
            bits: &[true, true],
        },
        Party {
            scheme: SchemeKind::Classical,
            // Claims A, which the garbler also claims.
            ids: &["A"],
            bits: &[false],
        },
    );

    assert!(
        matches!(garbler_result, Err(GabesError::Protocol(_))),
        "garbler: {garbler_result:?}"
    );
    assert!(
        matches!(evaluator_result, Err(GabesError::Protocol(_))),
        "evaluator: {evaluator_result:?}"
    );
}

#[test]
fn test_uncovered_wire_is_protocol_error() {
    let (garbler_result, _) = run_protocol(
        "GATE(AND, out, A, B)",
        Party {
            scheme: SchemeKind::Classical,
            ids: &["A"],
            bits: &[true],
        },
        Party {
            scheme: SchemeKind::Classical,
            // Nobody claims B.
            ids: &[],
            bits: &[],
        },
    );

    assert!(
        matches!(garbler_result, Err(GabesError::Protocol(_))),
        "garbler: {garbler_result:?}"
    );
}
