//! The garbler: builds the garbled circuit and drives its half of the
//! protocol.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use rand_chacha::ChaCha12Rng;

use crate::circuit::{Circuit, Gate, GateInput};
use crate::error::{GabesError, Result};
use crate::garbled::{GarbledCircuit, GarbledGate, GarbledInput};
use crate::ot;
use crate::scheme::{self, GarbleContext, Scheme, SchemeKind};
use crate::transport::{Channel, Message};
use crate::wire::Wire;

/// Everything the garbler knows after garbling: the cleaned circuit to
/// transmit, both labels of every input wire, and the output wire.
#[derive(Debug)]
pub struct Garbling {
    /// The cleaned circuit (structure and tables only).
    pub circuit: GarbledCircuit,
    /// Input wires by identifier.
    pub input_wires: HashMap<String, Wire>,
    /// The root gate's output wire.
    pub output_wire: Wire,
}

impl Garbling {
    /// Dump the input-wire label table as JSON, for debugging.
    pub fn save_labels_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.input_wires)
            .map_err(|e| GabesError::Usage(format!("could not encode label dump: {e}")))?;
        std::fs::write(&path, json).map_err(|e| {
            GabesError::Usage(format!(
                "could not write {}: {e}",
                path.as_ref().display()
            ))
        })
    }
}

/// Garble a circuit under the given scheme.
///
/// Gates are garbled in post-order so every gate sees its children's
/// output wires; gate ids follow the same order and are carried in the
/// cleaned circuit.
pub fn garble(
    rng: &mut ChaCha12Rng,
    scheme_kind: SchemeKind,
    circuit: &Circuit,
) -> Result<Garbling> {
    let implementation = scheme::scheme(scheme_kind);
    let mut ctx = GarbleContext::new(scheme_kind, rng);
    let mut input_wires = HashMap::new();
    let mut next_id = 0u32;

    let progress = gate_progress(circuit.gate_count(), "Garbling circuit...");
    let (root, output_wire) = garble_node(
        implementation.as_ref(),
        &mut ctx,
        &circuit.root,
        &mut input_wires,
        &mut next_id,
        &progress,
    )?;
    progress.finish_with_message(format!("✓ Garbled {} gates", circuit.gate_count()));

    Ok(Garbling {
        circuit: GarbledCircuit { root },
        input_wires,
        output_wire,
    })
}

/// Run the garbler's side of the protocol over an established channel.
///
/// `ids` and `bits` describe this party's input wires, pairwise.
/// Returns the plaintext output bit.
pub fn run(
    channel: &mut Channel,
    rng: &mut ChaCha12Rng,
    scheme_kind: SchemeKind,
    circuit: &Circuit,
    ids: &[String],
    bits: &[bool],
) -> Result<bool> {
    if ids.len() != bits.len() {
        return Err(GabesError::Usage(format!(
            "{} input wires but {} input bits",
            ids.len(),
            bits.len()
        )));
    }

    let order = circuit.input_identifiers();
    for id in ids {
        if !order.contains(id) {
            return Err(GabesError::Usage(format!(
                "wire '{id}' is not an input of the circuit"
            )));
        }
    }

    let garbling = garble(rng, scheme_kind, circuit)?;
    run_garbled(channel, rng, scheme_kind, &garbling, &order, ids, bits)
}

/// Drive the protocol with an already-garbled circuit.
pub fn run_garbled(
    channel: &mut Channel,
    rng: &mut ChaCha12Rng,
    scheme_kind: SchemeKind,
    garbling: &Garbling,
    order: &[String],
    ids: &[String],
    bits: &[bool],
) -> Result<bool> {
    // Scheme announcement and the cleaned circuit.
    channel.send(&Message::Hello {
        scheme: scheme_kind,
    })?;
    channel.send(&Message::Circuit(garbling.circuit.clone()))?;
    channel.wait_for_ack()?;

    // Input ordering and wire-ownership reconciliation.
    channel.send(&Message::InputOrder {
        order: order.to_vec(),
        garbler_ids: ids.to_vec(),
    })?;
    let evaluator_ids = match channel.receive()? {
        Message::EvaluatorIds(evaluator_ids) => evaluator_ids,
        other => {
            return Err(GabesError::Protocol(format!(
                "expected EvaluatorIds, received {}",
                other.name()
            )));
        }
    };
    check_ownership(order, ids, &evaluator_ids)?;
    channel.send_ack()?;

    // One label per garbler-owned wire, in circuit order.
    let bit_by_id: HashMap<&String, bool> = ids.iter().zip(bits.iter().copied()).collect();
    for id in order {
        let Some(&bit) = bit_by_id.get(id) else {
            continue;
        };
        let wire = input_wire(garbling, id)?;
        channel.send(&Message::InputLabel {
            id: id.clone(),
            label: *wire.label(bit),
        })?;
    }

    // Oblivious transfer for every evaluator-owned wire.
    for id in order {
        if !evaluator_ids.contains(id) {
            continue;
        }
        let wire = input_wire(garbling, id)?;
        ot::send_labels(channel, rng, wire.false_label(), wire.true_label())?;
    }

    // Decode the evaluator's output label and share the result.
    let output_label = match channel.receive()? {
        Message::OutputLabel(label) => label,
        other => {
            return Err(GabesError::Protocol(format!(
                "expected OutputLabel, received {}",
                other.name()
            )));
        }
    };
    let output = if output_label == *garbling.output_wire.true_label() {
        true
    } else if output_label == *garbling.output_wire.false_label() {
        false
    } else {
        return Err(GabesError::Decryption(
            "output label matches neither output-wire label".to_string(),
        ));
    };

    channel.send(&Message::Output(output))?;
    Ok(output)
}

/// Both parties' claims must be disjoint and together cover every input.
fn check_ownership(
    order: &[String],
    garbler_ids: &[String],
    evaluator_ids: &[String],
) -> Result<()> {
    for id in evaluator_ids {
        if garbler_ids.contains(id) {
            return Err(GabesError::Protocol(format!(
                "wire '{id}' is claimed by both parties"
            )));
        }
    }

    for id in order {
        if !garbler_ids.contains(id) && !evaluator_ids.contains(id) {
            return Err(GabesError::Protocol(format!(
                "input wire '{id}' is claimed by neither party"
            )));
        }
    }

    Ok(())
}

fn input_wire<'a>(garbling: &'a Garbling, id: &str) -> Result<&'a Wire> {
    garbling
        .input_wires
        .get(id)
        .ok_or_else(|| GabesError::Protocol(format!("no wire garbled for input '{id}'")))
}

fn garble_node(
    implementation: &dyn Scheme,
    ctx: &mut GarbleContext<'_>,
    gate: &Gate,
    input_wires: &mut HashMap<String, Wire>,
    next_id: &mut u32,
    progress: &ProgressBar,
) -> Result<(GarbledGate, Wire)> {
    let (left, left_wire) =
        garble_input(implementation, ctx, &gate.left, input_wires, next_id, progress)?;
    let (right, right_wire) = match &gate.right {
        Some(input) => {
            let (node, wire) =
                garble_input(implementation, ctx, input, input_wires, next_id, progress)?;
            (Some(node), Some(wire))
        }
        None => (None, None),
    };

    let gid = *next_id;
    *next_id += 1;

    let (output_wire, table) =
        implementation.garble_gate(ctx, gate.kind, gid, &left_wire, right_wire.as_ref())?;
    progress.inc(1);

    let garbled = GarbledGate {
        id: gid,
        kind: gate.kind,
        left,
        right,
        table,
    };
    Ok((garbled, output_wire))
}

fn garble_input(
    implementation: &dyn Scheme,
    ctx: &mut GarbleContext<'_>,
    input: &GateInput,
    input_wires: &mut HashMap<String, Wire>,
    next_id: &mut u32,
    progress: &ProgressBar,
) -> Result<(GarbledInput, Wire)> {
    match input {
        GateInput::Wire(id) => {
            // A repeated identifier shares the wire drawn at first visit.
            if !input_wires.contains_key(id) {
                let wire = implementation.input_wire(ctx);
                input_wires.insert(id.clone(), wire);
            }
            let wire = input_wires[id].clone();
            Ok((GarbledInput::Wire(id.clone()), wire))
        }
        GateInput::Gate(sub) => {
            let (node, wire) =
                garble_node(implementation, ctx, sub, input_wires, next_id, progress)?;
            Ok((GarbledInput::Gate(Box::new(node)), wire))
        }
    }
}

pub(crate) fn gate_progress(count: u64, message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new(count);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );
    progress.set_message(message);
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_garble_assigns_post_order_ids() {
        let circuit =
            Circuit::parse("GATE(OR, out, GATE(AND, g, A, B), GATE(XOR, h, C, D))").unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let garbling = garble(&mut rng, SchemeKind::Classical, &circuit).unwrap();

        // Children first, root last.
        assert_eq!(garbling.circuit.root.id, 2);
        match (&garbling.circuit.root.left, &garbling.circuit.root.right) {
            (GarbledInput::Gate(and), Some(GarbledInput::Gate(xor))) => {
                assert_eq!(and.id, 0);
                assert_eq!(xor.id, 1);
            }
            other => panic!("expected two nested gates, got {other:?}"),
        }
    }

    #[test]
    fn test_garble_shares_wires_for_repeated_identifiers() {
        let circuit = Circuit::parse("GATE(AND, out, A, GATE(NOT, n, A))").unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let garbling = garble(&mut rng, SchemeKind::Classical, &circuit).unwrap();
        assert_eq!(garbling.input_wires.len(), 1);
        assert!(garbling.input_wires.contains_key("A"));
    }

    #[test]
    fn test_ownership_check() {
        let order = vec!["A".to_string(), "B".to_string()];
        let garbler = vec!["A".to_string()];
        let evaluator = vec!["B".to_string()];
        assert!(check_ownership(&order, &garbler, &evaluator).is_ok());

        // Overlap.
        let overlap = vec!["A".to_string()];
        assert!(matches!(
            check_ownership(&order, &garbler, &overlap),
            Err(GabesError::Protocol(_))
        ));

        // Uncovered wire.
        assert!(matches!(
            check_ownership(&order, &garbler, &[]),
            Err(GabesError::Protocol(_))
        ));
    }
}
