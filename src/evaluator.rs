//! The evaluator: reduces the cleaned circuit bottom-up and drives its
//! half of the protocol.

use std::collections::HashMap;

use rand_chacha::ChaCha12Rng;

use crate::error::{GabesError, Result};
use crate::garbled::{GarbledCircuit, GarbledGate, GarbledInput};
use crate::garbler::gate_progress;
use crate::label::Label;
use crate::ot;
use crate::scheme::{self, Scheme, SchemeKind};
use crate::transport::{Channel, Message};

/// Evaluate a cleaned circuit given one label per input wire.
///
/// Gates are reduced in the same post-order the garbler used, each one
/// decrypted (or derived) under the active scheme, until the root yields
/// the single output label.
pub fn evaluate(
    scheme_kind: SchemeKind,
    circuit: &GarbledCircuit,
    inputs: &HashMap<String, Label>,
) -> Result<Label> {
    let implementation = scheme::scheme(scheme_kind);
    let progress = gate_progress(circuit.gate_count(), "Evaluating circuit...");
    let label = evaluate_node(implementation.as_ref(), &circuit.root, inputs, &progress)?;
    progress.finish_with_message(format!("✓ Evaluated {} gates", circuit.gate_count()));
    Ok(label)
}

/// Run the evaluator's side of the protocol over an established channel.
///
/// `ids` and `bits` describe this party's input wires, pairwise.
/// Returns the plaintext output bit as decoded by the garbler.
pub fn run(
    channel: &mut Channel,
    rng: &mut ChaCha12Rng,
    scheme_kind: SchemeKind,
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

    // The garbler's announced scheme is informational; evaluation runs
    // under this party's own selection, so a mismatch surfaces at the
    // first gate as a decryption failure.
    match channel.receive()? {
        Message::Hello { .. } => {}
        other => {
            return Err(GabesError::Protocol(format!(
                "expected Hello, received {}",
                other.name()
            )));
        }
    }
    let circuit = match channel.receive()? {
        Message::Circuit(circuit) => circuit,
        other => {
            return Err(GabesError::Protocol(format!(
                "expected Circuit, received {}",
                other.name()
            )));
        }
    };
    channel.send_ack()?;

    // Input ordering and wire-ownership reconciliation.
    let (order, garbler_ids) = match channel.receive()? {
        Message::InputOrder { order, garbler_ids } => (order, garbler_ids),
        other => {
            return Err(GabesError::Protocol(format!(
                "expected InputOrder, received {}",
                other.name()
            )));
        }
    };
    channel.send(&Message::EvaluatorIds(ids.to_vec()))?;
    for id in ids {
        if garbler_ids.contains(id) {
            return Err(GabesError::Protocol(format!(
                "wire '{id}' is claimed by both parties"
            )));
        }
        if !order.contains(id) {
            return Err(GabesError::Protocol(format!(
                "wire '{id}' is not an input of the received circuit"
            )));
        }
    }
    channel.wait_for_ack()?;

    // The garbler's labels arrive first, in circuit order.
    let mut labels: HashMap<String, Label> = HashMap::new();
    for id in &order {
        if !garbler_ids.contains(id) {
            continue;
        }
        match channel.receive()? {
            Message::InputLabel { id: sent_id, label } => {
                if &sent_id != id {
                    return Err(GabesError::Protocol(format!(
                        "expected the label for '{id}', received '{sent_id}'"
                    )));
                }
                labels.insert(sent_id, label);
            }
            other => {
                return Err(GabesError::Protocol(format!(
                    "expected InputLabel, received {}",
                    other.name()
                )));
            }
        }
    }

    // One OT round per owned wire delivers this party's labels.
    let bit_by_id: HashMap<&String, bool> = ids.iter().zip(bits.iter().copied()).collect();
    for id in &order {
        let Some(&bit) = bit_by_id.get(id) else {
            continue;
        };
        let label = ot::receive_label(channel, rng, bit)?;
        labels.insert(id.clone(), label);
    }

    // Bottom-up reduction, then the output exchange.
    let output_label = evaluate(scheme_kind, &circuit, &labels)?;
    channel.send(&Message::OutputLabel(output_label))?;

    match channel.receive()? {
        Message::Output(bit) => Ok(bit),
        other => Err(GabesError::Protocol(format!(
            "expected Output, received {}",
            other.name()
        ))),
    }
}

fn evaluate_node(
    implementation: &dyn Scheme,
    gate: &GarbledGate,
    inputs: &HashMap<String, Label>,
    progress: &indicatif::ProgressBar,
) -> Result<Label> {
    let left = input_label(implementation, &gate.left, inputs, progress)?;
    let right = match &gate.right {
        Some(input) => Some(input_label(implementation, input, inputs, progress)?),
        None => None,
    };

    let label =
        implementation.evaluate_gate(gate.kind, gate.id, &gate.table, &left, right.as_ref())?;
    progress.inc(1);
    Ok(label)
}

fn input_label(
    implementation: &dyn Scheme,
    input: &GarbledInput,
    inputs: &HashMap<String, Label>,
    progress: &indicatif::ProgressBar,
) -> Result<Label> {
    match input {
        GarbledInput::Wire(id) => inputs
            .get(id)
            .copied()
            .ok_or_else(|| GabesError::Protocol(format!("no label held for input wire '{id}'"))),
        GarbledInput::Gate(sub) => evaluate_node(implementation, sub, inputs, progress),
    }
}
