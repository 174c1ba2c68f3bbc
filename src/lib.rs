//! Two-party secure function evaluation over garbled boolean circuits.
//!
//! A garbler and an evaluator jointly compute a boolean circuit over
//! their private input bits. The garbler encrypts the circuit gate by
//! gate under one of six garbling schemes; the evaluator obtains its
//! input labels through oblivious transfer and reduces the circuit
//! without learning anything beyond the agreed output bit.

/// Circuit text grammar, gate tree and traversal orders
pub mod circuit;
/// AES-GCM primitives and the deterministic zero ciphertext
pub mod crypto;
/// Typed error taxonomy with process exit codes
pub mod error;
/// Evaluator driver and bottom-up circuit reduction
pub mod evaluator;
/// Cleaned circuit form the garbler transmits
pub mod garbled;
/// Garbler driver and post-order circuit garbling
pub mod garbler;
/// 128-bit wire labels with select bits
pub mod label;
/// RSA-based 1-out-of-2 oblivious transfer
pub mod ot;
/// Process CSPRNG construction
pub mod rng;
/// The six garbling schemes behind one trait
pub mod scheme;
/// Length-framed synchronous TCP channel
pub mod transport;
/// Wire label pairs and offsets
pub mod wire;

pub use circuit::{Circuit, GateKind};
pub use error::{GabesError, Result};
pub use label::Label;
pub use scheme::SchemeKind;
pub use wire::Wire;
