//! 1-out-of-2 oblivious transfer for evaluator-input labels.
//!
//! RSA-based and honest-but-curious: the garbler offers both labels of a
//! wire, the evaluator walks away with exactly the one matching its
//! input bit, and neither side learns more. A fresh keypair is generated
//! for every wire; reusing one across wires would correlate the pads.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;
use rand_chacha::ChaCha12Rng;

use crate::error::{GabesError, Result};
use crate::label::{Label, SERIALIZED_LEN};
use crate::transport::{Channel, Message};

/// Minimum RSA modulus size for protocol use.
pub const MODULUS_BITS: u64 = 2048;

/// Fixed public exponent.
const PUBLIC_EXPONENT: u32 = 65537;

/// Witness rounds for the Miller-Rabin primality test.
const MILLER_RABIN_ROUNDS: usize = 24;

/// Small primes for cheap trial division before Miller-Rabin.
const SMALL_PRIMES: [u32; 30] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113,
];

/// An RSA keypair scoped to a single OT round.
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    /// Modulus.
    pub n: BigUint,
    /// Public exponent.
    pub e: BigUint,
    /// Private exponent.
    pub d: BigUint,
}

/// Generate an RSA keypair with a modulus of `bits` bits.
pub fn generate_keypair(rng: &mut ChaCha12Rng, bits: u64) -> RsaKeyPair {
    let e = BigUint::from(PUBLIC_EXPONENT);
    loop {
        let p = generate_prime(rng, bits / 2);
        let q = generate_prime(rng, bits / 2);
        if p == q {
            continue;
        }

        let phi = (&p - 1u32) * (&q - 1u32);
        if let Some(d) = e.modinv(&phi) {
            return RsaKeyPair { n: p * q, e, d };
        }
    }
}

/// Garbler side of one OT round: offer both labels of a wire.
pub fn send_labels(
    channel: &mut Channel,
    rng: &mut ChaCha12Rng,
    false_label: &Label,
    true_label: &Label,
) -> Result<()> {
    let keypair = generate_keypair(rng, MODULUS_BITS);
    let x0 = random_below(rng, &keypair.n);
    let x1 = random_below(rng, &keypair.n);

    channel.send(&Message::OtPublicKey {
        e: keypair.e.to_bytes_be(),
        n: keypair.n.to_bytes_be(),
        x0: x0.to_bytes_be(),
        x1: x1.to_bytes_be(),
    })?;

    let v = match channel.receive()? {
        Message::OtBlinded(bytes) => BigUint::from_bytes_be(&bytes),
        other => {
            return Err(GabesError::Protocol(format!(
                "expected OtBlinded, received {}",
                other.name()
            )));
        }
    };
    if v >= keypair.n {
        return Err(GabesError::Protocol(
            "blinded OT value is not reduced modulo N".to_string(),
        ));
    }

    // Only the pad the evaluator actually blinded unwinds to its k; the
    // other exponentiation yields an unrelated value.
    let k0 = unblind(&v, &x0, &keypair);
    let k1 = unblind(&v, &x1, &keypair);

    let pad_len = modulus_byte_len(&keypair.n);
    channel.send(&Message::OtMasked {
        m0: mask_label(false_label, &k0, pad_len),
        m1: mask_label(true_label, &k1, pad_len),
    })
}

/// Evaluator side of one OT round: obtain the label for `choice`.
pub fn receive_label(channel: &mut Channel, rng: &mut ChaCha12Rng, choice: bool) -> Result<Label> {
    let (e, n, x0, x1) = match channel.receive()? {
        Message::OtPublicKey { e, n, x0, x1 } => (
            BigUint::from_bytes_be(&e),
            BigUint::from_bytes_be(&n),
            BigUint::from_bytes_be(&x0),
            BigUint::from_bytes_be(&x1),
        ),
        other => {
            return Err(GabesError::Protocol(format!(
                "expected OtPublicKey, received {}",
                other.name()
            )));
        }
    };
    if n.bits() < MODULUS_BITS {
        return Err(GabesError::Protocol(format!(
            "OT modulus has {} bits, need at least {MODULUS_BITS}",
            n.bits()
        )));
    }

    let k = random_below(rng, &n);
    let pad = if choice { &x1 } else { &x0 };
    let v = (pad + k.modpow(&e, &n)) % &n;
    channel.send(&Message::OtBlinded(v.to_bytes_be()))?;

    let (m0, m1) = match channel.receive()? {
        Message::OtMasked { m0, m1 } => (m0, m1),
        other => {
            return Err(GabesError::Protocol(format!(
                "expected OtMasked, received {}",
                other.name()
            )));
        }
    };

    let masked = if choice { m1 } else { m0 };
    unmask_label(&masked, &k, modulus_byte_len(&n))
}

/// Recover the evaluator's k from the blinded value and one pad:
/// `(v - x)^d mod N`.
fn unblind(v: &BigUint, x: &BigUint, keypair: &RsaKeyPair) -> BigUint {
    let shifted = (v + &keypair.n - x) % &keypair.n;
    shifted.modpow(&keypair.d, &keypair.n)
}

/// XOR a label's 17-byte serialization against the head of the
/// fixed-width big-endian encoding of `k`.
fn mask_label(label: &Label, k: &BigUint, pad_len: usize) -> Vec<u8> {
    let pad = fixed_width_bytes(k, pad_len);
    label
        .to_bytes()
        .iter()
        .zip(&pad)
        .map(|(byte, pad_byte)| byte ^ pad_byte)
        .collect()
}

fn unmask_label(masked: &[u8], k: &BigUint, pad_len: usize) -> Result<Label> {
    if masked.len() != SERIALIZED_LEN {
        return Err(GabesError::Protocol(format!(
            "masked label must be {SERIALIZED_LEN} bytes, got {}",
            masked.len()
        )));
    }

    let pad = fixed_width_bytes(k, pad_len);
    let bytes: Vec<u8> = masked
        .iter()
        .zip(&pad)
        .map(|(byte, pad_byte)| byte ^ pad_byte)
        .collect();
    Label::from_bytes(&bytes)
}

/// Big-endian encoding of `value`, left-padded with zeros to `len`.
fn fixed_width_bytes(value: &BigUint, len: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    out
}

fn modulus_byte_len(n: &BigUint) -> usize {
    n.bits().div_ceil(8) as usize
}

/// Draw a uniform value in `[0, bound)`.
fn random_below(rng: &mut ChaCha12Rng, bound: &BigUint) -> BigUint {
    let byte_len = modulus_byte_len(bound);
    let excess_bits = (byte_len as u64 * 8 - bound.bits()) as u32;
    let top_mask = 0xFFu8 >> excess_bits;

    loop {
        let mut bytes = vec![0u8; byte_len];
        rng.fill_bytes(&mut bytes);
        bytes[0] &= top_mask;
        let value = BigUint::from_bytes_be(&bytes);
        if &value < bound {
            return value;
        }
    }
}

/// Draw a probable prime of exactly `bits` bits.
fn generate_prime(rng: &mut ChaCha12Rng, bits: u64) -> BigUint {
    let byte_len = (bits / 8) as usize;
    loop {
        let mut bytes = vec![0u8; byte_len];
        rng.fill_bytes(&mut bytes);
        // Top two bits set so the prime product keeps its full width;
        // low bit set for oddness.
        bytes[0] |= 0xC0;
        bytes[byte_len - 1] |= 1;

        let candidate = BigUint::from_bytes_be(&bytes);
        if is_probably_prime(&candidate, rng) {
            return candidate;
        }
    }
}

fn is_probably_prime(candidate: &BigUint, rng: &mut ChaCha12Rng) -> bool {
    for prime in SMALL_PRIMES {
        let prime = BigUint::from(prime);
        if candidate == &prime {
            return true;
        }
        if (candidate % &prime).is_zero() {
            return false;
        }
    }

    miller_rabin(candidate, rng)
}

fn miller_rabin(candidate: &BigUint, rng: &mut ChaCha12Rng) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_one = candidate - &one;

    // candidate - 1 = d * 2^s with d odd.
    let s = n_minus_one
        .trailing_zeros()
        .expect("candidate is odd and greater than one");
    let d = &n_minus_one >> s;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        // Witness in [2, candidate - 2].
        let a = random_below(rng, &(candidate - &two - &one)) + &two;
        let mut x = a.modpow(&d, candidate);
        if x == one || x == n_minus_one {
            continue;
        }

        for _ in 0..s.saturating_sub(1) {
            x = x.modpow(&two, candidate);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }

    true
}
