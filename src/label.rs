use rand::RngCore;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GabesError, Result};

/// Label value length in bytes (128 bits).
pub const VALUE_LEN: usize = 16;
/// Serialized label length: value plus one select-bit byte.
pub const SERIALIZED_LEN: usize = VALUE_LEN + 1;

/// A 128-bit wire label with a select bit.
///
/// The value is the secret: it stands for a wire's logical 0 or 1 and
/// doubles as an AEAD key. The select bit (pp-bit) is the only part a
/// counterparty ever observes; point-and-permute schemes use it to index
/// garbled-table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    value: [u8; VALUE_LEN],
    select: bool,
}

impl Label {
    /// Create a label from an explicit value and select bit.
    pub fn new(value: [u8; VALUE_LEN], select: bool) -> Self {
        Label { value, select }
    }

    /// Create a label whose select bit is the low bit of its value.
    ///
    /// Offset schemes use this form: with the offset's low bit forced to
    /// 1, the two labels of a wire automatically carry opposite select
    /// bits, and computed labels stay self-describing.
    pub fn derived(value: [u8; VALUE_LEN]) -> Self {
        let select = value[VALUE_LEN - 1] & 1 == 1;
        Label { value, select }
    }

    /// Draw a fresh random label with a random select bit.
    pub fn random(rng: &mut ChaCha12Rng) -> Self {
        let mut value = [0u8; VALUE_LEN];
        rng.fill_bytes(&mut value);
        let select = rng.next_u32() & 1 == 1;
        Label { value, select }
    }

    /// The 128-bit secret value.
    pub fn value(&self) -> &[u8; VALUE_LEN] {
        &self.value
    }

    /// The public select bit.
    pub fn select(&self) -> bool {
        self.select
    }

    /// XOR of the two label values. Only meaningful under offset schemes.
    pub fn xor_value(&self, other: &Label) -> [u8; VALUE_LEN] {
        xor(&self.value, other.value())
    }

    /// Byte-deterministic serialization: value || select byte.
    pub fn to_bytes(self) -> [u8; SERIALIZED_LEN] {
        let mut bytes = [0u8; SERIALIZED_LEN];
        bytes[..VALUE_LEN].copy_from_slice(&self.value);
        bytes[VALUE_LEN] = self.select as u8;
        bytes
    }

    /// Parse a label from its 17-byte serialization.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SERIALIZED_LEN {
            return Err(GabesError::Decryption(format!(
                "label must be {SERIALIZED_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut value = [0u8; VALUE_LEN];
        value.copy_from_slice(&bytes[..VALUE_LEN]);
        Ok(Label {
            value,
            select: bytes[VALUE_LEN] & 1 == 1,
        })
    }
}

/// XOR two 128-bit values.
pub fn xor(a: &[u8; VALUE_LEN], b: &[u8; VALUE_LEN]) -> [u8; VALUE_LEN] {
    let mut out = [0u8; VALUE_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    out
}
