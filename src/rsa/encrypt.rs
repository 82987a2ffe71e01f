// RSA Encryption Primitive
// Raw RSAEP: c = m^e mod n on a validated public key

use crate::error::PrimitiveError;

use super::bigint::{from_bytes, from_words, mod_pow, to_bytes_padded};
use super::key::PublicKey;

/// Encrypt one modulus-sized block with the public key.
///
/// `input` is a big-endian integer of exactly the modulus length and must be
/// below n. The result has the same length.
pub fn encrypt_primitive(public_key: &PublicKey, input: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
    if !public_key.is_valid() {
        return Err(PrimitiveError::PubKeyValidationTag);
    }

    let key_bytes = public_key.modulus_len();
    if input.len() != key_bytes {
        return Err(PrimitiveError::InvalidInputSize {
            expected: key_bytes,
            actual: input.len(),
        });
    }

    let n = public_key.modulus();
    let m = from_bytes(input);
    if m >= n {
        return Err(PrimitiveError::InputOutOfRange);
    }

    // Compute c = m^e mod n
    let c = mod_pow(&m, &public_key.exponent(), &n, &from_words(&public_key.np));

    // Pad with leading zeros to match key size
    to_bytes_padded(&c, key_bytes).ok_or(PrimitiveError::InputOutOfRange)
}
