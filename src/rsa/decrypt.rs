// RSA Decryption Primitive
// Raw RSADP, with Chinese Remainder Theorem (CRT) for CRT-mode keys

use crate::error::PrimitiveError;

use super::bigint::{from_bytes, from_words, mod_pow, to_bytes_padded, RsaBigInt};
use super::key::{CrtKeyDb, PrivateKey, PrivateKeyDb};

/// Decrypt one modulus-sized block with the private key.
///
/// `input` is a big-endian integer of exactly the modulus length and must be
/// below n. The result has the same length.
pub fn decrypt_primitive(private_key: &PrivateKey, input: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
    if !private_key.is_valid() {
        return Err(PrimitiveError::PrivKeyValidationTag);
    }

    // Validate ciphertext size
    let key_bytes = private_key.modulus_len();
    if input.len() != key_bytes {
        return Err(PrimitiveError::InvalidInputSize {
            expected: key_bytes,
            actual: input.len(),
        });
    }

    let n = private_key.modulus();
    let c = from_bytes(input);
    if c >= n {
        return Err(PrimitiveError::InputOutOfRange);
    }

    let m = match &private_key.db {
        PrivateKeyDb::NonCrt(db) => mod_pow(&c, &db.private_exponent(), &n, &from_words(&db.np)),
        PrivateKeyDb::Crt(db) => decrypt_crt(&c, db, &n),
    };

    to_bytes_padded(&m, key_bytes).ok_or(PrimitiveError::InputOutOfRange)
}

/// Decrypt using Chinese Remainder Theorem (CRT)
/// This is faster than regular decryption because we work with smaller numbers
fn decrypt_crt(c: &RsaBigInt, key: &CrtKeyDb, n: &RsaBigInt) -> RsaBigInt {
    let p = key.p();
    let q = key.q();

    // m1 = c^dP mod p
    let m1 = mod_pow(c, &key.dp(), &p, &from_words(&key.p_np));

    // m2 = c^dQ mod q
    let m2 = mod_pow(c, &key.dq(), &q, &from_words(&key.q_np));

    // h = (m1 - m2) * qInv mod p
    let m2_mod_p = &m2 % &p;
    let mut h = if m1 >= m2_mod_p {
        m1 - m2_mod_p
    } else {
        m1 + &p - m2_mod_p
    };
    h = (h * key.qinv()) % &p;

    // m = m2 + q * h
    let m = m2 + &q * h;

    // Ensure m < n
    if &m >= n {
        return m - n;
    }

    m
}
