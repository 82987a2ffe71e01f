// RSA Key Records
// Fixed-size public/private key databases and key generation scratch buffers

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::bigint::{from_words, RsaBigInt};

/// Largest supported modulus in 32-bit words (4096 bits)
pub const MAX_MOD_WORDS: usize = 128;
/// Largest supported prime in 32-bit words (2048 bits)
pub const MAX_PRIME_WORDS: usize = MAX_MOD_WORDS / 2;
/// Barrett tag of a k-bit value has k + 1 bits
pub const MOD_TAG_WORDS: usize = MAX_MOD_WORDS + 1;
pub const PRIME_TAG_WORDS: usize = MAX_PRIME_WORDS + 1;
/// Largest supported modulus in bytes
pub const MAX_MOD_BYTES: usize = MAX_MOD_WORDS * 4;

/// Stamped on a public key once every derivation step has succeeded
pub const PUB_KEY_VALIDATION_TAG: u32 = 0x1357_9BDF;
/// Stamped on a private key once every derivation step has succeeded
pub const PRIV_KEY_VALIDATION_TAG: u32 = 0x2468_ACE0;

/// Private key representation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationMode {
    NonCrt,
    Crt,
}

/// RSA Public Key
#[derive(Clone, Debug, PartialEq, Eq, Zeroize)]
pub struct PublicKey {
    pub n: [u32; MAX_MOD_WORDS],      // Modulus
    pub n_size_bits: u32,
    pub e: [u32; MAX_MOD_WORDS],      // Public exponent
    pub e_size_bits: u32,
    pub np: [u32; MOD_TAG_WORDS],     // Barrett tag of n
    pub valid_tag: u32,
}

impl Default for PublicKey {
    fn default() -> Self {
        Self {
            n: [0; MAX_MOD_WORDS],
            n_size_bits: 0,
            e: [0; MAX_MOD_WORDS],
            e_size_bits: 0,
            np: [0; MOD_TAG_WORDS],
            valid_tag: 0,
        }
    }
}

impl PublicKey {
    pub fn is_valid(&self) -> bool {
        self.valid_tag == PUB_KEY_VALIDATION_TAG
    }

    /// True when every field holds zero
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }

    pub fn modulus(&self) -> RsaBigInt {
        from_words(&self.n)
    }

    pub fn exponent(&self) -> RsaBigInt {
        from_words(&self.e)
    }

    /// Get the modulus length in bytes
    pub fn modulus_len(&self) -> usize {
        ((self.n_size_bits + 7) / 8) as usize
    }
}

/// Non-CRT private key database: {e, d}
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct NonCrtKeyDb {
    pub e: [u32; MAX_MOD_WORDS],
    pub e_size_bits: u32,
    pub d: [u32; MAX_MOD_WORDS],
    pub d_size_bits: u32,
    pub np: [u32; MOD_TAG_WORDS],     // Barrett tag of n
}

impl Default for NonCrtKeyDb {
    fn default() -> Self {
        Self {
            e: [0; MAX_MOD_WORDS],
            e_size_bits: 0,
            d: [0; MAX_MOD_WORDS],
            d_size_bits: 0,
            np: [0; MOD_TAG_WORDS],
        }
    }
}

impl NonCrtKeyDb {
    pub fn private_exponent(&self) -> RsaBigInt {
        from_words(&self.d)
    }

    pub fn public_exponent(&self) -> RsaBigInt {
        from_words(&self.e)
    }
}

/// CRT private key database: {P, Q, dP, dQ, qInv}
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct CrtKeyDb {
    pub p: [u32; MAX_PRIME_WORDS],
    pub p_size_bits: u32,
    pub q: [u32; MAX_PRIME_WORDS],
    pub q_size_bits: u32,
    pub dp: [u32; MAX_PRIME_WORDS],   // e^-1 mod (P-1)
    pub dp_size_bits: u32,
    pub dq: [u32; MAX_PRIME_WORDS],   // e^-1 mod (Q-1)
    pub dq_size_bits: u32,
    pub qinv: [u32; MAX_PRIME_WORDS], // Q^-1 mod P
    pub qinv_size_bits: u32,
    pub p_np: [u32; PRIME_TAG_WORDS], // Barrett tag of P
    pub q_np: [u32; PRIME_TAG_WORDS], // Barrett tag of Q
}

impl Default for CrtKeyDb {
    fn default() -> Self {
        Self {
            p: [0; MAX_PRIME_WORDS],
            p_size_bits: 0,
            q: [0; MAX_PRIME_WORDS],
            q_size_bits: 0,
            dp: [0; MAX_PRIME_WORDS],
            dp_size_bits: 0,
            dq: [0; MAX_PRIME_WORDS],
            dq_size_bits: 0,
            qinv: [0; MAX_PRIME_WORDS],
            qinv_size_bits: 0,
            p_np: [0; PRIME_TAG_WORDS],
            q_np: [0; PRIME_TAG_WORDS],
        }
    }
}

impl CrtKeyDb {
    pub fn p(&self) -> RsaBigInt {
        from_words(&self.p)
    }

    pub fn q(&self) -> RsaBigInt {
        from_words(&self.q)
    }

    pub fn dp(&self) -> RsaBigInt {
        from_words(&self.dp)
    }

    pub fn dq(&self) -> RsaBigInt {
        from_words(&self.dq)
    }

    pub fn qinv(&self) -> RsaBigInt {
        from_words(&self.qinv)
    }
}

/// Exactly one representation is populated, selected by the variant.
#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKeyDb {
    NonCrt(NonCrtKeyDb),
    Crt(CrtKeyDb),
}

impl Default for PrivateKeyDb {
    fn default() -> Self {
        PrivateKeyDb::NonCrt(NonCrtKeyDb::default())
    }
}

impl Zeroize for PrivateKeyDb {
    fn zeroize(&mut self) {
        match self {
            PrivateKeyDb::NonCrt(db) => db.zeroize(),
            PrivateKeyDb::Crt(db) => db.zeroize(),
        }
        *self = PrivateKeyDb::default();
    }
}

impl PrivateKeyDb {
    pub fn mode(&self) -> OperationMode {
        match self {
            PrivateKeyDb::NonCrt(_) => OperationMode::NonCrt,
            PrivateKeyDb::Crt(_) => OperationMode::Crt,
        }
    }
}

/// RSA Private Key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    pub n: [u32; MAX_MOD_WORDS],      // Modulus (same as public)
    pub n_size_bits: u32,
    pub db: PrivateKeyDb,
    pub valid_tag: u32,
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self {
            n: [0; MAX_MOD_WORDS],
            n_size_bits: 0,
            db: PrivateKeyDb::default(),
            valid_tag: 0,
        }
    }
}

impl PrivateKey {
    pub fn mode(&self) -> OperationMode {
        self.db.mode()
    }

    pub fn is_valid(&self) -> bool {
        self.valid_tag == PRIV_KEY_VALIDATION_TAG
    }

    /// True when every field holds zero
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }

    pub fn modulus(&self) -> RsaBigInt {
        from_words(&self.n)
    }

    pub fn non_crt(&self) -> Option<&NonCrtKeyDb> {
        match &self.db {
            PrivateKeyDb::NonCrt(db) => Some(db),
            PrivateKeyDb::Crt(_) => None,
        }
    }

    pub fn crt(&self) -> Option<&CrtKeyDb> {
        match &self.db {
            PrivateKeyDb::Crt(db) => Some(db),
            PrivateKeyDb::NonCrt(_) => None,
        }
    }

    /// Get the modulus length in bytes
    pub fn modulus_len(&self) -> usize {
        ((self.n_size_bits + 7) / 8) as usize
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("n_size_bits", &self.n_size_bits)
            .field("mode", &self.mode())
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}

/// Scratch for the candidate primes; wiped on every exit path.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyGenData {
    pub p: [u32; MAX_PRIME_WORDS],
    pub q: [u32; MAX_PRIME_WORDS],
}

impl Default for KeyGenData {
    fn default() -> Self {
        Self {
            p: [0; MAX_PRIME_WORDS],
            q: [0; MAX_PRIME_WORDS],
        }
    }
}

impl KeyGenData {
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Debug for KeyGenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenData").finish_non_exhaustive()
    }
}

/// Scratch for the pairwise consistency self-test; wiped on every exit path.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct FipsContext {
    pub message: [u8; MAX_MOD_BYTES],
    pub cipher: [u8; MAX_MOD_BYTES],
    pub recovered: [u8; MAX_MOD_BYTES],
}

impl Default for FipsContext {
    fn default() -> Self {
        Self {
            message: [0; MAX_MOD_BYTES],
            cipher: [0; MAX_MOD_BYTES],
            recovered: [0; MAX_MOD_BYTES],
        }
    }
}

impl FipsContext {
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Debug for FipsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FipsContext").finish_non_exhaustive()
    }
}

/// RSA Key Pair (both public and private keys)
#[derive(Clone, Debug, Default)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Get the bit length of the key
    pub fn bit_length(&self) -> u32 {
        self.public_key.n_size_bits
    }
}
