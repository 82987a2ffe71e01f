// Key Generation Backend
// The collaborators the orchestrator drives, one method per step

use zeroize::Zeroize;

use crate::config::KeyGenConfig;
use crate::error::BackendError;

use super::bigint::{random_below, to_bytes_padded};
use super::decrypt::decrypt_primitive;
use super::encrypt::encrypt_primitive;
use super::key::{FipsContext, KeyGenData, PrivateKey, PublicKey};
use super::random::RandomSource;

/// Building blocks consumed by [`KeyGenerator`](super::keygen::KeyGenerator).
///
/// All values cross this boundary as little-word-order u32 arrays inside the
/// caller's records, so a backend never owns key material.
pub trait KeyGenBackend {
    /// Find P and Q for a `modulus_bits` modulus and store them in `kg_data`,
    /// with P > Q and (P-1), (Q-1) coprime to `e`.
    fn generate_primes(
        &self,
        rnd: &mut dyn RandomSource,
        modulus_bits: u32,
        e: &[u32],
        config: &KeyGenConfig,
        kg_data: &mut KeyGenData,
    ) -> Result<(), BackendError>;

    /// Write n into both records and d into a Non-CRT private record.
    ///
    /// Must report [`BackendError::PrivateExponentTooLow`] when
    /// d <= 2^(modulus_bits/2), whatever the private key mode.
    fn derive_modulus(
        &self,
        public_key: &mut PublicKey,
        private_key: &mut PrivateKey,
        kg_data: &KeyGenData,
        modulus_bits: u32,
    ) -> Result<(), BackendError>;

    /// Write dP, dQ and qInv into a CRT private record.
    fn derive_crt(
        &self,
        e: &[u32],
        kg_data: &KeyGenData,
        private_key: &mut PrivateKey,
    ) -> Result<(), BackendError>;

    /// Precompute whatever the public primitive needs.
    fn init_public_db(&self, public_key: &mut PublicKey) -> Result<(), BackendError>;

    /// Precompute whatever the private primitive needs.
    fn init_private_db(&self, private_key: &mut PrivateKey) -> Result<(), BackendError>;

    /// Conditional self-test on a freshly stamped key pair.
    fn self_test(
        &self,
        rnd: &mut dyn RandomSource,
        public_key: &PublicKey,
        private_key: &PrivateKey,
        fips_ctx: &mut FipsContext,
    ) -> Result<(), BackendError> {
        pairwise_consistency_test(rnd, public_key, private_key, fips_ctx)
    }
}

/// Encrypt a random message with the public key and check that the private
/// key recovers it. All intermediate blocks live in `fips_ctx`.
pub fn pairwise_consistency_test(
    rnd: &mut dyn RandomSource,
    public_key: &PublicKey,
    private_key: &PrivateKey,
    fips_ctx: &mut FipsContext,
) -> Result<(), BackendError> {
    let n = public_key.modulus();
    let len = public_key.modulus_len();
    if n.bits() < 3 || len > fips_ctx.message.len() {
        return Err(BackendError::InvalidKeyMaterial("modulus unusable for self-test"));
    }

    // Message in [2, n-2]
    let m = random_below(rnd, &(&n - 3u8))? + 2u8;
    let mut block = to_bytes_padded(&m, len)
        .ok_or(BackendError::InvalidKeyMaterial("self-test message too long"))?;
    fips_ctx.message[..len].copy_from_slice(&block);
    block.zeroize();

    let mut cipher = encrypt_primitive(public_key, &fips_ctx.message[..len])?;
    fips_ctx.cipher[..len].copy_from_slice(&cipher);
    cipher.zeroize();

    if fips_ctx.cipher[..len] == fips_ctx.message[..len] {
        return Err(BackendError::ConsistencyCheck);
    }

    let mut recovered = decrypt_primitive(private_key, &fips_ctx.cipher[..len])?;
    fips_ctx.recovered[..len].copy_from_slice(&recovered);
    recovered.zeroize();

    if fips_ctx.recovered[..len] != fips_ctx.message[..len] {
        return Err(BackendError::ConsistencyCheck);
    }
    Ok(())
}
