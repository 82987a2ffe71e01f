// Software Key Generation Backend
// Prime search, modulus/exponent derivation and CRT parameters on num-bigint

use log::{debug, trace};
use num_integer::Integer;
use num_traits::{One, Zero};
use zeroize::Zeroize;

use crate::config::KeyGenConfig;
use crate::error::BackendError;

use super::backend::KeyGenBackend;
use super::bigint::{
    barrett_tag, from_words, is_probable_prime, lcm, mod_inverse, small_residue, to_words,
    RsaBigInt, SMALL_PRIMES,
};
use super::key::{KeyGenData, PrivateKey, PrivateKeyDb, PublicKey, MAX_PRIME_WORDS};
use super::random::RandomSource;
use super::x931::generate_x931_vector;

/// P and Q (and their X9.31 seeds) must differ somewhere in their top bits
pub const MIN_PRIME_DISTANCE_BITS: u32 = 100;

/// Miller-Rabin rounds for primes of a `modulus_bits` key
pub fn miller_rabin_rounds(modulus_bits: u32) -> u32 {
    match modulus_bits {
        0..=1024 => 7,
        1025..=2048 => 4,
        _ => 3,
    }
}

/// True when |a - b| > 2^(prime_bits - 100)
pub fn far_apart(a: &RsaBigInt, b: &RsaBigInt, prime_bits: u32) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff.bits() > u64::from(prime_bits.saturating_sub(MIN_PRIME_DISTANCE_BITS))
}

/// d <= 2^(modulus_bits/2) is rejected
pub fn private_exponent_too_low(d: &RsaBigInt, modulus_bits: u32) -> bool {
    d <= &(RsaBigInt::one() << (modulus_bits / 2))
}

/// Default collaborators: X9.31 seeds, incremental sieve search and
/// Miller-Rabin, with Barrett tags for the primitives.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareBackend;

impl SoftwareBackend {
    pub fn new() -> Self {
        SoftwareBackend
    }

    /// Draw X with the X9.31 generator and search upwards from it for a prime
    /// whose predecessor is coprime to `e`. Returns (X, P).
    fn find_prime(
        &self,
        rnd: &mut dyn RandomSource,
        prime_bits: u32,
        e: &RsaBigInt,
        rounds: u32,
        config: &KeyGenConfig,
    ) -> Result<(RsaBigInt, RsaBigInt), BackendError> {
        let words = (prime_bits / 32) as usize;
        let mut seed = [0u32; MAX_PRIME_WORDS];

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            if !config.prime_search_retries.allows(attempt) {
                return Err(BackendError::RetriesExhausted(attempt - 1));
            }

            generate_x931_vector(rnd, &mut seed[..words], config.x931_retries)?;
            let x = from_words(&seed[..words]);
            seed.zeroize();

            if let Some(p) = self.search_from(rnd, &x, prime_bits, e, rounds)? {
                trace!("prime found after {} seeds", attempt);
                return Ok((x, p));
            }
            trace!("prime search ran past {} bits, drawing a fresh seed", prime_bits);
        }
    }

    /// Step through odd candidates X, X+2, ... until one passes trial
    /// division, the e-check and Miller-Rabin. None if the search overflows.
    fn search_from(
        &self,
        rnd: &mut dyn RandomSource,
        x: &RsaBigInt,
        prime_bits: u32,
        e: &RsaBigInt,
        rounds: u32,
    ) -> Result<Option<RsaBigInt>, BackendError> {
        let residues: Vec<u32> = SMALL_PRIMES.iter().map(|&sp| small_residue(x, sp)).collect();
        let mut delta = 0u64;
        let mut candidates = 0usize;

        loop {
            // Step 1: trial division via the incrementally shifted residues
            let divisible = SMALL_PRIMES
                .iter()
                .zip(&residues)
                .any(|(&sp, &r)| (u64::from(r) + delta) % u64::from(sp) == 0);

            if !divisible {
                let candidate = x + delta;
                if candidate.bits() > u64::from(prime_bits) {
                    return Ok(None);
                }
                candidates += 1;

                // Step 2: (P-1) must be coprime to e
                let coprime = !(&candidate - 1u8).is_multiple_of(e);

                // Step 3: Miller-Rabin
                if coprime && is_probable_prime(&candidate, rounds, rnd)? {
                    trace!("{} candidates tested by Miller-Rabin or e-check", candidates);
                    return Ok(Some(candidate));
                }
            }

            delta += 2;
        }
    }

    fn replace_prime(
        &self,
        rnd: &mut dyn RandomSource,
        prime_bits: u32,
        e: &RsaBigInt,
        rounds: u32,
        config: &KeyGenConfig,
        attempt: &mut usize,
    ) -> Result<(RsaBigInt, RsaBigInt), BackendError> {
        *attempt += 1;
        if !config.prime_search_retries.allows(*attempt) {
            return Err(BackendError::RetriesExhausted(*attempt - 1));
        }
        self.find_prime(rnd, prime_bits, e, rounds, config)
    }
}

impl KeyGenBackend for SoftwareBackend {
    fn generate_primes(
        &self,
        rnd: &mut dyn RandomSource,
        modulus_bits: u32,
        e: &[u32],
        config: &KeyGenConfig,
        kg_data: &mut KeyGenData,
    ) -> Result<(), BackendError> {
        let prime_bits = modulus_bits / 2;
        if prime_bits % 32 != 0 || (prime_bits / 32) as usize > MAX_PRIME_WORDS {
            return Err(BackendError::InvalidKeyMaterial("unsupported prime size"));
        }
        let e = from_words(e);
        if e.is_zero() {
            return Err(BackendError::InvalidKeyMaterial("zero public exponent"));
        }
        let rounds = miller_rabin_rounds(modulus_bits);

        // Step 1: P from its own seed
        let (xp, mut p) = self.find_prime(rnd, prime_bits, &e, rounds, config)?;

        // Step 2: Q, with both the seeds and the primes far apart
        let (mut xq, mut q) = self.find_prime(rnd, prime_bits, &e, rounds, config)?;
        let mut redraws = 0usize;
        loop {
            if !far_apart(&xp, &xq, prime_bits) {
                (xq, q) = self.replace_prime(rnd, prime_bits, &e, rounds, config, &mut redraws)?;
            } else if !far_apart(&p, &q, prime_bits) {
                // Replace the smaller prime
                if p < q {
                    (_, p) = self.replace_prime(rnd, prime_bits, &e, rounds, config, &mut redraws)?;
                } else {
                    (xq, q) = self.replace_prime(rnd, prime_bits, &e, rounds, config, &mut redraws)?;
                }
            } else {
                break;
            }
        }

        // Step 3: P > Q
        if p < q {
            std::mem::swap(&mut p, &mut q);
        }

        to_words(&p, &mut kg_data.p)?;
        to_words(&q, &mut kg_data.q)?;
        debug!("prime pair of {} bits found", prime_bits);
        Ok(())
    }

    fn derive_modulus(
        &self,
        public_key: &mut PublicKey,
        private_key: &mut PrivateKey,
        kg_data: &KeyGenData,
        modulus_bits: u32,
    ) -> Result<(), BackendError> {
        let p = from_words(&kg_data.p);
        let q = from_words(&kg_data.q);
        let e = public_key.exponent();

        // n = p * q
        let n = &p * &q;
        if n.bits() != u64::from(modulus_bits) {
            return Err(BackendError::InvalidKeyMaterial("modulus size mismatch"));
        }

        // d = e^-1 mod lcm(p-1, q-1)
        let lambda = lcm(&(&p - 1u8), &(&q - 1u8));
        let d = mod_inverse(&e, &lambda).ok_or(BackendError::NotInvertible)?;
        if private_exponent_too_low(&d, modulus_bits) {
            return Err(BackendError::PrivateExponentTooLow);
        }

        to_words(&n, &mut public_key.n)?;
        to_words(&n, &mut private_key.n)?;
        if let PrivateKeyDb::NonCrt(db) = &mut private_key.db {
            to_words(&d, &mut db.d)?;
        }
        Ok(())
    }

    fn derive_crt(
        &self,
        e: &[u32],
        kg_data: &KeyGenData,
        private_key: &mut PrivateKey,
    ) -> Result<(), BackendError> {
        let db = match &mut private_key.db {
            PrivateKeyDb::Crt(db) => db,
            PrivateKeyDb::NonCrt(_) => {
                return Err(BackendError::InvalidKeyMaterial("private key is not in CRT mode"))
            }
        };

        let e = from_words(e);
        let p = from_words(&kg_data.p);
        let q = from_words(&kg_data.q);

        // dP = e^-1 mod (p-1), dQ = e^-1 mod (q-1), qInv = q^-1 mod p
        let dp = mod_inverse(&e, &(&p - 1u8)).ok_or(BackendError::NotInvertible)?;
        let dq = mod_inverse(&e, &(&q - 1u8)).ok_or(BackendError::NotInvertible)?;
        let qinv = mod_inverse(&q, &p).ok_or(BackendError::NotInvertible)?;

        to_words(&dp, &mut db.dp)?;
        to_words(&dq, &mut db.dq)?;
        to_words(&qinv, &mut db.qinv)?;
        Ok(())
    }

    fn init_public_db(&self, public_key: &mut PublicKey) -> Result<(), BackendError> {
        let n = public_key.modulus();
        check_odd_of_size(&n, public_key.n_size_bits)?;
        to_words(&barrett_tag(&n), &mut public_key.np)
    }

    fn init_private_db(&self, private_key: &mut PrivateKey) -> Result<(), BackendError> {
        let n = private_key.modulus();
        check_odd_of_size(&n, private_key.n_size_bits)?;

        match &mut private_key.db {
            PrivateKeyDb::NonCrt(db) => to_words(&barrett_tag(&n), &mut db.np),
            PrivateKeyDb::Crt(db) => {
                let p = db.p();
                let q = db.q();
                check_odd_of_size(&p, db.p_size_bits)?;
                check_odd_of_size(&q, db.q_size_bits)?;
                to_words(&barrett_tag(&p), &mut db.p_np)?;
                to_words(&barrett_tag(&q), &mut db.q_np)
            }
        }
    }
}

fn check_odd_of_size(value: &RsaBigInt, size_bits: u32) -> Result<(), BackendError> {
    if value.is_even() {
        return Err(BackendError::InvalidKeyMaterial("even modulus or prime"));
    }
    if value.bits() != u64::from(size_bits) {
        return Err(BackendError::InvalidKeyMaterial("size does not match the record"));
    }
    Ok(())
}
