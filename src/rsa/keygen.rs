// RSA Key Generation
// Drives the collaborators through prime search, derivation and finalization

use std::fmt;

use log::{debug, warn};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::config::KeyGenConfig;
use crate::error::{BackendError, KgResult, RsaKgError, StepError};

use super::backend::KeyGenBackend;
use super::bigint::effective_bit_len;
use super::key::{
    CrtKeyDb, FipsContext, KeyGenData, KeyPair, NonCrtKeyDb, OperationMode, PrivateKeyDb,
    PRIV_KEY_VALIDATION_TAG, PUB_KEY_VALIDATION_TAG,
};
use super::params::{validate_keygen_params, KeyGenRequest, ValidatedRequest};
use super::random::{RandomContext, RngSource};
use super::software::SoftwareBackend;

/// What happened inside one generation call.
///
/// Populated only when the caller passes one in. It holds the generated
/// primes in the clear, so treat it like key material.
#[derive(Clone, Default)]
pub struct KgDiagnostics {
    pub p: Vec<u32>,
    pub q: Vec<u32>,
    /// Number of prime pair searches run
    pub prime_search_calls: usize,
    /// Number of searches discarded for a too-low private exponent
    pub weak_key_retries: usize,
    /// The step that failed, when the call failed after validation
    pub failure: Option<StepError>,
}

impl fmt::Debug for KgDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KgDiagnostics")
            .field("prime_search_calls", &self.prime_search_calls)
            .field("weak_key_retries", &self.weak_key_retries)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl Drop for KgDiagnostics {
    fn drop(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
    }
}

/// RSA key pair generator
#[derive(Clone, Debug, Default)]
pub struct KeyGenerator<B: KeyGenBackend = SoftwareBackend> {
    backend: B,
    config: KeyGenConfig,
}

impl KeyGenerator<SoftwareBackend> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KeyGenConfig) -> Self {
        Self {
            backend: SoftwareBackend,
            config,
        }
    }
}

impl<B: KeyGenBackend> KeyGenerator<B> {
    pub fn with_backend(backend: B, config: KeyGenConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &KeyGenConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generate a key pair with a Non-CRT private key {e, d}.
    ///
    /// On success both records carry their validity tags. On any failure
    /// after validation both records are zeroed and the error is
    /// [`RsaKgError::Internal`] (or [`RsaKgError::RetriesExhausted`]).
    /// The scratch buffer and FIPS context are zeroed in every case.
    pub fn generate_key_pair(&self, req: KeyGenRequest<'_>) -> KgResult<()> {
        self.run(req, OperationMode::NonCrt)
    }

    /// Generate a key pair with a CRT private key {P, Q, dP, dQ, qInv}.
    pub fn generate_key_pair_crt(&self, req: KeyGenRequest<'_>) -> KgResult<()> {
        self.run(req, OperationMode::Crt)
    }

    /// Generate RSA key pair with specified bit length
    /// Allocates the records and scratch internally
    pub fn generate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        exponent: &[u8],
        modulus_bits: u32,
        mode: OperationMode,
    ) -> KgResult<KeyPair> {
        let mut source = RngSource(rng);
        let mut pair = KeyPair::default();
        let mut kg_data = KeyGenData::default();
        let mut fips_ctx = FipsContext::default();

        let req = KeyGenRequest::new(modulus_bits)
            .rnd(RandomContext::new(&mut source))
            .exponent(exponent)
            .private_key(&mut pair.private_key)
            .public_key(&mut pair.public_key)
            .kg_data(&mut kg_data)
            .fips_ctx(&mut fips_ctx);

        match mode {
            OperationMode::NonCrt => self.generate_key_pair(req)?,
            OperationMode::Crt => self.generate_key_pair_crt(req)?,
        }
        Ok(pair)
    }

    fn run(&self, mut req: KeyGenRequest<'_>, mode: OperationMode) -> KgResult<()> {
        // A reused sink must not report an earlier call, even on rejection
        if let Some(sink) = req.diagnostics.as_deref_mut() {
            *sink = KgDiagnostics::default();
        }
        let mut v = validate_keygen_params(req)?;
        debug!("generating {:?} key pair, {} bit modulus", mode, v.modulus_bits);

        let result = self.build_keys(&mut v, mode);

        // Scratch never outlives the call
        v.kg_data.zeroize();
        if let Some(ctx) = v.fips_ctx.as_deref_mut() {
            ctx.zeroize();
        }

        match result {
            Ok(()) => {
                debug!("key pair generated");
                Ok(())
            }
            Err(step) => {
                v.public_key.zeroize();
                v.private_key.zeroize();
                warn!("RSA key generation failed: {}", step);
                let code = RsaKgError::from(&step);
                if let Some(sink) = v.diagnostics.as_deref_mut() {
                    sink.failure = Some(step);
                }
                Err(code)
            }
        }
    }

    fn build_keys(&self, v: &mut ValidatedRequest<'_>, mode: OperationMode) -> Result<(), StepError> {
        let modulus_bits = v.modulus_bits;

        // Step 1: copy e into the private key and select its representation
        v.private_key.db = match mode {
            OperationMode::NonCrt => {
                let mut db = NonCrtKeyDb::default();
                db.e = v.public_key.e;
                db.e_size_bits = v.public_key.e_size_bits;
                PrivateKeyDb::NonCrt(db)
            }
            OperationMode::Crt => PrivateKeyDb::Crt(CrtKeyDb::default()),
        };

        // Step 2: primes, n and d; a too-low d means new primes
        let mut weak_keys = 0usize;
        loop {
            self.backend
                .generate_primes(
                    &mut *v.rnd,
                    modulus_bits,
                    &v.public_key.e,
                    &self.config,
                    v.kg_data,
                )
                .map_err(StepError::GenPrimes)?;
            if let Some(sink) = v.diagnostics.as_deref_mut() {
                sink.prime_search_calls += 1;
            }

            match self.backend.derive_modulus(
                v.public_key,
                v.private_key,
                v.kg_data,
                modulus_bits,
            ) {
                Ok(()) => break,
                Err(BackendError::PrivateExponentTooLow) => {
                    weak_keys += 1;
                    if let Some(sink) = v.diagnostics.as_deref_mut() {
                        sink.weak_key_retries = weak_keys;
                    }
                    if !self.config.weak_key_retries.allows(weak_keys) {
                        return Err(StepError::WeakKeyRetriesExhausted(weak_keys));
                    }
                    warn!("private exponent too low, restarting prime search ({})", weak_keys);
                    v.kg_data.zeroize();
                }
                Err(e) => return Err(StepError::DeriveModulus(e)),
            }
        }

        if let Some(sink) = v.diagnostics.as_deref_mut() {
            sink.p = v.kg_data.p.to_vec();
            sink.q = v.kg_data.q.to_vec();
        }

        v.public_key.n_size_bits = modulus_bits;
        v.private_key.n_size_bits = modulus_bits;

        // Step 3: mode-specific private fields and their sizes
        match mode {
            OperationMode::NonCrt => {
                if let PrivateKeyDb::NonCrt(db) = &mut v.private_key.db {
                    db.d_size_bits = effective_bit_len(&db.d);
                }
            }
            OperationMode::Crt => {
                self.backend
                    .derive_crt(&v.public_key.e, v.kg_data, v.private_key)
                    .map_err(StepError::DeriveCrt)?;
                if let PrivateKeyDb::Crt(db) = &mut v.private_key.db {
                    db.p = v.kg_data.p;
                    db.q = v.kg_data.q;
                    db.p_size_bits = effective_bit_len(&db.p);
                    db.q_size_bits = effective_bit_len(&db.q);
                    db.dp_size_bits = effective_bit_len(&db.dp);
                    db.dq_size_bits = effective_bit_len(&db.dq);
                    db.qinv_size_bits = effective_bit_len(&db.qinv);
                }
            }
        }

        // Step 4: low-level databases
        self.backend
            .init_public_db(v.public_key)
            .map_err(StepError::PublicDb)?;
        self.backend
            .init_private_db(v.private_key)
            .map_err(StepError::PrivateDb)?;

        // Step 5: stamp validity
        v.public_key.valid_tag = PUB_KEY_VALIDATION_TAG;
        v.private_key.valid_tag = PRIV_KEY_VALIDATION_TAG;

        // Step 6: conditional self-test
        if self.config.self_test {
            let mut local_ctx;
            let ctx = match v.fips_ctx.as_deref_mut() {
                Some(ctx) => ctx,
                None => {
                    local_ctx = FipsContext::default();
                    &mut local_ctx
                }
            };
            self.backend
                .self_test(&mut *v.rnd, v.public_key, v.private_key, ctx)
                .map_err(StepError::SelfTest)?;
        }

        Ok(())
    }
}
