// Key Generation Parameters
// Request builder, policy bounds and the up-front parameter validator

use log::debug;
use zeroize::Zeroize;

use crate::error::{KgResult, RsaKgError};

use super::bigint::{bytes_be_to_words, effective_bit_len};
use super::key::{FipsContext, KeyGenData, PrivateKey, PublicKey, MAX_MOD_WORDS};
use super::keygen::KgDiagnostics;
use super::random::{RandomContext, RandomSource};

/// Smallest modulus accepted, in bits
pub const MIN_MODULUS_BITS: u32 = 1024;
/// Largest modulus accepted, in bits
pub const MAX_MODULUS_BITS: u32 = (MAX_MOD_WORDS * 32) as u32;
/// Modulus sizes must be a multiple of this
pub const MODULUS_GRANULARITY_BITS: u32 = 256;
/// An exponent longer than the modulus buffer is rejected outright
pub const MAX_EXPONENT_BYTES: usize = MAX_MOD_WORDS * 4;
/// Largest effective exponent size (65537 is 17 bits)
pub const MAX_EXPONENT_BITS: u32 = 17;
/// The only public exponents accepted
pub const ALLOWED_EXPONENTS: [u32; 3] = [0x3, 0x11, 0x1_0001];

/// Inputs to one key generation call.
///
/// Every buffer is caller-owned and borrowed for the call only. A missing
/// field is reported with its own error code before any work is done.
#[derive(Debug, Default)]
pub struct KeyGenRequest<'a> {
    pub rnd: Option<RandomContext<'a>>,
    pub exponent: Option<&'a [u8]>,
    pub modulus_bits: u32,
    pub private_key: Option<&'a mut PrivateKey>,
    pub public_key: Option<&'a mut PublicKey>,
    pub kg_data: Option<&'a mut KeyGenData>,
    pub fips_ctx: Option<&'a mut FipsContext>,
    pub diagnostics: Option<&'a mut KgDiagnostics>,
}

impl<'a> KeyGenRequest<'a> {
    pub fn new(modulus_bits: u32) -> Self {
        Self {
            modulus_bits,
            ..Self::default()
        }
    }

    pub fn rnd(mut self, rnd: RandomContext<'a>) -> Self {
        self.rnd = Some(rnd);
        self
    }

    /// Public exponent as big-endian bytes
    pub fn exponent(mut self, exponent: &'a [u8]) -> Self {
        self.exponent = Some(exponent);
        self
    }

    pub fn private_key(mut self, key: &'a mut PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn public_key(mut self, key: &'a mut PublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    pub fn kg_data(mut self, kg_data: &'a mut KeyGenData) -> Self {
        self.kg_data = Some(kg_data);
        self
    }

    pub fn fips_ctx(mut self, ctx: &'a mut FipsContext) -> Self {
        self.fips_ctx = Some(ctx);
        self
    }

    pub fn diagnostics(mut self, sink: &'a mut KgDiagnostics) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

/// A request that passed every check, with the exponent loaded.
pub struct ValidatedRequest<'a> {
    pub rnd: &'a mut (dyn RandomSource + 'a),
    pub modulus_bits: u32,
    pub private_key: &'a mut PrivateKey,
    pub public_key: &'a mut PublicKey,
    pub kg_data: &'a mut KeyGenData,
    pub fips_ctx: Option<&'a mut FipsContext>,
    pub diagnostics: Option<&'a mut KgDiagnostics>,
}

impl std::fmt::Debug for ValidatedRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedRequest")
            .field("modulus_bits", &self.modulus_bits)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key)
            .field("fips_ctx", &self.fips_ctx.is_some())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}

/// Whether `bits` is an accepted modulus size
pub fn is_valid_modulus_size(bits: u32) -> bool {
    (MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) && bits % MODULUS_GRANULARITY_BITS == 0
}

/// Check every parameter, in a fixed order, and prepare the output records.
///
/// Checks run presence first (random context, its generate function,
/// exponent, private key, public key, scratch), then sizes. Only once all of
/// those pass are the records and scratch zeroed and the exponent loaded
/// into the public key, so a bad exponent value leaves zeroed records behind.
pub fn validate_keygen_params(req: KeyGenRequest<'_>) -> KgResult<ValidatedRequest<'_>> {
    let KeyGenRequest {
        rnd,
        exponent,
        modulus_bits,
        private_key,
        public_key,
        kg_data,
        fips_ctx,
        diagnostics,
    } = req;

    let rnd = rnd.ok_or(RsaKgError::InvalidRndContext)?;
    let rnd = rnd.into_source().ok_or(RsaKgError::InvalidRndGenerateFunc)?;
    let exponent = exponent.ok_or(RsaKgError::InvalidExponentPointer)?;
    let private_key = private_key.ok_or(RsaKgError::InvalidPrivKeyStructPointer)?;
    let public_key = public_key.ok_or(RsaKgError::InvalidPubKeyStructPointer)?;
    let kg_data = kg_data.ok_or(RsaKgError::InvalidKeyGenDataPointer)?;

    if exponent.len() > MAX_EXPONENT_BYTES {
        return Err(RsaKgError::InvalidExponentSize);
    }
    if !is_valid_modulus_size(modulus_bits) {
        return Err(RsaKgError::InvalidModulusSize);
    }

    private_key.zeroize();
    public_key.zeroize();
    kg_data.zeroize();

    // Load the exponent in little-word order and check its value
    bytes_be_to_words(exponent, &mut public_key.e);
    public_key.e_size_bits = effective_bit_len(&public_key.e);

    if public_key.e_size_bits == 0
        || public_key.e_size_bits > MAX_EXPONENT_BITS
        || !ALLOWED_EXPONENTS.contains(&public_key.e[0])
    {
        public_key.zeroize();
        return Err(RsaKgError::InvalidExponentValue);
    }

    debug!(
        "key generation parameters accepted: {} bit modulus, {} bit exponent",
        modulus_bits, public_key.e_size_bits
    );

    Ok(ValidatedRequest {
        rnd,
        modulus_bits,
        private_key,
        public_key,
        kg_data,
        fips_ctx,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RandomError;

    fn never_called(_: &mut [u8]) -> Result<(), RandomError> {
        panic!("validation must not draw randomness");
    }

    #[test]
    fn test_modulus_size_policy() {
        assert!(is_valid_modulus_size(1024));
        assert!(is_valid_modulus_size(1280));
        assert!(is_valid_modulus_size(2048));
        assert!(is_valid_modulus_size(4096));
        assert!(!is_valid_modulus_size(768));
        assert!(!is_valid_modulus_size(1000));
        assert!(!is_valid_modulus_size(1152));
        assert!(!is_valid_modulus_size(4352));
        assert!(!is_valid_modulus_size(0));
    }

    #[test]
    fn test_accepts_65537() {
        let mut source = never_called;
        let (mut private_key, mut public_key, mut kg_data) =
            (PrivateKey::default(), PublicKey::default(), KeyGenData::default());
        public_key.n[5] = 0xFF;

        let req = KeyGenRequest::new(2048)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[0x01, 0x00, 0x01])
            .private_key(&mut private_key)
            .public_key(&mut public_key)
            .kg_data(&mut kg_data);
        let validated = validate_keygen_params(req).unwrap();
        assert_eq!(validated.modulus_bits, 2048);
        assert_eq!(validated.public_key.e[0], 65537);
        assert_eq!(validated.public_key.e_size_bits, 17);
        assert_eq!(validated.public_key.n[5], 0);
    }

    #[test]
    fn test_missing_pointers_in_order() {
        let mut source = never_called;
        let (mut private_key, mut public_key) = (PrivateKey::default(), PublicKey::default());

        let err = validate_keygen_params(KeyGenRequest::new(2048)).unwrap_err();
        assert_eq!(err, RsaKgError::InvalidRndContext);

        let req = KeyGenRequest::new(2048).rnd(RandomContext::without_source());
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidRndGenerateFunc
        );

        let req = KeyGenRequest::new(2048).rnd(RandomContext::new(&mut source));
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidExponentPointer
        );

        let req = KeyGenRequest::new(2048)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[3]);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidPrivKeyStructPointer
        );

        let req = KeyGenRequest::new(2048)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[3])
            .private_key(&mut private_key);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidPubKeyStructPointer
        );

        let req = KeyGenRequest::new(2048)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[3])
            .private_key(&mut private_key)
            .public_key(&mut public_key);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidKeyGenDataPointer
        );

        // Pointer checks win over size checks
        let long_exponent = [1u8; MAX_EXPONENT_BYTES + 1];
        let req = KeyGenRequest::new(0)
            .rnd(RandomContext::new(&mut source))
            .exponent(&long_exponent)
            .private_key(&mut private_key)
            .public_key(&mut public_key);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidKeyGenDataPointer
        );
    }

    #[test]
    fn test_size_errors() {
        let mut source = never_called;
        let (mut private_key, mut public_key, mut kg_data) =
            (PrivateKey::default(), PublicKey::default(), KeyGenData::default());

        let long_exponent = [0u8; MAX_EXPONENT_BYTES + 1];
        let req = KeyGenRequest::new(1000)
            .rnd(RandomContext::new(&mut source))
            .exponent(&long_exponent)
            .private_key(&mut private_key)
            .public_key(&mut public_key)
            .kg_data(&mut kg_data);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidExponentSize
        );

        let req = KeyGenRequest::new(1000)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[3])
            .private_key(&mut private_key)
            .public_key(&mut public_key)
            .kg_data(&mut kg_data);
        assert_eq!(
            validate_keygen_params(req).unwrap_err(),
            RsaKgError::InvalidModulusSize
        );
    }

    #[test]
    fn test_bad_exponent_values_leave_zeroed_records() {
        let mut source = never_called;
        let bad: [&[u8]; 7] = [
            &[],
            &[0x00],
            &[0x05],
            &[0x01, 0x00, 0x00],
            &[0x02, 0x00, 0x01],
            &[0x01, 0x00, 0x01, 0x00],
            &[0x00, 0x00, 0x00, 0x00, 0x07],
        ];
        for exponent in bad {
            let (mut private_key, mut public_key, mut kg_data) =
                (PrivateKey::default(), PublicKey::default(), KeyGenData::default());
            private_key.n[0] = 9;
            kg_data.p[0] = 9;
            let req = KeyGenRequest::new(1024)
                .rnd(RandomContext::new(&mut source))
                .exponent(exponent)
                .private_key(&mut private_key)
                .public_key(&mut public_key)
                .kg_data(&mut kg_data);
            assert_eq!(
                validate_keygen_params(req).unwrap_err(),
                RsaKgError::InvalidExponentValue
            );
            assert!(private_key.is_zeroed());
            assert!(public_key.is_zeroed());
            assert!(kg_data.is_zeroed());
        }
    }

    #[test]
    fn test_leading_zero_bytes_accepted() {
        let mut source = never_called;
        let (mut private_key, mut public_key, mut kg_data) =
            (PrivateKey::default(), PublicKey::default(), KeyGenData::default());
        let req = KeyGenRequest::new(1024)
            .rnd(RandomContext::new(&mut source))
            .exponent(&[0x00, 0x00, 0x00, 0x00, 0x11])
            .private_key(&mut private_key)
            .public_key(&mut public_key)
            .kg_data(&mut kg_data);
        let validated = validate_keygen_params(req).unwrap();
        assert_eq!(validated.public_key.e[0], 17);
        assert_eq!(validated.public_key.e_size_bits, 5);
    }
}
