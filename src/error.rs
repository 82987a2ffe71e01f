// RSA Key Generation Errors
// Public return codes and the internal per-step failure taxonomy

use thiserror::Error;

/// Result type for the public key generation calls
pub type KgResult<T> = Result<T, RsaKgError>;

/// Error codes returned by the key generation entry points.
///
/// Validation failures keep their specific code. Anything that goes wrong
/// after validation is reported as [`RsaKgError::Internal`], except an
/// exhausted retry bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RsaKgError {
    /// No random context was supplied.
    #[error("random context is missing")]
    InvalidRndContext,

    /// The random context carries no generate function.
    #[error("random context has no generate function")]
    InvalidRndGenerateFunc,

    /// No public exponent was supplied.
    #[error("public exponent is missing")]
    InvalidExponentPointer,

    /// No private key record was supplied.
    #[error("private key record is missing")]
    InvalidPrivKeyStructPointer,

    /// No public key record was supplied.
    #[error("public key record is missing")]
    InvalidPubKeyStructPointer,

    /// No key generation scratch buffer was supplied.
    #[error("key generation scratch buffer is missing")]
    InvalidKeyGenDataPointer,

    /// The exponent is longer than the modulus buffer.
    #[error("public exponent is too long")]
    InvalidExponentSize,

    /// The modulus size is out of range or not a multiple of the granularity.
    #[error("invalid modulus size")]
    InvalidModulusSize,

    /// The exponent is not one of 3, 17 or 65537.
    #[error("invalid public exponent value")]
    InvalidExponentValue,

    /// Key generation failed after validation.
    #[error("key generation failed")]
    Internal,

    /// A configured retry bound was reached.
    #[error("key generation retries exhausted")]
    RetriesExhausted,
}

/// Failure reported by the random source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("random source failure: {0}")]
pub struct RandomError(pub String);

impl From<rand::Error> for RandomError {
    fn from(e: rand::Error) -> Self {
        RandomError(e.to_string())
    }
}

/// Status reported by a key generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Random source failure.
    #[error(transparent)]
    Random(#[from] RandomError),

    /// d <= 2^(nlen/2); the caller must restart with fresh primes.
    #[error("generated private exponent is too low")]
    PrivateExponentTooLow,

    /// A modular inverse does not exist.
    #[error("value is not invertible")]
    NotInvertible,

    /// Input or output key material is malformed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(&'static str),

    /// A bounded search gave up.
    #[error("search exhausted after {0} attempts")]
    RetriesExhausted(usize),

    /// Encrypt-then-decrypt did not return the original message.
    #[error("pairwise consistency test failed")]
    ConsistencyCheck,

    /// A raw RSA primitive refused its input.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// Which collaborator failed, and how.
///
/// Kept internal to the orchestrator: it is logged and handed to the
/// diagnostics sink, while the caller only sees the collapsed code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("prime pair search failed: {0}")]
    GenPrimes(BackendError),

    #[error("modulus and private exponent derivation failed: {0}")]
    DeriveModulus(BackendError),

    #[error("CRT parameter derivation failed: {0}")]
    DeriveCrt(BackendError),

    #[error("public key database init failed: {0}")]
    PublicDb(BackendError),

    #[error("private key database init failed: {0}")]
    PrivateDb(BackendError),

    #[error("conditional self-test failed: {0}")]
    SelfTest(BackendError),

    #[error("private exponent too low after {0} attempts")]
    WeakKeyRetriesExhausted(usize),
}

impl StepError {
    /// The collaborator's own status, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StepError::GenPrimes(e)
            | StepError::DeriveModulus(e)
            | StepError::DeriveCrt(e)
            | StepError::PublicDb(e)
            | StepError::PrivateDb(e)
            | StepError::SelfTest(e) => Some(e),
            StepError::WeakKeyRetriesExhausted(_) => None,
        }
    }
}

impl From<&StepError> for RsaKgError {
    fn from(step: &StepError) -> Self {
        match step {
            StepError::WeakKeyRetriesExhausted(_) => RsaKgError::RetriesExhausted,
            other => match other.backend_error() {
                Some(BackendError::RetriesExhausted(_)) => RsaKgError::RetriesExhausted,
                _ => RsaKgError::Internal,
            },
        }
    }
}

/// Precondition failures of the raw RSA primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    #[error("public key is not valid")]
    PubKeyValidationTag,

    #[error("private key is not valid")]
    PrivKeyValidationTag,

    #[error("input must be exactly {expected} bytes, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("input is not below the modulus")]
    InputOutOfRange,
}
