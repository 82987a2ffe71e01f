// RSA Key Pair Generation Library
// Non-CRT and CRT key generation with X9.31 candidate vectors

pub mod config;
pub mod error;
pub mod rsa;

pub use config::{KeyGenConfig, RetryPolicy};
pub use error::{BackendError, KgResult, PrimitiveError, RandomError, RsaKgError, StepError};
pub use rsa::{
    KeyGenRequest, KeyGenerator, KeyPair, KgDiagnostics, OperationMode, PrivateKey, PublicKey,
    RandomContext, RandomSource, RngSource,
};
