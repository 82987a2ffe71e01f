// RSA Module - Main module file
// Exports all RSA key generation functionality

pub mod backend;
pub mod bigint;
pub mod decrypt;
pub mod encrypt;
pub mod key;
pub mod keygen;
pub mod params;
pub mod random;
pub mod software;
pub mod x931;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{pairwise_consistency_test, KeyGenBackend};
pub use decrypt::decrypt_primitive;
pub use encrypt::encrypt_primitive;
pub use key::{
    CrtKeyDb, FipsContext, KeyGenData, KeyPair, NonCrtKeyDb, OperationMode, PrivateKey,
    PrivateKeyDb, PublicKey, PRIV_KEY_VALIDATION_TAG, PUB_KEY_VALIDATION_TAG,
};
pub use keygen::{KeyGenerator, KgDiagnostics};
pub use params::{validate_keygen_params, KeyGenRequest, ValidatedRequest};
pub use random::{RandomContext, RandomSource, RngSource};
pub use software::SoftwareBackend;
pub use x931::{generate_x931_vector, X931_THRESHOLD};
