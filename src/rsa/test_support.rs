// Test fixtures: a small hand-built key pair for the primitives

use super::bigint::{barrett_tag, from_u64, lcm, mod_inverse, to_words};
use super::key::{
    CrtKeyDb, NonCrtKeyDb, OperationMode, PrivateKey, PrivateKeyDb, PublicKey,
    PRIV_KEY_VALIDATION_TAG, PUB_KEY_VALIDATION_TAG,
};

/// Largest two 64-bit primes
pub(crate) const TEST_P: u64 = 0xFFFF_FFFF_FFFF_FFC5;
pub(crate) const TEST_Q: u64 = 0xFFFF_FFFF_FFFF_FFAD;

/// 128-bit key pair with e = 65537, stamped valid
pub(crate) fn toy_key_pair(mode: OperationMode) -> (PublicKey, PrivateKey) {
    let p = from_u64(TEST_P);
    let q = from_u64(TEST_Q);
    let e = from_u64(65537);
    let n = &p * &q;
    let np = barrett_tag(&n);

    let mut public_key = PublicKey::default();
    to_words(&n, &mut public_key.n).unwrap();
    public_key.n_size_bits = 128;
    to_words(&e, &mut public_key.e).unwrap();
    public_key.e_size_bits = 17;
    to_words(&np, &mut public_key.np).unwrap();
    public_key.valid_tag = PUB_KEY_VALIDATION_TAG;

    let mut private_key = PrivateKey::default();
    private_key.n = public_key.n;
    private_key.n_size_bits = 128;
    private_key.valid_tag = PRIV_KEY_VALIDATION_TAG;

    let p1 = &p - 1u8;
    let q1 = &q - 1u8;
    private_key.db = match mode {
        OperationMode::NonCrt => {
            let mut db = NonCrtKeyDb::default();
            db.e = public_key.e;
            db.e_size_bits = 17;
            to_words(&mod_inverse(&e, &lcm(&p1, &q1)).unwrap(), &mut db.d).unwrap();
            db.np = public_key.np;
            PrivateKeyDb::NonCrt(db)
        }
        OperationMode::Crt => {
            let mut db = CrtKeyDb::default();
            to_words(&p, &mut db.p).unwrap();
            to_words(&q, &mut db.q).unwrap();
            to_words(&mod_inverse(&e, &p1).unwrap(), &mut db.dp).unwrap();
            to_words(&mod_inverse(&e, &q1).unwrap(), &mut db.dq).unwrap();
            to_words(&mod_inverse(&q, &p).unwrap(), &mut db.qinv).unwrap();
            to_words(&barrett_tag(&p), &mut db.p_np).unwrap();
            to_words(&barrett_tag(&q), &mut db.q_np).unwrap();
            db.p_size_bits = 64;
            db.q_size_bits = 64;
            PrivateKeyDb::Crt(db)
        }
    };

    (public_key, private_key)
}
