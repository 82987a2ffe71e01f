// RSA Big Integer Operations
// Wrapper around num-bigint for the word-array key records

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use zeroize::Zeroize;

use crate::error::{BackendError, RandomError};
use crate::rsa::random::RandomSource;

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Number of odd primes used for trial division
pub const SMALL_PRIME_COUNT: usize = 256;

/// The first 256 odd primes (3 ..= 1621)
pub const SMALL_PRIMES: [u32; SMALL_PRIME_COUNT] = odd_primes::<SMALL_PRIME_COUNT>();

const fn odd_primes<const N: usize>() -> [u32; N] {
    let mut out = [0u32; N];
    let mut count = 0;
    let mut candidate = 3u32;
    while count < N {
        let mut prime = true;
        let mut i = 0;
        while i < count {
            let p = out[i];
            if p * p > candidate {
                break;
            }
            if candidate % p == 0 {
                prime = false;
                break;
            }
            i += 1;
        }
        if prime {
            out[count] = candidate;
            count += 1;
        }
        candidate += 2;
    }
    out
}

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Create a big integer from bytes (big-endian)
pub fn from_bytes(bytes: &[u8]) -> RsaBigInt {
    RsaBigInt::from_bytes_be(bytes)
}

/// Create a big integer from little-word-order u32 words
pub fn from_words(words: &[u32]) -> RsaBigInt {
    RsaBigInt::from_slice(words)
}

/// Convert big integer to exactly `len` big-endian bytes, left-padded with zeros
pub fn to_bytes_padded(n: &RsaBigInt, len: usize) -> Option<Vec<u8>> {
    let mut bytes = n.to_bytes_be();
    if n.is_zero() {
        bytes.clear();
    }
    if bytes.len() > len {
        bytes.zeroize();
        return None;
    }
    let mut result = vec![0u8; len];
    result[len - bytes.len()..].copy_from_slice(&bytes);
    bytes.zeroize();
    Some(result)
}

/// Store `n` into `out` in little-word order, zero-padding the upper words.
pub fn to_words(n: &RsaBigInt, out: &mut [u32]) -> Result<(), BackendError> {
    let mut digits = n.to_u32_digits();
    if digits.len() > out.len() {
        digits.zeroize();
        return Err(BackendError::InvalidKeyMaterial("value does not fit its buffer"));
    }
    out.fill(0);
    out[..digits.len()].copy_from_slice(&digits);
    digits.zeroize();
    Ok(())
}

/// Load a big-endian byte string into little-word-order u32 words.
///
/// The caller guarantees `out` holds at least `ceil(bytes.len() / 4)` words.
pub fn bytes_be_to_words(bytes: &[u8], out: &mut [u32]) {
    out.fill(0);
    for (i, chunk) in bytes.rchunks(4).enumerate() {
        let mut word = 0u32;
        for &b in chunk {
            word = (word << 8) | u32::from(b);
        }
        out[i] = word;
    }
}

/// Position of the highest set bit, counted from 1; zero for an all-zero array.
pub fn effective_bit_len(words: &[u32]) -> u32 {
    match words.iter().rposition(|&w| w != 0) {
        Some(top) => top as u32 * 32 + (32 - words[top].leading_zeros()),
        None => 0,
    }
}

/// Barrett tag mu = floor(2^(2k) / n) with k = bits(n)
pub fn barrett_tag(n: &RsaBigInt) -> RsaBigInt {
    let k = n.bits();
    (RsaBigInt::one() << (2 * k)) / n
}

/// Barrett reduction (HAC 14.42, base 2): x mod n given mu = barrett_tag(n).
///
/// Exact for x < 2^(2k); larger inputs still reduce correctly, only slower.
pub fn barrett_reduce(x: &RsaBigInt, n: &RsaBigInt, mu: &RsaBigInt) -> RsaBigInt {
    let k = n.bits();
    if k == 0 {
        return RsaBigInt::zero();
    }
    let q3 = ((x >> (k - 1)) * mu) >> (k + 1);
    let mut r = x - q3 * n;
    while &r >= n {
        r -= n;
    }
    r
}

/// Modular exponentiation: base^exp mod modulus
/// Square-and-multiply with Barrett reduction
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt, mu: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = barrett_reduce(base, modulus, mu);
    let bits = exp.bits();

    for i in 0..bits {
        if exp.bit(i) {
            result = barrett_reduce(&(&result * &base), modulus, mu);
        }
        if i + 1 < bits {
            base = barrett_reduce(&(&base * &base), modulus, mu);
        }
    }

    result
}

/// Extended Euclidean Algorithm
/// Returns (gcd, x) such that a*x ≡ gcd (mod b)
fn extended_gcd(a: &RsaBigInt, b: &RsaBigInt) -> (BigInt, BigInt) {
    let mut old_r = BigInt::from_biguint(Sign::Plus, a.clone());
    let mut r = BigInt::from_biguint(Sign::Plus, b.clone());
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let (quotient, remainder) = old_r.div_rem(&r);
        old_r = std::mem::replace(&mut r, remainder);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    (old_r, old_s)
}

/// Compute modular inverse: a^(-1) mod m
/// Returns None if inverse doesn't exist
pub fn mod_inverse(a: &RsaBigInt, m: &RsaBigInt) -> Option<RsaBigInt> {
    if m.is_zero() || m.is_one() {
        return None;
    }

    let (gcd, x) = extended_gcd(&(a % m), m);
    if !gcd.is_one() {
        return None;
    }

    let m = BigInt::from_biguint(Sign::Plus, m.clone());
    x.mod_floor(&m).to_biguint()
}

/// Greatest common divisor
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    a.gcd(b)
}

/// Least common multiple
pub fn lcm(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    if a.is_zero() || b.is_zero() {
        return RsaBigInt::zero();
    }
    (a * b) / gcd(a, b)
}

/// Uniform-ish value below `bound` drawn from the random source.
///
/// Draws 64 extra bits and reduces, so the bias is at most 2^-64.
pub fn random_below(rnd: &mut dyn RandomSource, bound: &RsaBigInt) -> Result<RsaBigInt, RandomError> {
    let len = ((bound.bits() + 64 + 7) / 8) as usize;
    let mut bytes = vec![0u8; len];
    rnd.fill_bytes(&mut bytes)?;
    let value = RsaBigInt::from_bytes_be(&bytes) % bound;
    bytes.zeroize();
    Ok(value)
}

/// `n mod p` for a small prime
pub fn small_residue(n: &RsaBigInt, p: u32) -> u32 {
    (n % p).to_u32().unwrap_or_default()
}

/// Miller-Rabin primality test with witnesses drawn from `rnd`
/// Returns Ok(true) if n is probably prime
pub fn is_probable_prime(
    n: &RsaBigInt,
    iterations: u32,
    rnd: &mut dyn RandomSource,
) -> Result<bool, RandomError> {
    let two = RsaBigInt::from(2u8);
    if n < &two {
        return Ok(false);
    }
    if n == &two || n == &RsaBigInt::from(3u8) {
        return Ok(true);
    }
    if n.is_even() {
        return Ok(false);
    }

    // Write n-1 as d * 2^s with d odd
    let n_minus_one = n - 1u8;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let mu = barrett_tag(n);

    // Witnesses in [2, n-2]
    let span = n - 3u8;
    for _ in 0..iterations {
        let a = random_below(rnd, &span)? + 2u8;
        let mut x = mod_pow(&a, &d, n, &mu);

        if x.is_one() || x == n_minus_one {
            continue;
        }

        let mut witness_passed = false;
        for _ in 1..s {
            x = barrett_reduce(&(&x * &x), n, &mu);
            if x == n_minus_one {
                witness_passed = true;
                break;
            }
        }

        if !witness_passed {
            // Composite
            return Ok(false);
        }
    }

    // Probably prime
    Ok(true)
}
