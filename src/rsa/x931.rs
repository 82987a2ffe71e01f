// X9.31 Candidate Vector Generator
// Random starting points for the prime search with the top two bits pinned

use log::trace;
use zeroize::Zeroize;

use crate::config::RetryPolicy;
use crate::error::BackendError;
use crate::rsa::random::RandomSource;

/// Top word of ceil(sqrt(2) * 2^31); a vector whose top word exceeds it is
/// at least sqrt(2) * 2^(bits-1).
pub const X931_THRESHOLD: u32 = 0xB504_F334;

const TOP_BIT: u32 = 0x8000_0000;

/// Fill `words` with random bytes read as little-endian u32s.
fn fill_words(rnd: &mut dyn RandomSource, words: &mut [u32]) -> Result<(), BackendError> {
    if words.is_empty() {
        return Ok(());
    }
    let mut bytes = vec![0u8; words.len() * 4];
    let result = rnd.fill_bytes(&mut bytes);
    if result.is_ok() {
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }
    bytes.zeroize();
    result.map_err(BackendError::from)
}

/// Generate a random vector V of `out.len()` words such that
/// `0xB504F334 * 2^(32*(len-1)) < V < 2^(32*len)`, with the MSB and LSB set.
///
/// The vector is stored in little-word order. On error `out` is zeroed.
pub fn generate_x931_vector(
    rnd: &mut dyn RandomSource,
    out: &mut [u32],
    retries: RetryPolicy,
) -> Result<(), BackendError> {
    let result = fill_x931_vector(rnd, out, retries);
    if result.is_err() {
        out.zeroize();
    }
    result
}

fn fill_x931_vector(
    rnd: &mut dyn RandomSource,
    out: &mut [u32],
    retries: RetryPolicy,
) -> Result<(), BackendError> {
    let top = match out.len().checked_sub(1) {
        Some(top) => top,
        None => return Err(BackendError::InvalidKeyMaterial("empty candidate vector")),
    };

    let mut attempt = 0usize;
    loop {
        attempt += 1;
        if !retries.allows(attempt) {
            return Err(BackendError::RetriesExhausted(attempt - 1));
        }

        fill_words(rnd, out)?;

        // Scan candidate top words from the most significant position down
        let accepted = out
            .iter()
            .rev()
            .map(|&w| w | TOP_BIT)
            .find(|&w| w > X931_THRESHOLD);

        if let Some(word) = accepted {
            out[top] = word;
            // Lower words must not be reused from the scanned vector
            fill_words(rnd, &mut out[..top])?;
            out[0] |= 1;
            trace!("x9.31 vector of {} words accepted after {} draws", out.len(), attempt);
            return Ok(());
        }

        trace!("x9.31: no top word above threshold, redrawing {} words", out.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RandomError;
    use crate::rsa::random::RngSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_vector_shape() {
        let mut rnd = RngSource(StdRng::seed_from_u64(42));
        for _ in 0..64 {
            let mut v = [0u32; 16];
            generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Bounded(64)).unwrap();
            assert!(v[15] > X931_THRESHOLD);
            assert_eq!(v[15] & TOP_BIT, TOP_BIT);
            assert_eq!(v[0] & 1, 1);
        }
    }

    #[test]
    fn test_single_word_vector() {
        let mut rnd = RngSource(StdRng::seed_from_u64(3));
        let mut v = [0u32; 1];
        generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Bounded(64)).unwrap();
        assert!(v[0] > X931_THRESHOLD);
        assert_eq!(v[0] & 1, 1);
    }

    #[test]
    fn test_lower_words_redrawn() {
        // First draw: top word too small, word 1 acceptable. Second draw: 0x11 bytes.
        let mut draws = 0;
        let mut rnd = |dest: &mut [u8]| -> Result<(), RandomError> {
            draws += 1;
            if draws == 1 {
                dest.fill(0);
                dest[4..8].copy_from_slice(&0xC000_0000u32.to_le_bytes());
            } else {
                dest.fill(0x11);
            }
            Ok(())
        };
        let mut v = [0u32; 3];
        generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Bounded(4)).unwrap();
        assert_eq!(v, [0x1111_1111, 0x1111_1111, 0xC000_0000]);
    }

    #[test]
    fn test_redraw_when_no_word_qualifies() {
        let mut draws = 0;
        let mut rnd = |dest: &mut [u8]| -> Result<(), RandomError> {
            draws += 1;
            dest.fill(if draws <= 2 { 0 } else { 0xFF });
            Ok(())
        };
        let mut v = [0u32; 2];
        generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Bounded(8)).unwrap();
        assert_eq!(v, [0xFFFF_FFFF, 0xFFFF_FFFF]);
    }

    #[test]
    fn test_retries_exhausted() {
        let mut rnd = |dest: &mut [u8]| -> Result<(), RandomError> {
            dest.fill(0);
            Ok(())
        };
        let mut v = [7u32; 4];
        let err = generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Bounded(5)).unwrap_err();
        assert_eq!(err, BackendError::RetriesExhausted(5));
        assert_eq!(v, [0u32; 4]);
    }

    #[test]
    fn test_random_error_propagates() {
        let mut rnd = |_: &mut [u8]| -> Result<(), RandomError> { Err(RandomError("entropy source down".into())) };
        let mut v = [9u32; 4];
        let err = generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Unbounded).unwrap_err();
        assert_eq!(err, BackendError::Random(RandomError("entropy source down".into())));
        assert_eq!(v, [0u32; 4]);
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut rnd = RngSource(StdRng::seed_from_u64(0));
        let mut v: [u32; 0] = [];
        assert!(generate_x931_vector(&mut rnd, &mut v, RetryPolicy::Unbounded).is_err());
    }
}
