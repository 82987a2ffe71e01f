// Random Source
// Caller-supplied randomness for key generation

use rand::{CryptoRng, RngCore};

use crate::error::RandomError;

/// Fills buffers with random bytes; the only capability key generation needs.
pub trait RandomSource {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// Adapter for any `rand` cryptographic RNG
#[derive(Debug)]
pub struct RngSource<R>(pub R);

impl<R: RngCore + CryptoRng> RandomSource for RngSource<R> {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandomError> {
        self.0.try_fill_bytes(dest).map_err(RandomError::from)
    }
}

impl<F> RandomSource for F
where
    F: FnMut(&mut [u8]) -> Result<(), RandomError>,
{
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandomError> {
        self(dest)
    }
}

/// Random context borrowed for the duration of one key generation call.
///
/// A context without a source models a handle whose generate function was
/// never registered.
pub struct RandomContext<'a> {
    source: Option<&'a mut (dyn RandomSource + 'a)>,
}

impl<'a> RandomContext<'a> {
    pub fn new(source: &'a mut (dyn RandomSource + 'a)) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Context with no generate function attached
    pub fn without_source() -> Self {
        Self { source: None }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn into_source(self) -> Option<&'a mut (dyn RandomSource + 'a)> {
        self.source
    }
}

impl std::fmt::Debug for RandomContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomContext")
            .field("has_source", &self.has_source())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rng_source_fills() {
        let mut source = RngSource(StdRng::seed_from_u64(1));
        let mut buf = [0u8; 32];
        source.fill_bytes(&mut buf).unwrap();
        assert_ne!(buf, [0u8; 32]);
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = |dest: &mut [u8]| -> Result<(), RandomError> {
            calls += 1;
            dest.fill(0xA5);
            Ok(())
        };
        let mut buf = [0u8; 4];
        RandomSource::fill_bytes(&mut source, &mut buf).unwrap();
        assert_eq!(buf, [0xA5; 4]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_context_source() {
        let mut failing = |_: &mut [u8]| -> Result<(), RandomError> { Err(RandomError("offline".into())) };
        let ctx = RandomContext::new(&mut failing);
        assert!(ctx.has_source());
        let source = ctx.into_source().unwrap();
        assert!(source.fill_bytes(&mut [0u8; 1]).is_err());

        assert!(!RandomContext::without_source().has_source());
    }
}
