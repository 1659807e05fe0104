//! MD5 implementation of [`StreamingHash`].

use super::StreamingHash;
use crate::error::{Error, Result};

use md5::{Digest, Md5};
use std::fmt;

/// Streaming MD5 digest.
///
/// The RustCrypto state keeps the pending partial block, the running
/// registers and the consumed length; `None` marks a finalized instance.
#[derive(Clone)]
pub struct Md5Hash {
    state: Option<Md5>,
}

impl fmt::Debug for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Md5Hash")
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

impl Md5Hash {
    /// Length of an MD5 digest in bytes.
    pub const DIGEST_LEN: usize = 16;

    /// Creates a fresh hash instance.
    pub fn new() -> Self {
        Self {
            state: Some(Md5::new()),
        }
    }

    /// Whether a digest was already extracted from this instance.
    pub fn is_finalized(&self) -> bool {
        self.state.is_none()
    }

    /// Single-shot MD5 of `data`.
    pub fn digest(data: &[u8]) -> Vec<u8> {
        Md5::digest(data).to_vec()
    }

    fn state_mut(&mut self) -> Result<&mut Md5> {
        self.state
            .as_mut()
            .ok_or_else(|| Error::Usage("MD5 hash was already finalized".into()))
    }
}

impl Default for Md5Hash {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingHash for Md5Hash {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.state_mut()?.update(data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        let state = self
            .state
            .take()
            .ok_or_else(|| Error::Usage("MD5 hash was already finalized".into()))?;
        Ok(state.finalize().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};

    #[test]
    fn test_empty_digest() {
        let mut md5 = Md5Hash::new();
        assert_eq!(STANDARD.encode(md5.finalize().unwrap()), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn test_finalize_with_appends_first() {
        let mut md5 = Md5Hash::new();
        md5.append(b"Hello").unwrap();
        let digest = md5.finalize_with(b" Azure!").unwrap();
        assert_eq!(STANDARD.encode(digest), "Pz8543xut4RVSbb2g52Mww==");
    }

    #[test]
    fn test_digest_len() {
        assert_eq!(Md5Hash::digest(b"abc").len(), Md5Hash::DIGEST_LEN);
    }

    #[test]
    fn test_finalized_flag() {
        let mut md5 = Md5Hash::default();
        assert!(!md5.is_finalized());
        md5.finalize().unwrap();
        assert!(md5.is_finalized());
    }

    #[test]
    fn test_finalize_with_on_spent_instance_does_not_append() {
        let mut md5 = Md5Hash::new();
        md5.finalize().unwrap();
        assert!(matches!(md5.finalize_with(b"data"), Err(Error::Usage(_))));
        assert!(matches!(md5.append(b""), Err(Error::Usage(_))));
    }
}
