//! Content hash values as exchanged with the service.

use super::{Md5Hash, StreamingHash};
use crate::error::{Error, Result};

use base64::{engine::general_purpose::STANDARD, Engine};

/// Supported content hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HashAlgorithm {
    /// MD5, carried in the `Content-MD5` header.
    Md5,
}

/// A computed or advertised content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    /// Raw digest bytes.
    pub value: Vec<u8>,
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
}

impl ContentHash {
    /// Creates a hash from raw digest bytes.
    pub fn new(value: Vec<u8>, algorithm: HashAlgorithm) -> Self {
        Self { value, algorithm }
    }

    /// Decodes a base64 header value.
    pub fn from_base64(encoded: &str, algorithm: HashAlgorithm) -> Result<Self> {
        let value = STANDARD.decode(encoded.trim()).map_err(|e| {
            Error::InvalidArgument(format!("\"{}\" is not valid base64: {}", encoded, e))
        })?;
        Ok(Self { value, algorithm })
    }

    /// Encodes the digest the way it travels in headers.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.value)
    }

    /// Hashes `data` with `algorithm`.
    pub fn compute(data: &[u8], algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::new(Md5Hash::digest(data), algorithm),
        }
    }

    /// Creates an empty streaming hasher for `algorithm`.
    pub fn hasher(algorithm: HashAlgorithm) -> Box<dyn StreamingHash + Send> {
        match algorithm {
            HashAlgorithm::Md5 => Box::new(Md5Hash::new()),
        }
    }

    /// Checks `data` against this hash.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = Self::compute(data, self.algorithm);
        if actual.value == self.value {
            Ok(())
        } else {
            Err(Error::HashMismatch {
                expected: self.to_base64(),
                actual: actual.to_base64(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_round_trip_of_known_value() {
        let hash = ContentHash::from_base64("Pz8543xut4RVSbb2g52Mww==", HashAlgorithm::Md5).unwrap();
        assert_eq!(hash.value.len(), 16);
        assert_eq!(hash.to_base64(), "Pz8543xut4RVSbb2g52Mww==");
    }

    #[test]
    fn test_invalid_base64() {
        let result = ContentHash::from_base64("not base64!", HashAlgorithm::Md5);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_verify() {
        let hash = ContentHash::compute(b"Hello Azure!", HashAlgorithm::Md5);
        assert!(hash.verify(b"Hello Azure!").is_ok());
        match hash.verify(b"Hello World!") {
            Err(Error::HashMismatch { expected, .. }) => {
                assert_eq!(expected, "Pz8543xut4RVSbb2g52Mww==")
            }
            other => panic!("expected a hash mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_hasher_matches_compute() {
        let mut hasher = ContentHash::hasher(HashAlgorithm::Md5);
        hasher.append(b"Hello Azure!").unwrap();
        let streamed = hasher.finalize().unwrap();
        assert_eq!(streamed, ContentHash::compute(b"Hello Azure!", HashAlgorithm::Md5).value);
    }
}
