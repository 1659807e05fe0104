//! Incremental content hashing.
//!
//! This module provides the [`StreamingHash`] capability used to validate
//! transferred content, its MD5 implementation [`Md5Hash`], and the
//! [`ContentHash`] value exchanged with the service in base64 form.
//!
//! The digest produced by a [`StreamingHash`] only depends on the bytes it
//! consumed, never on how they were split across `append` calls.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::hash::{Md5Hash, StreamingHash, ContentHash, HashAlgorithm};
//!
//! # fn main() -> blobflow::Result<()> {
//! let mut md5 = Md5Hash::new();
//! md5.append(b"Hello ")?;
//! md5.append(b"Azure!")?;
//! let digest = md5.finalize()?;
//!
//! let hash = ContentHash::new(digest, HashAlgorithm::Md5);
//! assert_eq!(hash.to_base64(), "Pz8543xut4RVSbb2g52Mww==");
//! # Ok(())
//! # }
//! ```

pub mod content_hash;
pub mod md5;

pub use content_hash::{ContentHash, HashAlgorithm};
pub use md5::Md5Hash;

use crate::error::Result;

/// An incremental digest accumulator.
///
/// Once [`finalize`](StreamingHash::finalize) or
/// [`finalize_with`](StreamingHash::finalize_with) has returned a digest the
/// instance is spent: every further call fails with [`Error::Usage`].
///
/// [`Error::Usage`]: crate::Error::Usage
pub trait StreamingHash {
    /// Folds `data` into the running state.
    fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Finalizes the digest over everything appended so far.
    fn finalize(&mut self) -> Result<Vec<u8>>;

    /// Appends `data`, then finalizes.
    fn finalize_with(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.append(data)?;
        self.finalize()
    }
}
