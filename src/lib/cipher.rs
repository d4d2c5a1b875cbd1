//! Byte transforms applied by the transform stage.
//!
//! A transform is pure per byte: the same input byte always yields the same
//! output byte, so the stage can apply it to the n-th byte without caring
//! which worker ran the n-1-th. Key material comes from a key file whose
//! bytes fold into the cipher parameter.

use std::fs;
use std::path::Path;

use crate::errors::{EncpipeError, Result};

/// A pure per-byte transform.
///
/// Implementations must be deterministic for every byte value and must not
/// fail; end-of-stream never reaches a transform.
pub trait ByteTransform: Send + Sync {
    /// Transform one byte.
    fn apply(&self, byte: u8) -> u8;
}

/// Additive cipher: each byte is shifted by a fixed amount, wrapping mod 256.
///
/// A shift of 1 maps `"AB"` to `"BC"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftCipher {
    shift: u8,
}

impl ShiftCipher {
    /// Create a cipher with the given shift.
    #[must_use]
    pub fn new(shift: u8) -> Self {
        Self { shift }
    }

    /// The configured shift amount.
    #[must_use]
    pub fn shift(&self) -> u8 {
        self.shift
    }
}

impl ByteTransform for ShiftCipher {
    fn apply(&self, byte: u8) -> u8 {
        byte.wrapping_add(self.shift)
    }
}

/// XOR cipher: each byte is XORed with a fixed key byte. Self-inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorCipher {
    key: u8,
}

impl XorCipher {
    /// Create a cipher with the given key byte.
    #[must_use]
    pub fn new(key: u8) -> Self {
        Self { key }
    }
}

impl ByteTransform for XorCipher {
    fn apply(&self, byte: u8) -> u8 {
        byte ^ self.key
    }
}

impl ByteTransform for Box<dyn ByteTransform> {
    fn apply(&self, byte: u8) -> u8 {
        (**self).apply(byte)
    }
}

/// Fold a key file's bytes into a single key byte.
///
/// The bytes are summed wrapping mod 256, so every byte of the key material
/// influences the result. Trailing ASCII whitespace is ignored, letting a
/// key file end with a newline without changing the key.
///
/// # Errors
///
/// Returns a setup error if the file cannot be read or contains no key
/// material.
pub fn load_key<P: AsRef<Path>>(path: P) -> Result<u8> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|e| EncpipeError::Setup {
        component: "key".to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let material: Vec<u8> =
        raw.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    if material.is_empty() {
        return Err(EncpipeError::Setup {
            component: "key".to_string(),
            path: path.display().to_string(),
            reason: "file contains no key material".to_string(),
        });
    }
    Ok(material.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)))
}
