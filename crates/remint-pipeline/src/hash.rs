//! Content hashing and the per-run registry of claimed hashes.
//!
//! The content hash is SipHash-1-3 with a 128-bit output over the encoded
//! bytes. It is a fingerprint for equality checks, not a security
//! primitive: nothing here resists deliberate collisions.
//!
//! [`md5_hex`] is for people, not for the registry: it gives the digest
//! `md5sum` prints so users can check written files by hand.

use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::hash::Hasher as _;

use md5::{Digest as _, Md5};
use serde::{Serialize, Serializer};
use siphasher::sip128::{Hasher128 as _, SipHasher13};

/// 128-bit content fingerprint of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(u128);

impl ContentHash {
    /// Hash a byte buffer.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = SipHasher13::new();
        hasher.write(bytes);
        Self(hasher.finish128().as_u128())
    }
}

/// MD5 of `bytes` as 32 lowercase hex digits, as `md5sum` prints it.
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    Md5::digest(bytes)
        .iter()
        .fold(String::with_capacity(32), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Set of content hashes already claimed during one run.
///
/// Seeded with the source hash before generation starts. Append-only:
/// hashes are never released, so a claim is final for the rest of the
/// run. One registry belongs to one source image; independent runs must
/// each create their own.
#[derive(Debug, Clone)]
pub struct HashRegistry {
    claimed: HashSet<ContentHash>,
}

impl HashRegistry {
    /// Create a registry holding only the source hash.
    #[must_use]
    pub fn new(source: ContentHash) -> Self {
        let mut claimed = HashSet::new();
        claimed.insert(source);
        Self { claimed }
    }

    /// Whether `hash` has been claimed.
    #[must_use]
    pub fn contains(&self, hash: ContentHash) -> bool {
        self.claimed.contains(&hash)
    }

    /// Check-and-insert in one step.
    ///
    /// Returns `true` if `hash` was unclaimed and now belongs to the
    /// caller, `false` if it was already present.
    pub fn claim(&mut self, hash: ContentHash) -> bool {
        self.claimed.insert(hash)
    }

    /// Number of distinct hashes claimed, the source's included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Always `false`: the source hash is present from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
