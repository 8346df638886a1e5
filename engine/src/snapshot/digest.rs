//! Content digest of a snapshot.
//!
//! The digest is BLAKE3 over a canonical line rendering:
//!
//! ```text
//! <holder> '\t' <denom> '\t' <decimal amount> '\n'
//! ```
//!
//! in holder order, then entry order. Two exports of the same height that
//! produce the same holdings produce the same digest, regardless of how the
//! output document is later formatted.

use super::Snapshot;

impl Snapshot {
    /// BLAKE3 digest of the canonical rendering.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for (holder, entries) in self.iter() {
            for entry in entries {
                hasher.update(holder.as_str().as_bytes());
                hasher.update(b"\t");
                hasher.update(entry.denom.as_str().as_bytes());
                hasher.update(b"\t");
                hasher.update(entry.amount.to_str_radix(10).as_bytes());
                hasher.update(b"\n");
            }
        }
        *hasher.finalize().as_bytes()
    }

    /// Hex-encoded [`digest`](Self::digest).
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}
