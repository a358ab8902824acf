//! SipHash-1-3 partitioner with fixed zero keys.

use crate::partitioner::traits::Partitioner;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// 64-bit digest. Cheaper than BLAKE3, adequate for small rings.
#[derive(Clone, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    fn digest(&self, name: &[u8]) -> Vec<u8> {
        let mut hasher = SipHasher13::new();
        hasher.write(name);
        hasher.finish().to_be_bytes().to_vec()
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}
