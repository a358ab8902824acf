//! BLAKE3 partitioner: 256-bit digest reduced modulo `R`.

use crate::partitioner::traits::Partitioner;

#[derive(Clone, Debug, Default)]
pub struct Blake3Partitioner;

impl Partitioner for Blake3Partitioner {
    fn digest(&self, name: &[u8]) -> Vec<u8> {
        ::blake3::hash(name).as_bytes().to_vec()
    }

    fn name(&self) -> &'static str {
        "Blake3Partitioner"
    }
}
