use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A bit string stored one byte per bit (each entry is 0 or 1), index-friendly
/// the way the original reference implementation represents seeds, PRG
/// outputs, and correction words (SPEC_FULL.md §9, "Representation of bit
/// strings").
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitVec(Vec<u8>);

impl BitVec {
    pub fn zeros(len: usize) -> Self {
        BitVec(vec![0u8; len])
    }

    pub fn from_bits(bits: Vec<u8>) -> Self {
        debug_assert!(bits.iter().all(|&b| b == 0 || b == 1));
        BitVec(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// A fresh uniformly random bit string of length `len`, drawn from a
    /// cryptographically secure source.
    pub fn random(len: usize, rng: &mut impl RngCore) -> Self {
        let mut bytes = vec![0u8; len.div_ceil(8)];
        rng.fill_bytes(&mut bytes);
        let bits = (0..len)
            .map(|i| (bytes[i / 8] >> (7 - (i % 8))) & 1)
            .collect();
        BitVec(bits)
    }

    /// Elementwise XOR of two equal-length bit strings.
    pub fn xor(&self, other: &BitVec) -> BitVec {
        assert_eq!(self.len(), other.len(), "xor on mismatched bit lengths");
        BitVec(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a ^ b)
                .collect(),
        )
    }

    /// Multiply every bit by a single 0/1 selector — used for `t[i] * CW[i]`.
    pub fn scale(&self, selector: u8) -> BitVec {
        debug_assert!(selector == 0 || selector == 1);
        if selector == 0 {
            BitVec::zeros(self.len())
        } else {
            self.clone()
        }
    }

    /// Concatenate several bit strings in order.
    pub fn concat(parts: &[BitVec]) -> BitVec {
        let mut out = Vec::with_capacity(parts.iter().map(BitVec::len).sum());
        for p in parts {
            out.extend_from_slice(&p.0);
        }
        BitVec(out)
    }

    /// Partition into consecutive sub-strings of the given widths. The sum
    /// of `widths` must equal `self.len()`.
    pub fn split(&self, widths: &[usize]) -> Vec<BitVec> {
        assert_eq!(
            widths.iter().sum::<usize>(),
            self.len(),
            "split widths must cover the whole bit string"
        );
        let mut out = Vec::with_capacity(widths.len());
        let mut offset = 0;
        for &w in widths {
            out.push(BitVec(self.0[offset..offset + w].to_vec()));
            offset += w;
        }
        out
    }

    /// MSB-first conversion of this bit string into an element of ℤ/2^n by
    /// treating it as a base-2 number and reducing modulo `2^n` (SPEC_FULL.md
    /// §4.1, `convert`). Works for any bit length `>= n`, including `n == 64`.
    pub fn convert(&self, n: usize) -> u64 {
        let mask = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
        let mut acc: u64 = 0;
        for &bit in &self.0 {
            acc = ((acc << 1) | bit as u64) & mask;
        }
        acc
    }

    /// A single bit, as 0/1.
    pub fn bit(&self, i: usize) -> u8 {
        self.0[i]
    }
}

/// MSB-first decomposition of an `n`-bit unsigned integer `x` into an
/// `n`-length sequence of 0/1 bits.
pub fn bit_decomposition(x: u64, n: usize) -> BitVec {
    let bits = (0..n).map(|i| ((x >> (n - 1 - i)) & 1) as u8).collect();
    BitVec(bits)
}

/// Uniform random 0/1 bits, as a standalone helper mirroring the original
/// reference's `randbit`.
pub fn randbit(len: usize, rng: &mut impl RngCore) -> BitVec {
    BitVec::random(len, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn bit_decomposition_msb_first() {
        let bits = bit_decomposition(0b1101, 4);
        assert_eq!(bits.as_slice(), &[1, 1, 0, 1]);
    }

    #[test]
    fn bit_decomposition_roundtrips_through_convert() {
        for x in [0u64, 1, 42, 255] {
            let bits = bit_decomposition(x, 8);
            assert_eq!(bits.convert(8), x);
        }
    }

    #[test]
    fn convert_reduces_modulo_ring() {
        // 0b1111_1111 (255) mod 2^4 = 0b1111 = 15
        let bits = bit_decomposition(255, 8);
        assert_eq!(bits.convert(4), 15);
    }

    #[test]
    fn xor_is_involutive() {
        let mut rng = thread_rng();
        let a = BitVec::random(64, &mut rng);
        let b = BitVec::random(64, &mut rng);
        let c = a.xor(&b);
        assert_eq!(c.xor(&b), a);
    }

    #[test]
    fn split_then_concat_is_identity() {
        let mut rng = thread_rng();
        let bits = BitVec::random(20, &mut rng);
        let parts = bits.split(&[5, 1, 5, 1, 8]);
        assert_eq!(BitVec::concat(&parts), bits);
    }

    #[test]
    fn scale_zeros_or_passes_through() {
        let bits = bit_decomposition(0b1010, 4);
        assert_eq!(bits.scale(0), BitVec::zeros(4));
        assert_eq!(bits.scale(1), bits);
    }
}
