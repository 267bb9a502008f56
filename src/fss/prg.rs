use sha3::{Digest, Sha3_256};

use crate::fss::bits::BitVec;
use crate::fss::error::{FssError, FssResult};
use crate::fss::params::{GlobalParams, PRG_MAX_OUTPUT_BITS};

/// Domain-separation tags prefixed to the hash input, so that a DPF and a
/// DIF expansion of the same seed never coincide (SPEC_FULL.md §4.1: "`G`
/// and `H` MAY be domain-separated by prefixing the hash input with a
/// one-byte tag" — this implementation takes that option).
const TAG_G: u8 = 0x00;
const TAG_H: u8 = 0x01;

fn expand(tag: u8, seed: &BitVec, lambda: usize, width: usize) -> FssResult<BitVec> {
    if seed.len() != lambda {
        return Err(FssError::InvalidParameter(format!(
            "PRG seed must be {lambda} bits, got {}",
            seed.len()
        )));
    }
    if width > PRG_MAX_OUTPUT_BITS {
        return Err(FssError::PrgWidthExceeded {
            requested: width,
            max: PRG_MAX_OUTPUT_BITS,
        });
    }

    let mut hasher = Sha3_256::new();
    hasher.update([tag]);
    hasher.update(seed.as_slice());
    let digest = hasher.finalize();

    let bits = (0..width)
        .map(|i| (digest[i / 8] >> (7 - (i % 8))) & 1)
        .collect();
    Ok(BitVec::from_bits(bits))
}

/// `G(seed)` — the DPF expander: λ bits in, `2(λ+1)` bits out.
pub fn g(seed: &BitVec, params: &GlobalParams) -> FssResult<BitVec> {
    expand(TAG_G, seed, params.lambda, params.dpf_prg_width())
}

/// `H(seed)` — the DIF expander: λ bits in, `2(λ+2)` bits out.
pub fn h(seed: &BitVec, params: &GlobalParams) -> FssResult<BitVec> {
    expand(TAG_H, seed, params.lambda, params.dif_prg_width())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn g_is_deterministic_and_right_width() {
        let params = GlobalParams::new(110, 32).unwrap();
        let mut rng = thread_rng();
        let seed = BitVec::random(110, &mut rng);
        let out1 = g(&seed, &params).unwrap();
        let out2 = g(&seed, &params).unwrap();
        assert_eq!(out1, out2);
        assert_eq!(out1.len(), params.dpf_prg_width());
    }

    #[test]
    fn h_is_deterministic_and_right_width() {
        let params = GlobalParams::new(110, 32).unwrap();
        let mut rng = thread_rng();
        let seed = BitVec::random(110, &mut rng);
        let out = h(&seed, &params).unwrap();
        assert_eq!(out.len(), params.dif_prg_width());
    }

    #[test]
    fn g_and_h_are_domain_separated() {
        let params = GlobalParams::new(110, 32).unwrap();
        let mut rng = thread_rng();
        let seed = BitVec::random(110, &mut rng);
        let g_out = g(&seed, &params).unwrap();
        let h_out = h(&seed, &params).unwrap();
        // Same leading bits would be a coincidence at 2^-k odds; they should
        // differ because of the domain tag, not merely the extra 2 bits of H.
        assert_ne!(g_out.as_slice(), &h_out.as_slice()[..g_out.len()]);
    }

    #[test]
    fn rejects_seed_of_wrong_length() {
        let params = GlobalParams::new(110, 32).unwrap();
        let short_seed = BitVec::zeros(64);
        assert!(g(&short_seed, &params).is_err());
    }

    #[test]
    fn rejects_width_beyond_hash_output() {
        // lambda=126 -> DIF width 256, right at the edge; construct an
        // oversized request manually via `expand` to exercise the guard.
        let seed = BitVec::zeros(110);
        assert!(expand(TAG_G, &seed, 110, 257).is_err());
    }
}
