//! L4 — the online protocol: mask build, evaluate, and (for comparison)
//! boolean-to-arithmetic conversion, batched across a vector of scalar lanes.
//!
//! Grounded on `protocol.rs`'s round-method shape (one method per protocol
//! phase, taking shares in and returning shares out) and on `fss_op` /
//! `mask_builder` / `eq_eval_plan` / `comp_eval_plan` / `xor_add_convert_*` in
//! the original reference implementation, which this module's three
//! functions directly correspond to.

use rayon::prelude::*;

use crate::fss::dif;
use crate::fss::dpf;
use crate::fss::error::{FssError, FssResult};
use crate::fss::params::GlobalParams;
use crate::fss::store::PrimitiveStore;
use crate::network::transport::Transport;

fn check_shapes(left: usize, right: usize) -> FssResult<()> {
    if left != right {
        return Err(FssError::ShapeMismatch { left, right });
    }
    Ok(())
}

/// Computes this party's additive share of `1{x = y}` for every lane, given
/// this party's additive shares of `x - y`.
pub fn eq<T: Transport>(
    party_id: u8,
    params: &GlobalParams,
    store: &PrimitiveStore,
    transport: &T,
    x1_shares: &[u64],
    x2_shares: &[u64],
) -> FssResult<Vec<u64>> {
    check_shapes(x1_shares.len(), x2_shares.len())?;
    let count = x1_shares.len();

    // Round 1 — mask build: peek, never consume, in case the peer's round 1
    // fails and this party must retry against the same primitive (P6).
    let peeked = store.peek_eq_n(count)?;
    let local_masks: Vec<u64> = peeked
        .iter()
        .zip(x1_shares)
        .zip(x2_shares)
        .map(|((primitive, &x1), &x2)| params.add(params.sub(x1, x2), primitive.alpha_share))
        .collect();
    let peer_masks = transport.exchange_scalars(&local_masks)?;
    check_shapes(peer_masks.len(), count)?;

    // Round 2 — evaluate: now consume the primitive.
    let primitives = store.pop_eq_n(count)?;
    local_masks
        .par_iter()
        .zip(peer_masks.par_iter())
        .zip(primitives.par_iter())
        .map(|((&local, &peer), primitive)| {
            let m = params.add(local, peer);
            dpf::eval(party_id, m, &primitive.key, params)
        })
        .collect()
}

/// Computes this party's additive share of `1{x <= y}` for every lane.
pub fn le<T: Transport>(
    party_id: u8,
    params: &GlobalParams,
    store: &PrimitiveStore,
    transport: &T,
    x1_shares: &[u64],
    x2_shares: &[u64],
) -> FssResult<Vec<u64>> {
    check_shapes(x1_shares.len(), x2_shares.len())?;
    let count = x1_shares.len();

    // Round 1 — mask build.
    let peeked = store.peek_comp_n(count)?;
    let local_masks: Vec<u64> = peeked
        .iter()
        .zip(x1_shares)
        .zip(x2_shares)
        .map(|((primitive, &x1), &x2)| params.add(params.sub(x1, x2), primitive.alpha_share))
        .collect();
    let peer_masks = transport.exchange_scalars(&local_masks)?;
    check_shapes(peer_masks.len(), count)?;

    // Round 2 — evaluate; yields an XOR share of the comparison bit.
    let primitives = store.pop_comp_n(count)?;
    let bool_shares: Vec<u8> = local_masks
        .par_iter()
        .zip(peer_masks.par_iter())
        .zip(primitives.par_iter())
        .map(|((&local, &peer), primitive)| {
            let m = params.add(local, peer);
            dif::eval(party_id, m, &primitive.key, params)
        })
        .collect::<FssResult<_>>()?;

    // Round 3 — boolean-to-arithmetic conversion.
    let couples = store.pop_xor_add_n(count)?;
    let masked_bits_local: Vec<u8> = bool_shares
        .iter()
        .zip(couples.iter())
        .map(|(&bit, couple)| bit ^ couple.xor_share)
        .collect();
    let masked_bits_peer = transport.exchange_bits(&masked_bits_local)?;
    check_shapes(masked_bits_peer.len(), count)?;

    Ok(masked_bits_local
        .iter()
        .zip(masked_bits_peer.iter())
        .zip(couples.iter())
        .map(|((&local, &peer), couple)| {
            let mu = local ^ peer;
            let term1 = if mu == 0 {
                couple.add_share
            } else {
                params.neg(couple.add_share)
            };
            let term2 = (party_id as u64) * (mu as u64);
            params.add(term1, term2)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fss::store::Dealer;
    use crate::network::transport::LoopbackTransport;
    use rand::{thread_rng, RngCore};

    fn small_params() -> GlobalParams {
        GlobalParams::new(64, 5).unwrap()
    }

    fn additive_share_pair(
        v: u64,
        params: &GlobalParams,
        rng: &mut impl rand::RngCore,
    ) -> (u64, u64) {
        let s0 = params.reduce(rng.next_u64());
        let s1 = params.sub(v, s0);
        (s0, s1)
    }

    #[test]
    fn eq_reconstructs_equality_across_many_lanes() {
        let params = small_params();
        let mut rng = thread_rng();
        let dealer = Dealer::new(params);

        let xs: Vec<u64> = vec![3, 7, 7, 0, 31];
        let ys: Vec<u64> = vec![3, 1, 7, 5, 31];
        let count = xs.len();

        let (p0s, p1s, _alphas) = dealer.keygen_eq(count, &mut rng).unwrap();
        let store0 = PrimitiveStore::new();
        let store1 = PrimitiveStore::new();
        store0.push_eq(p0s);
        store1.push_eq(p1s);

        let mut x1_shares_0 = Vec::new();
        let mut x1_shares_1 = Vec::new();
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let d = params.sub(x, y);
            let (s0, s1) = additive_share_pair(d, &params, &mut rng);
            x1_shares_0.push(s0);
            x1_shares_1.push(s1);
        }
        let zeros = vec![0u64; count];

        let (t0, t1) = LoopbackTransport::pair();
        std::thread::scope(|scope| {
            let params = &params;
            let store0 = &store0;
            let store1 = &store1;
            let zeros0 = &zeros;
            let zeros1 = &zeros;
            let h0 = scope.spawn(move || eq(0, params, store0, &t0, &x1_shares_0, zeros0));
            let h1 = scope.spawn(move || eq(1, params, store1, &t1, &x1_shares_1, zeros1));
            let out0 = h0.join().unwrap().unwrap();
            let out1 = h1.join().unwrap().unwrap();
            for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
                let reconstructed = params.add(out0[i], out1[i]);
                let expected = if x == y { 1 } else { 0 };
                assert_eq!(reconstructed, expected, "lane {i}: x={x}, y={y}");
            }
        });
    }

    #[test]
    fn le_reconstructs_comparison_across_many_lanes() {
        let params = small_params();
        let mut rng = thread_rng();
        let dealer = Dealer::new(params);

        let xs: Vec<u64> = vec![3, 7, 0, 31, 9];
        let ys: Vec<u64> = vec![3, 1, 5, 31, 10];
        let count = xs.len();

        let (p0s, p1s, _alphas) = dealer.keygen_comp(count, &mut rng).unwrap();
        let (c0s, c1s) = dealer.keygen_xor_add(count, &mut rng);
        let store0 = PrimitiveStore::new();
        let store1 = PrimitiveStore::new();
        store0.push_comp(p0s);
        store1.push_comp(p1s);
        store0.push_xor_add(c0s);
        store1.push_xor_add(c1s);

        let mut x1_shares_0 = Vec::new();
        let mut x1_shares_1 = Vec::new();
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let d = params.sub(x, y);
            let (s0, s1) = additive_share_pair(d, &params, &mut rng);
            x1_shares_0.push(s0);
            x1_shares_1.push(s1);
        }
        let zeros = vec![0u64; count];

        let (t0, t1) = LoopbackTransport::pair();
        std::thread::scope(|scope| {
            let params = &params;
            let store0 = &store0;
            let store1 = &store1;
            let zeros0 = &zeros;
            let zeros1 = &zeros;
            let h0 = scope.spawn(move || le(0, params, store0, &t0, &x1_shares_0, zeros0));
            let h1 = scope.spawn(move || le(1, params, store1, &t1, &x1_shares_1, zeros1));
            let out0 = h0.join().unwrap().unwrap();
            let out1 = h1.join().unwrap().unwrap();
            for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
                let reconstructed = params.add(out0[i], out1[i]);
                let expected = if x <= y { 1 } else { 0 };
                assert_eq!(reconstructed, expected, "lane {i}: x={x}, y={y}");
            }
        });
    }

    #[test]
    fn mismatched_batch_shapes_are_rejected_before_touching_the_store() {
        let params = small_params();
        let store = PrimitiveStore::new();
        let (t0, _t1) = LoopbackTransport::pair();
        let err = eq(0, &params, &store, &t0, &[1, 2, 3], &[1, 2]).unwrap_err();
        assert!(matches!(err, FssError::ShapeMismatch { left: 3, right: 2 }));
    }

    #[test]
    fn empty_store_surfaces_an_error_and_refill_then_retry_succeeds() {
        let params = small_params();
        let mut rng = thread_rng();
        let dealer = Dealer::new(params);

        let store0 = PrimitiveStore::new();
        let store1 = PrimitiveStore::new();

        // Round 1 with nothing dealt yet: peek_eq_n must fail without
        // touching anything, leaving both stores in a state that a
        // subsequent dealt batch can still use from scratch.
        let (t0, _t1) = LoopbackTransport::pair();
        let err = eq(0, &params, &store0, &t0, &[5], &[0]).unwrap_err();
        assert!(matches!(err, FssError::EmptyPrimitiveStore { .. }));

        let (p0s, p1s, _alphas) = dealer.keygen_eq(1, &mut rng).unwrap();
        store0.push_eq(p0s);
        store1.push_eq(p1s);

        let x = 5u64;
        let y = 5u64;
        let d = params.sub(x, y);
        let (s0, s1) = additive_share_pair(d, &params, &mut rng);

        let (t0, t1) = LoopbackTransport::pair();
        std::thread::scope(|scope| {
            let params = &params;
            let store0 = &store0;
            let store1 = &store1;
            let h0 = scope.spawn(move || eq(0, params, store0, &t0, &[s0], &[0]));
            let h1 = scope.spawn(move || eq(1, params, store1, &t1, &[s1], &[0]));
            let out0 = h0.join().unwrap().unwrap();
            let out1 = h1.join().unwrap().unwrap();
            assert_eq!(params.add(out0[0], out1[0]), 1);
        });
    }
}
