//! L5 — the per-party primitive store and the offline dealer that fills it.
//!
//! Grounded on the "offline phase produces a `Vec` of per-party shares" shape
//! of `preprocessing.rs::Preprocessing::run`, generalized from a single
//! preprocessed-gate table to the three FIFO queues this core needs.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::fss::dif::{self, DifKeyShare};
use crate::fss::dpf::{self, DpfKeyShare};
use crate::fss::error::{FssError, FssResult};
use crate::fss::params::GlobalParams;

/// One party's half of a boolean-to-arithmetic conversion couple: `xor_share`
/// is a boolean (0/1) share, `add_share` an arithmetic share mod `M`, with
/// `xor_0 ⊕ xor_1 = add_0 + add_1 mod M` across the two parties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct XorAddCouple {
    pub xor_share: u8,
    pub add_share: u64,
}

/// One party's `fss_eq` primitive: an additive share of the mask `alpha`
/// (`alpha_share_0 + alpha_share_1 = alpha mod M`) alongside this party's half
/// of the DPF key. The dealer never hands the same party both shares of one
/// `alpha`; the round-1 mask is only ever reconstructed by combining the two
/// parties' `m_share` contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqPrimitive {
    pub alpha_share: u64,
    pub key: DpfKeyShare,
}

/// One party's `fss_comp` primitive, the DIF analogue of [`EqPrimitive`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompPrimitive {
    pub alpha_share: u64,
    pub key: DifKeyShare,
}

/// A per-party store of three independent FIFO queues, each behind its own
/// mutex so that concurrent callers touching different queues never contend
/// (SPEC_FULL.md §4.5).
#[derive(Default)]
pub struct PrimitiveStore {
    fss_eq: Mutex<VecDeque<EqPrimitive>>,
    fss_comp: Mutex<VecDeque<CompPrimitive>>,
    xor_add_couple: Mutex<VecDeque<XorAddCouple>>,
}

impl PrimitiveStore {
    pub fn new() -> Self {
        PrimitiveStore {
            fss_eq: Mutex::new(VecDeque::new()),
            fss_comp: Mutex::new(VecDeque::new()),
            xor_add_couple: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_eq(&self, primitives: impl IntoIterator<Item = EqPrimitive>) {
        self.fss_eq.lock().unwrap().extend(primitives);
    }

    pub fn push_comp(&self, primitives: impl IntoIterator<Item = CompPrimitive>) {
        self.fss_comp.lock().unwrap().extend(primitives);
    }

    pub fn push_xor_add(&self, couples: impl IntoIterator<Item = XorAddCouple>) {
        self.xor_add_couple.lock().unwrap().extend(couples);
    }

    /// Looks at the head `fss_eq` primitive without consuming it (round 1).
    pub fn peek_eq(&self) -> FssResult<EqPrimitive> {
        self.fss_eq
            .lock()
            .unwrap()
            .front()
            .cloned()
            .ok_or(FssError::EmptyPrimitiveStore { queue: "fss_eq" })
    }

    /// Consumes the head `fss_eq` primitive (round 2).
    pub fn pop_eq(&self) -> FssResult<EqPrimitive> {
        self.fss_eq
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(FssError::EmptyPrimitiveStore { queue: "fss_eq" })
    }

    /// Batched `peek_eq`: looks at the first `n` `fss_eq` primitives in FIFO
    /// order without consuming any of them, for a batched round 1.
    pub fn peek_eq_n(&self, n: usize) -> FssResult<Vec<EqPrimitive>> {
        let q = self.fss_eq.lock().unwrap();
        if q.len() < n {
            return Err(FssError::EmptyPrimitiveStore { queue: "fss_eq" });
        }
        Ok(q.iter().take(n).cloned().collect())
    }

    /// Batched `pop_eq`: consumes the first `n` `fss_eq` primitives in FIFO
    /// order for a batched round 2. All-or-nothing: if fewer than `n`
    /// primitives are available, none are consumed.
    pub fn pop_eq_n(&self, n: usize) -> FssResult<Vec<EqPrimitive>> {
        let mut q = self.fss_eq.lock().unwrap();
        if q.len() < n {
            return Err(FssError::EmptyPrimitiveStore { queue: "fss_eq" });
        }
        Ok((0..n).map(|_| q.pop_front().unwrap()).collect())
    }

    pub fn peek_comp(&self) -> FssResult<CompPrimitive> {
        self.fss_comp
            .lock()
            .unwrap()
            .front()
            .cloned()
            .ok_or(FssError::EmptyPrimitiveStore { queue: "fss_comp" })
    }

    pub fn pop_comp(&self) -> FssResult<CompPrimitive> {
        self.fss_comp
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(FssError::EmptyPrimitiveStore { queue: "fss_comp" })
    }

    pub fn pop_comp_n(&self, n: usize) -> FssResult<Vec<CompPrimitive>> {
        let mut q = self.fss_comp.lock().unwrap();
        if q.len() < n {
            return Err(FssError::EmptyPrimitiveStore { queue: "fss_comp" });
        }
        Ok((0..n).map(|_| q.pop_front().unwrap()).collect())
    }

    pub fn peek_comp_n(&self, n: usize) -> FssResult<Vec<CompPrimitive>> {
        let q = self.fss_comp.lock().unwrap();
        if q.len() < n {
            return Err(FssError::EmptyPrimitiveStore { queue: "fss_comp" });
        }
        Ok(q.iter().take(n).cloned().collect())
    }

    /// Consumes the head xor-add couple. Unlike `fss_eq`/`fss_comp`, round 3
    /// pops this queue directly with no preceding peek.
    pub fn pop_xor_add(&self) -> FssResult<XorAddCouple> {
        self.xor_add_couple
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(FssError::EmptyPrimitiveStore {
                queue: "xor_add_couple",
            })
    }

    /// Batched `pop_xor_add`: consumes the first `n` couples, no preceding peek.
    pub fn pop_xor_add_n(&self, n: usize) -> FssResult<Vec<XorAddCouple>> {
        let mut q = self.xor_add_couple.lock().unwrap();
        if q.len() < n {
            return Err(FssError::EmptyPrimitiveStore {
                queue: "xor_add_couple",
            });
        }
        Ok((0..n).map(|_| q.pop_front().unwrap()).collect())
    }

    pub fn eq_len(&self) -> usize {
        self.fss_eq.lock().unwrap().len()
    }

    pub fn comp_len(&self) -> usize {
        self.fss_comp.lock().unwrap().len()
    }

    pub fn xor_add_len(&self) -> usize {
        self.xor_add_couple.lock().unwrap().len()
    }
}

/// The offline dealer: a pure, stateless producer of primitive batches. It
/// holds no queue state of its own — callers push its output onto each
/// party's `PrimitiveStore` (SPEC_FULL.md §4.6).
pub struct Dealer {
    params: GlobalParams,
}

impl Dealer {
    pub fn new(params: GlobalParams) -> Self {
        Dealer { params }
    }

    pub fn params(&self) -> &GlobalParams {
        &self.params
    }

    /// Produces `count` fresh DPF primitives for the `fss_eq` queue, each
    /// party receiving its own additive share of `alpha` alongside its half
    /// of the DPF key.
    pub fn keygen_eq(
        &self,
        count: usize,
        rng: &mut impl RngCore,
    ) -> FssResult<(Vec<EqPrimitive>, Vec<EqPrimitive>, Vec<u64>)> {
        let mut p0s = Vec::with_capacity(count);
        let mut p1s = Vec::with_capacity(count);
        let mut alphas = Vec::with_capacity(count);
        for _ in 0..count {
            let (alpha, k0, k1) = dpf::keygen(&self.params, rng)?;
            let alpha0 = self.params.reduce(rng.next_u64());
            let alpha1 = self.params.sub(alpha, alpha0);
            p0s.push(EqPrimitive {
                alpha_share: alpha0,
                key: k0,
            });
            p1s.push(EqPrimitive {
                alpha_share: alpha1,
                key: k1,
            });
            alphas.push(alpha);
        }
        Ok((p0s, p1s, alphas))
    }

    /// Produces `count` fresh DIF primitives for the `fss_comp` queue.
    pub fn keygen_comp(
        &self,
        count: usize,
        rng: &mut impl RngCore,
    ) -> FssResult<(Vec<CompPrimitive>, Vec<CompPrimitive>, Vec<u64>)> {
        let mut p0s = Vec::with_capacity(count);
        let mut p1s = Vec::with_capacity(count);
        let mut alphas = Vec::with_capacity(count);
        for _ in 0..count {
            let (alpha, k0, k1) = dif::keygen(&self.params, rng)?;
            let alpha0 = self.params.reduce(rng.next_u64());
            let alpha1 = self.params.sub(alpha, alpha0);
            p0s.push(CompPrimitive {
                alpha_share: alpha0,
                key: k0,
            });
            p1s.push(CompPrimitive {
                alpha_share: alpha1,
                key: k1,
            });
            alphas.push(alpha);
        }
        Ok((p0s, p1s, alphas))
    }

    /// Produces `count` xor-add couples for boolean-to-arithmetic conversion.
    pub fn keygen_xor_add(
        &self,
        count: usize,
        rng: &mut impl RngCore,
    ) -> (Vec<XorAddCouple>, Vec<XorAddCouple>) {
        let mut p0s = Vec::with_capacity(count);
        let mut p1s = Vec::with_capacity(count);
        for _ in 0..count {
            let mu = (rng.next_u32() & 1) as u8;
            let xor_0 = (rng.next_u32() & 1) as u8;
            let xor_1 = xor_0 ^ mu;
            let add_0 = self.params.reduce(rng.next_u64());
            let add_1 = self.params.sub(mu as u64, add_0);
            p0s.push(XorAddCouple {
                xor_share: xor_0,
                add_share: add_0,
            });
            p1s.push(XorAddCouple {
                xor_share: xor_1,
                add_share: add_1,
            });
        }
        (p0s, p1s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn small_params() -> GlobalParams {
        GlobalParams::new(64, 4).unwrap()
    }

    #[test]
    fn peek_does_not_consume_but_pop_does() {
        let params = small_params();
        let dealer = Dealer::new(params);
        let mut rng = thread_rng();
        let (k0s, _k1s, _alphas) = dealer.keygen_eq(2, &mut rng).unwrap();

        let store = PrimitiveStore::new();
        store.push_eq(k0s);

        assert_eq!(store.eq_len(), 2);
        store.peek_eq().unwrap();
        assert_eq!(store.eq_len(), 2, "peek must not consume");
        store.pop_eq().unwrap();
        assert_eq!(store.eq_len(), 1, "pop must consume exactly one");
    }

    #[test]
    fn empty_queue_surfaces_typed_error() {
        let store = PrimitiveStore::new();
        match store.pop_eq() {
            Err(FssError::EmptyPrimitiveStore { queue }) => assert_eq!(queue, "fss_eq"),
            other => panic!("expected EmptyPrimitiveStore, got {other:?}"),
        }
    }

    #[test]
    fn xor_add_couple_invariant_holds() {
        let params = small_params();
        let dealer = Dealer::new(params);
        let mut rng = thread_rng();
        let (p0s, p1s) = dealer.keygen_xor_add(16, &mut rng);
        for (c0, c1) in p0s.iter().zip(p1s.iter()) {
            let xor = c0.xor_share ^ c1.xor_share;
            let add = params.add(c0.add_share, c1.add_share);
            assert_eq!(xor as u64, add);
        }
    }

    #[test]
    fn refill_after_drain_recovers() {
        let params = small_params();
        let dealer = Dealer::new(params);
        let mut rng = thread_rng();
        let store = PrimitiveStore::new();
        assert!(store.pop_eq().is_err());

        let (k0s, _k1s, _alphas) = dealer.keygen_eq(1, &mut rng).unwrap();
        store.push_eq(k0s);
        assert!(store.pop_eq().is_ok());
    }

    #[test]
    fn alpha_shares_reconstruct_the_dealt_alpha() {
        let params = small_params();
        let dealer = Dealer::new(params);
        let mut rng = thread_rng();
        let (p0s, p1s, alphas) = dealer.keygen_eq(8, &mut rng).unwrap();
        for ((p0, p1), alpha) in p0s.iter().zip(p1s.iter()).zip(alphas.iter()) {
            assert_eq!(params.add(p0.alpha_share, p1.alpha_share), *alpha);
        }
    }
}
