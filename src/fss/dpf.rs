//! Distributed Point Function: `f_alpha(x) = 1` if `x == alpha`, else `0`,
//! split into two additive shares over `Z/2^n` (SPEC_FULL.md §4.2).
//!
//! Grounded on the `DPF` class of the original reference implementation
//! (`original_source/syft/frameworks/torch/mpc/fss.py`) and on the
//! truth-table-by-truth-table build style of `preprocessed_gate.rs`.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::fss::bits::{bit_decomposition, BitVec};
use crate::fss::error::FssResult;
use crate::fss::params::GlobalParams;
use crate::fss::prg;

/// One party's half of a DPF key. `cw` and `cw_n` are identical across both
/// shares of a keygen call; only `s0` differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpfKeyShare {
    pub params: GlobalParams,
    pub s0: BitVec,
    pub cw: Vec<BitVec>,
    pub cw_n: u64,
}

fn truth_table(s_rand: &BitVec, alpha_i: u8, lambda: usize) -> BitVec {
    let row = BitVec::concat(&[s_rand.clone(), BitVec::from_bits(vec![1])]);
    let zero_row = BitVec::zeros(lambda + 1);
    if alpha_i == 0 {
        BitVec::concat(&[row, zero_row])
    } else {
        BitVec::concat(&[zero_row, row])
    }
}

/// Generates a fresh DPF keypair for a uniformly random `alpha` in `[0, 2^n)`.
/// Returns `(alpha, key_for_party_0, key_for_party_1)`.
pub fn keygen(
    params: &GlobalParams,
    rng: &mut impl RngCore,
) -> FssResult<(u64, DpfKeyShare, DpfKeyShare)> {
    let n = params.n;
    let lambda = params.lambda;
    let alpha = params.reduce(rng.next_u64());
    let alpha_bits = bit_decomposition(alpha, n);

    let mut s: Vec<[BitVec; 2]> = Vec::with_capacity(n + 1);
    let mut t: Vec<[u8; 2]> = Vec::with_capacity(n + 1);
    let mut cw: Vec<BitVec> = Vec::with_capacity(n);

    s.push([BitVec::random(lambda, rng), BitVec::random(lambda, rng)]);
    t.push([0, 1]);

    for i in 0..n {
        let g0 = prg::g(&s[i][0], params)?;
        let g1 = prg::g(&s[i][1], params)?;
        let parts0 = g0.split(&[lambda, 1, lambda, 1]);
        let parts1 = g1.split(&[lambda, 1, lambda, 1]);
        let (s_l0, s_r0) = (&parts0[0], &parts0[2]);
        let (s_l1, s_r1) = (&parts1[0], &parts1[2]);

        let alpha_i = alpha_bits.bit(i);
        let s_rand = if alpha_i == 1 {
            s_l0.xor(s_l1)
        } else {
            s_r0.xor(s_r1)
        };

        let cw_i = truth_table(&s_rand, alpha_i, lambda).xor(&g0).xor(&g1);

        let mut next_s = [BitVec::zeros(lambda), BitVec::zeros(lambda)];
        let mut next_t = [0u8, 0u8];
        for (b, g_b) in [&g0, &g1].into_iter().enumerate() {
            let tau = g_b.xor(&cw_i.scale(t[i][b]));
            let rows = tau.split(&[lambda + 1, lambda + 1]);
            let row = &rows[alpha_i as usize];
            let parts = row.split(&[lambda, 1]);
            next_s[b] = parts[0].clone();
            next_t[b] = parts[1].bit(0);
        }
        cw.push(cw_i);
        s.push(next_s);
        t.push(next_t);
    }

    let conv0 = s[n][0].convert(n);
    let conv1 = s[n][1].convert(n);
    let base = params.add(params.sub(1, conv0), conv1);
    let cw_n = if t[n][1] == 1 { params.neg(base) } else { base };

    let k0 = DpfKeyShare {
        params: *params,
        s0: s[0][0].clone(),
        cw: cw.clone(),
        cw_n,
    };
    let k1 = DpfKeyShare {
        params: *params,
        s0: s[0][1].clone(),
        cw,
        cw_n,
    };
    Ok((alpha, k0, k1))
}

/// Evaluates party `b`'s share of `f_alpha(x)`.
pub fn eval(b: u8, x: u64, key: &DpfKeyShare, params: &GlobalParams) -> FssResult<u64> {
    params.ensure_matches(&key.params)?;
    let n = params.n;
    let lambda = params.lambda;
    let x_bits = bit_decomposition(params.reduce(x), n);

    let mut s = key.s0.clone();
    let mut t = b;
    for i in 0..n {
        let g_out = prg::g(&s, params)?;
        let tau = g_out.xor(&key.cw[i].scale(t));
        let rows = tau.split(&[lambda + 1, lambda + 1]);
        let row = &rows[x_bits.bit(i) as usize];
        let parts = row.split(&[lambda, 1]);
        s = parts[0].clone();
        t = parts[1].bit(0);
    }

    let conv_s_n = s.convert(n);
    let inner = if t == 1 {
        params.add(conv_s_n, key.cw_n)
    } else {
        conv_s_n
    };
    Ok(if b == 0 { inner } else { params.neg(inner) })
}
