//! Distributed Interval Function: `f_alpha(x) = 1` if `x <= alpha`, else `0`,
//! split into two XOR (boolean) shares (SPEC_FULL.md §4.3).
//!
//! Grounded on the `DIF` class of the original reference implementation
//! (`original_source/syft/frameworks/torch/mpc/fss.py`); the leaf-row
//! assignment below mirrors that file's `TruthTableDIF` exactly, including
//! the `1 - alpha_i` row holding the literal value `alpha_i` rather than a
//! constant `1` — the leaf only fires on the "wrong turn" row, which is
//! precisely the row taken once `x` has diverged from `alpha` below the
//! turning bit.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::fss::bits::{bit_decomposition, BitVec};
use crate::fss::error::FssResult;
use crate::fss::params::GlobalParams;
use crate::fss::prg;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifKeyShare {
    pub params: GlobalParams,
    pub s0: BitVec,
    pub cw: Vec<BitVec>,
}

fn truth_table(s_rand: &BitVec, alpha_i: u8, lambda: usize) -> BitVec {
    let leaf_bit = |row: u8| -> u8 {
        if row == 1 - alpha_i {
            alpha_i
        } else {
            0
        }
    };
    let next_row = |row: u8| -> BitVec {
        if row == alpha_i {
            BitVec::concat(&[s_rand.clone(), BitVec::from_bits(vec![1])])
        } else {
            BitVec::zeros(lambda + 1)
        }
    };
    let row0 = BitVec::concat(&[BitVec::from_bits(vec![leaf_bit(0)]), next_row(0)]);
    let row1 = BitVec::concat(&[BitVec::from_bits(vec![leaf_bit(1)]), next_row(1)]);
    BitVec::concat(&[row0, row1])
}

/// Generates a fresh DIF keypair for a uniformly random `alpha` in `[0, 2^n)`.
pub fn keygen(
    params: &GlobalParams,
    rng: &mut impl RngCore,
) -> FssResult<(u64, DifKeyShare, DifKeyShare)> {
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
        let h0 = prg::h(&s[i][0], params)?;
        let h1 = prg::h(&s[i][1], params)?;
        let parts0 = h0.split(&[1, 1, lambda, 1, lambda, 1]);
        let parts1 = h1.split(&[1, 1, lambda, 1, lambda, 1]);
        let (s_l0, s_r0) = (&parts0[2], &parts0[4]);
        let (s_l1, s_r1) = (&parts1[2], &parts1[4]);

        let alpha_i = alpha_bits.bit(i);
        let s_rand = if alpha_i == 1 {
            s_l0.xor(s_l1)
        } else {
            s_r0.xor(s_r1)
        };

        let cw_i = truth_table(&s_rand, alpha_i, lambda).xor(&h0).xor(&h1);

        let mut next_s = [BitVec::zeros(lambda), BitVec::zeros(lambda)];
        let mut next_t = [0u8, 0u8];
        for (b, h_b) in [&h0, &h1].into_iter().enumerate() {
            let tau = h_b.xor(&cw_i.scale(t[i][b]));
            let rows = tau.split(&[lambda + 2, lambda + 2]);
            let row = &rows[alpha_i as usize];
            let parts = row.split(&[1, lambda, 1]);
            next_s[b] = parts[1].clone();
            next_t[b] = parts[2].bit(0);
        }
        cw.push(cw_i);
        s.push(next_s);
        t.push(next_t);
    }

    let k0 = DifKeyShare {
        params: *params,
        s0: s[0][0].clone(),
        cw: cw.clone(),
    };
    let k1 = DifKeyShare {
        params: *params,
        s0: s[0][1].clone(),
        cw,
    };
    Ok((alpha, k0, k1))
}

/// Evaluates party `b`'s XOR share of `f_alpha(x) = [x <= alpha]`.
pub fn eval(b: u8, x: u64, key: &DifKeyShare, params: &GlobalParams) -> FssResult<u8> {
    params.ensure_matches(&key.params)?;
    let n = params.n;
    let lambda = params.lambda;
    let x_bits = bit_decomposition(params.reduce(x), n);

    let mut s = key.s0.clone();
    let mut t = b;
    let mut output = 0u8;
    for i in 0..n {
        let h_out = prg::h(&s, params)?;
        let tau = h_out.xor(&key.cw[i].scale(t));
        let rows = tau.split(&[lambda + 2, lambda + 2]);
        let row = &rows[x_bits.bit(i) as usize];
        let parts = row.split(&[1, lambda, 1]);
        output ^= parts[0].bit(0);
        s = parts[1].clone();
        t = parts[2].bit(0);
    }
    output ^= t;
    Ok(output)
}
