//! Local row-major matrix products over ring elements.

use super::vecshare::VecShare;
use crate::types::{int_ring::IntRing2k, ring_element::RingElement};
use rayon::prelude::*;

/// `x (m x n) * y (n x p)`.
pub(crate) fn matmul<T: IntRing2k>(
    x: &[RingElement<T>],
    y: &[RingElement<T>],
    m: usize,
    n: usize,
    p: usize,
) -> Vec<RingElement<T>> {
    debug_assert_eq!(x.len(), m * n);
    debug_assert_eq!(y.len(), n * p);
    let mut res = vec![RingElement::default(); m * p];
    if p == 0 {
        return res;
    }
    res.par_chunks_mut(p).enumerate().for_each(|(i, row)| {
        for k in 0..n {
            let xik = x[i * n + k];
            for (r, y_) in row.iter_mut().zip(y[k * p..(k + 1) * p].iter()) {
                *r += xik * y_;
            }
        }
    });
    res
}

fn add_slices<T: IntRing2k>(
    x: &[RingElement<T>],
    y: &[RingElement<T>],
) -> Vec<RingElement<T>> {
    x.iter().zip(y.iter()).map(|(x_, y_)| *x_ + y_).collect()
}

/// The local part of a shared matrix product, without randomness and without
/// communication.
pub(crate) fn matmul_local<T: IntRing2k>(
    x: &VecShare<T>,
    y: &VecShare<T>,
    m: usize,
    n: usize,
    p: usize,
) -> Vec<RingElement<T>> {
    let y_sum = add_slices(&y.a, &y.b);
    let first = matmul(&x.a, &y_sum, m, n, p);
    let second = matmul(&x.b, &y.a, m, n, p);
    add_slices(&first, &second)
}

/// Public matrix on the left, fully local.
pub(crate) fn matmul_public_left<T: IntRing2k>(
    x: &[RingElement<T>],
    y: &VecShare<T>,
    m: usize,
    n: usize,
    p: usize,
) -> VecShare<T> {
    VecShare {
        a: matmul(x, &y.a, m, n, p),
        b: matmul(x, &y.b, m, n, p),
    }
}

/// Public matrix on the right, fully local.
pub(crate) fn matmul_public_right<T: IntRing2k>(
    x: &VecShare<T>,
    y: &[RingElement<T>],
    m: usize,
    n: usize,
    p: usize,
) -> VecShare<T> {
    VecShare {
        a: matmul(&x.a, y, m, n, p),
        b: matmul(&x.b, y, m, n, p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(v: &[u64]) -> Vec<RingElement<u64>> {
        v.iter().map(|x| RingElement(*x)).collect()
    }

    #[test]
    fn small_product() {
        // [1 2 3; 4 5 6] * [1 0; 0 1; 1 1]
        let x = re(&[1, 2, 3, 4, 5, 6]);
        let y = re(&[1, 0, 0, 1, 1, 1]);
        assert_eq!(matmul(&x, &y, 2, 3, 2), re(&[4, 5, 10, 11]));
    }

    #[test]
    fn wraps_around() {
        let x = re(&[u64::MAX]);
        let y = re(&[2]);
        assert_eq!(matmul(&x, &y, 1, 1, 1), re(&[u64::MAX - 1]));
    }
}
