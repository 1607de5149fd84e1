//! Pools of correlated randomness consumed by the arithmetic protocols.
//!
//! Every pool is drained by value, so a triple, mask or bit handed out once can never
//! be handed out again. An empty pool is refilled synchronously with a batch of at
//! least the configured size.

use super::{
    id::PartyID,
    linalg,
    protocol::{Context, SecurityLevel},
    share::Share,
    vecshare::VecShare,
};
use crate::{
    error::Error,
    traits::network_trait::NetworkTrait,
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const RING_BITS: usize = 64;

/// Number of items generated per refill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub triples: usize,
    pub random_bits: usize,
    pub truncation_masks: usize,
    pub matrix_triples: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            triples: 4096,
            random_bits: 8192,
            truncation_masks: 256,
            matrix_triples: 1,
        }
    }
}

/// Element-wise multiplication triples with `c = a * b`.
#[derive(Debug, Default)]
pub struct Triples {
    pub(crate) a: VecShare<u64>,
    pub(crate) b: VecShare<u64>,
    pub(crate) c: VecShare<u64>,
}

impl Triples {
    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    fn split_off_back(&mut self, n: usize) -> Self {
        Self {
            a: self.a.split_off_back(n),
            b: self.b.split_off_back(n),
            c: self.c.split_off_back(n),
        }
    }

    fn extend(&mut self, other: Self) {
        self.a.extend(other.a);
        self.b.extend(other.b);
        self.c.extend(other.c);
    }
}

/// `A (m x n)`, `B (n x p)`, `C = A * B`.
#[derive(Debug)]
pub struct MatrixTriple {
    pub(crate) shape: (usize, usize, usize),
    pub(crate) a: VecShare<u64>,
    pub(crate) b: VecShare<u64>,
    pub(crate) c: VecShare<u64>,
}

/// Shared `r` and `r >> shift`.
#[derive(Debug)]
pub struct TruncationMasks {
    pub(crate) r: VecShare<u64>,
    pub(crate) r_shifted: VecShare<u64>,
}

impl TruncationMasks {
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

/// Arithmetic sharings of uniformly random bits.
#[derive(Debug)]
pub struct RandomBits {
    pub(crate) bits: VecShare<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub triples_generated: usize,
    pub triples_consumed: usize,
    pub matrix_triples_generated: usize,
    pub matrix_triples_consumed: usize,
    pub masks_generated: usize,
    pub masks_consumed: usize,
    pub bits_generated: usize,
    pub bits_consumed: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "triples {}/{}, matrix triples {}/{}, truncation masks {}/{}, random bits {}/{} (consumed/generated)",
            self.triples_consumed,
            self.triples_generated,
            self.matrix_triples_consumed,
            self.matrix_triples_generated,
            self.masks_consumed,
            self.masks_generated,
            self.bits_consumed,
            self.bits_generated
        )
    }
}

fn exhausted(requested: usize, available: usize) -> Error {
    Error::RandomnessExhaustion {
        requested,
        available,
    }
}

pub struct Precompute {
    batch: BatchConfig,
    triples: Triples,
    matrix_triples: HashMap<(usize, usize, usize), Vec<MatrixTriple>>,
    masks: HashMap<u32, TruncationMasks>,
    bits: VecShare<u64>,
    stats: PoolStats,
}

impl Precompute {
    pub fn new(batch: BatchConfig) -> Self {
        Self {
            batch,
            triples: Triples::default(),
            matrix_triples: HashMap::new(),
            masks: HashMap::new(),
            bits: VecShare::default(),
            stats: PoolStats::default(),
        }
    }

    pub fn batch(&self) -> &BatchConfig {
        &self.batch
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn available_triples(&self) -> usize {
        self.triples.len()
    }

    pub fn available_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn available_masks(&self, shift: u32) -> usize {
        self.masks.get(&shift).map_or(0, TruncationMasks::len)
    }

    pub(crate) fn take_triples(&mut self, n: usize) -> Result<Triples, Error> {
        if self.triples.len() < n {
            return Err(exhausted(n, self.triples.len()));
        }
        self.stats.triples_consumed += n;
        Ok(self.triples.split_off_back(n))
    }

    fn add_triples(&mut self, triples: Triples) {
        self.stats.triples_generated += triples.len();
        self.triples.extend(triples);
    }

    pub(crate) fn take_matrix_triple(
        &mut self,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<MatrixTriple, Error> {
        let triple = self
            .matrix_triples
            .get_mut(&(m, n, p))
            .and_then(Vec::pop)
            .ok_or_else(|| exhausted(1, 0))?;
        self.stats.matrix_triples_consumed += 1;
        Ok(triple)
    }

    fn add_matrix_triple(&mut self, triple: MatrixTriple) {
        self.stats.matrix_triples_generated += 1;
        self.matrix_triples
            .entry(triple.shape)
            .or_default()
            .push(triple);
    }

    pub(crate) fn take_truncation_masks(
        &mut self,
        n: usize,
        shift: u32,
    ) -> Result<TruncationMasks, Error> {
        let available = self.available_masks(shift);
        let pool = match self.masks.get_mut(&shift) {
            Some(pool) if available >= n => pool,
            _ => return Err(exhausted(n, available)),
        };
        self.stats.masks_consumed += n;
        Ok(TruncationMasks {
            r: pool.r.split_off_back(n),
            r_shifted: pool.r_shifted.split_off_back(n),
        })
    }

    fn add_truncation_masks(&mut self, shift: u32, masks: TruncationMasks) {
        self.stats.masks_generated += masks.len();
        let pool = self.masks.entry(shift).or_insert_with(|| TruncationMasks {
            r: VecShare::default(),
            r_shifted: VecShare::default(),
        });
        pool.r.extend(masks.r);
        pool.r_shifted.extend(masks.r_shifted);
    }

    pub(crate) fn take_random_bits(&mut self, n: usize) -> Result<RandomBits, Error> {
        if self.bits.len() < n {
            return Err(exhausted(n, self.bits.len()));
        }
        self.stats.bits_consumed += n;
        Ok(RandomBits {
            bits: self.bits.split_off_back(n),
        })
    }

    fn add_random_bits(&mut self, bits: RandomBits) {
        self.stats.bits_generated += bits.bits.len();
        self.bits.extend(bits.bits);
    }
}

impl<N: NetworkTrait> Context<N> {
    pub(crate) async fn get_triples(&mut self, n: usize) -> Result<Triples, Error> {
        match self.precompute.take_triples(n) {
            Err(Error::RandomnessExhaustion {
                requested,
                available,
            }) => {
                let amount = self.precompute.batch.triples.max(requested - available);
                tracing::debug!("party {}: generating {} triples", self.id, amount);
                let triples = match self.security {
                    SecurityLevel::SemiHonest => self.semi_honest_triples(amount).await?,
                    SecurityLevel::Malicious => self.sacrificed_triples(amount).await?,
                };
                self.precompute.add_triples(triples);
                self.precompute.take_triples(n)
            }
            res => res,
        }
    }

    pub(crate) async fn get_matrix_triple(
        &mut self,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<MatrixTriple, Error> {
        match self.precompute.take_matrix_triple(m, n, p) {
            Err(Error::RandomnessExhaustion { .. }) => {
                let amount = self.precompute.batch.matrix_triples.max(1);
                tracing::debug!(
                    "party {}: generating {} matrix triples of shape {}x{}x{}",
                    self.id,
                    amount,
                    m,
                    n,
                    p
                );
                for _ in 0..amount {
                    let triple = match self.security {
                        SecurityLevel::SemiHonest => {
                            self.semi_honest_matrix_triple(m, n, p).await?
                        }
                        SecurityLevel::Malicious => {
                            self.sacrificed_matrix_triple(m, n, p).await?
                        }
                    };
                    self.precompute.add_matrix_triple(triple);
                }
                self.precompute.take_matrix_triple(m, n, p)
            }
            res => res,
        }
    }

    pub(crate) async fn get_truncation_masks(
        &mut self,
        n: usize,
        shift: u32,
    ) -> Result<TruncationMasks, Error> {
        match self.precompute.take_truncation_masks(n, shift) {
            Err(Error::RandomnessExhaustion {
                requested,
                available,
            }) => {
                let amount = self
                    .precompute
                    .batch
                    .truncation_masks
                    .max(requested - available);
                tracing::debug!(
                    "party {}: generating {} truncation masks for shift {}",
                    self.id,
                    amount,
                    shift
                );
                let masks = self.generate_truncation_masks(amount, shift).await?;
                self.precompute.add_truncation_masks(shift, masks);
                self.precompute.take_truncation_masks(n, shift)
            }
            res => res,
        }
    }

    pub(crate) async fn get_random_bits(&mut self, n: usize) -> Result<RandomBits, Error> {
        match self.precompute.take_random_bits(n) {
            Err(Error::RandomnessExhaustion {
                requested,
                available,
            }) => {
                let amount = self.precompute.batch.random_bits.max(requested - available);
                tracing::debug!("party {}: generating {} random bits", self.id, amount);
                let bits = self.generate_random_bits(amount).await?;
                self.precompute.add_random_bits(bits);
                self.precompute.take_random_bits(n)
            }
            res => res,
        }
    }

    /// Re-shares the local parts of `x * y` plus a zero sharing: one round.
    pub(super) async fn reshare_products<T: IntRing2k>(
        &mut self,
        x: &VecShare<T>,
        y: &VecShare<T>,
    ) -> Result<VecShare<T>, Error> {
        debug_assert_eq!(x.len(), y.len());
        let shares_a: Vec<RingElement<T>> = x
            .iter()
            .zip(y.iter())
            .map(|(x_, y_)| x_.mul_local(&y_) + self.prf.gen_zero_share::<T>())
            .collect();
        let shares_b = self.comm.send_and_receive_vec(&shares_a).await?;
        VecShare::new(shares_a, shares_b)
    }

    pub(super) async fn reshare_matmul<T: IntRing2k>(
        &mut self,
        x: &VecShare<T>,
        y: &VecShare<T>,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<VecShare<T>, Error> {
        let mut shares_a = linalg::matmul_local(x, y, m, n, p);
        for v in shares_a.iter_mut() {
            *v += self.prf.gen_zero_share::<T>();
        }
        let shares_b = self.comm.send_and_receive_vec(&shares_a).await?;
        VecShare::new(shares_a, shares_b)
    }

    async fn semi_honest_triples(&mut self, n: usize) -> Result<Triples, Error> {
        let a = self.random_shares::<u64>(n);
        let b = self.random_shares::<u64>(n);
        let c = self.reshare_products(&a, &b).await?;
        Ok(Triples { a, b, c })
    }

    async fn semi_honest_matrix_triple(
        &mut self,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<MatrixTriple, Error> {
        let a = self.random_shares::<u64>(m * n);
        let b = self.random_shares::<u64>(n * p);
        let c = self.reshare_matmul(&a, &b, m, n, p).await?;
        Ok(MatrixTriple {
            shape: (m, n, p),
            a,
            b,
            c,
        })
    }

    /// `b = t_0 xor t_1 xor t_2` where `t_j` is known to parties `j` and `j + 1`.
    async fn generate_random_bits(&mut self, n: usize) -> Result<RandomBits, Error> {
        let me = self.id;
        let mut components: [VecShare<u64>; 3] = Default::default();
        for _ in 0..n {
            let (t_next, t_prev) = self.prf.gen_bit_pair();
            for id in PartyID::ALL {
                let share = if id == me {
                    Share::new(RingElement::from(t_next), RingElement::zero())
                } else if id == me.prev_id() {
                    Share::new(RingElement::zero(), RingElement::from(t_prev))
                } else {
                    Share::zero()
                };
                components[usize::from(id)].push(share);
            }
        }
        let [s0, s1, s2] = components;
        let u = self.xor(&s0, &s1).await?;
        let bits = self.xor(&u, &s2).await?;
        Ok(RandomBits { bits })
    }

    /// `x + y - 2xy` for shared bits.
    pub(crate) async fn xor(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let xy = self.mul(x, y).await?;
        x.add(y)?.sub(&xy.mul_public(RingElement(2)))
    }

    /// `r = sum 2^i b_i` over all ring bits and `r >> shift` from the same bits.
    async fn generate_truncation_masks(
        &mut self,
        n: usize,
        shift: u32,
    ) -> Result<TruncationMasks, Error> {
        let bits = self.get_random_bits(n * RING_BITS).await?.bits;
        let mut r = VecShare::with_capacity(n);
        let mut r_shifted = VecShare::with_capacity(n);
        for k in 0..n {
            let (full, shifted) = compose_bits(&bits, k * RING_BITS, shift);
            r.push(full);
            r_shifted.push(shifted);
        }
        Ok(TruncationMasks { r, r_shifted })
    }
}

/// Composes the 64 bits starting at `start` into `sum 2^i b_i` and
/// `sum_{i >= shift} 2^(i - shift) b_i`.
pub(crate) fn compose_bits(bits: &VecShare<u64>, start: usize, shift: u32) -> (Share<u64>, Share<u64>) {
    let mut full = Share::zero();
    let mut shifted = Share::zero();
    for i in 0..RING_BITS {
        let bit = bits.get_at(start + i);
        full += bit * RingElement(1u64 << i);
        if i >= shift as usize {
            shifted += bit * RingElement(1u64 << (i - shift as usize));
        }
    }
    (full, shifted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(values: &[u64]) -> VecShare<u64> {
        let a: Vec<_> = values.iter().map(|x| RingElement(*x)).collect();
        VecShare::new(a.clone(), vec![RingElement::zero(); a.len()]).unwrap()
    }

    #[test]
    fn empty_pools_report_exhaustion() {
        let mut pre = Precompute::new(BatchConfig::default());
        assert!(matches!(
            pre.take_triples(1),
            Err(Error::RandomnessExhaustion {
                requested: 1,
                available: 0
            })
        ));
        assert!(pre.take_triples(0).unwrap().is_empty());
        assert!(pre.take_matrix_triple(1, 2, 3).is_err());
        assert!(pre.take_truncation_masks(1, 13).is_err());
        assert!(pre.take_random_bits(5).is_err());
    }

    #[test]
    fn takes_are_linear() {
        let mut pre = Precompute::new(BatchConfig::default());
        pre.add_triples(Triples {
            a: bits(&[1, 2, 3]),
            b: bits(&[4, 5, 6]),
            c: bits(&[4, 10, 18]),
        });
        let first = pre.take_triples(2).unwrap();
        assert_eq!(first.a, bits(&[2, 3]));
        assert_eq!(pre.available_triples(), 1);
        assert!(pre.take_triples(2).is_err());
        let second = pre.take_triples(1).unwrap();
        assert_eq!(second.c, bits(&[4]));
        assert_eq!(pre.stats().triples_consumed, 3);
        assert_eq!(pre.stats().triples_generated, 3);
    }

    #[test]
    fn masks_are_keyed_by_shift() {
        let mut pre = Precompute::new(BatchConfig::default());
        pre.add_truncation_masks(
            13,
            TruncationMasks {
                r: bits(&[1 << 13]),
                r_shifted: bits(&[1]),
            },
        );
        assert_eq!(pre.available_masks(13), 1);
        assert_eq!(pre.available_masks(20), 0);
        assert!(pre.take_truncation_masks(1, 20).is_err());
        assert_eq!(pre.take_truncation_masks(1, 13).unwrap().r_shifted, bits(&[1]));
    }

    #[test]
    fn bit_composition() {
        // 0b1011 followed by zeros
        let mut values = vec![0u64; 64];
        values[0] = 1;
        values[1] = 1;
        values[3] = 1;
        values[63] = 1;
        let (full, shifted) = compose_bits(&bits(&values), 0, 1);
        assert_eq!(full.a.0, 0b1011 | (1 << 63));
        assert_eq!(shifted.a.0, 0b101 | (1 << 62));
    }
}
