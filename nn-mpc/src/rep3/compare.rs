use super::{
    precompute::compose_bits, protocol::Context, share::Share, utils, vecshare::VecShare,
};
use crate::{
    error::Error,
    traits::network_trait::NetworkTrait,
    types::ring_element::RingElement,
};
use num_traits::{One, Zero};

const RING_BITS: usize = 64;
const LOW_BITS: usize = RING_BITS - 1;

impl<N: NetworkTrait> Context<N> {
    /// Shared most significant bit, i.e. `[x < 0]` for two's complement values.
    pub async fn msb(&mut self, x: &VecShare<u64>) -> Result<VecShare<u64>, Error> {
        let n = x.len();
        if n == 0 {
            return Ok(VecShare::zero(0));
        }
        tracing::debug!("party {}: msb of {} values", self.id, n);
        let bits = self.get_random_bits(n * RING_BITS).await?.bits;

        let mut r = VecShare::with_capacity(n);
        for k in 0..n {
            r.push(compose_bits(&bits, k * RING_BITS, 0).0);
        }
        let c = self.open_many(&x.add(&r)?).await?;

        // leaves: lt_i = [c_i < r_i], eq_i = [c_i == r_i] for the 63 low bits
        let one = Share::from_public(RingElement::one(), self.id);
        let mut lt = VecShare::with_capacity(n * LOW_BITS);
        let mut eq = VecShare::with_capacity(n * LOW_BITS);
        for (k, c_) in c.iter().enumerate() {
            for i in 0..LOW_BITS {
                let r_i = bits.get_at(k * RING_BITS + i);
                if c_.get_bit(i) {
                    lt.push(Share::zero());
                    eq.push(r_i);
                } else {
                    lt.push(r_i);
                    eq.push(one - r_i);
                }
            }
        }

        let lt = self.lt_tree(lt, eq, n, LOW_BITS).await?;

        // msb = c_63 xor r_63 xor lt
        let t: VecShare<u64> = c
            .iter()
            .enumerate()
            .map(|(k, c_)| {
                let r_top = bits.get_at(k * RING_BITS + LOW_BITS);
                if c_.get_bit(LOW_BITS) {
                    one - r_top
                } else {
                    r_top
                }
            })
            .collect();
        self.xor(&t, &lt).await
    }

    /// Reduces `n` groups of `width` (lt, eq) leaves, ordered from the least
    /// significant position, to one lt per group.
    async fn lt_tree(
        &mut self,
        mut lt: VecShare<u64>,
        mut eq: VecShare<u64>,
        n: usize,
        mut width: usize,
    ) -> Result<VecShare<u64>, Error> {
        let levels = utils::ceil_log2(width);
        tracing::trace!("party {}: comparison tree of {} levels", self.id, levels);
        for _ in 0..levels {
            let half = width / 2;
            let new_width = half + width % 2;
            let need_eq = new_width > 1;

            let mut lhs = VecShare::with_capacity(2 * n * half);
            let mut rhs = VecShare::with_capacity(2 * n * half);
            for k in 0..n {
                for j in 0..half {
                    let lo = k * width + 2 * j;
                    lhs.push(eq.get_at(lo + 1));
                    rhs.push(lt.get_at(lo));
                }
            }
            if need_eq {
                for k in 0..n {
                    for j in 0..half {
                        let lo = k * width + 2 * j;
                        lhs.push(eq.get_at(lo + 1));
                        rhs.push(eq.get_at(lo));
                    }
                }
            }
            let mut prod = self.mul(&lhs, &rhs).await?;
            let eq_prod = prod.split_off_back(if need_eq { n * half } else { 0 });

            let mut new_lt = VecShare::with_capacity(n * new_width);
            let mut new_eq = VecShare::with_capacity(n * new_width);
            for k in 0..n {
                for j in 0..half {
                    let lo = k * width + 2 * j;
                    // lt = lt_hi + eq_hi * lt_lo, eq = eq_hi * eq_lo
                    new_lt.push(lt.get_at(lo + 1) + prod.get_at(k * half + j));
                    if need_eq {
                        new_eq.push(eq_prod.get_at(k * half + j));
                    }
                }
                if width % 2 == 1 {
                    let top = k * width + width - 1;
                    new_lt.push(lt.get_at(top));
                    if need_eq {
                        new_eq.push(eq.get_at(top));
                    }
                }
            }
            lt = new_lt;
            eq = new_eq;
            width = new_width;
        }
        Ok(lt)
    }

    /// `[x < y]`, valid while `|x - y| < 2^63`.
    pub async fn lt(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        self.msb(&x.sub(y)?).await
    }

    /// `[x >= 0]`, the derivative of ReLU.
    pub async fn drelu(&mut self, x: &VecShare<u64>) -> Result<VecShare<u64>, Error> {
        let msb = self.msb(x).await?;
        Ok(self.one_minus(&msb))
    }

    /// Returns `max(x, 0)` together with the selection bits.
    pub async fn relu(
        &mut self,
        x: &VecShare<u64>,
    ) -> Result<(VecShare<u64>, VecShare<u64>), Error> {
        let d = self.drelu(x).await?;
        let res = self.mul(x, &d).await?;
        Ok((res, d))
    }

    /// `x` where the bit is one, `y` where it is zero.
    pub async fn select(
        &mut self,
        bits: &VecShare<u64>,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let diff = x.sub(y)?;
        let chosen = self.mul(bits, &diff).await?;
        y.add(&chosen)
    }
}
