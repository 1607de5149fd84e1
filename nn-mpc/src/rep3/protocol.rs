use super::{
    comm::Comm,
    id::PartyID,
    linalg,
    precompute::{BatchConfig, Precompute, Triples},
    random::prf::{PartyKeys, Prf},
    share::Share,
    vecshare::VecShare,
    verify::Verifier,
};
use crate::{
    error::Error,
    traits::network_trait::NetworkTrait,
    types::{fixed_point, int_ring::IntRing2k, ring_element::RingElement},
};
use num_traits::One;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Dealer-side sharing: returns the share vectors of all three parties.
pub fn share_plain<R: Rng>(values: &[RingElement<u64>], rng: &mut R) -> [VecShare<u64>; 3] {
    let mut shares: [VecShare<u64>; 3] = Default::default();
    for v in values {
        let a = rng.gen::<RingElement<u64>>();
        let b = rng.gen::<RingElement<u64>>();
        let c = *v - a - b;

        shares[0].push(Share::new(a, c));
        shares[1].push(Share::new(b, a));
        shares[2].push(Share::new(c, b));
    }
    shares
}

/// Adversary model the engine protects against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    #[serde(alias = "semi-honest", alias = "Semi-honest")]
    SemiHonest,
    #[serde(alias = "malicious", alias = "Malicious")]
    Malicious,
}

impl FromStr for SecurityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semi-honest" | "Semi-honest" => Ok(Self::SemiHonest),
            "malicious" | "Malicious" => Ok(Self::Malicious),
            _ => Err(Error::ConfigError(format!(
                "unknown security level {:?}, expected semi-honest or malicious",
                s
            ))),
        }
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SemiHonest => write!(f, "semi-honest"),
            Self::Malicious => write!(f, "malicious"),
        }
    }
}

/// Everything one party needs to run the protocols: identity, channels, keyed
/// streams, precompute pools and the pending malicious-mode checks.
pub struct Context<N: NetworkTrait> {
    pub(super) id: PartyID,
    pub(super) comm: Comm<N>,
    pub(super) prf: Prf,
    pub(super) precompute: Precompute,
    pub(super) verifier: Verifier,
    pub(super) security: SecurityLevel,
    pub(super) frac_bits: u32,
}

impl<N: NetworkTrait> Context<N> {
    /// Takes over a connected network and runs the setup barrier, so round 0 of the
    /// first protocol starts in lockstep.
    pub async fn new(
        network: N,
        keys: &PartyKeys,
        security: SecurityLevel,
        batch: BatchConfig,
    ) -> Result<Self, Error> {
        let comm = Comm::connected(network)?;
        let id = comm.get_id();
        let mut ctx = Self {
            id,
            comm,
            prf: Prf::new(keys),
            precompute: Precompute::new(batch),
            verifier: Verifier::new(),
            security,
            frac_bits: fixed_point::FRAC_BITS,
        };
        ctx.synchronize().await?;
        tracing::debug!("party {}: context ready ({})", id, security);
        Ok(ctx)
    }

    pub fn get_id(&self) -> PartyID {
        self.id
    }

    pub fn security(&self) -> SecurityLevel {
        self.security
    }

    pub fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    pub fn precompute(&self) -> &Precompute {
        &self.precompute
    }

    pub fn round(&self) -> u64 {
        self.comm.round()
    }

    /// Barrier across all three parties.
    pub async fn synchronize(&mut self) -> Result<(), Error> {
        self.comm.synchronize().await
    }

    /// Runs outstanding checks and closes the channels.
    pub async fn finish(mut self) -> Result<(), Error> {
        self.verify().await?;
        tracing::debug!("party {}: {}", self.id, self.precompute.stats());
        self.comm.close().await
    }

    pub fn print_connection_stats(&self, out: &mut impl std::io::Write) -> Result<(), Error> {
        self.comm.print_connection_stats(out)
    }

    /// Forces all deferred consistency checks. A no-op in semi-honest mode.
    pub async fn verify(&mut self) -> Result<(), Error> {
        match self.security {
            SecurityLevel::SemiHonest => Ok(()),
            SecurityLevel::Malicious if self.verifier.is_empty() => Ok(()),
            SecurityLevel::Malicious => self.verifier.jmp_verify(&mut self.comm).await,
        }
    }

    /// Secret-shares `len` values owned by `owner`. Only the owner passes `Some`.
    pub async fn input(
        &mut self,
        values: Option<&[RingElement<u64>]>,
        owner: PartyID,
        len: usize,
    ) -> Result<VecShare<u64>, Error> {
        self.comm.next_round();
        if owner == self.id {
            let values = values.ok_or_else(|| {
                Error::Other(format!("party {} owns the input but passed none", owner))
            })?;
            if values.len() != len {
                return Err(Error::InvalidSizeError);
            }
            // x = x_0 + x_1 + x_2 with two components from the private stream
            let mut comps: [Vec<RingElement<u64>>; 3] = Default::default();
            for v in values {
                let x0 = self.prf.gen_private::<u64>();
                let x1 = self.prf.gen_private::<u64>();
                comps[0].push(x0);
                comps[1].push(x1);
                comps[2].push(*v - x0 - x1);
            }
            let mine = usize::from(self.id);
            let next = usize::from(self.id.next_id());
            let prev = usize::from(self.id.prev_id());

            // every party j receives (x_j, x_{j-1})
            let mut to_next = comps[next].to_owned();
            to_next.extend_from_slice(&comps[mine]);
            let mut to_prev = comps[prev].to_owned();
            to_prev.extend_from_slice(&comps[next]);
            self.comm.send_vec_next(&to_next).await?;
            self.comm.send_vec_prev(&to_prev).await?;

            let a = std::mem::take(&mut comps[mine]);
            let b = std::mem::take(&mut comps[prev]);
            VecShare::new(a, b)
        } else {
            let mut received = if owner == self.id.prev_id() {
                self.comm.receive_vec_prev::<u64>(2 * len).await?
            } else {
                self.comm.receive_vec_next::<u64>(2 * len).await?
            };
            let b = received.split_off(len);
            VecShare::new(received, b)
        }
    }

    pub async fn input_fixed(
        &mut self,
        values: Option<&[f64]>,
        owner: PartyID,
        len: usize,
    ) -> Result<VecShare<u64>, Error> {
        let encoded = values.map(fixed_point::encode_slice);
        self.input(encoded.as_deref(), owner, len).await
    }

    /// Opens shares to all parties. In malicious mode the opened values are queued for
    /// the next [`Context::verify`].
    pub(crate) async fn open_many<T: IntRing2k>(
        &mut self,
        shares: &VecShare<T>,
    ) -> Result<Vec<RingElement<T>>, Error> {
        let shares_c = self.comm.send_and_receive_vec(&shares.b).await?;
        if self.security == SecurityLevel::Malicious {
            self.verifier.record(&shares.a, &shares_c);
        }
        let res = shares
            .a
            .iter()
            .zip(shares.b.iter())
            .zip(shares_c)
            .map(|((a, b), c)| c + a + b)
            .collect();
        Ok(res)
    }

    /// Opens the final output. All pending checks pass before plaintext is returned.
    pub async fn reconstruct(
        &mut self,
        shares: &VecShare<u64>,
    ) -> Result<Vec<RingElement<u64>>, Error> {
        let res = self.open_many(shares).await?;
        self.verify().await?;
        Ok(res)
    }

    pub async fn reconstruct_fixed(&mut self, shares: &VecShare<u64>) -> Result<Vec<f64>, Error> {
        let res = self.reconstruct(shares).await?;
        Ok(fixed_point::decode_slice(&res))
    }

    pub fn add(&self, x: &VecShare<u64>, y: &VecShare<u64>) -> Result<VecShare<u64>, Error> {
        x.add(y)
    }

    pub fn sub(&self, x: &VecShare<u64>, y: &VecShare<u64>) -> Result<VecShare<u64>, Error> {
        x.sub(y)
    }

    pub fn add_public(
        &self,
        x: &VecShare<u64>,
        values: &[RingElement<u64>],
    ) -> Result<VecShare<u64>, Error> {
        if x.len() != values.len() {
            return Err(Error::InvalidSizeError);
        }
        let mut res = x.to_owned();
        res.add_assign_const_many(values, self.id);
        Ok(res)
    }

    pub fn sub_public(
        &self,
        x: &VecShare<u64>,
        values: &[RingElement<u64>],
    ) -> Result<VecShare<u64>, Error> {
        let negated: Vec<_> = values.iter().map(|v| -*v).collect();
        self.add_public(x, &negated)
    }

    pub fn mul_public(&self, x: &VecShare<u64>, scalar: RingElement<u64>) -> VecShare<u64> {
        x.mul_public(scalar)
    }

    /// Shares of a public vector.
    pub fn public(&self, values: &[RingElement<u64>]) -> VecShare<u64> {
        VecShare::from_public(values, self.id)
    }

    /// `1 - x` for shared bits.
    pub(crate) fn one_minus(&self, x: &VecShare<u64>) -> VecShare<u64> {
        let mut res = x.neg();
        res.add_assign_const_many(&vec![RingElement::one(); x.len()], self.id);
        res
    }

    /// Element-wise product, one triple per element.
    pub async fn mul(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        if x.len() != y.len() {
            return Err(Error::InvalidSizeError);
        }
        if x.is_empty() {
            return Ok(VecShare::zero(0));
        }
        let triples = self.get_triples(x.len()).await?;
        self.mul_with_triples(x, y, triples).await
    }

    pub(crate) async fn mul_with_triples(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
        triples: Triples,
    ) -> Result<VecShare<u64>, Error> {
        let n = x.len();
        if y.len() != n || triples.len() != n {
            return Err(Error::InvalidSizeError);
        }
        let Triples { a, b, c } = triples;

        // d = x - a and e = y - b in a single round
        let mut masked = x.sub(&a)?;
        masked.extend(y.sub(&b)?);
        let mut opened = self.open_many(&masked).await?;
        let e = opened.split_off(n);
        let d = opened;

        let mut res = c;
        for i in 0..n {
            let z = b.get_at(i) * d[i] + a.get_at(i) * e[i];
            let z = z.add_const(d[i] * e[i], self.id);
            res.set_at(i, res.get_at(i) + z);
        }
        Ok(res)
    }

    /// Product of a shared `m x n` and a shared `n x p` matrix, one matrix triple.
    pub async fn matmul(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<VecShare<u64>, Error> {
        if x.len() != m * n || y.len() != n * p {
            return Err(Error::InvalidSizeError);
        }
        let triple = self.get_matrix_triple(m, n, p).await?;

        let mut masked = x.sub(&triple.a)?;
        masked.extend(y.sub(&triple.b)?);
        let mut opened = self.open_many(&masked).await?;
        let e = opened.split_off(m * n);
        let d = opened;

        // Z = C + D*B + A*E + D*E
        let mut res = triple.c;
        res.add_assign(&linalg::matmul_public_left(&d, &triple.b, m, n, p))?;
        res.add_assign(&linalg::matmul_public_right(&triple.a, &e, m, n, p))?;
        res.add_assign_const_many(&linalg::matmul(&d, &e, m, n, p), self.id);
        Ok(res)
    }

    /// Product of two fixed-point vectors, rescaled to the working precision.
    pub async fn mul_fixed(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let product = self.mul(x, y).await?;
        self.truncate(&product, self.frac_bits).await
    }

    pub async fn matmul_fixed(
        &mut self,
        x: &VecShare<u64>,
        y: &VecShare<u64>,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<VecShare<u64>, Error> {
        let product = self.matmul(x, y, m, n, p).await?;
        self.truncate(&product, self.frac_bits).await
    }

    /// Divides by `2^shift`. The result may be off by one in the last place, and is
    /// wrong with probability about `|x| / 2^64`.
    /// A shift of the ring width or more is rejected.
    pub async fn truncate(&mut self, x: &VecShare<u64>, shift: u32) -> Result<VecShare<u64>, Error> {
        if shift as usize >= <u64 as IntRing2k>::K {
            return Err(Error::ConfigError(format!(
                "cannot truncate by {} bits in a {}-bit ring",
                shift,
                <u64 as IntRing2k>::K
            )));
        }
        if x.is_empty() || shift == 0 {
            return Ok(x.to_owned());
        }
        let masks = self.get_truncation_masks(x.len(), shift).await?;
        let z = self.open_many(&x.add(&masks.r)?).await?;
        let z_shifted: Vec<_> = z.into_iter().map(|z_| z_ >> shift).collect();
        let mut res = masks.r_shifted.neg();
        res.add_assign_const_many(&z_shifted, self.id);
        Ok(res)
    }

    /// Random shared values nobody knows, without communication.
    pub(crate) fn random_shares<T: IntRing2k>(&mut self, len: usize) -> VecShare<T> {
        (0..len).map(|_| self.prf.gen_rand_share::<T>()).collect()
    }

    /// Uniform fixed-point values in `[-bound, bound)`, sampled by party 0 and shared.
    pub async fn random_fixed(&mut self, len: usize, bound: f64) -> Result<VecShare<u64>, Error> {
        let owner = PartyID::ID0;
        if self.id == owner {
            let values: Vec<f64> = (0..len)
                .map(|_| {
                    let u = self.prf.gen_private::<u64>().convert() >> 11;
                    (u as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) * bound
                })
                .collect();
            self.input_fixed(Some(&values), owner, len).await
        } else {
            self.input_fixed(None, owner, len).await
        }
    }

    /// Shares of zero for a vector of given length.
    pub fn zeros(&self, len: usize) -> VecShare<u64> {
        VecShare::zero(len)
    }

    #[cfg(test)]
    pub(crate) fn comm_mut(&mut self) -> &mut Comm<N> {
        &mut self.comm
    }
}
