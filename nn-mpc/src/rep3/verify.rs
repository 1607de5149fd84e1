//! Malicious-mode checks: opened-value transcripts, hash-based zero checks and triple
//! sacrifice.

use super::{
    comm::Comm,
    id::PartyID,
    linalg,
    precompute::{MatrixTriple, Triples},
    protocol::Context,
    vecshare::VecShare,
};
use crate::{
    error::Error,
    traits::network_trait::NetworkTrait,
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use bytes::{Bytes, BytesMut};
use sha2::{digest::Output, Digest, Sha512};

/// Transcript of opened values that have not been cross-checked yet.
pub(crate) struct Verifier {
    send_queue_prev: BytesMut,
    rcv_queue_next: BytesMut,
}

impl Verifier {
    pub(crate) fn new() -> Self {
        Self {
            send_queue_prev: BytesMut::new(),
            rcv_queue_next: BytesMut::new(),
        }
    }

    /// `own` is our first share component of the opened values, `received` is what
    /// prev sent us. Prev received our `own` from its prev; next holds `received` as
    /// its first component.
    pub(crate) fn record<T: IntRing2k>(
        &mut self,
        own: &[RingElement<T>],
        received: &[RingElement<T>],
    ) {
        for v in own {
            v.add_to_bytes(&mut self.send_queue_prev);
        }
        for v in received {
            v.add_to_bytes(&mut self.rcv_queue_next);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.send_queue_prev.is_empty() && self.rcv_queue_next.is_empty()
    }

    fn clear_and_hash(data: &mut BytesMut) -> Output<Sha512> {
        let bytes = std::mem::take(data).freeze();
        let mut hasher = Sha512::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Compares the transcript hashes with both neighbors. All three parties learn
    /// whether any of them saw a mismatch, so either all continue or all abort.
    pub(crate) async fn jmp_verify<N: NetworkTrait>(
        &mut self,
        comm: &mut Comm<N>,
    ) -> Result<(), Error> {
        let send_prev = Self::clear_and_hash(&mut self.send_queue_prev);
        let hash_next = Self::clear_and_hash(&mut self.rcv_queue_next);

        comm.next_round();
        comm.send_bytes_prev(Bytes::from(send_prev.to_vec())).await?;
        let rcv_next = comm.receive_bytes_next().await?;
        let ok = rcv_next.as_ref() == hash_next.as_slice();
        if !ok {
            tracing::error!(
                "party {}: opened values disagree with party {}",
                comm.get_id(),
                comm.get_id().next_id()
            );
        }

        let flags = comm.broadcast(Bytes::from(vec![ok as u8])).await?;
        if flags.iter().all(|f| f.as_ref() == [1u8]) {
            Ok(())
        } else {
            Err(Error::ConsistencyCheckFailure(
                "opened values differ between parties",
            ))
        }
    }
}

/// Checks that a shared vector is zero without opening it: every party hashes the
/// three components in a fixed global order and all three digests must agree.
pub(crate) async fn hash_zero_check<N: NetworkTrait, T: IntRing2k>(
    comm: &mut Comm<N>,
    w: &VecShare<T>,
) -> Result<(), Error> {
    let mut hasher = Sha512::new();
    for (wa, wb) in w.a.iter().zip(w.b.iter()) {
        let w_neg = -*wa - wb;
        match comm.get_id() {
            PartyID::ID0 => {
                wa.add_to_hash(&mut hasher);
                w_neg.add_to_hash(&mut hasher);
                wb.add_to_hash(&mut hasher);
            }
            PartyID::ID1 => {
                wb.add_to_hash(&mut hasher);
                wa.add_to_hash(&mut hasher);
                w_neg.add_to_hash(&mut hasher);
            }
            PartyID::ID2 => {
                w_neg.add_to_hash(&mut hasher);
                wb.add_to_hash(&mut hasher);
                wa.add_to_hash(&mut hasher);
            }
        }
    }
    let digest = hasher.finalize();

    let hashes = comm.broadcast(Bytes::from(digest.to_vec())).await?;
    debug_assert_eq!(hashes.len(), 3);

    if hashes[0] != hashes[1] || hashes[0] != hashes[2] {
        tracing::error!("party {}: zero check failed", comm.get_id());
        Err(Error::ConsistencyCheckFailure("sacrificed triples do not match"))
    } else {
        Ok(())
    }
}

impl<N: NetworkTrait> Context<N> {
    /// A public random challenge all parties agree on.
    async fn coin(&mut self) -> Result<RingElement<u128>, Error> {
        let r = self.random_shares::<u128>(1);
        let opened = self.open_many(&r).await?;
        self.verifier.jmp_verify(&mut self.comm).await?;
        opened
            .first()
            .copied()
            .ok_or_else(|| Error::Other("empty coin".to_owned()))
    }

    /// Element-wise triples over Z_2^128, checked against a second set sharing `b` and
    /// reduced to Z_2^64.
    pub(super) async fn sacrificed_triples(&mut self, n: usize) -> Result<Triples, Error> {
        let a = self.random_shares::<u128>(n);
        let a_hat = self.random_shares::<u128>(n);
        let b = self.random_shares::<u128>(n);

        let mut lhs = a.to_owned();
        lhs.extend(a_hat.to_owned());
        let mut rhs = b.to_owned();
        rhs.extend(b.to_owned());
        let mut c = self.reshare_products(&lhs, &rhs).await?;
        let c_hat = c.split_off_back(n);

        let r = self.coin().await?;

        // rho = r * a - a_hat
        let rho_share = a.mul_public(r).sub(&a_hat)?;
        let rho = self.open_many(&rho_share).await?;
        self.verifier.jmp_verify(&mut self.comm).await?;

        // b * rho - r * c + c_hat = 0
        let mut w = VecShare::with_capacity(n);
        for i in 0..n {
            w.push(b.get_at(i) * rho[i] - c.get_at(i) * r + c_hat.get_at(i));
        }
        hash_zero_check(&mut self.comm, &w).await?;

        Ok(Triples {
            a: VecShare::downgrade(a),
            b: VecShare::downgrade(b),
            c: VecShare::downgrade(c),
        })
    }

    /// Matrix triple over Z_2^128 checked by the same sacrifice, reduced to Z_2^64.
    pub(super) async fn sacrificed_matrix_triple(
        &mut self,
        m: usize,
        n: usize,
        p: usize,
    ) -> Result<MatrixTriple, Error> {
        let a = self.random_shares::<u128>(m * n);
        let a_hat = self.random_shares::<u128>(m * n);
        let b = self.random_shares::<u128>(n * p);

        // [A; A_hat] * B in one product
        let mut stacked = a.to_owned();
        stacked.extend(a_hat.to_owned());
        let mut c = self.reshare_matmul(&stacked, &b, 2 * m, n, p).await?;
        let c_hat = c.split_off_back(m * p);

        let r = self.coin().await?;

        let rho_share = a.mul_public(r).sub(&a_hat)?;
        let rho = self.open_many(&rho_share).await?;
        self.verifier.jmp_verify(&mut self.comm).await?;

        // rho * B - r * C + C_hat = 0
        let mut w = linalg::matmul_public_left(&rho, &b, m, n, p);
        w = w.sub(&c.mul_public(r))?;
        w.add_assign(&c_hat)?;
        hash_zero_check(&mut self.comm, &w).await?;

        Ok(MatrixTriple {
            shape: (m, n, p),
            a: VecShare::downgrade(a),
            b: VecShare::downgrade(b),
            c: VecShare::downgrade(c),
        })
    }
}
