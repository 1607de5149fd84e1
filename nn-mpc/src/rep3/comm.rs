use super::{id::PartyID, utils};
use crate::{
    error::Error,
    traits::network_trait::NetworkTrait,
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use bytes::{Buf, Bytes, BytesMut};

/// Lifecycle of the channels of one party.
///
/// `Uninitialized -> Connected -> Synchronized -> Active -> Closed`. `synchronize`
/// may be called again from `Active`; `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connected,
    Synchronized,
    Active,
    Closed,
}

/// Round-scoped typed messaging on top of a [`NetworkTrait`].
pub struct Comm<N: NetworkTrait> {
    id: PartyID,
    network: Option<N>,
    state: ConnectionState,
    round: u64,
}

impl<N: NetworkTrait> Comm<N> {
    pub fn new(id: PartyID) -> Self {
        Self {
            id,
            network: None,
            state: ConnectionState::Uninitialized,
            round: 0,
        }
    }

    /// Takes over a network whose handshakes with both peers succeeded.
    pub fn connect(&mut self, network: N) -> Result<(), Error> {
        if self.state != ConnectionState::Uninitialized {
            return Err(Error::ConnectionError(format!(
                "cannot connect in state {:?}",
                self.state
            )));
        }
        if network.get_num_parties() != 3 {
            return Err(Error::NumPartyError(network.get_num_parties()));
        }
        if network.get_id() != usize::from(self.id) {
            return Err(Error::IdError(network.get_id()));
        }
        self.network = Some(network);
        self.transition(ConnectionState::Connected);
        Ok(())
    }

    pub fn connected(network: N) -> Result<Self, Error> {
        let id = PartyID::try_from(network.get_id())?;
        let mut comm = Self::new(id);
        comm.connect(network)?;
        Ok(comm)
    }

    pub fn get_id(&self) -> PartyID {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    fn transition(&mut self, to: ConnectionState) {
        if self.state != to {
            tracing::debug!("party {}: {:?} -> {:?}", self.id, self.state, to);
            self.state = to;
        }
    }

    /// Grants access to the channels for one round.
    fn active(&mut self) -> Result<&mut N, Error> {
        match self.state {
            ConnectionState::Synchronized | ConnectionState::Active => {}
            state => {
                return Err(Error::ConnectionError(format!(
                    "channels used in state {:?}",
                    state
                )))
            }
        }
        self.transition(ConnectionState::Active);
        self.network
            .as_mut()
            .ok_or_else(|| Error::ConnectionError("no network".to_owned()))
    }

    /// Barrier across all three parties. All parties must arrive with the same round
    /// counter.
    pub async fn synchronize(&mut self) -> Result<(), Error> {
        match self.state {
            ConnectionState::Connected
            | ConnectionState::Synchronized
            | ConnectionState::Active => {}
            state => {
                return Err(Error::ConnectionError(format!(
                    "cannot synchronize in state {:?}",
                    state
                )))
            }
        }
        let round = self.round;
        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::ConnectionError("no network".to_owned()))?;
        let responses = network
            .broadcast(Bytes::copy_from_slice(&round.to_be_bytes()))
            .await?;
        for (i, mut response) in responses.into_iter().enumerate() {
            if response.remaining() != 8 {
                return Err(Error::ProtocolDesync(format!(
                    "malformed barrier message from party {}",
                    i
                )));
            }
            let theirs = response.get_u64();
            if theirs != round {
                return Err(Error::ProtocolDesync(format!(
                    "party {} is in round {}, we are in round {}",
                    i, theirs, round
                )));
            }
        }
        tracing::debug!("party {}: synchronized at round {}", self.id, round);
        self.transition(ConnectionState::Synchronized);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), Error> {
        self.transition(ConnectionState::Closed);
        match self.network.take() {
            Some(network) => Ok(network.shutdown().await?),
            None => Ok(()),
        }
    }

    pub fn print_connection_stats(&self, out: &mut impl std::io::Write) -> Result<(), Error> {
        if let Some(network) = self.network.as_ref() {
            network.print_connection_stats(out)?;
        }
        writeln!(out, "Rounds: {}", self.round)?;
        Ok(())
    }

    pub(crate) async fn send_bytes_next(&mut self, data: Bytes) -> Result<(), Error> {
        Ok(self.active()?.send_next_id(data).await?)
    }

    pub(crate) async fn send_bytes_prev(&mut self, data: Bytes) -> Result<(), Error> {
        Ok(self.active()?.send_prev_id(data).await?)
    }

    pub(crate) async fn receive_bytes_next(&mut self) -> Result<BytesMut, Error> {
        Ok(self.active()?.receive_next_id().await?)
    }

    pub(crate) async fn receive_bytes_prev(&mut self) -> Result<BytesMut, Error> {
        Ok(self.active()?.receive_prev_id().await?)
    }

    pub(crate) async fn send_vec_next<T: IntRing2k>(
        &mut self,
        values: &[RingElement<T>],
    ) -> Result<(), Error> {
        self.send_bytes_next(utils::ring_slice_to_bytes(values))
            .await
    }

    pub(crate) async fn send_vec_prev<T: IntRing2k>(
        &mut self,
        values: &[RingElement<T>],
    ) -> Result<(), Error> {
        self.send_bytes_prev(utils::ring_slice_to_bytes(values))
            .await
    }

    pub(crate) async fn receive_vec_next<T: IntRing2k>(
        &mut self,
        len: usize,
    ) -> Result<Vec<RingElement<T>>, Error> {
        let response = self.receive_bytes_next().await?;
        utils::ring_vec_from_bytes(response, len)
    }

    pub(crate) async fn receive_vec_prev<T: IntRing2k>(
        &mut self,
        len: usize,
    ) -> Result<Vec<RingElement<T>>, Error> {
        let response = self.receive_bytes_prev().await?;
        utils::ring_vec_from_bytes(response, len)
    }

    /// One round: send to next, then receive the same number of elements from prev.
    pub(crate) async fn send_and_receive_vec<T: IntRing2k>(
        &mut self,
        values: &[RingElement<T>],
    ) -> Result<Vec<RingElement<T>>, Error> {
        self.round += 1;
        self.send_vec_next(values).await?;
        self.receive_vec_prev(values.len()).await
    }

    /// One round: our message ends up at index `id` of the result.
    pub(crate) async fn broadcast(&mut self, data: Bytes) -> Result<Vec<BytesMut>, Error> {
        self.round += 1;
        Ok(self.active()?.broadcast(data).await?)
    }

    pub(crate) fn next_round(&mut self) {
        self.round += 1;
    }

    /// Direct access for tests that need to violate the protocol.
    #[cfg(test)]
    pub(crate) fn network_mut(&mut self) -> Option<&mut N> {
        self.network.as_mut()
    }
}
