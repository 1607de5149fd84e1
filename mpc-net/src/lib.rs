pub mod channel;
pub mod codecs;
pub mod config;

use channel::BytesChannel;
use codecs::BincodeCodec;
use color_eyre::eyre::{bail, eyre, Context, Result};
use config::NetworkConfig;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    time::{sleep, timeout, Instant},
};
use tokio_util::codec::Framed;

const CONNECT_RETRY: Duration = Duration::from_millis(100);

/// First frame on every connection, sent by both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub party_id: usize,
}

/// Owns the tcp connections to all other parties.
///
/// Parties with a higher id connect to parties with a lower id, so every pair of
/// parties ends up with exactly one connection.
#[derive(Debug)]
pub struct MpcNetworkHandler {
    my_id: usize,
    channels: HashMap<usize, BytesChannel>,
    peers: HashMap<usize, SocketAddr>,
}

impl MpcNetworkHandler {
    pub async fn establish(config: NetworkConfig) -> Result<Self> {
        config.check_config()?;
        let my_id = config.my_id;
        let me = config
            .get_party(my_id)
            .ok_or_else(|| eyre!("party {} missing in config", my_id))?;
        let deadline = Instant::now() + config.timeout();

        let listener = TcpListener::bind(me.socket_addr)
            .await
            .with_context(|| format!("while binding to {}", me.socket_addr))?;
        tracing::debug!("party {} listening on {}", my_id, me.socket_addr);

        let mut channels = HashMap::with_capacity(config.parties.len() - 1);
        let mut peers = HashMap::with_capacity(config.parties.len() - 1);

        for party in config.parties.iter().filter(|p| p.id < my_id) {
            let stream = Self::connect_with_retry(party.socket_addr, deadline).await?;
            let (channel, _) = Self::handshake(stream, my_id, Some(party.id)).await?;
            tracing::debug!("party {} connected to party {}", my_id, party.id);
            channels.insert(party.id, channel);
            peers.insert(party.id, party.socket_addr);
        }

        let expected = config.parties.iter().filter(|p| p.id > my_id).count();
        while channels.len() < config.parties.len() - 1 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (stream, addr) = timeout(remaining, listener.accept())
                .await
                .map_err(|_| eyre!("timed out waiting for {} peers to connect", expected))?
                .context("while accepting connection")?;
            let (channel, their_id) = Self::handshake(stream, my_id, None).await?;
            if their_id <= my_id || config.get_party(their_id).is_none() {
                bail!("unexpected party {} connected from {}", their_id, addr);
            }
            if channels.insert(their_id, channel).is_some() {
                bail!("party {} connected twice", their_id);
            }
            tracing::debug!("party {} accepted party {} from {}", my_id, their_id, addr);
            peers.insert(their_id, addr);
        }

        Ok(Self {
            my_id,
            channels,
            peers,
        })
    }

    async fn connect_with_retry(addr: SocketAddr, deadline: Instant) -> Result<TcpStream> {
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) if Instant::now() + CONNECT_RETRY < deadline => {
                    tracing::trace!("connect to {} failed: {}, retrying", addr, e);
                    sleep(CONNECT_RETRY).await;
                }
                Err(e) => return Err(e).with_context(|| format!("while connecting to {}", addr)),
            }
        }
    }

    async fn handshake(
        stream: TcpStream,
        my_id: usize,
        expected: Option<usize>,
    ) -> Result<(BytesChannel, usize)> {
        stream.set_nodelay(true)?;
        let mut framed = Framed::new(stream, BincodeCodec::<Handshake>::new());
        framed.send(Handshake { party_id: my_id }).await?;
        let theirs = framed
            .next()
            .await
            .ok_or_else(|| eyre!("connection closed during handshake"))??;

        if let Some(expected) = expected {
            if theirs.party_id != expected {
                bail!(
                    "handshake failed: expected party {}, got {}",
                    expected,
                    theirs.party_id
                );
            }
        }

        Ok((channel::into_bytes_channel(framed), theirs.party_id))
    }

    pub fn get_id(&self) -> usize {
        self.my_id
    }

    /// Hands out the channels to all connected parties. Can only be called once.
    pub fn get_byte_channels(&mut self) -> Result<HashMap<usize, BytesChannel>> {
        if self.channels.is_empty() {
            bail!("byte channels already taken");
        }
        Ok(std::mem::take(&mut self.channels))
    }

    pub fn print_connection_stats(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        let mut ids: Vec<_> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            writeln!(out, "Connection to party {} at {}", id, self.peers[&id])?;
        }
        Ok(())
    }
}
