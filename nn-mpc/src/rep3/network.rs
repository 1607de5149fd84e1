use super::id::PartyID;
use crate::error::Error;
use crate::traits::network_trait::{LinkStats, NetworkTrait};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use mpc_net::channel::{self, BytesChannel};
use mpc_net::config::NetworkConfig;
use mpc_net::MpcNetworkHandler;
use std::io;
use std::time::Duration;

/// Tcp backed network of one party.
pub struct Rep3Network {
    handler: MpcNetworkHandler,
    id: PartyID,
    next: BytesChannel,
    prev: BytesChannel,
    timeout: Duration,
    stats: LinkStats,
}

impl Rep3Network {
    pub async fn new(config: NetworkConfig) -> Result<Self, Error> {
        let id = PartyID::try_from(config.my_id)?;
        if config.parties.len() != 3 {
            return Err(Error::NumPartyError(config.parties.len()));
        }
        let timeout = config.timeout();

        let mut handler = MpcNetworkHandler::establish(config)
            .await
            .map_err(|e| Error::ConnectionError(format!("{:#}", e)))?;
        let mut channels = handler
            .get_byte_channels()
            .map_err(|e| Error::ConnectionError(format!("{:#}", e)))?;
        let mut take = |peer: PartyID| {
            channels
                .remove(&usize::from(peer))
                .ok_or_else(|| Error::ConnectionError(format!("no channel to party {}", peer)))
        };
        let next = take(id.next_id())?;
        let prev = take(id.prev_id())?;
        tracing::debug!("party {}: ring links established", id);

        Ok(Self {
            handler,
            id,
            next,
            prev,
            timeout,
            stats: LinkStats::default(),
        })
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    async fn read(channel: &mut BytesChannel, timeout: Duration) -> io::Result<BytesMut> {
        tokio::time::timeout(timeout, channel.next())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no frame before the timeout"))?
            .unwrap_or_else(|| {
                Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "peer closed the connection",
                ))
            })
    }
}

impl NetworkTrait for Rep3Network {
    fn get_id(&self) -> usize {
        self.id.into()
    }

    fn print_connection_stats(&self, out: &mut impl std::io::Write) -> io::Result<()> {
        self.handler.print_connection_stats(out)?;
        self.stats.write_to(out)
    }

    async fn send_next_id(&mut self, data: Bytes) -> io::Result<()> {
        tracing::trace!("send {}->{}: {} bytes", self.id, self.id.next_id(), data.len());
        self.stats.sent_next += data.len();
        self.next.send(data).await
    }

    async fn send_prev_id(&mut self, data: Bytes) -> io::Result<()> {
        tracing::trace!("send {}->{}: {} bytes", self.id, self.id.prev_id(), data.len());
        self.stats.sent_prev += data.len();
        self.prev.send(data).await
    }

    async fn receive_prev_id(&mut self) -> io::Result<BytesMut> {
        let buf = Self::read(&mut self.prev, self.timeout).await?;
        tracing::trace!("recv {}<-{}: {} bytes", self.id, self.id.prev_id(), buf.len());
        self.stats.recv_prev += buf.len();
        Ok(buf)
    }

    async fn receive_next_id(&mut self) -> io::Result<BytesMut> {
        let buf = Self::read(&mut self.next, self.timeout).await?;
        tracing::trace!("recv {}<-{}: {} bytes", self.id, self.id.next_id(), buf.len());
        self.stats.recv_next += buf.len();
        Ok(buf)
    }

    async fn shutdown(self) -> io::Result<()> {
        let (next, prev) = futures::join!(channel::close(self.next), channel::close(self.prev));
        next.and(prev)
    }
}
