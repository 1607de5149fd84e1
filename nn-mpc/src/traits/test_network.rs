use super::network_trait::{LinkStats, NetworkTrait};
use crate::rep3::id::PartyID;
use bytes::{Bytes, BytesMut};
use std::io::{Error as IOError, ErrorKind as IOErrorKind};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-process network for three parties, backed by unbounded tokio channels.
pub struct TestNetwork3p {
    timeout: Duration,
}

impl Default for TestNetwork3p {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork3p {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Every receive fails with [`IOErrorKind::TimedOut`] after this duration.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn get_party_networks(self) -> [PartyTestNetwork; 3] {
        // forward[i] carries i -> i+1, backward[i] carries i -> i-1
        let (fwd_tx, fwd_rx): (Vec<_>, Vec<_>) =
            (0..3).map(|_| mpsc::unbounded_channel::<Bytes>()).unzip();
        let (bwd_tx, bwd_rx): (Vec<_>, Vec<_>) =
            (0..3).map(|_| mpsc::unbounded_channel::<Bytes>()).unzip();
        let mut fwd_rx: Vec<Option<_>> = fwd_rx.into_iter().map(Some).collect();
        let mut bwd_rx: Vec<Option<_>> = bwd_rx.into_iter().map(Some).collect();

        let mut party = |id: PartyID| {
            let me = usize::from(id);
            let next = usize::from(id.next_id());
            let prev = usize::from(id.prev_id());
            PartyTestNetwork {
                id,
                next: Link {
                    tx: Some(fwd_tx[me].clone()),
                    rx: bwd_rx[next].take(),
                },
                prev: Link {
                    tx: Some(bwd_tx[me].clone()),
                    rx: fwd_rx[prev].take(),
                },
                timeout: self.timeout,
                stats: LinkStats::default(),
            }
        };

        [party(PartyID::ID0), party(PartyID::ID1), party(PartyID::ID2)]
    }
}

struct Link {
    tx: Option<UnboundedSender<Bytes>>,
    rx: Option<UnboundedReceiver<Bytes>>,
}

impl Link {
    fn push(&self, data: Bytes) -> Result<(), IOError> {
        self.tx
            .as_ref()
            .ok_or_else(|| IOError::new(IOErrorKind::BrokenPipe, "link already shut down"))?
            .send(data)
            .map_err(|_| IOError::new(IOErrorKind::BrokenPipe, "peer dropped its end"))
    }

    async fn pull(&mut self, timeout: Duration) -> Result<BytesMut, IOError> {
        let rx = self
            .rx
            .as_mut()
            .ok_or_else(|| IOError::new(IOErrorKind::ConnectionAborted, "link has no receiver"))?;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(data)) => Ok(BytesMut::from(data.as_ref())),
            Ok(None) => Err(IOError::new(
                IOErrorKind::ConnectionAborted,
                "peer closed the connection",
            )),
            Err(_) => Err(IOError::new(IOErrorKind::TimedOut, "no frame before the timeout")),
        }
    }
}

/// One party's end of a [`TestNetwork3p`].
pub struct PartyTestNetwork {
    id: PartyID,
    next: Link,
    prev: Link,
    timeout: Duration,
    stats: LinkStats,
}

impl PartyTestNetwork {
    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

impl NetworkTrait for PartyTestNetwork {
    fn get_id(&self) -> usize {
        self.id.into()
    }

    fn print_connection_stats(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        self.stats.write_to(out)
    }

    async fn shutdown(mut self) -> Result<(), IOError> {
        self.next.tx.take();
        self.prev.tx.take();
        Ok(())
    }

    async fn send_next_id(&mut self, data: Bytes) -> Result<(), IOError> {
        tracing::trace!("send {}->{}: {} bytes", self.id, self.id.next_id(), data.len());
        self.stats.sent_next += data.len();
        self.next.push(data)
    }

    async fn send_prev_id(&mut self, data: Bytes) -> Result<(), IOError> {
        tracing::trace!("send {}->{}: {} bytes", self.id, self.id.prev_id(), data.len());
        self.stats.sent_prev += data.len();
        self.prev.push(data)
    }

    async fn receive_prev_id(&mut self) -> Result<BytesMut, IOError> {
        let buf = self.prev.pull(self.timeout).await?;
        tracing::trace!("recv {}<-{}: {} bytes", self.id, self.id.prev_id(), buf.len());
        self.stats.recv_prev += buf.len();
        Ok(buf)
    }

    async fn receive_next_id(&mut self) -> Result<BytesMut, IOError> {
        let buf = self.next.pull(self.timeout).await?;
        tracing::trace!("recv {}<-{}: {} bytes", self.id, self.id.next_id(), buf.len());
        self.stats.recv_next += buf.len();
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ring_links_and_broadcast() {
        let [mut p0, mut p1, mut p2] = TestNetwork3p::new().get_party_networks();
        p0.send_next_id(Bytes::from_static(b"to1")).await.unwrap();
        p0.send_prev_id(Bytes::from_static(b"to2")).await.unwrap();
        assert_eq!(p1.receive_prev_id().await.unwrap().as_ref(), b"to1");
        assert_eq!(p2.receive_next_id().await.unwrap().as_ref(), b"to2");

        let (r0, r1, r2) = tokio::join!(
            p0.broadcast(Bytes::from_static(&[0])),
            p1.broadcast(Bytes::from_static(&[1])),
            p2.broadcast(Bytes::from_static(&[2])),
        );
        for r in [r0, r1, r2] {
            let r = r.unwrap();
            assert_eq!(r.iter().map(|b| b[0]).collect::<Vec<_>>(), vec![0, 1, 2]);
        }
        assert_eq!(p0.stats().total_sent(), 8);
        assert_eq!(p1.stats().recv_prev, 4);
    }

    #[tokio::test]
    async fn shut_down_peer_reads_as_closed() {
        let [p0, mut p1, _p2] = TestNetwork3p::new().get_party_networks();
        p0.shutdown().await.unwrap();
        let err = p1.receive_prev_id().await.unwrap_err();
        assert_eq!(err.kind(), IOErrorKind::ConnectionAborted);
    }
}
