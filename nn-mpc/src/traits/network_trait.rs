use bytes::{Bytes, BytesMut};
use std::io::Error;

/// Point-to-point channels to the two other parties of a three-party ring.
///
/// Every `send` only buffers; `receive` waits until one full frame from the given peer
/// arrived.
#[allow(async_fn_in_trait)]
pub trait NetworkTrait {
    fn get_id(&self) -> usize;

    fn get_num_parties(&self) -> usize {
        3
    }

    fn print_connection_stats(&self, out: &mut impl std::io::Write) -> Result<(), Error>;

    async fn shutdown(self) -> Result<(), Error>;

    async fn send_next_id(&mut self, data: Bytes) -> Result<(), Error>;
    async fn send_prev_id(&mut self, data: Bytes) -> Result<(), Error>;

    async fn receive_prev_id(&mut self) -> Result<BytesMut, Error>;
    async fn receive_next_id(&mut self) -> Result<BytesMut, Error>;

    /// Sends `data` to both neighbours and returns every party's message, indexed by id.
    async fn broadcast(&mut self, data: Bytes) -> Result<Vec<BytesMut>, Error> {
        let me = self.get_id();
        self.send_next_id(data.clone()).await?;
        self.send_prev_id(data.clone()).await?;
        let mut result = vec![BytesMut::new(); 3];
        result[(me + 1) % 3] = self.receive_next_id().await?;
        result[(me + 2) % 3] = self.receive_prev_id().await?;
        result[me] = BytesMut::from(data.as_ref());
        Ok(result)
    }
}

/// Bytes moved over the two links of one party.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent_next: usize,
    pub sent_prev: usize,
    pub recv_next: usize,
    pub recv_prev: usize,
}

impl LinkStats {
    pub fn total_sent(&self) -> usize {
        self.sent_next + self.sent_prev
    }

    pub fn write_to(&self, out: &mut impl std::io::Write) -> Result<(), Error> {
        for (name, sent, recv) in [
            ("prev", self.sent_prev, self.recv_prev),
            ("next", self.sent_next, self.recv_next),
        ] {
            writeln!(out, "link to {}: sent {} bytes, received {} bytes", name, sent, recv)?;
        }
        Ok(())
    }
}
