use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::{io, marker::PhantomData};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Length-delimited frames carrying a single bincode encoded message each.
#[derive(Default, Debug)]
pub struct BincodeCodec<M> {
    inner: LengthDelimitedCodec,
    phantom: PhantomData<M>,
}

impl<M> Clone for BincodeCodec<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            phantom: PhantomData,
        }
    }
}

impl<M: Serialize + DeserializeOwned> BincodeCodec<M> {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::new(),
            phantom: PhantomData,
        }
    }
}

impl<M: Serialize + DeserializeOwned> Encoder<M> for BincodeCodec<M> {
    type Error = io::Error;

    fn encode(&mut self, item: M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buf = BytesMut::with_capacity(std::mem::size_of::<M>() + 16).writer();
        bincode::serialize_into(&mut buf, &item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize message with bincode: {}", e),
            )
        })?;
        self.inner.encode(buf.into_inner().freeze(), dst)
    }
}

impl<M: Serialize + DeserializeOwned> Decoder for BincodeCodec<M> {
    type Item = M;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.inner.decode(src)? else {
            return Ok(None);
        };
        bincode::deserialize_from::<_, M>(frame.reader())
            .map(Some)
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Failed to deserialize message with bincode: {}", e),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Msg {
        id: usize,
        payload: Vec<u64>,
    }

    #[test]
    fn partial_frames_are_buffered() {
        let mut codec = BincodeCodec::<Msg>::new();
        let mut buf = BytesMut::new();
        let msg = Msg {
            id: 2,
            payload: vec![1, 2, 3],
        };
        codec
            .encode(
                Msg {
                    id: 2,
                    payload: vec![1, 2, 3],
                },
                &mut buf,
            )
            .unwrap();

        let mut partial = buf.split_to(buf.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.unsplit(buf);
        assert_eq!(codec.decode(&mut partial).unwrap(), Some(msg));
        assert!(partial.is_empty());
    }
}
