use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// A tcp connection carrying length-prefixed frames.
pub type BytesChannel = Framed<TcpStream, LengthDelimitedCodec>;

/// Switches an established connection to raw frames. Bytes already read past the last
/// decoded message stay in the read buffer.
pub fn into_bytes_channel<C>(framed: Framed<TcpStream, C>) -> BytesChannel {
    framed.map_codec(|_| LengthDelimitedCodec::new())
}

/// Closes our write half, then waits for the peer to close theirs. A frame still in
/// flight at that point means the two parties disagree about the transcript.
pub async fn close(mut channel: BytesChannel) -> io::Result<()> {
    SinkExt::<Bytes>::close(&mut channel).await?;
    match channel.next().await {
        None => Ok(()),
        Some(frame) => {
            let frame: BytesMut = frame?;
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("peer sent {} bytes after the last round", frame.len()),
            ))
        }
    }
}
