use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use gatekeep_core::Error;
use gatekeep_protocol::{
    CodecError, Command, Expect, Inbound, LinkCodec, Response, WireCode,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_util::codec::{Encoder, Framed};
use tracing::{debug, trace, warn};

use crate::error::{LinkError, LinkResult};

/// One end of the point-to-point link, decoding codes of type `C`.
///
/// # Cancel Safety
///
/// Receives are cancel safe: bytes read before a timeout stay buffered and
/// are delivered by the next receive, except in [`Link::recv_payload`] which
/// discards a partial payload on failure.
pub struct Link<T, C> {
    framed: Framed<T, LinkCodec<C>>,
}

/// Control node end: receives commands, sends responses.
pub type ControlLink<T> = Link<T, Command>;

/// HMI node end: receives responses, sends requests.
pub type HmiLink<T> = Link<T, Response>;

impl<T, C> Link<T, C>
where
    T: AsyncRead + AsyncWrite + Unpin,
    C: WireCode,
{
    pub fn new(io: T) -> Self {
        Self {
            framed: Framed::new(io, LinkCodec::new()),
        }
    }

    /// Send one item and flush it to the peer.
    pub async fn send<I>(&mut self, item: I) -> LinkResult<()>
    where
        I: std::fmt::Debug,
        LinkCodec<C>: Encoder<I, Error = CodecError>,
    {
        trace!(item = ?item, "Sending on link");
        self.framed.send(item).await?;
        Ok(())
    }

    /// Receive the next code byte.
    ///
    /// Bytes outside the code table come back as [`Inbound::Unrecognized`]
    /// so the caller decides how to treat them.
    pub async fn recv_code(&mut self, timeout: Option<Duration>) -> LinkResult<Inbound<C>> {
        self.framed.codec_mut().expect(Expect::Code);
        let item = self.next_item(timeout, C::KIND).await?;
        if let Inbound::Code(code) = &item {
            trace!(kind = C::KIND, code = ?code, "Received code");
        }
        Ok(item)
    }

    /// Receive exactly `len` payload bytes.
    ///
    /// On timeout or closure, whatever part of the payload already arrived is
    /// discarded so the next receive starts at a code boundary.
    pub async fn recv_payload(
        &mut self,
        len: usize,
        timeout: Option<Duration>,
        waiting_for: &str,
    ) -> LinkResult<Bytes> {
        self.framed.codec_mut().expect(Expect::Payload(len));
        match self.next_item(timeout, waiting_for).await {
            Ok(Inbound::Payload(bytes)) => {
                trace!(len = bytes.len(), "Received payload");
                Ok(bytes)
            }
            Ok(other) => Err(LinkError::Protocol(Error::InvalidPayloadLength {
                command: format!("{other:?}"),
                expected: len,
                actual: 0,
            })),
            Err(e) => {
                let dropped = self.discard_pending();
                if dropped > 0 {
                    debug!(dropped, "Discarded partial payload");
                }
                Err(e)
            }
        }
    }

    /// Drop buffered, undecoded bytes and go back to expecting a code.
    ///
    /// Returns the number of bytes dropped.
    pub fn discard_pending(&mut self) -> usize {
        self.framed.codec_mut().expect(Expect::Code);
        let buffer = self.framed.read_buffer_mut();
        let dropped = buffer.len();
        buffer.clear();
        dropped
    }

    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }

    async fn next_item(
        &mut self,
        timeout: Option<Duration>,
        waiting_for: &str,
    ) -> LinkResult<Inbound<C>> {
        let next = self.framed.next();
        let item = match timeout {
            Some(limit) => match tokio::time::timeout(limit, next).await {
                Ok(item) => item,
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        waiting_for, "Link receive timed out"
                    );
                    return Err(LinkError::timed_out(limit, waiting_for));
                }
            },
            None => next.await,
        };

        match item {
            Some(Ok(inbound)) => Ok(inbound),
            Some(Err(e)) => Err(e.into()),
            None => {
                debug!(waiting_for, "Link closed by peer");
                Err(LinkError::Closed)
            }
        }
    }
}

impl<T> Link<T, Response>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Receive the next response.
    ///
    /// # Errors
    /// A byte outside the response table is a protocol error on this side of
    /// the link: `LinkError::Protocol(Error::UnrecognizedResponse)`.
    pub async fn recv_response(
        &mut self,
        timeout: Option<Duration>,
        waiting_for: &str,
    ) -> LinkResult<Response> {
        self.framed.codec_mut().expect(Expect::Code);
        match self.next_item(timeout, waiting_for).await? {
            Inbound::Code(response) => {
                trace!(response = %response, "Received response");
                Ok(response)
            }
            Inbound::Unrecognized(byte) => {
                warn!(byte = format_args!("0x{byte:02X}"), "Unrecognized response byte");
                Err(LinkError::Protocol(Error::UnrecognizedResponse(byte)))
            }
            Inbound::Payload(bytes) => Err(LinkError::Protocol(Error::InvalidPayloadLength {
                command: "response".to_string(),
                expected: 0,
                actual: bytes.len(),
            })),
        }
    }

    /// Receive a response and require it to be `expected`.
    pub async fn expect_response(
        &mut self,
        expected: Response,
        timeout: Option<Duration>,
    ) -> LinkResult<()> {
        let actual = self.recv_response(timeout, &expected.to_string()).await?;
        expected.expect(actual)?;
        Ok(())
    }
}

/// Create a connected pair of in-memory links: `(hmi, control)`.
///
/// # Example
///
/// ```
/// use gatekeep_link::duplex_pair;
/// use gatekeep_protocol::{Command, Inbound, Request};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut hmi, mut control) = duplex_pair(64);
/// hmi.send(Request::AlarmOn).await.unwrap();
/// let item = control.recv_code(None).await.unwrap();
/// assert_eq!(item, Inbound::Code(Command::AlarmOn));
/// # }
/// ```
pub fn duplex_pair(
    max_buf_size: usize,
) -> (HmiLink<DuplexStream>, ControlLink<DuplexStream>) {
    let (hmi, control) = tokio::io::duplex(max_buf_size);
    (Link::new(hmi), Link::new(control))
}
