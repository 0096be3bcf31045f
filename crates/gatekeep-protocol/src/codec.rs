//! Tokio codec for the gatekeep link.
//!
//! The link has no framing of its own: a code byte is followed by a payload
//! whose length only the receiver's protocol state knows. `LinkCodec` is
//! therefore told what to expect next. By default it yields one code at a
//! time; the owner switches it to [`Expect::Payload`] after a code that
//! announces a payload, and the codec falls back to [`Expect::Code`] as soon
//! as that payload has been delivered.
//!
//! ```text
//! bytes:   F1 01 02 03 04 05 F2
//! expect:  Code  Payload(5)  Code
//! items:   Code(Verify) Payload([1,2,3,4,5]) Code(AlarmOn)
//! ```
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use gatekeep_core::Credential;
//! use gatekeep_protocol::{Inbound, LinkCodec, Request, Response};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:7400").await?;
//! let mut framed = Framed::new(stream, LinkCodec::<Response>::new());
//!
//! framed.send(Request::Verify(Credential::new([1, 2, 3, 4, 5]))).await?;
//! if let Some(Ok(Inbound::Code(response))) = framed.next().await {
//!     println!("Control replied {response}");
//! }
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, Bytes, BytesMut};
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    code::{Command, Response, WireCode},
    error::CodecError,
    request::Request,
};

/// What the decoder produces next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// One code byte.
    #[default]
    Code,
    /// A payload of exactly this many bytes.
    Payload(usize),
}

/// A decoded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<C> {
    /// A byte from the code table.
    Code(C),
    /// A byte outside the code table, already consumed.
    Unrecognized(u8),
    /// A complete payload.
    Payload(Bytes),
}

/// Codec for one end of the link, decoding codes of type `C`.
///
/// The Control node decodes [`Command`]s, the HMI node decodes
/// [`Response`]s. Either end can encode both [`Request`]s and [`Response`]s.
#[derive(Debug)]
pub struct LinkCodec<C> {
    expect: Expect,
    _code: PhantomData<fn() -> C>,
}

/// Codec used by the Control node.
pub type ControlCodec = LinkCodec<Command>;

/// Codec used by the HMI node.
pub type HmiCodec = LinkCodec<Response>;

impl<C: WireCode> LinkCodec<C> {
    pub fn new() -> Self {
        Self {
            expect: Expect::Code,
            _code: PhantomData,
        }
    }

    /// Set what the next decoded item will be.
    pub fn expect(&mut self, expect: Expect) {
        self.expect = expect;
    }

    pub fn expecting(&self) -> Expect {
        self.expect
    }
}

impl<C: WireCode> Default for LinkCodec<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: WireCode> Decoder for LinkCodec<C> {
    type Item = Inbound<C>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.expect {
            Expect::Code => {
                if src.is_empty() {
                    return Ok(None);
                }
                let byte = src.get_u8();
                Ok(Some(match C::from_byte(byte) {
                    Some(code) => Inbound::Code(code),
                    None => Inbound::Unrecognized(byte),
                }))
            }
            Expect::Payload(len) => {
                if src.len() < len {
                    src.reserve(len - src.len());
                    return Ok(None);
                }
                self.expect = Expect::Code;
                Ok(Some(Inbound::Payload(src.split_to(len).freeze())))
            }
        }
    }
}

impl<C: WireCode> Encoder<Request> for LinkCodec<C> {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.encoded_len());
        item.encode(dst);
        Ok(())
    }
}

impl<C: WireCode> Encoder<Response> for LinkCodec<C> {
    type Error = CodecError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(1);
        dst.extend_from_slice(&[item.to_byte()]);
        Ok(())
    }
}
