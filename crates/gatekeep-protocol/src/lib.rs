pub mod codec;
pub mod code;
pub mod error;
pub mod request;

pub use code::{Command, Response, WireCode};
pub use codec::{ControlCodec, Expect, HmiCodec, Inbound, LinkCodec};
pub use error::{CodecError, CodecResult};
pub use request::Request;
