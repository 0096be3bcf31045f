//! Transport link between the HMI node and the Control node.
//!
//! The link is a reliable, ordered byte channel framed by
//! [`LinkCodec`](gatekeep_protocol::LinkCodec). Every receive takes an
//! explicit timeout policy: `None` waits forever, `Some(duration)` fails with
//! [`LinkError::TimedOut`] once the duration elapses.
//!
//! # Components
//!
//! - **Link**: framed channel over any `AsyncRead + AsyncWrite` stream
//! - **tcp**: socket bring-up standing in for the serial line
//! - **duplex_pair**: in-memory pair of connected links
//!
//! # Example
//!
//! ```no_run
//! use gatekeep_core::Credential;
//! use gatekeep_link::{LinkConfig, tcp};
//! use gatekeep_protocol::{Request, Response};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut link = tcp::connect::<Response>(&LinkConfig::default()).await?;
//! link.send(Request::Verify(Credential::new([1, 2, 3, 4, 5]))).await?;
//! let response = link
//!     .recv_response(Some(Duration::from_secs(10)), "VERIFY result")
//!     .await?;
//! println!("Control replied {response}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod link;
pub mod tcp;

pub use config::LinkConfig;
pub use error::{LinkError, LinkResult};
pub use link::{ControlLink, HmiLink, Link, duplex_pair};
