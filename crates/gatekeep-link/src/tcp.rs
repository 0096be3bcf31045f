//! TCP bring-up for the link.
//!
//! A socket stands in for the serial line between the two boards. The
//! Control node listens and serves one HMI peer at a time; the HMI node
//! dials it.

use gatekeep_protocol::WireCode;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::{
    config::LinkConfig,
    error::{LinkError, LinkResult},
    link::Link,
};

/// Dial the configured address, bounded by the connect timeout.
pub async fn connect<C: WireCode>(config: &LinkConfig) -> LinkResult<Link<TcpStream, C>> {
    info!(address = %config.address, "Connecting link");

    let limit = config.connect_timeout();
    let stream = match tokio::time::timeout(limit, TcpStream::connect(&config.address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            error!(address = %config.address, "Link connection failed: {}", e);
            return Err(e.into());
        }
        Err(_) => {
            warn!(
                address = %config.address,
                timeout_ms = config.connect_timeout_ms,
                "Link connection timed out"
            );
            return Err(LinkError::timed_out(
                limit,
                format!("connection to {}", config.address),
            ));
        }
    };

    prepare(&stream);
    info!(address = %config.address, "Link connected");
    Ok(Link::new(stream))
}

/// Bind the listening socket for the Control node.
pub async fn bind(config: &LinkConfig) -> LinkResult<TcpListener> {
    let listener = TcpListener::bind(&config.address).await?;
    info!(address = %listener.local_addr()?, "Link listening");
    Ok(listener)
}

/// Wait for the next peer.
pub async fn accept<C: WireCode>(
    listener: &TcpListener,
) -> LinkResult<(Link<TcpStream, C>, SocketAddr)> {
    let (stream, peer) = listener.accept().await?;
    prepare(&stream);
    info!(peer = %peer, "Link peer connected");
    Ok((Link::new(stream), peer))
}

// Single-byte codes must not sit in Nagle's buffer.
fn prepare(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    } else {
        debug!("TCP_NODELAY set");
    }
}
