// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Datagram transport to the management objects' control port.

use crate::error::CommunicationError;
use async_trait::async_trait;
use esp_messages::MAX_SERIALIZED_SIZE;
use std::net::Ipv6Addr;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP port the management object stack listens on.
pub const OBJ_CONTROL_PORT: u16 = 23320;

/// Default control-port address: the object stack on this host.
pub fn default_object_addr() -> SocketAddr {
    SocketAddr::new(Ipv6Addr::LOCALHOST.into(), OBJ_CONTROL_PORT)
}

/// Retry behavior for control-port RPCs.
#[derive(Debug, Clone, Copy)]
pub struct PortRetryConfig {
    /// How long to wait for a response to a single request before
    /// resending it.
    pub per_attempt_timeout: Duration,
    /// Total number of send attempts before the RPC fails.
    pub max_attempts: usize,
}

impl Default for PortRetryConfig {
    fn default() -> Self {
        Self { per_attempt_timeout: Duration::from_secs(2), max_attempts: 5 }
    }
}

/// One request/response datagram exchange endpoint.
///
/// Retries, message-id matching, and busy backoff live above this seam in
/// [`crate::EnvClient`]; an implementation only moves raw packets.
#[async_trait]
pub trait ControlPort: Send + Sync {
    async fn send(&self, data: &[u8]) -> Result<(), CommunicationError>;
    async fn recv(&self) -> Result<Vec<u8>, CommunicationError>;
}

/// [`ControlPort`] over a connected UDP socket.
pub struct UdpControlPort {
    socket: UdpSocket,
}

impl UdpControlPort {
    pub async fn connect(
        addr: SocketAddr,
    ) -> Result<Self, CommunicationError> {
        let bind_addr = if addr.is_ipv6() {
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0)
        } else {
            SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), 0)
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(CommunicationError::Send)?;
        socket.connect(addr).await.map_err(CommunicationError::Send)?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl ControlPort for UdpControlPort {
    async fn send(&self, data: &[u8]) -> Result<(), CommunicationError> {
        self.socket.send(data).await.map_err(CommunicationError::Send)?;
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, CommunicationError> {
        let mut buf = [0; MAX_SERIALIZED_SIZE];
        let n =
            self.socket.recv(&mut buf).await.map_err(CommunicationError::Recv)?;
        Ok(buf[..n].to_vec())
    }
}
