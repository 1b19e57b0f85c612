//! Module `data_channel`
//!
//! Lifecycle of the transient data connection. A channel is idle until PORT
//! configures an endpoint, connected while a transfer runs, and idle again
//! once closed. The endpoint is consumed by the first `open`, successful or
//! not.

use log::{debug, info, warn};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use crate::error::TransferError;

/// Client data address advertised by PORT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl DataEndpoint {
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }
}

/// Parses `h1,h2,h3,h4,p1,p2`. Every token must be a decimal octet.
impl FromStr for DataEndpoint {
    type Err = TransferError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let malformed = || TransferError::MalformedAddress(spec.to_string());

        let octets = spec
            .split(',')
            .map(|token| token.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| malformed())?;

        match octets.as_slice() {
            [h1, h2, h3, h4, p1, p2] => Ok(Self {
                ip: Ipv4Addr::new(*h1, *h2, *h3, *h4),
                port: (u16::from(*p1) << 8) | u16::from(*p2),
            }),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for DataEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

enum ChannelState {
    Idle,
    Configured(DataEndpoint),
    Connected(BufWriter<TcpStream>),
}

/// One session's data channel.
pub struct DataChannel {
    state: ChannelState,
    connect_timeout: Duration,
}

impl DataChannel {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            state: ChannelState::Idle,
            connect_timeout,
        }
    }

    /// Records the endpoint for the next transfer, replacing any prior one.
    pub fn configure(&mut self, endpoint: DataEndpoint) {
        if self.is_connected() {
            warn!("Reconfiguring data channel while connected, dropping open connection");
        }
        debug!("Data endpoint set to {}", endpoint);
        self.state = ChannelState::Configured(endpoint);
    }

    /// The pending endpoint, if one is configured and not yet used
    pub fn endpoint(&self) -> Option<DataEndpoint> {
        match self.state {
            ChannelState::Configured(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ChannelState::Connected(_))
    }

    /// Connects out to the configured endpoint.
    pub async fn open(&mut self) -> Result<(), TransferError> {
        let endpoint = match std::mem::replace(&mut self.state, ChannelState::Idle) {
            ChannelState::Configured(endpoint) => endpoint,
            ChannelState::Idle => return Err(TransferError::NotConfigured),
            connected @ ChannelState::Connected(_) => {
                self.state = connected;
                return Ok(());
            }
        };

        let addr = endpoint.socket_addr();
        info!("Active mode: connecting to client data socket {}", addr);

        let connect = TcpStream::connect(addr);
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransferError::ConnectFailed { addr, source }),
            Err(_) => return Err(TransferError::ConnectTimeout(addr)),
        };

        self.state = ChannelState::Connected(BufWriter::new(stream));
        Ok(())
    }

    /// Writes bytes to the open data connection.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        match &mut self.state {
            ChannelState::Connected(writer) => {
                writer.write_all(bytes).await?;
                Ok(())
            }
            _ => Err(TransferError::NotConnected),
        }
    }

    /// Flushes and releases the connection. Does nothing when not connected.
    pub async fn close(&mut self) -> Result<(), TransferError> {
        if let ChannelState::Connected(mut writer) =
            std::mem::replace(&mut self.state, ChannelState::Idle)
        {
            writer.flush().await?;
            writer.into_inner().shutdown().await?;
            debug!("Data connection closed");
        }
        Ok(())
    }

    /// Drops the connection without flushing buffered bytes.
    pub fn abandon(&mut self) {
        if let ChannelState::Connected(_) =
            std::mem::replace(&mut self.state, ChannelState::Idle)
        {
            debug!("Data connection abandoned");
        }
    }
}
