use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use crate::error::TransportError;

use super::Transport;

const MAX_DATAGRAM: usize = 2048;

/// One datagram per message, routed through a static node-id → address table.
pub struct UdpTransport {
    socket: UdpSocket,
    routes: HashMap<u32, SocketAddr>,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    pub fn bind(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            routes: HashMap::new(),
            recv_buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn with_route(mut self, node_id: u32, addr: SocketAddr) -> Self {
        self.routes.insert(node_id, addr);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, destination: u32, payload: &[u8]) -> Result<(), TransportError> {
        let addr = self
            .routes
            .get(&destination)
            .ok_or(TransportError::NoRoute(destination))?;
        let sent = self.socket.send_to(payload, addr)?;
        if sent != payload.len() {
            return Err(TransportError::Rejected(format!(
                "short send: {sent} of {} bytes",
                payload.len()
            )));
        }
        Ok(())
    }

    fn poll_inbound(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.socket.recv_from(&mut self.recv_buf) {
            Ok((len, _)) => Ok(Some(self.recv_buf[..len].to_vec())),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
