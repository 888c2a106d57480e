//! The single send/receive contract the node uses on the mesh.

mod registry;
mod udp;

pub use registry::{MeshMessage, MessageRegistry};
pub use udp::UdpTransport;

use crate::error::TransportError;

pub trait Transport {
    /// Hands one serialized message to the network for `destination`.
    fn send(&mut self, destination: u32, payload: &[u8]) -> Result<(), TransportError>;

    /// Next inbound message, if one is waiting. Never blocks.
    fn poll_inbound(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }
}
