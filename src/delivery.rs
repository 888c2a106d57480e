//! Drains the report buffer toward the collection point, one send per tick.
//!
//! Only the oldest report is ever attempted. A failed send leaves it at the
//! head to be retried verbatim next tick, so newer reports wait behind it
//! until it goes through or is evicted by overflow.

use crate::buffer::ReportBuffer;
use crate::error::{NodeError, TransportError};
use crate::mesh::Transport;
use crate::models::{PictureReport, ReportPackage};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug)]
pub enum DeliveryOutcome {
    Idle,
    Delivered(PictureReport),
    Retained(NodeError),
}

pub struct DeliveryPump {
    node_id: u32,
    destination: u32,
}

impl DeliveryPump {
    pub fn new(node_id: u32, destination: u32) -> Self {
        Self {
            node_id,
            destination,
        }
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn tick(&self, buffer: &mut ReportBuffer, transport: &mut dyn Transport) -> DeliveryOutcome {
        let Ok(head) = buffer.peek() else {
            log_debug!("report queue is empty, nothing to send");
            return DeliveryOutcome::Idle;
        };
        let head = *head;
        let name = head.display_name();

        let package = ReportPackage::new(self.node_id, self.destination, &head);
        let sent = package
            .to_bytes()
            .map_err(|err| TransportError::Rejected(format!("encode failed: {err}")))
            .and_then(|payload| transport.send(self.destination, &payload));

        match sent {
            Ok(()) => {
                // Head is unchanged: nothing else touches the buffer mid-tick.
                if let Err(err) = buffer.pop() {
                    log_warn!("delivered report \"{name}\" was already gone: {err}");
                }
                log_info!(
                    "sent report \"{name}\" to node {} ({} pending)",
                    self.destination,
                    buffer.len()
                );
                DeliveryOutcome::Delivered(head)
            }
            Err(source) => {
                log_warn!(
                    "failed to send report \"{name}\" to node {}, will retry: {source}",
                    self.destination
                );
                DeliveryOutcome::Retained(NodeError::SendFailed {
                    name,
                    destination: self.destination,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Score;

    struct FlakyTransport {
        fail: bool,
        sent: Vec<Vec<u8>>,
    }

    impl Transport for FlakyTransport {
        fn send(&mut self, destination: u32, payload: &[u8]) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::NoRoute(destination));
            }
            self.sent.push(payload.to_vec());
            Ok(())
        }
    }

    fn buffer_with(indices: &[u32]) -> ReportBuffer {
        let mut buffer = ReportBuffer::new(10);
        for &index in indices {
            buffer.push(PictureReport::new(2153, index, Score::new(0.9)));
        }
        buffer
    }

    #[test]
    fn empty_buffer_sends_nothing() {
        let pump = DeliveryPump::new(1, 2);
        let mut transport = FlakyTransport {
            fail: false,
            sent: Vec::new(),
        };
        let mut buffer = ReportBuffer::new(2);
        assert!(matches!(pump.tick(&mut buffer, &mut transport), DeliveryOutcome::Idle));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn failing_transport_leaves_buffer_untouched() {
        let pump = DeliveryPump::new(1, 2);
        let mut transport = FlakyTransport {
            fail: true,
            sent: Vec::new(),
        };
        let mut buffer = buffer_with(&[1, 2, 3]);
        for _ in 0..5 {
            assert!(matches!(
                pump.tick(&mut buffer, &mut transport),
                DeliveryOutcome::Retained(NodeError::SendFailed { destination: 2, .. })
            ));
        }
        let indices: Vec<u32> = buffer.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn success_retires_only_the_head() {
        let pump = DeliveryPump::new(1, 2);
        let mut transport = FlakyTransport {
            fail: false,
            sent: Vec::new(),
        };
        let mut buffer = buffer_with(&[1, 2]);

        let outcome = pump.tick(&mut buffer, &mut transport);
        assert!(matches!(outcome, DeliveryOutcome::Delivered(r) if r.index == 1));
        assert_eq!(buffer.len(), 1);
        assert_eq!(transport.sent.len(), 1);

        let sent: serde_json::Value = serde_json::from_slice(&transport.sent[0]).unwrap();
        assert_eq!(sent["pictureIndex"], 1);
        assert_eq!(sent["from"], 1);
        assert_eq!(sent["dest"], 2);
    }
}
