//! Outbound and inbound transfer buffers
//!
//! These are plain data; the handler keeps them inside its single shared
//! lock, together with the connection handle and the worker's stop flag.

use sercom_core::InboundPolicy;

/// The pair of byte buffers exchanged between callers and the I/O worker
#[derive(Debug, Default)]
pub struct TransferBuffers {
    outbound: Vec<u8>,
    inbound: Option<Vec<u8>>,
    policy: InboundPolicy,
}

impl TransferBuffers {
    pub fn new(policy: InboundPolicy) -> Self {
        Self {
            outbound: Vec::new(),
            inbound: None,
            policy,
        }
    }

    /// Append to the outbound buffer; successive calls accumulate until drained
    pub fn enqueue(&mut self, data: &[u8]) {
        self.outbound.extend_from_slice(data);
    }

    /// Take everything queued for transmission, leaving the buffer empty
    pub fn take_outbound(&mut self) -> Option<Vec<u8>> {
        if self.outbound.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.outbound))
        }
    }

    /// Number of bytes waiting to be sent
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Store freshly received bytes according to the inbound policy
    pub fn store_inbound(&mut self, data: Vec<u8>) {
        if data.is_empty() {
            return;
        }

        match self.policy {
            InboundPolicy::Overwrite => self.inbound = Some(data),
            InboundPolicy::Append { max_len } => {
                let buf = self.inbound.get_or_insert_with(Vec::new);
                buf.extend_from_slice(&data);
                if buf.len() > max_len {
                    let excess = buf.len() - max_len;
                    buf.drain(..excess);
                }
                if buf.is_empty() {
                    self.inbound = None;
                }
            }
        }
    }

    /// Whether unclaimed inbound data is pending
    pub fn has_inbound(&self) -> bool {
        self.inbound.is_some()
    }

    /// Snapshot and clear the inbound buffer; empty when nothing is pending
    pub fn take_inbound(&mut self) -> Vec<u8> {
        self.inbound.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_accumulates_in_order() {
        let mut buffers = TransferBuffers::default();
        buffers.enqueue(b"AT");
        buffers.enqueue(b"+GMR");
        buffers.enqueue(b"\r\n");
        assert_eq!(buffers.outbound_len(), 8);
        assert_eq!(buffers.take_outbound(), Some(b"AT+GMR\r\n".to_vec()));
        assert_eq!(buffers.take_outbound(), None);
    }

    #[test]
    fn test_empty_outbound_is_none() {
        let mut buffers = TransferBuffers::default();
        buffers.enqueue(b"");
        assert_eq!(buffers.take_outbound(), None);
    }

    #[test]
    fn test_overwrite_keeps_latest_chunk() {
        let mut buffers = TransferBuffers::new(InboundPolicy::Overwrite);
        buffers.store_inbound(b"first".to_vec());
        buffers.store_inbound(b"second".to_vec());
        assert!(buffers.has_inbound());
        assert_eq!(buffers.take_inbound(), b"second");
        assert!(!buffers.has_inbound());
        assert!(buffers.take_inbound().is_empty());
    }

    #[test]
    fn test_empty_read_does_not_mark_pending() {
        let mut buffers = TransferBuffers::default();
        buffers.store_inbound(Vec::new());
        assert!(!buffers.has_inbound());
    }

    #[test]
    fn test_append_accumulates() {
        let mut buffers = TransferBuffers::new(InboundPolicy::Append { max_len: 64 });
        buffers.store_inbound(b"OK".to_vec());
        buffers.store_inbound(b"\r\n".to_vec());
        assert_eq!(buffers.take_inbound(), b"OK\r\n");
    }

    #[test]
    fn test_append_drops_oldest_beyond_limit() {
        let mut buffers = TransferBuffers::new(InboundPolicy::Append { max_len: 4 });
        buffers.store_inbound(b"abc".to_vec());
        buffers.store_inbound(b"def".to_vec());
        assert_eq!(buffers.take_inbound(), b"cdef");
    }

    #[test]
    fn test_append_with_zero_limit_keeps_nothing() {
        let mut buffers = TransferBuffers::new(InboundPolicy::Append { max_len: 0 });
        buffers.store_inbound(b"lost".to_vec());
        assert!(!buffers.has_inbound());
    }
}
