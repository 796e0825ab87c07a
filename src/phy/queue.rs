use std::collections::VecDeque;

use crate::config::SWITCH_MAX_FRAME_LEN;
use crate::phy::{self, Device, DeviceCapabilities, Medium};

/// An in-memory switch port.
///
/// Frames handed to [inject] are what the attached host sends; the switch
/// picks them up through [Device::receive]. Frames the switch transmits on the
/// port are queued until the host collects them with [collect].
///
/// [inject]: #method.inject
/// [collect]: #method.collect
#[derive(Debug, Default)]
pub struct Queue {
    inbound: VecDeque<Vec<u8>>,
    outbound: VecDeque<Vec<u8>>,
}

impl Queue {
    /// Creates an idle port.
    pub fn new() -> Queue {
        Queue::default()
    }

    /// Queue a frame sent by the attached host.
    pub fn inject(&mut self, frame: &[u8]) {
        self.inbound.push_back(frame.to_vec())
    }

    /// Take the oldest frame the switch sent to the attached host.
    pub fn collect(&mut self) -> Option<Vec<u8>> {
        self.outbound.pop_front()
    }

    /// Number of frames waiting to be picked up by the switch.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Number of frames waiting to be collected by the host.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }
}

impl Device for Queue {
    type RxToken<'a> = RxToken;
    type TxToken<'a> = TxToken<'a> where Self: 'a;

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_transmission_unit: SWITCH_MAX_FRAME_LEN,
            medium: Medium::Ethernet,
            ..DeviceCapabilities::default()
        }
    }

    fn receive(&mut self) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let buffer = self.inbound.pop_front()?;
        let rx = RxToken { buffer };
        let tx = TxToken {
            queue: &mut self.outbound,
        };
        Some((rx, tx))
    }

    fn transmit(&mut self) -> Option<Self::TxToken<'_>> {
        Some(TxToken {
            queue: &mut self.outbound,
        })
    }
}

#[doc(hidden)]
pub struct RxToken {
    buffer: Vec<u8>,
}

impl phy::RxToken for RxToken {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(&self.buffer)
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct TxToken<'a> {
    queue: &'a mut VecDeque<Vec<u8>>,
}

impl phy::TxToken for TxToken<'_> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buffer = vec![0; len];
        let result = f(&mut buffer);
        self.queue.push_back(buffer);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::{RxToken as _, TxToken as _};

    #[test]
    fn test_inject_then_receive() {
        let mut port = Queue::new();
        port.inject(&[1, 2, 3]);
        port.inject(&[4]);
        assert_eq!(port.pending_inbound(), 2);

        let (rx, tx) = port.receive().unwrap();
        let len = rx.consume(|frame| {
            assert_eq!(frame, &[1, 2, 3]);
            frame.len()
        });
        tx.consume(len, |buffer| buffer.copy_from_slice(&[9, 9, 9]));

        assert_eq!(port.pending_inbound(), 1);
        assert_eq!(port.collect(), Some(vec![9, 9, 9]));
        assert_eq!(port.collect(), None);
    }

    #[test]
    fn test_transmit_without_receive() {
        let mut port = Queue::new();
        assert!(port.receive().is_none());
        port.transmit()
            .unwrap()
            .consume(2, |buffer| buffer.copy_from_slice(&[7, 8]));
        assert_eq!(port.pending_outbound(), 1);
        assert_eq!(port.collect(), Some(vec![7, 8]));
    }
}
