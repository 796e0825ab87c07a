use core::fmt;

use heapless::Vec;

use super::PortNo;
use crate::config::SWITCH_MAX_FRAME_LEN;
use crate::wire::{CacheKey, CacheValue, EthernetRepr, Ipv4Repr, UdpRepr};

/// A frame owned by the data path, without touching the heap.
pub type FrameBuf = Vec<u8, SWITCH_MAX_FRAME_LEN>;

/// How a frame is classified on ingress.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Classified {
    /// A lookup addressed to the key-value service.
    Request(Lookup, CacheKey),
    /// An answer coming back from the key-value service.
    Response(CacheKey, Option<CacheValue>),
    /// Anything else, handled by plain forwarding.
    #[default]
    Passthrough,
}

/// Headers of a lookup request, kept so that an answer can be addressed
/// back to the client.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Lookup {
    pub ethernet: EthernetRepr,
    pub ipv4: Ipv4Repr,
    pub udp: UdpRepr,
}

/// The terminal action taken for a frame.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Action {
    /// Send this synthesized frame back out of the ingress port.
    Reply(FrameBuf),
    /// Send this frame out of `port`.
    Forward { port: PortNo, frame: FrameBuf },
    /// Discard the frame.
    Drop,
}

/// The path a frame took through the pipeline.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Outcome {
    /// Request answered from the static table.
    StaticHit,
    /// Request answered from the register bank.
    DynamicHit,
    /// Request forwarded to the key-value service.
    Miss,
    /// Found response learned into the register bank and forwarded.
    Learned,
    /// Not-found response forwarded without being learned.
    NotFound,
    /// Other traffic forwarded.
    Passthrough,
    /// Frame discarded.
    Dropped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Outcome::StaticHit => "static-hit",
            Outcome::DynamicHit => "dynamic-hit",
            Outcome::Miss => "miss",
            Outcome::Learned => "learned",
            Outcome::NotFound => "not-found",
            Outcome::Passthrough => "passthrough",
            Outcome::Dropped => "dropped",
        };
        write!(f, "{name}")
    }
}

/// Result of running one frame through the pipeline.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Verdict {
    pub outcome: Outcome,
    pub action: Action,
}

impl Verdict {
    pub(crate) const fn drop() -> Verdict {
        Verdict {
            outcome: Outcome::Dropped,
            action: Action::Drop,
        }
    }

    /// Whether the switch answered the frame itself.
    pub fn is_reply(&self) -> bool {
        matches!(self.action, Action::Reply(_))
    }

    /// Egress port of the frame, given the port it arrived on.
    pub fn egress(&self, ingress: PortNo) -> Option<PortNo> {
        match self.action {
            Action::Reply(_) => Some(ingress),
            Action::Forward { port, .. } => Some(port),
            Action::Drop => None,
        }
    }

    /// The outgoing frame, if any.
    pub fn frame(&self) -> Option<&[u8]> {
        match &self.action {
            Action::Reply(frame) | Action::Forward { frame, .. } => Some(&frame[..]),
            Action::Drop => None,
        }
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Verdict::drop()
    }
}
