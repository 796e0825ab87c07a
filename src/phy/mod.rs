/*! Access to networking hardware.

The `phy` module deals with the *network devices* the switch ports are
attached to. It provides a trait for transmitting and receiving frames,
[Device], and implementations of it:

  * an in-memory frame queue, [Queue], for attaching host models to a port;
  * _middleware_ [TunTapInterface], for exchanging frames with the host kernel.
*/

mod queue;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod sys;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod tuntap_interface;

pub use self::queue::Queue;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use self::tuntap_interface::TunTapInterface;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use self::sys::wait;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Default)]
pub enum Medium {
    #[default]
    Ethernet,
    Ip,
}

/// Permission to take one frame off a port.
pub trait RxToken {
    /// Hand the received frame to `f` and return what it returns.
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R;
}

/// Permission to put one frame on a port.
pub trait TxToken {
    /// Have `f` fill a `len` octet buffer, then send the buffer as one frame.
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R;
}

/// A switch port.
///
/// `receive` and `transmit` only hand out tokens; frames move when a token is
/// consumed. A port that has nothing to deliver, or cannot take a frame right
/// now, returns `None`.
pub trait Device {
    type RxToken<'a>: RxToken
    where
        Self: 'a;

    type TxToken<'a>: TxToken
    where
        Self: 'a;

    /// Take the next pending frame, along with a token to answer on the same port.
    fn receive(&mut self) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)>;

    fn transmit(&mut self) -> Option<Self::TxToken<'_>>;

    fn capabilities(&self) -> DeviceCapabilities;
}

/// What a port can carry.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct DeviceCapabilities {
    /// Switch ports carry Ethernet frames.
    pub medium: Medium,

    /// Largest frame the port sends or receives, Ethernet header included and
    /// FCS excluded.
    pub max_transmission_unit: usize,

    pub checksum: ChecksumCapabilities,
}

/// A description of checksum behavior for every supported protocol.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ChecksumCapabilities {
    pub ipv4: Checksum,
    pub udp: Checksum,
}

impl ChecksumCapabilities {
    /// Checksum behavior that results in not computing or verifying checksums
    /// for any of the supported protocols.
    pub fn ignored() -> Self {
        ChecksumCapabilities {
            ipv4: Checksum::None,
            udp: Checksum::None,
        }
    }
}

/// A description of checksum behavior for a particular protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Checksum {
    /// Verify checksum when receiving and compute checksum when sending.
    #[default]
    Both,
    /// Verify checksum when receiving.
    Rx,
    /// Compute checksum before sending.
    Tx,
    /// Ignore checksum completely.
    None,
}

impl Checksum {
    /// Returns whether checksum should be verified when receiving.
    pub fn rx(&self) -> bool {
        matches!(*self, Checksum::Both | Checksum::Rx)
    }

    /// Returns whether checksum should be computed when sending.
    pub fn tx(&self) -> bool {
        matches!(*self, Checksum::Both | Checksum::Tx)
    }
}
