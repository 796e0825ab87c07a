/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two
levels of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens through the
   `Packet` family of structures, e.g. [EthernetFrame] or [Ipv4Packet].
 * Second, in cases where the space of valid field values is much smaller
   than the space of possible field values, it provides a compact, high-level
   representation of packet data that can be parsed from and emitted into
   a sequence of octets. This happens through the `Repr` family of structs
   and enums, e.g. [CacheRepr] or [UdpRepr].

The `Packet` family of data structures guarantees that, if the `Packet::check_len()`
method returned `Ok(())`, then no accessor or setter method will panic.
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod cache;
mod ethernet;
pub(crate) mod ip;
mod ipv4;
mod udp;

use core::fmt;

pub use self::ethernet::{
    Address as EthernetAddress, EtherType as EthernetProtocol, Frame as EthernetFrame,
    Repr as EthernetRepr, HEADER_LEN as ETHERNET_HEADER_LEN,
};

pub use self::ip::Protocol as IpProtocol;

pub use self::ipv4::{
    Address as Ipv4Address, AddressExt as Ipv4AddressExt, Cidr as Ipv4Cidr,
    Packet as Ipv4Packet, Repr as Ipv4Repr, HEADER_LEN as IPV4_HEADER_LEN,
};

pub use self::udp::{Packet as UdpPacket, Repr as UdpRepr, HEADER_LEN as UDP_HEADER_LEN};

pub use self::cache::{
    Key as CacheKey, Operation as CacheOperation, Packet as CachePacket, Repr as CacheRepr,
    Status as CacheStatus, Value as CacheValue,
};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by netcache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;
