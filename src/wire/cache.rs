//! The key-value lookup protocol.
//!
//! A lookup travels as the payload of a UDP datagram exchanged with the
//! key-value service port. Both messages are fixed-width:
//!
//! ```text
//! request:  | op = 0x01 | key (4) |
//! response: | op = 0x02 | key (4) | status (1) | value (4) |
//! ```
//!
//! A request is only recognized on its way *to* the service port, a
//! response only on its way *from* it; see [Repr::parse].

use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result, UdpRepr};

/// Identifier of a record.
pub type Key = u32;

/// Payload associated with a [Key].
pub type Value = u32;

enum_with_unknown! {
    /// Lookup message type.
    pub enum Operation(u8) {
        Request  = 0x01,
        Response = 0x02
    }
}

enum_with_unknown! {
    /// Result of a lookup carried by a response.
    pub enum Status(u8) {
        NotFound = 0x00,
        Found    = 0x01
    }
}

mod field {
    use crate::wire::field::*;

    pub const OPERATION: usize = 0;
    pub const KEY: Field = 1..5;
    pub const STATUS: usize = 5;
    pub const VALUE: Field = 6..10;
}

/// Length of a request message.
pub const REQUEST_LEN: usize = field::KEY.end;

/// Length of a response message.
pub const RESPONSE_LEN: usize = field::VALUE.end;

/// A read/write wrapper around a lookup message buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with lookup message structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer length does not match the operation.
    ///
    /// Messages are fixed-width, so trailing octets are rejected as well.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len <= field::OPERATION {
            return Err(Error);
        }
        match self.operation() {
            Operation::Request if len == REQUEST_LEN => Ok(()),
            Operation::Response if len == RESPONSE_LEN => Ok(()),
            _ => Err(Error),
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the operation field.
    pub fn operation(&self) -> Operation {
        let data = self.buffer.as_ref();
        Operation::from(data[field::OPERATION])
    }

    /// Return the key field.
    pub fn key(&self) -> Key {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u32(&data[field::KEY])
    }

    /// Return the status field.
    ///
    /// # Panics
    /// The function panics if the message is not a response.
    pub fn status(&self) -> Status {
        let data = self.buffer.as_ref();
        Status::from(data[field::STATUS])
    }

    /// Return the value field.
    ///
    /// # Panics
    /// The function panics if the message is not a response.
    pub fn value(&self) -> Value {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u32(&data[field::VALUE])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the operation field.
    pub fn set_operation(&mut self, value: Operation) {
        let data = self.buffer.as_mut();
        data[field::OPERATION] = value.into()
    }

    /// Set the key field.
    pub fn set_key(&mut self, value: Key) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::KEY], value)
    }

    /// Set the status field.
    pub fn set_status(&mut self, value: Status) {
        let data = self.buffer.as_mut();
        data[field::STATUS] = value.into()
    }

    /// Set the value field.
    pub fn set_value(&mut self, value: Value) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::VALUE], value)
    }
}

/// A high-level representation of a lookup message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    /// Ask for the value stored under `key`.
    Request { key: Key },
    /// Answer for `key`; `None` means the service has no such key.
    Response { key: Key, value: Option<Value> },
}

impl Repr {
    /// Parse a lookup message carried by a UDP datagram.
    ///
    /// `service_port` is the UDP port of the key-value service. A request must
    /// be addressed to it and a response must originate from it; anything else
    /// is not lookup traffic and yields `Err(Error)`.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(
        udp_repr: &UdpRepr,
        service_port: u16,
        packet: &Packet<&T>,
    ) -> Result<Repr> {
        packet.check_len()?;

        match packet.operation() {
            Operation::Request if udp_repr.dst_port == service_port => Ok(Repr::Request {
                key: packet.key(),
            }),
            Operation::Response if udp_repr.src_port == service_port => {
                let value = match packet.status() {
                    Status::Found => Some(packet.value()),
                    Status::NotFound => None,
                    Status::Unknown(_) => return Err(Error),
                };
                Ok(Repr::Response {
                    key: packet.key(),
                    value,
                })
            }
            _ => Err(Error),
        }
    }

    /// Return the key this message is about.
    pub const fn key(&self) -> Key {
        match *self {
            Repr::Request { key } | Repr::Response { key, .. } => key,
        }
    }

    /// Return the length of a message that will be emitted from this high-level representation.
    pub const fn buffer_len(&self) -> usize {
        match self {
            Repr::Request { .. } => REQUEST_LEN,
            Repr::Response { .. } => RESPONSE_LEN,
        }
    }

    /// Emit a high-level representation into a lookup message.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, packet: &mut Packet<T>) {
        match *self {
            Repr::Request { key } => {
                packet.set_operation(Operation::Request);
                packet.set_key(key);
            }
            Repr::Response { key, value } => {
                packet.set_operation(Operation::Response);
                packet.set_key(key);
                match value {
                    Some(value) => {
                        packet.set_status(Status::Found);
                        packet.set_value(value);
                    }
                    None => {
                        packet.set_status(Status::NotFound);
                        packet.set_value(0);
                    }
                }
            }
        }
    }
}

/// Formats the message the way a client reports it: a response prints its
/// value, or `NOTFOUND`.
impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::Request { key } => write!(f, "GET {key}"),
            Repr::Response {
                value: Some(value), ..
            } => write!(f, "{value}"),
            Repr::Response { value: None, .. } => write!(f, "NOTFOUND"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CACHE_UDP_PORT;

    static REQUEST_BYTES: [u8; 5] = [0x01, 0x00, 0x00, 0x00, 0x7b];

    static RESPONSE_BYTES: [u8; 10] = [0x02, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x21];

    static NOT_FOUND_BYTES: [u8; 10] = [0x02, 0x00, 0x00, 0x00, 0x7b, 0x00, 0x00, 0x00, 0x00, 0x00];

    const TO_SERVICE: UdpRepr = UdpRepr {
        src_port: 40000,
        dst_port: CACHE_UDP_PORT,
    };

    const FROM_SERVICE: UdpRepr = UdpRepr {
        src_port: CACHE_UDP_PORT,
        dst_port: 40000,
    };

    #[test]
    fn test_deconstruct_request() {
        let packet = Packet::new_checked(&REQUEST_BYTES[..]).unwrap();
        assert_eq!(packet.operation(), Operation::Request);
        assert_eq!(packet.key(), 123);
    }

    #[test]
    fn test_deconstruct_response() {
        let packet = Packet::new_checked(&RESPONSE_BYTES[..]).unwrap();
        assert_eq!(packet.operation(), Operation::Response);
        assert_eq!(packet.key(), 3);
        assert_eq!(packet.status(), Status::Found);
        assert_eq!(packet.value(), 33);
    }

    #[test]
    fn test_parse_request() {
        let packet = Packet::new_unchecked(&REQUEST_BYTES[..]);
        assert_eq!(
            Repr::parse(&TO_SERVICE, CACHE_UDP_PORT, &packet),
            Ok(Repr::Request { key: 123 })
        );
    }

    #[test]
    fn test_parse_response() {
        let packet = Packet::new_unchecked(&RESPONSE_BYTES[..]);
        assert_eq!(
            Repr::parse(&FROM_SERVICE, CACHE_UDP_PORT, &packet),
            Ok(Repr::Response {
                key: 3,
                value: Some(33)
            })
        );

        let packet = Packet::new_unchecked(&NOT_FOUND_BYTES[..]);
        assert_eq!(
            Repr::parse(&FROM_SERVICE, CACHE_UDP_PORT, &packet),
            Ok(Repr::Response {
                key: 123,
                value: None
            })
        );
    }

    #[test]
    fn test_direction_is_part_of_the_marker() {
        // A request travelling away from the service is not a lookup.
        let packet = Packet::new_unchecked(&REQUEST_BYTES[..]);
        assert_eq!(
            Repr::parse(&FROM_SERVICE, CACHE_UDP_PORT, &packet),
            Err(Error)
        );
        // Nor is a response travelling towards it.
        let packet = Packet::new_unchecked(&RESPONSE_BYTES[..]);
        assert_eq!(Repr::parse(&TO_SERVICE, CACHE_UDP_PORT, &packet), Err(Error));
        // Unrelated ports.
        let other = UdpRepr {
            src_port: 53,
            dst_port: 5353,
        };
        assert_eq!(Repr::parse(&other, CACHE_UDP_PORT, &packet), Err(Error));
    }

    #[test]
    fn test_rejects_malformed() {
        // Unknown operation.
        let mut bytes = REQUEST_BYTES;
        bytes[0] = 0x07;
        assert_eq!(Packet::new_checked(&bytes[..]), Err(Error));

        // Wrong lengths.
        assert_eq!(Packet::new_checked(&REQUEST_BYTES[..4]), Err(Error));
        assert_eq!(Packet::new_checked(&RESPONSE_BYTES[..9]), Err(Error));
        let mut long = [0u8; 6];
        long[..5].copy_from_slice(&REQUEST_BYTES);
        assert_eq!(Packet::new_checked(&long[..]), Err(Error));
        assert_eq!(Packet::new_checked(&[0u8; 0][..]), Err(Error));

        // Unknown status.
        let mut bytes = RESPONSE_BYTES;
        bytes[5] = 0x09;
        let packet = Packet::new_unchecked(&bytes[..]);
        assert_eq!(
            Repr::parse(&FROM_SERVICE, CACHE_UDP_PORT, &packet),
            Err(Error)
        );
    }

    #[test]
    fn test_emit() {
        let mut bytes = [0xa5; RESPONSE_LEN];
        let repr = Repr::Response {
            key: 3,
            value: Some(33),
        };
        assert_eq!(repr.buffer_len(), RESPONSE_LEN);
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes, RESPONSE_BYTES);

        let repr = Repr::Response {
            key: 123,
            value: None,
        };
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes, NOT_FOUND_BYTES);

        let mut bytes = [0xa5; REQUEST_LEN];
        Repr::Request { key: 123 }.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes, REQUEST_BYTES);
    }

    #[test]
    fn test_display() {
        let found = Repr::Response {
            key: 1,
            value: Some(11),
        };
        let missing = Repr::Response {
            key: 123,
            value: None,
        };
        assert_eq!(found.to_string(), "11");
        assert_eq!(missing.to_string(), "NOTFOUND");
        assert_eq!(Repr::Request { key: 3 }.to_string(), "GET 3");
    }
}
