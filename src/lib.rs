/*! An in-network key-value cache.

`netcache` models a programmable switch that sits between the clients and
the server of a UDP key-value service and answers lookups itself when it can.
The crate is split the way a packet travels:

 * [wire] parses and emits Ethernet, IPv4, UDP and lookup messages;
 * [switch] runs the match-action pipeline over those headers;
 * [phy] moves frames between switch ports and the outside world.
*/

#[macro_use]
mod macros;

pub mod config;
mod parsers;
pub mod phy;
pub mod switch;
pub mod wire;
