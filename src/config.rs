//! Compile-time capacities of the switch.
//!
//! Every table on the data path is a fixed-size `heapless` container or a
//! plain array; these constants bound them.

/// Maximum number of entries in the forwarding table.
pub const SWITCH_MAX_ROUTE_COUNT: usize = 16;

/// Capacity of the static cache table. Must be a power of two.
pub const SWITCH_STATIC_CACHE_COUNT: usize = 64;

/// Number of slots in the dynamic cache register bank.
pub const SWITCH_REGISTER_COUNT: usize = 256;

/// Largest Ethernet frame (without FCS) the switch will buffer.
pub const SWITCH_MAX_FRAME_LEN: usize = 1514;

/// Well-known UDP port of the key-value service.
pub const CACHE_UDP_PORT: u16 = 1234;
