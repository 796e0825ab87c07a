/*! The in-network caching switch.

A [Switch] sits between clients and a key-value service. It answers lookups
from two caches, in this order:

 * the *static table*, filled by the control plane before traffic starts;
 * the *register bank*, learned from the service's found-responses as they
   pass through the switch.

Lookups neither cache can answer, and all other traffic, are forwarded by
destination address. See [Switch::process] for the per-frame pipeline.
*/

mod packet;
mod pipeline;
mod register;
mod route;
mod static_cache;
mod stats;

#[cfg(test)]
mod tests;

pub use self::packet::{Action, FrameBuf, Outcome, Verdict};
pub use self::register::RegisterBank;
pub use self::route::{Route, RouteAction, RouteTableFull, Routes};
pub use self::static_cache::{StaticEntry, StaticTable, StaticTableFull};
pub use self::stats::{Stats, StatsSnapshot};

use crate::config::CACHE_UDP_PORT;
use crate::phy::{ChecksumCapabilities, Device, RxToken, TxToken};
use crate::wire::{CacheKey, CacheValue, Ipv4Cidr};

/// A switch port number: the position of its device in the slice given to
/// [Switch::poll].
pub type PortNo = usize;

/// Configuration structure used for creating a switch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// UDP port of the key-value service.
    pub cache_port: u16,

    /// Time to live of the responses the switch synthesizes.
    pub reply_hop_limit: u8,

    /// Which checksums are verified on ingress and computed on egress.
    pub checksum: ChecksumCapabilities,
}

impl Config {
    pub fn new() -> Self {
        Config {
            cache_port: CACHE_UDP_PORT,
            reply_hop_limit: 64,
            checksum: ChecksumCapabilities::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// A caching switch.
///
/// The forwarding and static tables are only mutable through `&mut self`,
/// so they are complete before the switch is shared between processing
/// units. Everything the data path mutates is atomic, and [process] takes
/// `&self`.
///
/// [process]: #method.process
#[derive(Debug)]
pub struct Switch {
    config: Config,
    routes: Routes,
    static_cache: StaticTable,
    registers: RegisterBank,
    stats: Stats,
}

impl Switch {
    /// Creates a switch with empty tables and an all-invalid register bank.
    pub fn new(config: Config) -> Self {
        Switch {
            config,
            routes: Routes::new(),
            static_cache: StaticTable::new(),
            registers: RegisterBank::new(),
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install a forwarding entry for `cidr`, replacing any entry for the
    /// same prefix.
    pub fn insert_forwarding_entry(
        &mut self,
        cidr: Ipv4Cidr,
        action: RouteAction,
    ) -> Result<Option<Route>, RouteTableFull> {
        net_debug!("switch: route {}", Route { cidr, action });
        self.routes.add(Route { cidr, action })
    }

    /// Install a static answer for `key`. Installing the same key again
    /// replaces its value.
    pub fn insert_static_cache_entry(
        &mut self,
        key: CacheKey,
        value: CacheValue,
    ) -> Result<Option<CacheValue>, StaticTableFull> {
        net_debug!("switch: static entry {}={}", key, value);
        self.static_cache.insert(key, value)
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn static_cache(&self) -> &StaticTable {
        &self.static_cache
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Receive every frame pending on `ports`, run it through the pipeline and
    /// transmit the result.
    ///
    /// Returns whether any frame was received.
    pub fn poll<D: Device>(&self, ports: &mut [D]) -> bool {
        let mut readiness_may_have_changed = false;

        for ingress in 0..ports.len() {
            loop {
                let Some((rx_token, _)) = ports[ingress].receive() else {
                    break;
                };
                let verdict = rx_token.consume(|frame| self.process(ingress, frame));
                readiness_may_have_changed = true;
                Self::transmit(ports, ingress, verdict);
            }
        }

        readiness_may_have_changed
    }

    fn transmit<D: Device>(ports: &mut [D], ingress: PortNo, verdict: Verdict) {
        let (egress, frame) = match verdict.action {
            Action::Reply(frame) => (ingress, frame),
            Action::Forward { port, frame } => (port, frame),
            Action::Drop => return,
        };

        let Some(device) = ports.get_mut(egress) else {
            net_debug!("switch: no device on port {}", egress);
            return;
        };
        if frame.len() > device.capabilities().max_transmission_unit {
            net_debug!(
                "switch: {} octet frame exceeds the MTU of port {}",
                frame.len(),
                egress
            );
            return;
        }
        match device.transmit() {
            Some(tx_token) => {
                tx_token.consume(frame.len(), |buffer| buffer.copy_from_slice(&frame));
            }
            None => net_debug!("switch: port {} cannot transmit", egress),
        }
    }
}
