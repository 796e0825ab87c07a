use core::fmt;

use heapless::Vec;

use super::PortNo;
use crate::config::SWITCH_MAX_ROUTE_COUNT;
use crate::wire::{EthernetAddress, Ipv4Address, Ipv4Cidr};

/// What to do with a datagram whose destination matched a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Send out of `port`, rewriting the destination MAC to `hardware_addr`.
    Forward {
        port: PortNo,
        hardware_addr: EthernetAddress,
    },
    /// Discard the datagram.
    Drop,
}

/// A prefix of addresses and the action applied to datagrams headed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub cidr: Ipv4Cidr,
    pub action: RouteAction,
}

impl Route {
    pub fn new_forward(cidr: Ipv4Cidr, port: PortNo, hardware_addr: EthernetAddress) -> Route {
        Route {
            cidr: cidr.network(),
            action: RouteAction::Forward {
                port,
                hardware_addr,
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.action {
            RouteAction::Forward {
                port,
                hardware_addr,
            } => write!(f, "{} -> port {} via {}", self.cidr, port, hardware_addr),
            RouteAction::Drop => write!(f, "{} -> drop", self.cidr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTableFull;

impl fmt::Display for RouteTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route table full")
    }
}

impl std::error::Error for RouteTableFull {}

/// The forwarding table.
#[derive(Debug, Default)]
pub struct Routes {
    storage: Vec<Route, SWITCH_MAX_ROUTE_COUNT>,
}

impl Routes {
    /// Creates a new empty forwarding table.
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
        }
    }

    /// Install a route, replacing the route for the same prefix if there is one.
    ///
    /// Host bits of the prefix are ignored.
    pub fn add(&mut self, route: Route) -> Result<Option<Route>, RouteTableFull> {
        let route = Route {
            cidr: route.cidr.network(),
            ..route
        };
        if let Some(existing) = self.storage.iter_mut().find(|r| r.cidr == route.cidr) {
            return Ok(Some(core::mem::replace(existing, route)));
        }
        self.storage.push(route).map_err(|_| RouteTableFull)?;
        Ok(None)
    }

    /// Remove the route for exactly this prefix.
    pub fn remove(&mut self, cidr: &Ipv4Cidr) -> Option<Route> {
        let cidr = cidr.network();
        if let Some((i, _)) = self
            .storage
            .iter()
            .enumerate()
            .find(|(_, r)| r.cidr == cidr)
        {
            Some(self.storage.remove(i))
        } else {
            None
        }
    }

    /// Find the longest-prefix route covering `addr`.
    pub fn lookup(&self, addr: &Ipv4Address) -> Option<&Route> {
        self.storage
            .iter()
            .filter(|route| route.cidr.contains_addr(addr))
            .max_by_key(|route| route.cidr.prefix_len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.storage.iter()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
