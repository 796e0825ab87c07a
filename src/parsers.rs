use core::result;
use core::str::FromStr;

use crate::switch::{PortNo, Route, RouteAction, StaticEntry};
use crate::wire::EthernetAddress;
use crate::wire::{Ipv4Address, Ipv4AddressExt, Ipv4Cidr};

type Result<T> = result::Result<T, ()>;

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(data: &'a str) -> Parser<'a> {
        Parser {
            data: data.as_bytes(),
            pos: 0,
        }
    }

    fn advance(&mut self) -> Result<u8> {
        match self.data.get(self.pos) {
            Some(&chr) => {
                self.pos += 1;
                Ok(chr)
            }
            None => Err(()),
        }
    }

    fn try_do<F, T>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut Parser<'a>) -> Result<T>,
    {
        let pos = self.pos;
        match f(self) {
            Ok(res) => Some(res),
            Err(()) => {
                self.pos = pos;
                None
            }
        }
    }

    fn accept_eof(&mut self) -> Result<()> {
        if self.data.len() == self.pos {
            Ok(())
        } else {
            Err(())
        }
    }

    fn until_eof<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Parser<'a>) -> Result<T>,
    {
        let res = f(self)?;
        self.accept_eof()?;
        Ok(res)
    }

    fn accept_char(&mut self, chr: u8) -> Result<()> {
        if self.advance()? == chr {
            Ok(())
        } else {
            Err(())
        }
    }

    fn accept_str(&mut self, string: &[u8]) -> Result<()> {
        for byte in string.iter() {
            self.accept_char(*byte)?;
        }
        Ok(())
    }

    fn accept_digit(&mut self, hex: bool) -> Result<u8> {
        let digit = self.advance()?;
        if digit.is_ascii_digit() {
            Ok(digit - b'0')
        } else if hex && (b'a'..=b'f').contains(&digit) {
            Ok(digit - b'a' + 10)
        } else if hex && (b'A'..=b'F').contains(&digit) {
            Ok(digit - b'A' + 10)
        } else {
            Err(())
        }
    }

    fn accept_number(&mut self, max_digits: usize, max_value: u64, hex: bool) -> Result<u64> {
        let mut value = self.accept_digit(hex)? as u64;
        for _ in 1..max_digits {
            match self.try_do(|p| p.accept_digit(hex)) {
                Some(digit) => {
                    value *= if hex { 16 } else { 10 };
                    value += digit as u64;
                }
                None => break,
            }
        }
        if value < max_value {
            Ok(value)
        } else {
            Err(())
        }
    }

    fn accept_mac_joined_with(&mut self, separator: u8) -> Result<EthernetAddress> {
        let mut octets = [0u8; 6];
        for (n, octet) in octets.iter_mut().enumerate() {
            *octet = self.accept_number(2, 0x100, true)? as u8;
            if n != 5 {
                self.accept_char(separator)?;
            }
        }
        Ok(EthernetAddress(octets))
    }

    fn accept_mac(&mut self) -> Result<EthernetAddress> {
        if let Some(mac) = self.try_do(|p| p.accept_mac_joined_with(b'-')) {
            return Ok(mac);
        }
        if let Some(mac) = self.try_do(|p| p.accept_mac_joined_with(b':')) {
            return Ok(mac);
        }
        Err(())
    }

    fn accept_ipv4_octets(&mut self) -> Result<[u8; 4]> {
        let mut octets = [0u8; 4];
        for (n, octet) in octets.iter_mut().enumerate() {
            *octet = self.accept_number(3, 0x100, false)? as u8;
            if n != 3 {
                self.accept_char(b'.')?;
            }
        }
        Ok(octets)
    }

    fn accept_ipv4(&mut self) -> Result<Ipv4Address> {
        let octets = self.accept_ipv4_octets()?;
        Ok(Ipv4Address::from_bytes(&octets))
    }

    fn accept_cidr(&mut self) -> Result<Ipv4Cidr> {
        let ip = self.accept_ipv4()?;
        self.accept_char(b'/')?;
        let prefix_len = self.accept_number(2, 33, false)? as u8;
        Ok(Ipv4Cidr::new(ip, prefix_len))
    }

    fn accept_u32(&mut self) -> Result<u32> {
        Ok(self.accept_number(10, 1 << 32, false)? as u32)
    }

    fn accept_route_action(&mut self) -> Result<RouteAction> {
        if self.try_do(|p| p.accept_str(b"drop")).is_some() {
            return Ok(RouteAction::Drop);
        }
        let port = self.accept_number(5, 65536, false)? as PortNo;
        self.accept_char(b',')?;
        let hardware_addr = self.accept_mac()?;
        Ok(RouteAction::Forward {
            port,
            hardware_addr,
        })
    }
}

impl FromStr for EthernetAddress {
    type Err = ();

    /// Parse a string representation of an Ethernet address.
    fn from_str(s: &str) -> Result<EthernetAddress> {
        Parser::new(s).until_eof(|p| p.accept_mac())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = ();

    /// Parse a string representation of an IPv4 CIDR.
    fn from_str(s: &str) -> Result<Ipv4Cidr> {
        Parser::new(s).until_eof(|p| p.accept_cidr())
    }
}

impl FromStr for StaticEntry {
    type Err = ();

    /// Parse a static cache entry written as `key=value`.
    fn from_str(s: &str) -> Result<StaticEntry> {
        Parser::new(s).until_eof(|p| {
            let key = p.accept_u32()?;
            p.accept_char(b'=')?;
            let value = p.accept_u32()?;
            Ok(StaticEntry { key, value })
        })
    }
}

impl FromStr for Route {
    type Err = ();

    /// Parse a forwarding entry written as `cidr,port,mac` or `cidr,drop`.
    fn from_str(s: &str) -> Result<Route> {
        Parser::new(s).until_eof(|p| {
            let cidr = p.accept_cidr()?;
            p.accept_char(b',')?;
            let action = p.accept_route_action()?;
            Ok(Route { cidr, action })
        })
    }
}
