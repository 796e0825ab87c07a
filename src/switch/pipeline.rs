use super::packet::{Classified, Lookup};
use super::{Action, FrameBuf, Outcome, PortNo, RouteAction, Switch, Verdict};
use crate::config::SWITCH_MAX_FRAME_LEN;
use crate::wire::{
    CacheKey, CachePacket, CacheRepr, CacheValue, EthernetFrame, EthernetProtocol, EthernetRepr,
    IpProtocol, Ipv4Packet, Ipv4Repr, UdpPacket, UdpRepr,
};

impl Switch {
    /// Run one frame received on `ingress` through the pipeline.
    ///
    /// A lookup request is answered from the static table, then from the
    /// register bank, and otherwise forwarded to the key-value service. A
    /// found-response from the service is learned into the register bank
    /// before it is forwarded to the client. Not-found responses are never
    /// learned. Everything else, malformed lookup traffic included, is
    /// forwarded by destination address.
    pub fn process(&self, ingress: PortNo, frame: &[u8]) -> Verdict {
        let verdict = self.run(frame);
        net_trace!(
            "switch: port {}: {} octets, {}",
            ingress,
            frame.len(),
            verdict.outcome
        );
        self.stats.record(verdict.outcome);
        verdict
    }

    fn run(&self, frame: &[u8]) -> Verdict {
        if frame.len() > SWITCH_MAX_FRAME_LEN {
            net_debug!("switch: dropping oversized frame ({} octets)", frame.len());
            return Verdict::drop();
        }

        match self.classify(frame) {
            Classified::Request(lookup, key) => self.process_request(frame, &lookup, key),
            Classified::Response(key, value) => self.process_response(frame, key, value),
            Classified::Passthrough => self.forward(frame, Outcome::Passthrough),
        }
    }

    pub(crate) fn classify(&self, frame: &[u8]) -> Classified {
        let eth_frame = check!(EthernetFrame::new_checked(frame));
        let eth_repr = check!(EthernetRepr::parse(&eth_frame));
        if eth_repr.ethertype != EthernetProtocol::Ipv4 {
            return Classified::Passthrough;
        }

        let ipv4_packet = check!(Ipv4Packet::new_checked(eth_frame.payload()));
        let ipv4_repr = check!(Ipv4Repr::parse(&ipv4_packet, &self.config.checksum));
        if ipv4_repr.next_header != IpProtocol::Udp {
            return Classified::Passthrough;
        }
        if ipv4_packet.more_frags() || ipv4_packet.frag_offset() != 0 {
            net_trace!("switch: not looking into fragment of {}", ipv4_repr);
            return Classified::Passthrough;
        }

        let udp_packet = check!(UdpPacket::new_checked(ipv4_packet.payload()));
        let udp_repr = check!(UdpRepr::parse(
            &udp_packet,
            &ipv4_repr.src_addr,
            &ipv4_repr.dst_addr,
            &self.config.checksum
        ));
        if udp_repr.src_port != self.config.cache_port && udp_repr.dst_port != self.config.cache_port
        {
            return Classified::Passthrough;
        }

        let cache_packet = check!(CachePacket::new_checked(udp_packet.payload()));
        match check!(CacheRepr::parse(
            &udp_repr,
            self.config.cache_port,
            &cache_packet
        )) {
            CacheRepr::Request { key } => Classified::Request(
                Lookup {
                    ethernet: eth_repr,
                    ipv4: ipv4_repr,
                    udp: udp_repr,
                },
                key,
            ),
            CacheRepr::Response { key, value } => Classified::Response(key, value),
        }
    }

    fn process_request(&self, frame: &[u8], lookup: &Lookup, key: CacheKey) -> Verdict {
        if let Some(value) = self.static_cache.lookup(key) {
            net_trace!("switch: key {} found in static table", key);
            return self.reply(lookup, key, value, Outcome::StaticHit);
        }
        if let Some(value) = self.registers.lookup(key) {
            net_trace!("switch: key {} found in register bank", key);
            return self.reply(lookup, key, value, Outcome::DynamicHit);
        }
        net_trace!("switch: key {} not cached", key);
        self.forward(frame, Outcome::Miss)
    }

    fn process_response(&self, frame: &[u8], key: CacheKey, value: Option<CacheValue>) -> Verdict {
        match value {
            Some(value) => {
                net_trace!("switch: learning {}={}", key, value);
                self.registers.write(key, value);
                self.forward(frame, Outcome::Learned)
            }
            None => self.forward(frame, Outcome::NotFound),
        }
    }

    /// Answer a lookup on behalf of the key-value service.
    fn reply(&self, lookup: &Lookup, key: CacheKey, value: CacheValue, outcome: Outcome) -> Verdict {
        let cache_repr = CacheRepr::Response {
            key,
            value: Some(value),
        };
        let udp_repr = UdpRepr {
            src_port: lookup.udp.dst_port,
            dst_port: lookup.udp.src_port,
        };
        let ipv4_repr = Ipv4Repr {
            src_addr: lookup.ipv4.dst_addr,
            dst_addr: lookup.ipv4.src_addr,
            next_header: IpProtocol::Udp,
            payload_len: udp_repr.header_len() + cache_repr.buffer_len(),
            hop_limit: self.config.reply_hop_limit,
        };
        let eth_repr = EthernetRepr {
            src_addr: lookup.ethernet.dst_addr,
            dst_addr: lookup.ethernet.src_addr,
            ethertype: EthernetProtocol::Ipv4,
        };

        let mut buffer = FrameBuf::new();
        let len = eth_repr.buffer_len() + ipv4_repr.buffer_len() + ipv4_repr.payload_len;
        if buffer.resize(len, 0).is_err() {
            return Verdict::drop();
        }

        let mut eth_frame = EthernetFrame::new_unchecked(&mut buffer[..]);
        eth_repr.emit(&mut eth_frame);

        let mut ipv4_packet = Ipv4Packet::new_unchecked(eth_frame.payload_mut());
        ipv4_repr.emit(&mut ipv4_packet, &self.config.checksum);

        let mut udp_packet = UdpPacket::new_unchecked(ipv4_packet.payload_mut());
        udp_repr.emit(
            &mut udp_packet,
            &ipv4_repr.src_addr,
            &ipv4_repr.dst_addr,
            cache_repr.buffer_len(),
            |payload| cache_repr.emit(&mut CachePacket::new_unchecked(payload)),
            &self.config.checksum,
        );

        Verdict {
            outcome,
            action: Action::Reply(buffer),
        }
    }

    /// Route an IPv4 frame by destination address.
    ///
    /// The frame leaves with the next hop's hardware address as destination,
    /// the hardware address it was sent to as source, and its time to live
    /// decremented.
    fn forward(&self, frame: &[u8], outcome: Outcome) -> Verdict {
        let eth_frame = check!(EthernetFrame::new_checked(frame));
        if eth_frame.ethertype() != EthernetProtocol::Ipv4 {
            net_trace!("switch: cannot route {} frame", eth_frame.ethertype());
            return Verdict::drop();
        }
        let ipv4_packet = check!(Ipv4Packet::new_checked(eth_frame.payload()));
        let ipv4_repr = check!(Ipv4Repr::parse(&ipv4_packet, &self.config.checksum));

        let Some(route) = self.routes.lookup(&ipv4_repr.dst_addr) else {
            net_debug!("switch: no route to {}", ipv4_repr.dst_addr);
            return Verdict::drop();
        };
        let (port, hardware_addr) = match route.action {
            RouteAction::Forward {
                port,
                hardware_addr,
            } => (port, hardware_addr),
            RouteAction::Drop => {
                net_trace!("switch: {} is blackholed", ipv4_repr.dst_addr);
                return Verdict::drop();
            }
        };
        if ipv4_repr.hop_limit <= 1 {
            net_debug!("switch: time to live exceeded for {}", ipv4_repr);
            return Verdict::drop();
        }

        let mut buffer = FrameBuf::new();
        if buffer.extend_from_slice(frame).is_err() {
            return Verdict::drop();
        }

        let mut eth_frame = EthernetFrame::new_unchecked(&mut buffer[..]);
        let received_on = eth_frame.dst_addr();
        eth_frame.set_src_addr(received_on);
        eth_frame.set_dst_addr(hardware_addr);

        let mut ipv4_packet = Ipv4Packet::new_unchecked(eth_frame.payload_mut());
        ipv4_packet.set_hop_limit(ipv4_repr.hop_limit - 1);
        if self.config.checksum.ipv4.tx() {
            ipv4_packet.fill_checksum();
        }

        Verdict {
            outcome,
            action: Action::Forward {
                port,
                frame: buffer,
            },
        }
    }
}
