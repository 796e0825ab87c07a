use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use rand::Rng;

use super::*;
use crate::phy::Queue;
use crate::wire::{
    CachePacket, CacheRepr, EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr,
    IpProtocol, Ipv4Address, Ipv4Packet, Ipv4Repr, UdpPacket, UdpRepr, ETHERNET_HEADER_LEN,
    IPV4_HEADER_LEN, UDP_HEADER_LEN,
};

const CLIENT_PORT: PortNo = 0;
const SERVER_PORT: PortNo = 1;

const CLIENT_MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x01]);
const SERVER_MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x02]);
const SWITCH_MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0xfe]);

const CLIENT_ADDR: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const SERVER_ADDR: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);

const CLIENT_UDP_PORT: u16 = 40000;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_switch() -> Switch {
    init_logger();
    let mut switch = Switch::new(Config::new());
    switch
        .insert_forwarding_entry(
            Ipv4Cidr::new(CLIENT_ADDR, 32),
            RouteAction::Forward {
                port: CLIENT_PORT,
                hardware_addr: CLIENT_MAC,
            },
        )
        .unwrap();
    switch
        .insert_forwarding_entry(
            Ipv4Cidr::new(SERVER_ADDR, 32),
            RouteAction::Forward {
                port: SERVER_PORT,
                hardware_addr: SERVER_MAC,
            },
        )
        .unwrap();
    switch
}

struct Endpoint {
    mac: EthernetAddress,
    addr: Ipv4Address,
    port: u16,
}

const CLIENT: Endpoint = Endpoint {
    mac: CLIENT_MAC,
    addr: CLIENT_ADDR,
    port: CLIENT_UDP_PORT,
};

const SERVER: Endpoint = Endpoint {
    mac: SERVER_MAC,
    addr: SERVER_ADDR,
    port: crate::config::CACHE_UDP_PORT,
};

/// Build an Ethernet/IPv4/UDP frame from `src` to `dst`, addressed at the
/// link layer to the switch.
fn udp_frame(src: &Endpoint, dst: &Endpoint, payload: &[u8]) -> Vec<u8> {
    let caps = ChecksumCapabilities::default();
    let udp_repr = UdpRepr {
        src_port: src.port,
        dst_port: dst.port,
    };
    let ipv4_repr = Ipv4Repr {
        src_addr: src.addr,
        dst_addr: dst.addr,
        next_header: IpProtocol::Udp,
        payload_len: udp_repr.header_len() + payload.len(),
        hop_limit: 64,
    };
    let eth_repr = EthernetRepr {
        src_addr: src.mac,
        dst_addr: SWITCH_MAC,
        ethertype: EthernetProtocol::Ipv4,
    };

    let len = eth_repr.buffer_len() + ipv4_repr.buffer_len() + ipv4_repr.payload_len;
    let mut bytes = vec![0; len];
    let mut frame = EthernetFrame::new_unchecked(&mut bytes[..]);
    eth_repr.emit(&mut frame);
    let mut ipv4_packet = Ipv4Packet::new_unchecked(frame.payload_mut());
    ipv4_repr.emit(&mut ipv4_packet, &caps);
    let mut udp_packet = UdpPacket::new_unchecked(ipv4_packet.payload_mut());
    udp_repr.emit(
        &mut udp_packet,
        &src.addr,
        &dst.addr,
        payload.len(),
        |buffer| buffer.copy_from_slice(payload),
        &caps,
    );
    bytes
}

fn cache_frame(src: &Endpoint, dst: &Endpoint, repr: CacheRepr) -> Vec<u8> {
    let mut payload = vec![0; repr.buffer_len()];
    repr.emit(&mut CachePacket::new_unchecked(&mut payload[..]));
    udp_frame(src, dst, &payload)
}

fn request_frame(key: CacheKey) -> Vec<u8> {
    cache_frame(&CLIENT, &SERVER, CacheRepr::Request { key })
}

fn response_frame(key: CacheKey, value: Option<CacheValue>) -> Vec<u8> {
    cache_frame(&SERVER, &CLIENT, CacheRepr::Response { key, value })
}

/// Decode the lookup message carried by `frame`, checking every checksum on the way.
fn parse_cache(frame: &[u8]) -> (Ipv4Repr, UdpRepr, CacheRepr) {
    let caps = ChecksumCapabilities::default();
    let eth_frame = EthernetFrame::new_checked(frame).unwrap();
    let ipv4_packet = Ipv4Packet::new_checked(eth_frame.payload()).unwrap();
    let ipv4_repr = Ipv4Repr::parse(&ipv4_packet, &caps).unwrap();
    let udp_packet = UdpPacket::new_checked(ipv4_packet.payload()).unwrap();
    let udp_repr =
        UdpRepr::parse(&udp_packet, &ipv4_repr.src_addr, &ipv4_repr.dst_addr, &caps).unwrap();
    let cache_packet = CachePacket::new_checked(udp_packet.payload()).unwrap();
    let service_port = if udp_repr.dst_port == SERVER.port {
        udp_repr.dst_port
    } else {
        udp_repr.src_port
    };
    let cache_repr = CacheRepr::parse(&udp_repr, service_port, &cache_packet).unwrap();
    (ipv4_repr, udp_repr, cache_repr)
}

/// The key-value service attached to the server port.
#[derive(Default)]
struct KvServer {
    store: HashMap<CacheKey, CacheValue>,
    served: usize,
}

impl KvServer {
    fn with(entries: &[(CacheKey, CacheValue)]) -> KvServer {
        KvServer {
            store: entries.iter().copied().collect(),
            served: 0,
        }
    }

    fn serve(&mut self, frame: &[u8]) -> Vec<u8> {
        let (ipv4_repr, _, cache_repr) = parse_cache(frame);
        assert_eq!(ipv4_repr.dst_addr, SERVER_ADDR);
        let CacheRepr::Request { key } = cache_repr else {
            panic!("server received {cache_repr:?}");
        };
        self.served += 1;
        response_frame(key, self.store.get(&key).copied())
    }
}

struct Network {
    switch: Switch,
    ports: [Queue; 2],
    server: KvServer,
}

impl Network {
    fn new(switch: Switch, server: KvServer) -> Network {
        Network {
            switch,
            ports: [Queue::new(), Queue::new()],
            server,
        }
    }

    /// Send a lookup from the client and return what the client prints.
    fn get(&mut self, key: CacheKey) -> String {
        self.ports[CLIENT_PORT].inject(&request_frame(key));
        assert!(self.switch.poll(&mut self.ports));

        if let Some(frame) = self.ports[SERVER_PORT].collect() {
            let response = self.server.serve(&frame);
            self.ports[SERVER_PORT].inject(&response);
            assert!(self.switch.poll(&mut self.ports));
        }

        let frame = self.ports[CLIENT_PORT].collect().unwrap();
        assert_eq!(self.ports[CLIENT_PORT].pending_outbound(), 0);
        let (ipv4_repr, udp_repr, cache_repr) = parse_cache(&frame);
        assert_eq!(ipv4_repr.dst_addr, CLIENT_ADDR);
        assert_eq!(udp_repr.dst_port, CLIENT_UDP_PORT);
        assert_eq!(cache_repr.key(), key);
        cache_repr.to_string()
    }
}

#[test]
fn test_switch_is_sync() {
    fn assert_sync<T: Sync + Send>() {}
    assert_sync::<Switch>();
}

#[test]
fn test_end_to_end_scenario() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(3, 33).unwrap();
    let mut network = Network::new(switch, KvServer::with(&[(1, 11), (2, 22)]));

    assert_eq!(network.get(1), "11");
    assert_eq!(network.server.served, 1);

    assert_eq!(network.get(1), "11");
    assert_eq!(network.server.served, 1);

    assert_eq!(network.get(2), "22");
    assert_eq!(network.server.served, 2);

    assert_eq!(network.get(3), "33");
    assert_eq!(network.server.served, 2);

    assert_eq!(network.get(123), "NOTFOUND");
    assert_eq!(network.server.served, 3);

    let stats = network.switch.stats();
    assert_eq!(stats.static_hits, 1);
    assert_eq!(stats.dynamic_hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.learned, 2);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.requests(), 5);
}

#[test]
fn test_not_found_is_never_cached() {
    let mut network = Network::new(create_switch(), KvServer::default());
    assert_eq!(network.get(123), "NOTFOUND");
    assert_eq!(network.get(123), "NOTFOUND");
    assert_eq!(network.server.served, 2);
    assert_eq!(network.switch.registers().occupied(), 0);
}

#[test]
fn test_static_entry_shadows_learned_value() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(5, 500).unwrap();

    // A response for the same key still passes through and is learned...
    let verdict = switch.process(SERVER_PORT, &response_frame(5, Some(55)));
    assert_eq!(verdict.outcome, Outcome::Learned);
    assert_eq!(switch.registers().lookup(5), Some(55));

    // ...but the static answer wins.
    let verdict = switch.process(CLIENT_PORT, &request_frame(5));
    assert_eq!(verdict.outcome, Outcome::StaticHit);
    let (_, _, repr) = parse_cache(verdict.frame().unwrap());
    assert_eq!(
        repr,
        CacheRepr::Response {
            key: 5,
            value: Some(500)
        }
    );
}

#[test]
fn test_reply_is_addressed_to_client() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(3, 33).unwrap();

    let verdict = switch.process(CLIENT_PORT, &request_frame(3));
    assert!(verdict.is_reply());
    assert_eq!(verdict.egress(CLIENT_PORT), Some(CLIENT_PORT));

    let frame = verdict.frame().unwrap();
    let eth_frame = EthernetFrame::new_checked(frame).unwrap();
    assert_eq!(eth_frame.src_addr(), SWITCH_MAC);
    assert_eq!(eth_frame.dst_addr(), CLIENT_MAC);
    assert_eq!(
        frame.len(),
        ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN + 10
    );

    let (ipv4_repr, udp_repr, _) = parse_cache(frame);
    assert_eq!(ipv4_repr.src_addr, SERVER_ADDR);
    assert_eq!(ipv4_repr.dst_addr, CLIENT_ADDR);
    assert_eq!(ipv4_repr.hop_limit, 64);
    assert_eq!(udp_repr.src_port, SERVER.port);
    assert_eq!(udp_repr.dst_port, CLIENT_UDP_PORT);
}

#[test]
fn test_colliding_keys_overwrite() {
    let switch = create_switch();
    let colliding = 1 + switch.registers().capacity() as CacheKey;

    switch.process(SERVER_PORT, &response_frame(1, Some(11)));
    assert_eq!(
        switch.process(CLIENT_PORT, &request_frame(1)).outcome,
        Outcome::DynamicHit
    );

    switch.process(SERVER_PORT, &response_frame(colliding, Some(99)));
    assert_eq!(
        switch.process(CLIENT_PORT, &request_frame(colliding)).outcome,
        Outcome::DynamicHit
    );
    // Key 1 was evicted and goes back to the service.
    let verdict = switch.process(CLIENT_PORT, &request_frame(1));
    assert_eq!(verdict.outcome, Outcome::Miss);
    assert_eq!(verdict.egress(CLIENT_PORT), Some(SERVER_PORT));
}

#[test]
fn test_setup_is_idempotent() {
    let mut switch = create_switch();
    assert_eq!(switch.insert_static_cache_entry(3, 33), Ok(None));
    assert_eq!(switch.insert_static_cache_entry(3, 33), Ok(Some(33)));
    assert_eq!(switch.static_cache().len(), 1);

    let route = RouteAction::Forward {
        port: CLIENT_PORT,
        hardware_addr: CLIENT_MAC,
    };
    assert!(switch
        .insert_forwarding_entry(Ipv4Cidr::new(CLIENT_ADDR, 32), route)
        .unwrap()
        .is_some());
    assert_eq!(switch.routes().len(), 2);
}

#[test]
fn test_forwarding_rewrites_headers() {
    let switch = create_switch();
    let request = request_frame(42);
    let verdict = switch.process(CLIENT_PORT, &request);
    assert_eq!(verdict.outcome, Outcome::Miss);

    let Action::Forward { port, frame } = &verdict.action else {
        panic!("expected forward, got {verdict:?}");
    };
    assert_eq!(*port, SERVER_PORT);
    assert_eq!(frame.len(), request.len());

    let eth_frame = EthernetFrame::new_checked(&frame[..]).unwrap();
    assert_eq!(eth_frame.src_addr(), SWITCH_MAC);
    assert_eq!(eth_frame.dst_addr(), SERVER_MAC);

    let ipv4_packet = Ipv4Packet::new_checked(eth_frame.payload()).unwrap();
    assert_eq!(ipv4_packet.hop_limit(), 63);
    assert!(ipv4_packet.verify_checksum());
    // The datagram itself is untouched.
    assert_eq!(
        ipv4_packet.payload(),
        Ipv4Packet::new_unchecked(&request[ETHERNET_HEADER_LEN..]).payload()
    );
}

#[test]
fn test_other_traffic_passes_through() {
    let switch = create_switch();

    let dns = Endpoint { port: 53, ..SERVER };
    let client = Endpoint {
        port: 5353,
        ..CLIENT
    };
    let verdict = switch.process(CLIENT_PORT, &udp_frame(&client, &dns, b"query"));
    assert_eq!(verdict.outcome, Outcome::Passthrough);
    assert_eq!(verdict.egress(CLIENT_PORT), Some(SERVER_PORT));

    // A truncated lookup is forwarded untouched, never answered.
    let mut switch = switch;
    switch.insert_static_cache_entry(3, 33).unwrap();
    let verdict = switch.process(CLIENT_PORT, &udp_frame(&CLIENT, &SERVER, &[0x01, 0, 0]));
    assert_eq!(verdict.outcome, Outcome::Passthrough);
    assert_eq!(verdict.egress(CLIENT_PORT), Some(SERVER_PORT));

    // Same for a request travelling away from the service.
    let backwards = cache_frame(&SERVER, &CLIENT, CacheRepr::Request { key: 3 });
    let verdict = switch.process(SERVER_PORT, &backwards);
    assert_eq!(verdict.outcome, Outcome::Passthrough);
    assert_eq!(verdict.egress(SERVER_PORT), Some(CLIENT_PORT));
}

#[test]
fn test_corrupted_lookup_is_not_answered() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(3, 33).unwrap();

    let mut request = request_frame(3);
    let last = request.len() - 1;
    request[last] ^= 0xff;
    let verdict = switch.process(CLIENT_PORT, &request);
    assert_eq!(verdict.outcome, Outcome::Passthrough);
    assert!(!verdict.is_reply());
}

#[test]
fn test_drops() {
    let mut switch = create_switch();

    // No route.
    let stranger = Endpoint {
        addr: Ipv4Address::new(192, 168, 1, 1),
        ..SERVER
    };
    let unroutable = cache_frame(&CLIENT, &stranger, CacheRepr::Request { key: 9 });
    assert_eq!(switch.process(CLIENT_PORT, &unroutable), Verdict::drop());

    // Blackhole route.
    switch
        .insert_forwarding_entry(
            Ipv4Cidr::new(Ipv4Address::new(192, 168, 0, 0), 16),
            RouteAction::Drop,
        )
        .unwrap();
    assert_eq!(switch.process(CLIENT_PORT, &unroutable).action, Action::Drop);

    // Time to live exhausted.
    let mut request = request_frame(9);
    {
        let mut eth_frame = EthernetFrame::new_unchecked(&mut request[..]);
        let mut ipv4_packet = Ipv4Packet::new_unchecked(eth_frame.payload_mut());
        ipv4_packet.set_hop_limit(1);
        ipv4_packet.fill_checksum();
    }
    assert_eq!(switch.process(CLIENT_PORT, &request).action, Action::Drop);

    // Not IPv4.
    let mut arp = request_frame(9);
    EthernetFrame::new_unchecked(&mut arp[..]).set_ethertype(EthernetProtocol::Arp);
    assert_eq!(switch.process(CLIENT_PORT, &arp).action, Action::Drop);

    // Runt and oversized frames.
    assert_eq!(switch.process(CLIENT_PORT, &[0; 10]).action, Action::Drop);
    let jumbo = vec![0; crate::config::SWITCH_MAX_FRAME_LEN + 1];
    assert_eq!(switch.process(CLIENT_PORT, &jumbo).action, Action::Drop);

    assert_eq!(switch.stats().dropped, 6);
}

#[test]
fn test_static_hit_survives_missing_route() {
    // Answers go back out of the ingress port, routes are not consulted.
    init_logger();
    let mut switch = Switch::new(Config::new());
    switch.insert_static_cache_entry(3, 33).unwrap();
    let verdict = switch.process(CLIENT_PORT, &request_frame(3));
    assert_eq!(verdict.outcome, Outcome::StaticHit);
}

#[test]
fn test_checksums_ignored() {
    init_logger();
    let mut config = Config::new();
    config.checksum = ChecksumCapabilities::ignored();
    let mut switch = Switch::new(config);
    switch.insert_static_cache_entry(3, 33).unwrap();

    let mut request = request_frame(3);
    let last = request.len() - 1;
    // Corrupt the UDP checksum field only.
    let checksum_at = last - 5 - 1;
    request[checksum_at] ^= 0xff;
    let verdict = switch.process(CLIENT_PORT, &request);
    assert_eq!(verdict.outcome, Outcome::StaticHit);

    let frame = verdict.frame().unwrap();
    let eth_frame = EthernetFrame::new_checked(frame).unwrap();
    let ipv4_packet = Ipv4Packet::new_checked(eth_frame.payload()).unwrap();
    assert_eq!(ipv4_packet.checksum(), 0);
    assert_eq!(UdpPacket::new_checked(ipv4_packet.payload()).unwrap().checksum(), 0);
}

#[test]
fn test_poll_sends_to_egress_port() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(3, 33).unwrap();
    let mut ports = [Queue::new(), Queue::new()];

    assert!(!switch.poll(&mut ports));

    ports[CLIENT_PORT].inject(&request_frame(3));
    ports[CLIENT_PORT].inject(&request_frame(4));
    assert!(switch.poll(&mut ports));
    assert_eq!(ports[CLIENT_PORT].pending_inbound(), 0);
    assert_eq!(ports[CLIENT_PORT].pending_outbound(), 1);
    assert_eq!(ports[SERVER_PORT].pending_outbound(), 1);

    // A route towards a port with no device loses the frame.
    switch
        .insert_forwarding_entry(
            Ipv4Cidr::new(Ipv4Address::new(10, 9, 0, 0), 16),
            RouteAction::Forward {
                port: 7,
                hardware_addr: SERVER_MAC,
            },
        )
        .unwrap();
    let nowhere = Endpoint {
        addr: Ipv4Address::new(10, 9, 0, 1),
        ..SERVER
    };
    ports[CLIENT_PORT].inject(&cache_frame(&CLIENT, &nowhere, CacheRepr::Request { key: 4 }));
    assert!(switch.poll(&mut ports));
    assert_eq!(ports[CLIENT_PORT].pending_outbound(), 1);
    assert_eq!(ports[SERVER_PORT].pending_outbound(), 1);
}

#[test]
fn test_concurrent_processing() {
    let mut switch = create_switch();
    switch.insert_static_cache_entry(3, 33).unwrap();
    let switch = Arc::new(switch);

    let learners: Vec<_> = (0..4)
        .map(|_| {
            let switch = Arc::clone(&switch);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..500 {
                    let key = rng.gen_range(0..1024);
                    let value = key * 10;
                    switch.process(SERVER_PORT, &response_frame(key, Some(value)));

                    let verdict = switch.process(CLIENT_PORT, &request_frame(key));
                    if verdict.is_reply() {
                        let (_, _, repr) = parse_cache(verdict.frame().unwrap());
                        let expected = if key == 3 { 33 } else { key * 10 };
                        assert_eq!(
                            repr,
                            CacheRepr::Response {
                                key,
                                value: Some(expected)
                            }
                        );
                    }
                }
            })
        })
        .collect();
    for learner in learners {
        learner.join().unwrap();
    }

    let stats = switch.stats();
    assert_eq!(stats.learned, 2000);
    assert_eq!(stats.requests(), 2000);
}
