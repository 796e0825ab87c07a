mod utils;

use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use log::{error, info};

use netcache_rs::phy::wait as phy_wait;
use netcache_rs::switch::{Config, Route, StaticEntry, Switch};

fn main() {
    utils::setup_logging("");

    // cargo run --example switch -- --tap tap0 --tap tap1 \
    //     --route 10.0.0.1/32,0,02:00:00:00:00:01 --route 10.0.0.2/32,1,02:00:00:00:00:02 \
    //     --static 3=33
    let (mut opts, mut free) = utils::create_options();
    utils::add_tuntap_options(&mut opts, &mut free);
    utils::add_switch_options(&mut opts, &mut free);
    let mut matches = utils::parse_options(&opts, free);

    let mut config = Config::new();
    if let Some(port) = utils::parse_all::<u16>(&matches, "cache-port").pop() {
        config.cache_port = port;
    }
    let mut switch = Switch::new(config);

    for route in utils::parse_all::<Route>(&matches, "route") {
        if let Err(err) = switch.insert_forwarding_entry(route.cidr, route.action) {
            error!("cannot install {}: {}", route, err);
            return;
        }
    }
    for entry in utils::parse_all::<StaticEntry>(&matches, "static") {
        if let Err(err) = switch.insert_static_cache_entry(entry.key, entry.value) {
            error!("cannot install {}: {}", entry, err);
            return;
        }
    }

    let mut ports = match utils::parse_tuntap_options(&mut matches) {
        Ok(ports) => ports,
        Err(err) => {
            error!("cannot open TAP interface: {}", err);
            return;
        }
    };
    if ports.is_empty() {
        error!("no ports, give at least one --tap");
        return;
    }
    let fds: Vec<RawFd> = ports.iter().map(|port| port.as_raw_fd()).collect();
    info!(
        "switching between {} ports, {} routes, {} static entries",
        ports.len(),
        switch.routes().len(),
        switch.static_cache().len()
    );

    let mut reported = switch.stats();
    loop {
        if switch.poll(&mut ports) {
            continue;
        }

        let stats = switch.stats();
        if stats != reported {
            info!(
                "{} requests, {} answered ({} static), {} learned",
                stats.requests(),
                stats.hits(),
                stats.static_hits,
                stats.learned
            );
            reported = stats;
        }

        if let Err(err) = phy_wait(&fds, Some(Duration::from_secs(1))) {
            error!("wait failed: {}", err);
            return;
        }
    }
}
