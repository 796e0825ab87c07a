#![allow(dead_code)]

use std::env;
use std::io::{self, Write};
use std::process;
use std::str::FromStr;

use env_logger::Builder;
use getopts::{Matches, Options};
use log::{Level, LevelFilter};

use netcache_rs::phy::{Medium, TunTapInterface};

pub fn setup_logging(filter: &str) {
    Builder::new()
        .format(move |buf, record| {
            let style = match record.level() {
                Level::Error => "\x1b[31m",
                Level::Warn => "\x1b[33m",
                Level::Info => "\x1b[32m",
                Level::Debug | Level::Trace => "\x1b[37m",
            };
            writeln!(
                buf,
                "{}{:>5} ({}): {}\x1b[0m",
                style,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_filters(filter)
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .init();
}

pub fn create_options() -> (Options, Vec<&'static str>) {
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    (opts, Vec::new())
}

pub fn parse_options(options: &Options, free: Vec<&str>) -> Matches {
    match options.parse(env::args().skip(1)) {
        Err(err) => {
            println!("{err}");
            process::exit(1)
        }
        Ok(matches) => {
            if matches.opt_present("h") || matches.free.len() != free.len() {
                let brief = format!(
                    "Usage: {} [OPTION]... {}",
                    env::args().next().unwrap_or_default(),
                    free.join(" ")
                );
                print!("{}", options.usage(&brief));
                process::exit(if matches.free.len() != free.len() {
                    1
                } else {
                    0
                })
            }
            matches
        }
    }
}

pub fn add_tuntap_options(opts: &mut Options, _free: &mut [&str]) {
    opts.optmulti(
        "",
        "tap",
        "TAP interface attached to the next switch port",
        "TAP",
    );
}

/// Open one TAP interface per `--tap`, in port order.
pub fn parse_tuntap_options(matches: &mut Matches) -> io::Result<Vec<TunTapInterface>> {
    matches
        .opt_strs("tap")
        .iter()
        .map(|name| TunTapInterface::new(name, Medium::Ethernet))
        .collect()
}

pub fn add_switch_options(opts: &mut Options, _free: &mut [&str]) {
    opts.optmulti(
        "",
        "route",
        "forwarding entry, as CIDR,PORT,MAC or CIDR,drop",
        "ROUTE",
    );
    opts.optmulti("", "static", "static cache entry, as KEY=VALUE", "ENTRY");
    opts.optopt("", "cache-port", "UDP port of the key-value service", "PORT");
}

/// Parse every occurrence of `name`, exiting on the first malformed one.
pub fn parse_all<T: FromStr>(matches: &Matches, name: &str) -> Vec<T> {
    matches
        .opt_strs(name)
        .iter()
        .map(|arg| match arg.parse() {
            Ok(value) => value,
            Err(_) => {
                println!("invalid --{name}: {arg}");
                process::exit(1)
            }
        })
        .collect()
}
