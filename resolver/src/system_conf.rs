// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! System configuration loading
//!
//! The text of `/etc/resolv.conf` is parsed by the `resolv-conf` crate;
//! this module only maps its AST onto `ResolvConf` tables.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use resolv_conf;

use config::ResolvConf;
use error::*;
use proto::rr::Name;

/// Maps a parsed resolv.conf onto a `ResolvConf`.
pub fn from_parsed(parsed: &resolv_conf::Config) -> ResolveResult<ResolvConf> {
    let mut conf = ResolvConf::default();

    for ip in &parsed.nameservers {
        let addr: IpAddr = match *ip {
            resolv_conf::ScopedIp::V4(v4) => IpAddr::V4(v4),
            resolv_conf::ScopedIp::V6(v6, _) => IpAddr::V6(v6),
        };
        conf.add_nameserver(SocketAddr::new(addr, 53));
    }

    for domain in parsed.get_search().into_iter().flatten() {
        let name = Name::from_str(domain).map_err(ResolveError::from)?;
        conf.add_search(&name);
    }

    conf.options.ndots = parsed.ndots;
    conf.options.timeout = Duration::from_secs(u64::from(parsed.timeout));
    conf.options.attempts = parsed.attempts;
    conf.options.rotate = parsed.rotate;
    conf.options.edns0 = parsed.edns0;

    Ok(conf)
}

/// Parses resolv.conf text and maps it.
pub fn parse(data: &[u8]) -> ResolveResult<ResolvConf> {
    let parsed = resolv_conf::Config::parse(data)
        .map_err(|e| ResolveError::from(format!("error parsing resolv.conf: {:?}", e)))?;
    from_parsed(&parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nameservers_and_search_are_mapped() {
        let conf = parse(
            b"nameserver 192.0.2.1\n\
              nameserver 2001:db8::1\n\
              search example.com example.net\n\
              options ndots:2 timeout:3 attempts:4 rotate\n",
        ).unwrap();

        assert_eq!(conf.nameservers().len(), 2);
        assert_eq!(conf.nameservers()[0], "192.0.2.1:53".parse().unwrap());
        assert_eq!(conf.search().len(), 2);
        assert_eq!(conf.search()[0].as_str(), "example.com.");
        assert_eq!(conf.options.ndots, 2);
        assert_eq!(conf.options.timeout, Duration::from_secs(3));
        assert_eq!(conf.options.attempts, 4);
        assert!(conf.options.rotate);
    }
}
