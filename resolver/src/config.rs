// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Configuration for a resolver

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use proto::rr::Name;

/// Most nameservers a configuration will hold, as resolv.conf caps it.
pub const MAX_NAMESERVERS: usize = 3;

/// Most search-list entries a configuration will hold.
pub const MAX_SEARCH: usize = 4;

/// One source consulted during a lookup, in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// The network, through the configured nameservers or iteration.
    Bind,
    /// The local hosts table.
    File,
}

/// Options mirroring the resolv.conf option set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOpts {
    /// Dots needed in a query name before it is tried as-is ahead of
    /// the search list. Defaults to 1.
    pub ndots: u32,
    /// How long one server may take before the engine rotates to the
    /// next candidate. Defaults to 5 seconds.
    pub timeout: Duration,
    /// Passes over the candidate servers before giving up. Defaults
    /// to 2.
    pub attempts: u32,
    /// When set, the engine iterates from its hints itself and sends
    /// queries with RD clear; when unset it is a stub asking the
    /// configured servers to recurse.
    pub recurse: bool,
    /// Resolve the hosts named by NS/MX/SRV answers to addresses and
    /// attach them to the additional section.
    pub smart: bool,
    /// Give the configured nameservers equal priority so load spreads
    /// across them, instead of always preferring the first.
    pub rotate: bool,
    /// Advertise EDNS0. Stored for completeness; the engine sends
    /// plain queries.
    pub edns0: bool,
    /// Destination port for nameserver queries. The well-known 53
    /// unless a test harness says otherwise.
    pub port: u16,
}

impl Default for ResolverOpts {
    /// Defaults follow resolv.conf(5).
    fn default() -> Self {
        ResolverOpts {
            ndots: 1,
            timeout: Duration::from_secs(5),
            attempts: 2,
            recurse: false,
            smart: false,
            rotate: false,
            edns0: false,
            port: 53,
        }
    }
}

/// A resolver configuration: where to ask and how to expand names.
///
/// This is the *output* of configuration parsing; feed it by hand, or
/// through `system_conf` from a parsed `/etc/resolv.conf`. Once shared
/// behind an `Arc` it is immutable.
#[derive(Debug, Clone)]
pub struct ResolvConf {
    nameservers: Vec<SocketAddr>,
    search: Vec<Name>,
    lookup: Vec<LookupSource>,
    /// The option set.
    pub options: ResolverOpts,
    /// Local address outgoing sockets bind to.
    pub interface: SocketAddr,
}

impl Default for ResolvConf {
    /// An empty configuration: no servers, no search list, lookup
    /// order bind-then-file, wildcard interface.
    fn default() -> Self {
        ResolvConf {
            nameservers: Vec::new(),
            search: Vec::new(),
            lookup: vec![LookupSource::Bind, LookupSource::File],
            options: ResolverOpts::default(),
            interface: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 0),
        }
    }
}

impl ResolvConf {
    /// A configuration for full recursive iteration: no stub servers
    /// needed, `recurse` and `smart` on.
    pub fn recursive() -> Self {
        let mut conf = ResolvConf::default();
        conf.options.recurse = true;
        conf.options.smart = true;
        conf
    }

    /// Adds a nameserver, up to `MAX_NAMESERVERS`; extras are ignored
    /// the way libc ignores a fourth `nameserver` line.
    pub fn add_nameserver(&mut self, addr: SocketAddr) {
        if self.nameservers.len() < MAX_NAMESERVERS {
            self.nameservers.push(addr);
        }
    }

    /// The configured nameservers.
    pub fn nameservers(&self) -> &[SocketAddr] {
        &self.nameservers
    }

    /// Adds a search-list entry, anchored, up to `MAX_SEARCH`.
    pub fn add_search(&mut self, domain: &Name) {
        if self.search.len() < MAX_SEARCH && !domain.is_empty() {
            self.search.push(domain.anchor());
        }
    }

    /// The search list, each entry anchored.
    pub fn search(&self) -> &[Name] {
        &self.search
    }

    /// Replaces the lookup order, e.g. file-then-bind.
    pub fn set_lookup(&mut self, order: &[LookupSource]) {
        self.lookup = order.to_vec();
    }

    /// The sources consulted for a lookup, in order.
    pub fn lookup(&self) -> &[LookupSource] {
        &self.lookup
    }
}

/// The restartable search-list generator.
///
/// Produces the candidate fqdns for a query name, per resolv.conf
/// semantics: names with at least `ndots` dots are tried as-is first,
/// then suffixed with each search-list entry, and names below the
/// threshold are tried as-is last. The whole state is three small
/// counters, so a generator can be parked in a suspended resolver and
/// resumed for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchIter {
    step: u8,
    srchi: u8,
    dots: u8,
}

impl SearchIter {
    /// Back to the first candidate.
    pub fn reset(&mut self) {
        *self = SearchIter::default();
    }

    /// The next candidate fqdn, always anchored.
    pub fn next(&mut self, qname: &Name, conf: &ResolvConf) -> Option<Name> {
        loop {
            match self.step {
                0 => {
                    let dots = qname.dots();
                    self.dots = if dots > 0xff { 0xff } else { dots as u8 };
                    self.step = 1;

                    if u32::from(self.dots) >= conf.options.ndots {
                        return Some(qname.anchor());
                    }
                }
                1 => {
                    let index = self.srchi as usize;
                    if index < conf.search().len() {
                        self.srchi += 1;
                        return Some(qname.append_domain(&conf.search()[index]));
                    }

                    self.step = 2;
                }
                2 => {
                    self.step = 3;

                    if u32::from(self.dots) < conf.options.ndots {
                        return Some(qname.anchor());
                    }
                }
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn conf_with_search() -> ResolvConf {
        let mut conf = ResolvConf::default();
        conf.add_search(&Name::from_str("example.com").unwrap());
        conf
    }

    fn candidates(qname: &str, conf: &ResolvConf) -> Vec<String> {
        let qname = Name::from_str(qname).unwrap();
        let mut iter = SearchIter::default();
        let mut out = Vec::new();
        while let Some(candidate) = iter.next(&qname, conf) {
            out.push(candidate.as_str().to_string());
        }
        out
    }

    #[test]
    fn short_names_try_the_search_list_first() {
        let conf = conf_with_search();
        assert_eq!(candidates("www", &conf), vec!["www.example.com.", "www."]);
    }

    #[test]
    fn dotted_names_are_tried_as_is_first() {
        let conf = conf_with_search();
        assert_eq!(
            candidates("a.b", &conf),
            vec!["a.b.", "a.b.example.com."]
        );
    }

    #[test]
    fn ndots_moves_the_threshold() {
        let mut conf = conf_with_search();
        conf.options.ndots = 2;
        assert_eq!(
            candidates("a.b", &conf),
            vec!["a.b.example.com.", "a.b."]
        );
    }

    #[test]
    fn generator_is_resumable() {
        let conf = conf_with_search();
        let qname = Name::from_str("www").unwrap();

        let mut iter = SearchIter::default();
        let first = iter.next(&qname, &conf).unwrap();

        // the counters are plain data; a copy resumes where it left off
        let mut copy = iter;
        assert_eq!(first.as_str(), "www.example.com.");
        assert_eq!(copy.next(&qname, &conf).unwrap().as_str(), "www.");
        assert!(copy.next(&qname, &conf).is_none());
    }

    #[test]
    fn caps_are_enforced() {
        let mut conf = ResolvConf::default();
        for i in 0..5 {
            conf.add_nameserver(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, i as u8)),
                53,
            ));
            conf.add_search(&Name::from_str(&format!("zone{}.example", i)).unwrap());
        }
        assert_eq!(conf.nameservers().len(), MAX_NAMESERVERS);
        assert_eq!(conf.search().len(), MAX_SEARCH);
    }
}
