// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The hints table: per-zone nameserver address pools.
//!
//! Hints answer the iterator's "where do I ask next" question offline.
//! A zone holds up to sixteen prioritized addresses; iteration visits
//! them lowest priority first, shuffling ties under a per-iteration
//! seed so equal servers share the load. `query` renders the pools for
//! a question into packet form, the shape the delegation walker
//! consumes.

use std::net::SocketAddr;

use rand::RngCore;
use smallvec::SmallVec;

use proto::op::{Packet, Question, QUERY_BUF_SIZE};
use proto::rr::{DnsClass, Name, RData, RecordType, Section};
use proto::xfer::permutor::shuffle8;

use config::ResolvConf;
use error::*;

/// Addresses one zone will hold; inserts beyond this overwrite.
pub const ZONE_ADDRS: usize = 16;

/// The owner name under which hint addresses are emitted as glue.
pub const HINTS_HOST: &'static str = "hints.local.";

#[derive(Debug, Clone, Copy)]
struct HintAddr {
    addr: SocketAddr,
    priority: u32,
}

#[derive(Debug, Clone)]
struct HintsZone {
    zone: Name,
    addrs: SmallVec<[HintAddr; ZONE_ADDRS]>,
    count: usize,
}

/// Per-zone nameserver address pools, keyed case-insensitively by
/// anchored zone name.
#[derive(Debug, Clone, Default)]
pub struct Hints {
    zones: Vec<HintsZone>,
}

/// A restartable cursor over one zone's addresses in priority order,
/// ties broken by the seed.
#[derive(Debug, Clone)]
pub struct HintsIter {
    zone: Name,
    seed: u32,
    pos: HintsPos,
}

#[derive(Debug, Clone, Copy)]
enum HintsPos {
    Start,
    At(usize),
    Done,
}

impl Hints {
    /// An empty table.
    pub fn new() -> Hints {
        Hints::default()
    }

    /// Hints for stub resolution: the configured nameservers installed
    /// under the root zone.
    pub fn local(conf: &ResolvConf) -> Hints {
        let mut hints = Hints::new();
        hints.insert_resconf(&Name::root(), conf);
        hints
    }

    /// Hints for recursive resolution: the root server addresses.
    pub fn root() -> Hints {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

        let root_hints: [IpAddr; 14] = [
            // A.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 0x503, 0xba3e, 0, 0, 0, 0x2, 0x30)),
            // B.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 228, 79, 201)),
            // C.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 33, 4, 12)),
            // D.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(128, 8, 10, 90)),
            // E.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 203, 230, 10)),
            // F.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 5, 5, 241)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 0x500, 0x2f, 0, 0, 0, 0, 0xf)),
            // G.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 112, 36, 4)),
            // H.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(128, 63, 2, 53)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 0x500, 0x1, 0, 0, 0, 0x803f, 0x235)),
            // I.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 36, 148, 17)),
            // J.ROOT-SERVERS.NET.
            IpAddr::V4(Ipv4Addr::new(192, 58, 128, 30)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 0x503, 0xc27, 0, 0, 0, 0x2, 0x30)),
        ];

        let mut hints = Hints::new();
        let root = Name::root();
        for addr in root_hints.iter() {
            hints.insert(&root, SocketAddr::new(*addr, 53), 1);
        }
        hints
    }

    /// Installs or updates an address for `zone`. A full zone wraps
    /// around and overwrites. Priority 0 is promoted to 1.
    pub fn insert(&mut self, zone: &Name, addr: SocketAddr, priority: u32) {
        let entry = HintAddr {
            addr: addr,
            priority: ::std::cmp::max(1, priority),
        };

        let zone = zone.anchor();
        if let Some(soa) = self.zones.iter_mut().find(|z| z.zone == zone) {
            let i = soa.count % ZONE_ADDRS;
            if soa.addrs.len() < ZONE_ADDRS {
                soa.addrs.push(entry);
            } else {
                soa.addrs[i] = entry;
            }
            if soa.count < ZONE_ADDRS {
                soa.count += 1;
            }
            return;
        }

        let mut addrs = SmallVec::new();
        addrs.push(entry);
        self.zones.push(HintsZone {
            zone: zone,
            addrs: addrs,
            count: 1,
        });
    }

    /// Installs the configured nameservers for `zone`. With `rotate`
    /// every server gets equal priority, so iteration order is pure
    /// shuffle; otherwise earlier servers keep winning.
    pub fn insert_resconf(&mut self, zone: &Name, conf: &ResolvConf) -> usize {
        let mut priority = 1;
        let mut installed = 0;

        for addr in conf.nameservers() {
            self.insert(zone, *addr, priority);
            installed += 1;
            if !conf.options.rotate {
                priority += 1;
            }
        }

        installed
    }

    /// Begins an iteration over `zone` under `seed`; a zero seed is
    /// promoted so shuffles never degenerate.
    pub fn iterate(&self, zone: &Name, seed: u32) -> HintsIter {
        HintsIter {
            zone: zone.anchor(),
            seed: if seed == 0 { 1 } else { seed },
            pos: HintsPos::Start,
        }
    }

    /// The next address of the iteration, or `None` when the zone is
    /// exhausted or absent.
    pub fn grep(&self, iter: &mut HintsIter) -> Option<SocketAddr> {
        let soa = self.zones.iter().find(|z| z.zone == iter.zone)?;
        if soa.count == 0 {
            return None;
        }

        let current = match iter.pos {
            HintsPos::Done => return None,
            HintsPos::Start => Self::start(soa, iter.seed),
            HintsPos::At(prev) => match Self::skip(soa, iter.seed, prev) {
                Some(next) => next,
                None => {
                    iter.pos = HintsPos::Done;
                    return None;
                }
            },
        };

        iter.pos = HintsPos::At(current);
        Some(soa.addrs[current].addr)
    }

    fn cmp(soa: &HintsZone, seed: u32, a: usize, b: usize) -> i64 {
        let by_priority =
            i64::from(soa.addrs[a].priority) - i64::from(soa.addrs[b].priority);
        if by_priority != 0 {
            return by_priority;
        }

        i64::from(shuffle8(a as u16, seed)) - i64::from(shuffle8(b as u16, seed))
    }

    fn start(soa: &HintsZone, seed: u32) -> usize {
        let mut p0 = 0;
        for p in 1..soa.count {
            if Self::cmp(soa, seed, p, p0) < 0 {
                p0 = p;
            }
        }
        p0
    }

    fn skip(soa: &HintsZone, seed: u32, p0: usize) -> Option<usize> {
        let mut next: Option<usize> = None;
        for p in 0..soa.count {
            if Self::cmp(soa, seed, p, p0) <= 0 {
                continue;
            }

            next = match next {
                None => Some(p),
                Some(best) if Self::cmp(soa, seed, p, best) < 0 => Some(p),
                keep => keep,
            };
        }
        next
    }

    /// Synthesizes a hints response for `query`: the question echoed,
    /// one `NS hints.local.` record in AUTHORITY, and each address
    /// known for any suffix zone of the question's name as A/AAAA glue
    /// in ADDITIONAL, most specific zone first, priority/shuffle order
    /// within a zone.
    pub fn query(&self, query: &Packet, rng: &mut dyn RngCore) -> ResolveResult<Packet> {
        let question = Question::parse(query)?;

        let mut answer = Packet::new(QUERY_BUF_SIZE);
        answer.set_response(true);
        answer.push_question(&question.name, question.query_type, question.query_class)?;

        let hints_host = Name::from(HINTS_HOST);
        answer.push(
            Section::Authority,
            &Name::root(),
            RecordType::NS,
            DnsClass::IN,
            0,
            &RData::NS(hints_host.clone()),
        )?;

        let mut zone = question.name.anchor();
        loop {
            let mut iter = self.iterate(&zone, rng.next_u32());
            while let Some(addr) = self.grep(&mut iter) {
                let rdata = match addr {
                    SocketAddr::V4(v4) => RData::A(*v4.ip()),
                    SocketAddr::V6(v6) => RData::AAAA(*v6.ip()),
                };
                answer.push(
                    Section::Additional,
                    &hints_host,
                    rdata.to_record_type(),
                    DnsClass::IN,
                    0,
                    &rdata,
                )?;
            }

            match zone.cleave() {
                Some(parent) => zone = parent,
                None => break,
            }
        }

        Ok(answer)
    }
}
