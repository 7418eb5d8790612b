// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Filtered, ordered iteration over the records of a packet.
//!
//! The iterator never materializes the record set: each step scans the
//! packet for the smallest record (under the configured order) that is
//! strictly greater than the last one emitted. That keeps the cursor a
//! single offset, restartable across suspensions, at the cost of a scan
//! per step, which for DNS-sized packets is cheap.

use std::cmp::Ordering;

use op::packet::{Packet, HEADER_LEN};
use rr::record::Rr;
use rr::record_data::RData;
use rr::record_type::RecordType;
use rr::section::{Section, SectionSet};
use rr::DnsClass;
use rr::Name;
use xfer::permutor::shuffle8;

/// Which records an iterator visits.
#[derive(Debug, Clone, Default)]
pub struct RrFilter {
    /// Restrict to these sections; `None` visits all of them.
    pub sections: Option<SectionSet>,
    /// Restrict to this type; `ANY` matches everything.
    pub rr_type: Option<RecordType>,
    /// Restrict to this class; `ANY` matches everything.
    pub dns_class: Option<DnsClass>,
    /// Restrict to records owned by this name, case-insensitively.
    pub name: Option<Name>,
    /// Restrict to records whose data equals this, canonically. Only
    /// applied together with a type restriction, and never to the
    /// question.
    pub rdata: Option<RData>,
}

impl RrFilter {
    /// An unrestricted filter.
    pub fn new() -> RrFilter {
        RrFilter::default()
    }

    /// Restrict to a section set.
    pub fn sections<S: Into<SectionSet>>(mut self, sections: S) -> Self {
        self.sections = Some(sections.into());
        self
    }

    /// Restrict to a record type.
    pub fn rr_type(mut self, rr_type: RecordType) -> Self {
        self.rr_type = Some(rr_type);
        self
    }

    /// Restrict to a class.
    pub fn dns_class(mut self, dns_class: DnsClass) -> Self {
        self.dns_class = Some(dns_class);
        self
    }

    /// Restrict to an owner name.
    pub fn name(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    /// Restrict to matching record data.
    pub fn rdata(mut self, rdata: RData) -> Self {
        self.rdata = Some(rdata);
        self
    }
}

/// The order an iterator emits records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Wire order, as the packet lays them out.
    Packet,
    /// Canonical order over `(section, type, name, rdata)`. Records
    /// that compare equal are emitted once.
    Canonical,
    /// Wire positions shuffled under the iterator's seed, for rrset
    /// load balancing.
    Shuffle,
    /// Nameserver preference order: `NS` records whose host has an A
    /// record in the same packet come first, original glue (written
    /// before the iterator's boundary) before glue added later, ties
    /// shuffled under the seed.
    GluedNameServer,
}

#[derive(Debug, Clone, Copy)]
enum Pos {
    Start,
    At(usize),
    Done,
}

/// A restartable ordered cursor over a packet's records.
#[derive(Debug, Clone)]
pub struct RrIter {
    /// The records to visit.
    pub filter: RrFilter,
    sort: SortBy,
    seed: u32,
    boundary: usize,
    pos: Pos,
    count: usize,
    saved: (Pos, usize),
}

impl Default for RrIter {
    fn default() -> RrIter {
        RrIter::new(RrFilter::new())
    }
}

impl RrIter {
    /// An iterator in packet order.
    pub fn new(filter: RrFilter) -> RrIter {
        RrIter {
            filter: filter,
            sort: SortBy::Packet,
            seed: 0,
            boundary: 0,
            pos: Pos::Start,
            count: 0,
            saved: (Pos::Start, 0),
        }
    }

    /// Selects the emission order. The seed breaks ties for the
    /// shuffling orders and must not be zero there; it is held stable
    /// for the iterator's lifetime so one iteration sees one order.
    pub fn sorted(mut self, sort: SortBy, seed: u32) -> Self {
        self.sort = sort;
        self.seed = if seed == 0 { 1 } else { seed };
        self
    }

    /// Marks the packet length that separates original records from
    /// ones appended during iteration; `GluedNameServer` prefers glue
    /// below the boundary.
    pub fn boundary(mut self, boundary: usize) -> Self {
        self.boundary = boundary;
        self
    }

    /// How many records this iterator has emitted.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Remembers the cursor, for `rewind`.
    pub fn save(&mut self) {
        self.saved = (self.pos, self.count);
    }

    /// Returns the cursor to the last `save`, so the next step
    /// re-evaluates the order, e.g. after new glue was attached.
    pub fn rewind(&mut self) {
        self.pos = self.saved.0;
        self.count = self.saved.1;
    }

    /// The next matching record, or `None` once the packet is
    /// exhausted.
    pub fn next(&mut self, packet: &Packet) -> Option<Rr> {
        let found = match self.pos {
            Pos::Done => return None,
            Pos::Start => self.scan_min(packet),
            Pos::At(prev) => self.scan_next(packet, prev),
        };

        match found {
            None => {
                self.pos = Pos::Done;
                None
            }
            Some(off) => {
                self.pos = Pos::At(off);
                self.count += 1;
                Rr::parse(packet, off).ok()
            }
        }
    }

    fn matches(&self, rr: &Rr, packet: &Packet) -> bool {
        if let Some(sections) = self.filter.sections {
            if !sections.contains(rr.section) {
                return false;
            }
        }

        if let Some(rr_type) = self.filter.rr_type {
            if rr_type != RecordType::ANY && rr.rr_type != rr_type {
                return false;
            }
        }

        if let Some(dns_class) = self.filter.dns_class {
            if dns_class != DnsClass::ANY && rr.dns_class != dns_class {
                return false;
            }
        }

        if let Some(ref name) = self.filter.name {
            match rr.name(packet) {
                Ok(ref owner) if owner == name => {}
                _ => return false,
            }
        }

        if let Some(ref rdata) = self.filter.rdata {
            if self.filter.rr_type.is_some() && rr.section != Section::Question {
                match rr.rdata(packet) {
                    Ok(ref parsed) if parsed.canonical_cmp(rdata) == Ordering::Equal => {}
                    _ => return false,
                }
            }
        }

        true
    }

    /// The smallest matching record under the configured order.
    fn scan_min(&self, packet: &Packet) -> Option<usize> {
        let mut best: Option<Rr> = None;

        self.for_each_match(packet, |rr, iter| {
            let replace = match best {
                None => true,
                Some(ref b) => iter.cmp_rr(&rr, b, packet) == Ordering::Less,
            };
            if replace {
                best = Some(rr);
            }
        });

        best.map(|rr| rr.name.p)
    }

    /// The smallest matching record strictly greater than the one at
    /// `cur`.
    fn scan_next(&self, packet: &Packet, cur: usize) -> Option<usize> {
        let r0 = match Rr::parse(packet, cur) {
            Ok(rr) => rr,
            Err(_) => return None,
        };

        let mut best: Option<Rr> = None;
        self.for_each_match(packet, |rr, iter| {
            if iter.cmp_rr(&rr, &r0, packet) != Ordering::Greater {
                return;
            }

            let replace = match best {
                None => true,
                Some(ref b) => iter.cmp_rr(&rr, b, packet) == Ordering::Less,
            };
            if replace {
                best = Some(rr);
            }
        });

        best.map(|rr| rr.name.p)
    }

    fn for_each_match<F: FnMut(Rr, &RrIter)>(&self, packet: &Packet, mut visit: F) {
        let mut off = HEADER_LEN;
        while off < packet.len() {
            if let Ok(rr) = Rr::parse(packet, off) {
                if self.matches(&rr, packet) {
                    visit(rr, self);
                }
            }

            let next = Rr::skip(packet, off);
            if next <= off {
                break;
            }
            off = next;
        }
    }

    fn cmp_rr(&self, a: &Rr, b: &Rr, packet: &Packet) -> Ordering {
        match self.sort {
            SortBy::Packet => a.name.p.cmp(&b.name.p),
            SortBy::Canonical => {
                let by_section = a.section.cmp(&b.section);
                if by_section != Ordering::Equal {
                    return by_section;
                }
                if a.rr_type != b.rr_type {
                    return a.name.p.cmp(&b.name.p);
                }
                Rr::canonical_cmp(a, packet, b, packet)
            }
            SortBy::Shuffle => {
                let by_section = a.section.cmp(&b.section);
                if by_section != Ordering::Equal {
                    return by_section;
                }
                shuffle8(a.name.p as u16, self.seed).cmp(&shuffle8(b.name.p as u16, self.seed))
            }
            SortBy::GluedNameServer => {
                let glue_a = self.glue_of(a, packet);
                let glue_b = self.glue_of(b, packet);

                // glued nameservers first
                let by_glued = glue_b.is_some().cmp(&glue_a.is_some());
                if by_glued != Ordering::Equal {
                    return by_glued;
                }

                // then glue the server volunteered over glue we added
                let original_a = glue_a.unwrap_or(0) < self.boundary;
                let original_b = glue_b.unwrap_or(0) < self.boundary;
                let by_original = original_b.cmp(&original_a);
                if by_original != Ordering::Equal {
                    return by_original;
                }

                shuffle8(a.name.p as u16, self.seed).cmp(&shuffle8(b.name.p as u16, self.seed))
            }
        }
    }

    /// The offset of the first A record gluing `rr`'s nameserver host,
    /// if any. Only IPv4 glue is considered during iteration.
    fn glue_of(&self, rr: &Rr, packet: &Packet) -> Option<usize> {
        let host = match rr.rdata(packet) {
            Ok(RData::NS(host)) => host,
            _ => return None,
        };

        let mut off = HEADER_LEN;
        while off < packet.len() {
            if let Ok(candidate) = Rr::parse(packet, off) {
                if candidate.section != Section::Question
                    && candidate.rr_type == RecordType::A
                {
                    if let Ok(owner) = candidate.name(packet) {
                        if owner == host {
                            return Some(off);
                        }
                    }
                }
            }

            let next = Rr::skip(packet, off);
            if next <= off {
                break;
            }
            off = next;
        }

        None
    }
}
