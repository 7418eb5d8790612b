// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Resource records as offset views into a packet.

use std::cmp::Ordering;

use error::*;
use op::packet::{Packet, HEADER_LEN};
use rr::dns_class::DnsClass;
use rr::name::{self, Name};
use rr::record_data::RData;
use rr::record_type::RecordType;
use rr::section::Section;

/// A byte range inside a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the first byte.
    pub p: usize,
    /// Length in bytes.
    pub len: usize,
}

/// One resource record, located by offsets rather than copied out.
///
/// A record parsed at offset 12 is the question and carries neither ttl
/// nor rdata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rr {
    /// The owner name.
    pub name: Span,
    /// The record type.
    pub rr_type: RecordType,
    /// The record class.
    pub dns_class: DnsClass,
    /// Time to live, top bit always clear.
    pub ttl: u32,
    /// The record data.
    pub rdata: Span,
    /// The section the record sits in.
    pub section: Section,
}

struct RawRr {
    name: Span,
    rr_type: RecordType,
    dns_class: DnsClass,
    ttl: u32,
    rdata: Span,
    next: usize,
}

fn parse_parts(packet: &Packet, src: usize) -> ProtoResult<RawRr> {
    let data = packet.wire();
    let end = packet.len();

    if src >= end {
        return Err(ProtoErrorKind::Illegal("record offset past packet end").into());
    }

    let name_end = name::skip_name(data, end, src)?;
    let name = Span {
        p: src,
        len: name_end - src,
    };

    let mut p = name_end;
    if end - p < 4 {
        return Err(ProtoErrorKind::Illegal("truncated record").into());
    }

    let rr_type = RecordType::from(((data[p] as u16) << 8) | data[p + 1] as u16);
    let dns_class = DnsClass::from(((data[p + 2] as u16) << 8) | data[p + 3] as u16);
    p += 4;

    if src == HEADER_LEN {
        // the question: no ttl, no rdata
        return Ok(RawRr {
            name: name,
            rr_type: rr_type,
            dns_class: dns_class,
            ttl: 0,
            rdata: Span { p: 0, len: 0 },
            next: p,
        });
    }

    if end - p < 6 {
        return Err(ProtoErrorKind::Illegal("truncated record").into());
    }

    let ttl = (((0x7f & data[p]) as u32) << 24)
        | ((data[p + 1] as u32) << 16)
        | ((data[p + 2] as u32) << 8)
        | data[p + 3] as u32;
    p += 4;

    let rd_len = (((data[p] as u16) << 8) | data[p + 1] as u16) as usize;
    p += 2;

    if end - p < rd_len {
        return Err(ProtoErrorKind::Illegal("rdata runs off the packet").into());
    }

    Ok(RawRr {
        name: name,
        rr_type: rr_type,
        dns_class: dns_class,
        ttl: ttl,
        rdata: Span { p: p, len: rd_len },
        next: p + rd_len,
    })
}

impl Rr {
    /// Parses the record at `src`, classifying its section from its
    /// position relative to the header counts.
    pub fn parse(packet: &Packet, src: usize) -> ProtoResult<Rr> {
        let raw = parse_parts(packet, src)?;

        Ok(Rr {
            name: raw.name,
            rr_type: raw.rr_type,
            dns_class: raw.dns_class,
            ttl: raw.ttl,
            rdata: raw.rdata,
            section: if src == HEADER_LEN {
                Section::Question
            } else {
                packet.section_of(src)
            },
        })
    }

    /// The offset just past the record at `src`; the packet end if the
    /// record is malformed.
    pub fn skip(packet: &Packet, src: usize) -> usize {
        match parse_parts(packet, src) {
            Ok(raw) => raw.next,
            Err(_) => packet.len(),
        }
    }

    /// The owner name, expanded.
    pub fn name(&self, packet: &Packet) -> ProtoResult<Name> {
        Name::expand(packet, self.name.p)
    }

    /// The record data, parsed into its typed form.
    pub fn rdata(&self, packet: &Packet) -> ProtoResult<RData> {
        RData::read(packet, self.rr_type, self.rdata)
    }

    /// Expands this record out of `src` and pushes it into `dst` under
    /// `section`, re-encoding the owner name and rdata against the
    /// destination's compression dictionary.
    pub fn copy_to(&self, src: &Packet, dst: &mut Packet, section: Section) -> ProtoResult<()> {
        let name = self.name(src)?;

        if self.section == Section::Question {
            return dst.push_question(&name, self.rr_type, self.dns_class);
        }

        let rdata = self.rdata(src)?;
        dst.push(section, &name, self.rr_type, self.dns_class, self.ttl, &rdata)
    }

    /// Total order over `(type, class, owner name, rdata)`; the owner
    /// name compares case-insensitively and the rdata in canonical
    /// form. Records that cannot be parsed sort as in the original
    /// implementation: before whatever they were compared against.
    pub fn canonical_cmp(a: &Rr, pa: &Packet, b: &Rr, pb: &Packet) -> Ordering {
        let cmp = u16::from(a.rr_type).cmp(&u16::from(b.rr_type));
        if cmp != Ordering::Equal {
            return cmp;
        }

        let cmp = u16::from(a.dns_class).cmp(&u16::from(b.dns_class));
        if cmp != Ordering::Equal {
            return cmp;
        }

        let host_a = match a.name(pa) {
            Ok(name) => name,
            Err(_) => return Ordering::Less,
        };
        let host_b = match b.name(pb) {
            Ok(name) => name,
            Err(_) => return Ordering::Greater,
        };
        let cmp = host_a.cmp(&host_b);
        if cmp != Ordering::Equal {
            return cmp;
        }

        if a.section == Section::Question || b.section == Section::Question {
            return a.section.cmp(&b.section);
        }

        let rd_a = match a.rdata(pa) {
            Ok(rdata) => rdata,
            Err(_) => return Ordering::Less,
        };
        let rd_b = match b.rdata(pb) {
            Ok(rdata) => rdata,
            Err(_) => return Ordering::Greater,
        };
        rd_a.canonical_cmp(&rd_b)
    }

    /// Renders the record as one zone-file-style line, for logs.
    pub fn display(&self, packet: &Packet) -> String {
        let name = match self.name(packet) {
            Ok(name) => name.to_string(),
            Err(_) => "<bad name>".to_string(),
        };

        if self.section == Section::Question {
            return format!("{} {} {}", name, self.dns_class, self.rr_type);
        }

        match self.rdata(packet) {
            Ok(rdata) => format!(
                "{} {} {} {} {}",
                name, self.ttl, self.dns_class, self.rr_type, rdata
            ),
            Err(_) => format!(
                "{} {} {} {} <bad rdata>",
                name, self.ttl, self.dns_class, self.rr_type
            ),
        }
    }

    /// True if a record equal to `self` (same section, type and
    /// canonical form) already sits in `other`.
    pub fn exists_in(&self, packet: &Packet, other: &Packet) -> bool {
        let mut off = HEADER_LEN;
        while off < other.len() {
            if let Ok(rr) = Rr::parse(other, off) {
                if rr.section == self.section && rr.rr_type == self.rr_type
                    && Rr::canonical_cmp(self, packet, &rr, other) == Ordering::Equal
                {
                    return true;
                }
            }

            let next = Rr::skip(other, off);
            if next <= off {
                break;
            }
            off = next;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn sample() -> Packet {
        let mut packet = Packet::new(512);
        let name = Name::from_str("www.example.com.").unwrap();
        packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap();
        packet
            .push(
                Section::Answer,
                &name,
                RecordType::A,
                DnsClass::IN,
                300,
                &RData::A(Ipv4Addr::new(192, 0, 2, 7)),
            )
            .unwrap();
        packet
    }

    #[test]
    fn parse_mirrors_push() {
        let packet = sample();

        let question = Rr::parse(&packet, HEADER_LEN).unwrap();
        assert_eq!(question.section, Section::Question);
        assert_eq!(question.rr_type, RecordType::A);
        assert_eq!(question.rdata.len, 0);

        let off = Rr::skip(&packet, HEADER_LEN);
        let answer = Rr::parse(&packet, off).unwrap();
        assert_eq!(answer.section, Section::Answer);
        assert_eq!(answer.ttl, 300);
        assert_eq!(
            answer.rdata(&packet).unwrap(),
            RData::A(Ipv4Addr::new(192, 0, 2, 7))
        );
        assert_eq!(
            answer.name(&packet).unwrap(),
            Name::from_str("www.example.com.").unwrap()
        );
    }

    #[test]
    fn copy_preserves_canonical_form() {
        let packet = sample();
        let off = Rr::skip(&packet, HEADER_LEN);
        let answer = Rr::parse(&packet, off).unwrap();

        let mut dst = Packet::new(512);
        dst.push_question(
            &Name::from_str("www.example.com.").unwrap(),
            RecordType::A,
            DnsClass::IN,
        ).unwrap();
        answer.copy_to(&packet, &mut dst, Section::Additional).unwrap();

        assert_eq!(dst.count(Section::Additional), 1);
        let copied_off = Rr::skip(&dst, HEADER_LEN);
        let copied = Rr::parse(&dst, copied_off).unwrap();
        assert_eq!(
            Rr::canonical_cmp(&answer, &packet, &copied, &dst),
            Ordering::Equal
        );
        assert!(answer.exists_in(&packet, &dst) == false); // sections differ
        let mut relabeled = answer;
        relabeled.section = Section::Additional;
        assert!(relabeled.exists_in(&packet, &dst));
    }
}
