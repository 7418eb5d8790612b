// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! record data enum variants

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use error::*;
use op::Packet;
use rr::rdata;
use rr::rdata::{MX, SOA, SRV, TXT};
use rr::record::Span;
use rr::record_type::RecordType;
use rr::Name;

/// Typed record data.
///
/// Each variant knows how to parse itself out of a packet, push itself
/// (with name compression where the type calls for it), compare itself
/// canonically, and print itself; types this library does not interpret
/// are preserved byte-for-byte as `Opaque`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RData {
    /// IPv4 address
    A(Ipv4Addr),
    /// IPv6 address
    AAAA(Ipv6Addr),
    /// Canonical name
    CNAME(Name),
    /// Mail exchange
    MX(MX),
    /// Authoritative name server
    NS(Name),
    /// Domain name pointer, for reverse lookups
    PTR(Name),
    /// Start of authority
    SOA(SOA),
    /// Service locator
    SRV(SRV),
    /// Descriptive text
    TXT(TXT),
    /// Anything else, uninterpreted
    Opaque(Vec<u8>),
}

impl RData {
    /// Parses the rdata at `rd` according to `record_type`.
    pub fn read(packet: &Packet, record_type: RecordType, rd: Span) -> ProtoResult<RData> {
        match record_type {
            RecordType::A => Ok(RData::A(rdata::a::read(packet, rd)?)),
            RecordType::AAAA => Ok(RData::AAAA(rdata::aaaa::read(packet, rd)?)),
            RecordType::CNAME => Ok(RData::CNAME(rdata::name::read(packet, rd)?)),
            RecordType::MX => Ok(RData::MX(rdata::mx::read(packet, rd)?)),
            RecordType::NS => Ok(RData::NS(rdata::name::read(packet, rd)?)),
            RecordType::PTR => Ok(RData::PTR(rdata::name::read(packet, rd)?)),
            RecordType::SOA => Ok(RData::SOA(rdata::soa::read(packet, rd)?)),
            RecordType::SRV => Ok(RData::SRV(rdata::srv::read(packet, rd)?)),
            RecordType::TXT => Ok(RData::TXT(rdata::txt::read(packet, rd)?)),
            _ => Ok(RData::Opaque(rdata::opaque::read(packet, rd)?)),
        }
    }

    /// Writes RDLENGTH and the rdata at the packet's end cursor.
    pub(crate) fn emit(&self, packet: &mut Packet) -> ProtoResult<()> {
        match *self {
            RData::A(ref addr) => rdata::a::emit(packet, addr),
            RData::AAAA(ref addr) => rdata::aaaa::emit(packet, addr),
            RData::CNAME(ref name) => rdata::name::emit(packet, name),
            RData::MX(ref mx) => rdata::mx::emit(packet, mx),
            RData::NS(ref name) => rdata::name::emit(packet, name),
            RData::PTR(ref name) => rdata::name::emit(packet, name),
            RData::SOA(ref soa) => rdata::soa::emit(packet, soa),
            RData::SRV(ref srv) => rdata::srv::emit(packet, srv),
            RData::TXT(ref txt) => rdata::txt::emit(packet, txt),
            RData::Opaque(ref bytes) => rdata::opaque::emit(packet, bytes),
        }
    }

    /// The record type this data belongs to. `Opaque` data has lost its
    /// type tag and reports `ANY`.
    pub fn to_record_type(&self) -> RecordType {
        match *self {
            RData::A(..) => RecordType::A,
            RData::AAAA(..) => RecordType::AAAA,
            RData::CNAME(..) => RecordType::CNAME,
            RData::MX(..) => RecordType::MX,
            RData::NS(..) => RecordType::NS,
            RData::PTR(..) => RecordType::PTR,
            RData::SOA(..) => RecordType::SOA,
            RData::SRV(..) => RecordType::SRV,
            RData::TXT(..) => RecordType::TXT,
            RData::Opaque(..) => RecordType::ANY,
        }
    }

    /// Canonical total order: same-type data by its own rules, mixed
    /// types by type code.
    pub fn canonical_cmp(&self, other: &RData) -> Ordering {
        match (self, other) {
            (&RData::A(ref a), &RData::A(ref b)) => a.octets().cmp(&b.octets()),
            (&RData::AAAA(ref a), &RData::AAAA(ref b)) => a.octets().cmp(&b.octets()),
            (&RData::CNAME(ref a), &RData::CNAME(ref b)) => a.cmp(b),
            (&RData::MX(ref a), &RData::MX(ref b)) => rdata::mx::cmp(a, b),
            (&RData::NS(ref a), &RData::NS(ref b)) => a.cmp(b),
            (&RData::PTR(ref a), &RData::PTR(ref b)) => a.cmp(b),
            (&RData::SOA(ref a), &RData::SOA(ref b)) => rdata::soa::cmp(a, b),
            (&RData::SRV(ref a), &RData::SRV(ref b)) => rdata::srv::cmp(a, b),
            (&RData::TXT(ref a), &RData::TXT(ref b)) => rdata::txt::cmp(a, b),
            (&RData::Opaque(ref a), &RData::Opaque(ref b)) => a.cmp(b),
            _ => {
                let a: u16 = self.to_record_type().into();
                let b: u16 = other.to_record_type().into();
                a.cmp(&b)
            }
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RData::A(ref addr) => write!(f, "{}", addr),
            RData::AAAA(ref addr) => write!(f, "{}", addr),
            RData::CNAME(ref name) => write!(f, "{}", name),
            RData::MX(ref mx) => write!(f, "{}", mx),
            RData::NS(ref name) => write!(f, "{}", name),
            RData::PTR(ref name) => write!(f, "{}", name),
            RData::SOA(ref soa) => write!(f, "{}", soa),
            RData::SRV(ref srv) => write!(f, "{}", srv),
            RData::TXT(ref txt) => write!(f, "{}", txt),
            RData::Opaque(ref bytes) => {
                write!(f, "\\# {}", bytes.len())?;
                for byte in bytes {
                    write!(f, " {:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr::record::Rr;
    use rr::section::Section;
    use rr::DnsClass;
    use std::str::FromStr;

    #[test]
    fn unknown_types_are_preserved_opaque() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::Unknown(4242), DnsClass::IN)
            .unwrap();
        packet
            .push(
                Section::Answer,
                &owner,
                RecordType::Unknown(4242),
                DnsClass::IN,
                0,
                &RData::Opaque(vec![0xde, 0xad, 0xbe, 0xef]),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        assert_eq!(rr.rr_type, RecordType::Unknown(4242));
        assert_eq!(
            rr.rdata(&packet).unwrap(),
            RData::Opaque(vec![0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[test]
    fn mixed_types_order_by_type_code() {
        let a = RData::A("192.0.2.1".parse().unwrap());
        let ns = RData::NS(Name::from_str("ns.example.com.").unwrap());
        assert_eq!(a.canonical_cmp(&ns), Ordering::Less);
        assert_eq!(ns.canonical_cmp(&a), Ordering::Greater);
    }
}
