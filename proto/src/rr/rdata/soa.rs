// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! start of authority record defining ownership and defaults for the zone

use std::cmp::Ordering;
use std::fmt;

use error::*;
use op::Packet;
use rr::name;
use rr::record::Span;
use rr::Name;
use serialize::binary::BinDecoder;

/// [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
///
/// ```text
/// 3.3.13. SOA RDATA format
///
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                     MNAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                     RNAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    SERIAL                     |
///     |                    REFRESH                    |
///     |                     RETRY                     |
///     |                    EXPIRE                     |
///     |                    MINIMUM                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SOA {
    /// The primary name server for the zone.
    pub mname: Name,
    /// The mailbox of the person responsible for the zone.
    pub rname: Name,
    /// Version number of the zone.
    pub serial: u32,
    /// Seconds before the zone should be refreshed.
    pub refresh: u32,
    /// Seconds before a failed refresh should be retried.
    pub retry: u32,
    /// Upper limit on elapsed time before the zone loses authority.
    pub expire: u32,
    /// Minimum ttl for records exported from the zone.
    pub minimum: u32,
}

/// Read the RData at `rd`.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<SOA> {
    let data = packet.wire();
    let end = packet.len();

    let mname = Name::expand(packet, rd.p)?;
    let after_mname = name::skip_name(data, end, rd.p)?;
    let rname = Name::expand(packet, after_mname)?;
    let after_rname = name::skip_name(data, end, after_mname)?;

    let mut decoder = BinDecoder::new(data).clone_at(after_rname);
    Ok(SOA {
        mname: mname,
        rname: rname,
        serial: decoder.read_u32()?,
        refresh: decoder.read_u32()?,
        retry: decoder.read_u32()?,
        expire: decoder.read_u32()?,
        minimum: decoder.read_u32()?,
    })
}

/// Write both names compressed, then the five counters, RDLENGTH
/// included.
pub fn emit(packet: &mut Packet, soa: &SOA) -> ProtoResult<()> {
    let place = packet.place_u16()?;
    packet.push_name(&soa.mname)?;
    packet.push_name(&soa.rname)?;
    packet.emit_u32(soa.serial)?;
    packet.emit_u32(soa.refresh)?;
    packet.emit_u32(soa.retry)?;
    packet.emit_u32(soa.expire)?;
    packet.emit_u32(soa.minimum)?;
    let len = packet.len() - place - 2;
    packet.patch_u16(place, len as u16);
    Ok(())
}

/// Names first, then the counters in wire order.
pub fn cmp(a: &SOA, b: &SOA) -> Ordering {
    a.mname
        .cmp(&b.mname)
        .then_with(|| a.rname.cmp(&b.rname))
        .then_with(|| a.serial.cmp(&b.serial))
        .then_with(|| a.refresh.cmp(&b.refresh))
        .then_with(|| a.retry.cmp(&b.retry))
        .then_with(|| a.expire.cmp(&b.expire))
        .then_with(|| a.minimum.cmp(&b.minimum))
}

impl fmt::Display for SOA {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire,
            self.minimum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr::record::Rr;
    use rr::record_data::RData;
    use rr::section::Section;
    use rr::{DnsClass, RecordType};
    use std::str::FromStr;

    #[test]
    fn soa_round_trips() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::SOA, DnsClass::IN)
            .unwrap();

        let soa = SOA {
            mname: Name::from_str("ns1.example.com.").unwrap(),
            rname: Name::from_str("hostmaster.example.com.").unwrap(),
            serial: 2018010100,
            refresh: 7200,
            retry: 900,
            expire: 1209600,
            minimum: 300,
        };
        packet
            .push(
                Section::Authority,
                &owner,
                RecordType::SOA,
                DnsClass::IN,
                0,
                &RData::SOA(soa.clone()),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        assert_eq!(rr.rdata(&packet).unwrap(), RData::SOA(soa));
    }
}
