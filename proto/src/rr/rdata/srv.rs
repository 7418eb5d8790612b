// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! service records for identifying port and host for a service

use std::cmp::Ordering;
use std::fmt;

use error::*;
use op::Packet;
use rr::record::Span;
use rr::Name;
use serialize::binary::BinDecoder;

/// [RFC 2782, DNS SRV RR, February 2000](https://tools.ietf.org/html/rfc2782)
///
/// ```text
/// The format of the SRV RR
///
///  _Service._Proto.Name TTL Class SRV Priority Weight Port Target
/// ```
///
/// The target is transmitted uncompressed, as RFC 2782 directs for
/// interoperability with servers that predate rdata compression.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SRV {
    /// Lower priorities are contacted first.
    pub priority: u16,
    /// Relative weight among targets of equal priority.
    pub weight: u16,
    /// The port the service listens on.
    pub port: u16,
    /// The host providing the service.
    pub target: Name,
}

/// Read the RData at `rd`.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<SRV> {
    if rd.len < 7 {
        return Err(ProtoErrorKind::Illegal("short SRV rdata").into());
    }

    let mut decoder = BinDecoder::new(packet.wire()).clone_at(rd.p);
    Ok(SRV {
        priority: decoder.read_u16()?,
        weight: decoder.read_u16()?,
        port: decoder.read_u16()?,
        target: Name::expand(packet, rd.p + 6)?,
    })
}

/// Write the three counters and the target as plain labels, RDLENGTH
/// included. The target is neither compressed nor remembered by the
/// compression dictionary.
pub fn emit(packet: &mut Packet, srv: &SRV) -> ProtoResult<()> {
    let place = packet.place_u16()?;
    packet.emit_u16(srv.priority)?;
    packet.emit_u16(srv.weight)?;
    packet.emit_u16(srv.port)?;
    packet.push_name_uncompressed(&srv.target)?;
    let len = packet.len() - place - 2;
    packet.patch_u16(place, len as u16);
    Ok(())
}

/// Priority, weight, port, then target.
pub fn cmp(a: &SRV, b: &SRV) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.weight.cmp(&b.weight))
        .then_with(|| a.port.cmp(&b.port))
        .then_with(|| a.target.cmp(&b.target))
}

impl fmt::Display for SRV {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
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
    fn srv_target_is_not_compressed() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("_ldap._tcp.example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::SRV, DnsClass::IN)
            .unwrap();

        let srv = SRV {
            priority: 0,
            weight: 5,
            port: 389,
            target: Name::from_str("ldap.example.com.").unwrap(),
        };
        packet
            .push(
                Section::Answer,
                &owner,
                RecordType::SRV,
                DnsClass::IN,
                0,
                &RData::SRV(srv.clone()),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        // 6 counter bytes plus the full 18 byte target name
        assert_eq!(rr.rdata.len, 6 + 18);
        assert_eq!(rr.rdata(&packet).unwrap(), RData::SRV(srv));
    }
}
