// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Record data that is a bare domain name: NS, CNAME and PTR.
//!
//! All three compress the embedded name against the packet dictionary
//! on push, and expand through compression pointers on parse.

use error::*;
use op::Packet;
use rr::record::Span;
use rr::Name;

/// Expand the domain name held in the rdata.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<Name> {
    if rd.len == 0 {
        return Err(ProtoErrorKind::Illegal("empty name rdata").into());
    }

    Name::expand(packet, rd.p)
}

/// Write the name compressed, RDLENGTH included.
pub fn emit(packet: &mut Packet, name: &Name) -> ProtoResult<()> {
    let place = packet.place_u16()?;
    packet.push_name(name)?;
    let len = packet.len() - place - 2;
    packet.patch_u16(place, len as u16);
    Ok(())
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
    fn embedded_name_is_compressed() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::NS, DnsClass::IN)
            .unwrap();

        // the rdata name shares the owner's suffix entirely
        packet
            .push(
                Section::Answer,
                &owner,
                RecordType::NS,
                DnsClass::IN,
                0,
                &RData::NS(Name::from_str("ns1.example.com.").unwrap()),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        // "ns1" label (4) plus a pointer (2)
        assert_eq!(rr.rdata.len, 6);
        assert_eq!(
            rr.rdata(&packet).unwrap(),
            RData::NS(Name::from_str("ns1.example.com.").unwrap())
        );
    }
}
