// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! IPv6 address record data, RFC 3596

use std::net::Ipv6Addr;
use std::str::FromStr;

use error::*;
use op::Packet;
use rr::record::Span;
use rr::Name;

/// Read the AAAA record data from its 16 octets.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<Ipv6Addr> {
    if rd.len != 16 {
        return Err(ProtoErrorKind::Illegal("AAAA rdata is not 16 octets").into());
    }

    let bytes = &packet.wire()[rd.p..rd.p + 16];
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ok(Ipv6Addr::from(octets))
}

/// Write the address, RDLENGTH included.
pub fn emit(packet: &mut Packet, addr: &Ipv6Addr) -> ProtoResult<()> {
    packet.emit_u16(16)?;
    packet.emit_slice(&addr.octets())
}

/// The `ip6.arpa.` name under which this address answers `PTR`
/// questions: every nibble reversed.
pub fn arpa(addr: &Ipv6Addr) -> Name {
    let mut out = String::with_capacity(74);
    for byte in addr.octets().iter().rev() {
        out.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
    }
    out.push_str("ip6.arpa.");
    Name::from_str(&out).expect("arpa names are never empty")
}
