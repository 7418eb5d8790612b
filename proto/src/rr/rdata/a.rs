// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! IPv4 address record data
//!
//! [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
//!
//! ```text
//! 3.4.1. A RDATA format
//!
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ADDRESS                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use std::net::Ipv4Addr;
use std::str::FromStr;

use error::*;
use op::Packet;
use rr::record::Span;
use rr::Name;

/// Read the A record data from its 4 octets.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<Ipv4Addr> {
    if rd.len != 4 {
        return Err(ProtoErrorKind::Illegal("A rdata is not 4 octets").into());
    }

    let bytes = &packet.wire()[rd.p..rd.p + 4];
    Ok(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
}

/// Write the address, RDLENGTH included.
pub fn emit(packet: &mut Packet, addr: &Ipv4Addr) -> ProtoResult<()> {
    packet.emit_u16(4)?;
    packet.emit_slice(&addr.octets())
}

/// The `in-addr.arpa.` name under which this address answers `PTR`
/// questions.
pub fn arpa(addr: &Ipv4Addr) -> Name {
    let octets = addr.octets();
    Name::from_str(&format!(
        "{}.{}.{}.{}.in-addr.arpa.",
        octets[3], octets[2], octets[1], octets[0]
    )).expect("arpa names are never empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arpa_reverses_the_octets() {
        assert_eq!(
            arpa(&Ipv4Addr::new(127, 0, 0, 1)).as_str(),
            "1.0.0.127.in-addr.arpa."
        );
    }

    #[test]
    fn read_rejects_bad_lengths() {
        let packet = Packet::new(32);
        assert!(read(&packet, Span { p: 12, len: 3 }).is_err());
    }
}
