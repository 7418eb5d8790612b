// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! mail exchange, email, record

use std::cmp::Ordering;
use std::fmt;

use error::*;
use op::Packet;
use rr::record::Span;
use rr::Name;
use serialize::binary::BinDecoder;

/// [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
///
/// ```text
/// 3.3.9. MX RDATA format
///
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                  PREFERENCE                   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                   EXCHANGE                    /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///
/// MX records cause type A additional section processing for the host
/// specified by EXCHANGE.
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MX {
    /// Weight of this exchange against others of the same owner; lower
    /// values are preferred.
    pub preference: u16,
    /// The host willing to act as a mail exchange.
    pub exchange: Name,
}

impl MX {
    /// Constructs a new MX RData
    pub fn new(preference: u16, exchange: Name) -> MX {
        MX {
            preference: preference,
            exchange: exchange,
        }
    }
}

/// Read the RData at `rd`.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<MX> {
    if rd.len < 3 {
        return Err(ProtoErrorKind::Illegal("short MX rdata").into());
    }

    let mut decoder = BinDecoder::new(packet.wire()).clone_at(rd.p);
    let preference = decoder.read_u16()?;
    let exchange = Name::expand(packet, rd.p + 2)?;

    Ok(MX::new(preference, exchange))
}

/// Write the preference and the exchange name (compressed), RDLENGTH
/// included.
pub fn emit(packet: &mut Packet, mx: &MX) -> ProtoResult<()> {
    let place = packet.place_u16()?;
    packet.emit_u16(mx.preference)?;
    packet.push_name(&mx.exchange)?;
    let len = packet.len() - place - 2;
    packet.patch_u16(place, len as u16);
    Ok(())
}

/// Preference first, then exchange, case-insensitively.
pub fn cmp(a: &MX, b: &MX) -> Ordering {
    let by_preference = a.preference.cmp(&b.preference);
    if by_preference != Ordering::Equal {
        return by_preference;
    }

    a.exchange.cmp(&b.exchange)
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}
