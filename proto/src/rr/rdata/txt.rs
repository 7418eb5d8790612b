// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! text records for storing arbitrary data

use std::cmp::Ordering;
use std::fmt;

use error::*;
use op::Packet;
use rr::record::Span;
use serialize::binary::BinDecoder;

/// [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
///
/// ```text
/// 3.3.14. TXT RDATA format
///
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                   TXT-DATA                    /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///
/// TXT RRs are used to hold descriptive text.  The semantics of the text
/// depends on the domain where it is found.
/// ```
///
/// The rdata is a run of length-prefixed character-strings; this type
/// holds their concatenation, and re-chunks on write.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct TXT {
    /// The concatenated character-string bytes.
    pub data: Vec<u8>,
}

impl TXT {
    /// A TXT record around raw bytes.
    pub fn new<B: Into<Vec<u8>>>(data: B) -> TXT {
        TXT { data: data.into() }
    }
}

/// Read the RData at `rd`, concatenating the character-strings.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<TXT> {
    let mut decoder = BinDecoder::new(&packet.wire()[..rd.p + rd.len]).clone_at(rd.p);
    let mut data = Vec::with_capacity(rd.len);

    while !decoder.is_empty() {
        let len = decoder.read_u8()? as usize;
        data.extend_from_slice(decoder.read_slice(len)?);
    }

    Ok(TXT { data: data })
}

/// Write the data as character-strings of at most 255 octets each,
/// RDLENGTH included.
pub fn emit(packet: &mut Packet, txt: &TXT) -> ProtoResult<()> {
    let place = packet.place_u16()?;

    if txt.data.is_empty() {
        packet.emit_u8(0)?;
    } else {
        for chunk in txt.data.chunks(255) {
            packet.emit_u8(chunk.len() as u8)?;
            packet.emit_slice(chunk)?;
        }
    }

    let len = packet.len() - place - 2;
    packet.patch_u16(place, len as u16);
    Ok(())
}

/// Lexicographic over the concatenated strings. (The original
/// implementation returned "less" unconditionally, which is not a
/// transitive order.)
pub fn cmp(a: &TXT, b: &TXT) -> Ordering {
    a.data.cmp(&b.data)
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", String::from_utf8_lossy(&self.data).escape_debug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr::record::Rr;
    use rr::record_data::RData;
    use rr::section::Section;
    use rr::{DnsClass, Name, RecordType};
    use std::str::FromStr;

    #[test]
    fn txt_round_trips() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::TXT, DnsClass::IN)
            .unwrap();

        let txt = TXT::new(&b"v=spf1 -all"[..]);
        packet
            .push(
                Section::Answer,
                &owner,
                RecordType::TXT,
                DnsClass::IN,
                0,
                &RData::TXT(txt.clone()),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        assert_eq!(rr.rdata.len, 12);
        assert_eq!(rr.rdata(&packet).unwrap(), RData::TXT(txt));
    }

    #[test]
    fn long_data_re_chunks_at_255() {
        let mut packet = Packet::new(512);
        let owner = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&owner, RecordType::TXT, DnsClass::IN)
            .unwrap();

        let txt = TXT::new(vec![b'x'; 300]);
        packet
            .push(
                Section::Answer,
                &owner,
                RecordType::TXT,
                DnsClass::IN,
                0,
                &RData::TXT(txt.clone()),
            )
            .unwrap();

        let off = Rr::skip(&packet, 12);
        let rr = Rr::parse(&packet, off).unwrap();
        // 255 + 45 bytes in two character-strings
        assert_eq!(rr.rdata.len, 302);
        assert_eq!(rr.rdata(&packet).unwrap(), RData::TXT(txt));
    }

    #[test]
    fn comparison_is_transitive() {
        let a = TXT::new(&b"alpha"[..]);
        let b = TXT::new(&b"beta"[..]);
        let c = TXT::new(&b"gamma"[..]);
        assert_eq!(cmp(&a, &b), Ordering::Less);
        assert_eq!(cmp(&b, &c), Ordering::Less);
        assert_eq!(cmp(&a, &c), Ordering::Less);
        assert_eq!(cmp(&b, &a), Ordering::Greater);
    }
}
