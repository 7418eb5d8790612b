// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! record data of a type this library does not interpret
//!
//! The bytes are carried verbatim so unknown types survive copy and
//! merge unchanged, per RFC 3597.

use error::*;
use op::Packet;
use rr::record::Span;

/// Read the raw rdata bytes at `rd`.
pub fn read(packet: &Packet, rd: Span) -> ProtoResult<Vec<u8>> {
    Ok(packet.wire()[rd.p..rd.p + rd.len].to_vec())
}

/// Write the bytes back unchanged, RDLENGTH included.
pub fn emit(packet: &mut Packet, data: &[u8]) -> ProtoResult<()> {
    if data.len() > 0xffff {
        return Err(ProtoErrorKind::NoBufs.into());
    }

    packet.emit_u16(data.len() as u16)?;
    packet.emit_slice(data)
}
