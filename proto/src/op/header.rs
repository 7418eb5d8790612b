// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Message metadata, the fixed 12 byte header

use op::op_code::OpCode;
use op::packet::Packet;
use op::response_code::ResponseCode;
use rr::section::Section;

/// Query or response, the QR bit.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum MessageType {
    /// QR = 0
    Query,
    /// QR = 1
    Response,
}

/// A parsed copy of a packet's header, RFC 1035 section 4.1.1.
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Header {
    /// The transaction id.
    pub id: u16,
    /// Query or response.
    pub message_type: MessageType,
    /// The operation code.
    pub op_code: OpCode,
    /// AA bit.
    pub authoritative: bool,
    /// TC bit.
    pub truncated: bool,
    /// RD bit.
    pub recursion_desired: bool,
    /// RA bit.
    pub recursion_available: bool,
    /// The response code.
    pub response_code: ResponseCode,
    /// QDCOUNT.
    pub query_count: u16,
    /// ANCOUNT.
    pub answer_count: u16,
    /// NSCOUNT.
    pub name_server_count: u16,
    /// ARCOUNT.
    pub additional_count: u16,
}

impl Header {
    /// Reads the header fields out of `packet`.
    pub fn read(packet: &Packet) -> Header {
        Header {
            id: packet.id(),
            message_type: if packet.is_response() {
                MessageType::Response
            } else {
                MessageType::Query
            },
            op_code: packet.op_code(),
            authoritative: packet.authoritative(),
            truncated: packet.truncated(),
            recursion_desired: packet.recursion_desired(),
            recursion_available: packet.recursion_available(),
            response_code: packet.response_code(),
            query_count: packet.count(Section::Question),
            answer_count: packet.count(Section::Answer),
            name_server_count: packet.count(Section::Authority),
            additional_count: packet.count(Section::Additional),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use op::packet::Packet;

    #[test]
    fn bit_layout() {
        let mut wire = [0u8; 12];
        wire[0] = 0x01;
        wire[1] = 0x10;
        wire[2] = 0xaa; // QR, opcode 5 (update), TC
        wire[3] = 0x83; // RA, rcode 3
        wire[5] = 1;
        wire[7] = 2;
        wire[9] = 3;
        wire[11] = 4;

        let packet = Packet::from_bytes(&wire).unwrap();
        let header = packet.header();

        assert_eq!(header.id, 0x0110);
        assert_eq!(header.message_type, MessageType::Response);
        assert_eq!(header.op_code, OpCode::Update);
        assert!(!header.authoritative);
        assert!(header.truncated);
        assert!(!header.recursion_desired);
        assert!(header.recursion_available);
        assert_eq!(header.response_code, ResponseCode::NXDomain);
        assert_eq!(header.query_count, 1);
        assert_eq!(header.answer_count, 2);
        assert_eq!(header.name_server_count, 3);
        assert_eq!(header.additional_count, 4);
    }

    #[test]
    fn flag_setters_round_trip() {
        let mut packet = Packet::new(512);
        packet.set_id(0xbeef);
        packet.set_response(true);
        packet.set_recursion_desired(true);
        packet.set_response_code(ResponseCode::ServFail);

        assert_eq!(packet.id(), 0xbeef);
        assert!(packet.is_response());
        assert!(packet.recursion_desired());
        assert_eq!(packet.response_code(), ResponseCode::ServFail);

        packet.set_recursion_desired(false);
        assert!(!packet.recursion_desired());
        assert!(packet.is_response());
    }
}
