// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The question a message asks

use std::fmt;

use error::*;
use op::packet::{Packet, HEADER_LEN, QUERY_BUF_SIZE};
use rr::{DnsClass, Name, RecordType};

/// The question of a message: QNAME, QTYPE and QCLASS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// The name being asked about.
    pub name: Name,
    /// The record type asked for.
    pub query_type: RecordType,
    /// The class asked in, almost always `IN`.
    pub query_class: DnsClass,
}

impl Question {
    /// A question in the internet class.
    pub fn new(name: Name, query_type: RecordType) -> Question {
        Question {
            name: name,
            query_type: query_type,
            query_class: DnsClass::IN,
        }
    }

    /// Parses the first question of `packet`.
    pub fn parse(packet: &Packet) -> ProtoResult<Question> {
        let rr = ::rr::record::Rr::parse(packet, HEADER_LEN)?;

        Ok(Question {
            name: Name::expand(packet, rr.name.p)?,
            query_type: rr.rr_type,
            query_class: rr.dns_class,
        })
    }

    /// Builds a fresh query packet asking this question.
    pub fn to_packet(&self) -> ProtoResult<Packet> {
        let mut packet = Packet::new(QUERY_BUF_SIZE);
        packet.push_question(&self.name, self.query_type, self.query_class)?;
        Ok(packet)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name, self.query_class, self.query_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn question_round_trips_through_a_packet() {
        let question = Question::new(
            Name::from_str("www.example.com.").unwrap(),
            RecordType::AAAA,
        );

        let packet = question.to_packet().unwrap();
        let parsed = Question::parse(&packet).unwrap();

        assert_eq!(parsed.name, question.name);
        assert_eq!(parsed.query_type, RecordType::AAAA);
        assert_eq!(parsed.query_class, DnsClass::IN);
    }
}
