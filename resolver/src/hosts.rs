// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The in-memory hosts table, answering from `/etc/hosts` entries.
//!
//! The text parsing lives with the caller; this table takes parsed
//! `(address, host, alias)` tuples and synthesizes answer packets for
//! `A`, `AAAA` and `PTR` questions against them.

use std::net::IpAddr;

use proto::op::{Packet, Question, QUERY_BUF_SIZE};
use proto::rr::rdata;
use proto::rr::{Name, RData, RecordType, Section};

use error::*;

/// One hosts-file line, with its reverse-lookup name precomputed.
#[derive(Debug, Clone)]
pub struct HostsEntry {
    /// The address the line maps.
    pub address: IpAddr,
    /// The host name, anchored.
    pub host: Name,
    /// The arpa form of `address`, for `PTR` lookups.
    pub arpa: Name,
    /// True for names listed after the first on a line; aliases do not
    /// answer reverse lookups.
    pub alias: bool,
}

/// An append-only table of hosts entries.
#[derive(Debug, Clone, Default)]
pub struct Hosts {
    entries: Vec<HostsEntry>,
}

impl Hosts {
    /// An empty table.
    pub fn new() -> Hosts {
        Hosts::default()
    }

    /// Appends one parsed hosts line.
    pub fn insert(&mut self, address: IpAddr, host: &Name, alias: bool) {
        let arpa = match address {
            IpAddr::V4(ref v4) => rdata::a::arpa(v4),
            IpAddr::V6(ref v6) => rdata::aaaa::arpa(v6),
        };

        self.entries.push(HostsEntry {
            address: address,
            host: host.anchor(),
            arpa: arpa,
            alias: alias,
        });
    }

    /// The entries, in insertion order.
    pub fn entries(&self) -> &[HostsEntry] {
        &self.entries
    }

    /// Answers `query` from the table: address records for `A`/`AAAA`
    /// questions, host names for `PTR` questions against the arpa
    /// form. The answer echoes the question and carries ttl 0; a name
    /// with no matching entries yields an answer with an empty answer
    /// section.
    pub fn query(&self, query: &Packet) -> ResolveResult<Packet> {
        let question = Question::parse(query)?;
        let mut answer = Packet::new(QUERY_BUF_SIZE);
        answer.set_response(true);
        answer.push_question(&question.name, question.query_type, question.query_class)?;

        match question.query_type {
            RecordType::PTR => {
                for entry in self.entries.iter().filter(|e| !e.alias) {
                    if entry.arpa == question.name {
                        answer.push(
                            Section::Answer,
                            &question.name,
                            RecordType::PTR,
                            question.query_class,
                            0,
                            &RData::PTR(entry.host.clone()),
                        )?;
                    }
                }
            }
            RecordType::A => {
                for entry in &self.entries {
                    if let IpAddr::V4(v4) = entry.address {
                        if entry.host == question.name {
                            answer.push(
                                Section::Answer,
                                &question.name,
                                RecordType::A,
                                question.query_class,
                                0,
                                &RData::A(v4),
                            )?;
                        }
                    }
                }
            }
            RecordType::AAAA => {
                for entry in &self.entries {
                    if let IpAddr::V6(v6) = entry.address {
                        if entry.host == question.name {
                            answer.push(
                                Section::Answer,
                                &question.name,
                                RecordType::AAAA,
                                question.query_class,
                                0,
                                &RData::AAAA(v6),
                            )?;
                        }
                    }
                }
            }
            _ => {}
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::rr::record::Rr;
    use proto::rr::DnsClass;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn localhost_table() -> Hosts {
        let mut hosts = Hosts::new();
        hosts.insert(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            &Name::from_str("localhost").unwrap(),
            false,
        );
        hosts.insert(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            &Name::from_str("localhost.localdomain").unwrap(),
            true,
        );
        hosts
    }

    fn question(name: &str, rr_type: RecordType) -> Packet {
        let mut packet = Packet::new(512);
        packet
            .push_question(&Name::from_str(name).unwrap(), rr_type, DnsClass::IN)
            .unwrap();
        packet
    }

    #[test]
    fn a_lookup_answers_from_the_table() {
        let hosts = localhost_table();
        let answer = hosts
            .query(&question("localhost.", RecordType::A))
            .unwrap();

        assert_eq!(answer.count(Section::Answer), 1);
        let off = Rr::skip(&answer, 12);
        let rr = Rr::parse(&answer, off).unwrap();
        assert_eq!(rr.ttl, 0);
        assert_eq!(
            rr.rdata(&answer).unwrap(),
            RData::A(Ipv4Addr::new(127, 0, 0, 1))
        );
    }

    #[test]
    fn ptr_lookup_ignores_aliases() {
        let hosts = localhost_table();
        let answer = hosts
            .query(&question("1.0.0.127.in-addr.arpa.", RecordType::PTR))
            .unwrap();

        // only the canonical name answers the reverse lookup
        assert_eq!(answer.count(Section::Answer), 1);
        let off = Rr::skip(&answer, 12);
        let rr = Rr::parse(&answer, off).unwrap();
        assert_eq!(
            rr.rdata(&answer).unwrap(),
            RData::PTR(Name::from_str("localhost.").unwrap())
        );
    }

    #[test]
    fn unmatched_names_yield_an_empty_answer_section() {
        let hosts = localhost_table();
        let answer = hosts
            .query(&question("otherhost.", RecordType::A))
            .unwrap();
        assert_eq!(answer.count(Section::Question), 1);
        assert_eq!(answer.count(Section::Answer), 0);
    }

    #[test]
    fn aaaa_questions_match_only_v6_entries() {
        let hosts = localhost_table();
        let answer = hosts
            .query(&question("localhost.", RecordType::AAAA))
            .unwrap();
        assert_eq!(answer.count(Section::Answer), 0);
    }
}
