//! Shared plumbing for the loopback server tests.
#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use futures::Async;
use proto::op::Packet;
use proto::rr::{DnsClass, Name, RData, RecordType, Section};
use resolver::Resolver;

/// Spins the resolver until it completes, sleeping briefly on every
/// suspension, and returns the answer.
pub fn drive(resolver: &mut Resolver) -> Packet {
    let deadline = Instant::now() + Duration::from_secs(10);

    loop {
        match resolver.check().expect("resolution failed") {
            Async::Ready(()) => return resolver.fetch().expect("fetch after ready"),
            Async::NotReady => {
                assert!(Instant::now() < deadline, "resolution did not complete");
                thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

/// Receives one query on `socket` and hands its packet and source to
/// `respond`, sending whatever it returns back.
pub fn serve_once<F>(socket: &UdpSocket, respond: F)
where
    F: FnOnce(&Packet) -> Packet,
{
    let mut buf = [0u8; 512];
    let (n, from) = socket.recv_from(&mut buf).expect("server recv");
    let query = Packet::from_bytes(&buf[..n]).expect("parse query");
    let reply = respond(&query);
    socket.send_to(reply.wire(), from).expect("server send");
}

/// A response skeleton echoing `query`: same id and question, QR set,
/// with room to grow.
pub fn reply_to(query: &Packet) -> Packet {
    let mut reply = query.clone();
    reply.grow(512);
    reply.set_response(true);
    reply
}

/// Appends an answer-section A record.
pub fn answer_a(reply: &mut Packet, owner: &Name, addr: [u8; 4]) {
    reply
        .push(
            Section::Answer,
            owner,
            RecordType::A,
            DnsClass::IN,
            60,
            &RData::A(::std::net::Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])),
        )
        .expect("push A");
}

/// Appends an authority-section NS record delegating `zone`.
pub fn delegate(reply: &mut Packet, zone: &Name, ns_host: &Name) {
    reply
        .push(
            Section::Authority,
            zone,
            RecordType::NS,
            DnsClass::IN,
            60,
            &RData::NS(ns_host.clone()),
        )
        .expect("push NS");
}

/// Appends an additional-section glue A record.
pub fn glue(reply: &mut Packet, ns_host: &Name, addr: SocketAddr) {
    match addr {
        SocketAddr::V4(v4) => {
            reply
                .push(
                    Section::Additional,
                    ns_host,
                    RecordType::A,
                    DnsClass::IN,
                    60,
                    &RData::A(*v4.ip()),
                )
                .expect("push glue");
        }
        SocketAddr::V6(..) => panic!("tests only glue IPv4"),
    }
}

/// The owner name of the first question in `packet`.
pub fn qname_of(packet: &Packet) -> Name {
    ::proto::op::Question::parse(packet).expect("question").name
}

/// The query type of the first question in `packet`.
pub fn qtype_of(packet: &Packet) -> RecordType {
    ::proto::op::Question::parse(packet)
        .expect("question")
        .query_type
}
