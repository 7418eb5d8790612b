//! Stub-mode resolution against scripted loopback servers.

extern crate env_logger;
extern crate futures;
extern crate rand;
extern crate wren_dns_proto as proto;
extern crate wren_dns_resolver as resolver;

mod support;

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::str::FromStr;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proto::rr::{DnsClass, Name, RData, RecordType, Section};
use resolver::{Hints, Hosts, ResolvConf, Resolver};

use support::{answer_a, drive, qname_of, qtype_of, reply_to, serve_once};

fn stub_conf(server: SocketAddr) -> ResolvConf {
    let mut conf = ResolvConf::default();
    conf.add_nameserver(server);
    conf.options.port = server.port();
    conf
}

fn open(conf: ResolvConf, hosts: Hosts) -> Resolver {
    let conf = Arc::new(conf);
    let hints = Arc::new(Hints::local(&conf));
    Resolver::open(conf, Arc::new(hosts), hints).unwrap()
}

#[test]
fn stub_asks_one_server_and_returns_its_answer() {
    let _ = env_logger::try_init();

    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let server_addr = server.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        serve_once(&server, |query| {
            let mut reply = reply_to(query);
            answer_a(&mut reply, &qname_of(query), [192, 0, 2, 80]);
            reply
        });

        // the stub must not come back for more
        server
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        let mut buf = [0u8; 512];
        let extra = server.recv_from(&mut buf).is_ok();
        tx.send(extra).unwrap();
    });

    let mut resolver = open(stub_conf(server_addr), Hosts::new());
    resolver
        .submit(
            &Name::from_str("www.example.com").unwrap(),
            RecordType::A,
            DnsClass::IN,
        )
        .unwrap();

    let answer = drive(&mut resolver);
    handle.join().unwrap();

    assert_eq!(answer.count(Section::Answer), 1);
    let off = proto::rr::record::Rr::skip(&answer, 12);
    let rr = proto::rr::record::Rr::parse(&answer, off).unwrap();
    assert_eq!(
        rr.rdata(&answer).unwrap(),
        RData::A(Ipv4Addr::new(192, 0, 2, 80))
    );

    let extra_query = rx.recv().unwrap();
    assert!(!extra_query, "stub sent more than one query");
}

#[test]
fn file_lookup_answers_without_touching_the_network() {
    let _ = env_logger::try_init();

    let mut hosts = Hosts::new();
    hosts.insert(
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        &Name::from_str("localhost").unwrap(),
        false,
    );

    // no nameservers configured at all; `file` must carry the lookup
    let mut conf = ResolvConf::default();
    conf.set_lookup(&[resolver::LookupSource::File]);

    let mut resolver = open(conf, hosts);
    resolver
        .submit(
            &Name::from_str("localhost").unwrap(),
            RecordType::A,
            DnsClass::IN,
        )
        .unwrap();

    let answer = drive(&mut resolver);
    assert_eq!(answer.count(Section::Answer), 1);
}

#[test]
fn smart_mode_resolves_mail_exchanges() {
    let _ = env_logger::try_init();

    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let server_addr = server.local_addr().unwrap();

    thread::spawn(move || {
        // first the MX answer, then the A lookup smart mode spawns
        for _ in 0..2 {
            serve_once(&server, |query| {
                let qname = qname_of(query);
                let mut reply = reply_to(query);
                match qtype_of(query) {
                    RecordType::MX => {
                        reply
                            .push(
                                Section::Answer,
                                &qname,
                                RecordType::MX,
                                DnsClass::IN,
                                60,
                                &RData::MX(proto::rr::rdata::MX::new(
                                    10,
                                    Name::from_str("mail.example.com.").unwrap(),
                                )),
                            )
                            .unwrap();
                    }
                    _ => answer_a(&mut reply, &qname, [192, 0, 2, 25]),
                }
                reply
            });
        }
    });

    let mut conf = stub_conf(server_addr);
    conf.options.smart = true;

    let mut resolver = open(conf, Hosts::new());
    resolver
        .submit(
            &Name::from_str("example.com").unwrap(),
            RecordType::MX,
            DnsClass::IN,
        )
        .unwrap();

    let answer = drive(&mut resolver);

    assert_eq!(answer.count(Section::Answer), 1);
    assert_eq!(answer.count(Section::Additional), 1);

    // the lifted address belongs to the exchange host
    let mut iter = proto::rr::RrIter::new(
        proto::rr::RrFilter::new()
            .sections(proto::rr::SectionSet::ADDITIONAL)
            .rr_type(RecordType::A),
    );
    let lifted = iter.next(&answer).expect("lifted A record");
    assert_eq!(
        lifted.name(&answer).unwrap(),
        Name::from_str("mail.example.com.").unwrap()
    );
    assert_eq!(
        lifted.rdata(&answer).unwrap(),
        RData::A(Ipv4Addr::new(192, 0, 2, 25))
    );
}

#[test]
fn unresponsive_servers_turn_into_servfail() {
    let _ = env_logger::try_init();

    // a server that never answers
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let server_addr = server.local_addr().unwrap();

    let clock = Arc::new(proto::clock::ManualClock::new(0));
    let conf = Arc::new(stub_conf(server_addr));
    let hints = Arc::new(Hints::local(&conf));

    let mut resolver = Resolver::open_with(
        conf,
        Arc::new(Hosts::new()),
        hints,
        Box::new(<::rand::rngs::StdRng as ::rand::SeedableRng>::seed_from_u64(7)),
        clock.clone(),
    ).unwrap();

    resolver
        .submit(
            &Name::from_str("host").unwrap(),
            RecordType::A,
            DnsClass::IN,
        )
        .unwrap();

    // every advance expires the current server; the engine rotates
    // through its attempts, then its candidates, then gives up
    let mut rounds = 0;
    let answer = loop {
        match resolver.check().unwrap() {
            futures::Async::Ready(()) => break resolver.fetch().unwrap(),
            futures::Async::NotReady => {
                rounds += 1;
                assert!(rounds < 100, "engine never gave up");
                clock.advance(6);
            }
        }
    };

    assert_eq!(
        answer.response_code(),
        proto::op::ResponseCode::ServFail
    );
    assert!(answer.is_response());
}
