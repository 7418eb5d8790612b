// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The single-query transport driver.
//!
//! One `QuerySocket` carries one outstanding question at a time. It
//! speaks UDP first and upgrades to TCP when the server truncates,
//! re-sending the same query behind a two-byte length prefix. Progress
//! is driven by re-entrant `check` calls that never block; whenever a
//! socket operation would wait, `check` returns `Async::NotReady` and
//! `pollin`/`pollout` name the descriptor to wait on.

use std::io;
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

use futures::Async;
use libc;
use rand::RngCore;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use clock::Clock;
use error::*;
use op::{Packet, Question, HEADER_LEN};
use rr::{DnsClass, Name, RecordType};
use xfer::permutor::Permutor;

/// Smallest answer buffer kept around for receives.
const MIN_ANSWER: usize = 768;

/// How a query is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// UDP first, upgraded to TCP on truncation.
    Any,
    /// UDP only; truncated answers are returned as-is.
    Udp,
    /// TCP from the start.
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoState {
    Idle,
    UdpInit,
    UdpConn,
    UdpSend,
    UdpRecv,
    UdpDone,
    TcpInit,
    TcpConn,
    TcpSend,
    TcpRecv,
    TcpDone,
}

/// A non-blocking one-question-at-a-time DNS transport.
pub struct QuerySocket {
    udp: UdpSocket,
    tcp: Option<TcpStream>,
    transport: Transport,
    local: SocketAddr,
    remote: Option<SocketAddr>,
    qids: Permutor,
    clock: Arc<dyn Clock>,

    // everything below is per-query state, cleared by `reset`
    state: SoState,
    qid: u16,
    qname: Option<Name>,
    qtype: RecordType,
    qclass: DnsClass,
    query: Option<Packet>,
    qout: usize,
    began: Duration,
    answer: Option<Packet>,
    lenbuf: [u8; 2],
    apos: usize,
    alen: usize,
}

impl QuerySocket {
    /// Opens the UDP side bound to `local` and prepares the id stream.
    /// TCP sockets are created per upgrade.
    pub fn new(
        local: SocketAddr,
        transport: Transport,
        rng: &mut dyn RngCore,
        clock: Arc<dyn Clock>,
    ) -> ProtoResult<QuerySocket> {
        let udp = UdpSocket::bind(local)?;
        udp.set_nonblocking(true)?;

        Ok(QuerySocket {
            udp: udp,
            tcp: None,
            transport: transport,
            local: local,
            remote: None,
            qids: Permutor::new(1, 65535, rng),
            clock: clock,
            state: SoState::Idle,
            qid: 0,
            qname: None,
            qtype: RecordType::A,
            qclass: DnsClass::IN,
            query: None,
            qout: 0,
            began: Duration::from_secs(0),
            answer: None,
            lenbuf: [0; 2],
            apos: 0,
            alen: 0,
        })
    }

    /// A fresh transaction id.
    pub fn mkqid(&mut self) -> u16 {
        self.qids.step() as u16
    }

    /// Abandons any in-flight query: closes the TCP side, frees the
    /// answer, and returns to the submit-ready state.
    pub fn reset(&mut self) {
        self.tcp = None;
        self.state = SoState::Idle;
        self.qid = 0;
        self.qname = None;
        self.qtype = RecordType::A;
        self.qclass = DnsClass::IN;
        self.query = None;
        self.qout = 0;
        self.began = Duration::from_secs(0);
        self.answer = None;
        self.lenbuf = [0; 2];
        self.apos = 0;
        self.alen = 0;
    }

    /// Arms the socket with `query` for `host`. The question is
    /// remembered for answer verification; a zero header id is stamped
    /// with a fresh draw from the permutor.
    pub fn submit(&mut self, query: &Packet, host: SocketAddr) -> ProtoResult<()> {
        self.reset();

        let question = Question::parse(query)?;

        let mut query = query.clone();
        if query.id() == 0 {
            let id = self.mkqid();
            query.set_id(id);
        }

        debug!(
            "submitting {} (qid {}) to {}",
            question,
            query.id(),
            host
        );

        self.qid = query.id();
        self.qname = Some(question.name);
        self.qtype = question.query_type;
        self.qclass = question.query_class;
        self.answer = Some(Packet::new(MIN_ANSWER));
        self.remote = Some(host);
        self.query = Some(query);
        self.began = self.clock.now();
        self.state = match self.transport {
            Transport::Tcp => SoState::TcpInit,
            _ => SoState::UdpInit,
        };

        Ok(())
    }

    /// Drives the query as far as it can go without blocking.
    pub fn check(&mut self) -> ProtoResult<Async<()>> {
        loop {
            match self.state {
                SoState::Idle => {
                    return Err(ProtoErrorKind::Unknown("no query submitted").into())
                }

                SoState::UdpInit => {
                    self.state = SoState::UdpConn;
                }

                SoState::UdpConn => {
                    let remote = self.remote()?;
                    match self.udp.connect(remote) {
                        Ok(()) => self.state = SoState::UdpSend,
                        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return self.suspend_on(e),
                    }
                }

                SoState::UdpSend => {
                    let result = {
                        let query = self.query.as_ref().expect("submit sets the query");
                        self.udp.send(query.wire())
                    };
                    match result {
                        Ok(_) => self.state = SoState::UdpRecv,
                        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return self.suspend_on(e),
                    }
                }

                SoState::UdpRecv => {
                    let received = {
                        let answer = self.answer.as_mut().expect("submit sets the answer");
                        self.udp.recv(answer.buf_mut())
                    };
                    let n = match received {
                        Ok(n) => n,
                        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return self.suspend_on(e),
                    };

                    if n < HEADER_LEN {
                        continue;
                    }

                    self.answer
                        .as_mut()
                        .expect("submit sets the answer")
                        .set_wire_len(n);

                    match self.verify() {
                        Ok(()) => self.state = SoState::UdpDone,
                        Err(e) => {
                            warn!("discarding unverifiable answer: {}", e);
                            continue;
                        }
                    }
                }

                SoState::UdpDone => {
                    let truncated = match self.answer {
                        Some(ref answer) => answer.truncated(),
                        None => {
                            return Err(
                                ProtoErrorKind::Unknown("answer already fetched").into()
                            )
                        }
                    };

                    if !truncated || self.transport == Transport::Udp {
                        return Ok(Async::Ready(()));
                    }

                    debug!("answer truncated, upgrading to tcp");
                    self.state = SoState::TcpInit;
                }

                SoState::TcpInit => {
                    self.tcp = None;
                    self.tcp_connect()?;
                    self.state = SoState::TcpConn;
                }

                SoState::TcpConn => {
                    let connected = {
                        let stream = self.tcp.as_ref().expect("tcp_connect sets the stream");
                        if let Some(err) = stream.take_error()? {
                            return Err(err.into());
                        }
                        stream.peer_addr()
                    };

                    match connected {
                        Ok(_) => self.state = SoState::TcpSend,
                        Err(ref e) if e.kind() == io::ErrorKind::NotConnected => {
                            return Ok(Async::NotReady)
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                SoState::TcpSend => {
                    match self.tcp_send() {
                        Ok(Async::Ready(())) => self.state = SoState::TcpRecv,
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(e) => return Err(e),
                    }
                }

                SoState::TcpRecv => {
                    match self.tcp_recv() {
                        Ok(Async::Ready(())) => self.state = SoState::TcpDone,
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(e) => return Err(e),
                    }
                }

                SoState::TcpDone => {
                    self.tcp = None;

                    match self.answer {
                        Some(ref answer) if answer.len() < HEADER_LEN => {
                            return Err(
                                ProtoErrorKind::Illegal("short tcp answer").into()
                            )
                        }
                        Some(_) => {}
                        None => {
                            return Err(
                                ProtoErrorKind::Unknown("answer already fetched").into()
                            )
                        }
                    }

                    // over TCP a mismatched answer is a hard error
                    self.verify()?;
                    return Ok(Async::Ready(()));
                }
            }
        }
    }

    /// Takes the completed answer. Fails with `Unknown` unless the
    /// driver has reached a done state.
    pub fn fetch(&mut self) -> ProtoResult<Packet> {
        match self.state {
            SoState::UdpDone | SoState::TcpDone => self.answer
                .take()
                .ok_or_else(|| ProtoErrorKind::Unknown("answer already fetched").into()),
            _ => Err(ProtoErrorKind::Unknown("query not complete").into()),
        }
    }

    /// Submit-check-fetch in one call, for callers that do not need to
    /// interleave: resubmits on first call, completes when ready.
    pub fn query(&mut self, query: &Packet, host: SocketAddr) -> ProtoResult<Async<Packet>> {
        if self.state == SoState::Idle {
            self.submit(query, host)?;
        }

        match self.check()? {
            Async::NotReady => Ok(Async::NotReady),
            Async::Ready(()) => {
                let answer = self.fetch()?;
                self.reset();
                Ok(Async::Ready(answer))
            }
        }
    }

    /// Monotonic time since the query was submitted.
    pub fn elapsed(&self) -> Duration {
        self.clock
            .now()
            .checked_sub(self.began)
            .unwrap_or_else(|| Duration::from_secs(0))
    }

    /// The descriptor to poll for readability, when reading would
    /// unblock progress.
    pub fn pollin(&self) -> Option<RawFd> {
        match self.state {
            SoState::UdpRecv => Some(self.udp.as_raw_fd()),
            SoState::TcpRecv => self.tcp.as_ref().map(|tcp| tcp.as_raw_fd()),
            _ => None,
        }
    }

    /// The descriptor to poll for writability, when writing would
    /// unblock progress.
    pub fn pollout(&self) -> Option<RawFd> {
        match self.state {
            SoState::UdpConn | SoState::UdpSend => Some(self.udp.as_raw_fd()),
            SoState::TcpConn | SoState::TcpSend => {
                self.tcp.as_ref().map(|tcp| tcp.as_raw_fd())
            }
            _ => None,
        }
    }

    fn remote(&self) -> ProtoResult<SocketAddr> {
        self.remote
            .ok_or_else(|| ProtoErrorKind::Unknown("no remote host").into())
    }

    /// Accept iff the answer echoes the outstanding transaction: same
    /// id, at least one question, and a first question matching the
    /// submitted name (case-insensitively), type and class.
    fn verify(&self) -> ProtoResult<()> {
        let answer = self.answer
            .as_ref()
            .ok_or_else(|| ProtoError::from(ProtoErrorKind::Unknown("no answer")))?;

        if answer.id() != self.qid {
            return Err(ProtoErrorKind::Unknown("qid mismatch").into());
        }

        if answer.count(::rr::Section::Question) == 0 {
            return Err(ProtoErrorKind::Unknown("no question echoed").into());
        }

        let question = Question::parse(answer)?;
        if question.query_type != self.qtype || question.query_class != self.qclass {
            return Err(ProtoErrorKind::Unknown("question type mismatch").into());
        }

        match self.qname {
            Some(ref qname) if question.name == *qname => Ok(()),
            _ => Err(ProtoErrorKind::Unknown("question name mismatch").into()),
        }
    }

    /// Opens a fresh non-blocking TCP socket bound to the local
    /// address and starts the connect.
    fn tcp_connect(&mut self) -> ProtoResult<()> {
        let remote = self.remote()?;

        let domain = if remote.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        // the configured local address, unless its family disagrees
        let local = if self.local.is_ipv4() == remote.is_ipv4() {
            self.local
        } else if remote.is_ipv4() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 0)
        } else {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0)), 0)
        };
        socket.bind(&SockAddr::from(local))?;
        socket.set_nonblocking(true)?;

        match socket.connect(&SockAddr::from(remote)) {
            Ok(()) => {}
            Err(ref e) if in_progress(e) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }

        self.tcp = Some(socket.into());
        Ok(())
    }

    /// Sends the query framed with a 2-byte length prefix, resuming
    /// mid-frame across suspensions.
    fn tcp_send(&mut self) -> ProtoResult<Async<()>> {
        let qend = self.query.as_ref().expect("submit sets the query").len() + 2;

        while self.qout < qend {
            let written = {
                let query = self.query.as_ref().expect("submit sets the query");
                let frame = [(query.len() >> 8) as u8, query.len() as u8];
                let stream = self.tcp.as_mut().expect("tcp_connect sets the stream");

                if self.qout < 2 {
                    stream.write(&frame[self.qout..])
                } else {
                    stream.write(&query.wire()[self.qout - 2..])
                }
            };

            match written {
                Ok(0) => {
                    return Err(ProtoErrorKind::Unknown("connection closed mid-send").into())
                }
                Ok(n) => self.qout += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Async::NotReady)
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Async::Ready(()))
    }

    /// Reads a length-prefixed answer, growing the answer buffer to
    /// the framed length once it is known.
    fn tcp_recv(&mut self) -> ProtoResult<Async<()>> {
        loop {
            if self.apos < 2 {
                let read = {
                    let stream = self.tcp.as_mut().expect("tcp_connect sets the stream");
                    stream.read(&mut self.lenbuf[self.apos..])
                };

                match read {
                    Ok(0) => {
                        return Err(
                            ProtoErrorKind::Unknown("connection closed mid-frame").into()
                        )
                    }
                    Ok(n) => self.apos += n,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                        return Ok(Async::NotReady)
                    }
                    Err(e) => return Err(e.into()),
                }

                if self.apos >= 2 {
                    self.alen = ((self.lenbuf[0] as usize) << 8) | self.lenbuf[1] as usize;

                    let capacity = ::std::cmp::max(self.alen, MIN_ANSWER);
                    match self.answer {
                        Some(ref answer) if answer.capacity() >= capacity => {}
                        _ => self.answer = Some(Packet::new(capacity)),
                    }
                }

                continue;
            }

            if self.apos >= self.alen + 2 {
                break;
            }

            let read = {
                let pos = self.apos - 2;
                let alen = self.alen;
                let answer = self.answer.as_mut().expect("frame length allocates");
                let stream = self.tcp.as_mut().expect("tcp_connect sets the stream");
                stream.read(&mut answer.buf_mut()[pos..alen])
            };

            match read {
                Ok(0) => {
                    return Err(ProtoErrorKind::Unknown("connection closed mid-answer").into())
                }
                Ok(n) => self.apos += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Async::NotReady)
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.answer
            .as_mut()
            .expect("frame length allocates")
            .set_wire_len(self.alen);
        Ok(Async::Ready(()))
    }

    /// Maps the blocking errnos to a suspension and everything else to
    /// a hard error.
    fn suspend_on(&self, e: io::Error) -> ProtoResult<Async<()>> {
        if would_block(&e) {
            Ok(Async::NotReady)
        } else {
            Err(e.into())
        }
    }
}

impl ::std::fmt::Debug for QuerySocket {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("QuerySocket")
            .field("state", &self.state)
            .field("qid", &self.qid)
            .field("remote", &self.remote)
            .finish()
    }
}

fn would_block(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    match e.raw_os_error() {
        Some(code) => code == libc::EINPROGRESS || code == libc::EALREADY,
        None => false,
    }
}

fn in_progress(e: &io::Error) -> bool {
    would_block(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::SystemClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rr::Section;
    use std::str::FromStr;
    use std::thread;
    use std::time::Instant;

    fn localhost_any() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn new_socket(transport: Transport) -> QuerySocket {
        let mut rng = StdRng::seed_from_u64(42);
        QuerySocket::new(localhost_any(), transport, &mut rng, Arc::new(SystemClock)).unwrap()
    }

    fn drive(socket: &mut QuerySocket) -> ProtoResult<Packet> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match socket.check()? {
                Async::Ready(()) => return socket.fetch(),
                Async::NotReady => {
                    assert!(Instant::now() < deadline, "query did not complete");
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    fn a_query(name: &str) -> Packet {
        let mut query = Packet::new(512);
        query
            .push_question(&Name::from_str(name).unwrap(), RecordType::A, DnsClass::IN)
            .unwrap();
        query
    }

    #[test]
    fn stamps_an_unpredictable_qid() {
        let mut socket = new_socket(Transport::Any);
        let server = UdpSocket::bind(localhost_any()).unwrap();

        let query = a_query("example.com.");
        assert_eq!(query.id(), 0);
        socket
            .submit(&query, server.local_addr().unwrap())
            .unwrap();
        assert_ne!(socket.qid, 0);
    }

    #[test]
    fn udp_answer_is_verified_and_returned() {
        let mut socket = new_socket(Transport::Any);
        let server = UdpSocket::bind(localhost_any()).unwrap();
        let server_addr = server.local_addr().unwrap();

        socket.submit(&a_query("example.com."), server_addr).unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (n, from) = server.recv_from(&mut buf).unwrap();
            let query = Packet::from_bytes(&buf[..n]).unwrap();

            // first a forged reply with the wrong id, then the real one
            let mut forged = query.clone();
            forged.set_id(query.id().wrapping_add(1));
            forged.set_response(true);
            server.send_to(forged.wire(), from).unwrap();

            let mut reply = query.clone();
            reply.set_response(true);
            server.send_to(reply.wire(), from).unwrap();
        });

        let answer = drive(&mut socket).unwrap();
        handle.join().unwrap();

        assert!(answer.is_response());
        assert_eq!(answer.count(Section::Question), 1);
    }

    #[test]
    fn truncation_upgrades_to_tcp() {
        let mut socket = new_socket(Transport::Any);

        let udp_server = UdpSocket::bind(localhost_any()).unwrap();
        let server_addr = udp_server.local_addr().unwrap();
        let tcp_server = ::std::net::TcpListener::bind(server_addr).unwrap();

        socket.submit(&a_query("example.com."), server_addr).unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (n, from) = udp_server.recv_from(&mut buf).unwrap();
            let query = Packet::from_bytes(&buf[..n]).unwrap();

            let mut truncated = query.clone();
            truncated.set_response(true);
            truncated.set_truncated(true);
            udp_server.send_to(truncated.wire(), from).unwrap();

            // the retry arrives length-prefixed over TCP
            let (mut stream, _) = tcp_server.accept().unwrap();
            let mut frame = [0u8; 2];
            stream.read_exact(&mut frame).unwrap();
            let len = ((frame[0] as usize) << 8) | frame[1] as usize;
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).unwrap();

            let tcp_query = Packet::from_bytes(&body).unwrap();
            let mut reply = tcp_query.clone();
            reply.set_response(true);

            let reply_len = reply.len() as u16;
            stream
                .write_all(&[(reply_len >> 8) as u8, reply_len as u8])
                .unwrap();
            stream.write_all(reply.wire()).unwrap();
        });

        let answer = drive(&mut socket).unwrap();
        handle.join().unwrap();

        assert!(answer.is_response());
        assert!(!answer.truncated());
    }
}
