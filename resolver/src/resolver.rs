// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The resolver engine: a stack of restartable lookup frames.
//!
//! One frame resolves one question. The engine walks the configured
//! lookup order (hosts file, network), expands the search list, and in
//! recursive mode walks delegations from its hints, pushing a child
//! frame whenever a subsidiary question appears: an unglued
//! nameserver's address, a CNAME target, or the addresses behind
//! NS/MX/SRV answers in smart mode. The stack is eight frames deep;
//! running out of frames degrades to answering with what is in hand
//! rather than failing.

use std::net::{IpAddr, SocketAddr};
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

use futures::Async;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use proto::clock::{Clock, SystemClock};
use proto::op::{Packet, Question, ResponseCode, MAX_PACKET, QUERY_BUF_SIZE};
use proto::rr::record::Rr;
use proto::rr::{
    DnsClass, Name, RData, RecordType, RrFilter, RrIter, Section, SectionSet, SortBy,
};
use proto::xfer::{QuerySocket, Transport};

use config::{LookupSource, ResolvConf, SearchIter};
use error::*;
use hints::Hints;
use hosts::Hosts;

/// Hard bound on lookup recursion.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Glue,
    Switch,
    File,
    Bind,
    Search,
    Hints,
    Iterate,
    ForeachNs,
    Resolv0Ns,
    Resolv1Ns,
    ForeachA,
    QueryA,
    Cname0A,
    Cname1A,
    Finish,
    Smart0A,
    Smart1A,
    Done,
    Servfail,
}

#[derive(Debug)]
struct Frame {
    state: State,
    which: usize,
    attempts: u32,
    query: Option<Packet>,
    answer: Option<Packet>,
    hints: Option<Packet>,
    hints_i: RrIter,
    hints_j: RrIter,
    hints_ns: Option<Rr>,
    ans_cname: Option<Rr>,
}

impl Default for Frame {
    fn default() -> Frame {
        Frame {
            state: State::Init,
            which: 0,
            attempts: 0,
            query: None,
            answer: None,
            hints: None,
            hints_i: RrIter::default(),
            hints_j: RrIter::default(),
            hints_ns: None,
            ans_cname: None,
        }
    }
}

/// A restartable, non-blocking resolver handle.
///
/// One handle carries one question at a time. `submit` arms it,
/// repeated `check` calls advance it (returning `Async::NotReady`
/// whenever the network would block; `pollin`/`pollout` expose the
/// descriptor to wait on), and `fetch` hands over the answer packet.
/// Configuration, hosts and hints are shared immutably; the handle
/// owns its sockets.
pub struct Resolver {
    so: QuerySocket,
    resconf: Arc<ResolvConf>,
    hosts: Arc<Hosts>,
    hints: Arc<Hints>,
    rng: Box<dyn RngCore + Send>,
    clock: Arc<dyn Clock>,

    qname: Option<Name>,
    qtype: RecordType,
    qclass: DnsClass,
    began: Duration,
    search: SearchIter,
    smart: Option<RrIter>,
    smart_fallback: bool,
    stack: [Frame; MAX_DEPTH],
    sp: usize,
}

impl Resolver {
    /// Opens a resolver over `resconf`, `hosts` and `hints`, with the
    /// system RNG and clock.
    pub fn open(
        resconf: Arc<ResolvConf>,
        hosts: Arc<Hosts>,
        hints: Arc<Hints>,
    ) -> ResolveResult<Resolver> {
        Resolver::open_with(
            resconf,
            hosts,
            hints,
            Box::new(StdRng::from_entropy()),
            Arc::new(SystemClock),
        )
    }

    /// Opens a resolver with an explicit RNG and clock, the injection
    /// point deterministic tests use.
    pub fn open_with(
        resconf: Arc<ResolvConf>,
        hosts: Arc<Hosts>,
        hints: Arc<Hints>,
        mut rng: Box<dyn RngCore + Send>,
        clock: Arc<dyn Clock>,
    ) -> ResolveResult<Resolver> {
        let so = QuerySocket::new(
            resconf.interface,
            Transport::Any,
            &mut *rng,
            clock.clone(),
        )?;

        Ok(Resolver {
            so: so,
            resconf: resconf,
            hosts: hosts,
            hints: hints,
            rng: rng,
            clock: clock,
            qname: None,
            qtype: RecordType::A,
            qclass: DnsClass::IN,
            began: Duration::from_secs(0),
            search: SearchIter::default(),
            smart: None,
            smart_fallback: false,
            stack: Default::default(),
            sp: 0,
        })
    }

    /// Abandons any resolution in flight and returns the handle to a
    /// submit-ready state. Shared tables and sockets are retained.
    pub fn reset(&mut self) {
        self.so.reset();
        for frame in self.stack.iter_mut() {
            *frame = Frame::default();
        }
        self.sp = 0;
        self.qname = None;
        self.qtype = RecordType::A;
        self.qclass = DnsClass::IN;
        self.began = Duration::from_secs(0);
        self.search = SearchIter::default();
        self.smart = None;
        self.smart_fallback = false;
    }

    /// Arms the engine with a question. The name is taken as written,
    /// not anchored, so the search list can still expand it.
    pub fn submit(
        &mut self,
        qname: &Name,
        qtype: RecordType,
        qclass: DnsClass,
    ) -> ResolveResult<()> {
        self.reset();

        debug!("submitted {} {} {}", qname, qclass, qtype);
        self.qname = Some(qname.clone());
        self.qtype = qtype;
        self.qclass = qclass;
        self.began = self.clock.now();
        Ok(())
    }

    /// Drives the resolution as far as it can go without blocking.
    pub fn check(&mut self) -> ResolveResult<Async<()>> {
        self.exec()
    }

    /// Takes the completed answer packet.
    pub fn fetch(&mut self) -> ResolveResult<Packet> {
        if self.stack[0].state != State::Done {
            return Err(ResolveErrorKind::NotReady.into());
        }

        self.stack[0]
            .answer
            .take()
            .ok_or_else(|| ResolveErrorKind::NotReady.into())
    }

    /// Monotonic time since `submit`, for caller-driven timeouts.
    pub fn elapsed(&self) -> Duration {
        self.clock
            .now()
            .checked_sub(self.began)
            .unwrap_or_else(|| Duration::from_secs(0))
    }

    /// The descriptor to poll for readability, or `None` when the
    /// engine is not suspended on a read.
    pub fn pollin(&self) -> Option<RawFd> {
        self.so.pollin()
    }

    /// The descriptor to poll for writability, or `None` when the
    /// engine is not suspended on a write.
    pub fn pollout(&self) -> Option<RawFd> {
        self.so.pollout()
    }

    fn exec(&mut self) -> ResolveResult<Async<()>> {
        loop {
            let sp = self.sp;

            match self.stack[sp].state {
                State::Init => {
                    self.stack[sp].state = State::Glue;
                }

                State::Glue => {
                    if sp == 0 {
                        self.stack[sp].state = State::Switch;
                        continue;
                    }

                    let query = self.stack[sp]
                        .query
                        .clone()
                        .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

                    match self.glue_answer(&query) {
                        None => self.stack[sp].state = State::Switch,
                        Some(answer) => {
                            let question = Question::parse(&query).map_err(ResolveError::from)?;

                            let direct = {
                                let mut iter = RrIter::new(
                                    RrFilter::new()
                                        .sections(SectionSet::ANSWER)
                                        .rr_type(question.query_type)
                                        .name(question.name.clone()),
                                );
                                iter.next(&answer)
                            };
                            if direct.is_some() {
                                trace!("glue answers {} outright", question.name);
                                self.stack[sp].answer = Some(answer);
                                self.stack[sp].state = State::Finish;
                                continue;
                            }

                            let cname = {
                                let mut iter = RrIter::new(
                                    RrFilter::new()
                                        .sections(SectionSet::ANSWER)
                                        .rr_type(RecordType::CNAME)
                                        .name(question.name.clone()),
                                );
                                iter.next(&answer)
                            };
                            match cname {
                                Some(rr) => {
                                    self.stack[sp].answer = Some(answer);
                                    self.stack[sp].ans_cname = Some(rr);
                                    self.stack[sp].state = State::Cname0A;
                                }
                                None => {
                                    self.stack[sp].answer = Some(answer);
                                    self.stack[sp].state = State::Switch;
                                }
                            }
                        }
                    }
                }

                State::Switch => {
                    let next = {
                        let frame = &mut self.stack[sp];
                        let lookup = self.resconf.lookup();
                        if frame.which < lookup.len() {
                            let source = lookup[frame.which];
                            frame.which += 1;
                            Some(source)
                        } else {
                            None
                        }
                    };

                    self.stack[sp].state = match next {
                        Some(LookupSource::Bind) => State::Bind,
                        Some(LookupSource::File) => State::File,
                        None => State::Servfail,
                    };
                }

                State::File => {
                    if sp > 0 {
                        let answer = {
                            let query = self.stack[sp]
                                .query
                                .as_ref()
                                .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
                            self.hosts.query(query)?
                        };

                        if answer.count(Section::Answer) > 0 {
                            self.stack[sp].answer = Some(answer);
                            self.stack[sp].state = State::Finish;
                        } else {
                            self.stack[sp].state = State::Switch;
                        }
                    } else {
                        self.search.reset();
                        let qname = self.qname
                            .clone()
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

                        let mut answered = false;
                        while let Some(candidate) = self.search.next(&qname, &self.resconf) {
                            let mut question = Packet::new(QUERY_BUF_SIZE);
                            question
                                .push_question(&candidate, self.qtype, self.qclass)
                                .map_err(ResolveError::from)?;

                            let answer = self.hosts.query(&question)?;
                            if answer.count(Section::Answer) > 0 {
                                self.stack[sp].answer = Some(answer);
                                self.stack[sp].state = State::Finish;
                                answered = true;
                                break;
                            }
                        }

                        if !answered {
                            self.stack[sp].state = State::Switch;
                        }
                    }
                }

                State::Bind => {
                    if sp > 0 {
                        // child frames arrive with their query in hand
                        self.stack[sp].state = State::Hints;
                    } else {
                        self.stack[sp].state = State::Search;
                    }
                }

                State::Search => {
                    let qname = self.qname
                        .clone()
                        .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

                    match self.search.next(&qname, &self.resconf) {
                        None => self.stack[sp].state = State::Switch,
                        Some(candidate) => {
                            debug!("trying candidate {}", candidate);
                            let query = self.mkquery(&candidate, self.qtype, self.qclass)?;
                            self.stack[sp].query = Some(query);
                            self.stack[sp].attempts = 0;
                            self.stack[sp].state = State::Hints;
                        }
                    }
                }

                State::Hints => {
                    let answer = {
                        let query = self.stack[sp]
                            .query
                            .as_ref()
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
                        self.hints.query(query, &mut *self.rng)?
                    };

                    self.stack[sp].hints = Some(answer);
                    self.stack[sp].state = State::Iterate;
                }

                State::Iterate => {
                    let seed = self.nonzero_seed();
                    let frame = &mut self.stack[sp];
                    let boundary = match frame.hints {
                        Some(ref hints) => hints.len(),
                        None => 0,
                    };

                    frame.hints_i = RrIter::new(
                        RrFilter::new()
                            .sections(SectionSet::AUTHORITY)
                            .rr_type(RecordType::NS),
                    ).sorted(SortBy::GluedNameServer, seed)
                        .boundary(boundary);
                    frame.state = State::ForeachNs;
                }

                State::ForeachNs => {
                    let attempts = self.resconf.options.attempts;
                    let frame = &mut self.stack[sp];
                    frame.hints_i.save();

                    let ns = match frame.hints {
                        Some(ref hints) => frame.hints_i.next(hints),
                        None => None,
                    };

                    match ns {
                        Some(rr) => {
                            match frame.hints {
                                Some(ref hints) => {
                                    trace!("candidate {}", rr.display(hints))
                                }
                                None => {}
                            }
                            frame.hints_ns = Some(rr);
                            frame.hints_j = RrIter::new(RrFilter::new());
                            // assume there are glue records
                            frame.state = State::ForeachA;
                        }
                        None => {
                            if frame.attempts + 1 < attempts {
                                frame.attempts += 1;
                                frame.state = State::Iterate;
                            } else if sp == 0 {
                                // next search candidate, if any is left
                                frame.state = State::Search;
                            } else {
                                frame.state = State::Switch;
                            }
                        }
                    }
                }

                State::Resolv0Ns => {
                    if sp + 1 >= MAX_DEPTH {
                        // out of frames; move on without this server
                        self.stack[sp].state = State::ForeachNs;
                        continue;
                    }

                    let host = self.current_ns_host(sp)?;
                    debug!("resolving unglued nameserver {}", host);

                    let mut query = Packet::new(QUERY_BUF_SIZE);
                    query
                        .push_question(&host, RecordType::A, DnsClass::IN)
                        .map_err(ResolveError::from)?;

                    self.stack[sp].state = State::Resolv1Ns;
                    self.push_frame(sp, query);
                }

                State::Resolv1Ns => {
                    {
                        let (head, tail) = self.stack.split_at_mut(sp + 1);
                        let frame = &mut head[sp];
                        let child = &tail[0];

                        let host = match child.query {
                            Some(ref query) => Question::parse(query)
                                .map_err(ResolveError::from)?
                                .name,
                            None => {
                                frame.state = State::ForeachNs;
                                continue;
                            }
                        };

                        if let (Some(child_answer), Some(hints)) =
                            (child.answer.as_ref(), frame.hints.as_mut())
                        {
                            let mut iter = RrIter::new(
                                RrFilter::new()
                                    .sections(SectionSet::ANSWERING)
                                    .rr_type(RecordType::A)
                                    .name(host),
                            );
                            while let Some(rr) = iter.next(child_answer) {
                                rr.copy_to(child_answer, hints, Section::Additional)
                                    .map_err(ResolveError::from)?;

                                // now there's glue; re-sort the candidates
                                frame.hints_i.rewind();
                            }
                        }

                        frame.state = State::ForeachNs;
                    }
                }

                State::ForeachA => {
                    let host = self.current_ns_host(sp)?;

                    let glue = {
                        let frame = &mut self.stack[sp];
                        frame.hints_j.filter = RrFilter::new()
                            .sections(SectionSet::ANSWERING)
                            .rr_type(RecordType::A)
                            .name(host);

                        match frame.hints {
                            Some(ref hints) => frame.hints_j.next(hints),
                            None => None,
                        }
                    };

                    match glue {
                        None => {
                            let tried = self.stack[sp].hints_j.count();
                            self.stack[sp].state = if tried == 0 {
                                State::Resolv0Ns
                            } else {
                                State::ForeachNs
                            };
                        }
                        Some(rr) => {
                            let addr = {
                                let hints = self.stack[sp]
                                    .hints
                                    .as_ref()
                                    .expect("iteration runs over hints");
                                match rr.rdata(hints).map_err(ResolveError::from)? {
                                    RData::A(v4) => {
                                        SocketAddr::new(IpAddr::V4(v4), self.resconf.options.port)
                                    }
                                    _ => {
                                        self.stack[sp].state = State::ForeachA;
                                        continue;
                                    }
                                }
                            };

                            {
                                let query = self.stack[sp]
                                    .query
                                    .as_ref()
                                    .ok_or_else(|| {
                                        ResolveError::from(ResolveErrorKind::NoQuestion)
                                    })?;
                                self.so.submit(query, addr)?;
                            }
                            self.stack[sp].state = State::QueryA;
                        }
                    }
                }

                State::QueryA => {
                    if self.so.elapsed() >= self.resconf.options.timeout {
                        warn!("server timed out, rotating to the next candidate");
                        self.stack[sp].state = State::ForeachA;
                        continue;
                    }

                    match self.so.check().map_err(ResolveError::from)? {
                        Async::NotReady => return Ok(Async::NotReady),
                        Async::Ready(()) => {}
                    }

                    let answer = self.so.fetch().map_err(ResolveError::from)?;
                    self.stack[sp].answer = Some(answer);

                    if !self.resconf.options.recurse {
                        // stub mode: whatever the server said is the answer
                        self.stack[sp].state = State::Finish;
                        continue;
                    }

                    let question = {
                        let query = self.stack[sp]
                            .query
                            .as_ref()
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
                        Question::parse(query).map_err(ResolveError::from)?
                    };

                    enum Disposition {
                        Finish,
                        Cname(Rr),
                        Delegate,
                        NextServer,
                    }

                    let disposition = {
                        let answer = self.stack[sp]
                            .answer
                            .as_ref()
                            .expect("stored just above");

                        let direct = {
                            let mut iter = RrIter::new(
                                RrFilter::new()
                                    .sections(SectionSet::ANSWER)
                                    .rr_type(question.query_type)
                                    .name(question.name.clone()),
                            );
                            iter.next(answer).is_some()
                        };

                        if direct {
                            Disposition::Finish
                        } else {
                            let cname = {
                                let mut iter = RrIter::new(
                                    RrFilter::new()
                                        .sections(SectionSet::ANSWER)
                                        .rr_type(RecordType::CNAME)
                                        .name(question.name.clone()),
                                );
                                iter.next(answer)
                            };

                            if let Some(rr) = cname {
                                Disposition::Cname(rr)
                            } else {
                                let delegated = {
                                    let mut iter = RrIter::new(
                                        RrFilter::new()
                                            .sections(SectionSet::AUTHORITY)
                                            .rr_type(RecordType::NS),
                                    );
                                    iter.next(answer).is_some()
                                };

                                if delegated {
                                    Disposition::Delegate
                                } else if answer.authoritative() {
                                    // a negative answer, but an authoritative one
                                    Disposition::Finish
                                } else {
                                    Disposition::NextServer
                                }
                            }
                        }
                    };

                    match disposition {
                        Disposition::Finish => self.stack[sp].state = State::Finish,
                        Disposition::Cname(rr) => {
                            debug!("following cname at {}", question.name);
                            self.stack[sp].ans_cname = Some(rr);
                            self.stack[sp].state = State::Cname0A;
                        }
                        Disposition::Delegate => {
                            debug!("delegation for {}", question.name);
                            let frame = &mut self.stack[sp];
                            frame.hints = frame.answer.take();
                            frame.state = State::Iterate;
                        }
                        Disposition::NextServer => {
                            self.stack[sp].state = State::ForeachA;
                        }
                    }
                }

                State::Cname0A => {
                    if sp + 1 >= MAX_DEPTH {
                        // out of frames; answer with the chain so far
                        self.stack[sp].state = State::Finish;
                        continue;
                    }

                    let (target, qtype) = {
                        let frame = &self.stack[sp];
                        let answer = frame
                            .answer
                            .as_ref()
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
                        let rr = frame
                            .ans_cname
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

                        let target = match rr.rdata(answer).map_err(ResolveError::from)? {
                            RData::CNAME(target) => target,
                            _ => {
                                let e: ::proto::error::ProtoError =
                                    ::proto::error::ProtoErrorKind::Illegal(
                                        "cname record without cname rdata",
                                    ).into();
                                return Err(e.into());
                            }
                        };

                        let qtype = match frame.query {
                            Some(ref query) => {
                                Question::parse(query).map_err(ResolveError::from)?.query_type
                            }
                            None => self.qtype,
                        };

                        (target, qtype)
                    };

                    let mut query = Packet::new(QUERY_BUF_SIZE);
                    query
                        .push_question(&target, qtype, DnsClass::IN)
                        .map_err(ResolveError::from)?;

                    self.stack[sp].state = State::Cname1A;
                    self.push_frame(sp, query);
                }

                State::Cname1A => {
                    let merged = {
                        let (head, tail) = self.stack.split_at_mut(sp + 1);
                        let frame = &head[sp];
                        let child = &tail[0];

                        match (frame.answer.as_ref(), child.answer.as_ref()) {
                            (Some(parent_answer), Some(child_answer)) => {
                                Some(merge(parent_answer, child_answer)?)
                            }
                            _ => None,
                        }
                    };

                    if let Some(merged) = merged {
                        self.stack[sp].answer = Some(merged);
                    }
                    self.stack[sp].state = State::Finish;
                }

                State::Finish => {
                    debug_assert!(self.stack[sp].answer.is_some());

                    if !self.resconf.options.smart || sp > 0 {
                        self.stack[sp].state = State::Done;
                        continue;
                    }

                    self.smart = Some(RrIter::new(
                        RrFilter::new()
                            .sections(SectionSet::ANSWER)
                            .rr_type(self.qtype),
                    ));
                    self.stack[sp].state = State::Smart0A;
                }

                State::Smart0A => {
                    let mut spawned = false;

                    loop {
                        let rr = {
                            let answer = match self.stack[sp].answer {
                                Some(ref answer) => answer,
                                None => break,
                            };
                            match self.smart {
                                Some(ref mut smart) => smart.next(answer),
                                None => break,
                            }
                        };

                        let rr = match rr {
                            Some(rr) => rr,
                            None => break,
                        };

                        let host = {
                            let answer = self.stack[sp]
                                .answer
                                .as_ref()
                                .expect("checked above");
                            match rr.rdata(answer) {
                                Ok(RData::NS(host)) => host,
                                Ok(RData::MX(mx)) => mx.exchange,
                                Ok(RData::SRV(srv)) => srv.target,
                                _ => continue,
                            }
                        };

                        debug!("smart lookup for {}", host);
                        let query = self.mkquery(&host, RecordType::A, DnsClass::IN)?;
                        self.stack[sp].state = State::Smart1A;
                        self.push_frame(sp, query);
                        spawned = true;
                        break;
                    }

                    if spawned {
                        continue;
                    }

                    // mail must fall back to an address record when no
                    // exchanges were returned
                    let smart_count = self.smart.as_ref().map(|s| s.count()).unwrap_or(0);
                    if self.qtype == RecordType::MX && smart_count == 0 && !self.smart_fallback {
                        self.smart_fallback = true;
                        let qname = self.qname
                            .clone()
                            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

                        let query = self.mkquery(&qname.anchor(), RecordType::A, DnsClass::IN)?;
                        self.stack[sp].state = State::Smart1A;
                        self.push_frame(sp, query);
                        continue;
                    }

                    self.stack[sp].state = State::Done;
                }

                State::Smart1A => {
                    {
                        let (head, tail) = self.stack.split_at_mut(sp + 1);
                        let frame = &mut head[sp];
                        let child = &tail[0];

                        if let (Some(parent_answer), Some(child_answer)) =
                            (frame.answer.as_mut(), child.answer.as_ref())
                        {
                            let mut iter = RrIter::new(
                                RrFilter::new()
                                    .sections(SectionSet::ANSWER)
                                    .rr_type(RecordType::A),
                            );
                            while let Some(rr) = iter.next(child_answer) {
                                let mut lifted = rr;
                                lifted.section = Section::Additional;
                                if lifted.exists_in(child_answer, parent_answer) {
                                    continue;
                                }

                                rr.copy_to(child_answer, parent_answer, Section::Additional)
                                    .map_err(ResolveError::from)?;
                            }
                        }

                        frame.state = State::Smart0A;
                    }
                }

                State::Done => {
                    if sp > 0 {
                        self.sp = sp - 1;
                        continue;
                    }

                    return Ok(Async::Ready(()));
                }

                State::Servfail => {
                    let mut answer = match self.stack[sp].query {
                        Some(ref query) => query.clone(),
                        None => {
                            let qname = self.qname
                                .clone()
                                .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
                            let mut packet = Packet::new(QUERY_BUF_SIZE);
                            packet
                                .push_question(&qname.anchor(), self.qtype, self.qclass)
                                .map_err(ResolveError::from)?;
                            packet
                        }
                    };

                    warn!("answering SERVFAIL at depth {}", sp);
                    answer.set_response(true);
                    answer.set_response_code(ResponseCode::ServFail);

                    self.stack[sp].answer = Some(answer);
                    self.stack[sp].state = State::Done;
                }
            }
        }
    }

    /// Builds a question packet; RD asks the servers to recurse
    /// exactly when this engine will not.
    fn mkquery(
        &self,
        qname: &Name,
        qtype: RecordType,
        qclass: DnsClass,
    ) -> ResolveResult<Packet> {
        let mut query = Packet::new(QUERY_BUF_SIZE);
        query
            .push_question(qname, qtype, qclass)
            .map_err(ResolveError::from)?;
        query.set_recursion_desired(!self.resconf.options.recurse);
        Ok(query)
    }

    fn nonzero_seed(&mut self) -> u32 {
        loop {
            let seed = self.rng.next_u32();
            if seed != 0 {
                return seed;
            }
        }
    }

    /// The host named by the nameserver record the iteration is
    /// positioned on.
    fn current_ns_host(&self, sp: usize) -> ResolveResult<Name> {
        let frame = &self.stack[sp];
        let hints = frame
            .hints
            .as_ref()
            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;
        let rr = frame
            .hints_ns
            .ok_or_else(|| ResolveError::from(ResolveErrorKind::NoQuestion))?;

        match rr.rdata(hints).map_err(ResolveError::from)? {
            RData::NS(host) => Ok(host),
            _ => {
                let e: ::proto::error::ProtoError = ::proto::error::ProtoErrorKind::Illegal(
                    "nameserver record without ns rdata",
                ).into();
                Err(e.into())
            }
        }
    }

    /// Resets the frame above `sp`, arms it with `query`, and drops
    /// into it.
    fn push_frame(&mut self, sp: usize, query: Packet) {
        self.stack[sp + 1] = Frame::default();
        self.stack[sp + 1].query = Some(query);
        self.sp = sp + 1;
    }

    /// Answers a child frame's question from records already collected
    /// by any active frame, trying the question itself first and a
    /// CNAME for it second.
    fn glue_answer(&self, query: &Packet) -> Option<Packet> {
        let question = Question::parse(query).ok()?;

        let mut glue = Packet::new(QUERY_BUF_SIZE);
        glue.push_question(&question.name, question.query_type, question.query_class)
            .ok()?;

        for rr_type in [question.query_type, RecordType::CNAME].iter() {
            for sp in 0..(self.sp + 1) {
                let answer = match self.stack[sp].answer {
                    Some(ref answer) => answer,
                    None => continue,
                };

                let mut iter = RrIter::new(
                    RrFilter::new()
                        .sections(SectionSet::ANSWERING)
                        .rr_type(*rr_type)
                        .name(question.name.clone()),
                );
                while let Some(rr) = iter.next(answer) {
                    rr.copy_to(answer, &mut glue, Section::Answer).ok()?;
                }
            }

            if glue.count(Section::Answer) > 0 {
                return Some(glue);
            }
        }

        None
    }
}

impl ::std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Resolver")
            .field("qname", &self.qname)
            .field("qtype", &self.qtype)
            .field("sp", &self.sp)
            .field("state", &self.stack[self.sp].state)
            .finish()
    }
}

/// Merges two answers into a fresh packet: the first packet's question,
/// then every non-question record of both, deduplicated by canonical
/// equality. Grows and retries up to the 64 KiB wire limit.
fn merge(p0: &Packet, p1: &Packet) -> ResolveResult<Packet> {
    let mut bufsiz = p0.len() + p1.len();

    loop {
        let mut merged = Packet::new(bufsiz);
        match try_merge(p0, p1, &mut merged) {
            Ok(()) => return Ok(merged),
            Err(ref e) if e.is_no_bufs() && bufsiz < MAX_PACKET => {
                bufsiz = MAX_PACKET;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn try_merge(
    p0: &Packet,
    p1: &Packet,
    merged: &mut Packet,
) -> ::proto::error::ProtoResult<()> {
    let mut questions = RrIter::new(RrFilter::new().sections(SectionSet::QUESTION));
    while let Some(rr) = questions.next(p0) {
        rr.copy_to(p0, merged, Section::Question)?;
    }

    for &section in [Section::Answer, Section::Authority, Section::Additional].iter() {
        for &packet in [p0, p1].iter() {
            let mut iter = RrIter::new(RrFilter::new().sections(section));
            while let Some(rr) = iter.next(packet) {
                if is_duplicate(&rr, packet, merged) {
                    continue;
                }

                rr.copy_to(packet, merged, section)?;
            }
        }
    }

    Ok(())
}

/// True if a record of the same type comparing canonically equal
/// already sits in any answering section of `merged`.
fn is_duplicate(rr: &Rr, packet: &Packet, merged: &Packet) -> bool {
    let mut iter = RrIter::new(
        RrFilter::new()
            .sections(SectionSet::ANSWERING)
            .rr_type(rr.rr_type),
    );
    while let Some(candidate) = iter.next(merged) {
        if Rr::canonical_cmp(rr, packet, &candidate, merged) == ::std::cmp::Ordering::Equal {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn answer_with_a(name: &str, addrs: &[Ipv4Addr]) -> Packet {
        let name = Name::from_str(name).unwrap();
        let mut packet = Packet::new(512);
        packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap();
        for addr in addrs {
            packet
                .push(
                    Section::Answer,
                    &name,
                    RecordType::A,
                    DnsClass::IN,
                    60,
                    &RData::A(*addr),
                )
                .unwrap();
        }
        packet
    }

    #[test]
    fn merge_deduplicates_by_canonical_equality() {
        let a = answer_with_a(
            "host.example.com.",
            &[Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)],
        );
        let b = answer_with_a(
            "host.example.com.",
            &[Ipv4Addr::new(192, 0, 2, 2), Ipv4Addr::new(192, 0, 2, 3)],
        );

        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.count(Section::Question), 1);
        assert_eq!(merged.count(Section::Answer), 3);
    }

    #[test]
    fn merge_grows_past_the_initial_buffer() {
        // enough distinct records that the sum-of-lengths first guess
        // still fits, but a tiny target would not
        let mut addrs_a = Vec::new();
        let mut addrs_b = Vec::new();
        for i in 0..20 {
            addrs_a.push(Ipv4Addr::new(192, 0, 2, i));
            addrs_b.push(Ipv4Addr::new(198, 51, 100, i));
        }

        let a = answer_with_a("host.example.com.", &addrs_a);
        let b = answer_with_a("host.example.com.", &addrs_b);

        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.count(Section::Answer), 40);
    }
}
