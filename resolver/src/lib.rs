// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![deny(missing_docs)]
#![recursion_limit = "1024"]

//! The Wren-DNS resolver engine.
//!
//! A stateless resolution library for single-threaded event loops.
//! Given a question, the engine consults the hosts table and the
//! configured nameservers, or iterates from the root hints, according
//! to the configured lookup order, and yields a verified answer packet.
//! Nothing blocks: `check` returns `Async::NotReady` at every point
//! that waits on the network, and `pollin`/`pollout` expose the
//! descriptor to wait on.
//!
//! ```no_run
//! extern crate futures;
//! extern crate wren_dns_proto;
//! extern crate wren_dns_resolver;
//!
//! use std::sync::Arc;
//! use futures::Async;
//! use wren_dns_proto::rr::{DnsClass, Name, RecordType};
//! use wren_dns_resolver::{Hints, Hosts, ResolvConf, Resolver};
//!
//! fn main() {
//!     let resconf = Arc::new(ResolvConf::default());
//!     let hosts = Arc::new(Hosts::new());
//!     let hints = Arc::new(Hints::root());
//!
//!     let mut resolver = Resolver::open(resconf, hosts, hints).unwrap();
//!     resolver
//!         .submit(&Name::from("www.example.com"), RecordType::A, DnsClass::IN)
//!         .unwrap();
//!
//!     loop {
//!         match resolver.check().unwrap() {
//!             Async::Ready(()) => break,
//!             Async::NotReady => { /* poll resolver.pollin()/pollout() */ }
//!         }
//!     }
//!
//!     let answer = resolver.fetch().unwrap();
//!     println!("{:?}", answer);
//! }
//! ```

#[macro_use]
extern crate error_chain;
extern crate futures;
#[macro_use]
extern crate log;
extern crate rand;
extern crate resolv_conf;
extern crate smallvec;
extern crate wren_dns_proto as proto;

pub mod config;
pub mod error;
pub mod hints;
pub mod hosts;
mod resolver;
pub mod system_conf;

pub use config::{LookupSource, ResolvConf, ResolverOpts};
pub use error::{ResolveError, ResolveErrorKind, ResolveResult};
pub use hints::Hints;
pub use hosts::Hosts;
pub use resolver::Resolver;
