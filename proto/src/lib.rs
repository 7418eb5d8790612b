// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![deny(missing_docs)]
#![recursion_limit = "1024"]

//! Wren-DNS Protocol library.
//!
//! The wire codec (packets, domain names, resource records), the keyed
//! transaction-id permutor, and the restartable single-query transport
//! driver. Nothing in this crate blocks: every operation that would wait
//! on the network is expressed as a poll returning `Async::NotReady`,
//! with the file descriptor to wait on exposed through `pollin`/`pollout`.

extern crate byteorder;
#[macro_use]
extern crate error_chain;
extern crate futures;
#[macro_use]
extern crate lazy_static;
extern crate libc;
#[macro_use]
extern crate log;
extern crate rand;
extern crate socket2;

pub mod clock;
pub mod error;
pub mod op;
pub mod rr;
pub mod serialize;
pub mod xfer;

pub use clock::{Clock, SystemClock};
pub use op::Packet;
pub use rr::Name;
