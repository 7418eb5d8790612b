// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Monotonic time as an injectable capability.
//!
//! The resolver measures elapsed time against whatever `Clock` it was
//! constructed with, so tests can advance time without sleeping.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

lazy_static! {
    static ref EPOCH: Instant = Instant::now();
}

/// A monotonic clock. `now` is measured from an arbitrary fixed epoch;
/// only differences are meaningful.
pub trait Clock: Send + Sync {
    /// Time since the clock's epoch.
    fn now(&self) -> Duration;
}

impl fmt::Debug for dyn Clock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Clock({:?})", self.now())
    }
}

/// The process-wide monotonic clock, anchored at first use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        EPOCH.elapsed()
    }
}

/// A clock that only moves when told to, in whole seconds.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU64,
}

impl ManualClock {
    /// A clock stopped at `seconds` past its epoch.
    pub fn new(seconds: u64) -> ManualClock {
        ManualClock {
            seconds: AtomicU64::new(seconds),
        }
    }

    /// Advance the clock.
    pub fn advance(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_secs(self.seconds.load(Ordering::SeqCst))
    }
}
