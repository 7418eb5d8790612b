// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![allow(missing_docs)]

error_chain! {
    types {
        ProtoError, ProtoErrorKind, ProtoResultExt, ProtoResult;
    }

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        /// The target buffer cannot hold the encoding.
        NoBufs {
            description("buffer too small for encoding")
            display("buffer too small for encoding")
        }

        /// Malformed wire data: truncated record, bad length, reserved
        /// label type, or a compression pointer that leaves the packet.
        Illegal(what: &'static str) {
            description("malformed wire data")
            display("malformed wire data: {}", what)
        }

        /// An answer did not match the outstanding question, or an
        /// operation was invoked in a state that cannot satisfy it.
        Unknown(what: &'static str) {
            description("unexpected answer or state")
            display("unexpected answer or state: {}", what)
        }

        /// A label exceeded the 63 octet limit.
        LabelTooLong(len: usize) {
            description("label exceeds 63 octets")
            display("label of {} octets exceeds the 63 octet limit", len)
        }

        /// An assembled domain name exceeded the 255 octet limit.
        NameTooLong(len: usize) {
            description("domain name exceeds 255 octets")
            display("domain name of {} octets exceeds the 255 octet limit", len)
        }

        /// Too many compression pointers were chased while expanding a
        /// name; the packet almost certainly contains a pointer loop.
        PointerLoop {
            description("compression pointer chase limit exceeded")
            display("compression pointer chase limit exceeded")
        }
    }
}

impl ProtoError {
    /// True if this error is the out-of-buffer condition, which callers
    /// on the merge path treat as an invitation to grow and retry.
    pub fn is_no_bufs(&self) -> bool {
        match *self.kind() {
            ProtoErrorKind::NoBufs => true,
            _ => false,
        }
    }
}
