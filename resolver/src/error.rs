// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![allow(missing_docs)]

error_chain! {
    types {
        ResolveError, ResolveErrorKind, ResolveResultExt, ResolveResult;
    }

    links {
        Proto(::proto::error::ProtoError, ::proto::error::ProtoErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        /// `fetch` before the engine reached its done state, or some
        /// other out-of-order use of the handle.
        NotReady {
            description("resolution is not complete")
            display("resolution is not complete")
        }

        /// The engine was driven without a submitted question.
        NoQuestion {
            description("no question submitted")
            display("no question submitted")
        }
    }
}
