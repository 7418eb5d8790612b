// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNS high level transit implementations.

pub mod permutor;
pub mod query_socket;

pub use self::permutor::Permutor;
pub use self::query_socket::{QuerySocket, Transport};
