// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Resource record related components, e.g. `Name` aka label, record data aka `RData`

pub mod dns_class;
pub mod iterator;
pub mod name;
pub mod rdata;
pub mod record;
pub mod record_data;
pub mod record_type;
pub mod section;

pub use self::dns_class::DnsClass;
pub use self::iterator::{RrFilter, RrIter, SortBy};
pub use self::name::Name;
pub use self::record::{Rr, Span};
pub use self::record_data::RData;
pub use self::record_type::RecordType;
pub use self::section::{Section, SectionSet};
