// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! domain names: the dot-separated text form and the label-encoded wire form

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use error::*;
use op::Packet;

/// Longest assembled domain name, in octets.
pub const MAX_NAME: usize = 255;
/// Longest single label, in octets.
pub const MAX_LABEL: usize = 63;
/// Compression pointers chased before a name is declared cyclic.
pub const MAX_POINTERS: usize = 127;

/// A domain name in dot-separated text form.
///
/// A name carrying a trailing dot is *anchored* (absolute). Comparison,
/// ordering and hashing ignore ASCII case and anchoring, per the
/// case-insensitivity rules of RFC 1035, so `Name` can key tables and
/// match wire data without normalizing first.
#[derive(Debug, Clone)]
pub struct Name {
    inner: String,
}

impl Name {
    /// The root name, `.`.
    pub fn root() -> Name {
        Name {
            inner: ".".to_string(),
        }
    }

    /// True if this is the root name.
    pub fn is_root(&self) -> bool {
        self.inner == "."
    }

    /// True if the name carries its trailing dot.
    pub fn is_anchored(&self) -> bool {
        self.inner.ends_with('.')
    }

    /// The name with a trailing dot, making it absolute.
    pub fn anchor(&self) -> Name {
        if self.is_anchored() {
            self.clone()
        } else {
            Name {
                inner: format!("{}.", self.inner),
            }
        }
    }

    /// Drops the leftmost label. Yields `None` once there is nothing
    /// left to cleave, i.e. for the root and for single labels without
    /// an anchor.
    pub fn cleave(&self) -> Option<Name> {
        let s = &self.inner;
        if s.len() <= 1 {
            return None;
        }

        match s[1..].find('.') {
            None => None,
            Some(i) => {
                let dot = 1 + i;
                if dot + 1 < s.len() {
                    Some(Name {
                        inner: s[dot + 1..].to_string(),
                    })
                } else {
                    Some(Name::root())
                }
            }
        }
    }

    /// This name anchored and suffixed with `domain`, e.g.
    /// `www` + `example.com.` = `www.example.com.`.
    pub fn append_domain(&self, domain: &Name) -> Name {
        if self.is_root() {
            return domain.clone();
        }

        Name {
            inner: format!("{}{}", self.anchor().inner, domain.inner),
        }
    }

    /// The number of dots in the text form, as written. This is the
    /// quantity the `ndots` option thresholds against.
    pub fn dots(&self) -> usize {
        self.inner.bytes().filter(|&b| b == b'.').count()
    }

    /// The labels of the name, leftmost first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.inner.split('.').filter(|label| !label.is_empty())
    }

    /// The text form as given.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// The length of the text form.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True for the (invalid) empty name.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Encodes the name as uncompressed wire labels, with validation of
    /// the label and name length limits.
    pub fn to_wire(&self) -> ProtoResult<Vec<u8>> {
        if self.inner.is_empty() {
            return Err(ProtoErrorKind::Illegal("empty domain name").into());
        }

        let mut wire = Vec::with_capacity(self.inner.len() + 2);
        for label in self.labels() {
            if label.len() > MAX_LABEL {
                return Err(ProtoErrorKind::LabelTooLong(label.len()).into());
            }

            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);

        if wire.len() > MAX_NAME {
            return Err(ProtoErrorKind::NameTooLong(wire.len()).into());
        }

        Ok(wire)
    }

    /// Expands the name at `offset` of `packet`, transparently chasing
    /// compression pointers. The result is always anchored.
    pub fn expand(packet: &Packet, offset: usize) -> ProtoResult<Name> {
        expand_from(packet.wire(), packet.len(), offset)
    }

    fn normalized(&self) -> String {
        let s = if self.inner.len() > 1 && self.inner.ends_with('.') {
            &self.inner[..self.inner.len() - 1]
        } else {
            &self.inner[..]
        };
        s.to_ascii_lowercase()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Name) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl FromStr for Name {
    type Err = ProtoError;

    fn from_str(s: &str) -> ProtoResult<Name> {
        if s.is_empty() {
            return Err(ProtoErrorKind::Illegal("empty domain name").into());
        }

        Ok(Name {
            inner: s.to_string(),
        })
    }
}

impl<'a> From<&'a str> for Name {
    fn from(s: &'a str) -> Name {
        Name {
            inner: s.to_string(),
        }
    }
}

/// One step of label-wise traversal: the byte range of the next label
/// and the offset following it, with compression pointers followed
/// transparently. `Ok(None)` is the terminal zero label.
pub(crate) fn next_label(
    data: &[u8],
    end: usize,
    src: usize,
) -> ProtoResult<Option<(usize, usize, usize)>> {
    let mut src = src;
    let mut nptrs = 0;

    loop {
        if src >= end {
            return Err(ProtoErrorKind::Illegal("name runs off the packet").into());
        }

        match 0x03 & (data[src] >> 6) {
            0x00 => {
                let len = (0x3f & data[src]) as usize;
                if len == 0 {
                    return Ok(None);
                }

                if end - (src + 1) < len {
                    return Err(ProtoErrorKind::Illegal("label runs off the packet").into());
                }

                return Ok(Some((src + 1, len, src + 1 + len)));
            }
            0x03 => {
                nptrs += 1;
                if nptrs > MAX_POINTERS {
                    return Err(ProtoErrorKind::PointerLoop.into());
                }

                if end - src < 2 {
                    return Err(ProtoErrorKind::Illegal("truncated pointer").into());
                }

                src = (((0x3f & data[src]) as usize) << 8) | data[src + 1] as usize;
            }
            _ => return Err(ProtoErrorKind::Illegal("reserved label type").into()),
        }
    }
}

/// Expands a name from raw wire bytes into anchored text form.
pub(crate) fn expand_from(data: &[u8], end: usize, src: usize) -> ProtoResult<Name> {
    let mut out = String::new();
    let mut src = src;
    let mut nptrs = 0;

    loop {
        if src >= end {
            return Err(ProtoErrorKind::Illegal("name runs off the packet").into());
        }

        match 0x03 & (data[src] >> 6) {
            0x00 => {
                let len = (0x3f & data[src]) as usize;
                if len == 0 {
                    if out.is_empty() {
                        out.push('.');
                    }

                    return Ok(Name { inner: out });
                }

                src += 1;
                if end - src < len {
                    return Err(ProtoErrorKind::Illegal("label runs off the packet").into());
                }

                out.push_str(&String::from_utf8_lossy(&data[src..src + len]));
                out.push('.');
                src += len;
                nptrs = 0;

                if out.len() > MAX_NAME {
                    return Err(ProtoErrorKind::NameTooLong(out.len()).into());
                }
            }
            0x03 => {
                nptrs += 1;
                if nptrs > MAX_POINTERS {
                    return Err(ProtoErrorKind::PointerLoop.into());
                }

                if end - src < 2 {
                    return Err(ProtoErrorKind::Illegal("truncated pointer").into());
                }

                src = (((0x3f & data[src]) as usize) << 8) | data[src + 1] as usize;
            }
            _ => return Err(ProtoErrorKind::Illegal("reserved label type").into()),
        }
    }
}

/// The offset just past the name starting at `src`: after the terminal
/// zero for a run of direct labels, or after the first pointer.
pub(crate) fn skip_name(data: &[u8], end: usize, src: usize) -> ProtoResult<usize> {
    let mut src = src;

    while src < end {
        match 0x03 & (data[src] >> 6) {
            0x00 => {
                let len = (0x3f & data[src]) as usize;
                src += 1;
                if len == 0 {
                    return Ok(src);
                }

                if end - src < len {
                    break;
                }

                src += len;
            }
            0x03 => {
                if end - src < 2 {
                    break;
                }

                return Ok(src + 2);
            }
            _ => break,
        }
    }

    Err(ProtoErrorKind::Illegal("unterminated name").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_is_idempotent() {
        let name = Name::from("www.example.com");
        assert_eq!(name.anchor().as_str(), "www.example.com.");
        assert_eq!(name.anchor().anchor(), name.anchor());
    }

    #[test]
    fn cleave_drops_leftmost_label() {
        let name = Name::from("www.example.com.");
        let rest = name.cleave().unwrap();
        assert_eq!(rest.as_str(), "example.com.");
        assert_eq!(rest.cleave().unwrap().as_str(), "com.");
        assert_eq!(rest.cleave().unwrap().cleave().unwrap().as_str(), ".");
        assert!(Name::root().cleave().is_none());
        assert!(Name::from("www").cleave().is_none());
    }

    #[test]
    fn comparison_ignores_case_and_anchor() {
        assert_eq!(Name::from("WWW.Example.COM"), Name::from("www.example.com."));
        assert_ne!(Name::from("www.example.com"), Name::from("example.com"));
    }

    #[test]
    fn dots_counts_literal_dots() {
        assert_eq!(Name::from("www").dots(), 0);
        assert_eq!(Name::from("a.b").dots(), 1);
        assert_eq!(Name::from("a.b.").dots(), 2);
    }

    #[test]
    fn to_wire_round_trips() {
        let name = Name::from("a.bc");
        let wire = name.to_wire().unwrap();
        assert_eq!(wire, vec![1, b'a', 2, b'b', b'c', 0]);

        let expanded = expand_from(&wire, wire.len(), 0).unwrap();
        assert_eq!(expanded, name);
        assert_eq!(expanded.as_str(), "a.bc.");
    }

    #[test]
    fn root_encodes_to_a_single_zero() {
        assert_eq!(Name::root().to_wire().unwrap(), vec![0]);
    }

    #[test]
    fn oversized_label_is_rejected() {
        let label = "x".repeat(64);
        let err = Name::from(&label[..]).to_wire().unwrap_err();
        match *err.kind() {
            ProtoErrorKind::LabelTooLong(64) => {}
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn oversized_name_is_rejected() {
        let name = vec!["label"; 50].join(".");
        assert!(Name::from(&name[..]).to_wire().is_err());
    }

    #[test]
    fn pointer_loop_is_detected() {
        // a pointer that points at itself
        let wire = [0xc0, 0x00];
        let err = expand_from(&wire, wire.len(), 0).unwrap_err();
        match *err.kind() {
            ProtoErrorKind::PointerLoop => {}
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn pointer_past_end_is_illegal() {
        // pointer target beyond the buffer end
        let wire = [0xc0, 0x10];
        assert!(expand_from(&wire, wire.len(), 0).is_err());
    }
}
