// Copyright 2015-2018 The wren-dns project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The DNS message as a bounded wire buffer.

use error::*;
use op::header::Header;
use op::response_code::ResponseCode;
use rr::name::{self, Name};
use rr::record::Rr;
use rr::record_data::RData;
use rr::section::{Section, SectionSet};
use rr::{DnsClass, RecordType};

/// Bytes occupied by the fixed message header.
pub const HEADER_LEN: usize = 12;

/// Default size for query packets.
pub const QUERY_BUF_SIZE: usize = 512;

/// Largest packet the merge path will grow to, the TCP framing limit.
pub const MAX_PACKET: usize = 65535;

const DICT_SIZE: usize = 16;

/// A DNS message under construction or parse.
///
/// The buffer has a fixed logical size chosen at init; pushes that do
/// not fit fail with `NoBufs` and leave the packet unchanged. Bytes
/// `[0, end)` always form a syntactically valid message whose header
/// counts match the records reachable by scanning from offset 12.
///
/// Owner names pushed into the packet are remembered in a small
/// dictionary of offsets so later names can be compressed down to a
/// back-pointer to their longest already-written suffix.
#[derive(Clone)]
pub struct Packet {
    buf: Vec<u8>,
    end: usize,
    dict: [u16; DICT_SIZE],
}

impl Packet {
    /// A packet of logical size `size` (at least the header length),
    /// holding an all-zero header.
    pub fn new(size: usize) -> Packet {
        let size = ::std::cmp::max(size, HEADER_LEN);
        Packet {
            buf: vec![0; size],
            end: HEADER_LEN,
            dict: [0; DICT_SIZE],
        }
    }

    /// Adopts received wire bytes. The compression dictionary starts
    /// empty; the header counts are whatever the peer sent.
    pub fn from_bytes(bytes: &[u8]) -> ProtoResult<Packet> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtoErrorKind::Illegal("short packet").into());
        }

        let mut packet = Packet::new(bytes.len());
        packet.buf.copy_from_slice(bytes);
        packet.end = bytes.len();
        Ok(packet)
    }

    /// The message bytes written so far.
    pub fn wire(&self) -> &[u8] {
        &self.buf[..self.end]
    }

    /// The length of the message written so far.
    pub fn len(&self) -> usize {
        self.end
    }

    /// True if nothing follows the header.
    pub fn is_empty(&self) -> bool {
        self.end <= HEADER_LEN
    }

    /// The logical buffer size.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Grows the logical buffer size. Existing content is preserved.
    pub fn grow(&mut self, size: usize) {
        if size > self.buf.len() {
            self.buf.resize(size, 0);
        }
    }

    pub(crate) fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub(crate) fn set_wire_len(&mut self, len: usize) {
        debug_assert!(len <= self.buf.len());
        self.end = len;
        self.dict = [0; DICT_SIZE];
    }

    // ===== header accessors =====

    /// The transaction id.
    pub fn id(&self) -> u16 {
        ((self.buf[0] as u16) << 8) | self.buf[1] as u16
    }

    /// Sets the transaction id.
    pub fn set_id(&mut self, id: u16) {
        self.buf[0] = (id >> 8) as u8;
        self.buf[1] = id as u8;
    }

    /// QR: true for responses.
    pub fn is_response(&self) -> bool {
        self.buf[2] & 0x80 != 0
    }

    /// Sets the QR bit.
    pub fn set_response(&mut self, response: bool) {
        self.set_flag(2, 0x80, response)
    }

    /// AA: the answer is authoritative.
    pub fn authoritative(&self) -> bool {
        self.buf[2] & 0x04 != 0
    }

    /// Sets the AA bit.
    pub fn set_authoritative(&mut self, authoritative: bool) {
        self.set_flag(2, 0x04, authoritative)
    }

    /// TC: the message was truncated by the transport.
    pub fn truncated(&self) -> bool {
        self.buf[2] & 0x02 != 0
    }

    /// Sets the TC bit.
    pub fn set_truncated(&mut self, truncated: bool) {
        self.set_flag(2, 0x02, truncated)
    }

    /// RD: recursion desired.
    pub fn recursion_desired(&self) -> bool {
        self.buf[2] & 0x01 != 0
    }

    /// Sets the RD bit.
    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.set_flag(2, 0x01, rd)
    }

    /// RA: recursion available.
    pub fn recursion_available(&self) -> bool {
        self.buf[3] & 0x80 != 0
    }

    /// Sets the RA bit.
    pub fn set_recursion_available(&mut self, ra: bool) {
        self.set_flag(3, 0x80, ra)
    }

    /// The 4-bit opcode.
    pub fn op_code(&self) -> ::op::OpCode {
        ::op::OpCode::from((self.buf[2] >> 3) & 0x0f)
    }

    /// The response code.
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.buf[3] & 0x0f)
    }

    /// Sets the response code.
    pub fn set_response_code(&mut self, rcode: ResponseCode) {
        self.buf[3] = (self.buf[3] & 0xf0) | (u8::from(rcode) & 0x0f);
    }

    fn set_flag(&mut self, byte: usize, mask: u8, on: bool) {
        if on {
            self.buf[byte] |= mask;
        } else {
            self.buf[byte] &= !mask;
        }
    }

    /// A parsed copy of the header.
    pub fn header(&self) -> Header {
        Header::read(self)
    }

    /// The record count of one section.
    pub fn count(&self, section: Section) -> u16 {
        let off = match section {
            Section::Question => 4,
            Section::Answer => 6,
            Section::Authority => 8,
            Section::Additional => 10,
        };
        ((self.buf[off] as u16) << 8) | self.buf[off + 1] as u16
    }

    /// The total record count over a set of sections.
    pub fn count_set(&self, set: SectionSet) -> usize {
        let mut total = 0;
        for &section in [
            Section::Question,
            Section::Answer,
            Section::Authority,
            Section::Additional,
        ].iter()
        {
            if set.contains(section) {
                total += self.count(section) as usize;
            }
        }
        total
    }

    fn add_count(&mut self, section: Section, n: u16) {
        let count = self.count(section) + n;
        let off = match section {
            Section::Question => 4,
            Section::Answer => 6,
            Section::Authority => 8,
            Section::Additional => 10,
        };
        self.buf[off] = (count >> 8) as u8;
        self.buf[off + 1] = count as u8;
    }

    /// The section the record at `offset` belongs to, derived from its
    /// position relative to the header counts.
    pub fn section_of(&self, offset: usize) -> Section {
        let mut rp = HEADER_LEN;
        let mut index = 0;
        while rp < offset && rp < self.end {
            rp = Rr::skip(self, rp);
            index += 1;
        }

        let mut count = 0;
        for &section in [
            Section::Question,
            Section::Answer,
            Section::Authority,
            Section::Additional,
        ].iter()
        {
            count += self.count(section) as usize;
            if index < count {
                return section;
            }
        }
        Section::Additional
    }

    // ===== appending =====

    /// Appends a question record and bumps QDCOUNT. On failure the
    /// packet is unchanged.
    pub fn push_question(
        &mut self,
        name: &Name,
        rr_type: RecordType,
        class: DnsClass,
    ) -> ProtoResult<()> {
        let end = self.end;
        let dict = self.dict;

        let result = self.push_question_(name, rr_type, class);
        if result.is_err() {
            self.end = end;
            self.dict = dict;
        }
        result
    }

    fn push_question_(
        &mut self,
        name: &Name,
        rr_type: RecordType,
        class: DnsClass,
    ) -> ProtoResult<()> {
        self.push_name(name)?;
        self.emit_u16(u16::from(rr_type))?;
        self.emit_u16(u16::from(class))?;
        self.add_count(Section::Question, 1);
        Ok(())
    }

    /// Appends a resource record and bumps the section count. The ttl
    /// top bit is forced to zero. On failure the packet is unchanged.
    pub fn push(
        &mut self,
        section: Section,
        name: &Name,
        rr_type: RecordType,
        class: DnsClass,
        ttl: u32,
        rdata: &RData,
    ) -> ProtoResult<()> {
        if section == Section::Question {
            return Err(ProtoErrorKind::Unknown("rdata in the question section").into());
        }

        let end = self.end;
        let dict = self.dict;

        let result = self.push_(section, name, rr_type, class, ttl, rdata);
        if result.is_err() {
            self.end = end;
            self.dict = dict;
        }
        result
    }

    fn push_(
        &mut self,
        section: Section,
        name: &Name,
        rr_type: RecordType,
        class: DnsClass,
        ttl: u32,
        rdata: &RData,
    ) -> ProtoResult<()> {
        self.push_name(name)?;
        self.emit_u16(u16::from(rr_type))?;
        self.emit_u16(u16::from(class))?;
        self.emit_u32(ttl & 0x7fff_ffff)?;
        rdata.emit(self)?;
        self.add_count(section, 1);
        Ok(())
    }

    /// Writes `name` at the end cursor, compressed against the
    /// dictionary: the longest case-insensitive suffix already present
    /// in the packet is replaced by a two-byte back-pointer, and the
    /// name's own offset is remembered for later pushes.
    pub(crate) fn push_name(&mut self, name: &Name) -> ProtoResult<()> {
        let mut wire = name.to_wire()?;
        let dn = self.end;

        if let Some((truncate_at, target)) = self.find_suffix(&wire)? {
            wire.truncate(truncate_at);
            wire.push(0xc0 | (target >> 8) as u8);
            wire.push(target as u8);
        }

        self.emit_slice(&wire)?;
        self.dict_add(dn);
        Ok(())
    }

    /// Writes `name` as plain labels, no compression, no dictionary.
    pub(crate) fn push_name_uncompressed(&mut self, name: &Name) -> ProtoResult<()> {
        let wire = name.to_wire()?;
        self.emit_slice(&wire)
    }

    /// The longest suffix of `wire` (a label-encoded name) that matches
    /// a name reachable from the dictionary, as (offset into `wire`,
    /// pointer target).
    fn find_suffix(&self, wire: &[u8]) -> ProtoResult<Option<(usize, u16)>> {
        let mut a_p = 0;
        while wire[a_p] != 0 {
            for i in 0..DICT_SIZE {
                let entry = self.dict[i] as usize;
                if entry == 0 {
                    break;
                }

                let mut b_p = entry;
                loop {
                    if b_p <= 0x3fff && self.tails_equal(wire, a_p, b_p)? {
                        return Ok(Some((a_p, b_p as u16)));
                    }

                    match name::next_label(self.wire(), self.end, b_p)? {
                        Some((_, _, next)) => b_p = next,
                        None => break,
                    }
                }
            }

            a_p += 1 + wire[a_p] as usize;
        }

        Ok(None)
    }

    /// Label-wise comparison of the tail of `wire` at `a_p` against the
    /// packet name at `b_p`, following pointers on the packet side.
    fn tails_equal(&self, wire: &[u8], a_p: usize, b_p: usize) -> ProtoResult<bool> {
        let mut a_p = a_p;
        let mut b_p = b_p;

        loop {
            let a = name::next_label(wire, wire.len(), a_p)?;
            let b = name::next_label(self.wire(), self.end, b_p)?;

            match (a, b) {
                (None, None) => return Ok(true),
                (Some((a_start, a_len, a_next)), Some((b_start, b_len, b_next))) => {
                    if a_len != b_len {
                        return Ok(false);
                    }

                    let a_label = &wire[a_start..a_start + a_len];
                    let b_label = &self.buf[b_start..b_start + b_len];
                    if !a_label.eq_ignore_ascii_case(b_label) {
                        return Ok(false);
                    }

                    a_p = a_next;
                    b_p = b_next;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Remembers the owner name at `dn` in the dictionary. If the name
    /// ends in a pointer to an existing entry, that entry is replaced,
    /// since the new name subsumes it as a compression target.
    fn dict_add(&mut self, dn: usize) {
        let mut lp = dn;
        while lp < self.end {
            if self.buf[lp] & 0xc0 == 0xc0 && self.end - lp >= 2 && lp != dn {
                let target =
                    (((0x3f & self.buf[lp]) as u16) << 8) | self.buf[lp + 1] as u16;
                for i in 0..DICT_SIZE {
                    if self.dict[i] == 0 {
                        break;
                    }
                    if self.dict[i] == target {
                        self.dict[i] = dn as u16;
                        return;
                    }
                }
            }

            lp = self.l_skip(lp);
        }

        for i in 0..DICT_SIZE {
            if self.dict[i] == 0 {
                self.dict[i] = dn as u16;
                return;
            }
        }
    }

    /// One in-place label step; pointers, terminals and malformed
    /// labels all end the walk.
    fn l_skip(&self, src: usize) -> usize {
        if src >= self.end {
            return self.end;
        }

        match 0x03 & (self.buf[src] >> 6) {
            0x00 => {
                let len = (0x3f & self.buf[src]) as usize;
                if len > 0 && self.end - (src + 1) >= len {
                    src + 1 + len
                } else {
                    self.end
                }
            }
            _ => self.end,
        }
    }

    // ===== bounded emit primitives =====

    pub(crate) fn emit_u8(&mut self, value: u8) -> ProtoResult<()> {
        self.emit_slice(&[value])
    }

    pub(crate) fn emit_u16(&mut self, value: u16) -> ProtoResult<()> {
        self.emit_slice(&[(value >> 8) as u8, value as u8])
    }

    pub(crate) fn emit_u32(&mut self, value: u32) -> ProtoResult<()> {
        self.emit_slice(&[
            (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ])
    }

    pub(crate) fn emit_slice(&mut self, bytes: &[u8]) -> ProtoResult<()> {
        if self.buf.len() - self.end < bytes.len() {
            return Err(ProtoErrorKind::NoBufs.into());
        }

        self.buf[self.end..self.end + bytes.len()].copy_from_slice(bytes);
        self.end += bytes.len();
        Ok(())
    }

    /// Reserves two bytes to be patched later, e.g. for RDLENGTH, and
    /// returns their offset.
    pub(crate) fn place_u16(&mut self) -> ProtoResult<usize> {
        let place = self.end;
        self.emit_u16(0)?;
        Ok(place)
    }

    pub(crate) fn patch_u16(&mut self, place: usize, value: u16) {
        self.buf[place] = (value >> 8) as u8;
        self.buf[place + 1] = value as u8;
    }
}

impl ::std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header())
            .field("len", &self.end)
            .field("capacity", &self.buf.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr::record_data::RData;
    use rr::{DnsClass, RecordType};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn init_writes_a_zeroed_header() {
        let packet = Packet::new(512);
        assert_eq!(packet.len(), HEADER_LEN);
        assert_eq!(packet.wire(), &[0u8; 12][..]);
    }

    #[test]
    fn push_bumps_exactly_one_count() {
        let mut packet = Packet::new(512);
        let name = Name::from_str("www.example.com.").unwrap();

        packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap();
        assert_eq!(packet.count(Section::Question), 1);
        assert_eq!(packet.count(Section::Answer), 0);

        let end = packet.len();
        packet
            .push(
                Section::Answer,
                &name,
                RecordType::A,
                DnsClass::IN,
                300,
                &RData::A(Ipv4Addr::new(192, 0, 2, 1)),
            )
            .unwrap();
        assert!(packet.len() > end);
        assert_eq!(packet.count(Section::Question), 1);
        assert_eq!(packet.count(Section::Answer), 1);
        assert_eq!(packet.count(Section::Authority), 0);
        assert_eq!(packet.count(Section::Additional), 0);
    }

    #[test]
    fn failed_push_leaves_the_packet_unchanged() {
        let mut packet = Packet::new(24);
        let name = Name::from_str("a-name-that-cannot-possibly-fit.example.com.").unwrap();

        let before = packet.wire().to_vec();
        let err = packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap_err();
        assert!(err.is_no_bufs());
        assert_eq!(packet.wire(), &before[..]);
        assert_eq!(packet.count(Section::Question), 0);
    }

    #[test]
    fn second_name_is_compressed_to_a_pointer() {
        let mut packet = Packet::new(512);
        let first = Name::from_str("ra.rb.rc.").unwrap();
        let second = Name::from_str("rb.rc.").unwrap();
        let third = Name::from_str("z.ra.rb.rc.").unwrap();

        packet
            .push_question(&first, RecordType::A, DnsClass::IN)
            .unwrap();
        // 12 header + 10 name + 4 type/class
        assert_eq!(packet.len(), 26);

        packet
            .push_question(&second, RecordType::A, DnsClass::IN)
            .unwrap();
        // a lone pointer is 2 bytes where the full name would be 7
        assert_eq!(packet.len(), 32);

        packet
            .push_question(&third, RecordType::A, DnsClass::IN)
            .unwrap();
        // one new label plus a pointer to the whole of `first`
        assert_eq!(packet.len(), 40);

        assert_eq!(Name::expand(&packet, 12).unwrap(), first);
        assert_eq!(Name::expand(&packet, 26).unwrap(), second);
        assert_eq!(Name::expand(&packet, 32).unwrap(), third);
    }

    #[test]
    fn compression_is_case_insensitive() {
        let mut packet = Packet::new(512);
        packet
            .push_question(
                &Name::from_str("host.EXAMPLE.com.").unwrap(),
                RecordType::A,
                DnsClass::IN,
            )
            .unwrap();

        let before = packet.len();
        packet
            .push_question(
                &Name::from_str("example.COM.").unwrap(),
                RecordType::A,
                DnsClass::IN,
            )
            .unwrap();
        // pointer (2) + type/class (4)
        assert_eq!(packet.len(), before + 6);
    }

    #[test]
    fn ttl_top_bit_is_forced_to_zero() {
        let mut packet = Packet::new(512);
        let name = Name::from_str("example.com.").unwrap();
        packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap();
        packet
            .push(
                Section::Answer,
                &name,
                RecordType::A,
                DnsClass::IN,
                0xffff_ffff,
                &RData::A(Ipv4Addr::new(192, 0, 2, 1)),
            )
            .unwrap();

        let off = ::rr::record::Rr::skip(&packet, HEADER_LEN);
        let rr = ::rr::record::Rr::parse(&packet, off).unwrap();
        assert_eq!(rr.ttl, 0x7fff_ffff);
    }

    #[test]
    fn section_of_classifies_by_position() {
        let mut packet = Packet::new(512);
        let name = Name::from_str("example.com.").unwrap();
        let rdata = RData::A(Ipv4Addr::new(192, 0, 2, 1));

        packet
            .push_question(&name, RecordType::A, DnsClass::IN)
            .unwrap();
        let an = packet.len();
        packet
            .push(Section::Answer, &name, RecordType::A, DnsClass::IN, 0, &rdata)
            .unwrap();
        let ar = packet.len();
        packet
            .push(
                Section::Additional,
                &name,
                RecordType::A,
                DnsClass::IN,
                0,
                &rdata,
            )
            .unwrap();

        assert_eq!(packet.section_of(12), Section::Question);
        assert_eq!(packet.section_of(an), Section::Answer);
        assert_eq!(packet.section_of(ar), Section::Additional);
    }
}
