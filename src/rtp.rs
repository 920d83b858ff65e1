// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handles RTP data as described in
//! [RFC 3550 section 5.1](https://datatracker.ietf.org/doc/html/rfc3550#section-5.1).

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// The length of the fixed RTP header (no CSRCs or extensions).
pub const FIXED_HEADER_LEN: usize = 12;

/// The length of the header extension's own header: 16-bit profile-defined
/// field and 16-bit length in 32-bit words.
const EXTENSION_HEADER_LEN: usize = 4;

const VERSION_SHIFT: u8 = 6;
const PADDING_BIT: u8 = 0b0010_0000;
const EXTENSION_BIT: u8 = 0b0001_0000;
const CSRC_COUNT_MASK: u8 = 0b0000_1111;
const MARKER_BIT: u8 = 0b1000_0000;
const PAYLOAD_TYPE_MASK: u8 = 0b0111_1111;

/// Extension profile written by [`PacketBuilder`]: RFC 8285 one-byte headers.
const ONE_BYTE_EXTENSION_PROFILE: u16 = 0xBEDE;

/// A parsed RTP packet borrowing from the caller's buffer.
///
/// Construction validates only what's needed to locate the payload, then the
/// accessors decode header fields on demand:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Parsing is lenient in the way many cameras require: a CSRC list or
/// extension body which doesn't fit is skipped rather than rejected, and an
/// oversized padding count is ignored. The version field isn't checked.
#[derive(Clone)]
pub struct Packet<'a> {
    /// Full packet data, including headers.
    data: &'a [u8],

    payload_range: Range<usize>,

    /// True iff the CSRC list fit in the packet and so was skipped.
    csrcs_consumed: bool,
}

impl<'a> Packet<'a> {
    /// Parses an RTP packet, locating its payload.
    ///
    /// Fails if `data` is shorter than the fixed header or no payload bytes
    /// remain once the CSRC list, extension, and padding are accounted for.
    pub fn parse(data: &'a [u8]) -> Result<Self, RawPacketError<'a>> {
        if data.len() < FIXED_HEADER_LEN {
            return Err(RawPacketError {
                reason: "too short",
                data,
            });
        }
        let has_padding = (data[0] & PADDING_BIT) != 0;
        let has_extension = (data[0] & EXTENSION_BIT) != 0;
        let csrc_len = 4 * usize::from(data[0] & CSRC_COUNT_MASK);
        let mut pos = FIXED_HEADER_LEN;
        let mut end = data.len();

        let csrcs_consumed = end - pos >= csrc_len;
        if csrcs_consumed {
            pos += csrc_len;
        }

        if has_extension && end - pos >= EXTENSION_HEADER_LEN {
            let words = u16::from_be_bytes([data[pos + 2], data[pos + 3]]);
            let body_len = 4 * usize::from(words);
            pos += EXTENSION_HEADER_LEN;
            if end - pos >= body_len {
                pos += body_len;
            }
        }

        if has_padding && end > pos {
            let padding_len = usize::from(data[end - 1]);
            if end - pos >= padding_len {
                end -= padding_len;
            }
        }

        if end <= pos {
            return Err(RawPacketError {
                reason: "empty payload",
                data,
            });
        }
        Ok(Packet {
            data,
            payload_range: pos..end,
            csrcs_consumed,
        })
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.data[0] >> VERSION_SHIFT
    }

    #[inline]
    pub fn has_padding(&self) -> bool {
        (self.data[0] & PADDING_BIT) != 0
    }

    #[inline]
    pub fn has_extension(&self) -> bool {
        (self.data[0] & EXTENSION_BIT) != 0
    }

    /// Returns the CSRC count as stated in the header, whether or not the list fit.
    #[inline]
    pub fn csrc_count(&self) -> u8 {
        self.data[0] & CSRC_COUNT_MASK
    }

    #[inline]
    pub fn mark(&self) -> bool {
        (self.data[1] & MARKER_BIT) != 0
    }

    #[inline]
    pub fn payload_type(&self) -> u8 {
        self.data[1] & PAYLOAD_TYPE_MASK
    }

    #[inline]
    pub fn sequence_number(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    #[inline]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }

    #[inline]
    pub fn ssrc(&self) -> u32 {
        u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]])
    }

    /// Returns the contributing sources, or nothing if the list was truncated.
    pub fn csrcs(&self) -> impl Iterator<Item = u32> + 'a {
        let data = self.data;
        let list: &'a [u8] = if self.csrcs_consumed {
            let len = 4 * usize::from(self.csrc_count());
            &data[FIXED_HEADER_LEN..FIXED_HEADER_LEN + len]
        } else {
            &[]
        };
        list.chunks_exact(4).map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Returns the raw bytes, including the RTP headers.
    #[inline]
    pub fn raw(&self) -> &'a [u8] {
        self.data
    }

    /// Returns only the payload bytes. Never empty.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let data = self.data;
        &data[self.payload_range.clone()]
    }

    /// Returns the byte offset of the payload within [`Packet::raw`].
    #[inline]
    pub fn payload_offset(&self) -> usize {
        self.payload_range.start
    }

    #[inline]
    pub fn payload_range(&self) -> Range<usize> {
        self.payload_range.clone()
    }
}

impl std::fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("version", &self.version())
            .field("ssrc", &format_args!("{:08x}", self.ssrc()))
            .field("sequence_number", &self.sequence_number())
            .field("timestamp", &self.timestamp())
            .field("payload_type", &self.payload_type())
            .field("mark", &self.mark())
            .field("payload_offset", &self.payload_offset())
            .field("payload", &crate::hex::LimitedHex::new(self.payload(), 64))
            .finish()
    }
}

/// A buffer which couldn't be parsed as an RTP packet.
///
/// The caller should discard the packet; there's nothing to classify.
#[derive(Copy, Clone, Error)]
#[error("invalid {}-byte RTP packet: {reason}", .data.len())]
pub struct RawPacketError<'a> {
    pub reason: &'static str,
    pub data: &'a [u8],
}

impl std::fmt::Debug for RawPacketError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPacketError")
            .field("reason", &self.reason)
            .field("data", &crate::hex::LimitedHex::new(self.data, 64))
            .finish()
    }
}

/// Testing API; exposed for benchmarks and fuzz tests.
///
/// Builds the wire form of a version 2 packet.
#[doc(hidden)]
#[derive(Clone, Debug, Default)]
pub struct PacketBuilder {
    pub sequence_number: u16,
    pub timestamp: u32,
    pub payload_type: u8,
    pub ssrc: u32,
    pub mark: bool,
    pub csrcs: Vec<u32>,

    /// Extension body; must be a whole number of 32-bit words.
    pub extension: Option<Vec<u8>>,

    /// Total padding bytes, including the trailing count byte. 0 for none.
    pub padding: u8,
}

impl PacketBuilder {
    pub fn build<P: AsRef<[u8]>>(&self, payload: P) -> Result<Bytes, &'static str> {
        if self.payload_type > PAYLOAD_TYPE_MASK {
            return Err("payload type too large");
        }
        let csrc_count = u8::try_from(self.csrcs.len())
            .ok()
            .filter(|&c| c <= CSRC_COUNT_MASK)
            .ok_or("too many CSRCs")?;
        let payload = payload.as_ref();
        let ext_len = self.extension.as_ref().map(Vec::len).unwrap_or(0);
        let mut data = BytesMut::with_capacity(
            FIXED_HEADER_LEN
                + 4 * self.csrcs.len()
                + EXTENSION_HEADER_LEN
                + ext_len
                + payload.len()
                + usize::from(self.padding),
        );
        let mut b0 = (2 << VERSION_SHIFT) | csrc_count;
        if self.extension.is_some() {
            b0 |= EXTENSION_BIT;
        }
        if self.padding > 0 {
            b0 |= PADDING_BIT;
        }
        data.put_u8(b0);
        data.put_u8(if self.mark { MARKER_BIT } else { 0 } | self.payload_type);
        data.put_u16(self.sequence_number);
        data.put_u32(self.timestamp);
        data.put_u32(self.ssrc);
        for &csrc in &self.csrcs {
            data.put_u32(csrc);
        }
        if let Some(ext) = &self.extension {
            if ext.len() % 4 != 0 {
                return Err("extension isn't a whole number of words");
            }
            let words = u16::try_from(ext.len() / 4).map_err(|_| "extension too long")?;
            data.put_u16(ONE_BYTE_EXTENSION_PROFILE);
            data.put_u16(words);
            data.put_slice(ext);
        }
        data.put_slice(payload);
        if self.padding > 0 {
            data.put_bytes(0, usize::from(self.padding) - 1);
            data.put_u8(self.padding);
        }
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PacketBuilder {
        PacketBuilder {
            sequence_number: 0x1234,
            timestamp: 0xdead_beef,
            payload_type: 96,
            ssrc: 0x0102_0304,
            mark: true,
            ..Default::default()
        }
    }

    #[test]
    fn plain() {
        let data = builder().build(b"\x65abc").unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN);
        assert_eq!(pkt.payload(), b"\x65abc");
        assert_eq!(pkt.version(), 2);
        assert!(pkt.mark());
        assert!(!pkt.has_padding());
        assert!(!pkt.has_extension());
        assert_eq!(pkt.payload_type(), 96);
        assert_eq!(pkt.sequence_number(), 0x1234);
        assert_eq!(pkt.timestamp(), 0xdead_beef);
        assert_eq!(pkt.ssrc(), 0x0102_0304);
        assert_eq!(pkt.csrcs().count(), 0);
    }

    #[test]
    fn wrapped_fields() {
        let data = PacketBuilder {
            sequence_number: u16::MAX,
            timestamp: u32::MAX,
            ssrc: u32::MAX,
            payload_type: 127,
            ..Default::default()
        }
        .build([0u8])
        .unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.sequence_number(), u16::MAX);
        assert_eq!(pkt.timestamp(), u32::MAX);
        assert_eq!(pkt.ssrc(), u32::MAX);
        assert_eq!(pkt.payload_type(), 127);
        assert!(!pkt.mark());
    }

    #[test]
    fn too_short() {
        let data = [0x80, 0x60, 0, 1, 0, 0, 0, 0];
        let e = Packet::parse(&data[..]).unwrap_err();
        assert_eq!(e.reason, "too short");
        assert_eq!(e.data.len(), 8);
        assert_eq!(e.to_string(), "invalid 8-byte RTP packet: too short");
    }

    #[test]
    fn header_only() {
        let data = builder().build([0u8; 0]).unwrap();
        assert_eq!(data.len(), FIXED_HEADER_LEN);
        let e = Packet::parse(&data[..]).unwrap_err();
        assert_eq!(e.reason, "empty payload");
    }

    #[test]
    fn csrcs() {
        let data = PacketBuilder {
            csrcs: vec![0xaaaa_aaaa, 0xbbbb_bbbb],
            ..builder()
        }
        .build(b"xy")
        .unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.csrc_count(), 2);
        assert_eq!(pkt.payload_offset(), 20);
        assert_eq!(pkt.payload(), b"xy");
        assert_eq!(pkt.csrcs().collect::<Vec<_>>(), [0xaaaa_aaaa, 0xbbbb_bbbb]);
    }

    #[test]
    fn truncated_csrcs_not_skipped() {
        // CC=3 claims 12 bytes but only 5 follow the fixed header.
        let mut data = builder().build(b"hello").unwrap().to_vec();
        data[0] |= 3;
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.csrc_count(), 3);
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN);
        assert_eq!(pkt.payload(), b"hello");
        assert_eq!(pkt.csrcs().count(), 0);
    }

    #[test]
    fn csrcs_exactly_fill_packet() {
        // The CSRC list is consumed, leaving nothing for the payload.
        let mut data = builder().build(b"abcd").unwrap().to_vec();
        data[0] |= 1;
        let e = Packet::parse(&data[..]).unwrap_err();
        assert_eq!(e.reason, "empty payload");
    }

    #[test]
    fn extension() {
        let data = PacketBuilder {
            extension: Some(vec![0x10, 0xff, 0, 0, 1, 2, 3, 4]),
            ..builder()
        }
        .build(b"payload")
        .unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        assert!(pkt.has_extension());
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN + 4 + 8);
        assert_eq!(pkt.payload(), b"payload");
    }

    #[test]
    fn extension_body_too_long() {
        // X bit set; extension header declares 16 words but only 3 bytes follow it.
        let mut data = builder().build(b"\xbe\xde\x00\x10abc").unwrap().to_vec();
        data[0] |= EXTENSION_BIT;
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN + 4);
        assert_eq!(pkt.payload(), b"abc");
    }

    #[test]
    fn extension_header_truncated() {
        // X bit set with fewer than 4 bytes left: nothing is skipped.
        let mut data = builder().build(b"abc").unwrap().to_vec();
        data[0] |= EXTENSION_BIT;
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN);
        assert_eq!(pkt.payload(), b"abc");
    }

    #[test]
    fn padding() {
        let data = PacketBuilder {
            padding: 3,
            ..builder()
        }
        .build(b"data")
        .unwrap();
        assert_eq!(data.len(), FIXED_HEADER_LEN + 4 + 3);
        let pkt = Packet::parse(&data[..]).unwrap();
        assert!(pkt.has_padding());
        assert_eq!(pkt.payload(), b"data");
        assert_eq!(pkt.payload_range(), FIXED_HEADER_LEN..FIXED_HEADER_LEN + 4);
    }

    #[test]
    fn oversized_padding_ignored() {
        // P bit set and the last byte claims 200 bytes of padding.
        let mut data = builder().build(b"ab\xc8").unwrap().to_vec();
        data[0] |= PADDING_BIT;
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.payload(), b"ab\xc8");
    }

    #[test]
    fn padding_consumes_whole_payload() {
        let mut data = builder().build(b"\x00\x00\x03").unwrap().to_vec();
        data[0] |= PADDING_BIT;
        let e = Packet::parse(&data[..]).unwrap_err();
        assert_eq!(e.reason, "empty payload");
    }

    #[test]
    fn everything() {
        let data = PacketBuilder {
            csrcs: vec![7],
            extension: Some(vec![0; 4]),
            padding: 2,
            ..builder()
        }
        .build(b"\x41z")
        .unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        assert_eq!(pkt.payload_offset(), FIXED_HEADER_LEN + 4 + 4 + 4);
        assert_eq!(pkt.payload(), b"\x41z");
        assert_eq!(pkt.csrcs().collect::<Vec<_>>(), [7]);
        assert_eq!(pkt.raw(), &data[..]);
    }

    #[test]
    fn builder_rejects() {
        assert_eq!(
            PacketBuilder {
                payload_type: 128,
                ..Default::default()
            }
            .build([0u8])
            .unwrap_err(),
            "payload type too large"
        );
        assert_eq!(
            PacketBuilder {
                csrcs: vec![0; 16],
                ..Default::default()
            }
            .build([0u8])
            .unwrap_err(),
            "too many CSRCs"
        );
        assert_eq!(
            PacketBuilder {
                extension: Some(vec![0; 3]),
                ..Default::default()
            }
            .build([0u8])
            .unwrap_err(),
            "extension isn't a whole number of words"
        );
    }

    #[test]
    fn debug_shows_payload() {
        let data = builder().build(b"\x65abc").unwrap();
        let pkt = Packet::parse(&data[..]).unwrap();
        let s = format!("{pkt:?}");
        assert!(s.contains("sequence_number: 4660"), "{s}");
        assert!(s.contains("ssrc: 01020304"), "{s}");
    }

    #[test]
    fn error_debug_dumps_data() {
        let data = [0x80, 0x60, 0xab, 0xcd, 0x12];
        let e = Packet::parse(&data[..]).unwrap_err();
        let s = format!("{e:?}");
        assert!(s.contains("reason: \"too short\""), "{s}");
        assert!(s.contains("Length: 5 (0x5) bytes"), "{s}");
        assert!(s.contains("80 60 ab cd"), "{s}");

        // Long buffers are cut off.
        let mut data = builder().build([0u8; 0]).unwrap().to_vec();
        data.resize(200, 0);
        data[0] |= PADDING_BIT;
        data[199] = 188;
        let e = Packet::parse(&data[..]).unwrap_err();
        assert_eq!(e.reason, "empty payload");
        let s = format!("{e:?}");
        assert!(s.contains("Length: 200 (0xc8) bytes"), "{s}");
        assert!(s.contains("...136 (0x88) bytes not shown..."), "{s}");
    }
}
