// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [H.265](https://www.itu.int/rec/T-REC-H.265) GOP boundaries,
//! with RTP encoding as in [RFC 7798](https://tools.ietf.org/html/rfc7798).

use std::ops::RangeInclusive;

use log::{debug, trace};

use super::{GopOptions, GopState};
use crate::rtp::Packet;

/// Two-byte payload header plus the FU header, the most examined here.
const MIN_PAYLOAD_LEN: usize = 3;

/// Payload header types from
/// [RFC 7798 section 4.4](https://datatracker.ietf.org/doc/html/rfc7798#section-4.4).
const AP: u8 = 48;
const FU: u8 = 49;
const PACI: u8 = 50;

/// `Type` field of the payload header, after shifting past the `F` bit.
const HEADER_TYPE_MASK: u8 = 0b0011_1111;

/// FU header bits; see [RFC 7798 section 4.4.3](https://datatracker.ietf.org/doc/html/rfc7798#section-4.4.3).
const FU_START_BIT: u8 = 0b1000_0000;
const FU_END_BIT: u8 = 0b0100_0000;
const FU_TYPE_MASK: u8 = 0b0011_1111;

/// The `Type` field of a single NAL unit packet's first byte, left in place
/// (not shifted down).
const SINGLE_NAL_FRAME_TYPE_MASK: u8 = 0b0111_1110;

/// BLA, IDR, and CRA frame types.
const IRAP_FRAME_TYPES: RangeInclusive<u8> = 16..=21;

const VPS_FRAME_TYPE: u8 = 32;

/// H.265 classification is stateless; `state` supplies only the log label.
pub(super) fn is_start_of_gop(pkt: &Packet<'_>, state: &GopState, options: &GopOptions) -> bool {
    let data = pkt.payload();
    let seq = pkt.sequence_number();
    let Some(&[first, _, fu_header]) = data.first_chunk::<MIN_PAYLOAD_LEN>() else {
        trace!("{}: short payload at seq {:04x}", state.label, seq);
        return false;
    };
    let frame_type = match (first >> 1) & HEADER_TYPE_MASK {
        FU => {
            if (fu_header & FU_START_BIT) == 0 {
                trace!(
                    "{}: FU {} at seq {:04x}",
                    state.label,
                    if (fu_header & FU_END_BIT) != 0 { "end" } else { "middle" },
                    seq
                );
                return false;
            }
            fu_header & FU_TYPE_MASK
        }

        // Aggregation and PACI packets aren't looked into.
        AP | PACI => return false,

        _ => first & SINGLE_NAL_FRAME_TYPE_MASK,
    };
    if IRAP_FRAME_TYPES.contains(&frame_type) {
        debug!(
            "{}: frame type {} at seq {:04x}, start of GOP",
            state.label, frame_type, seq
        );
        return true;
    }
    if frame_type == VPS_FRAME_TYPE {
        // Parameter sets alone are small; a large packet must carry slice data.
        if data.len() < options.h265_parameter_set_min_len {
            trace!(
                "{}: {}-byte parameter set packet at seq {:04x}, not a new GOP",
                state.label,
                data.len(),
                seq
            );
            return false;
        }
        debug!(
            "{}: {}-byte VPS packet at seq {:04x}, start of GOP",
            state.label,
            data.len(),
            seq
        );
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{init_logging, packet_data};

    fn classify_with(options: &GopOptions, payload: &[u8]) -> bool {
        let data = packet_data(42, payload);
        let pkt = Packet::parse(&data[..]).unwrap();
        let state = GopState::new("test");
        is_start_of_gop(&pkt, &state, options)
    }

    fn classify(payload: &[u8]) -> bool {
        classify_with(&GopOptions::default(), payload)
    }

    fn padded(prefix: &[u8], len: usize) -> Vec<u8> {
        let mut v = prefix.to_vec();
        v.resize(len, 0xaa);
        v
    }

    #[test]
    fn short() {
        init_logging();
        assert!(!classify(b"\x62"));
        assert!(!classify(b"\x62\x01"));
    }

    #[test]
    fn single_nal() {
        init_logging();
        for first in [0x10u8, 0x12, 0x14] {
            assert!(classify(&[first, 0x01, 0xaf]), "first={first:02x}");
        }

        // The type field isn't shifted, so these don't fall in the IRAP range.
        assert!(!classify(b"\x02\x01\xd0"));
        assert!(!classify(b"\x26\x01\xaf"));
        assert!(!classify(b"\x4e\x01\x05"));
    }

    #[test]
    fn fu() {
        init_logging();
        assert!(classify(b"\x62\x01\x93fu start"));
        assert!(classify(b"\x62\x01\x95fu start"));
        assert!(!classify(b"\x62\x01\x13fu middle"));
        assert!(!classify(b"\x62\x01\x53fu end"));
        assert!(!classify(b"\x62\x01\x81trail start"));
    }

    #[test]
    fn vps_size_gate() {
        init_logging();
        let fu_vps = b"\x62\x01\xa0";
        assert!(!classify(&padded(fu_vps, 150)));
        assert!(classify(&padded(fu_vps, 250)));
        assert!(!classify(&padded(fu_vps, 199)));
        assert!(classify(&padded(fu_vps, 200)));

        let single = b"\x20\x01";
        assert!(!classify(&padded(single, 150)));
        assert!(classify(&padded(single, 250)));
    }

    #[test]
    fn vps_size_gate_option() {
        init_logging();
        let options = GopOptions::default().h265_parameter_set_min_len(100);
        assert!(classify_with(&options, &padded(b"\x62\x01\xa0", 150)));
        assert!(!classify_with(&options, &padded(b"\x62\x01\xa0", 99)));
    }

    #[test]
    fn aggregation_and_paci_ignored() {
        init_logging();
        assert!(!classify(b"\x60\x01\x00\x0a\x26\x01idr slice"));
        assert!(!classify(&padded(b"\x64\x01\x00", 300)));
    }
}
