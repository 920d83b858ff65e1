// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [H.264](https://www.itu.int/rec/T-REC-H.264-201906-I/en) GOP boundaries,
//! with RTP encoding as in [RFC 6184](https://tools.ietf.org/html/rfc6184).

use h264_reader::nal::UnitType;
use log::{debug, trace};

use super::{GopOptions, GopState};
use crate::hex::LimitedHex;
use crate::rtp::Packet;
use crate::Error;

/// `nal_unit_type` within a NAL header, FU indicator, or FU header.
const NAL_TYPE_MASK: u8 = 0b0001_1111;

/// Packet types from [RFC 6184 section 5.2](https://tools.ietf.org/html/rfc6184#section-5.2).
const STAP_A: u8 = 24;
const STAP_B: u8 = 25;
const FU_A: u8 = 28;
const FU_B: u8 = 29;

/// FU header bits; see [RFC 6184 section 5.8](https://tools.ietf.org/html/rfc6184#section-5.8).
const FU_START_BIT: u8 = 0b1000_0000;
const FU_END_BIT: u8 = 0b0100_0000;

/// The decoding order number which follows a STAP-B's header byte.
const DON_LEN: usize = 2;

/// Each aggregated NAL unit is preceded by its 16-bit size.
const NAL_SIZE_LEN: usize = 2;

/// Sum of `nal_unit_type`s in an aggregation of exactly one SPS and one PPS.
const SPS_PLUS_PPS: u32 = 7 + 8;

/// SPS packets shorter than this are logged as holding parameter sets only.
const SPS_ONLY_MAX_LEN: usize = 200;

pub(super) fn is_start_of_gop(
    pkt: &Packet<'_>,
    state: &mut GopState,
    options: &GopOptions,
) -> Result<bool, Error> {
    let seq = pkt.sequence_number();
    let data = pkt.payload();
    let Some(&nal_header) = data.first() else {
        return Ok(false);
    };
    let nal_type = match nal_header & NAL_TYPE_MASK {
        // Single NAL unit packet.
        t @ 0..=23 => t,
        t @ (FU_A | FU_B) => {
            let Some(&fu_header) = data.get(1) else {
                trace!("{}: short FU at seq {:04x}", state.label, seq);
                return Ok(false);
            };
            if (fu_header & FU_START_BIT) == 0 {
                trace!(
                    "{}: FU-{} {} at seq {:04x}",
                    state.label,
                    if t == FU_A { 'A' } else { 'B' },
                    if (fu_header & FU_END_BIT) != 0 { "end" } else { "middle" },
                    seq
                );
                return Ok(false);
            }
            fu_header & NAL_TYPE_MASK
        }
        t @ (STAP_A | STAP_B) => {
            let Some(aggregation) = scan_aggregation(pkt, &state.label, t == STAP_B)? else {
                return Ok(false);
            };
            if aggregation.type_sum == SPS_PLUS_PPS {
                debug!(
                    "{}: SPS+PPS aggregation at seq {:04x}, start of GOP",
                    state.label, seq
                );
                state.note_sps(seq);
                return Ok(true);
            }
            aggregation.last_type
        }
        _ => return Ok(false),
    };

    match UnitType::for_id(nal_type) {
        Ok(UnitType::SliceLayerWithoutPartitioningIdr) => {
            let distance = seq.wrapping_sub(state.sps_sequence_number);
            if state.saw_sps && distance < options.sps_idr_window {
                // This IDR belongs to the GOP its SPS already started.
                trace!(
                    "{}: IDR at seq {:04x} follows SPS by {}, not a new GOP",
                    state.label,
                    seq,
                    distance
                );
                state.saw_sps = false;
                return Ok(false);
            }
            debug!("{}: IDR at seq {:04x}, start of GOP", state.label, seq);
            Ok(true)
        }
        Ok(UnitType::SeqParameterSet) => {
            state.note_sps(seq);
            // Small packets are likely just SPS and PPS; larger ones may carry
            // the key frame too. Either way the GOP starts here.
            trace!(
                "{}: {}-byte SPS packet at seq {:04x} ({})",
                state.label,
                data.len(),
                seq,
                if data.len() < SPS_ONLY_MAX_LEN {
                    "parameter sets only"
                } else {
                    "may include slice data"
                }
            );
            debug!("{}: SPS at seq {:04x}, start of GOP", state.label, seq);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[derive(Debug)]
struct Aggregation {
    /// Sum of every aggregated NAL's `nal_unit_type`.
    type_sum: u32,

    /// `nal_unit_type` of the final aggregated NAL.
    last_type: u8,
}

/// Walks the NAL units of a STAP-A or STAP-B.
/// See [RFC 6184 section 5.7.1](https://tools.ietf.org/html/rfc6184#section-5.7.1).
///
/// Returns `None` on encountering a zero-length NAL.
fn scan_aggregation(
    pkt: &Packet<'_>,
    label: &str,
    stap_b: bool,
) -> Result<Option<Aggregation>, Error> {
    let data = pkt.payload();
    let name = if stap_b { "STAP-B" } else { "STAP-A" };
    let mut pos = 1;
    if stap_b {
        pos += DON_LEN;
    }
    let mut type_sum = 0;
    loop {
        let Some(&[hi, lo]) = data.get(pos..pos + NAL_SIZE_LEN) else {
            bail!(super::malformed(
                pkt,
                format!(
                    "{} has {} remaining bytes while expecting {}-byte length: {}",
                    name,
                    data.len().saturating_sub(pos),
                    NAL_SIZE_LEN,
                    LimitedHex::new(data, 32)
                )
            ));
        };
        let len = usize::from(u16::from_be_bytes([hi, lo]));
        if len == 0 {
            trace!("{}: zero length in {} at seq {:04x}", label, name, pkt.sequence_number());
            return Ok(None);
        }
        pos += NAL_SIZE_LEN;
        let Some(nal) = data.get(pos..pos + len) else {
            bail!(super::malformed(
                pkt,
                format!(
                    "{} too short: {} bytes remaining, expecting {}-byte NAL: {}",
                    name,
                    data.len() - pos,
                    len,
                    LimitedHex::new(data, 32)
                )
            ));
        };
        pos += len;
        let nal_type = nal[0] & NAL_TYPE_MASK;
        type_sum += u32::from(nal_type);
        if pos >= data.len() {
            return Ok(Some(Aggregation {
                type_sum,
                last_type: nal_type,
            }));
        }
    }
}
