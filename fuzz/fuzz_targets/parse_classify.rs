// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]
use libfuzzer_sys::fuzz_target;

use rtp_gop::codec::{Codec, GopOptions, GopState};
use rtp_gop::rtp::Packet;

fuzz_target!(|data: &[u8]| {
    let Ok(pkt) = Packet::parse(data) else {
        return;
    };
    let payload = pkt.payload();
    assert!(!payload.is_empty());
    assert_eq!(&pkt.raw()[pkt.payload_range()], payload);
    let options = GopOptions::default();
    for codec in [Codec::H264, Codec::H265] {
        let mut state = GopState::new("fuzz");
        if codec.is_start_of_gop(&pkt, &mut state, &options).is_err() {
            // Errors must leave the state as it was.
            assert!(!state.saw_sps());
            assert_eq!(state.sps_sequence_number(), 0);
        }
    }
});
