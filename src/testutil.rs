// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use bytes::Bytes;

use crate::rtp::PacketBuilder;

pub(crate) fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

/// Returns a plain packet with the given sequence number and payload.
pub(crate) fn packet_data(sequence_number: u16, payload: &[u8]) -> Bytes {
    PacketBuilder {
        sequence_number,
        timestamp: 90_000,
        payload_type: 96,
        ssrc: 0x4a2f_0c11,
        ..Default::default()
    }
    .build(payload)
    .unwrap()
}
