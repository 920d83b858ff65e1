// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTP packet parsing and GOP boundary detection for H.264 and H.265 streams.
//!
//! This is the piece of a recorder which decides, packet by packet, whether a
//! new independently-decodable fragment may start. It's deliberately
//! transport-agnostic: the caller is responsible for receiving RTP packets
//! (via UDP or RTSP interleaved data), ordering them, and acting on the
//! result.
//!
//! ```
//! use rtp_gop::{codec::GopState, rtp::Packet};
//!
//! let mut state = GopState::new("cam1/main");
//! let data = [
//!     0x80, 0x60, 0x00, 0x01, // V=2, PT=96, seq=1
//!     0x00, 0x00, 0x00, 0x00, // timestamp
//!     0x00, 0x00, 0x00, 0x2a, // ssrc
//!     0x65, 0x88, 0x84,       // IDR slice
//! ];
//! let pkt = Packet::parse(&data[..]).unwrap();
//! assert!(rtp_gop::codec::is_start_of_gop(&pkt, "H264", &mut state).unwrap());
//! ```

#![forbid(clippy::print_stderr, clippy::print_stdout)]

mod error;

mod hex;
pub mod rtp;

#[cfg(test)]
mod testutil;

pub use error::Error;

/// Wraps the supplied `ErrorInt` and returns it as an `Err`.
macro_rules! bail {
    ($e:expr) => {
        return Err(crate::error::Error(std::sync::Arc::new($e)))
    };
}

pub mod codec;
