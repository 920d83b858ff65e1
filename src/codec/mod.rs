// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Codec-specific GOP boundary detection.
//!
//! A recorder wants to start each independently-decodable fragment at a
//! packet which begins a new group of pictures. For H.264 and H.265 this
//! means recognizing parameter sets and IRAP/IDR slices through the various
//! RTP packaging forms (single NAL, fragmentation, aggregation) without
//! reassembling the NALs themselves.
//!
//! The decision for H.264 is stateful: an IDR arriving shortly after the SPS
//! which introduced it doesn't start a second GOP. That state lives in a
//! [`GopState`], one per stream, owned by the caller.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ErrorInt;
use crate::rtp::Packet;
use crate::Error;

pub(crate) mod h264;
pub(crate) mod h265;

/// The default for [`GopOptions::sps_idr_window`].
pub const DEFAULT_SPS_IDR_WINDOW: u16 = 10;

/// The default for [`GopOptions::h265_parameter_set_min_len`].
pub const DEFAULT_PARAMETER_SET_LEN: usize = 200;

/// A video codec whose GOP boundaries can be detected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    /// Looks up a codec by its SDP encoding name, case-insensitively.
    pub fn from_encoding_name(encoding_name: &str) -> Option<Self> {
        if encoding_name.eq_ignore_ascii_case("h264") {
            Some(Codec::H264)
        } else if encoding_name.eq_ignore_ascii_case("h265") {
            Some(Codec::H265)
        } else {
            None
        }
    }

    pub fn encoding_name(self) -> &'static str {
        match self {
            Codec::H264 => "h264",
            Codec::H265 => "h265",
        }
    }

    /// Returns true iff `pkt` begins a new GOP, updating `state`.
    ///
    /// Errors only on payloads that can't be walked in bounds. On error,
    /// `state` is unchanged and the caller can continue with the next packet.
    pub fn is_start_of_gop(
        self,
        pkt: &Packet<'_>,
        state: &mut GopState,
        options: &GopOptions,
    ) -> Result<bool, Error> {
        match self {
            Codec::H264 => h264::is_start_of_gop(pkt, state, options),
            Codec::H265 => Ok(h265::is_start_of_gop(pkt, state, options)),
        }
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.encoding_name())
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Codec::from_encoding_name(s) {
            Some(c) => Ok(c),
            None => bail!(ErrorInt::InvalidArgument(format!(
                "unsupported video encoding {s:?}; expected h264 or h265"
            ))),
        }
    }
}

/// Tunables for GOP detection.
///
/// The defaults reproduce the long-standing heuristics; most callers should
/// leave them alone.
#[derive(Clone, Debug)]
pub struct GopOptions {
    sps_idr_window: u16,
    h265_parameter_set_min_len: usize,
}

impl Default for GopOptions {
    fn default() -> Self {
        Self {
            sps_idr_window: DEFAULT_SPS_IDR_WINDOW,
            h265_parameter_set_min_len: DEFAULT_PARAMETER_SET_LEN,
        }
    }
}

impl GopOptions {
    /// Sets how close (in RTP sequence numbers, exclusive) an H.264 IDR must
    /// follow an SPS to be considered part of the GOP the SPS started.
    pub fn sps_idr_window(mut self, window: u16) -> Self {
        self.sps_idr_window = window;
        self
    }

    /// Sets the minimum payload length of an H.265 VPS packet which starts a
    /// GOP. Shorter ones are taken to be parameter sets without slice data.
    pub fn h265_parameter_set_min_len(mut self, len: usize) -> Self {
        self.h265_parameter_set_min_len = len;
        self
    }
}

/// Per-stream GOP detection state.
///
/// Create one per media stream and pass every packet of that stream through
/// it, in order. Streams must not share a `GopState`.
#[derive(Clone, Debug, Default)]
pub struct GopState {
    saw_sps: bool,
    sps_sequence_number: u16,

    /// Diagnostic label for log messages, eg `cam1/main`.
    label: String,
}

impl GopState {
    pub fn new(label: impl Into<String>) -> Self {
        GopState {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Returns true if an SPS was seen and not yet matched with its IDR.
    #[inline]
    pub fn saw_sps(&self) -> bool {
        self.saw_sps
    }

    /// Returns the sequence number of the most recent SPS, if any.
    #[inline]
    pub fn sps_sequence_number(&self) -> u16 {
        self.sps_sequence_number
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Forgets any SPS seen, as after a stream discontinuity.
    pub fn reset(&mut self) {
        self.saw_sps = false;
        self.sps_sequence_number = 0;
    }

    fn note_sps(&mut self, sequence_number: u16) {
        self.saw_sps = true;
        self.sps_sequence_number = sequence_number;
    }
}

/// Returns true iff `pkt` begins a new GOP of a stream with the given SDP
/// encoding name, using default [`GopOptions`].
///
/// Encodings other than H.264 and H.265 never start a GOP and leave `state`
/// untouched.
pub fn is_start_of_gop(
    pkt: &Packet<'_>,
    encoding_name: &str,
    state: &mut GopState,
) -> Result<bool, Error> {
    match Codec::from_encoding_name(encoding_name) {
        Some(codec) => codec.is_start_of_gop(pkt, state, &GopOptions::default()),
        None => Ok(false),
    }
}

/// A [`GopState`] bound to a codec and options.
#[derive(Debug)]
pub struct GopDetector {
    codec: Codec,
    options: GopOptions,
    state: GopState,
}

impl GopDetector {
    /// Creates a detector for the given SDP encoding name, eg `H264`.
    pub fn new(encoding_name: &str, label: impl Into<String>) -> Result<Self, Error> {
        Ok(GopDetector {
            codec: encoding_name.parse()?,
            options: GopOptions::default(),
            state: GopState::new(label),
        })
    }

    pub fn with_options(mut self, options: GopOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    #[inline]
    pub fn state(&self) -> &GopState {
        &self.state
    }

    /// Classifies the next packet of the stream.
    pub fn classify(&mut self, pkt: &Packet<'_>) -> Result<bool, Error> {
        self.codec.is_start_of_gop(pkt, &mut self.state, &self.options)
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}

/// Builds a malformed payload error for `pkt`.
fn malformed(pkt: &Packet<'_>, description: String) -> ErrorInt {
    ErrorInt::MalformedPayload {
        ssrc: pkt.ssrc(),
        sequence_number: pkt.sequence_number(),
        description,
    }
}
