// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt::Display, sync::Arc};

use thiserror::Error;

/// An opaque `std::error::Error + Send + Sync + 'static` implementation.
///
/// The focus is on detailed human-readable messages: packet errors carry the
/// SSRC and sequence number so the offending packet can be found in a capture.
/// A bad packet never poisons the per-stream state; callers may log the error
/// and keep classifying subsequent packets.
#[derive(Clone)]
pub struct Error(pub(crate) Arc<ErrorInt>);

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Error)]
pub(crate) enum ErrorInt {
    /// The method's caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A codec payload which can't be walked without reading out of bounds.
    #[error("[ssrc={ssrc:08x}, seq={sequence_number:04x}] Malformed payload: {description}")]
    MalformedPayload {
        ssrc: u32,
        sequence_number: u16,
        description: String,
    },
}
