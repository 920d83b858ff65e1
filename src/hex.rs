// Copyright (C) 2026 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hex dumps of packet data, truncated so a jumbo payload doesn't flood the log.

use pretty_hex::{HexConfig, PrettyHex};

/// Formats at most `max_bytes` of `inner`, noting how much was left out.
pub(crate) struct LimitedHex<'a> {
    inner: &'a [u8],
    max_bytes: usize,
}

impl<'a> LimitedHex<'a> {
    pub(crate) fn new(inner: &'a [u8], max_bytes: usize) -> Self {
        Self { inner, max_bytes }
    }

    fn shown(&self) -> (&'a [u8], Option<usize>) {
        match self.inner.len().checked_sub(self.max_bytes) {
            Some(omitted) if omitted > 0 => (&self.inner[..self.max_bytes], Some(omitted)),
            _ => (self.inner, None),
        }
    }
}

impl std::fmt::Debug for LimitedHex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (shown, omitted) = self.shown();
        writeln!(f, "Length: {0} (0x{0:x}) bytes", self.inner.len())?;
        write!(
            f,
            "{:#?}",
            shown.hex_conf(HexConfig {
                title: false,
                ..Default::default()
            })
        )?;
        if let Some(o) = omitted {
            write!(f, "\n...{0} (0x{0:x}) bytes not shown...", o)?;
        }
        Ok(())
    }
}

/// Single-line form, suitable for log messages.
impl std::fmt::Display for LimitedHex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (shown, omitted) = self.shown();
        for (i, b) in shown.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        if omitted.is_some() {
            f.write_str(" ...")?;
        }
        Ok(())
    }
}
