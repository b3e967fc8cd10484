// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Endian detection (spec.md §4.6): read table 0 once, latch bit 0 of byte
//! 0 as the byte order every subsequent C12.19 decoder should honor.

use tracing::instrument;

use crate::channel::ByteChannel;
use crate::error::{Error, Result};
use crate::session::link::LinkSession;
use crate::table::cache::TableCache;
use crate::table::io::TableIo;

const ENDIAN_TABLE: u16 = 0;

#[derive(Debug, Default, Clone, Copy)]
pub struct EndianProbe;

impl EndianProbe {
    /// Idempotent: once `latched` holds a value, subsequent calls are
    /// no-ops regardless of `cache_enabled`.
    #[instrument(level = "debug", skip(link, cache, latched))]
    pub fn probe<C: ByteChannel>(
        link: &mut LinkSession<C>,
        cache: &mut TableCache,
        cache_enabled: bool,
        latched: &mut Option<bool>,
    ) -> Result<bool> {
        if let Some(big_endian) = *latched {
            return Ok(big_endian);
        }

        let table0 = TableIo::read_table(link, cache, cache_enabled, ENDIAN_TABLE)?;
        let byte0 = *table0.first().ok_or(Error::Timeout)?;
        let big_endian = byte0 & 0x01 != 0;
        *latched = Some(big_endian);
        Ok(big_endian)
    }
}
