// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Table I/O (spec.md §4.4): full, by-offset, and by-index reads; full and
//! by-offset writes; cache population and invalidation.

use tracing::instrument;

use crate::channel::ByteChannel;
use crate::error::{Error, ReadTableError, Result, StatusCode, WriteTableError};
use crate::framer::Framer;
use crate::opcode::Opcode;
use crate::session::link::LinkSession;
use crate::table::cache::TableCache;

/// Maximum offset encodable in the 24-bit offset field (spec.md §4.4).
pub const MAX_OFFSET: u32 = 0x00FF_FFFF;

/// Stateless: all state lives in the [`LinkSession`] and [`TableCache`] it
/// is handed, mirroring [`crate::framer::Framer`]'s zero-sized-struct shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableIo;

impl TableIo {
    #[instrument(level = "debug", skip(link, cache))]
    pub fn read_table<C: ByteChannel>(
        link: &mut LinkSession<C>,
        cache: &mut TableCache,
        cache_enabled: bool,
        table: u16,
    ) -> Result<Vec<u8>> {
        if cache_enabled
            && let Some(cached) = cache.get(table)
        {
            return Ok(cached.to_vec());
        }

        let mut body = vec![Opcode::FullRead.raw()];
        body.extend_from_slice(&table.to_be_bytes());

        let response = link.send_service(&body)?;
        let payload = Self::parse_read_body(&response)?;

        if cache_enabled {
            cache.insert(table, payload.clone());
        }
        Ok(payload)
    }

    /// Partial read by byte offset; never populates the full-table cache
    /// (spec.md §4.4).
    #[instrument(level = "debug", skip(link))]
    pub fn read_table_offset<C: ByteChannel>(
        link: &mut LinkSession<C>,
        table: u16,
        offset: u32,
        octet_count: u16,
    ) -> Result<Vec<u8>> {
        if offset > MAX_OFFSET {
            return Err(Error::InvalidArgument(format!(
                "offset {offset} exceeds the 24-bit field"
            )));
        }

        let mut body = vec![Opcode::OffsetRead.raw()];
        body.extend_from_slice(&table.to_be_bytes());
        body.extend_from_slice(&offset.to_be_bytes()[1..]);
        body.extend_from_slice(&octet_count.to_be_bytes());

        let response = link.send_service(&body)?;
        Self::parse_read_body(&response)
    }

    /// Partial read by element index; never populates the full-table cache.
    #[instrument(level = "debug", skip(link))]
    pub fn read_table_index<C: ByteChannel>(
        link: &mut LinkSession<C>,
        table: u16,
        index: u16,
        element_count: u16,
    ) -> Result<Vec<u8>> {
        let mut body = vec![Opcode::IndexRead.raw()];
        body.extend_from_slice(&table.to_be_bytes());
        body.extend_from_slice(&index.to_be_bytes());
        body.extend_from_slice(&element_count.to_be_bytes());

        let response = link.send_service(&body)?;
        Self::parse_read_body(&response)
    }

    /// Full write. On success invalidates `table`, and `8` too when
    /// `table == 7` (spec.md testable property 5).
    #[instrument(level = "debug", skip(link, cache, data))]
    pub fn write_table<C: ByteChannel>(
        link: &mut LinkSession<C>,
        cache: &mut TableCache,
        table: u16,
        data: &[u8],
    ) -> Result<()> {
        let framer = Framer::new();
        let mut body = vec![Opcode::FullWrite.raw()];
        body.extend_from_slice(&table.to_be_bytes());
        body.extend_from_slice(&(data.len() as u16).to_be_bytes());
        body.extend_from_slice(data);
        body.push(framer.data_checksum(data));

        let response = link.send_service(&body)?;
        Self::expect_write_ok(&response)?;

        cache.invalidate(table);
        if table == 7 {
            cache.invalidate(8);
        }
        Ok(())
    }

    /// Offset write, same invalidation rule as [`Self::write_table`].
    #[instrument(level = "debug", skip(link, cache, data))]
    pub fn write_table_offset<C: ByteChannel>(
        link: &mut LinkSession<C>,
        cache: &mut TableCache,
        table: u16,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        if offset > MAX_OFFSET {
            return Err(Error::InvalidArgument(format!(
                "offset {offset} exceeds the 24-bit field"
            )));
        }

        let framer = Framer::new();
        let mut body = vec![Opcode::OffsetWrite.raw()];
        body.extend_from_slice(&table.to_be_bytes());
        body.extend_from_slice(&offset.to_be_bytes()[1..]);
        body.extend_from_slice(&(data.len() as u16).to_be_bytes());
        body.extend_from_slice(data);
        body.push(framer.data_checksum(data));

        let response = link.send_service(&body)?;
        Self::expect_write_ok(&response)?;

        cache.invalidate(table);
        if table == 7 {
            cache.invalidate(8);
        }
        Ok(())
    }

    /// Body layout: `status, count_hi, count_lo, <count bytes>, checksum`.
    fn parse_read_body(response: &[u8]) -> Result<Vec<u8>> {
        let status_byte = *response.first().ok_or(Error::Timeout)?;
        let status = StatusCode::from_byte(status_byte);
        if !status.is_ok() {
            return Err(ReadTableError::from_status(status).into());
        }

        let body = &response[1..];
        if body.len() < 3 {
            return Err(ReadTableError::Generic(status_byte).into());
        }
        let count = u16::from_be_bytes([body[0], body[1]]) as usize;
        if body.len() != 2 + count + 1 {
            return Err(ReadTableError::Generic(status_byte).into());
        }

        let data = &body[2..2 + count];
        let checksum = body[2 + count];
        if Framer::new().data_checksum(data) != checksum {
            return Err(ReadTableError::Checksum.into());
        }
        Ok(data.to_vec())
    }

    fn expect_write_ok(response: &[u8]) -> Result<()> {
        let status_byte = *response.first().ok_or(Error::Timeout)?;
        let status = StatusCode::from_byte(status_byte);
        if !status.is_ok() {
            return Err(WriteTableError::from_status(status).into());
        }
        Ok(())
    }
}
