// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Procedure invocation via tables 7/8 (spec.md §4.5): write the procedure
//! header, sequence byte, and parameters to table 7; read table 8 back,
//! retrying while the echoed sequence byte doesn't match.

use std::thread;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::channel::ByteChannel;
use crate::error::{Error, ProcedureError, ProcedureResult, Result};
use crate::session::link::LinkSession;
use crate::table::cache::TableCache;
use crate::table::io::TableIo;

const PROCEDURE_TABLE: u16 = 7;
const RESULT_TABLE: u16 = 8;
/// High bit of the 11-bit procedure-number field (spec.md §4.5 step 2).
const MANUFACTURER_BIT: u16 = 0x0800;
const PROC_NBR_MASK: u16 = 0x07FF;

/// Stateless: the caller owns the running sequence counter, same shape as
/// [`crate::table::io::TableIo`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcedureRunner;

impl ProcedureRunner {
    pub const MAX_RETRIES: u8 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_millis(250);

    /// Invokes `proc_nbr`, allocating `*sequence` as this call's sequence
    /// byte and advancing it (wrapping at 256) for the next call.
    #[instrument(level = "debug", skip(link, cache, sequence, params))]
    pub fn run_procedure<C: ByteChannel>(
        link: &mut LinkSession<C>,
        cache: &mut TableCache,
        sequence: &mut u8,
        proc_nbr: u16,
        is_manufacturer: bool,
        params: &[u8],
        big_endian: bool,
    ) -> Result<(ProcedureResult, Vec<u8>)> {
        if proc_nbr > PROC_NBR_MASK {
            return Err(Error::InvalidArgument(format!(
                "procedure number {proc_nbr} does not fit in 11 bits"
            )));
        }

        let seq = *sequence;
        *sequence = sequence.wrapping_add(1);

        let mut header = proc_nbr & PROC_NBR_MASK;
        if is_manufacturer {
            header |= MANUFACTURER_BIT;
        }
        let header_bytes = if big_endian {
            header.to_be_bytes()
        } else {
            header.to_le_bytes()
        };

        let mut request = Vec::with_capacity(2 + 1 + params.len());
        request.extend_from_slice(&header_bytes);
        request.push(seq);
        request.extend_from_slice(params);

        TableIo::write_table(link, cache, PROCEDURE_TABLE, &request)?;

        for attempt in 0..Self::MAX_RETRIES {
            let response = TableIo::read_table(link, cache, false, RESULT_TABLE)?;
            if response.len() < 2 {
                return Err(ProcedureError::SequenceMismatch.into());
            }
            if response[0] == seq {
                let result = ProcedureResult::from_byte(response[1]);
                return Ok((result, response[2..].to_vec()));
            }
            debug!(attempt, expected = seq, got = response[0], "table 8 sequence mismatch");
            thread::sleep(Self::RETRY_DELAY);
        }

        Err(ProcedureError::SequenceMismatch.into())
    }
}
