// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The consumer-facing session (spec.md §6, SPEC_FULL §4.7): composes the
//! link session, table cache/IO, procedure runner, and endian probe behind
//! one narrow surface for the glue layer (CLI, scripting console, …) to
//! drive.

use tracing::instrument;

use crate::channel::ByteChannel;
use crate::credentials::Credentials;
use crate::endian::EndianProbe;
use crate::error::{ProcedureResult, Result};
use crate::session::link::{IdentResponse, LinkSession};
use crate::table::cache::TableCache;
use crate::table::io::TableIo;

/// Builds a [`Session`] with the packet-size / packet-count / cache-policy
/// knobs from spec.md §6 (`PKTSIZE`, `NBRPKTS`, `CACHETBLS`).
#[derive(Debug, Clone, Copy)]
pub struct SessionBuilder {
    pktsize: u16,
    nbrpkts: u8,
    cache_enabled: bool,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            pktsize: 512,
            nbrpkts: 2,
            cache_enabled: true,
        }
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pktsize(mut self, pktsize: u16) -> Self {
        self.pktsize = pktsize;
        self
    }

    pub fn nbrpkts(mut self, nbrpkts: u8) -> Self {
        self.nbrpkts = nbrpkts;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn build<C: ByteChannel>(self, channel: C) -> Session<C> {
        Session {
            link: LinkSession::new(channel),
            cache: TableCache::new(),
            cache_enabled: self.cache_enabled,
            endian_latched: None,
            proc_sequence: 0,
            desired_pktsize: self.pktsize,
            desired_nbrpkts: self.nbrpkts,
        }
    }
}

/// One session over one channel (spec.md §5: single-threaded, blocking,
/// owns its channel and cache exclusively).
#[derive(Debug)]
pub struct Session<C: ByteChannel> {
    link: LinkSession<C>,
    cache: TableCache,
    cache_enabled: bool,
    endian_latched: Option<bool>,
    proc_sequence: u8,
    desired_pktsize: u16,
    desired_nbrpkts: u8,
}

impl<C: ByteChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        SessionBuilder::new().build(channel)
    }

    /// IDENT + NEGOTIATE: establishes the transport session.
    #[instrument(level = "info", skip(self))]
    pub fn open(&mut self) -> Result<IdentResponse> {
        let ident = self.link.open()?;
        self.link.negotiate(self.desired_pktsize, self.desired_nbrpkts)?;
        Ok(ident)
    }

    /// LOGON + (optional) SECURITY, skipping SECURITY when `creds` carries
    /// no password (spec.md §4.3 policy).
    #[instrument(level = "info", skip(self, creds))]
    pub fn login(&mut self, creds: &Credentials) -> Result<bool> {
        self.link.logon(creds.username_padded(), creds.userid())?;
        if creds.has_password() {
            self.link.security(creds.password_padded())
        } else {
            Ok(true)
        }
    }

    /// TERMINATE and reset local state. C12.18 has no service distinct
    /// from TERMINATE for a mere log-off, so `logout` is this by another
    /// name (see DESIGN.md).
    #[instrument(level = "info", skip(self))]
    pub fn logout(&mut self) -> Result<()> {
        self.close()
    }

    #[instrument(level = "info", skip(self))]
    pub fn close(&mut self) -> Result<()> {
        let result = self.link.terminate();
        self.cache.clear();
        self.endian_latched = None;
        result
    }

    /// Drops local state without sending TERMINATE, for a channel presumed
    /// already dead (see DESIGN.md, Open Question (a)).
    pub fn force_close(&mut self) {
        self.link.force_close();
        self.cache.clear();
        self.endian_latched = None;
    }

    pub fn is_closed(&self) -> bool {
        self.link.state().is_closed()
    }

    pub fn wait(&mut self, seconds: u8) -> Result<()> {
        self.link.wait(seconds)
    }

    pub fn read_table(&mut self, table: u16) -> Result<Vec<u8>> {
        TableIo::read_table(&mut self.link, &mut self.cache, self.cache_enabled, table)
    }

    pub fn read_table_offset(&mut self, table: u16, offset: u32, octets: u16) -> Result<Vec<u8>> {
        TableIo::read_table_offset(&mut self.link, table, offset, octets)
    }

    pub fn read_table_index(&mut self, table: u16, index: u16, count: u16) -> Result<Vec<u8>> {
        TableIo::read_table_index(&mut self.link, table, index, count)
    }

    pub fn write_table(&mut self, table: u16, data: &[u8]) -> Result<()> {
        TableIo::write_table(&mut self.link, &mut self.cache, table, data)
    }

    pub fn write_table_offset(&mut self, table: u16, offset: u32, data: &[u8]) -> Result<()> {
        TableIo::write_table_offset(&mut self.link, &mut self.cache, table, offset, data)
    }

    /// `proc_nbr` must fit in 11 bits; header endianness follows
    /// [`Self::c1219_endian`], auto-probing table 0 on first use.
    pub fn run_procedure(
        &mut self,
        proc_nbr: u16,
        is_manufacturer: bool,
        params: &[u8],
    ) -> Result<(ProcedureResult, Vec<u8>)> {
        let big_endian = self.c1219_endian()?;
        crate::procedure::ProcedureRunner::run_procedure(
            &mut self.link,
            &mut self.cache,
            &mut self.proc_sequence,
            proc_nbr,
            is_manufacturer,
            params,
            big_endian,
        )
    }

    pub fn set_cache_policy(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    pub fn flush_cache(&mut self, table: Option<u16>) {
        match table {
            Some(t) => self.cache.invalidate(t),
            None => self.cache.clear(),
        }
    }

    /// Latches and returns the C12.19 byte order (spec.md §4.6):
    /// `true` = big-endian, `false` = little-endian.
    pub fn c1219_endian(&mut self) -> Result<bool> {
        EndianProbe::probe(
            &mut self.link,
            &mut self.cache,
            self.cache_enabled,
            &mut self.endian_latched,
        )
    }

    /// Wraps `self` in a guard whose `Drop` force-closes the session if the
    /// caller's scope exits (return, `?`, or panic unwinding) before an
    /// explicit `close`/`logout` — spec.md §5's "guaranteed release on all
    /// exit paths".
    pub fn scoped(self) -> ScopedSession<C> {
        ScopedSession {
            session: Some(self),
        }
    }
}

/// RAII guard returned by [`Session::scoped`].
#[derive(Debug)]
pub struct ScopedSession<C: ByteChannel> {
    session: Option<Session<C>>,
}

impl<C: ByteChannel> std::ops::Deref for ScopedSession<C> {
    type Target = Session<C>;

    fn deref(&self) -> &Self::Target {
        self.session
            .as_ref()
            .expect("session is only taken in Drop")
    }
}

impl<C: ByteChannel> std::ops::DerefMut for ScopedSession<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
            .as_mut()
            .expect("session is only taken in Drop")
    }
}

impl<C: ByteChannel> Drop for ScopedSession<C> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take()
            && !session.is_closed()
        {
            session.force_close();
        }
    }
}
