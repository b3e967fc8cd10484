// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The C12.18 link session: toggle-bit ARQ, retransmission, and reassembly
//! of multi-packet responses over a [`ByteChannel`] (spec.md §4.2).

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::channel::ByteChannel;
use crate::error::{Error, Result, StatusCode};
use crate::framer::{Frame, Framer, LinkReply};
use crate::opcode::Opcode;
use crate::session::state::SessionState;

/// Device identity reported in response to IDENT (spec.md §8 scenario S1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentResponse {
    pub std_version: u8,
    pub std_revision: u8,
    pub feature_count: u8,
}

/// Packet parameters the meter granted in response to NEGOTIATE; the meter
/// may grant smaller values than requested but never larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedParams {
    pub pktsize: u16,
    pub nbrpkts: u8,
    pub idle_timeout: Duration,
}

/// Owns the byte channel and drives the C12.18 link-layer state machine.
///
/// Generic over the channel type rather than a trait object: one
/// `LinkSession` is built per real channel and lives for the life of that
/// channel, so monomorphization cost is a non-issue and callers get a
/// concrete, inlinable `send_service`.
#[derive(Debug)]
pub struct LinkSession<C: ByteChannel> {
    channel: C,
    framer: Framer,
    state: SessionState,
    toggle: bool,
    pktsize: u16,
    service_retries: u8,
    service_timeout: Duration,
    idle_timeout: Duration,
}

impl<C: ByteChannel> LinkSession<C> {
    /// Inter-character / per-read timeout (spec.md §4.2).
    pub const DEFAULT_CHAR_TIMEOUT: Duration = Duration::from_secs(1);
    /// Whole-service timeout before `send_service` gives up and retries.
    pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(6);
    /// Default packet-size ceiling before a successful negotiate (spec.md §6).
    pub const DEFAULT_PKTSIZE: u16 = 512;
    /// Retransmit/retry budget for a single request packet or whole service.
    pub const MAX_RETRIES: u8 = 3;

    pub fn new(channel: C) -> Self {
        let mut channel = channel;
        channel.set_timeout(Self::DEFAULT_CHAR_TIMEOUT);
        Self {
            channel,
            framer: Framer::new(),
            state: SessionState::Closed,
            toggle: false,
            pktsize: Self::DEFAULT_PKTSIZE,
            service_retries: Self::MAX_RETRIES,
            service_timeout: Self::DEFAULT_SERVICE_TIMEOUT,
            idle_timeout: Self::DEFAULT_SERVICE_TIMEOUT,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pktsize(&self) -> u16 {
        self.pktsize
    }

    /// Drops the session to `Closed` locally without sending TERMINATE.
    ///
    /// For the case where the channel itself is presumed dead: writing a
    /// TERMINATE to it would just hit the same failure again.
    pub fn force_close(&mut self) {
        self.state = SessionState::Closed;
        self.toggle = false;
    }

    #[instrument(level = "debug", skip(self))]
    pub fn open(&mut self) -> Result<IdentResponse> {
        self.toggle = false;
        self.state = SessionState::Opened;
        let response = self.send_service(&[Opcode::Ident.raw()])?;
        let body = Self::expect_ok(&response)?;
        if body.len() < 3 {
            return Err(Error::Negotiate);
        }
        self.state = SessionState::Identified;
        Ok(IdentResponse {
            std_version: body[0],
            std_revision: body[1],
            feature_count: body[2],
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn negotiate(&mut self, pktsize: u16, nbrpkts: u8) -> Result<NegotiatedParams> {
        let pktsize = pktsize.min(Framer::MAX_PKTSIZE as u16);
        let mut body = vec![Opcode::Negotiate.raw()];
        body.push((pktsize >> 8) as u8);
        body.push((pktsize & 0xFF) as u8);
        body.push(nbrpkts);

        let response = self.send_service(&body)?;
        let payload = Self::expect_ok(&response).map_err(|_| Error::Negotiate)?;
        if payload.len() < 5 {
            return Err(Error::Negotiate);
        }
        let granted_pktsize = ((payload[0] as u16) << 8) | payload[1] as u16;
        let granted_nbrpkts = payload[2];
        let idle_secs = ((payload[3] as u64) << 8) | payload[4] as u64;

        if granted_pktsize == 0 || granted_nbrpkts == 0 {
            return Err(Error::Negotiate);
        }

        self.pktsize = granted_pktsize;
        self.idle_timeout = Duration::from_secs(idle_secs.max(1));
        self.state = SessionState::Negotiated;
        Ok(NegotiatedParams {
            pktsize: granted_pktsize,
            nbrpkts: granted_nbrpkts,
            idle_timeout: self.idle_timeout,
        })
    }

    #[instrument(level = "debug", skip_all)]
    pub fn logon(&mut self, username: &[u8; 10], userid: u16) -> Result<()> {
        let mut body = vec![Opcode::Logon.raw()];
        body.extend_from_slice(username);
        body.push((userid >> 8) as u8);
        body.push((userid & 0xFF) as u8);

        let response = self.send_service(&body)?;
        Self::expect_ok(&response).map_err(|_| Error::Logon)?;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    pub fn security(&mut self, password: &[u8; 20]) -> Result<bool> {
        let mut body = vec![Opcode::Security.raw()];
        body.extend_from_slice(password);

        let response = self.send_service(&body)?;
        let status = StatusCode::from_byte(response.first().copied().unwrap_or(0x01));
        if status.is_ok() {
            self.state = SessionState::LoggedOn;
            return Ok(true);
        }
        if matches!(status, StatusCode::Isc) {
            warn!("meter rejected the security password");
            return Ok(false);
        }
        Err(Error::Security)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn wait(&mut self, seconds: u8) -> Result<()> {
        let body = vec![Opcode::Wait.raw(), seconds];
        let response = self.send_service(&body)?;
        Self::expect_ok(&response)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn terminate(&mut self) -> Result<()> {
        let body = vec![Opcode::Terminate.raw()];
        let result = self.send_service(&body).and_then(|r| Self::expect_ok(&r).map(|_| ()));
        self.force_close();
        result
    }

    /// Top-level request/response with reassembly (spec.md §4.2).
    #[instrument(level = "debug", skip(self, request))]
    pub fn send_service(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let pktsize = self.pktsize.max(1) as usize;
        let chunks: Vec<&[u8]> = if request.is_empty() {
            vec![&request[0..0]]
        } else {
            request.chunks(pktsize).collect()
        };
        let last_index = chunks.len() - 1;

        let mut response_start: Option<Frame> = None;
        for (i, chunk) in chunks.iter().enumerate() {
            response_start = self.send_one_packet(chunk, i == last_index)?;
        }
        let first = response_start.expect("the last packet always yields a response frame");
        self.reassemble(first)
    }

    fn send_one_packet(&mut self, payload: &[u8], is_last: bool) -> Result<Option<Frame>> {
        for attempt in 0..Self::MAX_RETRIES {
            let encoded = self.framer.encode(payload, self.toggle, 0);
            self.channel.write_all(&encoded)?;

            match self.framer.read_reply(&mut self.channel) {
                Ok(LinkReply::Nak) => {
                    debug!(attempt, "meter NAKed packet, retransmitting");
                    continue;
                }
                Ok(LinkReply::Ack) => {
                    self.toggle = !self.toggle;
                    if !is_last {
                        return Ok(None);
                    }
                    let frame = self.framer.decode(&mut self.channel)?;
                    return Ok(Some(frame));
                }
                Ok(LinkReply::Frame(frame)) => {
                    self.toggle = !self.toggle;
                    return Ok(Some(frame));
                }
                Err(err) => {
                    debug!(attempt, %err, "framing error reading reply, retrying");
                    continue;
                }
            }
        }
        Err(Error::Timeout)
    }

    fn reassemble(&mut self, first: Frame) -> Result<Vec<u8>> {
        let mut body = first.payload;
        let mut remaining = first.seq_remaining;
        while remaining > 0 {
            let frame = self.framer.decode(&mut self.channel)?;
            body.extend_from_slice(&frame.payload);
            remaining = frame.seq_remaining;
        }
        Ok(body)
    }

    /// Strips and validates the status byte, returning the remaining body.
    fn expect_ok(response: &[u8]) -> Result<&[u8]> {
        let status_byte = *response.first().ok_or(Error::Timeout)?;
        let status = StatusCode::from_byte(status_byte);
        if !status.is_ok() {
            return Err(status_to_generic(status));
        }
        Ok(&response[1..])
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn service_timeout(&self) -> Duration {
        self.service_timeout
    }

    pub fn set_service_timeout(&mut self, timeout: Duration) {
        self.service_timeout = timeout;
    }
}

fn status_to_generic(status: StatusCode) -> Error {
    Error::InvalidArgument(format!("meter returned status 0x{:02x}", status.raw()))
}
