// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! An in-memory [`ByteChannel`] for exercising the protocol stack without a
//! real serial port, analogous to the hex-fixture loaders the wire-format
//! unit tests elsewhere in this codebase's sibling projects use.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::channel::ByteChannel;

/// A scripted byte channel: reads drain a pre-loaded queue, writes are
/// captured for later inspection. Tests push the bytes a simulated meter
/// would have sent, drive the operation under test, then assert on
/// [`ScriptedChannel::written`].
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    input: VecDeque<u8>,
    output: Vec<u8>,
    timeout: Duration,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            input: VecDeque::new(),
            output: Vec::new(),
            timeout: Duration::from_secs(1),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            input: VecDeque::from(bytes),
            output: Vec::new(),
            timeout: Duration::from_secs(1),
        }
    }

    /// Appends more bytes to the input queue, so a test can script several
    /// request/response exchanges on the same channel in order.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Everything written so far, for asserting on opcodes/toggle bits.
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Clears captured writes, keeping the remaining input queue intact.
    pub fn clear_written(&mut self) {
        self.output.clear();
    }

    pub fn configured_timeout(&self) -> Duration {
        self.timeout
    }
}

impl ByteChannel for ScriptedChannel {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(buf);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.input.len() < buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scripted channel input exhausted",
            ));
        }
        for slot in buf.iter_mut() {
            // Checked above: at least buf.len() bytes remain.
            *slot = self
                .input
                .pop_front()
                .expect("scripted channel length was checked above");
        }
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
