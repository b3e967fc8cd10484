// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A pure-Rust core for the ANSI C12.18 optical-port transport protocol
//! and the C12.19 end-device table model it carries, built for assessing
//! revenue meters over a half-duplex serial channel.
//!
//! The top-level entry point is [`session::Session`]; everything else is
//! the machinery it composes (framing, link-layer ARQ, table cache/IO,
//! procedure invocation, endian detection).

pub mod cfg;
pub mod channel;
pub mod credentials;
pub mod endian;
pub mod error;
pub mod framer;
pub mod hexdump;
pub mod opcode;
pub mod procedure;
pub mod session;
pub mod table;

/// In-memory [`channel::ByteChannel`] for tests. Public (not `#[cfg(test)]`)
/// so integration tests under `tests/` can script a meter without a real
/// serial port.
pub mod testing;
