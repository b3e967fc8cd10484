// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The error taxonomy for the C12.18 transport and C12.19 table layers.
//!
//! Every fallible operation in this crate returns [`Error`]. Variants map
//! one-to-one onto the kinds a caller needs to branch on (timeouts vs.
//! framing corruption vs. a rejected table write); nothing here is a bare
//! `anyhow::Error` because callers are expected to match on these.

use thiserror::Error;

/// One-byte status code returned in a C12.18 service response, as defined
/// in spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Err,
    Sns,
    Isc,
    Onp,
    Iar,
    Bsy,
    Dnr,
    Dlk,
    Rno,
    Isss,
    Other(u8),
}

impl StatusCode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => StatusCode::Ok,
            0x01 => StatusCode::Err,
            0x02 => StatusCode::Sns,
            0x03 => StatusCode::Isc,
            0x04 => StatusCode::Onp,
            0x05 => StatusCode::Iar,
            0x06 => StatusCode::Bsy,
            0x07 => StatusCode::Dnr,
            0x08 => StatusCode::Dlk,
            0x09 => StatusCode::Rno,
            0x0A => StatusCode::Isss,
            other => StatusCode::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    pub fn raw(self) -> u8 {
        match self {
            StatusCode::Ok => 0x00,
            StatusCode::Err => 0x01,
            StatusCode::Sns => 0x02,
            StatusCode::Isc => 0x03,
            StatusCode::Onp => 0x04,
            StatusCode::Iar => 0x05,
            StatusCode::Bsy => 0x06,
            StatusCode::Dnr => 0x07,
            StatusCode::Dlk => 0x08,
            StatusCode::Rno => 0x09,
            StatusCode::Isss => 0x0A,
            StatusCode::Other(b) => b,
        }
    }
}

/// Error taxonomy for a failed table READ, keyed off [`StatusCode`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReadTableError {
    #[error("not authorized to read this table")]
    NotAuthorized,
    #[error("table not found")]
    NotFound,
    #[error("read not supported for this table")]
    NotSupported,
    #[error("invalid parameter in read request")]
    InvalidParam,
    #[error("meter is busy")]
    Busy,
    #[error("data not ready")]
    DataNotReady,
    #[error("table body failed checksum verification")]
    Checksum,
    #[error("meter returned status code 0x{0:02x}")]
    Generic(u8),
}

impl ReadTableError {
    pub fn from_status(s: StatusCode) -> Self {
        match s {
            StatusCode::Isc => ReadTableError::NotAuthorized,
            StatusCode::Sns => ReadTableError::NotSupported,
            StatusCode::Onp => ReadTableError::NotFound,
            StatusCode::Iar => ReadTableError::InvalidParam,
            StatusCode::Bsy => ReadTableError::Busy,
            StatusCode::Dnr => ReadTableError::DataNotReady,
            other => ReadTableError::Generic(other.raw()),
        }
    }
}

/// Error taxonomy for a failed table WRITE, keyed off [`StatusCode`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WriteTableError {
    #[error("not authorized to write this table")]
    NotAuthorized,
    #[error("table not found")]
    NotFound,
    #[error("write not supported for this table")]
    NotSupported,
    #[error("invalid parameter in write request")]
    InvalidParam,
    #[error("meter is busy")]
    Busy,
    #[error("data not ready")]
    DataNotReady,
    #[error("table is locked")]
    Locked,
    #[error("meter returned status code 0x{0:02x}")]
    Generic(u8),
}

impl WriteTableError {
    pub fn from_status(s: StatusCode) -> Self {
        match s {
            StatusCode::Isc => WriteTableError::NotAuthorized,
            StatusCode::Sns => WriteTableError::NotSupported,
            StatusCode::Onp => WriteTableError::NotFound,
            StatusCode::Iar => WriteTableError::InvalidParam,
            StatusCode::Bsy => WriteTableError::Busy,
            StatusCode::Dnr => WriteTableError::DataNotReady,
            StatusCode::Dlk => WriteTableError::Locked,
            other => WriteTableError::Generic(other.raw()),
        }
    }
}

/// Named procedure result codes from spec.md §4.5 step 5, plus a catch-all
/// for vendor-defined codes C12.19 permits beyond the named set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureResult {
    Completed,
    NotFullyCompleted,
    InvalidParam,
    ConditionsPrevent,
    IgnoreDueToLockout,
    SetupConflict,
    TimingConstraint,
    NoAuthorization,
    UnrecognizedProcedure,
    Other(u8),
}

impl ProcedureResult {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => ProcedureResult::Completed,
            1 => ProcedureResult::NotFullyCompleted,
            2 => ProcedureResult::InvalidParam,
            3 => ProcedureResult::ConditionsPrevent,
            4 => ProcedureResult::IgnoreDueToLockout,
            5 => ProcedureResult::SetupConflict,
            6 => ProcedureResult::TimingConstraint,
            7 => ProcedureResult::NoAuthorization,
            8 => ProcedureResult::UnrecognizedProcedure,
            other => ProcedureResult::Other(other),
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, ProcedureResult::Completed)
    }
}

/// Why a framed packet failed to decode.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    #[error("frame did not start with STP (0xEE)")]
    MissingStp,
    #[error("declared length does not match the bytes actually present")]
    BadLength,
    #[error("CRC-16 verification failed")]
    BadCrc,
    #[error("stream ended before a complete frame was read")]
    Truncated,
}

/// Why a procedure invocation failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureError {
    #[error("procedure returned non-completed result: {0:?}")]
    Failed(ProcedureResult),
    #[error("table 8 sequence byte never matched after retrying")]
    SequenceMismatch,
}

/// The full error taxonomy, spec.md §7.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on the byte channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("timed out waiting for the meter to respond")]
    Timeout,

    #[error("meter rejected negotiated parameters")]
    Negotiate,

    #[error("meter rejected username/userid at logon")]
    Logon,

    #[error("meter rejected the password")]
    Security,

    #[error("read table failed: {0}")]
    ReadTable(#[from] ReadTableError),

    #[error("write table failed: {0}")]
    WriteTable(#[from] WriteTableError),

    #[error("procedure failed: {0}")]
    Procedure(#[from] ProcedureError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
