// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Session credentials (spec.md §3): a fixed-width, zero-padded username,
//! a 16-bit user-id, and a fixed-width, zero-padded password. Never
//! implements `Display`; `Debug` redacts the password so credentials never
//! end up in a log line by accident.

use std::fmt;

use crate::error::{Error, Result};

const USERNAME_LEN: usize = 10;
const PASSWORD_LEN: usize = 20;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: [u8; USERNAME_LEN],
    userid: u16,
    password: [u8; PASSWORD_LEN],
}

impl Credentials {
    /// Builds credentials from a plain-text (not hex-encoded) password.
    pub fn new(username: &str, userid: u16, password: &[u8]) -> Result<Self> {
        if !username.is_ascii() {
            return Err(Error::InvalidArgument(
                "username must be ASCII".to_string(),
            ));
        }
        if username.len() > USERNAME_LEN {
            return Err(Error::InvalidArgument(format!(
                "username longer than {USERNAME_LEN} octets"
            )));
        }
        if password.len() > PASSWORD_LEN {
            return Err(Error::InvalidArgument(format!(
                "password longer than {PASSWORD_LEN} octets"
            )));
        }

        let mut username_buf = [0u8; USERNAME_LEN];
        username_buf[..username.len()].copy_from_slice(username.as_bytes());

        let mut password_buf = [0u8; PASSWORD_LEN];
        password_buf[..password.len()].copy_from_slice(password);

        Ok(Self {
            username: username_buf,
            userid,
            password: password_buf,
        })
    }

    /// Builds credentials from a hex-encoded password (the `PASSWORDHEX`
    /// option), validating it against the same shape the original framework
    /// enforced: an even-length run of hex digit pairs.
    pub fn from_hex_password(username: &str, userid: u16, hex_password: &str) -> Result<Self> {
        if hex_password.is_empty() || hex_password.len() % 2 != 0 {
            return Err(Error::InvalidArgument(
                "hex password must be a non-empty, even-length run of hex digits".to_string(),
            ));
        }
        let decoded = hex::decode(hex_password).map_err(|_| {
            Error::InvalidArgument("hex password contains non-hex-digit characters".to_string())
        })?;
        Self::new(username, userid, &decoded)
    }

    pub fn username_padded(&self) -> &[u8; USERNAME_LEN] {
        &self.username
    }

    pub fn userid(&self) -> u16 {
        self.userid
    }

    pub fn password_padded(&self) -> &[u8; PASSWORD_LEN] {
        &self.password
    }

    pub fn has_password(&self) -> bool {
        self.password.iter().any(|&b| b != 0)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "username",
                &String::from_utf8_lossy(&self.username).trim_end_matches('\0'),
            )
            .field("userid", &self.userid)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_username_and_password() {
        let creds = Credentials::new("0000", 0, &[]).expect("valid");
        assert_eq!(&creds.username_padded()[..4], b"0000");
        assert_eq!(&creds.username_padded()[4..], &[0u8; 6]);
        assert_eq!(creds.password_padded(), &[0u8; PASSWORD_LEN]);
        assert!(!creds.has_password());
    }

    #[test]
    fn rejects_oversized_username() {
        let err = Credentials::new("012345678901", 0, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn hex_password_decodes_and_pads() {
        let creds = Credentials::from_hex_password("0000", 0, "deadbeef").expect("valid");
        assert_eq!(&creds.password_padded()[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(creds.has_password());
    }

    #[test]
    fn hex_password_rejects_odd_length() {
        let err = Credentials::from_hex_password("0000", 0, "abc").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("0000", 0, b"secret").expect("valid");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }
}
